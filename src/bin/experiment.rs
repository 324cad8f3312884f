//! Experiment Admin Binary
//!
//! One invocation per request against the shared postgres store named by
//! `DB_URL`. Prints the result as JSON.
//!
//! Every command except `migrate` first lets the round controller catch up
//! with the wall clock.

use clap::Parser;
use cohort::*;
use serde_json::Value;
use serde_json::json;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
enum Command {
    #[command(about = "Create missing tables")]
    Migrate,
    #[command(about = "Configure a new experiment", alias = "cfg")]
    Configure(Config),
    #[command(about = "Add a payoff matrix before the experiment starts")]
    Game {
        #[arg(required = true)]
        id: GameId,
        #[arg(required = true)]
        p1: usize,
        #[arg(required = true)]
        p2: usize,
        #[arg(required = true, help = "row-major (row, col) payoff pairs, e.g. 3,3,0,5,5,0,1,1")]
        payoffs: Mix,
    },
    #[command(about = "Register a participant")]
    Register {
        #[arg(required = true)]
        player: PlayerId,
        #[arg(long, default_value_t = false)]
        panel: bool,
    },
    #[command(about = "Start the experiment, now or at a given unix time")]
    Start {
        #[arg(long)]
        at: Option<Stamp>,
    },
    #[command(about = "Seat a player in a round")]
    Admit {
        #[arg(required = true)]
        round: Round,
        #[arg(required = true)]
        player: PlayerId,
        #[arg(required = true, help = "row or col")]
        role: String,
    },
    #[command(about = "Submit a mixed strategy for one game", alias = "sub")]
    Submit {
        #[arg(required = true)]
        round: Round,
        #[arg(required = true)]
        player: PlayerId,
        #[arg(required = true)]
        game: GameId,
        #[arg(required = true, help = "weights, e.g. 1/3,2/3")]
        mix: Mix,
    },
    #[command(about = "Move to the round the clock or participation justifies")]
    Advance,
    #[command(about = "Average strategies of a closed round")]
    Roundup {
        #[arg(required = true)]
        round: Round,
        #[arg(required = true)]
        game: GameId,
    },
    #[command(about = "Every closed roundup of a game")]
    History {
        #[arg(required = true)]
        game: GameId,
    },
    #[command(about = "A player's ledger through a closed round")]
    Lottery {
        #[arg(required = true)]
        round: Round,
        #[arg(required = true)]
        player: PlayerId,
    },
    #[command(about = "A player's ledger as of the latest closed round")]
    Standing {
        #[arg(required = true)]
        player: PlayerId,
    },
    #[command(about = "Allot tickets once every round is over")]
    Finish,
    #[command(about = "Draw winners from the allotted tickets")]
    Draw {
        #[arg(required = true)]
        count: usize,
        #[arg(required = true)]
        seed: u64,
    },
    #[command(about = "Experiment state and draw outcome")]
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    log();
    let command = Command::parse();
    let postgres = db().await?;
    if let Command::Migrate = command {
        postgres.migrate().await?;
        return Ok(());
    }
    let backoff = Backoff::from_env();
    log::debug!("retrying busy store calls up to {} times", backoff.attempts());
    let lab = Lab::with_backoff(postgres, backoff);
    let now = now();
    if !matches!(command, Command::Configure(_)) {
        if let Ok(experiment) = lab.experiment().await {
            if experiment.phase() == Phase::Started {
                lab.advance(now).await?;
            }
        }
    }
    let output = match handle(&lab, command, now).await {
        Ok(value) => value,
        Err(e) => match e.rejection() {
            Some(rejection) => json!({ "rejected": rejection.to_string() }),
            None => return Err(e.into()),
        },
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn handle(lab: &Lab<Postgres>, command: Command, now: Stamp) -> Result<Value, Error> {
    match command {
        Command::Migrate => Ok(Value::Null),
        Command::Configure(config) => {
            lab.configure(Experiment::from(config)).await?;
            Ok(status(&lab.experiment().await?, &[]))
        }
        Command::Game { id, p1, p2, payoffs } => {
            let game = Game::new(id, p1, p2, payoffs.weights().to_vec())?;
            lab.add_game(game.clone()).await?;
            Ok(json!({ "game": game.to_string() }))
        }
        Command::Register { player, panel } => {
            let player = lab.register(player, panel).await?;
            Ok(json!({ "player": player.id(), "order": player.order(), "panel": player.panel() }))
        }
        Command::Start { at } => Ok(json!({ "started": lab.start(at.unwrap_or(now)).await? })),
        Command::Admit { round, player, role } => {
            let role = Role::try_from(role.as_str())
                .map_err(|e| Rejection::Malformed(e.to_string()))?;
            let seat = lab.admit(round, player, role, now).await?;
            Ok(json!({ "round": seat.round(), "player": seat.player(), "role": seat.role().to_string() }))
        }
        Command::Submit {
            round,
            player,
            game,
            mix,
        } => {
            let choice = lab.submit(round, player, game, mix, now).await?;
            Ok(json!({
                "round": choice.round(),
                "player": choice.player(),
                "game": choice.game(),
                "mix": choice.mix().to_string(),
            }))
        }
        Command::Advance => Ok(json!({ "advanced": lab.advance(now).await? })),
        Command::Roundup { round, game } => Ok(roundup(&lab.ensure_roundup(round, game).await?)),
        Command::History { game } => Ok(Value::Array(
            lab.history(game, now).await?.iter().map(roundup).collect(),
        )),
        Command::Lottery { round, player } => Ok(entry(&lab.lottery_for(round, player).await?)),
        Command::Standing { player } => Ok(entry(&lab.standing(player, now).await?)),
        Command::Finish => Ok(json!({ "finished": lab.finish().await? })),
        Command::Draw { count, seed } => Ok(json!({ "drawn": lab.draw(count, seed).await? })),
        Command::Status => Ok(status(&lab.experiment().await?, &lab.winners().await?)),
    }
}

fn roundup(r: &Roundup) -> Value {
    json!({
        "round": r.round(),
        "game": r.game(),
        "row": r.row().to_string(),
        "col": r.col().to_string(),
        "skip": r.skip(),
        "count": r.count(),
    })
}

fn entry(e: &Entry) -> Value {
    json!({
        "round": e.round(),
        "player": e.player(),
        "current": e.current().to_string(),
        "aggregate": e.aggregate().to_string(),
        "tickets": e.tickets(),
    })
}

fn status(e: &Experiment, outcome: &[Winner]) -> Value {
    json!({
        "phase": e.phase().to_string(),
        "round": e.round(),
        "rounds": e.rounds(),
        "prounds": e.prounds(),
        "minutes": e.minutes(),
        "start": e.start(),
        "began": e.began(),
        "lottery": e.lottery(),
        "total": e.total(),
        "winners": outcome
            .iter()
            .filter(|w| w.is_winner())
            .map(|w| json!({ "player": w.player(), "rank": w.rank(), "ticket": w.ticket() }))
            .collect::<Vec<_>>(),
    })
}
