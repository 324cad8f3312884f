//! Simulation Binary
//!
//! Plays a whole experiment against the in-memory store on a synthetic
//! clock, with random players submitting random rational mixes, then
//! finishes and draws. Useful for eyeballing ledgers and draws.

use clap::Parser;
use cohort::*;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    config: Config,
    /// Number of registered players.
    #[arg(long, default_value_t = 12)]
    players: i64,
    /// Chance in percent that a seated player skips one of their games.
    #[arg(long, default_value_t = 10)]
    dropout: u32,
    /// Winners to draw.
    #[arg(long, default_value_t = 3)]
    winners: usize,
    /// Seed for both the simulated players and the draw.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    log();
    let args = Args::parse();
    let ref mut rng = SmallRng::seed_from_u64(args.seed);
    let lab = Lab::new(Memory::default());
    let experiment = Experiment::from(args.config.clone());
    let period = experiment.period();
    let rounds = experiment.rounds();
    lab.configure(experiment).await?;
    lab.add_game(Game::new(1, 2, 2, cells(&[3, 3, 0, 5, 5, 0, 1, 1]))?).await?;
    lab.add_game(Game::new(2, 2, 2, cells(&[2, 2, 0, 0, 0, 0, 1, 1]))?).await?;
    lab.add_game(Game::new(3, 3, 2, cells(&[1, 0, 0, 1, 2, 2, 0, 0, 1, 1, 0, 3]))?).await?;
    let games = lab.games().await?;
    for player in 0..args.players {
        lab.register(player, player % 5 == 4).await?;
    }
    lab.start(0).await?;
    for round in 0..rounds {
        let clock = round * period;
        lab.advance(clock).await?;
        for player in 0..args.players {
            let role = if rng.random_bool(0.5) { Role::Row } else { Role::Col };
            match lab.admit(round, player, role, clock + 1).await {
                Ok(_) => {}
                Err(Error::Rejected(r)) => {
                    log::debug!("{}", r);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            for game in games.iter() {
                if rng.random_ratio(args.dropout, 100) {
                    continue;
                }
                let ref mix = random(rng, game.width(role));
                lab.submit(round, player, game.id(), mix.clone(), clock + 2).await?;
            }
        }
        log::info!("round {} played", round);
    }
    lab.advance(rounds * period).await?;
    for game in games.iter() {
        for roundup in lab.history(game.id(), rounds * period).await? {
            log::info!("{}", roundup);
        }
    }
    lab.finalize_and_draw(args.winners, args.seed).await?;
    for player in 0..args.players {
        log::info!("{}", lab.standing(player, rounds * period).await?);
    }
    for winner in lab.winners().await? {
        log::info!("{}", winner);
    }
    Ok(())
}

fn cells(payoffs: &[i64]) -> Vec<Ratio> {
    payoffs.iter().copied().map(whole).collect()
}

/// A random mix with denominators up to 12, summing to one.
fn random(rng: &mut impl Rng, width: usize) -> Mix {
    let weights = (0..width)
        .map(|_| rng.random_range(0..=12i64))
        .collect::<Vec<_>>();
    let sum = weights.iter().sum::<i64>().max(1);
    weights
        .into_iter()
        .map(|w| Ratio::new(w.into(), sum.into()))
        .collect::<Vec<_>>()
        .into()
}
