use crate::*;

/// One process's handle on a shared experiment.
///
/// Holds no state of its own beyond the store handle and retry policy, so
/// any number of `Lab`s over the same store may run side by side. Every
/// memoized value they compute is persisted once and read back by the rest.
pub struct Lab<S> {
    store: S,
    backoff: Backoff,
}

impl<S> Lab<S> {
    pub fn new(store: S) -> Self {
        Self::with_backoff(store, Backoff::default())
    }
    pub fn with_backoff(store: S, backoff: Backoff) -> Self {
        Self { store, backoff }
    }
    pub fn store(&self) -> &S {
        &self.store
    }
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}

impl<S: Store> Lab<S> {
    pub async fn experiment(&self) -> Result<Experiment, Error> {
        let ref store = self.store;
        self.backoff
            .retry("experiment", || store.experiment())
            .await?
            .ok_or_else(|| Rejection::NotConfigured.into())
    }
    pub async fn games(&self) -> Result<Vec<Game>, Error> {
        let ref store = self.store;
        self.backoff.retry("games", || store.games()).await
    }
    pub async fn players(&self) -> Result<Vec<Player>, Error> {
        let ref store = self.store;
        self.backoff.retry("players", || store.players()).await
    }
    pub(crate) async fn player(&self, id: PlayerId) -> Result<Player, Error> {
        self.players()
            .await?
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| Rejection::UnknownPlayer(id).into())
    }

    /// Persists the experiment parameters. Only the first configuration wins.
    pub async fn configure(&self, experiment: Experiment) -> Result<(), Error> {
        experiment.validate()?;
        let ref store = self.store;
        let ref experiment = experiment;
        match self.backoff.retry("configure", || store.create(experiment)).await? {
            Insert::Inserted => {
                log::info!(
                    "configured {} rounds of {} minutes, {} per player",
                    experiment.rounds(),
                    experiment.minutes(),
                    experiment.prounds()
                );
                Ok(())
            }
            Insert::Conflict => Err(Rejection::AlreadyConfigured.into()),
        }
    }

    /// Adds a payoff matrix. The game set is frozen once the experiment starts.
    pub async fn add_game(&self, game: Game) -> Result<(), Error> {
        if self.experiment().await?.phase() != Phase::New {
            return Err(Rejection::AlreadyStarted.into());
        }
        let ref store = self.store;
        let ref game = game;
        match self.backoff.retry("add game", || store.insert_game(game)).await? {
            Insert::Inserted => {
                log::info!("added {}", game);
                Ok(())
            }
            Insert::Conflict => Err(Rejection::DuplicateGame(game.id()).into()),
        }
    }

    /// Registers a participant under a fresh random order key.
    /// Panel members play but never hold lottery tickets.
    pub async fn register(&self, id: PlayerId, panel: bool) -> Result<Player, Error> {
        let ref store = self.store;
        let ref player = Player::register(id, panel);
        match self.backoff.retry("register", || store.insert_player(player)).await? {
            Insert::Inserted => {
                log::debug!("registered player {}", id);
                Ok(player.clone())
            }
            Insert::Conflict => Err(Rejection::AlreadyRegistered(id).into()),
        }
    }

    /// Moves NEW to STARTED with round 0 due at `at`.
    /// Returns whether this call made the transition.
    pub async fn start(&self, at: Stamp) -> Result<bool, Error> {
        let experiment = self.experiment().await?;
        if experiment.phase() != Phase::New {
            return Ok(false);
        }
        if self.games().await?.is_empty() {
            return Err(Rejection::NoGames.into());
        }
        let ref store = self.store;
        let started = self.backoff.retry("start", || store.commit_start(at)).await?;
        match started {
            true => log::info!("experiment starts at {}", at),
            false => log::debug!("experiment already started elsewhere"),
        }
        Ok(started)
    }

    /// Seats a player in `round` under `role`, spending one of their rounds.
    pub async fn admit(
        &self,
        round: Round,
        player: PlayerId,
        role: Role,
        now: Stamp,
    ) -> Result<Seat, Error> {
        self.advance(now).await?;
        let experiment = self.experiment().await?;
        if round < experiment.round().max(0) || round >= experiment.rounds() {
            return Err(Rejection::WrongRound {
                round,
                current: experiment.round(),
            }
            .into());
        }
        self.player(player).await?;
        let ref store = self.store;
        let played = self
            .backoff
            .retry("admissions", || store.admissions(player))
            .await?;
        if played >= experiment.prounds() {
            return Err(Rejection::BudgetExhausted {
                player,
                prounds: experiment.prounds(),
            }
            .into());
        }
        let ref seat = Seat::new(round, player, role);
        match self.backoff.retry("admit", || store.admit(seat)).await? {
            Insert::Inserted => Ok(seat.clone()),
            Insert::Conflict => Err(Rejection::AlreadyAdmitted { round, player }.into()),
        }
    }

    /// Records a player's mixed strategy for one game of the current round.
    ///
    /// Weights are taken as sent: they are not required to sum to one.
    pub async fn submit(
        &self,
        round: Round,
        player: PlayerId,
        game: GameId,
        mix: Mix,
        now: Stamp,
    ) -> Result<Choice, Error> {
        self.advance(now).await?;
        let experiment = self.experiment().await?;
        if experiment.phase() == Phase::New {
            return Err(Rejection::NotStarted.into());
        }
        if experiment.phase() != Phase::Started || round != experiment.round() {
            return Err(Rejection::WrongRound {
                round,
                current: experiment.round(),
            }
            .into());
        }
        let ref store = self.store;
        let seat = self
            .backoff
            .retry("seat", || store.seat(round, player))
            .await?
            .ok_or(Rejection::NotAdmitted { round, player })?;
        let matrix = self
            .games()
            .await?
            .into_iter()
            .find(|g| g.id() == game)
            .ok_or(Rejection::UnknownGame(game))?;
        if mix.len() != matrix.width(seat.role()) {
            return Err(Rejection::Malformed(format!(
                "{} weights for {} strategies as {}",
                mix.len(),
                matrix.width(seat.role()),
                seat.role()
            ))
            .into());
        }
        let ref choice = Choice::new(round, player, game, seat.role(), mix);
        match self.backoff.retry("submit", || store.submit(choice)).await? {
            Submission::Accepted => Ok(choice.clone()),
            Submission::Duplicate => Err(Rejection::AlreadySubmitted {
                round,
                player,
                game,
            }
            .into()),
            Submission::Closed => Err(Rejection::RoundClosed { round }.into()),
            Submission::Unseated => Err(Rejection::NotAdmitted { round, player }.into()),
        }
    }

    /// Roundups of every closed round of `game`, oldest first.
    pub async fn history(&self, game: GameId, now: Stamp) -> Result<Vec<Roundup>, Error> {
        self.advance(now).await?;
        let closed = self.experiment().await?.closed();
        let mut history = Vec::with_capacity(closed.max(0) as usize);
        for round in 0..closed {
            history.push(self.ensure_roundup(round, game).await?);
        }
        Ok(history)
    }

    /// Ledger entry of `player` as of the latest closed round.
    pub async fn standing(&self, player: PlayerId, now: Stamp) -> Result<Entry, Error> {
        self.advance(now).await?;
        let closed = self.experiment().await?.closed();
        self.lottery_for(closed - 1, player).await
    }

    /// Draw outcome, empty until winners are drawn.
    pub async fn winners(&self) -> Result<Vec<Winner>, Error> {
        let ref store = self.store;
        self.backoff.retry("winners", || store.winners()).await
    }
}
