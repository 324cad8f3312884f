use crate::*;
use std::collections::BTreeSet;

impl<S: Store> Lab<S> {
    /// The roundup of a closed round, computing and persisting it first if
    /// no process has yet. The roundup and the payoffs it settles are written
    /// together, so whoever sees the roundup also sees every payoff.
    ///
    /// Earlier rounds the roundup depends on are filled in bottom-up.
    pub async fn ensure_roundup(&self, round: Round, game: GameId) -> Result<Roundup, Error> {
        let experiment = self.experiment().await?;
        if experiment.phase() == Phase::New {
            return Err(Rejection::NotStarted.into());
        }
        if round < 0 || round >= experiment.closed() {
            return Err(Rejection::RoundOpen { round }.into());
        }
        let games = self.games().await?;
        let matrix = games
            .iter()
            .find(|g| g.id() == game)
            .ok_or(Rejection::UnknownGame(game))?;
        self.roundup_through(round, matrix, games.len()).await
    }

    /// Walks back from `round` to the latest persisted roundup, then
    /// computes every missing one on the way forward.
    pub(crate) async fn roundup_through(
        &self,
        round: Round,
        game: &Game,
        games: usize,
    ) -> Result<Roundup, Error> {
        let mut missing = Vec::new();
        let mut latest = None;
        for r in (0..=round).rev() {
            match self.lookup_roundup(r, game.id()).await? {
                Some(found) => {
                    latest = Some(found);
                    break;
                }
                None => missing.push(r),
            }
        }
        for r in missing.into_iter().rev() {
            let prior = latest.as_ref().map_or(0, Roundup::count);
            latest = Some(self.compute_roundup(r, game, prior, games).await?);
        }
        latest.ok_or_else(|| Error::invariant(format!("no roundup for round {}", round)))
    }

    async fn lookup_roundup(&self, round: Round, game: GameId) -> Result<Option<Roundup>, Error> {
        let store = self.store();
        self.backoff()
            .retry("roundup", || store.roundup(round, game))
            .await
    }

    async fn compute_roundup(
        &self,
        round: Round,
        game: &Game,
        prior: i64,
        games: usize,
    ) -> Result<Roundup, Error> {
        let store = self.store();
        let seats = self.backoff().retry("seats", || store.seats(round)).await?;
        let choices = self
            .backoff()
            .retry("choices", || store.choices(round, game.id()))
            .await?;
        let finished = seats
            .iter()
            .filter(|s| s.finished(games))
            .map(Seat::player)
            .collect::<BTreeSet<_>>();
        let ref roundup =
            Roundup::aggregate(round, game, prior, &choices, |p| finished.contains(&p))?;
        let ref payoffs = Payoff::settle(roundup, game, &choices)?;
        match self
            .backoff()
            .retry("roundup insert", || store.insert_roundup(roundup, payoffs))
            .await?
        {
            Insert::Inserted => {
                log::debug!("persisted {} with {} payoffs", roundup, payoffs.len());
                Ok(roundup.clone())
            }
            Insert::Conflict => {
                log::debug!("roundup {} of game {} persisted elsewhere", round, game.id());
                self.lookup_roundup(round, game.id())
                    .await?
                    .ok_or_else(|| Error::invariant("conflicting roundup is missing"))
            }
        }
    }
}
