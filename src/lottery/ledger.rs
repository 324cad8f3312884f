use crate::*;
use num_traits::Zero;

impl<S: Store> Lab<S> {
    /// Ledger entry of `player` through `round`, extending the persisted
    /// ledger as far as needed. Round −1 is the empty ledger.
    pub async fn lottery_for(&self, round: Round, player: PlayerId) -> Result<Entry, Error> {
        let experiment = self.experiment().await?;
        if round < -1 {
            return Err(Rejection::Malformed(format!("no ledger before round {}", round)).into());
        }
        if round >= experiment.closed() {
            return Err(Rejection::RoundOpen { round }.into());
        }
        self.player(player).await?;
        let games = self.games().await?;
        self.ledger_through(round, player, &games).await
    }

    pub(crate) async fn ledger_through(
        &self,
        round: Round,
        player: PlayerId,
        games: &[Game],
    ) -> Result<Entry, Error> {
        let mut missing = Vec::new();
        let mut latest = Entry::genesis(player);
        for r in (0..=round).rev() {
            match self.lookup_entry(r, player).await? {
                Some(found) => {
                    latest = found;
                    break;
                }
                None => missing.push(r),
            }
        }
        for r in missing.into_iter().rev() {
            latest = self.compute_entry(r, &latest, games).await?;
        }
        Ok(latest)
    }

    async fn lookup_entry(&self, round: Round, player: PlayerId) -> Result<Option<Entry>, Error> {
        let store = self.store();
        self.backoff()
            .retry("ledger", || store.entry(round, player))
            .await
    }

    /// A round counts only if the player has a payoff in every game of it.
    async fn compute_entry(&self, round: Round, prev: &Entry, games: &[Game]) -> Result<Entry, Error> {
        for game in games {
            self.roundup_through(round, game, games.len()).await?;
        }
        let store = self.store();
        let player = prev.player();
        let payoffs = self
            .backoff()
            .retry("payoffs", || store.payoffs(round, player))
            .await?;
        let current = match payoffs.len() < games.len() {
            true => Ratio::zero(),
            false => payoffs
                .iter()
                .map(Payoff::value)
                .fold(Ratio::zero(), |acc, v| acc + v),
        };
        let ref entry = Entry::extend(prev, current)?;
        if entry.round() != round {
            return Err(Error::invariant(format!(
                "ledger of player {} jumps from round {} to {}",
                player,
                prev.round(),
                round
            )));
        }
        match self
            .backoff()
            .retry("ledger insert", || store.insert_entry(entry))
            .await?
        {
            Insert::Inserted => {
                log::debug!("persisted {}", entry);
                Ok(entry.clone())
            }
            Insert::Conflict => {
                log::debug!("ledger of player {} round {} persisted elsewhere", player, round);
                self.lookup_entry(round, player)
                    .await?
                    .ok_or_else(|| Error::invariant("conflicting ledger entry is missing"))
            }
        }
    }
}
