use crate::*;
use std::cmp::Ordering;

impl<S: Store> Lab<S> {
    /// Moves the experiment to the round that time or participation
    /// justifies. Returns whether this call made the transition.
    ///
    /// Idempotent and safe to race: the commit re-reads the round inside the
    /// transaction and quietly backs off if another process already moved it.
    pub async fn advance(&self, now: Stamp) -> Result<bool, Error> {
        let experiment = self.experiment().await?;
        if experiment.phase() != Phase::Started || experiment.is_finished() {
            return Ok(false);
        }
        let census = match experiment.participation_due(now) {
            false => None,
            true => {
                let games = self.games().await?.len();
                let store = self.store();
                let round = experiment.round();
                let seats = self
                    .backoff()
                    .retry("seats", || store.seats(round))
                    .await?;
                Some(Census::count(&seats, games))
            }
        };
        let current = experiment.round();
        let target = experiment.target(census.as_ref(), now);
        match target.cmp(&current) {
            Ordering::Equal => Ok(false),
            Ordering::Less => Err(Error::invariant(format!(
                "clock regression: round {} would move back to {} at {}",
                current, target, now
            ))),
            Ordering::Greater => {
                let store = self.store();
                let committed = self
                    .backoff()
                    .retry("round commit", || store.commit_round(target, now))
                    .await?;
                match committed {
                    true => log::info!("advanced round {} -> {}", current, target),
                    false => log::debug!("round {} already advanced elsewhere", current),
                }
                Ok(committed)
            }
        }
    }
}
