use crate::*;

impl<S: Store> Lab<S> {
    /// Closes the experiment once every round is over: resolves each
    /// eligible player's final ledger and lays their tickets out in a line,
    /// ordered by registration key. Returns whether this call committed.
    pub async fn finish(&self) -> Result<bool, Error> {
        let experiment = self.experiment().await?;
        match experiment.phase() {
            Phase::New => return Err(Rejection::NotStarted.into()),
            Phase::Prewin | Phase::Postwin => return Ok(false),
            Phase::Started if !experiment.is_finished() => {
                return Err(Rejection::RoundsIncomplete {
                    round: experiment.round(),
                    rounds: experiment.rounds(),
                }
                .into());
            }
            Phase::Started => {}
        }
        let games = self.games().await?;
        let mut eligible = self
            .players()
            .await?
            .into_iter()
            .filter(|p| !p.panel())
            .collect::<Vec<_>>();
        eligible.sort_by_key(Player::rank);
        let mut ledger = Vec::with_capacity(eligible.len());
        for player in eligible.iter() {
            let entry = self
                .ledger_through(experiment.rounds() - 1, player.id(), &games)
                .await?;
            ledger.push((player.id(), entry.tickets()));
        }
        let line = match experiment.lottery() {
            true => Allotment::allot(&ledger),
            false => Vec::new(),
        };
        let total = Allotment::total(&line);
        if let Some(bad) = line.iter().find(|a| a.tickets() < 0) {
            return Err(Error::invariant(format!("negative allotment {:?}", bad)));
        }
        let store = self.store();
        let ref line = line;
        let committed = self
            .backoff()
            .retry("finish", || store.commit_finish(line, total))
            .await?;
        match committed {
            true => log::info!("allotted {} tickets across {} players", total, line.len()),
            false => log::debug!("experiment already finished elsewhere"),
        }
        Ok(committed)
    }

    /// Draws up to `count` distinct winners from the committed ticket line.
    /// Returns whether this call recorded the outcome.
    pub async fn draw(&self, count: usize, seed: u64) -> Result<bool, Error> {
        let experiment = self.experiment().await?;
        match experiment.phase() {
            Phase::New | Phase::Started => return Err(Rejection::NotFinished.into()),
            Phase::Postwin => {
                log::warn!("winners were already drawn");
                return Ok(false);
            }
            Phase::Prewin => {}
        }
        if !experiment.lottery() {
            return Err(Rejection::LotteryDisabled.into());
        }
        let store = self.store();
        let line = self.backoff().retry("allotments", || store.allotments()).await?;
        if Some(Allotment::total(&line)) != experiment.total() {
            return Err(Error::invariant(format!(
                "ticket line sums to {} but {:?} were allotted",
                Allotment::total(&line),
                experiment.total()
            )));
        }
        let ref outcome = Draw::new(&line, seed).winners(count)?;
        let committed = self
            .backoff()
            .retry("draw", || store.commit_draw(outcome))
            .await?;
        match committed {
            true => log::info!(
                "drew {} winners with seed {}",
                outcome.iter().filter(|w| w.is_winner()).count(),
                seed
            ),
            false => log::warn!("winners were drawn elsewhere"),
        }
        Ok(committed)
    }

    /// [`Lab::finish`] followed by [`Lab::draw`].
    pub async fn finalize_and_draw(&self, count: usize, seed: u64) -> Result<bool, Error> {
        self.finish().await?;
        self.draw(count, seed).await
    }
}
