use crate::*;

impl Payoff {
    /// Expected payoff of every choice in the roundup's round and game,
    /// against the opposing role's average. Choices of other rounds or games
    /// are ignored.
    ///
    /// Runs before the roundup is persisted so both land in one write.
    pub fn settle(roundup: &Roundup, game: &Game, choices: &[Choice]) -> Result<Vec<Payoff>, Error> {
        let mut settled = Vec::with_capacity(choices.len());
        for role in Role::all() {
            let ref totals = Payoff::opponent_totals(game, roundup, role)?;
            for choice in choices
                .iter()
                .filter(|c| c.round() == roundup.round())
                .filter(|c| c.game() == game.id())
                .filter(|c| c.role() == role)
            {
                settled.push(Payoff::expected(choice, totals)?);
            }
        }
        Ok(settled)
    }
}
