use crate::*;
use num_traits::Zero;

/// A player's expected payoff in one game of one round.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Payoff {
    round: Round,
    player: PlayerId,
    game: GameId,
    value: Ratio,
}

impl Payoff {
    pub fn new(round: Round, player: PlayerId, game: GameId, value: Ratio) -> Self {
        Self {
            round,
            player,
            game,
            value,
        }
    }
    pub fn round(&self) -> Round {
        self.round
    }
    pub fn player(&self) -> PlayerId {
        self.player
    }
    pub fn game(&self) -> GameId {
        self.game
    }
    pub fn value(&self) -> &Ratio {
        &self.value
    }

    /// Value of each of `role`'s actions against the opponent's average mix.
    pub fn opponent_totals(game: &Game, roundup: &Roundup, role: Role) -> Result<Vec<Ratio>, Error> {
        let opponent = roundup.mix(role.opponent());
        if opponent.len() != game.width(role.opponent()) {
            return Err(Error::invariant(format!(
                "roundup of game {} round {} has {} {} weights, game has {}",
                game.id(),
                roundup.round(),
                opponent.len(),
                role.opponent(),
                game.width(role.opponent())
            )));
        }
        Ok((0..game.width(role))
            .map(|own| {
                opponent
                    .weights()
                    .iter()
                    .enumerate()
                    .map(|(other, w)| w * game.payoff(role, own, other))
                    .fold(Ratio::zero(), |acc, x| acc + x)
            })
            .collect())
    }

    /// Expected payoff of a submitted choice against precomputed totals.
    pub fn expected(choice: &Choice, totals: &[Ratio]) -> Result<Self, Error> {
        Ok(Self::new(
            choice.round(),
            choice.player(),
            choice.game(),
            choice.mix().dot(totals)?,
        ))
    }
}
