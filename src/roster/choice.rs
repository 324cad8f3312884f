use crate::*;

/// A submitted mixed strategy for one game of one round.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Choice {
    round: Round,
    player: PlayerId,
    game: GameId,
    role: Role,
    mix: Mix,
}

impl Choice {
    pub fn new(round: Round, player: PlayerId, game: GameId, role: Role, mix: Mix) -> Self {
        Self {
            round,
            player,
            game,
            role,
            mix,
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
    pub fn role(&self) -> Role {
        self.role
    }
    pub fn mix(&self) -> &Mix {
        &self.mix
    }
}
