use crate::*;

/// A player's admission to one round, in one role.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Seat {
    round: Round,
    player: PlayerId,
    role: Role,
    completed: usize,
}

impl Seat {
    pub fn new(round: Round, player: PlayerId, role: Role) -> Self {
        Self {
            round,
            player,
            role,
            completed: 0,
        }
    }
    pub fn round(&self) -> Round {
        self.round
    }
    pub fn player(&self) -> PlayerId {
        self.player
    }
    pub fn role(&self) -> Role {
        self.role
    }
    /// Games this player has submitted a choice for in this round.
    pub fn completed(&self) -> usize {
        self.completed
    }
    /// Played every game of the round.
    pub fn finished(&self, games: usize) -> bool {
        self.completed == games
    }
    pub(crate) fn complete(&mut self) {
        self.completed += 1;
    }
}

impl From<(Round, PlayerId, Role, usize)> for Seat {
    fn from((round, player, role, completed): (Round, PlayerId, Role, usize)) -> Self {
        Self {
            round,
            player,
            role,
            completed,
        }
    }
}
