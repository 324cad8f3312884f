use crate::*;

/// Outcome of the draw for one lottery player.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Winner {
    player: PlayerId,
    won: bool,
    rank: Option<usize>,
    ticket: Option<Tickets>,
}

impl Winner {
    pub fn won(player: PlayerId, rank: usize, ticket: Tickets) -> Self {
        Self {
            player,
            won: true,
            rank: Some(rank),
            ticket: Some(ticket),
        }
    }
    pub fn lost(player: PlayerId) -> Self {
        Self {
            player,
            won: false,
            rank: None,
            ticket: None,
        }
    }
    pub fn player(&self) -> PlayerId {
        self.player
    }
    pub fn is_winner(&self) -> bool {
        self.won
    }
    /// Draw order, zero-based.
    pub fn rank(&self) -> Option<usize> {
        self.rank
    }
    /// The random ticket value that selected this player.
    pub fn ticket(&self) -> Option<Tickets> {
        self.ticket
    }
}

impl From<(PlayerId, bool, Option<usize>, Option<Tickets>)> for Winner {
    fn from((player, won, rank, ticket): (PlayerId, bool, Option<usize>, Option<Tickets>)) -> Self {
        Self {
            player,
            won,
            rank,
            ticket,
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.rank, self.ticket) {
            (Some(rank), Some(ticket)) => {
                write!(f, "#{} player {} (ticket {})", rank, self.player, ticket)
            }
            _ => write!(f, "player {} did not win", self.player),
        }
    }
}
