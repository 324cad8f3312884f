use crate::*;
use num_traits::Zero;

/// One player's lottery ledger line for one round.
///
/// `current` is what the round contributed, `aggregate` the running total
/// through this round. Tickets are the aggregate rounded up.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Entry {
    round: Round,
    player: PlayerId,
    current: Ratio,
    aggregate: Ratio,
    tickets: Tickets,
}

impl Entry {
    /// The ledger before round zero.
    pub fn genesis(player: PlayerId) -> Self {
        Self {
            round: -1,
            player,
            current: Ratio::zero(),
            aggregate: Ratio::zero(),
            tickets: 0,
        }
    }
    /// Extends `prev` by one round contributing `current`.
    pub fn extend(prev: &Entry, current: Ratio) -> Result<Self, Error> {
        let aggregate = &prev.aggregate + &current;
        let tickets = ceil(&aggregate)?;
        Ok(Self {
            round: prev.round + 1,
            player: prev.player,
            current,
            aggregate,
            tickets,
        })
    }
    pub fn round(&self) -> Round {
        self.round
    }
    pub fn player(&self) -> PlayerId {
        self.player
    }
    pub fn current(&self) -> &Ratio {
        &self.current
    }
    pub fn aggregate(&self) -> &Ratio {
        &self.aggregate
    }
    pub fn tickets(&self) -> Tickets {
        self.tickets
    }
}

impl From<(Round, PlayerId, Ratio, Ratio, Tickets)> for Entry {
    fn from((round, player, current, aggregate, tickets): (Round, PlayerId, Ratio, Ratio, Tickets)) -> Self {
        Self {
            round,
            player,
            current,
            aggregate,
            tickets,
        }
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "player {} round {}: +{} = {} ({} tickets)",
            self.player, self.round, self.current, self.aggregate, self.tickets
        )
    }
}
