use crate::*;

/// A player's contiguous range `[start, start + tickets)` in the ticket line.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Allotment {
    player: PlayerId,
    start: Tickets,
    tickets: Tickets,
}

impl Allotment {
    /// Lays out `(player, tickets)` pairs end to end, in the order given.
    ///
    /// A negative minimum is lifted to zero by shifting everyone by the same
    /// amount, which keeps relative standing intact.
    pub fn allot(ledger: &[(PlayerId, Tickets)]) -> Vec<Self> {
        let offset = ledger.iter().map(|&(_, t)| t).min().unwrap_or(0).min(0);
        let mut cursor = 0;
        ledger
            .iter()
            .map(|&(player, tickets)| {
                let tickets = tickets - offset;
                let start = cursor;
                cursor += tickets;
                Self {
                    player,
                    start,
                    tickets,
                }
            })
            .collect()
    }
    /// Sum of every allotted range.
    pub fn total(allotments: &[Self]) -> Tickets {
        allotments.iter().map(|a| a.tickets).sum()
    }
    pub fn player(&self) -> PlayerId {
        self.player
    }
    pub fn start(&self) -> Tickets {
        self.start
    }
    pub fn tickets(&self) -> Tickets {
        self.tickets
    }
    pub fn end(&self) -> Tickets {
        self.start + self.tickets
    }
    pub fn contains(&self, ticket: Tickets) -> bool {
        self.start <= ticket && ticket < self.end()
    }
}

impl From<(PlayerId, Tickets, Tickets)> for Allotment {
    fn from((player, start, tickets): (PlayerId, Tickets, Tickets)) -> Self {
        Self {
            player,
            start,
            tickets,
        }
    }
}
