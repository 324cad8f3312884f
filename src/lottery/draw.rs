use crate::*;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Seeded draw without replacement over a ticket line.
///
/// Each pick is a uniform ticket in `[0, total)`; the holder is found by a
/// linear scan in line order. A holder already picked is skipped and a fresh
/// ticket is drawn, so ranges never shrink between picks.
pub struct Draw<'a> {
    line: &'a [Allotment],
    total: Tickets,
    rng: StdRng,
}

impl<'a> Draw<'a> {
    pub fn new(line: &'a [Allotment], seed: u64) -> Self {
        Self {
            line,
            total: Allotment::total(line),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Picks up to `count` distinct winners and reports every player's outcome,
    /// winners first in draw order, then the rest in line order.
    ///
    /// `count` is capped at the number of players holding at least one
    /// ticket, since nobody else can ever be picked.
    pub fn winners(mut self, count: usize) -> Result<Vec<Winner>, Error> {
        let holders = self.line.iter().filter(|a| a.tickets() > 0).count();
        let count = count.min(holders);
        let mut picks = Vec::<(PlayerId, Tickets)>::with_capacity(count);
        while picks.len() < count {
            let ticket = self.rng.random_range(0..self.total);
            let holder = self.holder(ticket)?;
            if picks.iter().any(|&(p, _)| p == holder) {
                log::debug!("ticket {} repeats player {}, redrawing", ticket, holder);
                continue;
            }
            picks.push((holder, ticket));
        }
        let winners = picks
            .iter()
            .enumerate()
            .map(|(rank, &(player, ticket))| Winner::won(player, rank, ticket));
        let losers = self
            .line
            .iter()
            .map(Allotment::player)
            .filter(|p| !picks.iter().any(|&(w, _)| w == *p))
            .map(Winner::lost);
        Ok(winners.chain(losers).collect())
    }

    fn holder(&self, ticket: Tickets) -> Result<PlayerId, Error> {
        self.line
            .iter()
            .find(|a| a.contains(ticket))
            .map(Allotment::player)
            .ok_or_else(|| Error::invariant(format!("ticket {} lies in no range", ticket)))
    }
}
