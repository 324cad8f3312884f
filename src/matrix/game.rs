use crate::*;

/// A two-role normal-form game with exact payoffs.
///
/// `payoffs` is the dense row-major matrix of `(row, col)` pairs, flattened:
/// the pair for row action `i` and column action `j` sits at
/// `2 * (i * p2 + j)`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Game {
    id: GameId,
    p1: usize,
    p2: usize,
    payoffs: Vec<Ratio>,
}

impl Game {
    pub fn new(id: GameId, p1: usize, p2: usize, payoffs: Vec<Ratio>) -> Result<Self, Rejection> {
        if p1 == 0 || p2 == 0 {
            return Err(Rejection::Malformed(format!(
                "game {} has an empty strategy space {}x{}",
                id, p1, p2
            )));
        }
        if payoffs.len() != 2 * p1 * p2 {
            return Err(Rejection::Malformed(format!(
                "game {} is {}x{} but has {} payoff entries",
                id,
                p1,
                p2,
                payoffs.len()
            )));
        }
        Ok(Self {
            id,
            p1,
            p2,
            payoffs,
        })
    }
    pub fn id(&self) -> GameId {
        self.id
    }
    pub fn p1(&self) -> usize {
        self.p1
    }
    pub fn p2(&self) -> usize {
        self.p2
    }
    pub fn payoffs(&self) -> &[Ratio] {
        &self.payoffs
    }
    /// Number of actions available to `role`.
    pub fn width(&self, role: Role) -> usize {
        match role {
            Role::Row => self.p1,
            Role::Col => self.p2,
        }
    }
    /// Payoff to `role` when it plays `own` and the opponent plays `other`.
    pub fn payoff(&self, role: Role, own: usize, other: usize) -> &Ratio {
        match role {
            Role::Row => &self.payoffs[2 * (own * self.p2 + other)],
            Role::Col => &self.payoffs[2 * (other * self.p2 + own) + 1],
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "game {} ({}x{})", self.id, self.p1, self.p2)?;
        for i in 0..self.p1 {
            let cells = (0..self.p2)
                .map(|j| {
                    format!(
                        "({}, {})",
                        self.payoff(Role::Row, i, j),
                        self.payoff(Role::Col, j, i)
                    )
                })
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "  {}", cells)?;
        }
        Ok(())
    }
}
