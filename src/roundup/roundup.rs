use crate::*;

/// Average row and column strategies of one game in one closed round.
///
/// Computed once per `(round, game)` and immutable afterwards. `count` is
/// the number of non-skipped rounds up to and including this one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Roundup {
    round: Round,
    game: GameId,
    row: Mix,
    col: Mix,
    skip: bool,
    count: i64,
}

impl Roundup {
    /// Averages the choices of every player who finished the round.
    ///
    /// Players who played only some of the round's games are left out of
    /// the average entirely. A role without contributors marks the round
    /// skipped. When the row role is the empty one its average is forced to
    /// zero after the column side has been averaged as usual.
    pub fn aggregate<F>(
        round: Round,
        game: &Game,
        prior: i64,
        choices: &[Choice],
        finished: F,
    ) -> Result<Self, Error>
    where
        F: Fn(PlayerId) -> bool,
    {
        let ref finished = finished;
        let contributors = move |role: Role| {
            choices
                .iter()
                .filter(move |c| c.game() == game.id())
                .filter(move |c| c.role() == role)
                .filter(move |c| finished(c.player()))
        };
        let col = Self::average(game.width(Role::Col), contributors(Role::Col))?;
        let row = Self::average(game.width(Role::Row), contributors(Role::Row))?;
        let skip = row.is_none() || col.is_none();
        let col = col.unwrap_or_else(|| Mix::zeros(game.p2()));
        let row = row.unwrap_or_else(|| Mix::zeros(game.p1()));
        let count = prior + if skip { 0 } else { 1 };
        Ok(Self {
            round,
            game: game.id(),
            row,
            col,
            skip,
            count,
        })
    }

    fn average<'c>(
        width: usize,
        choices: impl Iterator<Item = &'c Choice>,
    ) -> Result<Option<Mix>, Error> {
        let mut sum = Mix::zeros(width);
        let mut n = 0;
        for choice in choices {
            sum.accumulate(choice.mix())?;
            n += 1;
        }
        Ok((n > 0).then(|| sum.mean(n)))
    }

    pub fn round(&self) -> Round {
        self.round
    }
    pub fn game(&self) -> GameId {
        self.game
    }
    pub fn row(&self) -> &Mix {
        &self.row
    }
    pub fn col(&self) -> &Mix {
        &self.col
    }
    pub fn mix(&self, role: Role) -> &Mix {
        match role {
            Role::Row => &self.row,
            Role::Col => &self.col,
        }
    }
    pub fn skip(&self) -> bool {
        self.skip
    }
    pub fn count(&self) -> i64 {
        self.count
    }
}

impl From<(Round, GameId, Mix, Mix, bool, i64)> for Roundup {
    fn from((round, game, row, col, skip, count): (Round, GameId, Mix, Mix, bool, i64)) -> Self {
        Self {
            round,
            game,
            row,
            col,
            skip,
            count,
        }
    }
}

impl std::fmt::Display for Roundup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "round {} game {}: row {} col {}{}",
            self.round,
            self.game,
            self.row,
            self.col,
            if self.skip { " (skip)" } else { "" }
        )
    }
}
