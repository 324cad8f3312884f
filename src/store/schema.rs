//! Table names and DDL for the PostgreSQL store.
use const_format::concatcp;

/// Singleton experiment record.
#[rustfmt::skip]
pub const EXPERIMENT: &str = "experiment";
/// Payoff matrices.
#[rustfmt::skip]
pub const GAMES:      &str = "games";
/// Registered participants and their ticket-line ordering keys.
#[rustfmt::skip]
pub const PLAYERS:    &str = "players";
/// Round admissions with role and completed-game counter.
#[rustfmt::skip]
pub const SEATS:      &str = "seats";
/// Submitted mixed strategies.
#[rustfmt::skip]
pub const CHOICES:    &str = "choices";
/// Memoized per-round average strategies.
#[rustfmt::skip]
pub const ROUNDUPS:   &str = "roundups";
/// Per-game expected payoffs.
#[rustfmt::skip]
pub const PAYOFFS:    &str = "payoffs";
/// Cumulative lottery ledger.
#[rustfmt::skip]
pub const LOTTERY:    &str = "lottery";
/// Ticket ranges written at finalization.
#[rustfmt::skip]
pub const ALLOTMENTS: &str = "allotments";
/// Draw outcomes.
#[rustfmt::skip]
pub const WINNERS:    &str = "winners";

/// Columns each table is read back with. Rows are hydrated by name, so
/// these only need to exist in [`CREATES`], in any order.
#[rustfmt::skip]
pub const EXPERIMENT_COLUMNS: &str = "phase, round, rounds, prounds, minutes, round_pct, round_min, start, began, total, lottery";
#[rustfmt::skip]
pub const GAME_COLUMNS:       &str = "id, p1, p2, payoffs";
#[rustfmt::skip]
pub const PLAYER_COLUMNS:     &str = "id, ord, panel";
#[rustfmt::skip]
pub const SEAT_COLUMNS:       &str = "round, player, role, completed";
#[rustfmt::skip]
pub const CHOICE_COLUMNS:     &str = "round, player, game, role, mix";
#[rustfmt::skip]
pub const ROUNDUP_COLUMNS:    &str = "round, game, row_mix, col_mix, skip, count";
#[rustfmt::skip]
pub const PAYOFF_COLUMNS:     &str = "round, player, game, value";
#[rustfmt::skip]
pub const ENTRY_COLUMNS:      &str = "round, player, current, aggregate, tickets";
#[rustfmt::skip]
pub const ALLOTMENT_COLUMNS:  &str = "player, start, tickets";
#[rustfmt::skip]
pub const WINNER_COLUMNS:     &str = "player, won, rank, ticket";

/// `CREATE TABLE IF NOT EXISTS` for every table. Rationals are stored as
/// `p/q` text so no precision is lost in the database.
#[rustfmt::skip]
pub const CREATES: &str = concatcp!(
    "CREATE TABLE IF NOT EXISTS ", EXPERIMENT, " (",
        "id         SMALLINT PRIMARY KEY CHECK (id = 1), ",
        "phase      SMALLINT NOT NULL, ",
        "round      BIGINT   NOT NULL, ",
        "rounds     BIGINT   NOT NULL, ",
        "prounds    BIGINT   NOT NULL, ",
        "minutes    BIGINT   NOT NULL, ",
        "round_pct  INTEGER  NOT NULL, ",
        "round_min  BIGINT   NOT NULL, ",
        "start      BIGINT, ",
        "began      BIGINT, ",
        "total      BIGINT, ",
        "lottery    BOOLEAN  NOT NULL",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", GAMES, " (",
        "id         BIGINT   PRIMARY KEY, ",
        "p1         INTEGER  NOT NULL, ",
        "p2         INTEGER  NOT NULL, ",
        "payoffs    TEXT[]   NOT NULL",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", PLAYERS, " (",
        "id         BIGINT   PRIMARY KEY, ",
        "ord        BIGINT   NOT NULL, ",
        "panel      BOOLEAN  NOT NULL",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", SEATS, " (",
        "round      BIGINT   NOT NULL, ",
        "player     BIGINT   NOT NULL, ",
        "role       SMALLINT NOT NULL, ",
        "completed  INTEGER  NOT NULL DEFAULT 0, ",
        "PRIMARY KEY (round, player)",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", CHOICES, " (",
        "round      BIGINT   NOT NULL, ",
        "game       BIGINT   NOT NULL, ",
        "player     BIGINT   NOT NULL, ",
        "role       SMALLINT NOT NULL, ",
        "mix        TEXT[]   NOT NULL, ",
        "PRIMARY KEY (round, game, player)",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", ROUNDUPS, " (",
        "round      BIGINT   NOT NULL, ",
        "game       BIGINT   NOT NULL, ",
        "row_mix    TEXT[]   NOT NULL, ",
        "col_mix    TEXT[]   NOT NULL, ",
        "skip       BOOLEAN  NOT NULL, ",
        "count      BIGINT   NOT NULL, ",
        "PRIMARY KEY (round, game)",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", PAYOFFS, " (",
        "round      BIGINT   NOT NULL, ",
        "player     BIGINT   NOT NULL, ",
        "game       BIGINT   NOT NULL, ",
        "value      TEXT     NOT NULL, ",
        "PRIMARY KEY (round, player, game)",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", LOTTERY, " (",
        "round      BIGINT   NOT NULL, ",
        "player     BIGINT   NOT NULL, ",
        "current    TEXT     NOT NULL, ",
        "aggregate  TEXT     NOT NULL, ",
        "tickets    BIGINT   NOT NULL, ",
        "PRIMARY KEY (round, player)",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", ALLOTMENTS, " (",
        "player     BIGINT   PRIMARY KEY, ",
        "start      BIGINT   NOT NULL, ",
        "tickets    BIGINT   NOT NULL",
    "); ",
    "CREATE TABLE IF NOT EXISTS ", WINNERS, " (",
        "player     BIGINT   PRIMARY KEY, ",
        "won        BOOLEAN  NOT NULL, ",
        "rank       INTEGER, ",
        "ticket     BIGINT",
    ");"
);

#[cfg(test)]
mod tests {
    use super::*;

    /// Column names declared for `table` in [`CREATES`].
    fn declared(table: &str) -> Vec<&'static str> {
        CREATES
            .split("CREATE TABLE IF NOT EXISTS ")
            .find_map(|ddl| ddl.strip_prefix(table)?.strip_prefix(" ("))
            .map(|body| {
                body.split(',')
                    .filter_map(|column| column.split_whitespace().next())
                    .filter(|name| name.chars().all(|c| c.is_ascii_lowercase() || c == '_' || c.is_ascii_digit()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn every_table_is_created() {
        for table in [EXPERIMENT, GAMES, PLAYERS, SEATS, CHOICES, ROUNDUPS, PAYOFFS, LOTTERY, ALLOTMENTS, WINNERS] {
            assert!(!declared(table).is_empty(), "{} has no columns", table);
        }
    }

    #[test]
    fn read_columns_exist_in_their_tables() {
        for (table, columns) in [
            (EXPERIMENT, EXPERIMENT_COLUMNS),
            (GAMES, GAME_COLUMNS),
            (PLAYERS, PLAYER_COLUMNS),
            (SEATS, SEAT_COLUMNS),
            (CHOICES, CHOICE_COLUMNS),
            (ROUNDUPS, ROUNDUP_COLUMNS),
            (PAYOFFS, PAYOFF_COLUMNS),
            (LOTTERY, ENTRY_COLUMNS),
            (ALLOTMENTS, ALLOTMENT_COLUMNS),
            (WINNERS, WINNER_COLUMNS),
        ] {
            let ref declared = declared(table);
            for column in columns.split(", ") {
                assert!(declared.contains(&column), "{}.{} is not declared", table, column);
            }
        }
    }

    #[test]
    fn constraint_clauses_are_not_columns() {
        assert_eq!(declared(SEATS), vec!["round", "player", "role", "completed"]);
        assert_eq!(declared(WINNERS), vec!["player", "won", "rank", "ticket"]);
    }
}
