/// Failure reported by a store adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Locked or busy; the same call may succeed if retried.
    Busy,
    /// Anything else. Not retried.
    Failure(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "store busy"),
            Self::Failure(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for StoreError {}

/// Result of a keyed, write-once insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Inserted,
    /// A row with the same key already exists. The existing row is kept.
    Conflict,
}

/// Result of recording a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// The player already chose in this game this round.
    Duplicate,
    /// The round stopped being current before the choice could be recorded.
    Closed,
    /// No seat for the player in the choice's round.
    Unseated,
}
