use super::*;

/// Everything the engine can surface to a caller.
///
/// Lock contention and unique-key races are absorbed locally (retried or
/// re-read); they only reach this type once the retry budget is spent.
#[derive(Debug, Clone)]
pub enum Error {
    /// The store stayed busy through every retry attempt.
    Contention { attempts: usize, during: String },
    /// The request is not valid for the current experiment state.
    Rejected(Rejection),
    /// A computed or persisted value broke an arithmetic or uniqueness
    /// invariant. Indicates a logic bug.
    Invariant(String),
    /// The store failed for a reason other than contention.
    Store(String),
}

impl Error {
    pub fn invariant(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("invariant violated: {}", msg);
        Self::Invariant(msg)
    }
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contention { attempts, during } => {
                write!(f, "store contention after {} attempts: {}", attempts, during)
            }
            Self::Rejected(r) => write!(f, "rejected: {}", r),
            Self::Invariant(s) => write!(f, "invariant violated: {}", s),
            Self::Store(s) => write!(f, "store failure: {}", s),
        }
    }
}

impl std::error::Error for Error {}
