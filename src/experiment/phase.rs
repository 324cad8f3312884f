/// Lifecycle of an experiment. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    /// Configured; games and players may still be added.
    New,
    /// Rounds are running.
    Started,
    /// Ledger finalized and tickets allotted; waiting for the draw.
    Prewin,
    /// Winners drawn.
    Postwin,
}

impl From<Phase> for i16 {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::New => 0,
            Phase::Started => 1,
            Phase::Prewin => 2,
            Phase::Postwin => 3,
        }
    }
}

impl TryFrom<i16> for Phase {
    type Error = anyhow::Error;
    fn try_from(n: i16) -> Result<Self, Self::Error> {
        match n {
            0 => Ok(Phase::New),
            1 => Ok(Phase::Started),
            2 => Ok(Phase::Prewin),
            3 => Ok(Phase::Postwin),
            _ => Err(anyhow::anyhow!("invalid phase {}", n)),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::New => write!(f, "NEW"),
            Phase::Started => write!(f, "STARTED"),
            Phase::Prewin => write!(f, "PREWIN"),
            Phase::Postwin => write!(f, "POSTWIN"),
        }
    }
}
