use crate::*;

/// Requests that are refused because the experiment is in the wrong state
/// for them, or because the caller sent something the engine cannot use.
/// These go back to the caller as a rejected request, never as a crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotConfigured,
    AlreadyConfigured,
    NotStarted,
    AlreadyStarted,
    NoGames,
    RoundsIncomplete { round: Round, rounds: Round },
    RoundOpen { round: Round },
    WrongRound { round: Round, current: Round },
    RoundClosed { round: Round },
    UnknownGame(GameId),
    UnknownPlayer(PlayerId),
    AlreadyRegistered(PlayerId),
    DuplicateGame(GameId),
    NotAdmitted { round: Round, player: PlayerId },
    AlreadyAdmitted { round: Round, player: PlayerId },
    BudgetExhausted { player: PlayerId, prounds: usize },
    AlreadySubmitted { round: Round, player: PlayerId, game: GameId },
    LotteryDisabled,
    NotFinished,
    Malformed(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "experiment is not configured"),
            Self::AlreadyConfigured => write!(f, "experiment is already configured"),
            Self::NotStarted => write!(f, "experiment has not started"),
            Self::AlreadyStarted => write!(f, "experiment has already started"),
            Self::NoGames => write!(f, "experiment has no games"),
            Self::RoundsIncomplete { round, rounds } => {
                write!(f, "round {} of {} still in progress", round, rounds)
            }
            Self::RoundOpen { round } => write!(f, "round {} is not closed", round),
            Self::WrongRound { round, current } => {
                write!(f, "round {} is not the current round {}", round, current)
            }
            Self::RoundClosed { round } => write!(f, "round {} closed during submission", round),
            Self::UnknownGame(id) => write!(f, "unknown game {}", id),
            Self::UnknownPlayer(id) => write!(f, "unknown player {}", id),
            Self::AlreadyRegistered(id) => write!(f, "player {} already registered", id),
            Self::DuplicateGame(id) => write!(f, "game {} already exists", id),
            Self::NotAdmitted { round, player } => {
                write!(f, "player {} not admitted to round {}", player, round)
            }
            Self::AlreadyAdmitted { round, player } => {
                write!(f, "player {} already admitted to round {}", player, round)
            }
            Self::BudgetExhausted { player, prounds } => {
                write!(f, "player {} already played {} rounds", player, prounds)
            }
            Self::AlreadySubmitted {
                round,
                player,
                game,
            } => write!(
                f,
                "player {} already chose in game {} of round {}",
                player, game, round
            ),
            Self::LotteryDisabled => write!(f, "lottery is disabled"),
            Self::NotFinished => write!(f, "lottery tickets have not been allotted"),
            Self::Malformed(s) => write!(f, "malformed input: {}", s),
        }
    }
}

impl std::error::Error for Rejection {}
