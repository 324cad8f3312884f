//! Round advancement, roundup aggregation and prize lottery for
//! multi-round mixed-strategy experiments.
//!
//! Many short-lived processes share one [`Store`]. Each of them drives the
//! same [`Lab`] operations, and every memoized record (roundups, payoffs,
//! lottery entries) is persisted exactly once no matter how many processes
//! computed it.
pub mod advance;
pub mod error;
pub mod exact;
pub mod experiment;
pub mod lab;
pub mod lottery;
pub mod matrix;
pub mod payoff;
pub mod roster;
pub mod roundup;
pub mod store;

pub use advance::*;
pub use error::*;
pub use exact::*;
pub use experiment::*;
pub use lab::*;
pub use lottery::*;
pub use matrix::*;
pub use payoff::*;
pub use roster::*;
pub use roundup::*;
pub use store::*;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Round index. −1 before the first round opens.
pub type Round = i64;
/// Wall-clock instant in unix seconds.
pub type Stamp = i64;
/// Participant identity, assigned upstream.
pub type PlayerId = i64;
/// Game identity, assigned upstream.
pub type GameId = i64;
/// Whole lottery tickets and positions within the ticket line.
pub type Tickets = i64;
/// Strategy weights, payoffs and ledger sums. Never floating point.
pub type Ratio = num_rational::BigRational;

// ============================================================================
// STORE CONTENTION
// Randomized backoff on busy/locked responses, bounded instead of unending.
// ============================================================================
/// Attempts before a busy store surfaces as `Error::Contention`.
pub const RETRY_ATTEMPTS: usize = 64;
/// Attempts that use the short delay before switching to the long one.
pub const RETRY_PATIENCE: usize = 8;
/// Upper bound of the short random delay (milliseconds).
pub const RETRY_SHORT_MS: u64 = 25;
/// Upper bound of the long random delay (milliseconds).
pub const RETRY_LONG_MS: u64 = 500;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
#[cfg(feature = "server")]
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Current wall-clock time in unix seconds.
pub fn now() -> Stamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as Stamp)
        .unwrap_or_default()
}
