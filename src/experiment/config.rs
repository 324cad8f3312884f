use crate::*;

/// Experiment parameters as accepted on the command line.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
    /// Total number of rounds.
    #[arg(long)]
    pub rounds: Round,
    /// Rounds each player may sit (defaults to all of them).
    #[arg(long)]
    pub prounds: Option<usize>,
    /// Length of a round in minutes.
    #[arg(long, default_value_t = 10)]
    pub minutes: i64,
    /// Percent of each role that must finish before a round closes early (0 disables).
    #[arg(long, default_value_t = 0)]
    pub round_pct: u32,
    /// Minutes a round must run before it may close early.
    #[arg(long, default_value_t = 0)]
    pub round_min: i64,
    /// Disable the prize lottery.
    #[arg(long, default_value_t = false)]
    pub no_lottery: bool,
}

impl From<Config> for Experiment {
    fn from(config: Config) -> Self {
        let prounds = config.prounds.unwrap_or(config.rounds.max(0) as usize);
        Experiment::new(config.rounds, config.minutes)
            .with_prounds(prounds)
            .with_participation(config.round_pct, config.round_min)
            .with_lottery(!config.no_lottery)
    }
}
