use crate::*;

/// The singleton configuration and state record of an experiment.
///
/// Only round advancement and finalization mutate it once it exists, and
/// they do so through transactional store commits.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Experiment {
    pub(crate) phase: Phase,
    pub(crate) round: Round,
    pub(crate) rounds: Round,
    pub(crate) prounds: usize,
    pub(crate) minutes: i64,
    pub(crate) round_pct: u32,
    pub(crate) round_min: i64,
    pub(crate) start: Option<Stamp>,
    pub(crate) began: Option<Stamp>,
    pub(crate) total: Option<Tickets>,
    pub(crate) lottery: bool,
}

impl Experiment {
    /// A fresh experiment of `rounds` rounds lasting `minutes` each.
    /// Every player may sit all rounds, participation advancement is off
    /// and the lottery is on.
    pub fn new(rounds: Round, minutes: i64) -> Self {
        Self {
            phase: Phase::New,
            round: -1,
            rounds,
            prounds: rounds.max(0) as usize,
            minutes,
            round_pct: 0,
            round_min: 0,
            start: None,
            began: None,
            total: None,
            lottery: true,
        }
    }
    pub fn with_prounds(mut self, prounds: usize) -> Self {
        self.prounds = prounds;
        self
    }
    /// Advance early once `pct` percent of both roles finished the round
    /// and at least `min` minutes have passed.
    pub fn with_participation(mut self, pct: u32, min: i64) -> Self {
        self.round_pct = pct;
        self.round_min = min;
        self
    }
    pub fn with_lottery(mut self, lottery: bool) -> Self {
        self.lottery = lottery;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn round(&self) -> Round {
        self.round
    }
    pub fn rounds(&self) -> Round {
        self.rounds
    }
    pub fn prounds(&self) -> usize {
        self.prounds
    }
    pub fn minutes(&self) -> i64 {
        self.minutes
    }
    pub fn round_pct(&self) -> u32 {
        self.round_pct
    }
    pub fn round_min(&self) -> i64 {
        self.round_min
    }
    pub fn start(&self) -> Option<Stamp> {
        self.start
    }
    pub fn began(&self) -> Option<Stamp> {
        self.began
    }
    pub fn total(&self) -> Option<Tickets> {
        self.total
    }
    pub fn lottery(&self) -> bool {
        self.lottery
    }

    /// Length of one round in seconds.
    pub fn period(&self) -> i64 {
        self.minutes * 60
    }
    /// Every round has been played.
    pub fn is_finished(&self) -> bool {
        self.round >= self.rounds
    }
    /// Rounds strictly below this index are closed and may be aggregated.
    pub fn closed(&self) -> Round {
        self.round.clamp(0, self.rounds.max(0))
    }
    /// The participation policy may be consulted at `now`.
    pub fn participation_due(&self, now: Stamp) -> bool {
        self.round_pct > 0
            && self.round >= 0
            && self
                .began
                .map_or(false, |began| now - began >= self.round_min * 60)
    }

    /// Configuration sanity, checked once when the experiment is created.
    pub fn validate(&self) -> Result<(), Rejection> {
        if self.rounds <= 0 {
            return Err(Rejection::Malformed(format!("rounds = {}", self.rounds)));
        }
        if self.minutes <= 0 {
            return Err(Rejection::Malformed(format!("minutes = {}", self.minutes)));
        }
        if self.round_pct > 100 {
            return Err(Rejection::Malformed(format!("round_pct = {}", self.round_pct)));
        }
        if self.round_min < 0 {
            return Err(Rejection::Malformed(format!("round_min = {}", self.round_min)));
        }
        if self.phase != Phase::New || self.round != -1 {
            return Err(Rejection::Malformed("experiment must begin new".into()));
        }
        Ok(())
    }

    pub(crate) fn started(&mut self, at: Stamp) {
        self.phase = Phase::Started;
        self.start = Some(at);
    }
    pub(crate) fn opened(&mut self, round: Round, at: Stamp) {
        self.round = round;
        self.began = Some(at);
    }
    pub(crate) fn allotted(&mut self, total: Tickets) {
        self.phase = Phase::Prewin;
        self.total = Some(total);
    }
    pub(crate) fn drawn(&mut self) {
        self.phase = Phase::Postwin;
    }
}

impl std::fmt::Display for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} round {}/{}", self.phase, self.round, self.rounds)
    }
}
