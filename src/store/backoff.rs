use crate::*;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Bounded, randomized retry for busy store responses.
///
/// The first `patience` attempts wait a short random delay, later ones a
/// longer random delay. After `attempts` busy responses the caller gets
/// [`Error::Contention`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    attempts: usize,
    patience: usize,
    short: Duration,
    long: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: crate::RETRY_ATTEMPTS,
            patience: crate::RETRY_PATIENCE,
            short: Duration::from_millis(crate::RETRY_SHORT_MS),
            long: Duration::from_millis(crate::RETRY_LONG_MS),
        }
    }
}

impl Backoff {
    pub fn new(attempts: usize, patience: usize, short: Duration, long: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            patience,
            short,
            long,
        }
    }
    /// Defaults, with the attempt ceiling taken from `COHORT_RETRY_ATTEMPTS`
    /// when it is set and parses.
    pub fn from_env() -> Self {
        let default = Self::default();
        match std::env::var("COHORT_RETRY_ATTEMPTS").map(|s| s.parse::<usize>()) {
            Ok(Ok(attempts)) => Self::new(attempts, default.patience, default.short, default.long),
            Ok(Err(e)) => {
                log::warn!("ignoring COHORT_RETRY_ATTEMPTS: {}", e);
                default
            }
            Err(_) => default,
        }
    }
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Runs `op` until it stops reporting [`StoreError::Busy`].
    pub async fn retry<T, F, Fut>(&self, during: &str, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        for attempt in 1..=self.attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(StoreError::Failure(e)) => return Err(Error::Store(format!("{}: {}", during, e))),
                Err(StoreError::Busy) if attempt == self.attempts => break,
                Err(StoreError::Busy) => {
                    let delay = self.delay(attempt);
                    log::debug!("{} busy (attempt {}), waiting {:?}", during, attempt, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
        log::error!("{} still busy after {} attempts", during, self.attempts);
        Err(Error::Contention {
            attempts: self.attempts,
            during: during.to_string(),
        })
    }

    fn delay(&self, attempt: usize) -> Duration {
        let ceiling = if attempt <= self.patience {
            self.short
        } else {
            self.long
        };
        let millis = ceiling.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(0..=millis))
    }
}
