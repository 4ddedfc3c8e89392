// Keyexpand Restart Policy
// What a worker does after its device loop fails

use std::time::Duration;

/// Exponential backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(5),
            max_attempts: Some(5),
        }
    }
}

/// Restart behaviour for failed device workers.
///
/// The default is `Never`: a failed device simply stops contributing
/// expansions while the others keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    #[default]
    Never,
    Backoff(Backoff),
}

impl RestartPolicy {
    /// Delay before restart number `attempt` (1-based), or `None` to give up.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match self {
            RestartPolicy::Never => None,
            RestartPolicy::Backoff(backoff) => {
                if attempt == 0 || backoff.max_attempts.is_some_and(|max| attempt > max) {
                    return None;
                }
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                Some(
                    backoff
                        .initial
                        .checked_mul(factor)
                        .map_or(backoff.max, |d| d.min(backoff.max)),
                )
            }
        }
    }
}
