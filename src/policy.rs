//! Rate-limit and retry configuration.
//!
//! Two distinct delays drive the controller's pacing:
//! - the **inter-request delay**, a courtesy pause before every remote call so
//!   the server is not hammered, and
//! - the **retry backoff**, a longer pause after a failed attempt, doubling
//!   per attempt up to a cap, with a little random jitter. When things are
//!   going wrong the pipeline slows down rather than speeding up.
//!
//! Defaults follow the pipeline's harvesting roots: 3 seconds between
//! requests, 10 seconds after a failure, 3 attempts per identifier.
//!
//! A policy can be loaded from a YAML file and partially overridden, which is
//! how the CLI layers flags over a config file.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

/// Retry and pacing policy for a harvest run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchPolicy {
    /// Courtesy pause before each remote request, in seconds.
    pub inter_request_delay_secs: u64,
    /// Total fetch attempts per identifier (first try included).
    pub retry_max_attempts: u32,
    /// Base pause after a failed attempt, in seconds. Doubles per attempt.
    pub retry_backoff_secs: u64,
    /// Upper bound on the backoff pause, in seconds.
    pub max_backoff_secs: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            inter_request_delay_secs: 3,
            retry_max_attempts: 3,
            retry_backoff_secs: 10,
            max_backoff_secs: 60,
        }
    }
}

impl FetchPolicy {
    /// Load a policy from a YAML file. Absent fields take their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let policy: FetchPolicy = serde_yaml::from_str(&raw)?;
        Ok(policy)
    }

    /// The courtesy pause applied before every remote request.
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_secs(self.inter_request_delay_secs)
    }

    /// Backoff before retry number `attempt` (1 = first retry).
    ///
    /// Exponential from the base, capped at the maximum, plus 0-250 ms of
    /// jitter so stalled harvests against the same host do not retry in
    /// lockstep.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = Duration::from_secs(self.retry_backoff_secs);
        let mut delay = base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let cap = Duration::from_secs(self.max_backoff_secs);
        if delay > cap {
            delay = cap;
        }
        let jitter_ms: u64 = rand::rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_backoff_slower_than_courtesy_delay() {
        let policy = FetchPolicy::default();
        assert!(policy.retry_backoff_secs > policy.inter_request_delay_secs);
        assert_eq!(policy.retry_max_attempts, 3);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = FetchPolicy {
            inter_request_delay_secs: 0,
            retry_max_attempts: 5,
            retry_backoff_secs: 10,
            max_backoff_secs: 25,
        };
        let jitter = Duration::from_millis(250);

        let first = policy.backoff_delay(1);
        assert!(first >= Duration::from_secs(10) && first <= Duration::from_secs(10) + jitter);

        let second = policy.backoff_delay(2);
        assert!(second >= Duration::from_secs(20) && second <= Duration::from_secs(20) + jitter);

        // 40s uncapped, clamped to 25s.
        let third = policy.backoff_delay(3);
        assert!(third >= Duration::from_secs(25) && third <= Duration::from_secs(25) + jitter);
    }

    #[test]
    fn test_policy_from_yaml_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.yaml");
        std::fs::write(&path, "retry_max_attempts: 7\ninter_request_delay_secs: 1\n").unwrap();
        let policy = FetchPolicy::from_yaml_file(&path).unwrap();
        assert_eq!(policy.retry_max_attempts, 7);
        assert_eq!(policy.inter_request_delay_secs, 1);
        assert_eq!(policy.retry_backoff_secs, FetchPolicy::default().retry_backoff_secs);
    }

    #[test]
    fn test_policy_rejects_unknown_fields() {
        let err = serde_yaml::from_str::<FetchPolicy>("retry_max_attemps: 3\n");
        assert!(err.is_err());
    }
}
