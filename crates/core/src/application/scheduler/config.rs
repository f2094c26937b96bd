// Scan configuration

use super::constants::*;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs of one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum probes in flight (must be >= 1)
    pub concurrency_limit: usize,
    /// Per-probe connect deadline in milliseconds (must be > 0)
    pub timeout_ms: u64,
    /// First idle backoff between sweeps, microseconds
    pub poll_backoff_min_us: u64,
    /// Idle backoff ceiling, microseconds
    pub poll_backoff_max_us: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_backoff_min_us: DEFAULT_POLL_BACKOFF_MIN_US,
            poll_backoff_max_us: DEFAULT_POLL_BACKOFF_MAX_US,
        }
    }
}

impl ScanConfig {
    pub fn new(concurrency_limit: usize, timeout: Duration) -> Self {
        Self {
            concurrency_limit,
            timeout_ms: timeout.as_millis().min(u64::MAX as u128) as u64,
            ..Default::default()
        }
    }

    pub fn with_poll_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.poll_backoff_min_us = min.as_micros().min(u64::MAX as u128) as u64;
        self.poll_backoff_max_us = max.as_micros().min(u64::MAX as u128) as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_backoff_min(&self) -> Duration {
        Duration::from_micros(self.poll_backoff_min_us)
    }

    pub fn poll_backoff_max(&self) -> Duration {
        Duration::from_micros(self.poll_backoff_max_us)
    }

    /// Reject configurations the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit < 1 {
            return Err(AppError::Config(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(AppError::Config(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_backoff_min_us == 0 {
            return Err(AppError::Config(
                "poll backoff must be greater than zero".to_string(),
            ));
        }
        if self.poll_backoff_min_us > self.poll_backoff_max_us {
            return Err(AppError::Config(format!(
                "poll backoff min ({}us) exceeds max ({}us)",
                self.poll_backoff_min_us, self.poll_backoff_max_us
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        tokio_test::assert_ok!(ScanConfig::default().validate());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = ScanConfig::new(0, Duration::from_secs(1)).validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ScanConfig::new(10, Duration::ZERO).validate().unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_to_zero_and_is_rejected() {
        let config = ScanConfig::new(10, Duration::from_micros(300));
        tokio_test::assert_err!(config.validate());
    }

    #[test]
    fn test_backoff_bounds_checked() {
        let inverted = ScanConfig::default()
            .with_poll_backoff(Duration::from_millis(5), Duration::from_millis(1));
        tokio_test::assert_err!(inverted.validate());

        let zero =
            ScanConfig::default().with_poll_backoff(Duration::ZERO, Duration::from_millis(1));
        tokio_test::assert_err!(zero.validate());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ScanConfig = serde_json::from_str(r#"{"concurrency_limit": 7}"#).unwrap();
        assert_eq!(config.concurrency_limit, 7);
        assert_eq!(config.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }
}
