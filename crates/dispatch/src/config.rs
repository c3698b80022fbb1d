use std::str::FromStr;
use std::time::Duration;

use courier_core::dispatch::{
    COMMAND_STATUS_TIMEOUT_SECS, POLL_INTERVAL_MS, SEND_JOB_TIMEOUT_SECS, START_JOB_TIMEOUT_SECS,
    STATUS_RETENTION_SECS,
};
use courier_core::error::CoreError;

/// Timing knobs for the dispatcher and the command status registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Overall bound on one job's dispatch attempt.
    pub start_job_timeout: Duration,
    /// Wait for a sent command to be picked up before re-selecting.
    pub send_job_timeout: Duration,
    /// Age after which a non-terminal status reads as `TIMEOUT_RESPONSE`.
    pub command_status_timeout: Duration,
    /// Sleep between coordination-task iterations.
    pub poll_interval: Duration,
    /// Idle time after which registry and tracker entries are discarded.
    pub status_retention: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            start_job_timeout: Duration::from_secs(START_JOB_TIMEOUT_SECS),
            send_job_timeout: Duration::from_secs(SEND_JOB_TIMEOUT_SECS),
            command_status_timeout: Duration::from_secs(COMMAND_STATUS_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            status_retention: Duration::from_secs(STATUS_RETENTION_SECS),
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `START_JOB_TIMEOUT_SECS`      | `30`    |
    /// | `SEND_JOB_TIMEOUT_SECS`       | `10`    |
    /// | `COMMAND_STATUS_TIMEOUT_SECS` | `30`    |
    /// | `POLL_INTERVAL_MS`            | `1000`  |
    /// | `STATUS_RETENTION_SECS`       | `600`   |
    pub fn from_env() -> Result<Self, CoreError> {
        let config = Self {
            start_job_timeout: Duration::from_secs(env_or(
                "START_JOB_TIMEOUT_SECS",
                START_JOB_TIMEOUT_SECS,
            )?),
            send_job_timeout: Duration::from_secs(env_or(
                "SEND_JOB_TIMEOUT_SECS",
                SEND_JOB_TIMEOUT_SECS,
            )?),
            command_status_timeout: Duration::from_secs(env_or(
                "COMMAND_STATUS_TIMEOUT_SECS",
                COMMAND_STATUS_TIMEOUT_SECS,
            )?),
            poll_interval: Duration::from_millis(env_or("POLL_INTERVAL_MS", POLL_INTERVAL_MS)?),
            status_retention: Duration::from_secs(env_or(
                "STATUS_RETENTION_SECS",
                STATUS_RETENTION_SECS,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the coordination loop degenerate.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Validation(
                "POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        if self.send_job_timeout.is_zero() {
            return Err(CoreError::Validation(
                "SEND_JOB_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.start_job_timeout.is_zero() {
            return Err(CoreError::Validation(
                "START_JOB_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        // A running coordination task must never lose its registry entry.
        if self.status_retention <= self.start_job_timeout {
            return Err(CoreError::Validation(
                "STATUS_RETENTION_SECS must exceed START_JOB_TIMEOUT_SECS".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read `name` from the environment, falling back to `default` when unset.
fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            CoreError::Validation(format!("{name} must be a valid number, got '{raw}'"))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_constants() {
        let config = DispatchConfig::default();
        assert_eq!(config.start_job_timeout, Duration::from_secs(30));
        assert_eq!(config.send_job_timeout, Duration::from_secs(10));
        assert_eq!(config.command_status_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.status_retention, Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let config = DispatchConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_send_timeout_rejected() {
        let config = DispatchConfig {
            send_job_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn retention_shorter_than_deadline_rejected() {
        let config = DispatchConfig {
            status_retention: Duration::from_secs(30),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unset_variable_uses_default() {
        let value: u64 = env_or("COURIER_TEST_SURELY_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
