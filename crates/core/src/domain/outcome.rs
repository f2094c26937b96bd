// Outcome Domain Model

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Classified state of a finished connect attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "state", content = "reason")]
pub enum OutcomeStatus {
    /// Connection established before the deadline
    Open,
    /// Connection actively refused (RST)
    Closed,
    /// No answer before the deadline (likely filtered)
    TimedOut,
    /// Any other I/O failure, carried as data
    Error(String),
}

impl OutcomeStatus {
    /// Short label used in logs and console output
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Open => "OPEN",
            OutcomeStatus::Closed => "CLOSED",
            OutcomeStatus::TimedOut => "TIMEOUT",
            OutcomeStatus::Error(_) => "ERROR",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, OutcomeStatus::Open)
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Error(reason) => write!(f, "ERROR ({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Result of a completed probe. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub host: IpAddr,
    pub port: u16,
    pub status: OutcomeStatus,
    /// Time from admission to completion
    pub elapsed_ms: i64,
}

impl Outcome {
    pub fn new(host: IpAddr, port: u16, status: OutcomeStatus, elapsed_ms: i64) -> Self {
        Self {
            host,
            port,
            status,
            elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(OutcomeStatus::Open.to_string(), "OPEN");
        assert_eq!(OutcomeStatus::TimedOut.to_string(), "TIMEOUT");
        assert_eq!(
            OutcomeStatus::Error("network unreachable".into()).to_string(),
            "ERROR (network unreachable)"
        );
    }

    #[test]
    fn test_outcome_serializes_with_state_tag() {
        let outcome = Outcome::new("127.0.0.1".parse().unwrap(), 22, OutcomeStatus::Closed, 3);
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["port"], 22);
        assert_eq!(value["status"]["state"], "CLOSED");
        assert_eq!(value["host"], "127.0.0.1");
    }
}
