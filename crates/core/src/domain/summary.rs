// Scan Summary

use super::OutcomeStatus;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Totals of one scheduler run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub host: IpAddr,
    /// Probes started
    pub admitted: usize,
    /// Outcomes delivered to the sink
    pub harvested: usize,
    pub open: usize,
    pub closed: usize,
    pub timed_out: usize,
    pub errors: usize,
    /// True when the run was stopped by its cancel token
    pub cancelled: bool,
    pub elapsed_ms: i64,
}

impl ScanSummary {
    pub fn new(host: IpAddr) -> Self {
        Self {
            host,
            admitted: 0,
            harvested: 0,
            open: 0,
            closed: 0,
            timed_out: 0,
            errors: 0,
            cancelled: false,
            elapsed_ms: 0,
        }
    }

    /// Count one harvested outcome
    pub fn record(&mut self, status: &OutcomeStatus) {
        self.harvested += 1;
        match status {
            OutcomeStatus::Open => self.open += 1,
            OutcomeStatus::Closed => self.closed += 1,
            OutcomeStatus::TimedOut => self.timed_out += 1,
            OutcomeStatus::Error(_) => self.errors += 1,
        }
    }
}
