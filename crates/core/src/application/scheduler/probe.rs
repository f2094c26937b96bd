// Probe - one outstanding connect attempt owned by the scheduler

use crate::domain::{Outcome, OutcomeStatus};
use crate::port::{ConnectHandle, ConnectStatus};
use std::net::IpAddr;
use tracing::debug;

/// Probe lifecycle: `Pending -> Completed` (terminal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeState {
    Pending,
    Completed(Outcome),
}

pub struct Probe {
    host: IpAddr,
    port: u16,
    started_at: i64, // epoch ms
    deadline: i64,   // epoch ms
    state: ProbeState,
    handle: Box<dyn ConnectHandle>,
}

impl Probe {
    pub fn new(
        host: IpAddr,
        port: u16,
        started_at: i64,
        timeout_ms: u64,
        handle: Box<dyn ConnectHandle>,
    ) -> Self {
        let timeout_ms = i64::try_from(timeout_ms).unwrap_or(i64::MAX);
        Self {
            host,
            port,
            started_at,
            deadline: started_at.saturating_add(timeout_ms),
            state: ProbeState::Pending,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn deadline(&self) -> i64 {
        self.deadline
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, ProbeState::Completed(_))
    }

    /// Non-blocking check for completion
    ///
    /// A pending probe past its deadline is closed and completes as
    /// `TimedOut`. Completed probes are never polled again.
    pub fn poll(&mut self, now: i64) -> &ProbeState {
        if self.is_completed() {
            return &self.state;
        }

        match self.handle.poll_status() {
            ConnectStatus::Completed(status) => self.complete(status, now),
            ConnectStatus::Pending if now >= self.deadline => {
                debug!(
                    port = self.port,
                    deadline = self.deadline,
                    "Probe deadline exceeded, closing"
                );
                self.handle.close();
                self.complete(OutcomeStatus::TimedOut, now);
            }
            ConnectStatus::Pending => {}
        }
        &self.state
    }

    /// Abort a pending probe; completed probes are left untouched
    pub fn close(&mut self) {
        if !self.is_completed() {
            self.handle.close();
        }
    }

    /// Take the outcome of a completed probe
    pub fn into_outcome(self) -> Option<Outcome> {
        match self.state {
            ProbeState::Completed(outcome) => Some(outcome),
            ProbeState::Pending => None,
        }
    }

    fn complete(&mut self, status: OutcomeStatus, now: i64) {
        let elapsed_ms = (now - self.started_at).max(0);
        let outcome = Outcome::new(self.host, self.port, status, elapsed_ms);
        self.state = ProbeState::Completed(outcome);
    }
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("started_at", &self.started_at)
            .field("deadline", &self.deadline)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::probe_transport::mocks::{MockBehavior, MockTransport};
    use crate::port::ProbeTransport;
    use std::time::Duration;

    fn host() -> IpAddr {
        "192.0.2.10".parse().unwrap()
    }

    fn start(transport: &MockTransport, port: u16, now: i64, timeout_ms: u64) -> Probe {
        let handle = transport.start(host(), port, Duration::from_millis(timeout_ms));
        Probe::new(host(), port, now, timeout_ms, handle)
    }

    #[test]
    fn test_accept_completes_open() {
        let transport = MockTransport::new(MockBehavior::Accept);
        let mut probe = start(&transport, 80, 1_000, 200);

        match probe.poll(1_005) {
            ProbeState::Completed(outcome) => {
                assert_eq!(outcome.status, OutcomeStatus::Open);
                assert_eq!(outcome.port, 80);
                assert_eq!(outcome.elapsed_ms, 5);
            }
            ProbeState::Pending => panic!("accepting port should complete"),
        }
    }

    #[test]
    fn test_hang_stays_pending_until_deadline() {
        let transport = MockTransport::new(MockBehavior::Hang);
        let stats = transport.stats();
        let mut probe = start(&transport, 82, 1_000, 200);

        assert_eq!(probe.deadline(), 1_200);
        assert_eq!(probe.poll(1_100), &ProbeState::Pending);
        assert_eq!(stats.closed(), 0);

        let state = probe.poll(1_200).clone();
        assert!(matches!(
            state,
            ProbeState::Completed(Outcome { status: OutcomeStatus::TimedOut, .. })
        ));
        assert_eq!(stats.closed(), 1, "forced timeout must close the handle");
    }

    #[test]
    fn test_completed_state_is_terminal() {
        let transport = MockTransport::new(MockBehavior::Refuse);
        let mut probe = start(&transport, 81, 0, 50);

        let first = probe.poll(10).clone();
        // Past the deadline: must not flip to TimedOut
        let second = probe.poll(10_000).clone();
        assert_eq!(first, second);
        assert_eq!(probe.into_outcome().map(|o| o.status), Some(OutcomeStatus::Closed));
    }

    #[test]
    fn test_close_pending_probe_closes_handle() {
        let transport = MockTransport::new(MockBehavior::Hang);
        let stats = transport.stats();
        let mut probe = start(&transport, 9000, 0, 50);

        probe.close();
        assert_eq!(stats.closed(), 1);
        assert_eq!(stats.in_flight(), 0);
        assert!(probe.into_outcome().is_none());
    }
}
