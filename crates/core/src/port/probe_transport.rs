// Probe Transport Port
// Abstraction over the I/O layer that issues and polls connect attempts

use crate::domain::OutcomeStatus;
use std::net::IpAddr;
use std::time::Duration;

/// Non-blocking view of one in-flight connect attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectStatus {
    Pending,
    Completed(OutcomeStatus),
}

impl ConnectStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ConnectStatus::Pending)
    }
}

/// Handle to an in-flight connect attempt
///
/// Handles are independent: polling or closing one never touches another.
pub trait ConnectHandle: Send {
    /// Report whether the attempt has finished. Must not block.
    ///
    /// Once `Completed` is returned, every later call returns the same value.
    fn poll_status(&mut self) -> ConnectStatus;

    /// Abort the attempt and release its socket. Idempotent.
    fn close(&mut self);
}

/// Probe Transport trait
///
/// Implementations:
/// - TcpConnectTransport (infra-net): tokio TCP connect
/// - MockTransport: scripted per-port behaviour for tests
pub trait ProbeTransport: Send + Sync {
    /// Start a connect attempt and return immediately
    ///
    /// Failures to even begin (e.g. no free file descriptors) are reported
    /// through the handle as `Completed(Error(..))`, never as a panic.
    fn start(&self, host: IpAddr, port: u16, timeout: Duration) -> Box<dyn ConnectHandle>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    /// Scripted behaviour of a fake port
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MockBehavior {
        /// Completes immediately as open
        Accept,
        /// Completes immediately as closed
        Refuse,
        /// Never completes on its own
        Hang,
        /// Completes immediately with an I/O error
        Fail(String),
        /// Completes as open once the delay has passed
        AcceptAfter(Duration),
    }

    /// Counters shared between the transport and its handles
    #[derive(Debug, Default)]
    pub struct MockStats {
        started: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        closed: AtomicUsize,
        started_ports: Mutex<Vec<u16>>,
    }

    impl MockStats {
        pub fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        /// Attempts started but neither completed nor closed
        pub fn in_flight(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }

        /// Highest `in_flight` ever observed
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        /// Attempts aborted through `close()` before completing
        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }

        pub fn started_ports(&self) -> Vec<u16> {
            self.started_ports.lock().unwrap().clone()
        }

        fn on_start(&self, port: u16) {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.started_ports.lock().unwrap().push(port);
        }

        fn on_finish(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Mock transport with deterministic per-port behaviour
    pub struct MockTransport {
        default: MockBehavior,
        ports: HashMap<u16, MockBehavior>,
        stats: Arc<MockStats>,
    }

    impl MockTransport {
        pub fn new(default: MockBehavior) -> Self {
            Self {
                default,
                ports: HashMap::new(),
                stats: Arc::new(MockStats::default()),
            }
        }

        pub fn with_port(mut self, port: u16, behavior: MockBehavior) -> Self {
            self.ports.insert(port, behavior);
            self
        }

        pub fn stats(&self) -> Arc<MockStats> {
            Arc::clone(&self.stats)
        }
    }

    impl ProbeTransport for MockTransport {
        fn start(&self, _host: IpAddr, port: u16, _timeout: Duration) -> Box<dyn ConnectHandle> {
            let behavior = self.ports.get(&port).unwrap_or(&self.default).clone();
            self.stats.on_start(port);
            Box::new(MockHandle {
                behavior,
                started: Instant::now(),
                stats: Arc::clone(&self.stats),
                finished: None,
            })
        }
    }

    struct MockHandle {
        behavior: MockBehavior,
        started: Instant,
        stats: Arc<MockStats>,
        finished: Option<ConnectStatus>,
    }

    impl MockHandle {
        fn evaluate(&self) -> ConnectStatus {
            match &self.behavior {
                MockBehavior::Accept => ConnectStatus::Completed(OutcomeStatus::Open),
                MockBehavior::Refuse => ConnectStatus::Completed(OutcomeStatus::Closed),
                MockBehavior::Hang => ConnectStatus::Pending,
                MockBehavior::Fail(reason) => {
                    ConnectStatus::Completed(OutcomeStatus::Error(reason.clone()))
                }
                MockBehavior::AcceptAfter(delay) => {
                    if self.started.elapsed() >= *delay {
                        ConnectStatus::Completed(OutcomeStatus::Open)
                    } else {
                        ConnectStatus::Pending
                    }
                }
            }
        }
    }

    impl ConnectHandle for MockHandle {
        fn poll_status(&mut self) -> ConnectStatus {
            if let Some(done) = &self.finished {
                return done.clone();
            }
            let status = self.evaluate();
            if !status.is_pending() {
                self.stats.on_finish();
                self.finished = Some(status.clone());
            }
            status
        }

        fn close(&mut self) {
            if self.finished.is_none() {
                self.stats.on_finish();
                self.stats.closed.fetch_add(1, Ordering::SeqCst);
                self.finished = Some(ConnectStatus::Completed(OutcomeStatus::Error(
                    "closed".to_string(),
                )));
            }
        }
    }
}
