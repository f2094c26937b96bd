//! Admission Scheduler - bounded set of in-flight probes driven by polling
//!
//! The loop keeps at most `concurrency_limit` probes outstanding. Instead of
//! blocking on a counting semaphore per completion, it sweeps the whole
//! working set with non-blocking polls, harvests everything that finished,
//! refills the free slots and only sleeps (with a short bounded backoff)
//! when a sweep found nothing.

mod backoff;
mod cancel;
mod config;
pub mod constants;
mod probe;

pub use backoff::IdleBackoff;
pub use cancel::{cancel_channel, CancelHandle, CancelToken};
pub use config::ScanConfig;
pub use probe::{Probe, ProbeState};

use crate::domain::{Outcome, ScanSummary, TargetEnumerator};
use crate::error::Result;
use crate::port::{ProbeTransport, ResultSink, TimeProvider};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Single-use scan driver for one host
pub struct AdmissionScheduler {
    host: IpAddr,
    config: ScanConfig,
    enumerator: TargetEnumerator,
    working_set: Vec<Probe>,
    transport: Arc<dyn ProbeTransport>,
    time_provider: Arc<dyn TimeProvider>,
}

impl AdmissionScheduler {
    /// Create a scheduler; fails fast on an invalid configuration
    ///
    /// No probe is started and the enumerator is untouched until `run`.
    pub fn new(
        host: IpAddr,
        enumerator: TargetEnumerator,
        config: ScanConfig,
        transport: Arc<dyn ProbeTransport>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            host,
            working_set: Vec::with_capacity(config.concurrency_limit),
            config,
            enumerator,
            transport,
            time_provider,
        })
    }

    /// Scan every port to completion
    pub async fn run<S>(self, sink: &mut S) -> Result<ScanSummary>
    where
        S: ResultSink + ?Sized,
    {
        self.run_until_cancelled(sink, CancelToken::never()).await
    }

    /// Scan until every port is harvested or `cancel` fires
    ///
    /// On cancellation pending probes are closed, the enumerator is not
    /// consulted again and no further outcome reaches the sink.
    pub async fn run_until_cancelled<S>(
        mut self,
        sink: &mut S,
        mut cancel: CancelToken,
    ) -> Result<ScanSummary>
    where
        S: ResultSink + ?Sized,
    {
        let started_at = self.time_provider.now_millis();
        let mut summary = ScanSummary::new(self.host);
        let mut backoff =
            IdleBackoff::new(self.config.poll_backoff_min(), self.config.poll_backoff_max());

        info!(
            host = %self.host,
            concurrency_limit = self.config.concurrency_limit,
            timeout_ms = self.config.timeout_ms,
            "Scan started"
        );

        'scan: loop {
            if cancel.is_cancelled() {
                self.abort();
                summary.cancelled = true;
                break;
            }

            // 1. Admission
            summary.admitted += self.admit();

            // 2. Termination
            if self.working_set.is_empty() && self.enumerator.is_exhausted() {
                break;
            }

            // 3. Sweep
            let completed = self.sweep();
            let progressed = !completed.is_empty();

            // 4. Harvest
            for outcome in completed {
                if cancel.is_cancelled() {
                    continue 'scan;
                }
                debug!(
                    port = outcome.port,
                    status = %outcome.status,
                    elapsed_ms = outcome.elapsed_ms,
                    "Probe harvested"
                );
                summary.record(&outcome.status);
                if let Err(e) = sink.accept(outcome).await {
                    self.abort();
                    return Err(e);
                }
            }

            // 5. Idle backoff
            if progressed {
                backoff.reset();
            } else {
                tokio::select! {
                    _ = sleep(backoff.next_interval()) => {},
                    _ = cancel.cancelled() => {}
                }
            }
        }

        summary.elapsed_ms = self.time_provider.now_millis() - started_at;
        if summary.cancelled {
            warn!(
                host = %self.host,
                harvested = summary.harvested,
                remaining_unscanned = !self.enumerator.is_exhausted(),
                "Scan cancelled"
            );
        } else {
            info!(
                host = %self.host,
                harvested = summary.harvested,
                open = summary.open,
                elapsed_ms = summary.elapsed_ms,
                "Scan finished"
            );
        }
        Ok(summary)
    }

    /// Fill free capacity from the enumerator; returns probes started
    fn admit(&mut self) -> usize {
        let mut admitted = 0;
        while self.working_set.len() < self.config.concurrency_limit {
            let Some(port) = self.enumerator.next_port() else {
                break;
            };
            let now = self.time_provider.now_millis();
            let handle = self.transport.start(self.host, port, self.config.timeout());
            self.working_set
                .push(Probe::new(self.host, port, now, self.config.timeout_ms, handle));
            admitted += 1;
            debug!(port, in_flight = self.working_set.len(), "Probe admitted");
        }
        debug_assert!(self.working_set.len() <= self.config.concurrency_limit);
        admitted
    }

    /// Poll every probe once and remove the completed ones, keeping
    /// working-set order
    fn sweep(&mut self) -> Vec<Outcome> {
        let now = self.time_provider.now_millis();
        for probe in self.working_set.iter_mut() {
            probe.poll(now);
        }

        let (done, pending): (Vec<Probe>, Vec<Probe>) = std::mem::take(&mut self.working_set)
            .into_iter()
            .partition(Probe::is_completed);
        self.working_set = pending;

        done.into_iter().filter_map(Probe::into_outcome).collect()
    }

    /// Close every pending probe and drop the working set
    fn abort(&mut self) {
        for mut probe in self.working_set.drain(..) {
            probe.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OutcomeStatus, PortSpec};
    use crate::port::probe_transport::mocks::{MockBehavior, MockTransport};
    use crate::port::time_provider::mocks::MockTimeProvider;
    use crate::port::time_provider::SystemTimeProvider;
    use crate::AppError;
    use std::time::Duration;

    fn host() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    fn scheduler(
        ports: &str,
        limit: usize,
        timeout_ms: u64,
        transport: Arc<MockTransport>,
    ) -> Result<AdmissionScheduler> {
        AdmissionScheduler::new(
            host(),
            PortSpec::parse(ports).unwrap().into_enumerator(),
            ScanConfig::new(limit, Duration::from_millis(timeout_ms)),
            transport,
            Arc::new(SystemTimeProvider),
        )
    }

    #[test]
    fn test_zero_concurrency_fails_before_start() {
        let transport = Arc::new(MockTransport::new(MockBehavior::Accept));
        let result = scheduler("1-10", 0, 100, transport.clone());

        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(transport.stats().started(), 0);
    }

    #[tokio::test]
    async fn test_empty_port_list_finishes_immediately() {
        let transport = Arc::new(MockTransport::new(MockBehavior::Accept));
        let mut sink: Vec<Outcome> = Vec::new();

        let summary = scheduler("", 4, 100, transport.clone())
            .unwrap()
            .run(&mut sink)
            .await
            .unwrap();

        assert!(sink.is_empty());
        assert_eq!(summary.admitted, 0);
        assert_eq!(transport.stats().started(), 0);
    }

    #[tokio::test]
    async fn test_every_port_harvested_once() {
        let transport = Arc::new(
            MockTransport::new(MockBehavior::Refuse)
                .with_port(22, MockBehavior::Accept)
                .with_port(25, MockBehavior::Fail("network unreachable".into())),
        );
        let mut sink: Vec<Outcome> = Vec::new();

        let summary = scheduler("20-29", 3, 100, transport.clone())
            .unwrap()
            .run(&mut sink)
            .await
            .unwrap();

        let mut ports: Vec<u16> = sink.iter().map(|o| o.port).collect();
        ports.sort_unstable();
        assert_eq!(ports, (20..=29).collect::<Vec<_>>());
        assert_eq!(summary.open, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.closed, 8);
        assert!(transport.stats().max_in_flight() <= 3);
    }

    #[tokio::test]
    async fn test_harvest_order_follows_working_set() {
        // All complete in the first sweep: harvested in admission order, not sorted
        let transport = Arc::new(MockTransport::new(MockBehavior::Accept));
        let mut sink: Vec<Outcome> = Vec::new();

        scheduler("9 3 7 1", 4, 100, transport)
            .unwrap()
            .run(&mut sink)
            .await
            .unwrap();

        assert_eq!(sink.iter().map(|o| o.port).collect::<Vec<_>>(), vec![9, 3, 7, 1]);
    }

    #[tokio::test]
    async fn test_simultaneous_timeouts_all_harvested() {
        let transport = Arc::new(MockTransport::new(MockBehavior::Hang));
        let stats = transport.stats();
        let clock = Arc::new(MockTimeProvider::new(10_000));
        let scheduler = AdmissionScheduler::new(
            host(),
            PortSpec::parse("1-5").unwrap().into_enumerator(),
            ScanConfig::new(5, Duration::from_millis(200)),
            transport,
            clock.clone(),
        )
        .unwrap();

        let ticker = {
            let clock = clock.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                clock.advance(200);
            })
        };

        let mut sink: Vec<Outcome> = Vec::new();
        let summary = scheduler.run(&mut sink).await.unwrap();
        ticker.await.unwrap();

        assert_eq!(sink.len(), 5);
        assert!(sink.iter().all(|o| o.status == OutcomeStatus::TimedOut));
        assert_eq!(summary.timed_out, 5);
        assert_eq!(stats.closed(), 5);
        assert_eq!(stats.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_sink_failure_aborts_and_closes_pending() {
        let transport = Arc::new(
            MockTransport::new(MockBehavior::Hang).with_port(1, MockBehavior::Accept),
        );
        let stats = transport.stats();
        let (mut tx, rx) = tokio::sync::mpsc::channel::<Outcome>(1);
        drop(rx);

        let result = scheduler("1-4", 4, 10_000, transport)
            .unwrap()
            .run(&mut tx)
            .await;

        assert!(matches!(result, Err(AppError::Sink(_))));
        assert_eq!(stats.closed(), 3);
        assert_eq!(stats.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_run_starts_nothing() {
        let transport = Arc::new(MockTransport::new(MockBehavior::Accept));
        let (handle, token) = cancel_channel();
        handle.cancel();

        let mut sink: Vec<Outcome> = Vec::new();
        let summary = scheduler("1-100", 10, 100, transport.clone())
            .unwrap()
            .run_until_cancelled(&mut sink, token)
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert!(sink.is_empty());
        assert_eq!(transport.stats().started(), 0);
    }
}
