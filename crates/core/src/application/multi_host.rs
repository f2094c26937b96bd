// Multi-host scans sharing one worker budget

use futures::stream::{self, StreamExt, TryStreamExt};
use std::future;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

use super::scheduler::{AdmissionScheduler, CancelToken, ScanConfig};
use crate::domain::{PortSpec, ScanSummary};
use crate::error::{AppError, Result};
use crate::port::{ProbeTransport, ResultSink, TimeProvider};

/// Division of the worker budget between hosts scanned side by side
///
/// `concurrent_hosts * per_host_limit` never exceeds the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSplit {
    pub concurrent_hosts: usize,
    pub per_host_limit: usize,
}

impl WorkerSplit {
    pub fn new(workers: usize, ports_per_host: usize) -> Self {
        let workers = workers.max(1);
        let per_host_limit = ports_per_host.clamp(1, workers);
        Self {
            concurrent_hosts: workers / per_host_limit,
            per_host_limit,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.concurrent_hosts * self.per_host_limit
    }
}

/// Runs one `AdmissionScheduler` per host, several at once
///
/// Each host keeps its own working set and summary. Hosts are started in
/// order as earlier ones finish, so a large network never holds more than
/// `concurrency_limit` connects in flight overall.
pub struct MultiHostScan {
    ports: PortSpec,
    config: ScanConfig,
    transport: Arc<dyn ProbeTransport>,
    time_provider: Arc<dyn TimeProvider>,
}

impl MultiHostScan {
    pub fn new(
        ports: PortSpec,
        config: ScanConfig,
        transport: Arc<dyn ProbeTransport>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ports,
            config,
            transport,
            time_provider,
        })
    }

    pub fn split(&self) -> WorkerSplit {
        WorkerSplit::new(self.config.concurrency_limit, self.ports.len())
    }

    /// Scan every host and return the summaries in host order
    ///
    /// Each host scan gets its own clone of `sink`. Hosts not yet started
    /// when `cancel` fires are skipped; a sink error aborts everything.
    pub async fn run<I, S>(
        &self,
        hosts: I,
        sink: &S,
        cancel: CancelToken,
    ) -> Result<Vec<ScanSummary>>
    where
        I: IntoIterator<Item = IpAddr>,
        S: ResultSink + Clone,
    {
        let split = self.split();
        let host_config = ScanConfig {
            concurrency_limit: split.per_host_limit,
            ..self.config.clone()
        };
        info!(
            concurrent_hosts = split.concurrent_hosts,
            per_host_limit = split.per_host_limit,
            "Multi-host scan started"
        );

        let gate = cancel.clone();
        let indexed = hosts.into_iter().enumerate();
        let mut summaries: Vec<(usize, ScanSummary)> = stream::iter(indexed)
            .take_while(move |_| future::ready(!gate.is_cancelled()))
            .map(|(index, host)| {
                let mut sink = sink.clone();
                let cancel = cancel.clone();
                let config = host_config.clone();
                async move {
                    let scheduler = AdmissionScheduler::new(
                        host,
                        self.ports.clone().into_enumerator(),
                        config,
                        Arc::clone(&self.transport),
                        Arc::clone(&self.time_provider),
                    )?;
                    let summary = scheduler.run_until_cancelled(&mut sink, cancel).await?;
                    Ok::<_, AppError>((index, summary))
                }
            })
            .buffer_unordered(split.concurrent_hosts)
            .try_collect()
            .await?;

        summaries.sort_by_key(|(index, _)| *index);
        Ok(summaries.into_iter().map(|(_, summary)| summary).collect())
    }
}
