//! YAPPS CLI - TCP connect port scanner
//! Composition root: wires the admission scheduler to the tokio transport

mod output;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use output::{render_summaries, ConsoleSink};
use yapps_core::application::scheduler::constants::{
    DEFAULT_CONCURRENCY_LIMIT, DEFAULT_POLL_BACKOFF_MAX_US, DEFAULT_POLL_BACKOFF_MIN_US,
};
use yapps_core::application::{cancel_channel, MultiHostScan, ScanConfig};
use yapps_core::domain::{Outcome, PortSpec};
use yapps_core::port::time_provider::SystemTimeProvider;
use yapps_core::port::ResultSink;
use yapps_infra_net::{expand_network, resolve_host, TcpConnectTransport};

const DEFAULT_LOG_FILTER: &str = "yapps=info";
const OUTCOME_CHANNEL_CAPACITY: usize = 1024;

#[derive(Parser, Debug)]
#[command(name = "yapps")]
#[command(about = "Asynchronous TCP connect port scanner", long_about = None)]
#[command(version)]
struct Cli {
    /// Host IP address or name
    #[arg(short = 'H', long, num_args = 1.., required_unless_present = "net")]
    host: Vec<String>,

    /// Network in CIDR notation
    #[arg(short = 'N', long, num_args = 1..)]
    net: Vec<String>,

    /// Ports to probe, e.g. "22-25 80,443"
    #[arg(short, long, num_args = 1.., required = true)]
    ports: Vec<String>,

    /// Show every port state, not only open ones
    #[arg(short, long)]
    verbose: bool,

    /// Print outcomes and summaries as JSON lines
    #[arg(long)]
    json: bool,

    /// Connection timeout in seconds
    #[arg(short, long, env = "YAPPS_TIMEOUT", default_value_t = 3.0)]
    timeout: f64,

    /// Number of concurrent connection attempts
    #[arg(short, long, env = "YAPPS_WORKERS", default_value_t = DEFAULT_CONCURRENCY_LIMIT)]
    workers: usize,

    /// Shortest idle wait between completion sweeps (microseconds)
    #[arg(long, env = "YAPPS_POLL_MIN_US", default_value_t = DEFAULT_POLL_BACKOFF_MIN_US)]
    poll_min_us: u64,

    /// Longest idle wait between completion sweeps (microseconds)
    #[arg(long, env = "YAPPS_POLL_MAX_US", default_value_t = DEFAULT_POLL_BACKOFF_MAX_US)]
    poll_max_us: u64,
}

impl Cli {
    fn scan_config(&self) -> Result<ScanConfig> {
        let timeout = Duration::try_from_secs_f64(self.timeout)
            .with_context(|| format!("Malformed timeout: {}", self.timeout))?;
        let config = ScanConfig::new(self.workers, timeout).with_poll_backoff(
            Duration::from_micros(self.poll_min_us),
            Duration::from_micros(self.poll_max_us),
        );
        config.validate()?;
        Ok(config)
    }

    fn port_spec(&self) -> Result<PortSpec> {
        PortSpec::parse(&self.ports.join(" ")).context("Invalid port specification")
    }
}

fn init_logging() -> Result<()> {
    let log_format = std::env::var("YAPPS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    // Logs go to stderr so stdout carries only scan results
    match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        "pretty" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

/// Print outcomes from every concurrent host scan as they arrive
fn spawn_printer(
    mut outcomes: mpsc::Receiver<Outcome>,
    mut console: ConsoleSink,
) -> JoinHandle<yapps_core::Result<ConsoleSink>> {
    tokio::spawn(async move {
        while let Some(outcome) = outcomes.recv().await {
            console.accept(outcome).await?;
        }
        Ok(console)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    // Configuration errors are fatal before anything is scanned
    let config = cli.scan_config()?;
    let ports = cli.port_spec()?;
    let networks = cli
        .net
        .iter()
        .map(|net| expand_network(net))
        .collect::<yapps_core::Result<Vec<_>>>()?;

    let mut hosts = Vec::with_capacity(cli.host.len());
    for host in &cli.host {
        hosts.push(
            resolve_host(host)
                .await
                .with_context(|| format!("Cannot resolve host '{}'", host))?,
        );
    }

    let (cancel_handle, cancel) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling scan");
            cancel_handle.cancel();
        }
    });

    info!(
        ports = ports.len(),
        workers = config.concurrency_limit,
        timeout_ms = config.timeout_ms,
        "YAPPS v{} starting",
        yapps_core::VERSION
    );

    let scan = MultiHostScan::new(
        ports,
        config,
        Arc::new(TcpConnectTransport::new()),
        Arc::new(SystemTimeProvider),
    )?;
    let (tx, rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);
    let printer = spawn_printer(rx, ConsoleSink::new(cli.verbose, cli.json));
    let start = Instant::now();

    let hosts = hosts.into_iter().chain(networks.into_iter().flatten());
    let result = scan.run(hosts, &tx, cancel).await;
    drop(tx);
    let console = printer.await.context("Output task failed")??;
    let summaries = result.context("Scan failed")?;
    debug!(printed = console.printed(), "All outcomes written");

    println!("{}", render_summaries(&summaries, cli.json)?);
    if !cli.json {
        println!("Took {:.3} seconds", start.elapsed().as_secs_f64());
    }

    Ok(())
}
