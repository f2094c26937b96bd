// Scheduler constants (no magic values)

/// Default number of probes kept in flight (100)
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 100;

/// Default per-probe connect deadline (3s)
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// First idle backoff after a sweep with no completions (1ms)
pub const DEFAULT_POLL_BACKOFF_MIN_US: u64 = 1_000;

/// Idle backoff ceiling (5ms)
/// Keeps completion detection latency bounded while draining the last slots
pub const DEFAULT_POLL_BACKOFF_MAX_US: u64 = 5_000;
