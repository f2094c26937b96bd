// Application Layer - Use Cases

pub mod multi_host;
pub mod scheduler;

// Re-exports
pub use multi_host::{MultiHostScan, WorkerSplit};
pub use scheduler::{
    cancel_channel, AdmissionScheduler, CancelHandle, CancelToken, ScanConfig,
};
