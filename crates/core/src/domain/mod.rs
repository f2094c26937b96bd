// Domain Layer - Pure scan entities

pub mod error;
pub mod outcome;
pub mod port_spec;
pub mod summary;

// Re-exports
pub use error::DomainError;
pub use outcome::{Outcome, OutcomeStatus};
pub use port_spec::{PortSpec, TargetEnumerator};
pub use summary::ScanSummary;
