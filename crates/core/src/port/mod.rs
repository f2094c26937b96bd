// Port Layer - Interfaces for external dependencies

pub mod probe_transport;
pub mod result_sink;
pub mod time_provider; // For deterministic deadlines in tests

// Re-exports
pub use probe_transport::{ConnectHandle, ConnectStatus, ProbeTransport};
pub use result_sink::ResultSink;
pub use time_provider::TimeProvider;
