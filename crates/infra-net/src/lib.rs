// YAPPS Infrastructure - Network Adapters
// Implements: ProbeTransport, host & network resolution

pub mod resolver;
pub mod tcp_transport;

pub use resolver::{expand_network, resolve_host};
pub use tcp_transport::TcpConnectTransport;
