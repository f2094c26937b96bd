// Host & network resolution

use ipnetwork::IpNetwork;
use std::net::IpAddr;
use tracing::debug;

use yapps_core::domain::DomainError;
use yapps_core::{AppError, Result};

/// Resolve an IP literal or DNS name to one address
///
/// Literals are returned as-is without touching DNS. For names, the first
/// IPv4 answer is preferred, falling back to the first IPv6 one.
pub async fn resolve_host(host: &str) -> Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| AppError::Resolve(format!("{}: {}", host, e)))?
        .map(|sa| sa.ip())
        .collect();

    let chosen = addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| AppError::Resolve(format!("{}: no addresses found", host)))?;

    debug!(host = %host, resolved = %chosen, candidates = addrs.len(), "Host resolved");
    Ok(chosen)
}

/// Every address of a CIDR network, network and broadcast included
///
/// Host bits in the input are ignored (`10.0.0.7/30` covers `10.0.0.4-7`).
pub fn expand_network(cidr: &str) -> Result<impl Iterator<Item = IpAddr>> {
    let network: IpNetwork = cidr.trim().parse().map_err(|e| {
        AppError::Domain(DomainError::ValidationError(format!(
            "Invalid network '{}': {}",
            cidr, e
        )))
    })?;
    Ok(network.iter())
}
