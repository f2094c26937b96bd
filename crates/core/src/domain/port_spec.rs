// Port Specification & Target Enumerator

use super::error::{DomainError, Result};
use std::collections::HashSet;

/// Ordered list of ports to probe
///
/// Order is the order ports were specified. Duplicates are dropped,
/// keeping the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSpec {
    ports: Vec<u16>,
}

impl PortSpec {
    /// Build from explicit port numbers (port 0 is rejected)
    pub fn from_ports<I>(ports: I) -> Result<Self>
    where
        I: IntoIterator<Item = u16>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for port in ports {
            if port == 0 {
                return Err(DomainError::InvalidPortSpec {
                    token: "0".to_string(),
                    reason: "port must be in 1-65535".to_string(),
                });
            }
            if seen.insert(port) {
                out.push(port);
            }
        }
        Ok(Self { ports: out })
    }

    /// Parse a textual specification such as `"22-25 80,443"`
    ///
    /// Tokens are separated by whitespace or commas. Each token is a single
    /// port (`80`) or an inclusive range (`22-25`); reversed ranges are
    /// swapped.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut ports = Vec::new();
        for token in spec
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let (beg, end) = parse_token(token)?;
            ports.extend(beg..=end);
        }
        Self::from_ports(ports)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.ports
    }

    /// Consume the spec into a single-use enumerator
    pub fn into_enumerator(self) -> TargetEnumerator {
        TargetEnumerator::new(self.ports)
    }
}

fn parse_token(token: &str) -> Result<(u16, u16)> {
    let invalid = |reason: &str| DomainError::InvalidPortSpec {
        token: token.to_string(),
        reason: reason.to_string(),
    };

    let (beg, end) = match token.split_once('-') {
        Some((a, b)) => (parse_port(a).map_err(invalid)?, parse_port(b).map_err(invalid)?),
        None => {
            let p = parse_port(token).map_err(invalid)?;
            (p, p)
        }
    };

    Ok(if end < beg { (end, beg) } else { (beg, end) })
}

fn parse_port(raw: &str) -> std::result::Result<u16, &'static str> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err("expected a number or a range like 22-25");
    }
    match raw.parse::<u32>() {
        Ok(n) if (1..=65535).contains(&n) => Ok(n as u16),
        _ => Err("port must be in 1-65535"),
    }
}

/// Lazy, forward-only source of ports for one scan
///
/// Not restartable. Once it reports exhaustion it stays exhausted.
pub struct TargetEnumerator {
    source: Box<dyn Iterator<Item = u16> + Send>,
    exhausted: bool,
    yielded: usize,
}

impl TargetEnumerator {
    pub fn new<I>(ports: I) -> Self
    where
        I: IntoIterator<Item = u16>,
        I::IntoIter: Send + 'static,
    {
        Self {
            source: Box::new(ports.into_iter()),
            exhausted: false,
            yielded: 0,
        }
    }

    /// Next port, or `None` when exhausted
    pub fn next_port(&mut self) -> Option<u16> {
        if self.exhausted {
            return None;
        }
        match self.source.next() {
            Some(port) => {
                self.yielded += 1;
                Some(port)
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of ports handed out so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

impl std::fmt::Debug for TargetEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetEnumerator")
            .field("exhausted", &self.exhausted)
            .field("yielded", &self.yielded)
            .finish()
    }
}
