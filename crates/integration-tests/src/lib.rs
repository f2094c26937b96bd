//! Shared helpers for the YAPPS integration tests

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use yapps_core::application::CancelHandle;
use yapps_core::domain::{Outcome, TargetEnumerator};
use yapps_core::port::ResultSink;
use yapps_core::Result;

pub fn localhost() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

/// Enumerator over `ports` that counts how many times it was asked
pub fn counting_enumerator(ports: Vec<u16>) -> (TargetEnumerator, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut inner = ports.into_iter();
    let source = std::iter::from_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        inner.next()
    });
    (TargetEnumerator::new(source), calls)
}

/// Collects outcomes and fires a cancel handle after `cancel_after` of them
pub struct CancellingSink {
    pub outcomes: Vec<Outcome>,
    cancel_after: usize,
    handle: CancelHandle,
}

impl CancellingSink {
    pub fn new(cancel_after: usize, handle: CancelHandle) -> Self {
        Self {
            outcomes: Vec::new(),
            cancel_after,
            handle,
        }
    }
}

#[async_trait]
impl ResultSink for CancellingSink {
    async fn accept(&mut self, outcome: Outcome) -> Result<()> {
        self.outcomes.push(outcome);
        if self.outcomes.len() == self.cancel_after {
            self.handle.cancel();
        }
        Ok(())
    }
}
