// TCP connect transport

use futures::FutureExt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::{unconstrained, JoinHandle};
use tokio::time::timeout;
use tracing::trace;

use yapps_core::domain::OutcomeStatus;
use yapps_core::port::{ConnectHandle, ConnectStatus, ProbeTransport};

/// Full TCP handshake per probe, closed right after it succeeds
///
/// Each attempt runs as its own tokio task so sockets progress
/// independently; the scheduler only observes them through
/// `JoinHandle::is_finished`. Must be used from inside a tokio runtime.
#[derive(Debug, Default, Clone)]
pub struct TcpConnectTransport;

impl TcpConnectTransport {
    pub fn new() -> Self {
        Self
    }
}

impl ProbeTransport for TcpConnectTransport {
    fn start(&self, host: IpAddr, port: u16, connect_timeout: Duration) -> Box<dyn ConnectHandle> {
        let addr = SocketAddr::new(host, port);
        let task = tokio::spawn(async move {
            match timeout(connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    // No data exchanged; dropping starts a non-blocking close
                    drop(stream);
                    OutcomeStatus::Open
                }
                Ok(Err(e)) => classify_connect_error(&e),
                Err(_) => OutcomeStatus::TimedOut,
            }
        });
        trace!(%addr, "Connect attempt spawned");
        Box::new(TcpConnectHandle {
            task: Some(task),
            finished: None,
        })
    }
}

/// Map a failed connect to an outcome
pub fn classify_connect_error(err: &io::Error) -> OutcomeStatus {
    match err.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => OutcomeStatus::Closed,
        io::ErrorKind::TimedOut => OutcomeStatus::TimedOut,
        _ => OutcomeStatus::Error(err.to_string()),
    }
}

struct TcpConnectHandle {
    task: Option<JoinHandle<OutcomeStatus>>,
    finished: Option<OutcomeStatus>,
}

impl ConnectHandle for TcpConnectHandle {
    fn poll_status(&mut self) -> ConnectStatus {
        if let Some(status) = &self.finished {
            return ConnectStatus::Completed(status.clone());
        }
        let Some(task) = self.task.as_mut() else {
            return ConnectStatus::Completed(OutcomeStatus::Error("closed".to_string()));
        };
        if !task.is_finished() {
            return ConnectStatus::Pending;
        }

        // A finished task must not be reported pending because the caller's
        // cooperative budget ran out during a long sweep
        let status = match unconstrained(task).now_or_never() {
            Some(Ok(status)) => status,
            Some(Err(join_err)) if join_err.is_panic() => {
                OutcomeStatus::Error("connect task panicked".to_string())
            }
            Some(Err(_)) => OutcomeStatus::Error("connect task cancelled".to_string()),
            None => return ConnectStatus::Pending,
        };
        self.task = None;
        self.finished = Some(status.clone());
        ConnectStatus::Completed(status)
    }

    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            // Aborting drops the connect future, which closes the socket
            task.abort();
        }
    }
}

impl Drop for TcpConnectHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn wait_completed(handle: &mut Box<dyn ConnectHandle>) -> OutcomeStatus {
        for _ in 0..500 {
            if let ConnectStatus::Completed(status) = handle.poll_status() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("connect attempt did not complete");
    }

    #[test]
    fn test_classify_refused_and_reset_as_closed() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(classify_connect_error(&refused), OutcomeStatus::Closed);
        assert_eq!(classify_connect_error(&reset), OutcomeStatus::Closed);
    }

    #[test]
    fn test_classify_other_errors_as_data() {
        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(classify_connect_error(&timed_out), OutcomeStatus::TimedOut);

        let emfile = io::Error::new(io::ErrorKind::Other, "Too many open files");
        assert!(matches!(
            classify_connect_error(&emfile),
            OutcomeStatus::Error(reason) if reason.contains("Too many open files")
        ));
    }

    #[tokio::test]
    async fn test_listening_port_is_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let transport = TcpConnectTransport::new();
        let mut handle =
            transport.start(IpAddr::from([127, 0, 0, 1]), port, Duration::from_secs(2));

        assert_eq!(wait_completed(&mut handle).await, OutcomeStatus::Open);
        // Completed status is sticky
        assert_eq!(handle.poll_status(), ConnectStatus::Completed(OutcomeStatus::Open));
    }

    #[tokio::test]
    async fn test_unbound_port_is_closed() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let transport = TcpConnectTransport::new();
        let mut handle =
            transport.start(IpAddr::from([127, 0, 0, 1]), port, Duration::from_secs(2));

        assert_eq!(wait_completed(&mut handle).await, OutcomeStatus::Closed);
    }

    #[tokio::test]
    async fn test_close_before_completion_aborts() {
        let transport = TcpConnectTransport::new();
        // TEST-NET-1: not routable, the attempt stays pending
        let mut handle = transport.start(IpAddr::from([192, 0, 2, 1]), 9, Duration::from_secs(30));
        handle.close();
        handle.close();
        assert!(matches!(handle.poll_status(), ConnectStatus::Completed(OutcomeStatus::Error(_))));
    }

    #[tokio::test]
    async fn test_single_sweep_sees_every_finished_connect() {
        let mut ports = Vec::new();
        for _ in 0..300 {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            ports.push(listener.local_addr().unwrap().port());
        }

        let transport = TcpConnectTransport::new();
        let localhost = IpAddr::from([127, 0, 0, 1]);
        let mut handles: Vec<_> = ports
            .iter()
            .map(|&port| transport.start(localhost, port, Duration::from_secs(5)))
            .collect();

        // Loopback refusals finish well within this
        tokio::time::sleep(Duration::from_millis(500)).await;

        // One pass without yielding, like a scheduler sweep
        let completed = handles
            .iter_mut()
            .map(|handle| !handle.poll_status().is_pending())
            .filter(|&done| done)
            .count();
        assert_eq!(completed, ports.len());
    }
}
