//! HTTP transport for the check client.
//!
//! The state machine only sees [`Transport`], so tests can replay scripted
//! connection drops without a live server.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::Endpoint;

/// Failure of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Nothing listens on the server address.
    #[error("connection to {endpoint} refused")]
    Refused { endpoint: Endpoint },

    /// Could not connect, or the connection dropped mid-request.
    #[error("cannot reach {endpoint}: {detail}")]
    Unreachable { endpoint: Endpoint, detail: String },

    /// No answer within the request bound.
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: Endpoint },

    /// Answered, but not with 200.
    #[error("received status code {status} from {endpoint}")]
    Status { endpoint: Endpoint, status: u16 },

    /// Answered with a body that is not the expected JSON shape.
    #[error("malformed response from {endpoint}: {detail}")]
    Malformed { endpoint: Endpoint, detail: String },
}

impl ClientError {
    /// Connection-level failure: the server may be gone or reloading.
    ///
    /// Timeouts count as connection failures for state transitions.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::Refused { .. } | Self::Unreachable { .. } | Self::Timeout { .. }
        )
    }
}

/// Blocking GET against the status server.
pub trait Transport {
    /// Fetch the raw body of `endpoint`.
    fn get(&mut self, endpoint: Endpoint) -> Result<String, ClientError>;
}

/// Real transport using `ureq`.
#[derive(Debug)]
pub struct UreqTransport {
    agent: ureq::Agent,
    base: String,
}

impl UreqTransport {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self {
            agent,
            base: format!("http://{addr}"),
        }
    }
}

impl Transport for UreqTransport {
    fn get(&mut self, endpoint: Endpoint) -> Result<String, ClientError> {
        let url = format!("{}{}", self.base, endpoint.path());

        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(ClientError::Status { endpoint, status });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(classify_transport(endpoint, &transport));
            }
        };

        response
            .into_string()
            .map_err(|err| classify_io(endpoint, &err))
    }
}

fn classify_transport(endpoint: Endpoint, transport: &ureq::Transport) -> ClientError {
    let io_error = std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<io::Error>());
    match io_error {
        Some(err) => classify_io(endpoint, err),
        None => ClientError::Unreachable {
            endpoint,
            detail: transport.to_string(),
        },
    }
}

fn classify_io(endpoint: Endpoint, err: &io::Error) -> ClientError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ClientError::Timeout { endpoint },
        io::ErrorKind::ConnectionRefused => ClientError::Refused { endpoint },
        _ => ClientError::Unreachable {
            endpoint,
            detail: err.to_string(),
        },
    }
}
