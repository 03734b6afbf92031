//! Check client: drives the refresh/observe/fetch protocol against the
//! status server and turns it into a verdict.

mod machine;
mod outcome;
mod transport;

pub use machine::{CheckMachine, CheckState, PollPolicy, Sleeper, ThreadSleeper};
pub use outcome::{CheckOutcome, InfraFailure};
pub use transport::{ClientError, Transport, UreqTransport};

use serde::de::DeserializeOwned;

use crate::protocol::{CompileError, Endpoint, PingStatus, RefreshAck};

/// Longest body excerpt quoted in a malformed-response diagnostic.
const BODY_EXCERPT: usize = 200;

/// Typed view of the three status endpoints.
#[derive(Debug)]
pub struct StatusClient<T> {
    transport: T,
}

impl<T: Transport> StatusClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Ask the host to re-scan sources.
    pub fn refresh(&mut self) -> Result<(), ClientError> {
        self.get_json::<RefreshAck>(Endpoint::Refresh).map(|_| ())
    }

    /// Current compiling flag.
    pub fn ping(&mut self) -> Result<bool, ClientError> {
        self.get_json::<PingStatus>(Endpoint::Ping)
            .map(|status| status.is_compiling)
    }

    /// Cached compile errors.
    pub fn fetch_errors(&mut self) -> Result<Vec<CompileError>, ClientError> {
        self.get_json(Endpoint::CompileErrors)
    }

    fn get_json<R: DeserializeOwned>(&mut self, endpoint: Endpoint) -> Result<R, ClientError> {
        let body = self.transport.get(endpoint)?;
        serde_json::from_str(&body).map_err(|e| ClientError::Malformed {
            endpoint,
            detail: format!("{e} in {:?}", excerpt(&body)),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
