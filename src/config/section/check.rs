//! `[check]` section configuration.
//!
//! Where the check client looks for the status server and how patiently it
//! polls. All bounds are policy, not protocol.
//!
//! # Example
//!
//! ```toml
//! [check]
//! host = "127.0.0.1"
//! port = 5142
//! poll_interval_ms = 500      # delay between two probes
//! start_attempts = 15         # probes spent waiting for compilation to start
//! reconnect_attempts = 30     # failed probes tolerated during a domain reload
//! settle_delay_ms = 1000      # pause before fetching errors
//! request_timeout_ms = 2000   # bound of every single request
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::PollPolicy;
use crate::protocol::DEFAULT_PORT;

/// Check client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Address of the status server.
    pub host: IpAddr,

    /// Port of the status server.
    pub port: u16,

    /// Delay between two probes.
    pub poll_interval_ms: u64,

    /// Probes spent waiting for compilation to start.
    pub start_attempts: u32,

    /// Consecutive failed probes tolerated after the connection dropped.
    pub reconnect_attempts: u32,

    /// Pause before fetching errors, so the server cache refreshes once.
    pub settle_delay_ms: u64,

    /// Bound of every single request.
    pub request_timeout_ms: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            poll_interval_ms: policy.interval.as_millis() as u64,
            start_attempts: policy.start_attempts,
            reconnect_attempts: policy.reconnect_attempts,
            settle_delay_ms: policy.settle_delay.as_millis() as u64,
            request_timeout_ms: 2000,
        }
    }
}

impl CheckConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            start_attempts: self.start_attempts,
            reconnect_attempts: self.reconnect_attempts,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    /// Collect validation problems as `(field, message)` pairs.
    pub(in crate::config) fn problems(&self) -> Vec<(&'static str, &'static str)> {
        let mut problems = Vec::new();
        if self.poll_interval_ms == 0 {
            problems.push(("check.poll_interval_ms", "must be greater than 0"));
        }
        if self.request_timeout_ms == 0 {
            problems.push(("check.request_timeout_ms", "must be greater than 0"));
        }
        if self.start_attempts == 0 {
            problems.push(("check.start_attempts", "must be at least 1"));
        }
        if self.reconnect_attempts == 0 {
            problems.push(("check.reconnect_attempts", "must be at least 1"));
        }
        problems
    }
}
