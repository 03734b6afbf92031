//! Polling state machine of the check client.
//!
//! ```text
//! Idle ──refresh ok──▶ AwaitingStart ──compiling / drop──▶ Compiling
//!  │                        │                              │    ▲
//!  │ refused                │ attempts exhausted     drop  │    │ still compiling
//!  ▼                        ▼                              ▼    │
//! Resolved ◀── fetch ── Settling ◀──── any answer ─── PossibleReload
//!     ▲                     ▲                              │
//!     │                     └────── not compiling ─────────┘ (from Compiling)
//!     └──────────── too many failed reconnects ────────────┘
//! ```
//!
//! A connection failure means different things depending on the state it is
//! observed in. A refused refresh means no server is running; any other
//! refresh failure is reported as it is. Once
//! the refresh was acknowledged it means the editor is reloading its
//! scripting domain, and the next answer after a drop means the reload
//! finished.

use std::time::Duration;

use super::outcome::{CheckOutcome, InfraFailure};
use super::transport::{ClientError, Transport};
use super::StatusClient;
use crate::{debug, log};

/// Timing and retry bounds of the polling protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two probes.
    pub interval: Duration,
    /// Probes spent waiting for compilation to start.
    pub start_attempts: u32,
    /// Consecutive failed probes tolerated after a drop.
    pub reconnect_attempts: u32,
    /// Pause before fetching, so the server cache refreshes at least once.
    pub settle_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            start_attempts: 15,
            reconnect_attempts: 30,
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// Blocking pause between protocol steps.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckState {
    Idle,
    /// Refresh acknowledged; `attempts` probes done so far.
    AwaitingStart { attempts: u32 },
    Compiling,
    /// Connection lost while compiling; `failures` consecutive failed probes.
    PossibleReload { failures: u32 },
    Settling,
    Resolved(CheckOutcome),
}

impl CheckState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// One check run. Every step issues at most one request.
#[derive(Debug)]
pub struct CheckMachine<T, S> {
    client: StatusClient<T>,
    sleeper: S,
    policy: PollPolicy,
    state: CheckState,
}

impl<T: Transport, S: Sleeper> CheckMachine<T, S> {
    pub fn new(client: StatusClient<T>, sleeper: S, policy: PollPolicy) -> Self {
        Self {
            client,
            sleeper,
            policy,
            state: CheckState::Idle,
        }
    }

    pub fn state(&self) -> &CheckState {
        &self.state
    }

    /// Drive the machine to its verdict.
    pub fn run(mut self) -> CheckOutcome {
        loop {
            if let CheckState::Resolved(outcome) = self.step() {
                return outcome.clone();
            }
        }
    }

    /// Perform one transition.
    pub fn step(&mut self) -> &CheckState {
        let next = match std::mem::replace(&mut self.state, CheckState::Idle) {
            CheckState::Idle => self.trigger(),
            CheckState::AwaitingStart { attempts } => self.await_start(attempts),
            CheckState::Compiling => self.watch_compile(),
            CheckState::PossibleReload { failures } => self.reconnect(failures),
            CheckState::Settling => self.settle(),
            resolved @ CheckState::Resolved(_) => resolved,
        };
        self.state = next;
        &self.state
    }

    fn trigger(&mut self) -> CheckState {
        match self.client.refresh() {
            Ok(()) => {
                debug!("check"; "refresh requested, waiting for compilation");
                CheckState::AwaitingStart { attempts: 0 }
            }
            Err(ClientError::Refused { .. }) => resolved_infra(InfraFailure::ServerNotRunning),
            Err(e) => {
                debug!("check"; "refresh failed: {e}");
                resolved_infra(e.into())
            }
        }
    }

    fn await_start(&mut self, attempts: u32) -> CheckState {
        if attempts >= self.policy.start_attempts {
            return self.nothing_to_compile();
        }

        self.sleeper.sleep(self.policy.interval);
        let attempts = attempts + 1;
        match self.client.ping() {
            Ok(true) => {
                log!("check"; "compiling...");
                CheckState::Compiling
            }
            Ok(false) if attempts >= self.policy.start_attempts => self.nothing_to_compile(),
            Ok(false) => CheckState::AwaitingStart { attempts },
            Err(e) if e.is_connection_failure() => {
                log!("check"; "editor went away, assuming compilation started");
                CheckState::Compiling
            }
            Err(e) => resolved_infra(e.into()),
        }
    }

    fn nothing_to_compile(&self) -> CheckState {
        debug!("check"; "no compilation observed");
        CheckState::Settling
    }

    fn watch_compile(&mut self) -> CheckState {
        self.sleeper.sleep(self.policy.interval);
        match self.client.ping() {
            Ok(true) => CheckState::Compiling,
            Ok(false) => {
                debug!("check"; "compilation finished");
                CheckState::Settling
            }
            Err(e) => self.dropped(e, 0),
        }
    }

    fn reconnect(&mut self, failures: u32) -> CheckState {
        self.sleeper.sleep(self.policy.interval);
        match self.client.ping() {
            // Any answer after a drop means the reload completed, whatever
            // flag it reports.
            Ok(_) => {
                log!("check"; "editor is back after {} failed probe(s)", failures);
                CheckState::Settling
            }
            Err(e) => self.dropped(e, failures),
        }
    }

    fn dropped(&self, err: ClientError, failures: u32) -> CheckState {
        if !err.is_connection_failure() {
            return resolved_infra(err.into());
        }

        let failures = failures + 1;
        if failures == 1 {
            log!("check"; "connection lost, waiting for domain reload");
        }
        if failures > self.policy.reconnect_attempts {
            return resolved_infra(InfraFailure::DisconnectedTooLong { failures });
        }
        debug!("check"; "probe failed: {}", err);
        crate::logger::status(
            "check",
            &format!(
                "waiting for editor ({}/{})",
                failures, self.policy.reconnect_attempts
            ),
        );
        CheckState::PossibleReload { failures }
    }

    fn settle(&mut self) -> CheckState {
        self.sleeper.sleep(self.policy.settle_delay);
        match self.client.fetch_errors() {
            Ok(errors) => CheckState::Resolved(CheckOutcome::from_errors(errors)),
            Err(e) => resolved_infra(e.into()),
        }
    }
}

fn resolved_infra(failure: InfraFailure) -> CheckState {
    CheckState::Resolved(CheckOutcome::Infrastructure(failure))
}
