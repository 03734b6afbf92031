//! Terminal result of a check run and how it is reported.

use std::io::{self, Write};
use std::process::ExitCode;

use owo_colors::{OwoColorize, Stream};

use super::transport::ClientError;
use crate::protocol::{CompileError, Endpoint};

/// Why the check could not reach a verdict.
///
/// Kept apart from compile errors so automation can tell "build broken"
/// from "infrastructure broken".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfraFailure {
    /// The initial refresh was refused: nothing listens on the port.
    ServerNotRunning,
    Timeout { endpoint: Endpoint },
    Unreachable { endpoint: Endpoint, detail: String },
    Malformed { endpoint: Endpoint, detail: String },
    UnexpectedStatus { endpoint: Endpoint, status: u16 },
    /// Reconnect failures after a drop exceeded the bound.
    DisconnectedTooLong { failures: u32 },
}

impl From<ClientError> for InfraFailure {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Refused { endpoint } => Self::Unreachable {
                endpoint,
                detail: "connection refused".into(),
            },
            ClientError::Unreachable { endpoint, detail } => Self::Unreachable { endpoint, detail },
            ClientError::Timeout { endpoint } => Self::Timeout { endpoint },
            ClientError::Status { endpoint, status } => Self::UnexpectedStatus { endpoint, status },
            ClientError::Malformed { endpoint, detail } => Self::Malformed { endpoint, detail },
        }
    }
}

impl std::fmt::Display for InfraFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerNotRunning => {
                f.write_str("editor is not open or the status server is not running")
            }
            Self::Timeout { endpoint } => write!(f, "request to {endpoint} timed out"),
            Self::Unreachable { detail, .. } => {
                write!(f, "error connecting to status server: {detail}")
            }
            Self::Malformed { detail, .. } => {
                write!(f, "failed to parse response from status server: {detail}")
            }
            Self::UnexpectedStatus { status, .. } => {
                write!(f, "received status code {status} from status server")
            }
            Self::DisconnectedTooLong { failures } => write!(
                f,
                "disconnected from editor for too long ({failures} failed reconnects)"
            ),
        }
    }
}

/// Verdict of one `check` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Success,
    CompileErrors(Vec<CompileError>),
    Infrastructure(InfraFailure),
}

impl CheckOutcome {
    pub fn from_errors(errors: Vec<CompileError>) -> Self {
        if errors.is_empty() {
            Self::Success
        } else {
            Self::CompileErrors(errors)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    /// Print the verdict: success on `out`, everything else on `err`.
    pub fn render(&self, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
        match self {
            Self::Success => {
                let mark = "✓".if_supports_color(Stream::Stdout, |t| t.green());
                writeln!(out, "{mark} Compile Success")
            }
            Self::CompileErrors(errors) => {
                let header = "✗ Compilation Errors Found:"
                    .if_supports_color(Stream::Stderr, |t| t.red());
                writeln!(err, "{header}")?;
                for error in errors {
                    write_error_block(err, error)?;
                }
                Ok(())
            }
            Self::Infrastructure(failure) => {
                let prefix = "error:".if_supports_color(Stream::Stderr, |t| t.red());
                writeln!(err, "{prefix} {failure}")
            }
        }
    }
}

fn write_error_block(w: &mut impl Write, error: &CompileError) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "File: {}:{}", error.file, error.line)?;
    writeln!(w, "Message: {}", error.message)
}
