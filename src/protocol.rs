//! Wire shapes shared by the status server and the check client.
//!
//! | Endpoint          | Body                                          |
//! |-------------------|-----------------------------------------------|
//! | `/refresh`        | `{"status":"ok"}`                             |
//! | `/ping`           | `{"isCompiling":bool}`                        |
//! | `/compile-errors` | `[{"File":str,"Line":int,"Message":str}, ..]` |
//!
//! Field names are part of the contract and must not change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known loopback port of the status server.
pub const DEFAULT_PORT: u16 = 5142;

/// Prefix the agent uses for its own host log lines.
///
/// Log entries starting with this are never reported as compile errors.
pub const AGENT_LOG_PREFIX: &str = "Unity Agent Server";

/// Endpoints exposed by the status server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Refresh,
    Ping,
    CompileErrors,
}

impl Endpoint {
    pub const ALL: [Self; 3] = [Self::Refresh, Self::Ping, Self::CompileErrors];

    pub const fn path(self) -> &'static str {
        match self {
            Self::Refresh => "/refresh",
            Self::Ping => "/ping",
            Self::CompileErrors => "/compile-errors",
        }
    }

    /// Route a request URL to an endpoint, ignoring any query string.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        Self::ALL.into_iter().find(|endpoint| endpoint.path() == path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A single compiler diagnostic reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompileError {
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Line")]
    pub line: u32,
    #[serde(rename = "Message")]
    pub message: String,
}

impl CompileError {
    pub fn new(file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

/// Body of `/ping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingStatus {
    #[serde(rename = "isCompiling")]
    pub is_compiling: bool,
}

/// Body of `/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshAck {
    pub status: String,
}

impl RefreshAck {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_field_names() {
        let error = CompileError::new("Assets/Player.cs", 12, "error CS0103: missing");
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(
            json,
            r#"{"File":"Assets/Player.cs","Line":12,"Message":"error CS0103: missing"}"#
        );
    }

    #[test]
    fn test_compile_error_special_characters_roundtrip() {
        let message = "expected \"}\" in C:\\Project\\Assets\\A.cs\nsecond line\ttab";
        let error = CompileError::new("Assets/A.cs", 3, message);

        let json = serde_json::to_string(&vec![error.clone()]).unwrap();
        let decoded: Vec<CompileError> = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, vec![error]);
        assert_eq!(decoded[0].message, message);
    }

    #[test]
    fn test_compile_error_rejects_lowercase_fields() {
        let result: Result<CompileError, _> =
            serde_json::from_str(r#"{"file":"a.cs","line":1,"message":"m"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_ping_shape() {
        let json = serde_json::to_string(&PingStatus { is_compiling: true }).unwrap();
        assert_eq!(json, r#"{"isCompiling":true}"#);

        let parsed: PingStatus = serde_json::from_str(r#"{"isCompiling":false}"#).unwrap();
        assert!(!parsed.is_compiling);
    }

    #[test]
    fn test_refresh_ack_shape() {
        let json = serde_json::to_string(&RefreshAck::ok()).unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }

    #[test]
    fn test_endpoint_routing() {
        assert_eq!(Endpoint::from_url("/ping"), Some(Endpoint::Ping));
        assert_eq!(Endpoint::from_url("/refresh?now=1"), Some(Endpoint::Refresh));
        assert_eq!(
            Endpoint::from_url("/compile-errors"),
            Some(Endpoint::CompileErrors)
        );
        assert_eq!(Endpoint::from_url("/"), None);
        assert_eq!(Endpoint::from_url("/ping/extra"), None);
    }
}
