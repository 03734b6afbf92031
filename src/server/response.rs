//! Request routing and HTTP responses.

use anyhow::{Context, Result};
use tiny_http::{Header, Request, Response, StatusCode};

use super::context::{PendingAction, ServerContext};
use crate::log;
use crate::protocol::{Endpoint, PingStatus, RefreshAck};

/// A response ready to be written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<String>,
}

impl Reply {
    fn json(body: String) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn not_found() -> Self {
        Self::empty(404)
    }

    pub fn internal_error() -> Self {
        Self::empty(500)
    }
}

/// Answer a request URL from server-local state.
///
/// Only `/refresh` has an effect, and that effect is deferred to the next
/// host update tick.
pub fn route(url: &str, ctx: &ServerContext) -> Result<Reply> {
    let Some(endpoint) = Endpoint::from_url(url) else {
        return Ok(Reply::not_found());
    };

    let body = match endpoint {
        Endpoint::CompileErrors => serde_json::to_string(ctx.errors().as_slice())
            .context("Failed to encode compile errors")?,
        Endpoint::Refresh => {
            ctx.enqueue(PendingAction::Refresh);
            serde_json::to_string(&RefreshAck::ok())?
        }
        Endpoint::Ping => serde_json::to_string(&PingStatus {
            is_compiling: ctx.is_compiling(),
        })?,
    };

    Ok(Reply::json(body))
}

/// Answer `url` with `handler`, turning a handler failure into a 500.
pub fn reply_with<F>(url: &str, ctx: &ServerContext, handler: F) -> Reply
where
    F: FnOnce(&str, &ServerContext) -> Result<Reply>,
{
    match handler(url, ctx) {
        Ok(reply) => reply,
        Err(e) => {
            log!("error"; "error handling {}: {:#}", url, e);
            Reply::internal_error()
        }
    }
}

/// Write a reply to the client.
pub fn send(request: Request, reply: Reply) -> Result<()> {
    let status = StatusCode(reply.status);
    match reply.body {
        Some(body) => {
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(json_header());
            request.respond(response)?;
        }
        None => request.respond(Response::empty(status))?,
    }
    Ok(())
}

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").unwrap()
}
