//! Loopback status server embedded in the editor process.
//!
//! ```text
//! listener thread                 host update step
//! ───────────────                 ────────────────
//! /refresh ──enqueue──▶ pending ──drain──▶ EditorHost::refresh
//! /ping    ◀──load──── compiling ◀─store── EditorHost::is_compiling
//! /compile-errors ◀─── errors ◀──swap──── DiagnosticSource::collect
//! ```
//!
//! Requests are accepted and answered one at a time on a single listener
//! thread. Handlers only read server-local state.

mod context;
mod response;
mod update;

pub use context::{PendingAction, ServerContext};
pub use update::{DiagnosticSource, EditorHost, UpdateStep};

#[cfg(test)]
pub(crate) use update::tests as fakes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tiny_http::{Request, Server};

use crate::{debug, log};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind status server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("failed to spawn listener thread")]
    Spawn(#[source] std::io::Error),
}

/// Bound listener ready to accept requests.
pub struct StatusServer {
    server: Arc<Server>,
    addr: SocketAddr,
}

impl StatusServer {
    /// Bind the listening socket.
    ///
    /// There is no port fallback: the client only knows one port, so a
    /// busy port is fatal.
    pub fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let server = Server::http(addr).map_err(|source| ServerError::Bind { addr, source })?;
        let addr = server.server_addr().to_ip().unwrap_or(addr);
        Ok(Self {
            server: Arc::new(server),
            addr,
        })
    }

    /// Actual bound address (differs from the requested one for port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared handle used to unblock the listener from a signal handler.
    pub fn raw(&self) -> Arc<Server> {
        Arc::clone(&self.server)
    }

    /// Start the listener thread.
    pub fn spawn(self, ctx: Arc<ServerContext>) -> Result<ServerHandle, ServerError> {
        let server = Arc::clone(&self.server);
        let thread = thread::Builder::new()
            .name("agent-listener".into())
            .spawn(move || run_request_loop(&server, &ctx, response::route))
            .map_err(ServerError::Spawn)?;

        log!("serve"; "listening on http://{}", self.addr);

        Ok(ServerHandle {
            server: self.server,
            addr: self.addr,
            thread: Some(thread),
        })
    }
}

/// Running listener. Dropping the handle stops it.
pub struct ServerHandle {
    server: Arc<Server>,
    addr: SocketAddr,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Unblock the listener and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Signature of the request handler run by the listener.
type Handler = fn(&str, &ServerContext) -> anyhow::Result<response::Reply>;

fn run_request_loop(server: &Server, ctx: &ServerContext, handler: Handler) {
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, ctx, handler) {
            debug!("serve"; "request error: {e}");
        }
    }
    debug!("serve"; "listener stopped");
}

fn handle_request(request: Request, ctx: &ServerContext, handler: Handler) -> anyhow::Result<()> {
    let reply = response::reply_with(request.url(), ctx, handler);
    response::send(request, reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CompileError;
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpStream};

    fn loopback() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    /// Minimal raw GET so these tests do not depend on the client module.
    fn get(addr: SocketAddr, path: &str) -> (u16, String) {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"
        )
        .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).unwrap();

        let status = raw
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .unwrap();
        let body = raw
            .split_once("\r\n\r\n")
            .map(|(_, body)| body.to_string())
            .unwrap_or_default();
        (status, body)
    }

    #[test]
    fn test_serves_endpoints_over_http() {
        let ctx = ServerContext::new();
        ctx.replace_errors(vec![CompileError::new("Assets/A.cs", 2, "bad")]);

        let handle = StatusServer::bind(loopback())
            .unwrap()
            .spawn(Arc::clone(&ctx))
            .unwrap();
        let addr = handle.addr();

        assert_eq!(get(addr, "/ping"), (200, r#"{"isCompiling":false}"#.into()));
        assert_eq!(
            get(addr, "/compile-errors"),
            (
                200,
                r#"[{"File":"Assets/A.cs","Line":2,"Message":"bad"}]"#.into()
            )
        );
        assert_eq!(get(addr, "/refresh"), (200, r#"{"status":"ok"}"#.into()));
        assert_eq!(get(addr, "/nope").0, 404);
        assert_eq!(ctx.pending_len(), 1);

        handle.shutdown();
    }

    #[test]
    fn test_handler_failure_is_internal_error() {
        let server = StatusServer::bind(loopback()).unwrap();
        let addr = server.addr();
        let raw = server.raw();
        let ctx = ServerContext::new();

        let listener = {
            let raw = Arc::clone(&raw);
            std::thread::spawn(move || {
                run_request_loop(&raw, &ctx, |_, _| anyhow::bail!("encoder broke"))
            })
        };

        assert_eq!(get(addr, "/compile-errors"), (500, String::new()));

        raw.unblock();
        listener.join().unwrap();
    }

    #[test]
    fn test_bind_port_in_use_fails() {
        let first = StatusServer::bind(loopback()).unwrap();
        let err = StatusServer::bind(first.addr()).err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
        assert!(err.to_string().contains(&first.addr().to_string()));
    }
}
