//! `serve`: standalone status server.
//!
//! Runs the listener plus a host update loop in this process, using the
//! editor log as diagnostic source and a marker file as compiling flag.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver, RecvTimeoutError};

use crate::config::AgentConfig;
use crate::core::{is_shutdown, register_server};
use crate::host::{CommandHost, LogFileSource};
use crate::protocol::AGENT_LOG_PREFIX;
use crate::server::{DiagnosticSource, EditorHost, ServerContext, StatusServer, UpdateStep};
use crate::{debug, log};

/// Run the standalone server until Ctrl+C.
pub fn run(config: &AgentConfig) -> Result<()> {
    let serve = &config.serve;
    let pattern = serve
        .error_regex()
        .context("Invalid serve.error_pattern")?;
    let compile_start = serve
        .compile_start_regex()
        .context("Invalid serve.compile_start_pattern")?;

    let server = StatusServer::bind(serve.addr())?;
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    register_server(server.raw(), shutdown_tx);

    let ctx = ServerContext::new();
    let handle = server.spawn(Arc::clone(&ctx))?;
    log!("serve"; "{} started", AGENT_LOG_PREFIX);

    match &serve.log_path {
        Some(path) => debug!("serve"; "reading compile errors from {}", path.display()),
        None => log!("warning"; "no serve.log_path configured, error cache stays empty"),
    }

    let host = CommandHost::new(serve.compiling_marker.clone(), serve.refresh_command.clone());
    let source = LogFileSource::new(serve.log_path.clone(), pattern, compile_start);
    let mut step = UpdateStep::new(ctx, host, source, serve.cache_interval());

    run_update_loop(&mut step, serve.tick_interval(), &shutdown_rx);

    handle.shutdown();
    log!("serve"; "{} stopped", AGENT_LOG_PREFIX);
    Ok(())
}

/// Tick the update step every `interval` until a shutdown signal arrives.
fn run_update_loop<H, S>(step: &mut UpdateStep<H, S>, interval: Duration, shutdown: &Receiver<()>)
where
    H: EditorHost,
    S: DiagnosticSource,
{
    loop {
        step.tick(Instant::now());

        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) if !is_shutdown() => {}
            _ => break,
        }
    }
}
