//! Process-wide shutdown state.
//!
//! - `server`: listener to unblock on shutdown
//! - `shutdown_tx`: wakes the `serve` update loop
//! - `requested`: Has shutdown been requested? (Ctrl+C received)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam::channel::Sender;
use tiny_http::Server;

/// Exit code for an interrupted run (128 + SIGINT).
const INTERRUPTED: i32 = 130;

/// State the Ctrl+C handler acts on
static SHUTDOWN: ShutdownState = ShutdownState::new();

/// What a graceful shutdown has to reach.
struct ShutdownState {
    requested: AtomicBool,
    server: OnceLock<Arc<Server>>,
    shutdown_tx: OnceLock<Sender<()>>,
}

impl ShutdownState {
    const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            server: OnceLock::new(),
            shutdown_tx: OnceLock::new(),
        }
    }

    fn register(&self, server: Arc<Server>, shutdown_tx: Sender<()>) {
        let _ = self.server.set(server);
        let _ = self.shutdown_tx.set(shutdown_tx);
    }

    /// Flag shutdown and wake everything registered.
    ///
    /// Returns `false` when nothing was registered to shut down gracefully.
    fn request(&self) -> bool {
        self.requested.store(true, Ordering::SeqCst);

        if let Some(tx) = self.shutdown_tx.get() {
            let _ = tx.try_send(());
        }

        match self.server.get() {
            Some(server) => {
                crate::log!("serve"; "shutting down...");
                server.unblock();
                true
            }
            None => false,
        }
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }
}

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_server()`: exit immediately with a failure code, so an
///   interrupted `check` is never mistaken for a clean build
/// - After `register_server()`: unblock the listener and stop the update loop
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if !SHUTDOWN.request() {
            crate::logger::clear_status();
            std::process::exit(INTERRUPTED);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server for graceful shutdown
///
/// Call this after binding the server, before entering the update loop
pub fn register_server(server: Arc<Server>, shutdown_tx: Sender<()>) {
    SHUTDOWN.register(server, shutdown_tx);
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.is_requested()
}
