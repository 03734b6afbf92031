//! Process-scoped server state.
//!
//! One [`ServerContext`] is built when the host starts the agent and dropped
//! when it shuts down. It holds everything the listener thread and the host
//! update step share:
//!
//! - `compiling`: written by the update step, read by `/ping`
//! - `errors`: swapped wholesale by the update step, read by `/compile-errors`
//! - `pending`: filled by the listener, drained by the update step

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use crossbeam::queue::SegQueue;

use crate::protocol::CompileError;

/// Work the listener hands over to the host update step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Ask the host to re-scan sources (may or may not start a compile).
    Refresh,
}

/// Shared state between the listener thread and the host update step.
#[derive(Debug)]
pub struct ServerContext {
    compiling: AtomicBool,
    errors: ArcSwap<Vec<CompileError>>,
    pending: SegQueue<PendingAction>,
}

impl ServerContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            compiling: AtomicBool::new(false),
            errors: ArcSwap::from_pointee(Vec::new()),
            pending: SegQueue::new(),
        })
    }

    /// Compiling flag as of the last update tick.
    #[inline]
    pub fn is_compiling(&self) -> bool {
        self.compiling.load(Ordering::Acquire)
    }

    #[inline]
    pub(super) fn set_compiling(&self, compiling: bool) {
        self.compiling.store(compiling, Ordering::Release);
    }

    /// Current error snapshot. Never triggers extraction.
    #[inline]
    pub fn errors(&self) -> Arc<Vec<CompileError>> {
        self.errors.load_full()
    }

    /// Replace the error snapshot in one reference swap.
    pub(super) fn replace_errors(&self, errors: Vec<CompileError>) {
        self.errors.store(Arc::new(errors));
    }

    /// Queue an action for the next update tick (lock-free).
    pub fn enqueue(&self, action: PendingAction) {
        self.pending.push(action);
    }

    pub(super) fn next_action(&self) -> Option<PendingAction> {
        self.pending.pop()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
