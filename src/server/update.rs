//! Host-driven update step.
//!
//! The host calls [`UpdateStep::tick`] from its own frame/tick loop. The
//! update step is the only writer of the compiling flag and the error cache,
//! and the only consumer of the pending-action queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use super::context::{PendingAction, ServerContext};
use crate::protocol::CompileError;
use crate::{debug, log};

/// Editor-side hooks the agent relies on.
pub trait EditorHost {
    /// Live compilation state of the host.
    fn is_compiling(&self) -> bool;

    /// Re-scan sources for changes. May or may not start a compile.
    fn refresh(&mut self) -> Result<()>;
}

/// Supplies the current compiler diagnostics of the host.
///
/// Which host log entries count as compile errors is decided here, never by
/// the server.
pub trait DiagnosticSource {
    fn collect(&mut self) -> Result<Vec<CompileError>>;
}

/// Cooperative update step owned by the host thread.
pub struct UpdateStep<H, S> {
    ctx: Arc<ServerContext>,
    host: H,
    source: S,
    cache_interval: Duration,
    last_scan: Option<Instant>,
}

impl<H: EditorHost, S: DiagnosticSource> UpdateStep<H, S> {
    pub fn new(ctx: Arc<ServerContext>, host: H, source: S, cache_interval: Duration) -> Self {
        Self {
            ctx,
            host,
            source,
            cache_interval,
            last_scan: None,
        }
    }

    /// Run one update: sample the flag, refresh the cache when due, then
    /// drain queued actions.
    pub fn tick(&mut self, now: Instant) {
        self.ctx.set_compiling(self.host.is_compiling());

        if self.cache_due(now) {
            self.refresh_cache();
            self.last_scan = Some(now);
        }

        while let Some(action) = self.ctx.next_action() {
            self.run_action(action);
        }
    }

    fn cache_due(&self, now: Instant) -> bool {
        match self.last_scan {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.cache_interval,
        }
    }

    /// Rebuild the cache off to the side, then swap it in.
    ///
    /// A failing source leaves the previous snapshot in place.
    fn refresh_cache(&mut self) {
        match self.source.collect() {
            Ok(errors) => {
                debug!("serve"; "cached {} compile error(s)", errors.len());
                self.ctx.replace_errors(errors);
            }
            Err(e) => log!("error"; "failed to read compiler diagnostics: {:#}", e),
        }
    }

    fn run_action(&mut self, action: PendingAction) {
        match action {
            PendingAction::Refresh => {
                debug!("serve"; "refreshing sources");
                if let Err(e) = self.host.refresh() {
                    log!("error"; "refresh failed: {:#}", e);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::Cell;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct FakeHost {
        pub compiling: Cell<bool>,
        pub refreshes: usize,
        pub fail_refresh: bool,
    }

    impl EditorHost for FakeHost {
        fn is_compiling(&self) -> bool {
            self.compiling.get()
        }

        fn refresh(&mut self) -> Result<()> {
            self.refreshes += 1;
            if self.fail_refresh {
                bail!("asset database locked");
            }
            Ok(())
        }
    }

    /// Replays scripted results; `None` means "fail this collection".
    #[derive(Default)]
    pub struct ScriptedSource {
        pub script: VecDeque<Option<Vec<CompileError>>>,
        pub calls: usize,
    }

    impl DiagnosticSource for ScriptedSource {
        fn collect(&mut self) -> Result<Vec<CompileError>> {
            self.calls += 1;
            match self.script.pop_front().flatten() {
                Some(errors) => Ok(errors),
                None => bail!("log buffer unavailable"),
            }
        }
    }

    fn step(script: Vec<Option<Vec<CompileError>>>) -> UpdateStep<FakeHost, ScriptedSource> {
        let source = ScriptedSource {
            script: script.into(),
            calls: 0,
        };
        UpdateStep::new(
            ServerContext::new(),
            FakeHost::default(),
            source,
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_first_tick_fills_cache() {
        let mut step = step(vec![Some(vec![CompileError::new("Assets/A.cs", 4, "boom")])]);
        step.tick(Instant::now());

        assert_eq!(step.ctx.errors().len(), 1);
        assert_eq!(step.source.calls, 1);
    }

    #[test]
    fn test_cache_refresh_follows_cadence() {
        let mut step = step(vec![Some(Vec::new()), Some(Vec::new()), Some(Vec::new())]);
        let start = Instant::now();

        step.tick(start);
        step.tick(start + Duration::from_millis(300));
        step.tick(start + Duration::from_millis(900));
        assert_eq!(step.source.calls, 1);

        step.tick(start + Duration::from_millis(1000));
        assert_eq!(step.source.calls, 2);
    }

    #[test]
    fn test_failing_source_keeps_stale_cache() {
        let stale = vec![CompileError::new("Assets/A.cs", 1, "stale")];
        let mut step = step(vec![Some(stale.clone()), None]);
        let start = Instant::now();

        step.tick(start);
        step.tick(start + Duration::from_secs(2));

        assert_eq!(step.source.calls, 2);
        assert_eq!(*step.ctx.errors(), stale);
    }

    #[test]
    fn test_tick_samples_compiling_flag() {
        let mut step = step(Vec::new());
        let now = Instant::now();

        step.host.compiling.set(true);
        step.tick(now);
        assert!(step.ctx.is_compiling());

        step.host.compiling.set(false);
        step.tick(now);
        assert!(!step.ctx.is_compiling());
    }

    #[test]
    fn test_tick_drains_pending_actions() {
        let mut step = step(Vec::new());
        step.ctx.enqueue(PendingAction::Refresh);
        step.ctx.enqueue(PendingAction::Refresh);

        step.tick(Instant::now());

        assert_eq!(step.host.refreshes, 2);
        assert_eq!(step.ctx.pending_len(), 0);
    }

    #[test]
    fn test_failing_action_does_not_block_queue() {
        let mut step = step(Vec::new());
        step.host.fail_refresh = true;
        step.ctx.enqueue(PendingAction::Refresh);
        step.ctx.enqueue(PendingAction::Refresh);

        step.tick(Instant::now());

        assert_eq!(step.host.refreshes, 2);
        assert_eq!(step.ctx.pending_len(), 0);
    }
}
