//! `check`: refresh the editor, wait for compilation and report errors.

use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use crate::client::{CheckMachine, CheckOutcome, PollPolicy, StatusClient, ThreadSleeper, UreqTransport};
use crate::config::AgentConfig;
use crate::{debug, log, logger};

/// Run one check and print its verdict.
///
/// Exit code is success only when compilation finished without errors.
pub fn run(config: &AgentConfig) -> ExitCode {
    let check = &config.check;
    let outcome = execute(check.addr(), check.request_timeout(), check.policy());
    logger::clear_status();

    if let Err(e) = outcome.render(&mut io::stdout().lock(), &mut io::stderr().lock()) {
        log!("error"; "failed to write result: {}", e);
    }
    outcome.exit_code()
}

fn execute(addr: SocketAddr, timeout: Duration, policy: PollPolicy) -> CheckOutcome {
    debug!("check"; "status server at http://{}", addr);
    let client = StatusClient::new(UreqTransport::new(addr, timeout));
    CheckMachine::new(client, ThreadSleeper, policy).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InfraFailure;
    use crate::protocol::CompileError;
    use crate::server::fakes::{FakeHost, ScriptedSource};
    use crate::server::{ServerContext, StatusServer, UpdateStep};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::time::Instant;

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(10),
            start_attempts: 3,
            reconnect_attempts: 3,
            settle_delay: Duration::from_millis(10),
        }
    }

    /// Serve a context whose cache already holds `errors`.
    fn serve(errors: Vec<CompileError>) -> (crate::server::ServerHandle, SocketAddr) {
        let ctx = ServerContext::new();
        let source = ScriptedSource {
            script: [Some(errors)].into(),
            calls: 0,
        };
        let mut step = UpdateStep::new(
            Arc::clone(&ctx),
            FakeHost::default(),
            source,
            Duration::from_secs(60),
        );
        step.tick(Instant::now());

        let server = StatusServer::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = server.addr();
        (server.spawn(ctx).unwrap(), addr)
    }

    #[test]
    fn test_end_to_end_success() {
        let (_handle, addr) = serve(Vec::new());
        let outcome = execute(addr, Duration::from_secs(2), fast_policy());
        assert_eq!(outcome, CheckOutcome::Success);
    }

    #[test]
    fn test_end_to_end_compile_errors() {
        let errors = vec![
            CompileError::new("Assets/Scripts/Player.cs", 12, "error CS0103: 'speed'"),
            CompileError::new("Assets/Scripts/Enemy.cs", 40, "error CS1002: ; expected"),
        ];
        let (_handle, addr) = serve(errors.clone());
        let outcome = execute(addr, Duration::from_secs(2), fast_policy());
        assert_eq!(outcome, CheckOutcome::CompileErrors(errors));
    }

    #[test]
    fn test_no_server_is_reported() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let outcome = execute(addr, Duration::from_secs(2), fast_policy());
        assert_eq!(
            outcome,
            CheckOutcome::Infrastructure(InfraFailure::ServerNotRunning)
        );
    }
}
