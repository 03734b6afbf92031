//! Editor hooks backed by the filesystem and an external command.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

use crate::server::EditorHost;
use crate::{debug, log};

/// Reports "compiling" while a marker file exists and runs a command on
/// refresh.
pub struct CommandHost {
    compiling_marker: Option<PathBuf>,
    refresh_command: Vec<String>,
}

impl CommandHost {
    pub fn new(compiling_marker: Option<PathBuf>, refresh_command: Vec<String>) -> Self {
        Self {
            compiling_marker,
            refresh_command,
        }
    }
}

impl EditorHost for CommandHost {
    fn is_compiling(&self) -> bool {
        self.compiling_marker
            .as_deref()
            .is_some_and(|marker| marker.exists())
    }

    fn refresh(&mut self) -> Result<()> {
        let Some((program, args)) = self.refresh_command.split_first() else {
            debug!("serve"; "refresh requested, no refresh_command configured");
            return Ok(());
        };

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute `{program}`"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("`{program}` failed: {}\n{}", output.status, stderr.trim_end());
        }

        log!("serve"; "refresh: ran `{}`", self.refresh_command.join(" "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_marker_drives_compiling_flag() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("compiling");
        let host = CommandHost::new(Some(marker.clone()), Vec::new());

        assert!(!host.is_compiling());
        fs::write(&marker, "").unwrap();
        assert!(host.is_compiling());
        fs::remove_file(&marker).unwrap();
        assert!(!host.is_compiling());
    }

    #[test]
    fn test_no_marker_never_compiles() {
        assert!(!CommandHost::new(None, Vec::new()).is_compiling());
    }

    #[test]
    fn test_refresh_without_command_is_noop() {
        assert!(CommandHost::new(None, Vec::new()).refresh().is_ok());
    }

    #[test]
    fn test_refresh_missing_program_fails() {
        let mut host = CommandHost::new(None, vec!["unity-agent-no-such-program".into()]);
        let err = host.refresh().unwrap_err();
        assert!(err.to_string().contains("unity-agent-no-such-program"));
    }

    #[cfg(unix)]
    #[test]
    fn test_refresh_runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let touched = dir.path().join("refreshed");
        let mut host = CommandHost::new(
            None,
            vec!["touch".into(), touched.to_string_lossy().into_owned()],
        );

        host.refresh().unwrap();
        assert!(touched.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_refresh_reports_exit_status() {
        let mut host = CommandHost::new(None, vec!["false".into()]);
        assert!(host.refresh().is_err());
    }
}
