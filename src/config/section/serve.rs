//! `[serve]` section configuration.
//!
//! Settings of the standalone status server (`unity-agent serve`).
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"           # loopback only
//! port = 5142
//! cache_interval_ms = 1000          # error cache refresh cadence
//! tick_interval_ms = 100            # host update step cadence
//! log_path = "Logs/Editor.log"      # editor log scanned for compile errors
//! compile_start_pattern = "^- Starting script compilation"
//! compiling_marker = "Temp/compiling"
//! refresh_command = ["touch", "Assets/.refresh"]
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_PORT;

/// Default predicate for compiler error lines:
/// `Assets/Player.cs(12,5): error CS0103: The name 'x' does not exist`.
pub const DEFAULT_ERROR_PATTERN: &str =
    r"^(?P<file>[^()\r\n]+)\((?P<line>\d+)(?:,\d+)?\): (?P<message>error .+)$";

/// Default marker of a new compilation pass in the editor log. Errors logged
/// before the last such line belong to an earlier pass.
pub const DEFAULT_COMPILE_START_PATTERN: &str =
    r"^(?:- Starting script compilation|\[ScriptCompilation\] Requested script compilation)";

/// Standalone server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind. Keep it on loopback.
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// How often the error cache is rebuilt.
    pub cache_interval_ms: u64,

    /// How often the host update step runs.
    pub tick_interval_ms: u64,

    /// Editor log scanned for compile errors. Without it the cache stays empty.
    pub log_path: Option<PathBuf>,

    /// Regex selecting compile error lines, with `file`, `line` and
    /// `message` named groups.
    pub error_pattern: String,

    /// Regex of the log line that starts a compilation pass.
    pub compile_start_pattern: String,

    /// While this path exists the host reports itself as compiling.
    pub compiling_marker: Option<PathBuf>,

    /// Command run when a refresh is requested.
    pub refresh_command: Vec<String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            cache_interval_ms: 1000,
            tick_interval_ms: 100,
            log_path: None,
            error_pattern: DEFAULT_ERROR_PATTERN.to_string(),
            compile_start_pattern: DEFAULT_COMPILE_START_PATTERN.to_string(),
            compiling_marker: None,
            refresh_command: Vec::new(),
        }
    }
}

impl ServeConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.port)
    }

    pub fn cache_interval(&self) -> Duration {
        Duration::from_millis(self.cache_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Compile the error predicate.
    pub fn error_regex(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.error_pattern)
    }

    pub fn compile_start_regex(&self) -> Result<Regex, regex::Error> {
        Regex::new(&self.compile_start_pattern)
    }

    /// Make relative paths relative to the config file's directory.
    pub(in crate::config) fn normalize_paths(&mut self, root: &Path) {
        for path in [&mut self.log_path, &mut self.compiling_marker]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }

    /// Collect validation problems as `(field, message)` pairs.
    pub(in crate::config) fn problems(&self) -> Vec<(&'static str, String)> {
        let mut problems = Vec::new();
        if self.cache_interval_ms == 0 {
            problems.push(("serve.cache_interval_ms", "must be greater than 0".into()));
        }
        if self.tick_interval_ms == 0 {
            problems.push(("serve.tick_interval_ms", "must be greater than 0".into()));
        }
        match self.error_regex() {
            Ok(regex) => {
                let names: Vec<_> = regex.capture_names().flatten().collect();
                for group in ["file", "line", "message"] {
                    if !names.contains(&group) {
                        problems.push((
                            "serve.error_pattern",
                            format!("missing named group `{group}`"),
                        ));
                    }
                }
            }
            Err(e) => problems.push(("serve.error_pattern", e.to_string())),
        }
        if let Err(e) = self.compile_start_regex() {
            problems.push(("serve.compile_start_pattern", e.to_string()));
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(config.serve.addr().to_string(), "127.0.0.1:5142");
        assert_eq!(config.serve.cache_interval().as_millis(), 1000);
        assert!(config.serve.log_path.is_none());
        assert!(config.serve.refresh_command.is_empty());
        assert!(config.serve.problems().is_empty());
    }

    #[test]
    fn test_default_pattern_matches_compiler_line() {
        let config = test_parse_config("");
        let regex = config.serve.error_regex().unwrap();

        let caps = regex
            .captures("Assets/Scripts/Player.cs(12,5): error CS0103: The name 'x' does not exist")
            .unwrap();
        assert_eq!(&caps["file"], "Assets/Scripts/Player.cs");
        assert_eq!(&caps["line"], "12");
        assert_eq!(&caps["message"], "error CS0103: The name 'x' does not exist");

        assert!(
            regex
                .captures("Assets/Scripts/Player.cs(3,1): warning CS0168: unused")
                .is_none()
        );
    }

    #[test]
    fn test_default_compile_start_pattern() {
        let config = test_parse_config("");
        let regex = config.serve.compile_start_regex().unwrap();

        assert!(regex.is_match("- Starting script compilation"));
        assert!(regex.is_match(
            "[ScriptCompilation] Requested script compilation because: Assetdatabase observed changes"
        ));
        assert!(!regex.is_match("Assets/A.cs(1,1): error CS1002: ; expected"));
    }

    #[test]
    fn test_invalid_compile_start_pattern_is_rejected() {
        let config = test_parse_config("[serve]\ncompile_start_pattern = \"[oops\"");
        let problems = config.serve.problems();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].0, "serve.compile_start_pattern");
    }

    #[test]
    fn test_pattern_without_groups_is_rejected() {
        let config = test_parse_config("[serve]\nerror_pattern = \"error\"");
        let problems = config.serve.problems();
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().all(|(field, _)| *field == "serve.error_pattern"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = test_parse_config("[serve]\nerror_pattern = \"(unclosed\"");
        assert_eq!(config.serve.problems().len(), 1);
    }

    #[test]
    fn test_normalize_relative_paths() {
        let mut config = test_parse_config(
            "[serve]\nlog_path = \"Logs/Editor.log\"\ncompiling_marker = \"/tmp/compiling\"",
        );
        config.serve.normalize_paths(Path::new("/project"));

        assert_eq!(
            config.serve.log_path,
            Some(PathBuf::from("/project/Logs/Editor.log"))
        );
        assert_eq!(
            config.serve.compiling_marker,
            Some(PathBuf::from("/tmp/compiling"))
        );
    }
}
