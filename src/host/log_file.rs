//! Compile errors scraped from the editor log.
//!
//! The editor appends to one log for its whole session. Each collection reads
//! only the complete lines appended since the previous one. A line matching
//! the compile-start pattern discards everything collected so far, so errors
//! fixed by a later pass disappear. The error regex must provide `file`,
//! `line` and `message` named groups.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::PathBuf;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use crate::debug;
use crate::protocol::{AGENT_LOG_PREFIX, CompileError};
use crate::server::DiagnosticSource;

pub struct LogFileSource {
    path: Option<PathBuf>,
    pattern: Regex,
    compile_start: Regex,
    /// Bytes of the log already consumed.
    offset: u64,
    /// Errors of the current compilation pass, in log order.
    current: Vec<CompileError>,
}

impl LogFileSource {
    pub fn new(path: Option<PathBuf>, pattern: Regex, compile_start: Regex) -> Self {
        Self {
            path,
            pattern,
            compile_start,
            offset: 0,
            current: Vec::new(),
        }
    }

    /// Errors of the latest compilation pass seen so far.
    pub fn errors(&self) -> &[CompileError] {
        &self.current
    }

    /// Consume complete log lines.
    ///
    /// Identical entries within one pass are reported once.
    pub fn feed(&mut self, text: &str) {
        for line in text.lines().map(str::trim_end) {
            if self.compile_start.is_match(line) {
                self.current.clear();
                continue;
            }
            let Some(error) = self.pattern.captures(line).and_then(|caps| to_error(&caps)) else {
                continue;
            };
            if !self.current.contains(&error) {
                self.current.push(error);
            }
        }
    }

    fn reset(&mut self) {
        self.offset = 0;
        self.current.clear();
    }
}

fn to_error(caps: &Captures<'_>) -> Option<CompileError> {
    let file = caps.name("file")?.as_str().trim();
    let message = caps.name("message")?.as_str().trim();
    if file.is_empty() || message.starts_with(AGENT_LOG_PREFIX) {
        return None;
    }
    let line = caps
        .name("line")
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(CompileError::new(file, line, message))
}

impl DiagnosticSource for LogFileSource {
    fn collect(&mut self) -> Result<Vec<CompileError>> {
        let Some(path) = self.path.clone() else {
            return Ok(Vec::new());
        };

        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("serve"; "log file {} does not exist yet", path.display());
                self.reset();
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()));
            }
        };

        let len = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        if len < self.offset {
            debug!("serve"; "log file {} was truncated, rescanning", path.display());
            self.reset();
        }

        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(self.offset))
            .and_then(|_| file.read_to_end(&mut bytes))
            .with_context(|| format!("Failed to read {}", path.display()))?;

        // A trailing partial line is left for the next collection.
        let complete = bytes
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |idx| idx + 1);
        self.feed(&String::from_utf8_lossy(&bytes[..complete]));
        self.offset += complete as u64;

        Ok(self.current.clone())
    }
}
