//! Logging utilities with colored output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, only shown with `--verbose`
//! - a single overwriting status line for long waits (`status` / `clear_status`)
//!
//! Everything goes to stderr; stdout is reserved for the check verdict.
//!
//! # Example
//!
//! ```ignore
//! log!("serve"; "listening on http://{}", addr);
//! logger::status("check", "waiting for editor (3/30)");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::{OwoColorize, Stream};
use std::{
    io::{IsTerminal, Write, stderr},
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// A status line is on screen without a trailing newline
static STATUS_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut stderr = stderr().lock();

    clear_status_line(&mut stderr);
    writeln!(stderr, "{prefix} {message}").ok();
    stderr.flush().ok();
}

/// Apply color to a module prefix based on module type
fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    prefix
        .if_supports_color(Stream::Stderr, |p| {
            match module.to_ascii_lowercase().as_str() {
                "serve" => p.bright_blue().bold().to_string(),
                "check" => p.bright_green().bold().to_string(),
                "error" => p.bright_red().bold().to_string(),
                _ => p.bright_yellow().bold().to_string(),
            }
        })
        .to_string()
}

// ============================================================================
// Status Line (single overwriting line)
// ============================================================================

/// Show a transient status line, replacing the previous one.
///
/// On a terminal the line is redrawn in place; otherwise it degrades to a
/// regular log line so CI logs stay readable.
pub fn status(module: &str, message: &str) {
    let mut stderr = stderr().lock();
    if !stderr.is_terminal() {
        drop(stderr);
        log(module, message);
        return;
    }

    execute!(
        stderr,
        cursor::MoveToColumn(0),
        Clear(ClearType::CurrentLine)
    )
    .ok();
    write!(stderr, "{}", format_status(module, message)).ok();
    stderr.flush().ok();
    STATUS_ACTIVE.store(true, Ordering::SeqCst);
}

fn format_status(module: &str, message: &str) -> String {
    let message = message.if_supports_color(Stream::Stderr, |m| m.dimmed());
    format!("{} {message}", colorize_prefix(module))
}

/// Remove the status line, if any.
pub fn clear_status() {
    let mut stderr = stderr().lock();
    clear_status_line(&mut stderr);
    stderr.flush().ok();
}

fn clear_status_line(w: &mut impl Write) {
    if STATUS_ACTIVE.swap(false, Ordering::SeqCst) {
        execute!(w, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
    }
}

// ============================================================================
// Tests
// ============================================================================
