//! Standalone host collaborators for `unity-agent serve`.
//!
//! When the status server cannot be embedded in the editor, these stand in
//! for the editor hooks:
//!
//! - [`LogFileSource`]: compile errors scraped from the editor log
//! - [`CommandHost`]: compiling flag from a marker file, refresh via a command

mod command;
mod log_file;

pub use command::CommandHost;
pub use log_file::LogFileSource;
