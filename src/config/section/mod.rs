//! Configuration section definitions.
//!
//! Each module corresponds to a section in `agent.toml`:
//!
//! | Module  | TOML Section | Purpose                                   |
//! |---------|--------------|-------------------------------------------|
//! | `check` | `[check]`    | Client polling bounds and server address  |
//! | `serve` | `[serve]`    | Standalone status server and host wiring  |

mod check;
mod serve;

pub use check::CheckConfig;
pub use serve::{DEFAULT_COMPILE_START_PATTERN, DEFAULT_ERROR_PATTERN, ServeConfig};
