//! Terminal output
//!
//! Uses `cliclack` when attached to an interactive terminal and falls back to
//! plain `[OK]`/`[WARN]` lines in pipes and CI.

mod context;
mod output;

pub use context::UiContext;
pub use output::{intro, key_value, outro_success, step_info, step_ok_detail, step_warn_hint};
