//! Terminal output for the CLI
//!
//! Uses `cliclack` framing and spinners in an interactive terminal and
//! plain lines when piped or running under CI.

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{intro, key_value, outro, remark, step_error_detail, step_ok, step_warn};
pub use progress::TaskSpinner;
pub use theme::{init_theme, CacheTheme};
