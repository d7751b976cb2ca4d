//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `install` - Run the install pipeline
//! - `preflight` - Check the host without changing it
//! - `show` - Display configuration or the detected platform

mod install;
mod preflight;
pub mod show;

pub use install::cmd_install;
pub use preflight::cmd_preflight;
pub use show::cmd_show;
