//! Show command - displays information.

use crate::config::Config;
use crate::context::HostContext;
use crate::platform;
use crate::process::ProcessRunner;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
    /// Show detected platform
    Platform,
}

/// Execute the show command.
pub fn cmd_show(ctx: &HostContext, runner: &dyn ProcessRunner, target: ShowTarget, config: &Config) {
    match target {
        ShowTarget::Config => config.print(),
        ShowTarget::Platform => {
            let info = platform::detect(ctx, runner);
            println!("Platform:");
            println!("  kernel: {} ({})", info.os, ctx.kernel);
            println!("  machine: {} ({})", info.arch, ctx.machine);
            println!("  distro: {}", info.distro_id);
            println!("  package manager: {}", info.package_manager);
            println!("  running as root: {}", ctx.is_root);
            if !info.is_supported() {
                println!("\n  This platform is not supported.");
            }
        }
    }
}
