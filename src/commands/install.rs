//! Install command - runs the full pipeline.

use anyhow::Context;

use crate::config::Config;
use crate::context::HostContext;
use crate::error::InstallError;
use crate::pipeline::Installer;
use crate::process::ProcessRunner;
use crate::prompt::TerminalPrompter;

/// Execute the install command.
pub fn cmd_install(
    ctx: HostContext,
    runner: &dyn ProcessRunner,
    config: Config,
    json: bool,
) -> Result<(), InstallError> {
    let prompter = TerminalPrompter;
    let mut installer = Installer::new(ctx, runner, &prompter, config);
    let report = installer.run()?;

    if json {
        let text = serde_json::to_string(&report).context("Failed to serialize install report")?;
        println!("{}", text);
    }
    Ok(())
}
