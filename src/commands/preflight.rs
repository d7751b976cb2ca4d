//! Preflight command - runs preflight checks.

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::context::HostContext;
use crate::preflight;
use crate::process::ProcessRunner;

/// Execute the preflight command.
///
/// `--json` prints the report as one JSON line; `--strict` then still
/// exits non-zero when a check failed.
pub fn cmd_preflight(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    config: &Config,
    strict: bool,
    json: bool,
) -> Result<()> {
    if !json {
        return if strict {
            preflight::run_preflight_or_fail(ctx, runner, config)
        } else {
            let report = preflight::run_preflight(ctx, runner, config);
            report.print();
            if !report.all_passed() {
                println!("Some checks failed. Use --strict to exit non-zero.");
            }
            Ok(())
        };
    }

    let report = preflight::run_preflight(ctx, runner, config);
    println!(
        "{}",
        serde_json::to_string(&report).context("Failed to serialize preflight report")?
    );
    if strict && !report.all_passed() {
        bail!("Preflight failed: {} check(s) failed.", report.fail_count());
    }
    Ok(())
}
