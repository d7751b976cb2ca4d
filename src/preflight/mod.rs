//! Preflight checks for agentsh-install.
//!
//! Answers "would an install work here, and how?" without changing the
//! host. Run with `agentsh-install preflight`.

mod channels;
mod host;
mod types;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::context::HostContext;
use crate::platform;
use crate::process::ProcessRunner;
use crate::strategy::default_strategies;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    config: &Config,
) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    // =======================================================================
    // Host
    // =======================================================================
    println!("Checking host...");
    let platform = platform::detect(ctx, runner);
    checks.push(host::check_platform(&platform));
    checks.push(host::check_privileges(ctx));
    checks.extend(host::check_fetch_tools(ctx));

    // =======================================================================
    // Runtime
    // =======================================================================
    println!("Checking Python runtime...");
    let (runtime_check, runtime) = host::check_runtime(ctx, runner, &platform, config);
    checks.push(runtime_check);

    // =======================================================================
    // Install Channels
    // =======================================================================
    println!("Checking install channels...");
    checks.extend(channels::check_channels(
        ctx,
        runner,
        &platform,
        runtime.as_ref(),
        config,
        &default_strategies(),
    ));

    // =======================================================================
    // Existing Install
    // =======================================================================
    println!("Checking for an existing install...");
    checks.extend(channels::check_existing(ctx, &platform, &config.package));

    println!();

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    config: &Config,
) -> Result<()> {
    let report = run_preflight(ctx, runner, config);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before installing.",
            report.fail_count()
        );
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
