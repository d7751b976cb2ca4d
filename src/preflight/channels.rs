//! Install channel availability and existing-install checks.

use std::path::Path;

use crate::config::Config;
use crate::context::HostContext;
use crate::platform::PlatformInfo;
use crate::process::ProcessRunner;
use crate::register;
use crate::runtime::RuntimeHandle;
use crate::strategy::{Availability, InstallRequest, InstallStrategy, StrategyContext};

use super::types::CheckResult;

/// Evaluate every strategy's precondition without installing anything.
pub fn check_channels(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    platform: &PlatformInfo,
    runtime: Option<&RuntimeHandle>,
    config: &Config,
    strategies: &[Box<dyn InstallStrategy>],
) -> Vec<CheckResult> {
    let Some(runtime) = runtime else {
        return vec![CheckResult::skip(
            "Install channels",
            "no qualifying Python yet; every channel needs one",
        )];
    };

    let request = InstallRequest::from_config(config);
    let cx = StrategyContext {
        host: ctx,
        runner,
        platform,
        runtime,
        request: &request,
    };

    let mut results = Vec::new();
    let mut usable = Vec::new();
    for strategy in strategies {
        let name = format!("{} [{}]", strategy.name(), strategy.tier());
        match strategy.precondition(&cx) {
            Availability::Available => {
                usable.push(strategy.name());
                results.push(CheckResult::pass(&name));
            }
            Availability::Unavailable(reason) => results.push(CheckResult::skip(&name, &reason)),
        }
    }

    results.push(if usable.is_empty() {
        CheckResult::fail("Install channels", "no install method is usable on this host")
    } else {
        CheckResult::pass_with("Install channels", &format!("will try {}", usable.join(", ")))
    });
    results
}

/// Report on an existing install, if there is one.
pub fn check_existing(ctx: &HostContext, platform: &PlatformInfo, package: &str) -> Vec<CheckResult> {
    let Some(exe) = ctx.which(package) else {
        return vec![CheckResult::skip("Existing install", "not on PATH")];
    };

    let dir = exe.parent().unwrap_or_else(|| Path::new("/"));
    let state = register::inspect(ctx, platform, &exe, dir);
    let mut results = vec![CheckResult::pass_with("Existing install", &exe.display().to_string())];

    let rc = state
        .rc_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    results.push(if state.rc_references_dir {
        CheckResult::pass_with("PATH in rc file", &rc)
    } else {
        CheckResult::warn("PATH in rc file", &format!("{} does not mention {}", rc, dir.display()))
    });

    results.push(match (state.registry_present, state.registry_lists_executable) {
        (true, true) => CheckResult::pass("Listed in /etc/shells"),
        (true, false) => CheckResult::warn("Listed in /etc/shells", "not listed; cannot be a login shell"),
        (false, _) => CheckResult::skip("Listed in /etc/shells", "no shell registry on this host"),
    });
    results
}
