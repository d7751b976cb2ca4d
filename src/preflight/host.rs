//! Host checks: platform, Python runtime, privileges, helper tools.

use crate::config::Config;
use crate::context::HostContext;
use crate::platform::{Arch, PlatformInfo};
use crate::process::ProcessRunner;
use crate::runtime::{self, provision, RuntimeHandle};

use super::types::CheckResult;

pub fn check_platform(platform: &PlatformInfo) -> CheckResult {
    if !platform.is_supported() {
        return CheckResult::fail("Platform", &format!("unsupported: {}", platform));
    }
    if platform.arch == Arch::Unknown {
        return CheckResult::warn(
            "Platform",
            &format!("{} - unrecognized CPU, native packages may be unavailable", platform),
        );
    }
    CheckResult::pass_with("Platform", &platform.to_string())
}

/// Probe for a runtime. Returns the handle when one qualifies so the
/// channel checks can use it.
pub fn check_runtime(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    platform: &PlatformInfo,
    config: &Config,
) -> (CheckResult, Option<RuntimeHandle>) {
    let name = format!("Python >= {}", config.min_python);
    let report = runtime::probe(ctx, runner, &config.min_python, None);

    if let Some(handle) = report.found {
        let details = format!("{} at {}", handle.version, handle.command.display());
        return (CheckResult::pass_with(&name, &details), Some(handle));
    }

    let seen = if report.rejected.is_empty() {
        "none found".to_string()
    } else {
        format!("too old: {}", report.rejected.join(", "))
    };

    let result = match provision::choose(ctx, platform) {
        Some(p) => CheckResult::warn(&name, &format!("{seen}; installable with {}", p.name())),
        None => CheckResult::fail(&name, &format!("{seen}; no way to install one automatically")),
    };
    (result, None)
}

pub fn check_privileges(ctx: &HostContext) -> CheckResult {
    if ctx.is_root {
        CheckResult::pass_with("Privileges", "running as root")
    } else if let Some(sudo) = ctx.which("sudo") {
        CheckResult::pass_with("Privileges", &format!("sudo at {}", sudo.display()))
    } else {
        CheckResult::warn(
            "Privileges",
            "not root and no sudo - system package managers will be skipped",
        )
    }
}

/// Tools used by repository setup; optional.
pub fn check_fetch_tools(ctx: &HostContext) -> Vec<CheckResult> {
    [
        ("curl", "needed to add the signed apt/rpm repository"),
        ("gpg", "needed to install the apt signing key"),
    ]
    .into_iter()
    .map(|(tool, purpose)| match ctx.which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        None => CheckResult::warn(tool, &format!("not found - {purpose}")),
    })
    .collect()
}
