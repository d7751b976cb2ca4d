//! Platform detection.
//!
//! Classifies the host as an [`PlatformInfo`] using layered checks:
//! kernel and machine names, then release metadata for the distribution,
//! then a PATH probe for the package manager. Nothing here mutates the
//! host, and nothing here fails: unrecognized values come back as
//! `unknown` and later stages decide whether that is fatal.

mod types;

use std::fs;

use crate::context::HostContext;
use crate::process::{Cmd, ProcessRunner};

pub use types::{Arch, Os, PackageManager, PlatformInfo};

/// Detect the platform described by `ctx`.
pub fn detect(ctx: &HostContext, runner: &dyn ProcessRunner) -> PlatformInfo {
    let os = Os::from_kernel(&ctx.kernel);
    let arch = Arch::from_machine(&ctx.machine);
    let distro_id = detect_distro(ctx, runner);
    let package_manager = detect_package_manager(ctx, os);

    tracing::debug!(%os, %arch, %distro_id, %package_manager, "platform detected");

    PlatformInfo {
        os,
        arch,
        distro_id,
        package_manager,
    }
}

/// Distribution id.
///
/// Resolution order:
/// 1. `ID=` in `/etc/os-release`
/// 2. `/etc/debian_version` marker
/// 3. `/etc/redhat-release` marker
/// 4. `sw_vers` answering (macOS)
pub fn detect_distro(ctx: &HostContext, runner: &dyn ProcessRunner) -> String {
    if let Ok(content) = fs::read_to_string(ctx.system_path("/etc/os-release")) {
        if let Some(id) = parse_os_release_id(&content) {
            return id;
        }
    }

    if ctx.system_path("/etc/debian_version").exists() {
        return "debian".to_string();
    }

    if ctx.system_path("/etc/redhat-release").exists() {
        return "rhel".to_string();
    }

    if let Ok(result) = Cmd::new("sw_vers")
        .arg("-productVersion")
        .allow_fail()
        .run(runner)
    {
        if result.success() && !result.stdout_trimmed().is_empty() {
            return "macos".to_string();
        }
    }

    "unknown".to_string()
}

/// Extract the `ID` field from os-release content.
pub fn parse_os_release_id(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let value = line.trim().strip_prefix("ID=")?;
        let value = value.trim().trim_matches('"').trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// First package manager from the OS priority list present on PATH.
pub fn detect_package_manager(ctx: &HostContext, os: Os) -> PackageManager {
    PackageManager::priority(os)
        .iter()
        .copied()
        .find(|pm| pm.executable().is_some_and(|exe| ctx.has(exe)))
        .unwrap_or(PackageManager::None)
}
