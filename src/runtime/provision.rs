//! Installing a Python runtime when the host has none recent enough.
//!
//! The provisioner is picked from the same package-manager priority the
//! platform detector uses. Hosts without a usable manager fall back to
//! bootstrap tools (`uv`, then `pyenv`) that install into the user's home.

use anyhow::{bail, Result};
use std::path::PathBuf;

use super::version::RuntimeVersion;
use crate::context::HostContext;
use crate::platform::{PackageManager, PlatformInfo};
use crate::process::{Cmd, ProcessRunner};

/// Where a runtime can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioner {
    Native(PackageManager),
    Uv,
    Pyenv,
}

impl Provisioner {
    pub fn name(&self) -> String {
        match self {
            Provisioner::Native(pm) => pm.to_string(),
            Provisioner::Uv => "uv".to_string(),
            Provisioner::Pyenv => "pyenv".to_string(),
        }
    }
}

/// Pick a provisioner: the detected package manager, else a bootstrap tool.
pub fn choose(ctx: &HostContext, platform: &PlatformInfo) -> Option<Provisioner> {
    let pm = platform.package_manager;
    if pm != PackageManager::None
        && pm.executable().is_some_and(|exe| ctx.has(exe))
        && (!pm.needs_root() || ctx.can_elevate())
    {
        return Some(Provisioner::Native(pm));
    }
    if ctx.has("uv") {
        return Some(Provisioner::Uv);
    }
    if ctx.has("pyenv") {
        return Some(Provisioner::Pyenv);
    }
    None
}

/// Package names that satisfy `minimum` for each manager.
fn native_packages(pm: PackageManager, minimum: &RuntimeVersion) -> Vec<String> {
    // Distro-versioned names track a release at least as new as the minimum.
    let floor = RuntimeVersion::parse("3.12").unwrap_or_else(|| minimum.clone());
    let target = if *minimum > floor { minimum.clone() } else { floor };
    let mm = target.major_minor();
    let compact = mm.replace('.', "");
    match pm {
        PackageManager::Brew => vec![format!("python@{mm}")],
        PackageManager::Apt => vec![
            "python3".to_string(),
            "python3-pip".to_string(),
            "python3-venv".to_string(),
        ],
        PackageManager::Dnf | PackageManager::Yum => vec![format!("python{mm}")],
        PackageManager::Pacman => vec!["python".to_string(), "python-pip".to_string()],
        PackageManager::Apk => vec!["python3".to_string(), "py3-pip".to_string()],
        PackageManager::Zypper => vec![format!("python{compact}")],
        PackageManager::Pkg => vec![format!("python{compact}")],
        PackageManager::None => Vec::new(),
    }
}

/// Install a runtime with `provisioner`.
///
/// Returns the interpreter path when the provisioner knows it, so the
/// re-probe can check it before the usual candidate names.
pub fn provision(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    provisioner: Provisioner,
    minimum: &RuntimeVersion,
) -> Result<Option<PathBuf>> {
    println!("  Installing Python >= {} with {}...", minimum, provisioner.name());

    match provisioner {
        Provisioner::Native(pm) => {
            let packages = native_packages(pm, minimum);
            if packages.is_empty() {
                bail!("no Python package known for {}", pm);
            }
            native_install(ctx, runner, pm, &packages)?;
            Ok(None)
        }
        Provisioner::Uv => {
            let request = minimum.major_minor();
            Cmd::new("uv")
                .args(["python", "install", &request])
                .streamed()
                .error_msg("uv python install failed")
                .run(runner)?;
            let found = Cmd::new("uv")
                .args(["python", "find", &format!(">={request}")])
                .run(runner)?;
            Ok(non_empty_path(found.stdout_trimmed()))
        }
        Provisioner::Pyenv => {
            let request = minimum.major_minor();
            Cmd::new("pyenv")
                .args(["install", "-s", &request])
                .streamed()
                .error_msg("pyenv install failed")
                .run(runner)?;
            let prefix = Cmd::new("pyenv").args(["prefix", &request]).run(runner)?;
            Ok(non_empty_path(prefix.stdout_trimmed()).map(|p| p.join("bin").join("python3")))
        }
    }
}

fn native_install(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    pm: PackageManager,
    packages: &[String],
) -> Result<()> {
    let Some(exe) = pm.executable() else {
        bail!("no package manager available");
    };

    let cmd = if pm.needs_root() {
        ctx.elevated(exe)?
    } else {
        Cmd::new(exe)
    };

    let cmd = match pm {
        PackageManager::Brew => cmd.arg("install"),
        PackageManager::Apt => {
            ctx.elevated(exe)?
                .arg("update")
                .streamed()
                .error_msg("apt-get update failed")
                .run(runner)?;
            cmd.args(["install", "-y"])
        }
        PackageManager::Dnf | PackageManager::Yum => cmd.args(["install", "-y"]),
        PackageManager::Pacman => cmd.args(["-S", "--needed", "--noconfirm"]),
        PackageManager::Apk => cmd.arg("add"),
        PackageManager::Zypper => cmd.args(["--non-interactive", "install"]),
        PackageManager::Pkg => cmd.args(["install", "-y"]),
        PackageManager::None => bail!("no package manager available"),
    };

    cmd.args(packages)
        .streamed()
        .error_msg(format!("{} could not install Python", pm))
        .run(runner)?;
    Ok(())
}

fn non_empty_path(text: &str) -> Option<PathBuf> {
    let line = text.lines().next()?.trim();
    (!line.is_empty()).then(|| PathBuf::from(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_package_names() {
        let min = RuntimeVersion::parse("3.10").unwrap();
        assert_eq!(native_packages(PackageManager::Brew, &min), vec!["python@3.12"]);
        assert_eq!(native_packages(PackageManager::Dnf, &min), vec!["python3.12"]);
        assert_eq!(native_packages(PackageManager::Pkg, &min), vec!["python312"]);

        let newer = RuntimeVersion::parse("3.13").unwrap();
        assert_eq!(native_packages(PackageManager::Brew, &newer), vec!["python@3.13"]);
    }

    #[test]
    fn test_first_line_is_path() {
        assert_eq!(
            non_empty_path("/home/u/.local/share/uv/python/cpython-3.12/bin/python3\n"),
            Some(PathBuf::from("/home/u/.local/share/uv/python/cpython-3.12/bin/python3"))
        );
        assert_eq!(non_empty_path("  \n"), None);
    }
}
