//! Universal fallback: `python -m pip` with the resolved runtime.
//!
//! The install location is decided first, then installed into:
//! 1. an explicit `--install-dir` override, as a virtual environment
//! 2. the user scheme, when its scripts directory is writable or creatable
//! 3. the system scheme, through elevation

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::{Availability, InstallStrategy, StrategyContext, Tier};
use crate::context::is_executable;
use crate::process::Cmd;

const USER_SCRIPTS: &str =
    "import sysconfig; print(sysconfig.get_path('scripts', sysconfig.get_preferred_scheme('user')))";
const SYSTEM_SCRIPTS: &str = "import sysconfig; print(sysconfig.get_path('scripts'))";

/// Where pip will put the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallScope {
    /// Virtual environment at the given directory; entry points land in `<dir>/bin`.
    Venv(PathBuf),
    /// `--user`; entry points land in the given scripts directory.
    User(PathBuf),
    /// System site-packages; needs root.
    System(PathBuf),
}

impl InstallScope {
    /// Directory the entry points end up in.
    pub fn bin_dir(&self) -> PathBuf {
        match self {
            InstallScope::Venv(dir) => dir.join("bin"),
            InstallScope::User(dir) | InstallScope::System(dir) => dir.clone(),
        }
    }
}

/// Decide where the fallback installs. Does not touch the filesystem.
pub fn install_scope(cx: &StrategyContext<'_>) -> Result<InstallScope> {
    if let Some(ref dir) = cx.request.install_dir {
        return Ok(InstallScope::Venv(dir.clone()));
    }

    if let Some(dir) = user_scripts_dir(cx)? {
        return Ok(InstallScope::User(dir));
    }

    let system = cx
        .runtime
        .cmd()
        .args(["-c", SYSTEM_SCRIPTS])
        .error_msg("Could not determine the system scripts directory")
        .run(cx.runner)?;
    Ok(InstallScope::System(PathBuf::from(system.stdout_trimmed())))
}

/// The user scheme's scripts directory, if it can be installed into.
fn user_scripts_dir(cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
    let user = cx
        .runtime
        .cmd()
        .args(["-c", USER_SCRIPTS])
        .allow_fail()
        .run(cx.runner)?;
    if !user.success() || user.stdout_trimmed().is_empty() {
        return Ok(None);
    }
    let dir = PathBuf::from(user.stdout_trimmed());
    if writable_or_creatable(&dir) {
        Ok(Some(dir))
    } else {
        tracing::debug!(dir = %dir.display(), "user scripts directory not writable");
        Ok(None)
    }
}

/// True if files can be written to `dir`, or to the nearest existing
/// ancestor it would be created under.
fn writable_or_creatable(dir: &Path) -> bool {
    let Some(existing) = dir.ancestors().find(|p| p.is_dir()) else {
        return false;
    };
    let probe = existing.join(".agentsh-install-probe");
    match fs::write(&probe, "probe") {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipStrategy;

impl InstallStrategy for PipStrategy {
    fn name(&self) -> String {
        "pip".to_string()
    }

    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    fn precondition(&self, cx: &StrategyContext<'_>) -> Availability {
        let has_pip = cx
            .runtime
            .cmd()
            .args(["-m", "pip", "--version"])
            .allow_fail()
            .run(cx.runner)
            .is_ok_and(|result| result.success());
        if !has_pip {
            return Availability::Unavailable(format!(
                "pip is not installed for {}",
                cx.runtime.command.display()
            ));
        }

        // Only the system scheme needs root.
        if cx.request.install_dir.is_none()
            && !cx.host.can_elevate()
            && !matches!(user_scripts_dir(cx), Ok(Some(_)))
        {
            return Availability::Unavailable(
                "user scripts directory is not writable, system install needs root and sudo is not on PATH"
                    .to_string(),
            );
        }
        Availability::Available
    }

    fn attempt(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        let scope = install_scope(cx)?;
        let requirement = cx.request.python_requirement();
        let python = cx.runtime.command.to_string_lossy().into_owned();

        let cmd = match &scope {
            InstallScope::Venv(dir) => {
                let venv_python = dir.join("bin").join("python");
                if !is_executable(&venv_python) {
                    fs::create_dir_all(dir)
                        .with_context(|| format!("Cannot create {}", dir.display()))?;
                    println!("    Creating virtual environment at {}", dir.display());
                    cx.runtime
                        .cmd()
                        .args(["-m", "venv"])
                        .arg_path(dir)
                        .error_msg("Could not create a virtual environment")
                        .run(cx.runner)?;
                }
                println!("    Installing into {}", dir.display());
                Cmd::new(venv_python.to_string_lossy()).args(["-m", "pip", "install"])
            }
            InstallScope::User(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Cannot create {}", dir.display()))?;
                println!("    Installing for the current user ({})", dir.display());
                cx.runtime.cmd().args(["-m", "pip", "install", "--user"])
            }
            InstallScope::System(dir) => {
                println!("    Installing system-wide ({})", dir.display());
                cx.host
                    .elevated(&python)?
                    .args(["-m", "pip", "install"])
            }
        };

        // A venv is never externally managed.
        let cmd = if cx.request.break_system_packages && !matches!(scope, InstallScope::Venv(_)) {
            cmd.arg("--break-system-packages")
        } else {
            cmd
        };

        cmd.arg(requirement)
            .streamed()
            .error_msg("pip install failed")
            .run(cx.runner)?;

        Ok(Some(scope.bin_dir()))
    }
}
