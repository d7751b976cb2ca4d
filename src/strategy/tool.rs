//! Isolated Python tool installers (`uv tool`, `pipx`).
//!
//! Both create a private virtual environment for the package and expose
//! only its entry points, pinned to the resolved interpreter.

use anyhow::Result;
use std::path::PathBuf;

use super::{Availability, InstallStrategy, StrategyContext, Tier};
use crate::process::Cmd;

#[derive(Debug, Clone, Copy)]
pub struct UvToolStrategy;

impl InstallStrategy for UvToolStrategy {
    fn name(&self) -> String {
        "uv tool".to_string()
    }

    fn tier(&self) -> Tier {
        Tier::ToolInstaller
    }

    fn precondition(&self, cx: &StrategyContext<'_>) -> Availability {
        if cx.host.has("uv") {
            Availability::Available
        } else {
            Availability::Unavailable("uv not on PATH".to_string())
        }
    }

    fn attempt(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        Cmd::new("uv")
            .args(["tool", "install", "--python"])
            .arg_path(&cx.runtime.command)
            .arg(cx.request.python_requirement())
            .streamed()
            .error_msg("uv tool install failed")
            .run(cx.runner)?;

        let dir = Cmd::new("uv")
            .args(["tool", "dir", "--bin"])
            .allow_fail()
            .run(cx.runner)?;
        Ok(dir
            .success()
            .then(|| dir.stdout_trimmed().to_string())
            .filter(|d| !d.is_empty())
            .map(PathBuf::from))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipxStrategy;

impl PipxStrategy {
    /// Where pipx links entry points: `$PIPX_BIN_DIR`, what pipx reports,
    /// else `~/.local/bin`.
    fn bin_dir(cx: &StrategyContext<'_>) -> PathBuf {
        if let Some(dir) = cx.host.var("PIPX_BIN_DIR") {
            return PathBuf::from(dir);
        }
        if let Ok(result) = Cmd::new("pipx")
            .args(["environment", "--value", "PIPX_BIN_DIR"])
            .allow_fail()
            .run(cx.runner)
        {
            if result.success() && !result.stdout_trimmed().is_empty() {
                return PathBuf::from(result.stdout_trimmed());
            }
        }
        cx.host.home.join(".local").join("bin")
    }
}

impl InstallStrategy for PipxStrategy {
    fn name(&self) -> String {
        "pipx".to_string()
    }

    fn tier(&self) -> Tier {
        Tier::ToolInstaller
    }

    fn precondition(&self, cx: &StrategyContext<'_>) -> Availability {
        if cx.host.has("pipx") {
            Availability::Available
        } else {
            Availability::Unavailable("pipx not on PATH".to_string())
        }
    }

    fn attempt(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        Cmd::new("pipx")
            .args(["install", "--python"])
            .arg_path(&cx.runtime.command)
            .arg(cx.request.python_requirement())
            .streamed()
            .error_msg("pipx install failed")
            .run(cx.runner)?;
        Ok(Some(Self::bin_dir(cx)))
    }
}
