//! Wire the installed executable into the host environment.
//!
//! Two independent sub-steps, each skippable:
//! - PATH: make the install directory reachable from new shells
//! - shell registry: list the executable in `/etc/shells`, and optionally
//!   make it the login shell
//!
//! Every fact is checked before anything is written, so re-running the
//! installer never duplicates an entry.

pub mod path;
pub mod shells;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::context::HostContext;
use crate::error::InstallError;
use crate::platform::PlatformInfo;
use crate::process::ProcessRunner;

/// What a registration sub-step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum StepResult {
    Applied,
    AlreadySatisfied,
    Skipped(String),
}

impl std::fmt::Display for StepResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepResult::Applied => f.write_str("applied"),
            StepResult::AlreadySatisfied => f.write_str("already satisfied"),
            StepResult::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// Which sub-steps to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterOptions {
    pub modify_path: bool,
    pub register_shell: bool,
    pub set_default_shell: bool,
}

/// Per-step results of [`register`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationSummary {
    pub path: StepResult,
    pub shell_registry: StepResult,
    pub default_shell: StepResult,
}

/// Read-only snapshot of what registration would find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationState {
    pub install_dir_on_path: bool,
    pub rc_file: Option<PathBuf>,
    pub rc_references_dir: bool,
    pub registry_present: bool,
    pub registry_lists_executable: bool,
}

/// Inspect registration state without changing anything.
pub fn inspect(
    ctx: &HostContext,
    platform: &PlatformInfo,
    exe: &Path,
    install_dir: &Path,
) -> RegistrationState {
    let rc = path::rc_file(ctx, path::ShellFamily::of_user(ctx));
    let registry = shells::registry_path(ctx);
    let registry_present = platform.os.has_shell_registry() && registry.is_file();

    RegistrationState {
        install_dir_on_path: ctx.path_contains(install_dir),
        rc_references_dir: path::rc_mentions(&rc, install_dir),
        rc_file: Some(rc),
        registry_present,
        registry_lists_executable: registry_present && shells::is_registered(ctx, exe),
    }
}

/// Run the enabled registration sub-steps for `exe`.
pub fn register(
    ctx: &mut HostContext,
    runner: &dyn ProcessRunner,
    platform: &PlatformInfo,
    exe: &Path,
    options: RegisterOptions,
) -> Result<RegistrationSummary, InstallError> {
    let install_dir = exe.parent().unwrap_or_else(|| Path::new("/"));

    let path = if options.modify_path {
        path::ensure_on_path(ctx, install_dir)?
    } else {
        StepResult::Skipped("PATH modification disabled".to_string())
    };

    let shell_registry = if options.register_shell {
        shells::ensure_registered(ctx, runner, platform, exe)?
    } else {
        StepResult::Skipped("shell registration disabled".to_string())
    };

    let default_shell = if options.set_default_shell {
        shells::set_default_shell(ctx, runner, exe)?
    } else {
        StepResult::Skipped("not requested".to_string())
    };

    tracing::info!(%path, %shell_registry, %default_shell, "registration finished");

    Ok(RegistrationSummary {
        path,
        shell_registry,
        default_shell,
    })
}
