//! `/etc/shells` registration and default shell change.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::StepResult;
use crate::context::HostContext;
use crate::error::InstallError;
use crate::platform::PlatformInfo;
use crate::process::{Cmd, ProcessRunner};

pub const SHELLS_FILE: &str = "/etc/shells";

/// Registry location under the context root.
pub fn registry_path(ctx: &HostContext) -> PathBuf {
    ctx.system_path(SHELLS_FILE)
}

/// True if `exe` appears as a whole line in `content`.
pub fn lists(content: &str, exe: &Path) -> bool {
    let wanted = exe.to_string_lossy();
    content.lines().map(str::trim).any(|line| line == wanted)
}

/// True if the registry exists and lists `exe`.
pub fn is_registered(ctx: &HostContext, exe: &Path) -> bool {
    fs::read_to_string(registry_path(ctx))
        .map(|content| lists(&content, exe))
        .unwrap_or(false)
}

/// Add `exe` to the shell registry unless it is already there.
pub fn ensure_registered(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    platform: &PlatformInfo,
    exe: &Path,
) -> Result<StepResult, InstallError> {
    if !platform.os.has_shell_registry() {
        return Ok(StepResult::Skipped(format!("{} has no shell registry", platform.os)));
    }

    let registry = registry_path(ctx);
    let content = match fs::read_to_string(&registry) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(registry = %registry.display(), "shell registry missing, not registering");
            return Ok(StepResult::Skipped(format!("{} does not exist", registry.display())));
        }
        Err(source) => return Err(InstallError::Registration { target: registry, source }),
    };

    if lists(&content, exe) {
        return Ok(StepResult::AlreadySatisfied);
    }

    let mut entry = String::new();
    if !content.is_empty() && !content.ends_with('\n') {
        entry.push('\n');
    }
    entry.push_str(&exe.to_string_lossy());
    entry.push('\n');

    let written = if ctx.is_root {
        append_direct(&registry, &entry)
    } else {
        append_elevated(ctx, runner, &registry, &entry)
    };
    written.map_err(|source| InstallError::Registration {
        target: registry.clone(),
        source,
    })?;

    println!("  Registered {} in {}", exe.display(), registry.display());
    Ok(StepResult::Applied)
}

fn append_direct(registry: &Path, entry: &str) -> io::Result<()> {
    OpenOptions::new()
        .append(true)
        .open(registry)?
        .write_all(entry.as_bytes())
}

fn append_elevated(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    registry: &Path,
    entry: &str,
) -> io::Result<()> {
    let cmd = ctx.elevated("tee").map_err(|e| io::Error::other(format!("{e:#}")))?;
    cmd.arg("-a")
        .arg_path(registry)
        .stdin(entry)
        .error_msg("sudo tee failed")
        .run(runner)
        .map(|_| ())
        .map_err(|e| io::Error::other(format!("{e:#}")))
}

/// Make `exe` the login shell.
///
/// Refuses unless the registry lists `exe`. When running as root through
/// sudo, changes the invoking user's shell rather than root's.
pub fn set_default_shell(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    exe: &Path,
) -> Result<StepResult, InstallError> {
    if !is_registered(ctx, exe) {
        return Err(InstallError::ShellNotRegistered {
            path: exe.to_path_buf(),
            registry: registry_path(ctx),
        });
    }

    if ctx.var("SHELL").map(Path::new) == Some(exe) {
        return Ok(StepResult::AlreadySatisfied);
    }

    let mut cmd = Cmd::new("chsh").arg("-s").arg_path(exe);
    if ctx.is_root {
        if let Some(user) = ctx.var("SUDO_USER") {
            cmd = cmd.arg(user);
        }
    }

    cmd.streamed()
        .error_msg("chsh failed")
        .run(runner)
        .map_err(|e| InstallError::Registration {
            target: exe.to_path_buf(),
            source: io::Error::other(format!("{e:#}")),
        })?;

    println!("  Login shell changed to {} (takes effect at next login)", exe.display());
    Ok(StepResult::Applied)
}
