//! Find the installed executable after the cascade.
//!
//! Package managers and Python installers all put entry points in
//! different places, and the reported directory is sometimes missing or
//! wrong. Lookup order: the directory the strategy reported, the current
//! PATH, then well-known bin directories.

use std::path::{Path, PathBuf};

use crate::context::{is_executable, HostContext};
use crate::error::InstallError;
use crate::strategy::InstallOutcome;

/// Fallback directories; `~` is the context home.
pub const WELL_KNOWN_DIRS: &[&str] = &[
    "~/.local/bin",
    "/opt/homebrew/bin",
    "/usr/local/bin",
    "/home/linuxbrew/.linuxbrew/bin",
    "/usr/bin",
];

/// Expand a [`WELL_KNOWN_DIRS`] entry against the context.
fn expand(ctx: &HostContext, dir: &str) -> PathBuf {
    match dir.strip_prefix("~/") {
        Some(rest) => ctx.home.join(rest),
        None => ctx.system_path(dir),
    }
}

/// Absolute path of the installed `name`.
pub fn locate(ctx: &HostContext, outcome: &InstallOutcome, name: &str) -> Result<PathBuf, InstallError> {
    let mut searched = Vec::new();

    if let Some(ref dir) = outcome.install_dir {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Ok(absolute(&candidate));
        }
        tracing::debug!(dir = %dir.display(), "reported install dir has no executable");
        searched.push(dir.clone());
    }

    if let Some(found) = ctx.which(name) {
        return Ok(absolute(&found));
    }
    searched.push(PathBuf::from("$PATH"));

    for dir in WELL_KNOWN_DIRS {
        let dir = expand(ctx, dir);
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Ok(absolute(&candidate));
        }
        searched.push(dir);
    }

    Err(InstallError::ExecutableNotFound {
        name: name.to_string(),
        searched,
    })
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn make_exe(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\necho agentsh 0.1.0\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn outcome(dir: Option<PathBuf>) -> InstallOutcome {
        InstallOutcome {
            strategy_used: "pip".into(),
            install_dir: dir,
            success: true,
            attempts: vec![],
        }
    }

    #[test]
    fn test_reported_dir_first() {
        let tmp = TempDir::new().unwrap();
        let reported = tmp.path().join("prefix/bin");
        let on_path = tmp.path().join("usr/bin");
        make_exe(&reported.join("agentsh"));
        make_exe(&on_path.join("agentsh"));

        let ctx = HostContext::synthetic(tmp.path(), &tmp.path().join("home"), vec![on_path]);
        let found = locate(&ctx, &outcome(Some(reported.clone())), "agentsh").unwrap();
        assert_eq!(found, reported.join("agentsh"));
    }

    #[test]
    fn test_falls_back_to_path() {
        let tmp = TempDir::new().unwrap();
        let on_path = tmp.path().join("opt/bin");
        make_exe(&on_path.join("agentsh"));

        let ctx = HostContext::synthetic(tmp.path(), &tmp.path().join("home"), vec![on_path.clone()]);
        let found = locate(&ctx, &outcome(Some(tmp.path().join("wrong"))), "agentsh").unwrap();
        assert_eq!(found, on_path.join("agentsh"));
    }

    #[test]
    fn test_well_known_user_bin() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        make_exe(&home.join(".local/bin/agentsh"));

        let ctx = HostContext::synthetic(tmp.path(), &home, vec![]);
        let found = locate(&ctx, &outcome(None), "agentsh").unwrap();
        assert_eq!(found, home.join(".local/bin/agentsh"));
    }

    #[test]
    fn test_non_executable_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("usr/local/bin");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("agentsh"), "not executable").unwrap();

        let ctx = HostContext::synthetic(tmp.path(), &tmp.path().join("home"), vec![]);
        match locate(&ctx, &outcome(None), "agentsh") {
            Err(InstallError::ExecutableNotFound { name, searched }) => {
                assert_eq!(name, "agentsh");
                assert!(searched.contains(&dir));
                assert_eq!(searched.len(), 1 + WELL_KNOWN_DIRS.len());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
