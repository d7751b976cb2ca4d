//! Host environment snapshot.
//!
//! Everything the installer would otherwise read ad hoc from the process
//! (environment variables, PATH, home directory, privileges, kernel and
//! machine names) is captured once into a [`HostContext`] and threaded
//! through each stage. Tests build synthetic contexts over a temporary
//! directory instead of touching the real host.

use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::process::{Cmd, ProcessRunner};

/// Explicit view of the host the installer is running on.
#[derive(Debug, Clone)]
pub struct HostContext {
    /// Environment variables.
    pub env: BTreeMap<String, String>,
    /// PATH entries in resolution order.
    pub path: Vec<PathBuf>,
    /// User home directory.
    pub home: PathBuf,
    /// Filesystem root for system files (`/` on a real host).
    pub root: PathBuf,
    /// Effective uid is 0.
    pub is_root: bool,
    /// Prompts can be shown.
    pub interactive: bool,
    /// Kernel name as `uname -s` reports it.
    pub kernel: String,
    /// Machine hardware name as `uname -m` reports it.
    pub machine: String,
}

impl HostContext {
    /// Snapshot the current process and host.
    pub fn capture(runner: &dyn ProcessRunner) -> Self {
        let env: BTreeMap<String, String> = env::vars().collect();
        let path = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect())
            .unwrap_or_default();
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));

        let kernel = uname(runner, "-s").unwrap_or_else(|| fallback_kernel().to_string());
        let machine = uname(runner, "-m").unwrap_or_else(|| env::consts::ARCH.to_string());

        Self {
            env,
            path,
            home,
            root: PathBuf::from("/"),
            is_root: effective_root(),
            interactive: std::io::stdin().is_terminal(),
            kernel,
            machine,
        }
    }

    /// Synthetic context rooted at `root`, with `home` as the home directory
    /// and `path` as the only PATH entries.
    pub fn synthetic(root: &Path, home: &Path, path: Vec<PathBuf>) -> Self {
        let mut env = BTreeMap::new();
        env.insert("HOME".to_string(), home.display().to_string());
        if let Ok(joined) = env::join_paths(&path) {
            env.insert("PATH".to_string(), joined.to_string_lossy().into_owned());
        }
        Self {
            env,
            path,
            home: home.to_path_buf(),
            root: root.to_path_buf(),
            is_root: false,
            interactive: false,
            kernel: "Linux".to_string(),
            machine: "x86_64".to_string(),
        }
    }

    /// Look up an environment variable. Empty values count as unset.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Interpret an environment variable as a boolean flag.
    pub fn flag(&self, key: &str) -> bool {
        self.var(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }

    /// Set an environment variable for the rest of the run.
    pub fn set_var(&mut self, key: &str, value: &str) {
        self.env.insert(key.to_string(), value.to_string());
    }

    /// Resolve `name` the way the shell would, using this context's PATH.
    ///
    /// Names containing a path separator are checked directly.
    pub fn which(&self, name: &str) -> Option<PathBuf> {
        if name.contains('/') {
            let candidate = PathBuf::from(name);
            return is_executable(&candidate).then_some(candidate);
        }
        let joined: OsString = env::join_paths(&self.path).ok()?;
        which::which_in(name, Some(joined), &self.root).ok()
    }

    /// True if `name` resolves on this context's PATH.
    pub fn has(&self, name: &str) -> bool {
        self.which(name).is_some()
    }

    /// True if `dir` is one of the PATH entries.
    pub fn path_contains(&self, dir: &Path) -> bool {
        let wanted = normalize(dir);
        self.path.iter().any(|entry| normalize(entry) == wanted)
    }

    /// Put `dir` at the front of PATH for the rest of the run.
    pub fn prepend_path(&mut self, dir: &Path) {
        if self.path_contains(dir) {
            return;
        }
        self.path.insert(0, dir.to_path_buf());
        if let Ok(joined) = env::join_paths(&self.path) {
            self.env
                .insert("PATH".to_string(), joined.to_string_lossy().into_owned());
        }
    }

    /// Map an absolute system path such as `/etc/shells` under [`HostContext::root`].
    pub fn system_path(&self, absolute: &str) -> PathBuf {
        self.root.join(absolute.trim_start_matches('/'))
    }

    /// True if root-only commands can run: already root, or `sudo` is on PATH.
    pub fn can_elevate(&self) -> bool {
        self.is_root || self.has("sudo")
    }

    /// Command for `program` with root privileges: run directly when already
    /// root, else through `sudo`.
    pub fn elevated(&self, program: &str) -> Result<Cmd> {
        if self.is_root {
            return Ok(Cmd::new(program));
        }
        if self.can_elevate() {
            return Ok(Cmd::new("sudo").arg(program));
        }
        bail!("'{}' needs root privileges and sudo is not available", program)
    }

    /// Basename of `$SHELL`, if set.
    pub fn login_shell_name(&self) -> Option<String> {
        self.var("SHELL")
            .and_then(|s| Path::new(s).file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Check that `path` is a regular file with an executable bit.
pub fn is_executable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => {
            if !meta.is_file() {
                return false;
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if meta.permissions().mode() & 0o111 == 0 {
                    return false;
                }
            }
            true
        }
        Err(_) => false,
    }
}

fn normalize(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(trimmed)
    }
}

fn uname(runner: &dyn ProcessRunner, flag: &str) -> Option<String> {
    let result = Cmd::new("uname").arg(flag).allow_fail().run(runner).ok()?;
    let value = result.stdout_trimmed();
    (result.success() && !value.is_empty()).then(|| value.to_string())
}

fn fallback_kernel() -> &'static str {
    match env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "freebsd" => "FreeBSD",
        "windows" => "Windows_NT",
        other => other,
    }
}

#[cfg(unix)]
fn effective_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn effective_root() -> bool {
    false
}
