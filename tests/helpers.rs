//! Shared test utilities for agentsh-install tests.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use agentsh_install::config::Config;
use agentsh_install::context::HostContext;

/// Fake host: a temporary filesystem root with a home directory and a
/// single PATH entry at `<root>/usr/bin`.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Stands in for `/`
    pub root: PathBuf,
    /// The user's home directory
    pub home: PathBuf,
    /// `<root>/usr/bin`, the only PATH entry
    pub bin: PathBuf,
}

impl TestEnv {
    /// Create a new test environment with temporary directories.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("root");
        let home = temp_dir.path().join("home/user");
        let bin = root.join("usr/bin");

        fs::create_dir_all(&bin).expect("Failed to create bin dir");
        fs::create_dir_all(root.join("etc")).expect("Failed to create etc dir");
        fs::create_dir_all(&home).expect("Failed to create home dir");

        Self {
            _temp_dir: temp_dir,
            root,
            home,
            bin,
        }
    }

    /// Host context over this environment, with bash as the login shell.
    pub fn context(&self) -> HostContext {
        let mut ctx = HostContext::synthetic(&self.root, &self.home, vec![self.bin.clone()]);
        ctx.set_var("SHELL", "/bin/bash");
        ctx
    }

    /// Default configuration for this environment.
    pub fn config(&self) -> Config {
        Config::load(&self.context()).expect("default config loads")
    }

    /// Put an executable named `name` in `<root>/usr/bin`.
    pub fn tool(&self, name: &str) -> PathBuf {
        let path = self.bin.join(name);
        create_mock_binary(&path);
        path
    }

    /// Write `<root>/etc/os-release` with the given `ID`.
    pub fn os_release(&self, id: &str) {
        fs::write(
            self.root.join("etc/os-release"),
            format!("NAME=\"Test\"\nID={id}\nVERSION_ID=\"1\"\n"),
        )
        .expect("Failed to write os-release");
    }

    /// Write `<root>/etc/shells`.
    pub fn shells(&self, content: &str) {
        fs::write(self.root.join("etc/shells"), content).expect("Failed to write shells");
    }

    /// Path under the fake root.
    pub fn sys(&self, absolute: &str) -> PathBuf {
        self.root.join(absolute.trim_start_matches('/'))
    }
}

/// Create a mock executable file.
pub fn create_mock_binary(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir for binary");
    }

    fs::write(path, "#!/bin/sh\necho mock\n").expect("Failed to create mock binary");

    let mut perms = fs::metadata(path).expect("Failed to get metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("Failed to set permissions");
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}

/// Every file below `dir`, relative paths, sorted.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(base, &path, out);
            } else if let Ok(rel) = path.strip_prefix(base) {
                out.push(rel.to_path_buf());
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
