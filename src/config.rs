//! Configuration management for agentsh-install.
//!
//! Reads configuration from the environment (a `.env` file is loaded into
//! the environment first by `main`). Command-line flags are applied on top
//! with [`Config::apply`].

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::context::HostContext;
use crate::runtime::{ProvisionPolicy, RuntimeVersion};

/// Default package name in every channel.
pub const DEFAULT_PACKAGE: &str = "agentsh";
/// Oldest supported Python.
pub const DEFAULT_MIN_PYTHON: &str = "3.10";
/// Base URL of the signed apt/rpm repositories.
pub const DEFAULT_REPO_URL: &str = "https://packages.agentsh.dev";
/// Homebrew tap carrying the formula.
pub const DEFAULT_BREW_TAP: &str = "agentsh/tap";

/// Installer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pinned release (default: latest)
    pub version: Option<String>,
    /// Forced install location for the pip fallback
    pub install_dir: Option<PathBuf>,
    pub no_modify_path: bool,
    pub set_default_shell: bool,
    pub no_register_shell: bool,
    /// Whether a missing Python may be installed
    pub provision: ProvisionPolicy,
    pub package: String,
    pub min_python: RuntimeVersion,
    pub repo_url: String,
    pub brew_tap: String,
    /// Pass `--break-system-packages` to pip (PEP 668 hosts)
    pub break_system_packages: bool,
}

/// Command-line values that override the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub version: Option<String>,
    pub install_dir: Option<PathBuf>,
    pub no_modify_path: bool,
    pub set_default_shell: bool,
    pub no_register_shell: bool,
    pub assume_yes: bool,
    pub no_runtime_install: bool,
}

impl Config {
    /// Build configuration from the context's environment.
    pub fn load(ctx: &HostContext) -> Result<Self> {
        let provision = match ctx.var("AGENTSH_INSTALL_RUNTIME") {
            Some(value) => ProvisionPolicy::parse(value).ok_or_else(|| {
                anyhow!("AGENTSH_INSTALL_RUNTIME must be ask, yes or no (got '{value}')")
            })?,
            None => ProvisionPolicy::Ask,
        };

        let min_text = ctx.var("AGENTSH_MIN_PYTHON").unwrap_or(DEFAULT_MIN_PYTHON);
        let min_python = RuntimeVersion::parse(min_text)
            .ok_or_else(|| anyhow!("AGENTSH_MIN_PYTHON is not a version: '{min_text}'"))?;

        Ok(Self {
            version: ctx.var("AGENTSH_VERSION").map(str::to_string),
            install_dir: ctx.var("AGENTSH_INSTALL_DIR").map(|dir| expand_home(ctx, dir)),
            no_modify_path: ctx.flag("AGENTSH_NO_MODIFY_PATH"),
            set_default_shell: ctx.flag("AGENTSH_SET_DEFAULT_SHELL"),
            no_register_shell: ctx.flag("AGENTSH_NO_REGISTER_SHELL"),
            provision,
            package: ctx.var("AGENTSH_PACKAGE").unwrap_or(DEFAULT_PACKAGE).to_string(),
            min_python,
            repo_url: ctx.var("AGENTSH_REPO_URL").unwrap_or(DEFAULT_REPO_URL).to_string(),
            brew_tap: ctx.var("AGENTSH_BREW_TAP").unwrap_or(DEFAULT_BREW_TAP).to_string(),
            break_system_packages: ctx.flag("AGENTSH_BREAK_SYSTEM_PACKAGES"),
        })
    }

    /// Apply command-line flags. Flags only ever switch behavior on; an unset
    /// flag leaves the environment's value alone.
    pub fn apply(&mut self, ctx: &HostContext, overrides: Overrides) {
        if let Some(version) = overrides.version {
            self.version = Some(version);
        }
        if let Some(dir) = overrides.install_dir {
            self.install_dir = Some(expand_home(ctx, &dir.to_string_lossy()));
        }
        self.no_modify_path |= overrides.no_modify_path;
        self.set_default_shell |= overrides.set_default_shell;
        self.no_register_shell |= overrides.no_register_shell;

        // --no-runtime-install beats --yes.
        if overrides.no_runtime_install {
            self.provision = ProvisionPolicy::Never;
        } else if overrides.assume_yes {
            self.provision = ProvisionPolicy::Always;
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  AGENTSH_PACKAGE: {}", self.package);
        println!(
            "  AGENTSH_VERSION: {}",
            self.version.as_deref().unwrap_or("latest")
        );
        match &self.install_dir {
            Some(dir) => println!("  AGENTSH_INSTALL_DIR: {}", dir.display()),
            None => println!("  AGENTSH_INSTALL_DIR: auto"),
        }
        println!("  AGENTSH_MIN_PYTHON: {}", self.min_python);
        println!("  AGENTSH_INSTALL_RUNTIME: {}", self.provision.name());
        println!("  AGENTSH_REPO_URL: {}", self.repo_url);
        println!("  AGENTSH_BREW_TAP: {}", self.brew_tap);
        println!("  AGENTSH_NO_MODIFY_PATH: {}", self.no_modify_path);
        println!("  AGENTSH_NO_REGISTER_SHELL: {}", self.no_register_shell);
        println!("  AGENTSH_SET_DEFAULT_SHELL: {}", self.set_default_shell);
        println!("  AGENTSH_BREAK_SYSTEM_PACKAGES: {}", self.break_system_packages);
    }
}

fn expand_home(ctx: &HostContext, dir: &str) -> PathBuf {
    match dir.strip_prefix("~/") {
        Some(rest) => ctx.home.join(rest),
        None if dir == "~" => ctx.home.clone(),
        None => PathBuf::from(dir),
    }
}
