//! Install strategies and the cascade that tries them.
//!
//! Strategies are plain values implementing [`InstallStrategy`]; the
//! cascade walks them in order and stops at the first success. Adding or
//! reordering a channel means editing [`default_strategies`], never the
//! cascade itself.
//!
//! Tiers, most specific first:
//! 1. the host's native package manager
//! 2. community helpers (AUR)
//! 3. isolated Python tool installers (`uv`, `pipx`)
//! 4. plain `pip` with the resolved runtime

mod aur;
mod native;
mod pip;
mod tool;

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::context::HostContext;
use crate::error::InstallError;
use crate::platform::{PackageManager, PlatformInfo};
use crate::process::ProcessRunner;
use crate::runtime::RuntimeHandle;

pub use aur::AurHelperStrategy;
pub use native::NativeStrategy;
pub use pip::{install_scope, InstallScope, PipStrategy};
pub use tool::{PipxStrategy, UvToolStrategy};

/// What to install and from where.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Package name in every channel.
    pub package: String,
    /// Pinned release, `None` for latest.
    pub version: Option<String>,
    /// Forced install location for the pip fallback.
    pub install_dir: Option<PathBuf>,
    /// Base URL of the signed apt/rpm repositories.
    pub repo_url: String,
    /// Homebrew tap carrying the formula.
    pub brew_tap: String,
    /// Pass `--break-system-packages` to pip.
    pub break_system_packages: bool,
}

impl InstallRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            package: config.package.clone(),
            version: config.version.clone(),
            install_dir: config.install_dir.clone(),
            repo_url: config.repo_url.trim_end_matches('/').to_string(),
            brew_tap: config.brew_tap.clone(),
            break_system_packages: config.break_system_packages,
        }
    }

    /// Requirement string for Python installers (`agentsh==1.2.0`).
    pub fn python_requirement(&self) -> String {
        match &self.version {
            Some(v) => format!("{}=={}", self.package, v),
            None => self.package.clone(),
        }
    }
}

/// Everything a strategy may look at or invoke.
pub struct StrategyContext<'a> {
    pub host: &'a HostContext,
    pub runner: &'a dyn ProcessRunner,
    pub platform: &'a PlatformInfo,
    pub runtime: &'a RuntimeHandle,
    pub request: &'a InstallRequest,
}

/// Position of a strategy in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Native,
    Community,
    ToolInstaller,
    Fallback,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Native => "native",
            Tier::Community => "community",
            Tier::ToolInstaller => "tool-installer",
            Tier::Fallback => "fallback",
        })
    }
}

/// Whether a strategy can run on this host at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(String),
}

/// One way of getting the package onto the host.
pub trait InstallStrategy {
    /// Short name shown in progress output.
    fn name(&self) -> String;

    fn tier(&self) -> Tier;

    /// Check the strategy's prerequisites without changing anything.
    fn precondition(&self, cx: &StrategyContext<'_>) -> Availability;

    /// Install. On success, returns the directory holding the executable
    /// when the strategy knows it.
    fn attempt(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>>;
}

/// How a single strategy fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum AttemptStatus {
    /// Prerequisites missing; never counted as a failure.
    Skipped(String),
    Failed(String),
    Succeeded,
}

/// Record of one strategy in the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub strategy: String,
    pub tier: Tier,
    #[serde(flatten)]
    pub status: AttemptStatus,
}

/// Result of the cascade.
#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub strategy_used: String,
    pub install_dir: Option<PathBuf>,
    pub success: bool,
    /// Every strategy considered, in order, up to and including the winner.
    pub attempts: Vec<Attempt>,
}

impl InstallOutcome {
    /// Strategies that ran and failed.
    pub fn failures(&self) -> impl Iterator<Item = &Attempt> {
        self.attempts
            .iter()
            .filter(|a| matches!(a.status, AttemptStatus::Failed(_)))
    }
}

/// The standard ordered strategy list.
pub fn default_strategies() -> Vec<Box<dyn InstallStrategy>> {
    let mut strategies: Vec<Box<dyn InstallStrategy>> = Vec::new();

    for manager in [
        PackageManager::Brew,
        PackageManager::Apt,
        PackageManager::Dnf,
        PackageManager::Yum,
        PackageManager::Pacman,
        PackageManager::Apk,
        PackageManager::Zypper,
        PackageManager::Pkg,
    ] {
        strategies.push(Box::new(NativeStrategy::new(manager)));
    }

    for helper in aur::HELPERS {
        strategies.push(Box::new(AurHelperStrategy::new(helper)));
    }

    strategies.push(Box::new(UvToolStrategy));
    strategies.push(Box::new(PipxStrategy));
    strategies.push(Box::new(PipStrategy));

    strategies
}

/// Try `strategies` in order until one succeeds.
pub fn run_cascade(
    strategies: &[Box<dyn InstallStrategy>],
    cx: &StrategyContext<'_>,
) -> Result<InstallOutcome, InstallError> {
    let mut attempts = Vec::new();

    for strategy in strategies {
        let name = strategy.name();
        let tier = strategy.tier();

        if let Availability::Unavailable(reason) = strategy.precondition(cx) {
            tracing::debug!(strategy = %name, %reason, "skipping");
            attempts.push(Attempt {
                strategy: name,
                tier,
                status: AttemptStatus::Skipped(reason),
            });
            continue;
        }

        println!("  Trying {} ({})...", name, tier);
        match strategy.attempt(cx) {
            Ok(install_dir) => {
                println!("  Installed with {}", name);
                attempts.push(Attempt {
                    strategy: name.clone(),
                    tier,
                    status: AttemptStatus::Succeeded,
                });
                return Ok(InstallOutcome {
                    strategy_used: name,
                    install_dir,
                    success: true,
                    attempts,
                });
            }
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!(strategy = %name, "install failed: {reason}");
                println!("  {} failed, trying next method", name);
                attempts.push(Attempt {
                    strategy: name,
                    tier,
                    status: AttemptStatus::Failed(reason),
                });
            }
        }
    }

    Err(InstallError::AllStrategiesExhausted { attempts })
}
