//! Fatal error taxonomy for the install pipeline.
//!
//! Only conditions that abort the run live here. Recoverable failures
//! (a single strategy, an optional fetch, an absent shell registry) are
//! logged and folded into the stage results instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::strategy::Attempt;

/// Pipeline stage, used when reporting which step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detect,
    Runtime,
    Install,
    Locate,
    Register,
    Verify,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Detect => "platform detection",
            Stage::Runtime => "runtime resolution",
            Stage::Install => "installation",
            Stage::Locate => "executable lookup",
            Stage::Register => "system registration",
            Stage::Verify => "verification",
        }
    }
}

/// Errors that terminate the installer.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("unsupported platform: kernel '{kernel}', machine '{machine}'")]
    UnsupportedPlatform { kernel: String, machine: String },

    #[error("no Python >= {minimum} found{}", found_suffix(.found))]
    RuntimeUnavailable { minimum: String, found: Vec<String> },

    #[error("Python >= {minimum} is required and automatic installation was declined")]
    RuntimeDeclined { minimum: String },

    #[error("all {} install strategies failed or were unavailable", .attempts.len())]
    AllStrategiesExhausted { attempts: Vec<Attempt> },

    #[error("'{name}' not found after installation (searched {})", join_paths(.searched))]
    ExecutableNotFound { name: String, searched: Vec<PathBuf> },

    #[error("'{}' did not report a version: {detail}", .path.display())]
    VerificationFailed { path: PathBuf, detail: String },

    #[error("refusing to change login shell: '{}' is not listed in {}", .path.display(), .registry.display())]
    ShellNotRegistered { path: PathBuf, registry: PathBuf },

    #[error("could not update {}: {source}", .target.display())]
    Registration {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] anyhow::Error),
}

impl InstallError {
    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            InstallError::UnsupportedPlatform { .. } => Stage::Detect,
            InstallError::RuntimeUnavailable { .. } | InstallError::RuntimeDeclined { .. } => {
                Stage::Runtime
            }
            InstallError::AllStrategiesExhausted { .. } => Stage::Install,
            InstallError::ExecutableNotFound { .. } => Stage::Locate,
            InstallError::ShellNotRegistered { .. } | InstallError::Registration { .. } => {
                Stage::Register
            }
            InstallError::VerificationFailed { .. } => Stage::Verify,
            InstallError::Process(_) => Stage::Install,
        }
    }

    /// Suggested manual fix shown to the user.
    pub fn remedy(&self) -> String {
        match self {
            InstallError::UnsupportedPlatform { .. } => {
                "install manually with: python3 -m pip install --user agentsh".to_string()
            }
            InstallError::RuntimeUnavailable { minimum, .. } => format!(
                "install Python {minimum} or newer (https://www.python.org/downloads/) and re-run, \
                 or pass --yes to let the installer provision it"
            ),
            InstallError::RuntimeDeclined { minimum } => {
                format!("install Python {minimum} or newer yourself, then re-run the installer")
            }
            InstallError::AllStrategiesExhausted { .. } => {
                "check the warnings above, then try: python3 -m pip install --user agentsh"
                    .to_string()
            }
            InstallError::ExecutableNotFound { .. } => {
                "pass --install-dir to choose a known location, or add the install location to PATH"
                    .to_string()
            }
            InstallError::VerificationFailed { path, .. } => format!(
                "run '{} --version' manually; remove any stale copy and re-run the installer",
                path.display()
            ),
            InstallError::ShellNotRegistered { path, registry } => format!(
                "add '{}' to {} (sudo sh -c 'echo {} >> {}') before changing the login shell",
                path.display(),
                registry.display(),
                path.display(),
                registry.display()
            ),
            InstallError::Registration { target, .. } => {
                format!("check permissions on {}", target.display())
            }
            InstallError::Process(_) => "re-run with -vv for details".to_string(),
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::RuntimeDeclined { .. } => 2,
            _ => 1,
        }
    }
}

fn found_suffix(found: &[String]) -> String {
    if found.is_empty() {
        String::new()
    } else {
        format!(" (found: {})", found.join(", "))
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
