//! Python runtime resolution.
//!
//! Every install channel ends up running Python, so this stage is a hard
//! gate: the pipeline does not continue without a [`RuntimeHandle`] whose
//! version is at least the configured minimum.

pub mod provision;
pub mod version;

use std::path::PathBuf;

use serde::Serialize;

use crate::context::HostContext;
use crate::error::InstallError;
use crate::platform::PlatformInfo;
use crate::process::{Cmd, ProcessRunner};
use crate::prompt::Prompter;

pub use version::{version_ge, RuntimeVersion};

/// Interpreter names probed, newest first.
pub const CANDIDATES: &[&str] = &[
    "python3.14",
    "python3.13",
    "python3.12",
    "python3.11",
    "python3.10",
    "python3",
    "python",
];

/// A Python interpreter known to satisfy the minimum version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeHandle {
    /// Absolute path of the interpreter.
    pub command: PathBuf,
    pub version: RuntimeVersion,
}

impl RuntimeHandle {
    /// Start a command running this interpreter.
    pub fn cmd(&self) -> Cmd {
        Cmd::new(self.command.to_string_lossy())
    }
}

/// Whether a missing runtime may be installed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionPolicy {
    /// Ask first (only when a terminal is attached).
    Ask,
    Always,
    Never,
}

impl ProvisionPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ask" => Some(ProvisionPolicy::Ask),
            "yes" | "always" | "true" | "1" => Some(ProvisionPolicy::Always),
            "no" | "never" | "false" | "0" => Some(ProvisionPolicy::Never),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProvisionPolicy::Ask => "ask",
            ProvisionPolicy::Always => "yes",
            ProvisionPolicy::Never => "no",
        }
    }
}

/// Result of probing the host for interpreters.
#[derive(Debug, Default)]
pub struct ProbeReport {
    /// First interpreter meeting the minimum.
    pub found: Option<RuntimeHandle>,
    /// Interpreters seen but too old or unparseable, as `name version`.
    pub rejected: Vec<String>,
}

/// Probe `extra` (if given) and then every candidate name on PATH.
pub fn probe(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    minimum: &RuntimeVersion,
    extra: Option<&PathBuf>,
) -> ProbeReport {
    let mut report = ProbeReport::default();

    let explicit = extra.map(|p| p.to_string_lossy().into_owned());
    let names = explicit
        .iter()
        .map(String::as_str)
        .chain(CANDIDATES.iter().copied());

    for name in names {
        let Some(path) = ctx.which(name) else {
            continue;
        };

        let version = Cmd::new(path.to_string_lossy())
            .arg("--version")
            .allow_fail()
            .run(runner)
            .ok()
            .filter(|r| r.success())
            .and_then(|r| RuntimeVersion::parse(r.response()));

        match version {
            Some(v) if v >= *minimum => {
                tracing::debug!(interpreter = %path.display(), version = %v, "runtime accepted");
                report.found = Some(RuntimeHandle {
                    command: path,
                    version: v,
                });
                return report;
            }
            Some(v) => report.rejected.push(format!("{name} {v}")),
            None => report.rejected.push(format!("{name} (no version)")),
        }
    }

    report
}

/// Find a qualifying runtime, provisioning one if policy allows.
pub fn resolve(
    ctx: &HostContext,
    runner: &dyn ProcessRunner,
    platform: &PlatformInfo,
    minimum: &RuntimeVersion,
    policy: ProvisionPolicy,
    prompter: &dyn Prompter,
) -> Result<RuntimeHandle, InstallError> {
    let first = probe(ctx, runner, minimum, None);
    if let Some(handle) = first.found {
        println!("  Python {} at {}", handle.version, handle.command.display());
        return Ok(handle);
    }

    let unavailable = |found: Vec<String>| InstallError::RuntimeUnavailable {
        minimum: minimum.to_string(),
        found,
    };

    match policy {
        ProvisionPolicy::Never => return Err(unavailable(first.rejected)),
        ProvisionPolicy::Ask if !ctx.interactive => {
            tracing::warn!("no terminal attached, not offering to install Python");
            return Err(unavailable(first.rejected));
        }
        ProvisionPolicy::Ask => {
            let question = format!("Python >= {minimum} was not found. Install it now?");
            if !prompter.confirm(&question, true)? {
                return Err(InstallError::RuntimeDeclined {
                    minimum: minimum.to_string(),
                });
            }
        }
        ProvisionPolicy::Always => {}
    }

    let Some(provisioner) = provision::choose(ctx, platform) else {
        tracing::warn!("no package manager or bootstrap tool can install Python");
        return Err(unavailable(first.rejected));
    };

    let explicit = match provision::provision(ctx, runner, provisioner, minimum) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(provisioner = %provisioner.name(), "provisioning failed: {e:#}");
            return Err(unavailable(first.rejected));
        }
    };

    let second = probe(ctx, runner, minimum, explicit.as_ref());
    match second.found {
        Some(handle) => {
            println!("  Python {} at {}", handle.version, handle.command.display());
            Ok(handle)
        }
        None => Err(unavailable(second.rejected)),
    }
}
