//! Prove the installed executable actually runs.

use std::path::Path;

use crate::error::InstallError;
use crate::process::{Cmd, ProcessRunner};

/// Run `<exe> --version` and return the reported version line.
pub fn verify(runner: &dyn ProcessRunner, exe: &Path) -> Result<String, InstallError> {
    let failed = |detail: String| InstallError::VerificationFailed {
        path: exe.to_path_buf(),
        detail,
    };

    let result = Cmd::new(exe.to_string_lossy())
        .arg("--version")
        .allow_fail()
        .run(runner)
        .map_err(|e| failed(format!("{e:#}")))?;

    if !result.success() {
        let stderr = result.stderr_trimmed();
        return Err(failed(if stderr.is_empty() {
            format!("exit code {}", result.code())
        } else {
            format!("exit code {}: {}", result.code(), stderr)
        }));
    }

    let response = result.response();
    if response.is_empty() {
        return Err(failed("no output".to_string()));
    }

    Ok(response.lines().next().unwrap_or(response).to_string())
}
