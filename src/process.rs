//! Centralized command execution with consistent error handling.
//!
//! Every external program the installer touches (package managers, the
//! Python runtime, `curl`, `sudo`, the installed `agentsh` itself) goes
//! through a [`ProcessRunner`]. The real host uses [`SystemRunner`]; tests
//! swap in [`ScriptedRunner`] so nothing on the real machine is invoked.

use anyhow::{bail, Context, Result};
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code, `None` if terminated by signal.
    pub code: Option<i32>,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandResult {
    /// Successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed result with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Get the exit code, or -1 if terminated by signal.
    pub fn code(&self) -> i32 {
        self.code.unwrap_or(-1)
    }

    /// Get stdout, trimmed of whitespace.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Get stderr, trimmed of whitespace.
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }

    /// First non-empty stream, stdout preferred.
    pub fn response(&self) -> &str {
        let out = self.stdout_trimmed();
        if out.is_empty() {
            self.stderr_trimmed()
        } else {
            out
        }
    }
}

/// Builder for configuring command execution.
#[derive(Debug, Clone, Default)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
    stdin: Option<String>,
    /// If true, don't fail on non-zero exit.
    allow_fail: bool,
    /// If true, output goes straight to the terminal instead of being captured.
    stream: bool,
    /// Custom error message prefix.
    error_prefix: Option<String>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            ..Self::default()
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.envs
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Feed the given text to the child's stdin.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Allow non-zero exit codes without failing.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Stream output to the terminal (long-running installs).
    pub fn streamed(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Set a custom error message prefix.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    /// Program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments as given.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Text piped to stdin, if any.
    pub fn input(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    /// Whether output should be streamed.
    pub fn is_streamed(&self) -> bool {
        self.stream
    }

    /// Program followed by its arguments, space separated.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run the command through `runner`.
    ///
    /// Fails if the program cannot be spawned, or exits non-zero unless
    /// [`Cmd::allow_fail`] was set.
    pub fn run(self, runner: &dyn ProcessRunner) -> Result<CommandResult> {
        tracing::debug!(command = %self.command_line(), "running");
        let result = runner.run(&self)?;

        if !self.allow_fail && !result.success() {
            let prefix = self
                .error_prefix
                .unwrap_or_else(|| format!("'{}' failed", self.program));

            let stderr = result.stderr_trimmed();
            if stderr.is_empty() {
                bail!("{} (exit code {})", prefix, result.code());
            } else {
                bail!("{} (exit code {}):\n{}", prefix, result.code(), stderr);
            }
        }

        Ok(result)
    }
}

/// Capability to run an external process and capture its exit code and output.
pub trait ProcessRunner {
    /// Execute `cmd`. An `Err` means the program could not be started at all;
    /// a non-zero exit is reported through [`CommandResult::code`].
    fn run(&self, cmd: &Cmd) -> Result<CommandResult>;
}

/// Runs commands on the real host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, cmd: &Cmd) -> Result<CommandResult> {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);

        if let Some(ref dir) = cmd.current_dir {
            command.current_dir(dir);
        }
        for (key, value) in &cmd.envs {
            command.env(key, value);
        }

        if cmd.stream {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        command.stdin(if cmd.stdin.is_some() {
            Stdio::piped()
        } else if cmd.stream {
            Stdio::inherit()
        } else {
            Stdio::null()
        });

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to execute '{}'. Is it installed?", cmd.program))?;

        if let Some(ref input) = cmd.stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes())
                    .with_context(|| format!("Failed to write stdin of '{}'", cmd.program))?;
            }
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for '{}'", cmd.program))?;

        Ok(CommandResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A canned response for commands whose command line starts with `prefix`.
#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    response: CommandResult,
}

/// Fake runner answering from a script of prefix rules.
///
/// Rules are matched against [`Cmd::command_line`]; the longest matching
/// prefix wins. Unmatched commands exit 127. Every command line is recorded,
/// along with any stdin it was given.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: RefCell<Vec<String>>,
    inputs: RefCell<Vec<(String, String)>>,
}

impl ScriptedRunner {
    /// Empty script: every command "is not found".
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `response`.
    pub fn on(mut self, prefix: impl Into<String>, response: CommandResult) -> Self {
        self.rules.push(Rule {
            prefix: prefix.into(),
            response,
        });
        self
    }

    /// Shorthand for a successful response.
    pub fn ok(self, prefix: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.on(prefix, CommandResult::ok(stdout))
    }

    /// Shorthand for a failing response.
    pub fn fail(self, prefix: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.on(prefix, CommandResult::failed(1, stderr))
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// True if any recorded command line starts with `prefix`.
    pub fn was_called(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(prefix))
    }

    /// Stdin handed to commands, as `(command line, input)` pairs.
    pub fn inputs(&self) -> Vec<(String, String)> {
        self.inputs.borrow().clone()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, cmd: &Cmd) -> Result<CommandResult> {
        let line = cmd.command_line();
        self.calls.borrow_mut().push(line.clone());
        if let Some(input) = cmd.input() {
            self.inputs
                .borrow_mut()
                .push((line.clone(), input.to_string()));
        }

        let response = self
            .rules
            .iter()
            .filter(|rule| line.starts_with(&rule.prefix))
            .max_by_key(|rule| rule.prefix.len())
            .map(|rule| rule.response.clone())
            .unwrap_or_else(|| CommandResult::failed(127, format!("{}: command not found", cmd.program)));

        Ok(response)
    }
}

// =============================================================================
// Tests
// =============================================================================
