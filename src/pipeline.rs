//! The install pipeline: detect, resolve runtime, install, locate,
//! register, verify.
//!
//! Each stage consumes the previous stage's output; any stage error aborts
//! the run. The [`Installer`] owns the host context so that registration
//! can update PATH for the stages after it.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::config::Config;
use crate::context::HostContext;
use crate::error::InstallError;
use crate::locate;
use crate::platform::{self, PlatformInfo};
use crate::process::ProcessRunner;
use crate::prompt::Prompter;
use crate::register::{self, RegisterOptions, RegistrationSummary};
use crate::runtime::{self, RuntimeHandle};
use crate::strategy::{self, InstallOutcome, InstallRequest, InstallStrategy, StrategyContext};
use crate::timing::{format_secs, Timer};
use crate::verify;

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub platform: PlatformInfo,
    pub runtime: RuntimeHandle,
    pub outcome: InstallOutcome,
    pub executable: PathBuf,
    pub registration: RegistrationSummary,
    /// What `<executable> --version` printed.
    pub version: String,
}

/// Drives one install run.
pub struct Installer<'a> {
    ctx: HostContext,
    runner: &'a dyn ProcessRunner,
    prompter: &'a dyn Prompter,
    config: Config,
    strategies: Vec<Box<dyn InstallStrategy>>,
}

impl<'a> Installer<'a> {
    pub fn new(
        ctx: HostContext,
        runner: &'a dyn ProcessRunner,
        prompter: &'a dyn Prompter,
        config: Config,
    ) -> Self {
        Self {
            ctx,
            runner,
            prompter,
            config,
            strategies: strategy::default_strategies(),
        }
    }

    /// Replace the strategy list.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn InstallStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Host context as the run has left it (PATH may have grown).
    pub fn context(&self) -> &HostContext {
        &self.ctx
    }

    /// Run every stage in order.
    pub fn run(&mut self) -> Result<InstallReport, InstallError> {
        let started = Instant::now();
        println!("=== Installing {} ===", self.config.package);

        // =====================================================================
        // Detect
        // =====================================================================
        println!("\nDetecting platform...");
        let t = Timer::start("Detect");
        let platform = platform::detect(&self.ctx, self.runner);
        if !platform.is_supported() {
            return Err(InstallError::UnsupportedPlatform {
                kernel: self.ctx.kernel.clone(),
                machine: self.ctx.machine.clone(),
            });
        }
        println!("  {}", platform);
        t.finish();

        // =====================================================================
        // Runtime
        // =====================================================================
        println!("\nResolving Python runtime (>= {})...", self.config.min_python);
        let t = Timer::start("Runtime");
        let runtime = runtime::resolve(
            &self.ctx,
            self.runner,
            &platform,
            &self.config.min_python,
            self.config.provision,
            self.prompter,
        )?;
        t.finish();

        // =====================================================================
        // Install
        // =====================================================================
        println!("\nInstalling {}...", self.config.package);
        let t = Timer::start("Install");
        let request = InstallRequest::from_config(&self.config);
        let outcome = {
            let cx = StrategyContext {
                host: &self.ctx,
                runner: self.runner,
                platform: &platform,
                runtime: &runtime,
                request: &request,
            };
            strategy::run_cascade(&self.strategies, &cx)?
        };
        t.finish();

        // =====================================================================
        // Locate
        // =====================================================================
        let executable = locate::locate(&self.ctx, &outcome, &self.config.package)?;
        println!("\n  Executable: {}", executable.display());

        // =====================================================================
        // Register
        // =====================================================================
        println!("\nRegistering with the system...");
        let t = Timer::start("Register");
        let options = RegisterOptions {
            modify_path: !self.config.no_modify_path,
            register_shell: !self.config.no_register_shell,
            set_default_shell: self.config.set_default_shell,
        };
        let registration =
            register::register(&mut self.ctx, self.runner, &platform, &executable, options)?;
        t.finish();

        // =====================================================================
        // Verify
        // =====================================================================
        println!("\nVerifying...");
        let version = verify::verify(self.runner, &executable)?;
        println!("  {}", version);

        println!(
            "\n=== Install Complete ({}) ===",
            format_secs(started.elapsed().as_secs_f64())
        );
        println!("  Method: {}", outcome.strategy_used);
        println!("  Executable: {}", executable.display());
        if registration.path == register::StepResult::Applied {
            println!("\nOpen a new terminal (or re-source your shell rc file) to pick up PATH.");
        }

        Ok(InstallReport {
            platform,
            runtime,
            outcome,
            executable,
            registration,
            version,
        })
    }
}
