//! agentsh-install - gets a working `agentsh` onto any host.
//!
//! Detects the platform, makes sure a recent Python exists, installs
//! through the best available channel, registers the result with the shell
//! environment and verifies it runs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agentsh_install::commands;
use agentsh_install::config::{Config, Overrides};
use agentsh_install::context::HostContext;
use agentsh_install::error::InstallError;
use agentsh_install::process::SystemRunner;
use agentsh_install::strategy::AttemptStatus;

#[derive(Parser)]
#[command(name = "agentsh-install")]
#[command(about = "Install agentsh on this machine")]
#[command(args_conflicts_with_subcommands = true)]
#[command(
    after_help = "QUICK START:\n  agentsh-install preflight  Check what an install would do\n  agentsh-install            Install the latest release\n  agentsh-install --version 0.2.0 --set-default-shell"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    install: InstallArgs,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Install agentsh (default)
    Install(InstallArgs),

    /// Check the host without changing anything
    Preflight {
        /// Exit non-zero if any check fails
        #[arg(long)]
        strict: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Args, Clone, Default)]
struct InstallArgs {
    /// Release to install (default: latest)
    #[arg(long = "version", value_name = "V")]
    target_version: Option<String>,

    /// Install into this prefix (pip fallback)
    #[arg(long, value_name = "DIR")]
    install_dir: Option<PathBuf>,

    /// Don't add the install directory to PATH in the shell rc file
    #[arg(long)]
    no_modify_path: bool,

    /// Make agentsh the login shell
    #[arg(long)]
    set_default_shell: bool,

    /// Don't add agentsh to /etc/shells
    #[arg(long)]
    no_register_shell: bool,

    /// Install a missing Python without asking
    #[arg(short = 'y', long)]
    yes: bool,

    /// Never install Python
    #[arg(long)]
    no_runtime_install: bool,

    /// Print the install report as JSON on the last line of output
    #[arg(long)]
    json: bool,
}

impl InstallArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            version: self.target_version.clone(),
            install_dir: self.install_dir.clone(),
            no_modify_path: self.no_modify_path,
            set_default_shell: self.set_default_shell,
            no_register_shell: self.no_register_shell,
            assume_yes: self.yes,
            no_runtime_install: self.no_runtime_install,
        }
    }
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
    /// Show the detected platform
    Platform,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("AGENTSH_INSTALL_LOG").unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    let runner = SystemRunner;
    let ctx = HostContext::capture(&runner);

    let mut config = match Config::load(&ctx) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        None => run_install(ctx, config, cli.install),
        Some(Commands::Install(args)) => run_install(ctx, config, args),
        Some(Commands::Preflight { strict, json }) => {
            config.apply(&ctx, cli.install.overrides());
            match commands::cmd_preflight(&ctx, &runner, &config, strict, json) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Some(Commands::Show { what }) => {
            let target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Platform => commands::show::ShowTarget::Platform,
            };
            commands::cmd_show(&ctx, &runner, target, &config);
            ExitCode::SUCCESS
        }
    }
}

fn run_install(ctx: HostContext, mut config: Config, args: InstallArgs) -> ExitCode {
    config.apply(&ctx, args.overrides());
    match commands::cmd_install(ctx, &SystemRunner, config, args.json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn report_failure(e: &InstallError) {
    eprintln!("\nError: {:#}", e);
    if let InstallError::AllStrategiesExhausted { attempts } = e {
        for attempt in attempts {
            let status = match &attempt.status {
                AttemptStatus::Skipped(reason) => format!("skipped, {reason}"),
                AttemptStatus::Failed(reason) => format!("failed, {reason}"),
                AttemptStatus::Succeeded => "succeeded".to_string(),
            };
            eprintln!("  {} [{}]: {}", attempt.strategy, attempt.tier, status);
        }
    }
    eprintln!("  Failed during: {}", e.stage().name());
    eprintln!("  To fix: {}", e.remedy());
}
