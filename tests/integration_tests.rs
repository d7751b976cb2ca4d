//! End-to-end pipeline tests.
//!
//! Each test builds a fake host under a temporary root, scripts every
//! external command, and runs the whole installer against it.

mod helpers;

use std::fs;

use agentsh_install::error::InstallError;
use agentsh_install::pipeline::Installer;
use agentsh_install::process::ScriptedRunner;
use agentsh_install::prompt::FixedAnswer;
use agentsh_install::register::StepResult;
use agentsh_install::runtime::ProvisionPolicy;
use agentsh_install::strategy::{AttemptStatus, Tier};
use helpers::{assert_file_contains, list_files, TestEnv};

// =============================================================================
// Native package manager succeeds first
// =============================================================================

#[test]
fn test_native_manager_installs_and_verifies() {
    let env = TestEnv::new();
    env.os_release("debian");
    env.shells("/bin/sh\n/bin/bash\n");
    env.tool("apt-get");
    let python = env.tool("python3");
    let agentsh = env.tool("agentsh");
    fs::create_dir_all(env.sys("/etc/apt/sources.list.d")).unwrap();
    fs::write(env.sys("/etc/apt/sources.list.d/agentsh.list"), "deb ...\n").unwrap();

    let mut ctx = env.context();
    ctx.is_root = true;

    let runner = ScriptedRunner::new()
        .ok(format!("{} --version", python.display()), "Python 3.11.2\n")
        .ok("apt-get update", "")
        .ok("apt-get install -y agentsh", "")
        .ok(format!("{} --version", agentsh.display()), "agentsh 0.1.0\n");

    let prompter = FixedAnswer(false);
    let mut installer = Installer::new(ctx, &runner, &prompter, env.config());
    let report = installer.run().unwrap();

    assert_eq!(report.outcome.strategy_used, "apt");
    assert_eq!(report.outcome.attempts.len(), 2);
    assert_eq!(report.outcome.attempts[0].strategy, "brew");
    assert!(matches!(report.outcome.attempts[0].status, AttemptStatus::Skipped(_)));
    assert_eq!(report.outcome.attempts[1].status, AttemptStatus::Succeeded);
    assert_eq!(report.executable, agentsh);
    assert_eq!(report.version, "agentsh 0.1.0");
    assert_eq!(report.registration.path, StepResult::AlreadySatisfied);
    assert_eq!(report.registration.shell_registry, StepResult::Applied);
    assert_file_contains(&env.sys("/etc/shells"), &agentsh.display().to_string());

    // Nothing touched the user's home.
    assert!(list_files(&env.home).is_empty());
    assert!(!runner.was_called("curl"));
}

// =============================================================================
// Fallback to pip into a fresh user directory
// =============================================================================

#[test]
fn test_pip_fallback_adds_path_block_once() {
    let env = TestEnv::new();
    env.os_release("arch");
    env.tool("pacman");
    let python = env.tool("python3");
    let user_bin = env.home.join(".local/bin");
    let agentsh = user_bin.join("agentsh");
    helpers::create_mock_binary(&agentsh);

    let script = || {
        ScriptedRunner::new()
            .ok(format!("{} --version", python.display()), "Python 3.12.4\n")
            .ok(format!("{} -m pip --version", python.display()), "pip 24.0\n")
            .ok(format!("{} -c", python.display()), format!("{}\n", user_bin.display()))
            .ok(format!("{} -m pip install --user agentsh", python.display()), "")
            .ok(format!("{} --version", agentsh.display()), "agentsh 0.1.0\n")
    };

    let runner = script();
    let prompter = FixedAnswer(false);
    let mut installer = Installer::new(env.context(), &runner, &prompter, env.config());
    let report = installer.run().unwrap();

    assert_eq!(report.outcome.strategy_used, "pip");
    let pacman = report
        .outcome
        .attempts
        .iter()
        .find(|a| a.strategy == "pacman")
        .unwrap();
    // Not root and no sudo: the native channel is skipped, not failed.
    assert_eq!(
        pacman.status,
        AttemptStatus::Skipped("needs root and sudo is not on PATH".to_string())
    );
    assert_eq!(report.outcome.failures().count(), 0);
    assert_eq!(report.outcome.attempts.last().unwrap().tier, Tier::Fallback);

    assert_eq!(report.executable, agentsh);
    assert_eq!(report.registration.path, StepResult::Applied);
    assert!(matches!(report.registration.shell_registry, StepResult::Skipped(_)));
    assert!(installer.context().path_contains(&user_bin));

    let bashrc = env.home.join(".bashrc");
    let first = fs::read_to_string(&bashrc).unwrap();
    assert_eq!(first.matches("# >>> agentsh installer >>>").count(), 1);
    assert!(first.contains(&format!("export PATH=\"{}:$PATH\"", user_bin.display())));

    // A second run leaves the rc file alone.
    let runner = script();
    let mut again = Installer::new(env.context(), &runner, &prompter, env.config());
    let report = again.run().unwrap();
    assert_eq!(report.registration.path, StepResult::AlreadySatisfied);
    assert_eq!(fs::read_to_string(&bashrc).unwrap(), first);
}

// =============================================================================
// Old runtime, provisioning declined
// =============================================================================

#[test]
fn test_declined_runtime_aborts_before_install() {
    let env = TestEnv::new();
    env.os_release("ubuntu");
    env.shells("/bin/sh\n");
    env.tool("apt-get");
    let python = env.tool("python3");

    let mut ctx = env.context();
    ctx.interactive = true;
    let mut config = env.config();
    config.provision = ProvisionPolicy::Ask;

    let runner = ScriptedRunner::new()
        .ok(format!("{} --version", python.display()), "Python 3.8.10\n")
        .ok("apt-get", "");

    let before = list_files(&env.root);
    let prompter = FixedAnswer(false);
    let err = Installer::new(ctx, &runner, &prompter, config).run().unwrap_err();

    assert!(matches!(err, InstallError::RuntimeDeclined { .. }));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(runner.calls(), vec![format!("{} --version", python.display())]);
    assert_eq!(list_files(&env.root), before);
    assert_eq!(fs::read_to_string(env.sys("/etc/shells")).unwrap(), "/bin/sh\n");
    assert!(list_files(&env.home).is_empty());
}

#[test]
fn test_old_runtime_without_terminal_is_unavailable() {
    let env = TestEnv::new();
    env.os_release("ubuntu");
    let python = env.tool("python3");

    let runner = ScriptedRunner::new().ok(format!("{} --version", python.display()), "Python 3.9.2\n");
    let prompter = FixedAnswer(true);
    let err = Installer::new(env.context(), &runner, &prompter, env.config())
        .run()
        .unwrap_err();

    match err {
        InstallError::RuntimeUnavailable { minimum, found } => {
            assert_eq!(minimum, "3.10");
            assert_eq!(found, vec!["python3 3.9.2".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Shell registry already lists the executable
// =============================================================================

#[test]
fn test_registered_shell_is_already_satisfied() {
    let env = TestEnv::new();
    env.os_release("fedora");
    env.tool("dnf");
    let python = env.tool("python3.12");
    let agentsh = env.tool("agentsh");
    fs::create_dir_all(env.sys("/etc/yum.repos.d")).unwrap();
    fs::write(env.sys("/etc/yum.repos.d/agentsh.repo"), "[agentsh]\n").unwrap();
    let shells = format!("/bin/sh\n{}\n", agentsh.display());
    env.shells(&shells);

    let mut ctx = env.context();
    ctx.is_root = true;
    let mut config = env.config();
    config.set_default_shell = true;
    ctx.set_var("SHELL", &agentsh.display().to_string());

    let runner = ScriptedRunner::new()
        .ok(format!("{} --version", python.display()), "Python 3.12.1\n")
        .ok("dnf install -y agentsh", "")
        .ok(format!("{} --version", agentsh.display()), "agentsh 0.1.0\n");

    let prompter = FixedAnswer(false);
    let report = Installer::new(ctx, &runner, &prompter, config).run().unwrap();

    assert_eq!(report.outcome.strategy_used, "dnf");
    assert_eq!(report.registration.shell_registry, StepResult::AlreadySatisfied);
    assert_eq!(report.registration.default_shell, StepResult::AlreadySatisfied);
    assert_eq!(fs::read_to_string(env.sys("/etc/shells")).unwrap(), shells);
    assert!(!runner.was_called("chsh"));
}

// =============================================================================
// Failure paths after the cascade
// =============================================================================

#[test]
fn test_every_channel_exhausted() {
    let env = TestEnv::new();
    env.os_release("alpine");
    let python = env.tool("python3");

    let runner = ScriptedRunner::new()
        .ok(format!("{} --version", python.display()), "Python 3.11.9\n")
        .fail(format!("{} -m pip --version", python.display()), "No module named pip");

    let prompter = FixedAnswer(false);
    let err = Installer::new(env.context(), &runner, &prompter, env.config())
        .run()
        .unwrap_err();

    match err {
        InstallError::AllStrategiesExhausted { attempts } => {
            assert!(attempts
                .iter()
                .all(|a| matches!(a.status, AttemptStatus::Skipped(_))));
            assert_eq!(attempts.last().unwrap().strategy, "pip");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_broken_executable_fails_verification() {
    let env = TestEnv::new();
    env.os_release("debian");
    let python = env.tool("python3");
    let agentsh = env.tool("agentsh");

    let mut config = env.config();
    config.no_modify_path = true;
    config.no_register_shell = true;

    let runner = ScriptedRunner::new()
        .ok(format!("{} --version", python.display()), "Python 3.10.12\n")
        .ok(format!("{} -m pip --version", python.display()), "pip 22.0\n")
        .ok(format!("{} -c", python.display()), format!("{}\n", env.bin.display()))
        .ok(format!("{} -m pip install", python.display()), "")
        .fail(format!("{} --version", agentsh.display()), "ImportError: cannot import name 'main'");

    let prompter = FixedAnswer(false);
    let err = Installer::new(env.context(), &runner, &prompter, config)
        .run()
        .unwrap_err();

    assert!(matches!(err, InstallError::VerificationFailed { .. }));
    assert_eq!(err.stage().name(), "verification");
    assert!(list_files(&env.home).is_empty());
}
