//! Native package manager channel.
//!
//! Adds the project's signed repository when it is not already
//! configured, then installs through the host's own package manager so
//! updates arrive with the rest of the system.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use super::{Availability, InstallStrategy, StrategyContext, Tier};
use crate::platform::PackageManager;
use crate::process::Cmd;

const APT_KEYRING: &str = "/usr/share/keyrings/agentsh-archive-keyring.gpg";
const APT_SOURCE_LIST: &str = "/etc/apt/sources.list.d/agentsh.list";
const YUM_REPO_FILE: &str = "/etc/yum.repos.d/agentsh.repo";
const ZYPP_REPO_FILE: &str = "/etc/zypp/repos.d/agentsh.repo";

/// Install through one specific package manager.
#[derive(Debug, Clone, Copy)]
pub struct NativeStrategy {
    manager: PackageManager,
}

impl NativeStrategy {
    pub fn new(manager: PackageManager) -> Self {
        Self { manager }
    }

    /// Package requirement with the manager's version pin syntax.
    fn package_spec(&self, cx: &StrategyContext<'_>) -> String {
        let pkg = &cx.request.package;
        match (&cx.request.version, self.manager) {
            (None, PackageManager::Brew) => format!("{}/{}", cx.request.brew_tap, pkg),
            (Some(v), PackageManager::Brew) => format!("{}/{}@{}", cx.request.brew_tap, pkg, v),
            (None, _) => pkg.clone(),
            (Some(v), PackageManager::Apt | PackageManager::Apk) => format!("{pkg}={v}"),
            (Some(v), PackageManager::Dnf | PackageManager::Yum | PackageManager::Zypper) => {
                format!("{pkg}-{v}")
            }
            (Some(v), _) => {
                tracing::warn!(manager = %self.manager, "version pin {v} not supported, installing latest");
                pkg.clone()
            }
        }
    }

    fn install_brew(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        let tap = &cx.request.brew_tap;
        let taps = Cmd::new("brew").arg("tap").run(cx.runner)?;
        if taps.stdout.lines().any(|line| line.trim() == tap) {
            println!("    Tap {} already configured", tap);
        } else {
            Cmd::new("brew")
                .args(["tap", tap])
                .streamed()
                .error_msg(format!("brew tap {tap} failed"))
                .run(cx.runner)?;
        }

        Cmd::new("brew")
            .arg("install")
            .arg(self.package_spec(cx))
            .streamed()
            .error_msg("brew install failed")
            .run(cx.runner)?;

        let prefix = Cmd::new("brew").arg("--prefix").allow_fail().run(cx.runner)?;
        if prefix.success() && !prefix.stdout_trimmed().is_empty() {
            Ok(Some(PathBuf::from(prefix.stdout_trimmed()).join("bin")))
        } else {
            Ok(None)
        }
    }

    fn install_apt(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        let host = cx.host;
        let list = host.system_path(APT_SOURCE_LIST);
        let keyring = host.system_path(APT_KEYRING);

        if list.exists() {
            println!("    Repository already configured ({})", list.display());
        } else {
            let base = &cx.request.repo_url;
            let key = Cmd::new("curl")
                .args(["-fsSL", &format!("{base}/apt/gpg.key")])
                .error_msg("Failed to fetch repository signing key")
                .run(cx.runner)?;

            host.elevated("gpg")?
                .args(["--dearmor", "--yes", "-o"])
                .arg_path(&keyring)
                .stdin(key.stdout)
                .error_msg("Failed to install repository signing key")
                .run(cx.runner)?;

            let entry = format!(
                "deb [signed-by={}] {}/apt stable main\n",
                keyring.display(),
                base
            );
            host.elevated("tee")?
                .arg_path(&list)
                .stdin(entry)
                .error_msg("Failed to write apt source list")
                .run(cx.runner)?;
        }

        host.elevated("apt-get")?
            .arg("update")
            .streamed()
            .error_msg("apt-get update failed")
            .run(cx.runner)?;
        host.elevated("apt-get")?
            .args(["install", "-y"])
            .arg(self.package_spec(cx))
            .streamed()
            .error_msg("apt-get install failed")
            .run(cx.runner)?;

        Ok(Some(host.system_path("/usr/bin")))
    }

    fn install_rpm(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        let host = cx.host;
        let exe = self.executable()?;
        let repo_file = host.system_path(YUM_REPO_FILE);

        if repo_file.exists() {
            println!("    Repository already configured ({})", repo_file.display());
        } else {
            let base = &cx.request.repo_url;
            host.elevated("rpm")?
                .args(["--import", &format!("{base}/rpm/gpg.key")])
                .error_msg("Failed to import repository signing key")
                .run(cx.runner)?;
            let repo = Cmd::new("curl")
                .args(["-fsSL", &format!("{base}/rpm/agentsh.repo")])
                .error_msg("Failed to fetch repository definition")
                .run(cx.runner)?;
            host.elevated("tee")?
                .arg_path(&repo_file)
                .stdin(repo.stdout)
                .error_msg("Failed to write repository definition")
                .run(cx.runner)?;
        }

        host.elevated(exe)?
            .args(["install", "-y"])
            .arg(self.package_spec(cx))
            .streamed()
            .error_msg(format!("{exe} install failed"))
            .run(cx.runner)?;

        Ok(Some(host.system_path("/usr/bin")))
    }

    fn install_zypper(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        let host = cx.host;
        let repo_file = host.system_path(ZYPP_REPO_FILE);

        if repo_file.exists() {
            println!("    Repository already configured ({})", repo_file.display());
        } else {
            host.elevated("zypper")?
                .args(["--non-interactive", "addrepo", "--gpgcheck"])
                .arg(format!("{}/rpm/agentsh.repo", cx.request.repo_url))
                .error_msg("zypper addrepo failed")
                .run(cx.runner)?;
        }

        host.elevated("zypper")?
            .args(["--non-interactive", "--gpg-auto-import-keys", "install"])
            .arg(self.package_spec(cx))
            .streamed()
            .error_msg("zypper install failed")
            .run(cx.runner)?;

        Ok(Some(host.system_path("/usr/bin")))
    }

    fn install_pacman(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        let pkg = self.package_spec(cx);
        let info = Cmd::new("pacman").args(["-Si", &pkg]).allow_fail().run(cx.runner)?;
        if !info.success() {
            bail!("{} is not in the configured pacman repositories", pkg);
        }

        cx.host
            .elevated("pacman")?
            .args(["-S", "--needed", "--noconfirm", &pkg])
            .streamed()
            .error_msg("pacman -S failed")
            .run(cx.runner)?;

        Ok(Some(cx.host.system_path("/usr/bin")))
    }

    fn install_simple(&self, cx: &StrategyContext<'_>, args: &[&str], bin: &str) -> Result<Option<PathBuf>> {
        let exe = self.executable()?;
        cx.host
            .elevated(exe)?
            .args(args)
            .arg(self.package_spec(cx))
            .streamed()
            .error_msg(format!("{exe} failed"))
            .run(cx.runner)?;
        Ok(Some(cx.host.system_path(bin)))
    }

    fn executable(&self) -> Result<&'static str> {
        self.manager
            .executable()
            .context("no package manager executable")
    }
}

impl InstallStrategy for NativeStrategy {
    fn name(&self) -> String {
        self.manager.to_string()
    }

    fn tier(&self) -> Tier {
        Tier::Native
    }

    fn precondition(&self, cx: &StrategyContext<'_>) -> Availability {
        if cx.platform.package_manager != self.manager {
            return Availability::Unavailable(format!(
                "host package manager is {}",
                cx.platform.package_manager
            ));
        }
        if self.manager.needs_root() && !cx.host.can_elevate() {
            return Availability::Unavailable("needs root and sudo is not on PATH".to_string());
        }
        match self.manager.executable() {
            Some(exe) if cx.host.has(exe) => Availability::Available,
            Some(exe) => Availability::Unavailable(format!("{exe} not on PATH")),
            None => Availability::Unavailable("no package manager".to_string()),
        }
    }

    fn attempt(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        match self.manager {
            PackageManager::Brew => self.install_brew(cx),
            PackageManager::Apt => self.install_apt(cx),
            PackageManager::Dnf | PackageManager::Yum => self.install_rpm(cx),
            PackageManager::Zypper => self.install_zypper(cx),
            PackageManager::Pacman => self.install_pacman(cx),
            PackageManager::Apk => self.install_simple(cx, &["add"], "/usr/bin"),
            PackageManager::Pkg => self.install_simple(cx, &["install", "-y"], "/usr/local/bin"),
            PackageManager::None => bail!("no package manager"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HostContext;
    use crate::platform::{Arch, Os, PlatformInfo};
    use crate::process::ScriptedRunner;
    use crate::runtime::{RuntimeHandle, RuntimeVersion};
    use crate::strategy::InstallRequest;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        host: HostContext,
        platform: PlatformInfo,
        runtime: RuntimeHandle,
        request: InstallRequest,
    }

    fn fixture(tmp: &Path, pm: PackageManager, tools: &[&str]) -> Fixture {
        let bin = tmp.join("bin");
        fs::create_dir_all(&bin).unwrap();
        for tool in tools {
            let exe = bin.join(tool);
            fs::write(&exe, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        }
        Fixture {
            host: HostContext::synthetic(tmp, &tmp.join("home"), vec![bin]),
            platform: PlatformInfo {
                os: Os::Linux,
                arch: Arch::X86_64,
                distro_id: "debian".into(),
                package_manager: pm,
            },
            runtime: RuntimeHandle {
                command: PathBuf::from("/usr/bin/python3"),
                version: RuntimeVersion::parse("3.12").unwrap(),
            },
            request: InstallRequest {
                package: "agentsh".into(),
                version: None,
                install_dir: None,
                repo_url: "https://packages.example".into(),
                brew_tap: "agentsh/tap".into(),
                break_system_packages: false,
            },
        }
    }

    impl Fixture {
        fn cx<'a>(&'a self, runner: &'a ScriptedRunner) -> StrategyContext<'a> {
            StrategyContext {
                host: &self.host,
                runner,
                platform: &self.platform,
                runtime: &self.runtime,
                request: &self.request,
            }
        }
    }

    #[test]
    fn test_precondition_requires_matching_manager() {
        let tmp = TempDir::new().unwrap();
        let mut fx = fixture(tmp.path(), PackageManager::Dnf, &["apt-get", "dnf"]);
        fx.host.is_root = true;
        let runner = ScriptedRunner::new();
        let cx = fx.cx(&runner);
        assert!(matches!(
            NativeStrategy::new(PackageManager::Apt).precondition(&cx),
            Availability::Unavailable(_)
        ));
        assert_eq!(
            NativeStrategy::new(PackageManager::Dnf).precondition(&cx),
            Availability::Available
        );
    }

    #[test]
    fn test_apt_adds_repository_once() {
        let tmp = TempDir::new().unwrap();
        let mut fx = fixture(tmp.path(), PackageManager::Apt, &["apt-get", "curl"]);
        fx.host.is_root = true;
        let runner = ScriptedRunner::new()
            .ok("curl -fsSL https://packages.example/apt/gpg.key", "-----BEGIN PGP-----")
            .ok("gpg --dearmor", "")
            .ok("tee", "")
            .ok("apt-get update", "")
            .ok("apt-get install -y agentsh", "");

        let dir = NativeStrategy::new(PackageManager::Apt)
            .attempt(&fx.cx(&runner))
            .unwrap();
        assert_eq!(dir, Some(tmp.path().join("usr/bin")));
        assert!(runner.was_called("gpg --dearmor"));
        let inputs = runner.inputs();
        assert!(inputs
            .iter()
            .any(|(_, text)| text.contains("signed-by=") && text.contains("https://packages.example/apt stable main")));

        // Repository present: no key fetch on the next run.
        fs::create_dir_all(tmp.path().join("etc/apt/sources.list.d")).unwrap();
        fs::write(tmp.path().join("etc/apt/sources.list.d/agentsh.list"), "deb ...\n").unwrap();
        let rerun = ScriptedRunner::new()
            .ok("apt-get update", "")
            .ok("apt-get install -y agentsh", "");
        NativeStrategy::new(PackageManager::Apt)
            .attempt(&fx.cx(&rerun))
            .unwrap();
        assert!(!rerun.was_called("curl"));
    }

    #[test]
    fn test_apt_key_fetch_failure_fails_strategy() {
        let tmp = TempDir::new().unwrap();
        let mut fx = fixture(tmp.path(), PackageManager::Apt, &["apt-get"]);
        fx.host.is_root = true;
        let runner = ScriptedRunner::new().fail("curl", "Could not resolve host");
        let err = NativeStrategy::new(PackageManager::Apt)
            .attempt(&fx.cx(&runner))
            .unwrap_err();
        assert!(format!("{err:#}").contains("signing key"));
        assert!(!runner.was_called("apt-get install"));
    }

    #[test]
    fn test_non_root_without_sudo_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let fx = fixture(tmp.path(), PackageManager::Apk, &["apk"]);
        let runner = ScriptedRunner::new();
        match NativeStrategy::new(PackageManager::Apk).precondition(&fx.cx(&runner)) {
            Availability::Unavailable(reason) => assert!(reason.contains("sudo")),
            other => panic!("expected unavailable, got {other:?}"),
        }

        let with_sudo = fixture(tmp.path(), PackageManager::Apk, &["apk", "sudo"]);
        assert_eq!(
            NativeStrategy::new(PackageManager::Apk).precondition(&with_sudo.cx(&runner)),
            Availability::Available
        );

        // Homebrew never needs root.
        let mut brew = fixture(tmp.path(), PackageManager::Brew, &["brew"]);
        brew.platform.os = Os::Macos;
        assert_eq!(
            NativeStrategy::new(PackageManager::Brew).precondition(&brew.cx(&runner)),
            Availability::Available
        );
    }

    #[test]
    fn test_brew_skips_existing_tap_and_reports_prefix() {
        let tmp = TempDir::new().unwrap();
        let mut fx = fixture(tmp.path(), PackageManager::Brew, &["brew"]);
        fx.platform.os = Os::Macos;
        fx.request.version = Some("0.3.0".into());
        let runner = ScriptedRunner::new()
            .ok("brew tap", "homebrew/core\nagentsh/tap\n")
            .ok("brew install agentsh/tap/agentsh@0.3.0", "")
            .ok("brew --prefix", "/opt/homebrew\n");

        let dir = NativeStrategy::new(PackageManager::Brew)
            .attempt(&fx.cx(&runner))
            .unwrap();
        assert_eq!(dir, Some(PathBuf::from("/opt/homebrew/bin")));
        assert!(!runner.was_called("brew tap agentsh/tap"));
    }

    #[test]
    fn test_pacman_requires_package_in_repos() {
        let tmp = TempDir::new().unwrap();
        let mut fx = fixture(tmp.path(), PackageManager::Pacman, &["pacman"]);
        fx.host.is_root = true;
        let runner = ScriptedRunner::new().fail("pacman -Si", "error: package 'agentsh' was not found");
        assert!(NativeStrategy::new(PackageManager::Pacman)
            .attempt(&fx.cx(&runner))
            .is_err());
        assert!(!runner.was_called("pacman -S --needed"));
    }

    #[test]
    fn test_dnf_version_pin() {
        let tmp = TempDir::new().unwrap();
        let mut fx = fixture(tmp.path(), PackageManager::Dnf, &["dnf"]);
        fx.host.is_root = true;
        fx.request.version = Some("0.2.0".into());
        fs::create_dir_all(tmp.path().join("etc/yum.repos.d")).unwrap();
        fs::write(tmp.path().join("etc/yum.repos.d/agentsh.repo"), "[agentsh]\n").unwrap();
        let runner = ScriptedRunner::new().ok("dnf install -y agentsh-0.2.0", "");
        NativeStrategy::new(PackageManager::Dnf)
            .attempt(&fx.cx(&runner))
            .unwrap();
        assert_eq!(runner.calls(), vec!["dnf install -y agentsh-0.2.0"]);
    }
}
