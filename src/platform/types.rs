//! Platform classification types.

use std::fmt;

use serde::Serialize;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    /// Cygwin, MSYS and MinGW style environments.
    Windows,
    Freebsd,
    Unknown,
}

impl Os {
    /// Classify a kernel name as `uname -s` prints it.
    pub fn from_kernel(kernel: &str) -> Self {
        let k = kernel.trim();
        let upper = k.to_ascii_uppercase();
        match k {
            "Linux" => Os::Linux,
            "Darwin" => Os::Macos,
            "FreeBSD" => Os::Freebsd,
            "Windows_NT" => Os::Windows,
            _ if upper.starts_with("CYGWIN")
                || upper.starts_with("MINGW")
                || upper.starts_with("MSYS") =>
            {
                Os::Windows
            }
            _ => Os::Unknown,
        }
    }

    /// True where a login-shell registry (`/etc/shells`) is expected.
    pub fn has_shell_registry(&self) -> bool {
        matches!(self, Os::Linux | Os::Macos | Os::Freebsd)
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
            Os::Freebsd => "freebsd",
            Os::Unknown => "unknown",
        })
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86_64,
    Aarch64,
    Armv7,
    I686,
    Unknown,
}

impl Arch {
    /// Classify a machine name as `uname -m` prints it.
    pub fn from_machine(machine: &str) -> Self {
        let m = machine.trim().to_ascii_lowercase();
        match m.as_str() {
            "x86_64" | "amd64" | "x64" => Arch::X86_64,
            "aarch64" | "arm64" | "armv8l" => Arch::Aarch64,
            "armhf" => Arch::Armv7,
            "i386" | "i486" | "i586" | "i686" | "x86" => Arch::I686,
            _ if m.starts_with("armv7") => Arch::Armv7,
            _ => Arch::Unknown,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Armv7 => "armv7",
            Arch::I686 => "i686",
            Arch::Unknown => "unknown",
        })
    }
}

/// System package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Brew,
    Apt,
    Dnf,
    Yum,
    Pacman,
    Apk,
    Zypper,
    Pkg,
    None,
}

impl PackageManager {
    /// Executable probed on PATH for this manager.
    pub fn executable(&self) -> Option<&'static str> {
        match self {
            PackageManager::Brew => Some("brew"),
            PackageManager::Apt => Some("apt-get"),
            PackageManager::Dnf => Some("dnf"),
            PackageManager::Yum => Some("yum"),
            PackageManager::Pacman => Some("pacman"),
            PackageManager::Apk => Some("apk"),
            PackageManager::Zypper => Some("zypper"),
            PackageManager::Pkg => Some("pkg"),
            PackageManager::None => None,
        }
    }

    /// Probe order for `os`, native managers first.
    pub fn priority(os: Os) -> &'static [PackageManager] {
        match os {
            Os::Macos => &[PackageManager::Brew],
            Os::Linux => &[
                PackageManager::Apt,
                PackageManager::Dnf,
                PackageManager::Yum,
                PackageManager::Pacman,
                PackageManager::Apk,
                PackageManager::Zypper,
                PackageManager::Brew,
            ],
            Os::Freebsd => &[PackageManager::Pkg],
            Os::Windows | Os::Unknown => &[],
        }
    }

    /// Whether installs through this manager need root.
    pub fn needs_root(&self) -> bool {
        !matches!(self, PackageManager::Brew | PackageManager::None)
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackageManager::Brew => "brew",
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Pacman => "pacman",
            PackageManager::Apk => "apk",
            PackageManager::Zypper => "zypper",
            PackageManager::Pkg => "pkg",
            PackageManager::None => "none",
        })
    }
}

/// Everything the later stages need to know about the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub os: Os,
    pub arch: Arch,
    pub distro_id: String,
    pub package_manager: PackageManager,
}

impl PlatformInfo {
    /// Only an unknown OS is fatal; unknown architectures are left for the
    /// install channels to reject.
    pub fn is_supported(&self) -> bool {
        self.os != Os::Unknown
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({}, package manager: {})",
            self.os, self.arch, self.distro_id, self.package_manager
        )
    }
}
