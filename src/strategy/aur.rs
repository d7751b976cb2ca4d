//! AUR helper channel for Arch-family hosts.

use anyhow::{bail, Result};
use std::path::PathBuf;

use super::{Availability, InstallStrategy, StrategyContext, Tier};
use crate::platform::Os;
use crate::process::Cmd;

/// Helpers tried, in order.
pub const HELPERS: [&str; 2] = ["paru", "yay"];

#[derive(Debug, Clone, Copy)]
pub struct AurHelperStrategy {
    helper: &'static str,
}

impl AurHelperStrategy {
    pub fn new(helper: &'static str) -> Self {
        Self { helper }
    }
}

impl InstallStrategy for AurHelperStrategy {
    fn name(&self) -> String {
        format!("{} (AUR)", self.helper)
    }

    fn tier(&self) -> Tier {
        Tier::Community
    }

    fn precondition(&self, cx: &StrategyContext<'_>) -> Availability {
        if cx.platform.os != Os::Linux {
            return Availability::Unavailable("AUR helpers only run on Linux".to_string());
        }
        if !cx.host.has(self.helper) {
            return Availability::Unavailable(format!("{} not on PATH", self.helper));
        }
        // makepkg refuses to build as root.
        if cx.host.is_root {
            return Availability::Unavailable(format!("{} cannot run as root", self.helper));
        }
        Availability::Available
    }

    fn attempt(&self, cx: &StrategyContext<'_>) -> Result<Option<PathBuf>> {
        if cx.request.version.is_some() {
            bail!("{} cannot pin a release; use another method for a specific version", self.helper);
        }
        Cmd::new(self.helper)
            .args(["-S", "--needed", "--noconfirm", &cx.request.package])
            .streamed()
            .error_msg(format!("{} -S failed", self.helper))
            .run(cx.runner)?;
        Ok(Some(cx.host.system_path("/usr/bin")))
    }
}
