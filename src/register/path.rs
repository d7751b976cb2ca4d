//! Persist the install directory on the user's PATH.
//!
//! The rc file is only ever appended to, and only when it does not already
//! mention the directory, so repeated runs leave it byte-identical.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::StepResult;
use crate::context::HostContext;
use crate::error::InstallError;

pub const BLOCK_BEGIN: &str = "# >>> agentsh installer >>>";
pub const BLOCK_END: &str = "# <<< agentsh installer <<<";

/// Shell families with distinct rc conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFamily {
    Bash,
    Zsh,
    Fish,
    /// Anything else; uses `~/.profile`.
    Posix,
}

impl ShellFamily {
    /// Classify a shell by its basename.
    pub fn from_name(name: &str) -> Self {
        match name {
            "bash" => ShellFamily::Bash,
            "zsh" => ShellFamily::Zsh,
            "fish" => ShellFamily::Fish,
            _ => ShellFamily::Posix,
        }
    }

    /// Family of the user's `$SHELL`.
    pub fn of_user(ctx: &HostContext) -> Self {
        ctx.login_shell_name()
            .map(|n| Self::from_name(&n))
            .unwrap_or(ShellFamily::Posix)
    }
}

/// The rc file a login of `family` reads.
pub fn rc_file(ctx: &HostContext, family: ShellFamily) -> PathBuf {
    match family {
        ShellFamily::Bash => {
            let profile = ctx.home.join(".bash_profile");
            if profile.exists() {
                profile
            } else {
                ctx.home.join(".bashrc")
            }
        }
        ShellFamily::Zsh => match ctx.var("ZDOTDIR") {
            Some(zdotdir) => PathBuf::from(zdotdir).join(".zshrc"),
            None => ctx.home.join(".zshrc"),
        },
        ShellFamily::Fish => ctx.home.join(".config").join("fish").join("config.fish"),
        ShellFamily::Posix => ctx.home.join(".profile"),
    }
}

/// Marked block prepending `dir` to PATH.
pub fn path_block(family: ShellFamily, dir: &Path) -> String {
    let line = match family {
        ShellFamily::Fish => format!("fish_add_path --prepend \"{}\"", dir.display()),
        _ => format!("export PATH=\"{}:$PATH\"", dir.display()),
    };
    format!("{BLOCK_BEGIN}\n{line}\n{BLOCK_END}\n")
}

/// True if `rc` exists and references `dir` as a whole path, such as a
/// PATH entry or our own marked block.
pub fn rc_mentions(rc: &Path, dir: &Path) -> bool {
    let needle = dir.to_string_lossy();
    let needle = needle.trim_end_matches('/');
    if needle.is_empty() {
        return false;
    }
    fs::read_to_string(rc)
        .map(|content| references_path(&content, needle))
        .unwrap_or(false)
}

/// Whole-path occurrence of `needle`: not preceded by a path character and
/// followed by a separator, a quote, a slash, whitespace or end of text.
fn references_path(content: &str, needle: &str) -> bool {
    content.match_indices(needle).any(|(start, _)| {
        let before = content[..start].chars().next_back();
        let after = content[start + needle.len()..].chars().next();
        let starts_clean = before.map_or(true, |c| matches!(c, ':' | '"' | '\'' | '=') || c.is_whitespace());
        let ends_clean = after.map_or(true, |c| matches!(c, ':' | '"' | '\'' | '/') || c.is_whitespace());
        starts_clean && ends_clean
    })
}

/// Make `dir` reachable on PATH now and in future shells.
pub fn ensure_on_path(ctx: &mut HostContext, dir: &Path) -> Result<StepResult, InstallError> {
    if ctx.path_contains(dir) {
        return Ok(StepResult::AlreadySatisfied);
    }

    let family = ShellFamily::of_user(ctx);
    let rc = rc_file(ctx, family);

    if rc_mentions(&rc, dir) {
        tracing::info!(rc = %rc.display(), "rc file already references install dir");
        ctx.prepend_path(dir);
        return Ok(StepResult::AlreadySatisfied);
    }

    append_block(&rc, &path_block(family, dir)).map_err(|source| InstallError::Registration {
        target: rc.clone(),
        source,
    })?;
    println!("  Added {} to PATH in {}", dir.display(), rc.display());

    ctx.prepend_path(dir);
    Ok(StepResult::Applied)
}

fn append_block(rc: &Path, block: &str) -> std::io::Result<()> {
    if let Some(parent) = rc.parent() {
        fs::create_dir_all(parent)?;
    }

    let existing = fs::read(rc).unwrap_or_default();
    let mut file = OpenOptions::new().create(true).append(true).open(rc)?;

    if !existing.is_empty() {
        // Blank line before the block; and a newline first if the file lacks one.
        if !existing.ends_with(b"\n") {
            file.write_all(b"\n")?;
        }
        file.write_all(b"\n")?;
    }
    file.write_all(block.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx_with_shell(tmp: &Path, shell: &str) -> HostContext {
        let mut ctx = HostContext::synthetic(tmp, &tmp.join("home"), vec![PathBuf::from("/usr/bin")]);
        ctx.set_var("SHELL", shell);
        ctx
    }

    #[test]
    fn test_rc_file_mapping() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ctx_with_shell(tmp.path(), "/bin/bash");
        let home = ctx.home.clone();

        assert_eq!(rc_file(&ctx, ShellFamily::Bash), home.join(".bashrc"));
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join(".bash_profile"), "").unwrap();
        assert_eq!(rc_file(&ctx, ShellFamily::Bash), home.join(".bash_profile"));

        assert_eq!(rc_file(&ctx, ShellFamily::Zsh), home.join(".zshrc"));
        ctx.set_var("ZDOTDIR", "/cfg/zsh");
        assert_eq!(rc_file(&ctx, ShellFamily::Zsh), PathBuf::from("/cfg/zsh/.zshrc"));

        assert_eq!(rc_file(&ctx, ShellFamily::Fish), home.join(".config/fish/config.fish"));
        assert_eq!(rc_file(&ctx, ShellFamily::Posix), home.join(".profile"));
    }

    #[test]
    fn test_family_from_shell() {
        assert_eq!(ShellFamily::from_name("zsh"), ShellFamily::Zsh);
        assert_eq!(ShellFamily::from_name("dash"), ShellFamily::Posix);
        let tmp = TempDir::new().unwrap();
        let ctx = ctx_with_shell(tmp.path(), "/usr/local/bin/fish");
        assert_eq!(ShellFamily::of_user(&ctx), ShellFamily::Fish);
    }

    #[test]
    fn test_fish_block_syntax() {
        let block = path_block(ShellFamily::Fish, Path::new("/h/.local/bin"));
        assert_eq!(
            block,
            "# >>> agentsh installer >>>\nfish_add_path --prepend \"/h/.local/bin\"\n# <<< agentsh installer <<<\n"
        );
    }

    #[test]
    fn test_appends_once_and_keeps_existing_content() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ctx_with_shell(tmp.path(), "/bin/zsh");
        let rc = ctx.home.join(".zshrc");
        fs::create_dir_all(&ctx.home).unwrap();
        fs::write(&rc, "alias ll='ls -l'").unwrap();
        let dir = ctx.home.join(".local/bin");

        assert_eq!(ensure_on_path(&mut ctx, &dir).unwrap(), StepResult::Applied);
        let first = fs::read_to_string(&rc).unwrap();
        assert!(first.starts_with("alias ll='ls -l'\n\n# >>> agentsh installer >>>\n"));
        assert!(first.contains(&format!("export PATH=\"{}:$PATH\"", dir.display())));
        assert!(ctx.path_contains(&dir));

        let mut fresh = ctx_with_shell(tmp.path(), "/bin/zsh");
        assert_eq!(ensure_on_path(&mut fresh, &dir).unwrap(), StepResult::AlreadySatisfied);
        assert_eq!(fs::read_to_string(&rc).unwrap(), first);
        assert!(fresh.path_contains(&dir));
    }

    #[test]
    fn test_longer_sibling_path_is_not_a_mention() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ctx_with_shell(tmp.path(), "/bin/bash");
        let dir = ctx.home.join(".local/bin");
        let rc = ctx.home.join(".bashrc");
        fs::create_dir_all(&ctx.home).unwrap();
        let legacy = format!("export PATH=\"{}-legacy:$PATH\"\n", dir.display());
        fs::write(&rc, &legacy).unwrap();

        assert!(!rc_mentions(&rc, &dir));
        assert_eq!(ensure_on_path(&mut ctx, &dir).unwrap(), StepResult::Applied);
        let content = fs::read_to_string(&rc).unwrap();
        assert!(content.starts_with(&legacy));
        assert_eq!(content.matches(BLOCK_BEGIN).count(), 1);
        assert!(rc_mentions(&rc, &dir));
    }

    #[test]
    fn test_whole_path_mentions() {
        let dir = "/home/u/.local/bin";
        assert!(references_path("export PATH=\"/home/u/.local/bin:$PATH\"", dir));
        assert!(references_path("PATH=/home/u/.local/bin", dir));
        assert!(references_path("fish_add_path '/home/u/.local/bin/'", dir));
        assert!(references_path("set -gx PATH /home/u/.local/bin $PATH", dir));
        assert!(!references_path("export PATH=\"/home/u/.local/binaries:$PATH\"", dir));
        assert!(!references_path("export PATH=\"/mnt/home/u/.local/bin:$PATH\"", dir));
    }

    #[test]
    fn test_dir_already_on_path_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ctx_with_shell(tmp.path(), "/bin/bash");
        let dir = PathBuf::from("/usr/bin");
        assert_eq!(ensure_on_path(&mut ctx, &dir).unwrap(), StepResult::AlreadySatisfied);
        assert!(!ctx.home.join(".bashrc").exists());
    }

    #[test]
    fn test_creates_fish_config_dirs() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = ctx_with_shell(tmp.path(), "/usr/bin/fish");
        let dir = ctx.home.join(".local/bin");
        ensure_on_path(&mut ctx, &dir).unwrap();
        let config = fs::read_to_string(ctx.home.join(".config/fish/config.fish")).unwrap();
        assert!(config.starts_with(BLOCK_BEGIN));
    }
}
