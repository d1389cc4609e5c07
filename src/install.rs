//! `install`, `uninstall` and `status` subcommands.
//!
//! The installed artifact is a copy of the running binary placed in the Claude
//! config dir; `settings.json` gets a `statusLine` entry pointing at it.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::settings::{
    backup, has_status_line, read_settings, remove_status_line, set_status_line, write_settings,
};

pub const INSTALLED_BINARY_STEM: &str = "ccus-statusline";

/// Locations the installer touches.
#[derive(Debug, Clone)]
pub struct InstallPaths {
    pub claude_dir: PathBuf,
    pub settings: PathBuf,
    pub binary: PathBuf,
}

impl InstallPaths {
    pub fn under(claude_dir: impl Into<PathBuf>) -> Self {
        let claude_dir = claude_dir.into();
        Self {
            settings: claude_dir.join("settings.json"),
            binary: claude_dir.join(format!(
                "{INSTALLED_BINARY_STEM}{}",
                std::env::consts::EXE_SUFFIX
            )),
            claude_dir,
        }
    }

    pub fn resolve() -> Result<Self> {
        let dir = crate::utils::claude_dir().context("cannot determine home directory")?;
        Ok(Self::under(dir))
    }

    /// Command string written into settings.json.
    pub fn command(&self) -> String {
        let path = self.binary.to_string_lossy();
        if path.contains(' ') {
            format!("\"{path}\"")
        } else {
            path.into_owned()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Active,
    /// Binary present, settings not pointing at it.
    MissingSettings,
    /// Settings configured, binary gone.
    MissingBinary,
    NotInstalled,
}

/// Optional helper tools that are absent. None of them is required: env and
/// file credentials work without a secret store CLI.
pub fn check_deps() -> Vec<&'static str> {
    let tool = if cfg!(target_os = "macos") {
        "security"
    } else if cfg!(target_os = "linux") {
        "secret-tool"
    } else if cfg!(target_os = "windows") {
        "powershell"
    } else {
        return Vec::new();
    };
    if on_path(tool) { Vec::new() } else { vec![tool] }
}

fn on_path(tool: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| {
        let candidate = dir.join(format!("{tool}{}", std::env::consts::EXE_SUFFIX));
        candidate.is_file()
    })
}

pub fn install(paths: &InstallPaths, source_binary: &Path) -> Result<()> {
    println!("Checking dependencies...");
    let missing = check_deps();
    if missing.is_empty() {
        println!("  All dependencies found.");
    } else {
        println!(
            "  Optional: {} not found; set CLAUDE_CODE_OAUTH_TOKEN or keep ~/.claude/.credentials.json for usage data.",
            missing.join(", ")
        );
    }

    println!("Installing statusline binary...");
    fs::create_dir_all(&paths.claude_dir)
        .with_context(|| format!("create {}", paths.claude_dir.display()))?;
    // Copying onto ourselves (re-running the installed binary) would truncate it.
    let same_file = matches!(
        (fs::canonicalize(source_binary), fs::canonicalize(&paths.binary)),
        (Ok(a), Ok(b)) if a == b
    );
    if !same_file {
        fs::copy(source_binary, &paths.binary).with_context(|| {
            format!(
                "copy {} to {}",
                source_binary.display(),
                paths.binary.display()
            )
        })?;
    }
    make_executable(&paths.binary)?;
    println!("  Copied: {}", paths.binary.display());

    println!("Updating settings.json...");
    let settings = read_settings(&paths.settings);
    if has_status_line(&settings, INSTALLED_BINARY_STEM) {
        println!("  settings.json already has statusLine, skipping.");
    } else {
        if let Some(saved) = backup(&paths.settings)? {
            println!("  Backup: {}", saved.display());
        }
        let mut settings = settings;
        set_status_line(&mut settings, &paths.command());
        write_settings(&paths.settings, &settings)?;
        println!("  Updated: {}", paths.settings.display());
    }

    println!("\nDone! Restart Claude Code to see usage stats in the status line.");
    Ok(())
}

pub fn uninstall(paths: &InstallPaths) -> Result<()> {
    println!("Removing statusline binary...");
    if paths.binary.exists() {
        fs::remove_file(&paths.binary)
            .with_context(|| format!("delete {}", paths.binary.display()))?;
        println!("  Deleted: {}", paths.binary.display());
    } else {
        println!("  Binary not found, skipping.");
    }

    println!("Updating settings.json...");
    let mut settings = read_settings(&paths.settings);
    if has_status_line(&settings, INSTALLED_BINARY_STEM) {
        if let Some(saved) = backup(&paths.settings)? {
            println!("  Backup: {}", saved.display());
        }
        remove_status_line(&mut settings);
        write_settings(&paths.settings, &settings)?;
        println!("  Removed statusLine from: {}", paths.settings.display());
    } else {
        println!("  settings.json does not have our statusLine, skipping.");
    }

    println!("\nDone! Status line has been removed.");
    Ok(())
}

pub fn install_state(paths: &InstallPaths) -> InstallState {
    let binary = paths.binary.is_file();
    let configured = has_status_line(&read_settings(&paths.settings), INSTALLED_BINARY_STEM);
    match (binary, configured) {
        (true, true) => InstallState::Active,
        (true, false) => InstallState::MissingSettings,
        (false, true) => InstallState::MissingBinary,
        (false, false) => InstallState::NotInstalled,
    }
}

pub fn status(paths: &InstallPaths) {
    match install_state(paths) {
        InstallState::Active => {
            println!("Status: ACTIVE");
            println!("  Binary: {}", paths.binary.display());
            println!("  settings.json: statusLine configured");
        }
        InstallState::MissingSettings => {
            println!("Status: PARTIAL");
            println!("  Binary: {} (exists)", paths.binary.display());
            println!("  settings.json: statusLine NOT configured");
            println!("  Run \"ccus install\" to fix.");
        }
        InstallState::MissingBinary => {
            println!("Status: PARTIAL");
            println!("  Binary: NOT found");
            println!("  settings.json: statusLine configured (but binary missing)");
            println!("  Run \"ccus install\" to fix.");
        }
        InstallState::NotInstalled => {
            println!("Status: NOT INSTALLED");
            println!("  Run \"ccus install\" to set up.");
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
