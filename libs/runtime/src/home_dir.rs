use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Resolve the server home directory.
///
/// - `None` picks the platform default: `%APPDATA%/<subdir>` on Windows,
///   `$HOME/<subdir>` elsewhere.
/// - A leading `~` is expanded against the user's home.
/// - Relative paths are made absolute against the current directory.
pub fn resolve_home_dir(explicit: Option<String>, subdir: &str, create: bool) -> Result<PathBuf> {
    let path = match explicit {
        Some(raw) => expand_tilde(raw.trim())?,
        None => user_home()?.join(subdir),
    };

    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("current directory is not available")?
            .join(path)
    };

    if create {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("failed to create home dir '{}'", path.display()))?;
    }
    Ok(path)
}

fn user_home() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "APPDATA";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";

    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("environment variable {var} is not set"))
}

fn expand_tilde(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return user_home();
    }
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => Ok(user_home()?.join(rest)),
        None => Ok(Path::new(raw).to_path_buf()),
    }
}
