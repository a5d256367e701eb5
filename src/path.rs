// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where gomu looks for its settings, and how repository paths are
//! named and related to one another.

use std::{
    env,
    fs::canonicalize,
    path::{Component, Path, PathBuf},
};

/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV: &str = "GOMU_CONFIG";

/// Determine absolute path to settings file.
///
/// Uses `$GOMU_CONFIG` when set. Otherwise uses XDG Base Directory path
/// `$XDG_CONFIG_HOME/gomu/gomu.toml`. Does not check if the path returned
/// actually exists.
///
/// # Errors
///
/// - Return [`NoConfigDir`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_settings_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(SETTINGS_ENV) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|path| path.join("gomu").join("gomu.toml"))
        .ok_or(NoConfigDir)
}

/// Short repository name derived from its path.
///
/// Trailing slashes are ignored, so `hatchify/parg/` is named `parg`. Paths
/// without a final normal component, e.g., `.` or `hatchify/..`, are named
/// after the directory they resolve to.
pub fn repository_name(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let lossy = path.to_string_lossy();
    let trimmed = Path::new(lossy.trim_end_matches('/'));
    if let Some(name) = trimmed.file_name() {
        return name.to_string_lossy().into_owned();
    }

    canonicalize(path)
        .ok()
        .and_then(|resolved| {
            resolved
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| lossy.into_owned())
}

/// Express `to` relative to directory `from`.
///
/// Both paths are compared component wise after lexical normalization, so
/// they should be either both absolute or both relative to the same base.
pub fn relative_to(from: impl AsRef<Path>, to: impl AsRef<Path>) -> PathBuf {
    let from = normalize(from.as_ref());
    let to = normalize(to.as_ref());

    let common = from
        .components()
        .zip(to.components())
        .take_while(|(left, right)| left == right)
        .count();

    let mut relative = PathBuf::new();
    for _ in from.components().skip(common) {
        relative.push("..");
    }
    for component in to.components().skip(common) {
        relative.push(component);
    }

    if relative.as_os_str().is_empty() {
        relative.push(".");
    }

    relative
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir if out.file_name().is_some() => {
                out.pop();
            }
            other => out.push(other),
        }
    }

    out
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoConfigDir;

/// Friendly result alias :3
pub type Result<T, E = NoConfigDir> = std::result::Result<T, E>;
