// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository discovery.
//!
//! Gomu works on __target directories__, each holding any number of
//! repositories as direct children. A target directory that is itself a
//! repository is taken as is.

use crate::path::repository_name;

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_dir,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Location and short name of a repository working tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryDescriptor {
    pub path: PathBuf,
    pub name: String,
}

impl RepositoryDescriptor {
    /// Construct new descriptor, deriving name from path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = repository_name(&path);
        Self { path, name }
    }

    pub fn as_path(&self) -> &Path {
        self.path.as_path()
    }

    /// Check if repository is plugin, i.e., must never be tagged.
    ///
    /// Suffix match is case-sensitive.
    pub fn is_plugin(&self, suffix: &str) -> bool {
        !suffix.is_empty() && self.name.ends_with(suffix)
    }
}

impl Display for RepositoryDescriptor {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.path.to_string_lossy().as_ref())
    }
}

/// Enumerate repositories in target directories.
///
/// Hidden entries and plain files are skipped. Directories are listed in
/// name order, and a path reached through more than one target directory is
/// only reported once. Unreadable target directories are skipped with a
/// warning.
#[instrument(skip(target_dirs), level = "debug")]
pub fn enumerate(target_dirs: &[PathBuf]) -> Vec<RepositoryDescriptor> {
    let mut repos: Vec<RepositoryDescriptor> = Vec::new();
    for dir in target_dirs {
        for repo in enumerate_dir(dir) {
            if !repos.iter().any(|known| known.path == repo.path) {
                repos.push(repo);
            }
        }
    }

    debug!("found {} repositories in {:?}", repos.len(), target_dirs);
    repos
}

fn enumerate_dir(dir: &Path) -> Vec<RepositoryDescriptor> {
    if dir.join(".git").exists() {
        return vec![RepositoryDescriptor::new(dir)];
    }

    let entries = match read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot list {:?}: {err}", dir.display());
            return Vec::new();
        }
    };

    let mut paths = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
        .map(|entry| dir.join(entry.file_name()))
        .collect::<Vec<_>>();
    paths.sort();

    paths.into_iter().map(RepositoryDescriptor::new).collect()
}

/// Mutable record of what happened to one repository during a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepositoryRunState {
    pub updated: bool,
    pub tagged: bool,
    pub deployed: bool,
    pub installed: bool,
    pub tests_failed: bool,

    /// Version the repository ended the run on, empty if unknown.
    pub version: String,

    pub had_local_changes: bool,

    /// Gomu holds a stash for this repository that is not restored yet.
    pub stashed: bool,

    /// Branch checked out before the run started.
    pub original_branch: Option<String>,

    /// Repository went through a per-repository step.
    pub processed: bool,
}
