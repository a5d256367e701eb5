// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Language toolchain operations.
//!
//! Everything the batch orchestrator does to a repository beyond plain
//! branch juggling goes through the [`Toolchain`] trait: ordering
//! repositories, rewriting manifests, tagging, deploying, and building.
//! [`GoToolchain`] implements it for Go modules by combining manifest edits
//! with the `go` and `git` binaries.

use crate::{
    config::Settings,
    git::{Git, GitError, Invoker, SystemInvoker},
    module::{
        sort::{sort_repositories, SortedRepository},
        ModFile, ModuleError,
    },
    path::relative_to,
    repo::RepositoryDescriptor,
};

use semver::Version;
use std::{
    collections::BTreeMap,
    fs::{create_dir_all, read, write},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Directory, relative to repository root, that holds workflow files.
pub const WORKFLOW_DIR: &str = ".github/workflows";

/// Options handed to the deploy operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    pub branch: String,
    pub default_branch: String,
    pub message: String,
    pub commit: bool,
    pub pull_request: bool,
}

/// Options handed to the workflow operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// Template copied into the workflow directory under its own file name.
    pub source: PathBuf,
    pub branch: String,
    pub message: String,
    pub commit: bool,
}

/// Operations the orchestrator delegates to a language toolchain.
pub trait Toolchain {
    /// Order repositories so dependencies come first, applying filters.
    fn sort(
        &self,
        repos: &[RepositoryDescriptor],
        filters: &[String],
        direct: bool,
    ) -> Result<Vec<SortedRepository>>;

    /// Pin requirements to versions resolved earlier in the run.
    fn merge_versions(
        &self,
        repo: &SortedRepository,
        versions: &BTreeMap<String, String>,
    ) -> Result<bool>;

    /// Point requirements on other local repositories at their working trees.
    fn replace_local(&self, repo: &SortedRepository, locals: &[SortedRepository]) -> Result<bool>;

    /// Tidy manifest, then commit and push it if it changed.
    fn update(&self, repo: &SortedRepository, branch: &str, message: &str) -> Result<bool>;

    /// Revert manifest files to their committed state on branch.
    fn reset(&self, repo: &RepositoryDescriptor, branch: &str) -> Result<()>;

    /// Check if repository gained commits since its latest tag.
    fn should_tag(&self, repo: &RepositoryDescriptor) -> Result<bool>;

    /// Tag repository, returning the new version.
    fn tag(&self, repo: &RepositoryDescriptor, forced: Option<&str>) -> Result<String>;

    /// Latest existing tag.
    fn current_tag(&self, repo: &RepositoryDescriptor) -> Result<Option<String>>;

    /// Publish local work, returning whether anything was deployed.
    fn deploy(&self, repo: &RepositoryDescriptor, options: &DeployOptions) -> Result<bool>;

    fn build(&self, repo: &RepositoryDescriptor) -> Result<()>;

    /// Remove throwaway build artifacts.
    fn clean(&self, repo: &RepositoryDescriptor) -> Result<()>;

    fn install(&self, repo: &RepositoryDescriptor) -> Result<()>;

    /// Run test suite, returning whether it passed.
    fn test(&self, repo: &RepositoryDescriptor) -> Result<bool>;

    /// Copy workflow template into repository, returning whether it changed.
    fn add_workflow(&self, repo: &RepositoryDescriptor, options: &WorkflowOptions) -> Result<bool>;
}

/// Toolchain for Go modules.
#[derive(Debug, Clone)]
pub struct GoToolchain<I = SystemInvoker>
where
    I: Invoker,
{
    git: Git<I>,
    settings: Settings,
}

impl<I> GoToolchain<I>
where
    I: Invoker,
{
    /// Construct new Go toolchain.
    pub fn new(git: Git<I>, settings: Settings) -> Self {
        Self { git, settings }
    }

    fn run_configured(&self, repo: &RepositoryDescriptor, command: &[String]) -> Result<()> {
        let (program, args) = command.split_first().ok_or(ToolchainError::EmptyCommand)?;
        self.git.run_command(repo.as_path(), program, args.iter().cloned())?;
        Ok(())
    }
}

impl<I> Toolchain for GoToolchain<I>
where
    I: Invoker,
{
    fn sort(
        &self,
        repos: &[RepositoryDescriptor],
        filters: &[String],
        direct: bool,
    ) -> Result<Vec<SortedRepository>> {
        Ok(sort_repositories(repos, filters, direct)?)
    }

    #[instrument(skip(self, repo, versions), level = "debug")]
    fn merge_versions(
        &self,
        repo: &SortedRepository,
        versions: &BTreeMap<String, String>,
    ) -> Result<bool> {
        let mut manifest = ModFile::load(repo.repo.as_path())?;
        if !manifest.set_versions(versions) {
            return Ok(false);
        }

        debug!("pin resolved versions in {}", repo.repo);
        manifest.store(repo.repo.as_path())?;
        Ok(true)
    }

    #[instrument(skip(self, repo, locals), level = "debug")]
    fn replace_local(&self, repo: &SortedRepository, locals: &[SortedRepository]) -> Result<bool> {
        let mut manifest = ModFile::load(repo.repo.as_path())?;
        let mut changed = false;
        for local in locals {
            if local.module == repo.module || !manifest.requires_module(&local.module) {
                continue;
            }

            let target = local_target(repo.repo.as_path(), local.repo.as_path());
            changed |= manifest.set_replace(&local.module, &target);
        }

        if changed {
            manifest.store(repo.repo.as_path())?;
        }

        Ok(changed)
    }

    #[instrument(skip(self, repo, message), level = "debug")]
    fn update(&self, repo: &SortedRepository, branch: &str, message: &str) -> Result<bool> {
        let path = repo.repo.as_path();
        self.git.run_command(path, "go", ["mod", "tidy"])?;

        let mut args = vec!["status".to_string(), "--porcelain".into(), "--".into()];
        args.extend(self.settings.manifest_files.iter().cloned());
        let status = self.git.run_command(path, "git", args)?;
        if status.stdout.trim().is_empty() {
            return Ok(false);
        }

        if !self
            .git
            .commit_paths(path, &self.settings.manifest_files, message)?
        {
            return Ok(false);
        }

        self.git.push(path, branch)?;
        Ok(true)
    }

    fn reset(&self, repo: &RepositoryDescriptor, branch: &str) -> Result<()> {
        Ok(self
            .git
            .checkout_paths(repo.as_path(), branch, &self.settings.manifest_files)?)
    }

    fn should_tag(&self, repo: &RepositoryDescriptor) -> Result<bool> {
        if let Err(err) = self.git.fetch(repo.as_path()) {
            debug!("cannot fetch tags for {repo}: {err}");
        }

        match self.git.latest_tag(repo.as_path())? {
            Some(tag) => Ok(self.git.commits_since(repo.as_path(), &tag)? > 0),
            None => Ok(false),
        }
    }

    #[instrument(skip(self, repo), level = "debug")]
    fn tag(&self, repo: &RepositoryDescriptor, forced: Option<&str>) -> Result<String> {
        let version = match forced {
            Some(version) => version.to_string(),
            None => {
                let latest = self
                    .git
                    .latest_tag(repo.as_path())?
                    .ok_or_else(|| ToolchainError::NoTag(repo.name.clone()))?;
                increment_patch(&latest)?
            }
        };

        self.git.tag(repo.as_path(), &version)?;
        debug!("tagged {repo} as {version}");
        Ok(version)
    }

    fn current_tag(&self, repo: &RepositoryDescriptor) -> Result<Option<String>> {
        Ok(self.git.latest_tag(repo.as_path())?)
    }

    #[instrument(skip(self, repo, options), level = "debug")]
    fn deploy(&self, repo: &RepositoryDescriptor, options: &DeployOptions) -> Result<bool> {
        let path = repo.as_path();
        let mut deployed = false;

        if self.git.has_local_changes(path)? {
            if options.commit {
                deployed |= self.git.commit_all(path, &options.message)?;
            } else {
                debug!("{repo} has local changes, use -commit to deploy them");
            }
        }

        if self.git.is_ahead_of_upstream(path)? {
            self.git.push(path, &options.branch)?;
            deployed = true;
        }

        if deployed && options.pull_request && options.branch != options.default_branch {
            self.git.run_command(
                path,
                "gh",
                [
                    "pr",
                    "create",
                    "--fill",
                    "--base",
                    options.default_branch.as_str(),
                    "--head",
                    options.branch.as_str(),
                ],
            )?;
        }

        Ok(deployed)
    }

    fn build(&self, repo: &RepositoryDescriptor) -> Result<()> {
        self.run_configured(repo, &self.settings.commands.build)
    }

    fn clean(&self, repo: &RepositoryDescriptor) -> Result<()> {
        self.run_configured(repo, &self.settings.commands.clean)
    }

    fn install(&self, repo: &RepositoryDescriptor) -> Result<()> {
        self.run_configured(repo, &self.settings.commands.install)
    }

    fn test(&self, repo: &RepositoryDescriptor) -> Result<bool> {
        match self.run_configured(repo, &self.settings.commands.test) {
            Ok(()) => Ok(true),
            Err(ToolchainError::Git(GitError::Syscall { message, .. })) => {
                debug!("tests failed in {repo}:\n{message}");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, repo, options), level = "debug")]
    fn add_workflow(&self, repo: &RepositoryDescriptor, options: &WorkflowOptions) -> Result<bool> {
        let name = options
            .source
            .file_name()
            .ok_or_else(|| ToolchainError::InvalidTemplate(options.source.clone()))?;
        let template = read(&options.source).map_err(|err| ToolchainError::Template {
            source: err,
            path: options.source.clone(),
        })?;

        let relative = Path::new(WORKFLOW_DIR).join(name);
        let target = repo.as_path().join(&relative);
        if read(&target).is_ok_and(|current| current == template) {
            debug!("{repo} already has {:?}", relative.display());
            return Ok(false);
        }

        let dir = repo.as_path().join(WORKFLOW_DIR);
        create_dir_all(&dir).map_err(|err| ToolchainError::Template {
            source: err,
            path: dir.clone(),
        })?;
        write(&target, template).map_err(|err| ToolchainError::Template {
            source: err,
            path: target.clone(),
        })?;

        if options.commit {
            let paths = [relative.to_string_lossy().into_owned()];
            if self.git.commit_paths(repo.as_path(), &paths, &options.message)? {
                self.git.push(repo.as_path(), &options.branch)?;
            }
        }

        Ok(true)
    }
}

/// Path of local module relative to repository, in the form Go expects.
fn local_target(repo: &Path, local: &Path) -> String {
    let relative = relative_to(repo, local).to_string_lossy().into_owned();
    if relative.starts_with("../") || relative.starts_with("./") {
        relative
    } else {
        format!("./{relative}")
    }
}

/// Increment patch component of semantic version tag.
///
/// A leading `v` is kept, pre-release and build metadata are dropped.
///
/// # Errors
///
/// - Return [`ToolchainError::InvalidVersion`] if tag is not a semantic version.
pub fn increment_patch(tag: &str) -> Result<String> {
    let (prefix, raw) = match tag.strip_prefix('v') {
        Some(raw) => ("v", raw),
        None => ("", tag),
    };

    let mut version = Version::parse(raw).map_err(|err| ToolchainError::InvalidVersion {
        source: err,
        tag: tag.to_string(),
    })?;
    version.patch += 1;
    version.pre = semver::Prerelease::EMPTY;
    version.build = semver::BuildMetadata::EMPTY;

    Ok(format!("{prefix}{version}"))
}

/// Toolchain operation error types.
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Repository has no tag to increment from.
    #[error("no previous tag set in {0}, use -set-version to set one")]
    NoTag(String),

    /// Tag is not a semantic version.
    #[error("tag {tag:?} is not a semantic version")]
    InvalidVersion {
        #[source]
        source: semver::Error,
        tag: String,
    },

    /// Configured command has no program.
    #[error("configured command is empty")]
    EmptyCommand,

    /// Workflow template path names no file.
    #[error("workflow template {0:?} is not a file path")]
    InvalidTemplate(PathBuf),

    /// Workflow template could not be copied.
    #[error("failed to copy workflow template through {path:?}")]
    Template {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ToolchainError> = std::result::Result<T, E>;
