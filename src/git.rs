// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Git operations through the git binary.
//!
//! Every operation spawns `git` with the repository as working directory and
//! blocks until it exits. Nothing here talks to libgit2, so user credential
//! helpers, hooks, and configuration apply exactly as they would in a
//! terminal.
//!
//! # Outcome Classification
//!
//! Git reports some non-events through its output streams, e.g.,
//! "Already up to date." after a pull, or "Already on 'master'" after a
//! checkout. These are classified as [`GitOutcome::Unchanged`] instead of
//! being treated as changes or failures.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    process::Command,
};
use tracing::{debug, instrument};

/// Message attached to every stash gomu creates.
pub const STASH_MESSAGE: &str = "gomu-autostash";

const UNCHANGED_MARKERS: &[&str] = &["Already up to date", "Already up-to-date", "Already on '"];
const MISSING_REF_MARKERS: &[&str] = &[
    "did not match any",
    "invalid reference",
    "not a commit",
    "unknown revision",
];
const NO_TAG_MARKERS: &[&str] = &["No names found", "No tags can describe", "cannot describe"];

/// Captured output of a finished command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Both streams joined, stdout first.
    pub fn text(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (false, true) => self.stdout.clone(),
            _ => self.stderr.clone(),
        }
    }
}

/// Run external programs inside a directory.
pub trait Invoker {
    /// Run program with arguments in target directory, blocking until exit.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Spawn`] if program cannot be started.
    /// - Return [`GitError::Syscall`] if program exits unsuccessfully.
    fn invoke(&self, dir: &Path, program: &str, args: &[String]) -> Result<Output>;
}

impl<I: Invoker + ?Sized> Invoker for &I {
    fn invoke(&self, dir: &Path, program: &str, args: &[String]) -> Result<Output> {
        (**self).invoke(dir, program, args)
    }
}

/// Invoke programs as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInvoker;

impl Invoker for SystemInvoker {
    fn invoke(&self, dir: &Path, program: &str, args: &[String]) -> Result<Output> {
        debug!("run {program} {} in {:?}", args.join(" "), dir.display());
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|err| GitError::Spawn {
                source: err,
                program: program.to_string(),
            })?;

        // INVARIANT: Chomp trailing newlines.
        let stdout = chomp(String::from_utf8_lossy(output.stdout.as_slice()).as_ref());
        let stderr = chomp(String::from_utf8_lossy(output.stderr.as_slice()).as_ref());
        let output_text = Output::new(stdout, stderr);

        if !output.status.success() {
            return Err(GitError::Syscall {
                command: format!("{program} {}", args.join(" ")),
                message: output_text.text(),
            });
        }

        Ok(output_text)
    }
}

fn chomp(text: &str) -> String {
    text.trim_end_matches(['\n', '\r']).to_string()
}

/// Whether a git operation changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitOutcome {
    Changed,
    Unchanged,
}

impl GitOutcome {
    fn classify(text: &str) -> Self {
        if UNCHANGED_MARKERS.iter().any(|marker| text.contains(marker)) {
            Self::Unchanged
        } else {
            Self::Changed
        }
    }
}

impl Display for GitOutcome {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Changed => fmt.write_str("changed"),
            Self::Unchanged => fmt.write_str("unchanged"),
        }
    }
}

/// Named git operations on repository working trees.
#[derive(Debug, Default, Clone)]
pub struct Git<I = SystemInvoker>
where
    I: Invoker,
{
    invoker: I,
}

impl<I> Git<I>
where
    I: Invoker,
{
    /// Construct new git wrapper over an invoker.
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    /// Run any program inside repository.
    pub fn run_command(
        &self,
        repo: &Path,
        program: &str,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Output> {
        let args = args.into_iter().map(Into::into).collect::<Vec<String>>();
        self.invoker.invoke(repo, program, &args)
    }

    fn git(&self, repo: &Path, args: impl IntoIterator<Item = impl Into<String>>) -> Result<Output> {
        self.run_command(repo, "git", args)
    }

    /// Run git, turning classified non-events into success.
    fn git_classified(
        &self,
        repo: &Path,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<GitOutcome> {
        match self.git(repo, args) {
            Ok(output) => Ok(GitOutcome::classify(&output.text())),
            Err(GitError::Syscall { message, .. })
                if GitOutcome::classify(&message) == GitOutcome::Unchanged =>
            {
                Ok(GitOutcome::Unchanged)
            }
            Err(err) => Err(err),
        }
    }

    /// Check if repository has uncommitted changes, untracked files included.
    pub fn has_local_changes(&self, repo: &Path) -> Result<bool> {
        let output = self.git(repo, ["status", "--porcelain"])?;
        Ok(!output.stdout.trim().is_empty())
    }

    /// Name of currently checked out branch.
    pub fn current_branch(&self, repo: &Path) -> Result<String> {
        let output = self.git(repo, ["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(output.stdout.trim().to_string())
    }

    /// Shelve uncommitted changes, returning whether anything was shelved.
    #[instrument(skip(self, repo), level = "debug")]
    pub fn stash(&self, repo: &Path) -> Result<bool> {
        if !self.has_local_changes(repo)? {
            return Ok(false);
        }

        let output = self.git(repo, ["stash", "push", "-m", STASH_MESSAGE])?;
        Ok(!output.text().contains("No local changes to save"))
    }

    /// Restore latest stash made by gomu, returning whether one existed.
    ///
    /// Stashes made by anyone else are left alone.
    #[instrument(skip(self, repo), level = "debug")]
    pub fn stash_pop(&self, repo: &Path) -> Result<bool> {
        let output = self.git(repo, ["stash", "list", "-n", "1"])?;
        if !output.stdout.contains(STASH_MESSAGE) {
            return Ok(false);
        }

        self.git(repo, ["stash", "pop"])?;
        Ok(true)
    }

    /// Checkout existing branch.
    pub fn checkout_branch(&self, repo: &Path, name: &str) -> Result<GitOutcome> {
        self.git_classified(repo, ["checkout", name])
    }

    /// Checkout branch, creating it if it does not exist yet.
    #[instrument(skip(self, repo), level = "debug")]
    pub fn checkout_or_create_branch(&self, repo: &Path, name: &str) -> Result<GitOutcome> {
        match self.checkout_branch(repo, name) {
            Err(GitError::Syscall { message, .. })
                if MISSING_REF_MARKERS.iter().any(|marker| message.contains(marker)) =>
            {
                debug!("branch {name:?} missing, create it");
                self.git(repo, ["checkout", "-b", name])?;
                Ok(GitOutcome::Changed)
            }
            result => result,
        }
    }

    /// Pull current branch from its upstream.
    pub fn pull(&self, repo: &Path) -> Result<GitOutcome> {
        self.git_classified(repo, ["pull"])
    }

    /// Fetch remote refs and tags.
    pub fn fetch(&self, repo: &Path) -> Result<()> {
        self.git(repo, ["fetch", "--tags"])?;
        Ok(())
    }

    /// Restore paths to their state on target revision.
    pub fn checkout_paths(&self, repo: &Path, revision: &str, paths: &[String]) -> Result<()> {
        let mut args = vec!["checkout".to_string(), revision.to_string(), "--".into()];
        args.extend(paths.iter().cloned());
        self.git(repo, args)?;
        Ok(())
    }

    /// Stage paths and commit them, returning whether a commit was made.
    pub fn commit_paths(&self, repo: &Path, paths: &[String], message: &str) -> Result<bool> {
        let mut args = vec!["add".to_string(), "--".into()];
        args.extend(paths.iter().cloned());
        self.git(repo, args)?;
        self.commit_staged(repo, message)
    }

    /// Stage everything and commit it, returning whether a commit was made.
    pub fn commit_all(&self, repo: &Path, message: &str) -> Result<bool> {
        self.git(repo, ["add", "-A"])?;
        self.commit_staged(repo, message)
    }

    fn commit_staged(&self, repo: &Path, message: &str) -> Result<bool> {
        let staged = self.git(repo, ["diff", "--cached", "--name-only"])?;
        if staged.stdout.trim().is_empty() {
            return Ok(false);
        }

        self.git(repo, ["commit", "-m", message])?;
        Ok(true)
    }

    /// Check if local branch has commits its upstream lacks.
    ///
    /// A branch without upstream counts as ahead.
    pub fn is_ahead_of_upstream(&self, repo: &Path) -> Result<bool> {
        match self.git(repo, ["rev-list", "--count", "@{u}..HEAD"]) {
            Ok(output) => Ok(parse_count(&output.stdout)? > 0),
            Err(GitError::Syscall { .. }) => Ok(true),
            Err(err) => Err(err),
        }
    }

    /// Push branch to origin, setting upstream.
    pub fn push(&self, repo: &Path, branch: &str) -> Result<()> {
        self.git(repo, ["push", "-u", "origin", branch])?;
        Ok(())
    }

    /// Create tag on HEAD and push it to origin.
    pub fn tag(&self, repo: &Path, version: &str) -> Result<()> {
        self.git(repo, ["tag", version])?;
        self.git(repo, ["push", "origin", version])?;
        Ok(())
    }

    /// Latest tag reachable from HEAD, if any.
    pub fn latest_tag(&self, repo: &Path) -> Result<Option<String>> {
        match self.git(repo, ["describe", "--tags", "--abbrev=0"]) {
            Ok(output) => Ok(Some(output.stdout.trim().to_string())),
            Err(GitError::Syscall { message, .. })
                if NO_TAG_MARKERS.iter().any(|marker| message.contains(marker)) =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Number of commits on HEAD since revision.
    pub fn commits_since(&self, repo: &Path, revision: &str) -> Result<usize> {
        let range = format!("{revision}..HEAD");
        let output = self.git(repo, ["rev-list", "--count", range.as_str()])?;
        parse_count(&output.stdout)
    }
}

fn parse_count(text: &str) -> Result<usize> {
    text.trim()
        .parse()
        .map_err(|_| GitError::UnexpectedOutput(text.to_string()))
}

/// Git operation error types.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// Program could not be started at all.
    #[error("failed to spawn {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Program ran but exited unsuccessfully.
    #[error("command {command:?} failed:\n{message}")]
    Syscall { command: String, message: String },

    /// Program output could not be interpreted.
    #[error("unexpected command output {0:?}")]
    UnexpectedOutput(String),
}

/// Friendly result alias :3
pub type Result<T, E = GitError> = std::result::Result<T, E>;
