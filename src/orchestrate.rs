// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Batch orchestration.
//!
//! One [`ActionRequest`] is applied across every repository in dependency
//! order. A run goes through four phases:
//!
//! 1. __Pre-isolation__: every enumerated repository has its current branch
//!    recorded and its uncommitted changes stashed.
//! 2. __Ordering__: repositories are sorted and filtered by the toolchain.
//!    Destructive actions ask the user for confirmation here.
//! 3. __Processing__: each repository is handled strictly one after the
//!    other. Versions resolved for earlier repositories are pinned into the
//!    manifests of later ones.
//! 4. __Restoration__: branches are put back and stashes replayed, no matter
//!    how the earlier phases went.
//!
//! Failures inside one repository never stop the batch. They are logged and
//! collected as notifications in the final [`RunReport`].

use crate::{
    command::{Action, ActionRequest},
    config::Settings,
    git::{Git, GitOutcome, Invoker, SystemInvoker},
    module::sort::SortedRepository,
    repo::{RepositoryDescriptor, RepositoryRunState},
    report::{RunReport, Verbosity},
    toolchain::{DeployOptions, GoToolchain, Toolchain, ToolchainError, WorkflowOptions},
};

use inquire::{Confirm as ConfirmPrompt, InquireError};
use std::{collections::BTreeMap, fmt::Display};
use tracing::{debug, info, instrument, warn};

/// Ask user a yes or no question.
pub trait Confirm {
    /// Ask question, returning whether user agreed.
    ///
    /// # Errors
    ///
    /// - Return [`OrchestrateError::Prompt`] if user cannot be asked.
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Confirmation through an interactive terminal prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquireConfirm;

impl Confirm for InquireConfirm {
    fn confirm(&self, message: &str) -> Result<bool> {
        ConfirmPrompt::new(message)
            .with_default(false)
            .prompt()
            .map_err(OrchestrateError::Prompt)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every repository went through its step.
    Completed(RunReport),

    /// User turned down the confirmation prompt, nothing was touched.
    Declined,
}

/// Applies one action across an ordered set of repositories.
#[derive(Debug)]
pub struct Orchestrator<T = GoToolchain, I = SystemInvoker, C = InquireConfirm>
where
    T: Toolchain,
    I: Invoker,
    C: Confirm,
{
    git: Git<I>,
    toolchain: T,
    confirm: C,
    plugin_suffix: String,
    default_branch: String,
    verbosity: Verbosity,
}

impl<T, I, C> Orchestrator<T, I, C>
where
    T: Toolchain,
    I: Invoker,
    C: Confirm,
{
    /// Construct new orchestrator.
    pub fn new(
        git: Git<I>,
        toolchain: T,
        confirm: C,
        settings: &Settings,
        verbosity: Verbosity,
    ) -> Self {
        Self {
            git,
            toolchain,
            confirm,
            plugin_suffix: settings.plugin_suffix.clone(),
            default_branch: settings.default_branch.clone(),
            verbosity,
        }
    }

    /// Run request across repositories.
    ///
    /// Restoration runs on every path out of this function, errors included.
    ///
    /// # Errors
    ///
    /// - Return [`OrchestrateError::Sort`] if repositories cannot be ordered.
    /// - Return [`OrchestrateError::Prompt`] if confirmation cannot be asked.
    #[instrument(skip(self, request, repos), level = "debug")]
    pub fn run(&self, request: &ActionRequest, repos: &[RepositoryDescriptor]) -> Result<RunOutcome> {
        let mut report = RunReport::new();
        let mut states = repos
            .iter()
            .map(|repo| (repo.clone(), self.isolate(repo, &mut report)))
            .collect::<Vec<_>>();

        let sorted = match self.toolchain.sort(
            repos,
            &request.filter_dependencies,
            request.direct_import,
        ) {
            Ok(sorted) => sorted,
            Err(err) => {
                self.restore(request, &mut states, &mut report);
                return Err(OrchestrateError::Sort(err));
            }
        };

        self.narrate(found(sorted.len(), &request.filter_dependencies));

        if request.action.is_destructive() && !request.assume_yes {
            let question = format!(
                "{} {} lib(s) on branch {}?",
                request.action,
                sorted.len(),
                request.branch
            );

            match self.confirm.confirm(&question) {
                Ok(true) => {}
                Ok(false) => {
                    info!("{} declined, restore working trees", request.action);
                    self.restore(request, &mut states, &mut report);
                    return Ok(RunOutcome::Declined);
                }
                Err(err) => {
                    self.restore(request, &mut states, &mut report);
                    return Err(err);
                }
            }
        }

        report.total = sorted.len();
        let mut versions = BTreeMap::new();
        for (index, node) in sorted.iter().enumerate() {
            let Some((_, state)) = states.iter_mut().find(|(repo, _)| repo.path == node.repo.path)
            else {
                debug!("{} was never isolated, skip it", node.repo);
                continue;
            };

            self.narrate(progress(index, sorted.len(), &node.repo));
            state.processed = true;
            self.step(request, &sorted, index, state, &versions, &mut report);

            if !state.version.is_empty() {
                versions.insert(node.module.clone(), state.version.clone());
            }

            if request.action == Action::List {
                report.list(&node.repo);
            }
            report.record(&node.repo, state);
        }

        self.restore(request, &mut states, &mut report);
        Ok(RunOutcome::Completed(report))
    }

    fn isolate(&self, repo: &RepositoryDescriptor, report: &mut RunReport) -> RepositoryRunState {
        let mut state = RepositoryRunState::default();
        match self.git.current_branch(repo.as_path()) {
            Ok(branch) => state.original_branch = Some(branch),
            Err(err) => self.soft_failure(report, repo, "failed to read current branch", err),
        }

        match self.git.stash(repo.as_path()) {
            Ok(stashed) => {
                state.had_local_changes = stashed;
                state.stashed = stashed;
            }
            Err(err) => self.soft_failure(report, repo, "failed to stash local changes", err),
        }

        state
    }

    fn step(
        &self,
        request: &ActionRequest,
        sorted: &[SortedRepository],
        index: usize,
        state: &mut RepositoryRunState,
        versions: &BTreeMap<String, String>,
        report: &mut RunReport,
    ) {
        let node = &sorted[index];
        let repo = &node.repo;

        match request.action {
            Action::List | Action::Help | Action::Version => {}
            Action::Pull => {
                if self.switch_branch(request, repo, report)
                    && self.pull(request, repo, report) == Some(GitOutcome::Changed)
                {
                    state.updated = true;
                }
                self.replay_stash(repo, state, report);
            }
            Action::Workflow => {
                if !self.switch_branch(request, repo, report) {
                    return;
                }
                self.pull(request, repo, report);

                // INVARIANT: Empty source path fails as an invalid template.
                let options = WorkflowOptions {
                    source: request.source_path.clone().unwrap_or_default(),
                    branch: request.branch.clone(),
                    message: request.commit_message.clone(),
                    commit: request.commit,
                };
                match self.toolchain.add_workflow(repo, &options) {
                    Ok(added) => state.updated = added,
                    Err(err) => self.soft_failure(report, repo, "failed to add workflow", err),
                }
            }
            Action::Reset => {
                self.replay_stash(repo, state, report);
                match self.toolchain.reset(repo, &request.branch) {
                    Ok(()) => state.updated = true,
                    Err(err) => self.soft_failure(report, repo, "failed to reset mod files", err),
                }
            }
            Action::Test => match self.toolchain.test(repo) {
                Ok(passed) => state.tests_failed = !passed,
                Err(err) => {
                    state.tests_failed = true;
                    self.soft_failure(report, repo, "failed to run tests", err);
                }
            },
            Action::Sync | Action::Deploy | Action::Install | Action::ReplaceLocal => {
                if !self.switch_branch(request, repo, report) {
                    return;
                }
                self.pull(request, repo, report);
                self.update(request, sorted, index, state, versions, report);
            }
        }
    }

    fn update(
        &self,
        request: &ActionRequest,
        sorted: &[SortedRepository],
        index: usize,
        state: &mut RepositoryRunState,
        versions: &BTreeMap<String, String>,
        report: &mut RunReport,
    ) {
        let node = &sorted[index];
        let repo = &node.repo;

        if request.action == Action::Deploy {
            if request.commit {
                self.replay_stash(repo, state, report);
            }

            let options = DeployOptions {
                branch: request.branch.clone(),
                default_branch: self.default_branch.clone(),
                message: request.commit_message.clone(),
                commit: request.commit,
                pull_request: request.pull_request,
            };
            match self.toolchain.deploy(repo, &options) {
                Ok(deployed) => state.deployed = deployed,
                Err(err) => self.soft_failure(report, repo, "failed to deploy", err),
            }
        }

        if let Err(err) = self.toolchain.merge_versions(node, versions) {
            self.soft_failure(report, repo, "failed to merge versions", err);
        }

        let mut may_tag = request.tagging_enabled();
        if request.action == Action::ReplaceLocal {
            match self.toolchain.replace_local(node, sorted) {
                Ok(replaced) => state.updated = replaced,
                Err(err) => self.soft_failure(report, repo, "failed to replace local modules", err),
            }
            may_tag = false;
        } else {
            match self
                .toolchain
                .update(node, &request.branch, &request.commit_message)
            {
                Ok(updated) => state.updated = updated,
                Err(err) => self.soft_failure(report, repo, "failed to update mod files", err),
            }
        }

        if repo.is_plugin(&self.plugin_suffix) {
            debug!("{repo} is a plugin, never tag it");
            may_tag = false;
        }

        if may_tag {
            self.tag(request, repo, state, report);
        }

        if state.version.is_empty() {
            state.version = match &request.set_version {
                Some(forced) => forced.clone(),
                None => self
                    .toolchain
                    .current_tag(repo)
                    .ok()
                    .flatten()
                    .unwrap_or_default(),
            };
        }

        if request.action == Action::Install {
            state.installed = self.install(repo, report);
        }
    }

    fn tag(
        &self,
        request: &ActionRequest,
        repo: &RepositoryDescriptor,
        state: &mut RepositoryRunState,
        report: &mut RunReport,
    ) {
        let forced = request.set_version.as_deref();
        if forced.is_none() {
            match self.toolchain.should_tag(repo) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("no new commits in {repo} since latest tag");
                    return;
                }
                Err(err) => {
                    self.soft_failure(report, repo, "failed to inspect tags", err);
                    return;
                }
            }
        }

        match self.toolchain.tag(repo, forced) {
            Ok(version) => {
                state.tagged = true;
                state.version = version;
            }
            Err(err) => self.soft_failure(report, repo, "failed to tag", err),
        }
    }

    fn install(&self, repo: &RepositoryDescriptor, report: &mut RunReport) -> bool {
        let steps: [(&str, fn(&T, &RepositoryDescriptor) -> Result<(), ToolchainError>); 3] = [
            ("build", T::build),
            ("clean", T::clean),
            ("install", T::install),
        ];

        for (name, run) in steps {
            if let Err(err) = run(&self.toolchain, repo) {
                self.soft_failure(report, repo, format!("failed to {name}"), err);
                return false;
            }
        }

        true
    }

    fn switch_branch(
        &self,
        request: &ActionRequest,
        repo: &RepositoryDescriptor,
        report: &mut RunReport,
    ) -> bool {
        match self.git.checkout_or_create_branch(repo.as_path(), &request.branch) {
            Ok(_) => true,
            Err(err) => {
                self.soft_failure(report, repo, format!("failed to checkout {}", request.branch), err);
                false
            }
        }
    }

    fn pull(
        &self,
        request: &ActionRequest,
        repo: &RepositoryDescriptor,
        report: &mut RunReport,
    ) -> Option<GitOutcome> {
        match self.git.pull(repo.as_path()) {
            Ok(outcome) => {
                debug!("pull {repo}: {outcome}");
                Some(outcome)
            }
            Err(err) => {
                self.soft_failure(report, repo, format!("failed to pull {}", request.branch), err);
                None
            }
        }
    }

    fn replay_stash(
        &self,
        repo: &RepositoryDescriptor,
        state: &mut RepositoryRunState,
        report: &mut RunReport,
    ) {
        if !state.stashed {
            return;
        }

        match self.git.stash_pop(repo.as_path()) {
            Ok(_) => state.stashed = false,
            Err(err) => self.soft_failure(report, repo, "failed to replay stashed changes", err),
        }
    }

    fn restore(
        &self,
        request: &ActionRequest,
        states: &mut [(RepositoryDescriptor, RepositoryRunState)],
        report: &mut RunReport,
    ) {
        for (repo, state) in states.iter_mut() {
            if state.processed && request.action.switches_branch() {
                self.restore_branch(repo, &request.branch, report);
            } else if let Some(original) = &state.original_branch {
                match self.git.current_branch(repo.as_path()) {
                    Ok(current) if current == *original => {}
                    Ok(_) => self.restore_branch(repo, original, report),
                    Err(err) => self.soft_failure(report, repo, "failed to read current branch", err),
                }
            }

            self.replay_stash(repo, state, report);
        }
    }

    fn restore_branch(&self, repo: &RepositoryDescriptor, branch: &str, report: &mut RunReport) {
        if let Err(err) = self.git.checkout_branch(repo.as_path(), branch) {
            self.soft_failure(report, repo, format!("failed to restore branch {branch}"), err);
        }
    }

    fn narrate(&self, message: impl Display) {
        if self.verbosity == Verbosity::Normal {
            info!("{message}");
        }
    }

    fn soft_failure(
        &self,
        report: &mut RunReport,
        repo: &RepositoryDescriptor,
        what: impl Into<String>,
        err: impl Display,
    ) {
        let what = what.into();
        warn!("{repo}: {what}: {err}");
        report.notify(repo, what);
    }
}

/// Header narrated once repositories are ordered.
fn found(count: usize, filters: &[String]) -> String {
    if filters.is_empty() {
        format!("Found {count} lib(s)")
    } else {
        format!("Found {count} lib(s) depending on [{}]", filters.join(" "))
    }
}

/// Progress line narrated before each repository.
fn progress(index: usize, total: usize, repo: &RepositoryDescriptor) -> String {
    format!("( {} / {total} ) {repo}", index + 1)
}

/// Orchestration error types.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrateError {
    /// Repositories could not be put in dependency order.
    #[error("failed to order repositories")]
    Sort(#[source] ToolchainError),

    /// Confirmation prompt failed.
    #[error("failed to ask for confirmation")]
    Prompt(#[source] InquireError),
}

/// Friendly result alias :3
pub type Result<T, E = OrchestrateError> = std::result::Result<T, E>;
