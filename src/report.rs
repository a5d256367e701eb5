// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Run summaries.
//!
//! The orchestrator folds what happened to each repository into a
//! [`RunReport`]. Once the batch is done, [`render`] turns the report into
//! the text printed to stdout, either as prose keyed by action, or as a bare
//! path listing meant for piping into other tools.

use crate::{
    command::Action,
    repo::{RepositoryDescriptor, RepositoryRunState},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult, Write},
    path::PathBuf,
};

/// How much gomu says while it works.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Narrate progress and print a full summary.
    #[default]
    Normal,

    /// Print nothing but the paths of repositories of interest.
    NameOnly,
}

/// Failure that did not stop the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub repo: String,
    pub message: String,
}

impl Display for Notification {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}: {}", self.repo, self.message)
    }
}

/// Aggregated outcome of one batch run.
///
/// Every category keeps one line per repository in processing order, so its
/// count is the number of lines.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Number of repositories in the ordered sequence.
    pub total: usize,

    pub listed: Vec<String>,
    pub updated: Vec<String>,
    pub tagged: Vec<String>,
    pub deployed: Vec<String>,
    pub installed: Vec<String>,
    pub failed_tests: Vec<String>,

    /// Repositories the run changed in any way.
    pub changed: Vec<PathBuf>,

    pub notifications: Vec<Notification>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add repository to ordered listing.
    pub fn list(&mut self, repo: &RepositoryDescriptor) {
        self.listed.push(repo.to_string());
    }

    /// Fold final state of repository into report.
    pub fn record(&mut self, repo: &RepositoryDescriptor, state: &RepositoryRunState) {
        let line = repo.to_string();
        if state.updated {
            self.updated.push(line.clone());
        }

        if state.tagged {
            self.tagged.push(format!("{line} {}", state.version));
        }

        if state.deployed {
            self.deployed.push(line.clone());
        }

        if state.installed {
            self.installed.push(line.clone());
        }

        if state.tests_failed {
            self.failed_tests.push(line);
        }

        if state.updated || state.tagged || state.deployed || state.installed {
            self.changed.push(repo.path.clone());
        }
    }

    /// Record soft failure for repository.
    pub fn notify(&mut self, repo: &RepositoryDescriptor, message: impl Into<String>) {
        self.notifications.push(Notification {
            repo: repo.to_string(),
            message: message.into(),
        });
    }
}

/// Render report for action at requested verbosity.
pub fn render(action: Action, branch: &str, report: &RunReport, verbosity: Verbosity) -> String {
    match verbosity {
        Verbosity::Normal => format(action, branch, report),
        Verbosity::NameOnly => format_names(action, report),
    }
}

/// Render report as prose keyed by action.
pub fn format(action: Action, branch: &str, report: &RunReport) -> String {
    let total = report.total;
    let mut output = String::new();

    match action {
        Action::List => section(
            &mut output,
            &report.listed,
            "No libs found in target directories.".into(),
            format!("Dependency chain of {total} lib(s):"),
        ),
        Action::Pull => section(
            &mut output,
            &report.updated,
            format!("Pulled latest version of {branch} in 0/{total} lib(s)."),
            format!(
                "Pulled latest version of {branch} in {}/{total} lib(s):",
                report.updated.len()
            ),
        ),
        Action::ReplaceLocal => section(
            &mut output,
            &report.updated,
            "All lib dependencies already point at local copies!".into(),
            format!(
                "Replaced dependencies with local copies in {}/{total} lib(s):",
                report.updated.len()
            ),
        ),
        Action::Reset => section(
            &mut output,
            &report.updated,
            "No mod files reset.".into(),
            format!(
                "Reset mod files to {branch} in {}/{total} lib(s):",
                report.updated.len()
            ),
        ),
        Action::Workflow => section(
            &mut output,
            &report.updated,
            format!("Workflow already present in {total} lib(s)."),
            format!(
                "Added workflow to {}/{total} lib(s):",
                report.updated.len()
            ),
        ),
        Action::Test => section(
            &mut output,
            &report.failed_tests,
            format!("All tests passed in {total} lib(s)!"),
            format!(
                "Tests failed in {}/{total} lib(s):",
                report.failed_tests.len()
            ),
        ),
        _ => {
            section(
                &mut output,
                &report.updated,
                "All lib dependencies already up to date!".into(),
                format!(
                    "Updated mod files in {}/{total} lib(s):",
                    report.updated.len()
                ),
            );
            section(
                &mut output,
                &report.tagged,
                "All lib tags already up to date!".into(),
                format!("Updated tag in {}/{total} lib(s):", report.tagged.len()),
            );

            if action == Action::Deploy {
                section(
                    &mut output,
                    &report.deployed,
                    format!("No local changes to deploy in {total} lib(s)."),
                    format!(
                        "Deployed new changes to <{branch}> in {}/{total} lib(s):",
                        report.deployed.len()
                    ),
                );
            } else if action == Action::Install {
                section(
                    &mut output,
                    &report.installed,
                    format!("No packages installed in {total} lib(s)."),
                    format!("Installed {}/{total} lib(s):", report.installed.len()),
                );
            }
        }
    }

    if !report.notifications.is_empty() {
        let lines = report
            .notifications
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        section(
            &mut output,
            &lines,
            String::new(),
            format!("Failed operations in {} case(s):", lines.len()),
        );
    }

    output
}

/// Render report as bare paths, one per line.
///
/// Listing and testing print the listed and failing repositories
/// respectively. Everything else prints the repositories it changed.
pub fn format_names(action: Action, report: &RunReport) -> String {
    let mut output = String::new();
    let lines = match action {
        Action::List => report.listed.clone(),
        Action::Test => report.failed_tests.clone(),
        _ => report
            .changed
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect(),
    };

    for line in lines {
        // INVARIANT: Writing into a String cannot fail.
        let _ = writeln!(output, "{line}");
    }

    output
}

fn section(output: &mut String, lines: &[String], empty: String, header: String) {
    if !output.is_empty() {
        output.push('\n');
    }

    if lines.is_empty() {
        output.push_str(&empty);
        output.push('\n');
        return;
    }

    output.push_str(&header);
    output.push('\n');
    for line in lines {
        output.push_str("  ");
        output.push_str(line);
        output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use simple_test_case::test_case;

    fn state(updated: bool, tagged: bool, deployed: bool) -> RepositoryRunState {
        RepositoryRunState {
            updated,
            tagged,
            deployed,
            version: "v0.2.1".into(),
            ..RepositoryRunState::default()
        }
    }

    fn sample() -> RunReport {
        let mut report = RunReport::new();
        report.total = 3;
        report.record(&RepositoryDescriptor::new("hatchify/parg"), &state(true, true, false));
        report.record(&RepositoryDescriptor::new("hatchify/simply"), &state(true, false, true));
        report.record(&RepositoryDescriptor::new("vroomy/cors-plugin"), &state(false, false, false));
        report
    }

    #[test]
    fn sync_renders_updated_and_tagged_sections() {
        let result = format(Action::Sync, "master", &sample());
        let expect = indoc! {"
            Updated mod files in 2/3 lib(s):
              hatchify/parg
              hatchify/simply

            Updated tag in 1/3 lib(s):
              hatchify/parg v0.2.1
        "};
        assert_eq!(result, expect);
    }

    #[test]
    fn deploy_adds_deployed_section() {
        let result = format(Action::Deploy, "JIRA-Ticket", &sample());
        assert!(result.ends_with("Deployed new changes to <JIRA-Ticket> in 1/3 lib(s):\n  hatchify/simply\n"));
    }

    #[test]
    fn empty_categories_render_fixed_sentences() {
        let report = RunReport {
            total: 4,
            ..RunReport::default()
        };
        let result = format(Action::Install, "master", &report);
        let expect = indoc! {"
            All lib dependencies already up to date!

            All lib tags already up to date!

            No packages installed in 4 lib(s).
        "};
        assert_eq!(result, expect);
    }

    #[test]
    fn pull_renders_single_section() {
        let result = format(Action::Pull, "dev", &sample());
        let expect = indoc! {"
            Pulled latest version of dev in 2/3 lib(s):
              hatchify/parg
              hatchify/simply
        "};
        assert_eq!(result, expect);
    }

    #[test]
    fn notifications_follow_summary() {
        let mut report = RunReport {
            total: 1,
            ..RunReport::default()
        };
        report.notify(
            &RepositoryDescriptor::new("hatchify/parg"),
            "failed to pull master",
        );

        let result = format(Action::Pull, "master", &report);
        let expect = indoc! {"
            Pulled latest version of master in 0/1 lib(s).

            Failed operations in 1 case(s):
              hatchify/parg: failed to pull master
        "};
        assert_eq!(result, expect);
    }

    #[test]
    fn workflow_renders_single_section() {
        let result = format(Action::Workflow, "new-workflow", &sample());
        let expect = indoc! {"
            Added workflow to 2/3 lib(s):
              hatchify/parg
              hatchify/simply
        "};
        assert_eq!(result, expect);
    }

    #[test_case(Action::Sync, "hatchify/parg\nhatchify/simply\n"; "changed paths")]
    #[test_case(Action::List, "hatchify/mod-common\n"; "listed paths")]
    #[test_case(Action::Test, ""; "failing paths")]
    #[test]
    fn name_only_prints_paths(action: Action, expect: &str) {
        let mut report = sample();
        report.list(&RepositoryDescriptor::new("hatchify/mod-common"));

        assert_eq!(render(action, "master", &report, Verbosity::NameOnly), expect);
    }
}
