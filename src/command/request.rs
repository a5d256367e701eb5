// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Validated action requests.

use crate::command::{
    flag::{
        BRANCH, COMMIT, DIRECT_IMPORT, FILTER, INCLUDE, MESSAGE, NAME_ONLY, PULL_REQUEST,
        SET_VERSION, SOURCE_PATH, TAG, YES,
    },
    ParseError, ParsedCommand, Result,
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Operation applied across the dependency chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Help,
    Version,
    List,
    Pull,
    Sync,
    Deploy,
    Install,
    Reset,
    ReplaceLocal,
    Test,
    Workflow,
}

impl Action {
    /// Action names accepted on the command line.
    pub const SUPPORTED: &'static [&'static str] = &[
        "help",
        "version",
        "list",
        "pull",
        "sync",
        "deploy",
        "install",
        "reset",
        "replace-local",
        "test",
        "workflow",
    ];

    /// Check if token names a registered action.
    pub fn is_action_name(token: &str) -> bool {
        !token.is_empty() && token.parse::<Self>().is_ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Version => "version",
            Self::List => "list",
            Self::Pull => "pull",
            Self::Sync => "sync",
            Self::Deploy => "deploy",
            Self::Install => "install",
            Self::Reset => "reset",
            Self::ReplaceLocal => "replace-local",
            Self::Test => "test",
            Self::Workflow => "workflow",
        }
    }

    /// Actions that ask for confirmation before touching anything.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Sync | Self::Deploy)
    }

    /// Actions that run the full update pipeline on each repository.
    pub fn updates_manifests(&self) -> bool {
        matches!(
            self,
            Self::Sync | Self::Deploy | Self::Install | Self::ReplaceLocal
        )
    }

    /// Actions that move repositories onto the requested branch.
    pub fn switches_branch(&self) -> bool {
        matches!(self, Self::Pull | Self::Workflow) || self.updates_manifests()
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "" | "help" => Ok(Self::Help),
            "version" => Ok(Self::Version),
            "list" => Ok(Self::List),
            "pull" => Ok(Self::Pull),
            "sync" => Ok(Self::Sync),
            "deploy" => Ok(Self::Deploy),
            "install" => Ok(Self::Install),
            "reset" => Ok(Self::Reset),
            "replace" | "replace-local" => Ok(Self::ReplaceLocal),
            "test" => Ok(Self::Test),
            "workflow" => Ok(Self::Workflow),
            _ => Err(ParseError::UnsupportedAction {
                action: name.to_string(),
            }),
        }
    }
}

impl Display for Action {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Values applied when the command line leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDefaults {
    pub branch: String,
    pub commit_message: String,
    pub target_directories: Vec<PathBuf>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            branch: "master".into(),
            commit_message: "Update mod files.".into(),
            target_directories: vec![PathBuf::from(".")],
        }
    }
}

/// Fully validated request to run one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: Action,

    /// Directories to search for repositories, deduplicated in order.
    pub target_directories: Vec<PathBuf>,

    /// Only process repositories depending on these; empty means everything.
    pub filter_dependencies: Vec<String>,

    pub branch: String,
    pub commit_message: String,
    pub commit: bool,
    pub pull_request: bool,

    /// Tag repositories that gained commits since their last tag.
    pub tag: bool,

    /// Forced tag value for every repository in the chain.
    pub set_version: Option<String>,

    pub name_only: bool,
    pub direct_import: bool,
    pub assume_yes: bool,

    /// Template copied by the workflow action.
    pub source_path: Option<PathBuf>,
}

impl ActionRequest {
    /// Validate parsed command and fill in defaults.
    ///
    /// # Errors
    ///
    /// - Return [`ParseError::UnsupportedAction`] if action is not registered.
    /// - Return [`ParseError::RequiredFlag`] if workflow has no source path.
    pub fn from_parsed(command: &ParsedCommand, defaults: &RequestDefaults) -> Result<Self> {
        let action = command.action.parse::<Action>()?;
        let source_path = command.string_from(SOURCE_PATH).map(PathBuf::from);
        if action == Action::Workflow && source_path.is_none() {
            return Err(ParseError::RequiredFlag {
                action: action.to_string(),
                flag: SOURCE_PATH.to_string(),
            });
        }

        let mut target_directories = Vec::new();
        for dir in command.strings_from(INCLUDE).iter().map(PathBuf::from) {
            if !target_directories.contains(&dir) {
                target_directories.push(dir);
            }
        }
        if target_directories.is_empty() {
            target_directories = defaults.target_directories.clone();
        }

        let mut filter_dependencies: Vec<String> = Vec::new();
        for filter in command.arguments.iter().chain(command.strings_from(FILTER)) {
            if !filter_dependencies.contains(filter) {
                filter_dependencies.push(filter.clone());
            }
        }

        Ok(Self {
            action,
            target_directories,
            filter_dependencies,
            branch: command
                .string_from(BRANCH)
                .unwrap_or(defaults.branch.as_str())
                .to_string(),
            commit_message: command
                .string_from(MESSAGE)
                .unwrap_or(defaults.commit_message.as_str())
                .to_string(),
            commit: command.bool_from(COMMIT),
            pull_request: command.bool_from(PULL_REQUEST),
            tag: command.bool_from(TAG),
            set_version: command.string_from(SET_VERSION).map(ToString::to_string),
            name_only: command.bool_from(NAME_ONLY),
            direct_import: command.bool_from(DIRECT_IMPORT),
            assume_yes: command.bool_from(YES),
            source_path,
        })
    }

    /// Check if any tagging was asked for.
    pub fn tagging_enabled(&self) -> bool {
        self.tag || self.set_version.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Resolver;
    use simple_test_case::test_case;

    fn request(input: &str) -> Result<ActionRequest> {
        let command = Resolver::default().parse(input.split_whitespace().skip(1))?;
        ActionRequest::from_parsed(&command, &RequestDefaults::default())
    }

    #[test_case("", Action::Help; "empty is help")]
    #[test_case("SYNC", Action::Sync; "case insensitive")]
    #[test_case("replace", Action::ReplaceLocal; "replace alias")]
    #[test_case("replace-local", Action::ReplaceLocal; "replace local")]
    #[test]
    fn action_from_name(name: &str, expect: Action) {
        assert_eq!(name.parse::<Action>(), Ok(expect));
    }

    #[test]
    fn every_supported_name_parses() {
        for name in Action::SUPPORTED {
            let action = name.parse::<Action>().unwrap();
            assert_eq!(action.as_str(), *name);
        }
    }

    #[test]
    fn defaults_fill_missing_values() -> anyhow::Result<()> {
        let result = request("gomu list")?;
        let expect = ActionRequest {
            action: Action::List,
            target_directories: vec![PathBuf::from(".")],
            filter_dependencies: Vec::new(),
            branch: "master".into(),
            commit_message: "Update mod files.".into(),
            commit: false,
            pull_request: false,
            tag: false,
            set_version: None,
            name_only: false,
            direct_import: false,
            assume_yes: false,
            source_path: None,
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn full_scenario_resolves_request() -> anyhow::Result<()> {
        let result = request(
            "gomu -include test1 -include test2 -name-only sync -b JIRA-Ticket mod-common simply -i hatchify vroomy",
        )?;

        assert_eq!(result.action, Action::Sync);
        assert_eq!(result.filter_dependencies, vec!["mod-common", "simply"]);
        assert_eq!(result.branch, "JIRA-Ticket");
        assert!(result.name_only);
        assert_eq!(
            result.target_directories,
            ["test1", "test2", "hatchify", "vroomy"]
                .iter()
                .map(PathBuf::from)
                .collect::<Vec<_>>()
        );

        Ok(())
    }

    #[test]
    fn filters_merge_arguments_then_filter_flag() -> anyhow::Result<()> {
        let result = request("gomu sync parg -dep simply -f parg mod-common -t -set v1.0.0")?;
        assert_eq!(result.filter_dependencies, vec!["parg", "simply", "mod-common"]);
        assert!(result.tag);
        assert_eq!(result.set_version.as_deref(), Some("v1.0.0"));
        assert!(result.tagging_enabled());

        Ok(())
    }

    #[test]
    fn unsupported_action_is_rejected_after_parsing() {
        let result = request("gomu frobnicate -c");
        assert_eq!(
            result,
            Err(ParseError::UnsupportedAction {
                action: "frobnicate".into()
            })
        );
    }

    #[test]
    fn workflow_takes_source_through_any_alias() -> anyhow::Result<()> {
        let result = request(
            "gomu workflow mod-utils -c -b new-workflow -source workflows/templates/autotag.yml",
        )?;
        assert_eq!(result.action, Action::Workflow);
        assert_eq!(result.filter_dependencies, vec!["mod-utils"]);
        assert_eq!(
            result.source_path,
            Some(PathBuf::from("workflows/templates/autotag.yml"))
        );
        assert!(result.commit);

        let result = request("gomu -s autotag.yml workflow")?;
        assert_eq!(result.source_path, Some(PathBuf::from("autotag.yml")));

        Ok(())
    }

    #[test]
    fn workflow_without_source_is_rejected() {
        let result = request("gomu workflow mod-utils -b new-workflow");
        assert_eq!(
            result,
            Err(ParseError::RequiredFlag {
                action: "workflow".into(),
                flag: "-source-path".into(),
            })
        );
    }
}
