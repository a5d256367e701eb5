// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Command line resolution.
//!
//! Gomu does not follow the usual subcommand grammar. The action may appear
//! anywhere on the command line: before, between, or after flags. Flags may
//! be spelled through any of their aliases, and list flags keep swallowing
//! words until the next flag. The [`Resolver`] untangles all of that into a
//! [`ParsedCommand`], which is then validated into an [`ActionRequest`].
//!
//! # Resolution Rules
//!
//! Tokens are scanned left to right. A token starting with `-` is a flag;
//! everything else is a __bare__ token.
//!
//! - The first bare token that is not consumed by a flag is the action. Every
//!   other free bare token is a positional filter argument.
//! - Boolean flags never consume a value.
//! - String flags consume exactly the next token.
//! - List flags consume the next token, then keep consuming bare tokens until
//!   the next flag. While no action has been seen, an action name that is the
//!   last bare token of such a run is left for the action slot instead.
//!
//! # See Also
//!
//! - [`flag::GLOBAL_FLAGS`]

pub mod flag;
pub mod request;

pub use request::{Action, ActionRequest, RequestDefaults};

use crate::command::flag::{FlagKind, FlagSpec, FlagValue, ACTION, GLOBAL_FLAGS};

use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Raw outcome of tokenizing the argument vector.
///
/// No validation of the action name happens at this stage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Action name as typed, empty if none was given.
    pub action: String,

    /// Positional arguments in encounter order.
    pub arguments: Vec<String>,

    /// Collected flag values keyed by canonical flag name.
    pub flags: BTreeMap<&'static str, FlagValue>,
}

impl ParsedCommand {
    pub fn bool_from(&self, name: &str) -> bool {
        self.flags
            .get(name)
            .and_then(FlagValue::as_bool)
            .unwrap_or(false)
    }

    pub fn string_from(&self, name: &str) -> Option<&str> {
        self.flags.get(name).and_then(FlagValue::as_str)
    }

    pub fn strings_from(&self, name: &str) -> &[String] {
        self.flags
            .get(name)
            .and_then(FlagValue::as_strings)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
enum State<'a> {
    ExpectingTokenOrFlag,
    ExpectingFlagValue(&'a FlagSpec),
    ExpectingMoreValues(&'a FlagSpec),
}

/// Tokenizer for gomu's command line grammar.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    flags: &'a [FlagSpec],
}

impl Default for Resolver<'static> {
    fn default() -> Self {
        Self::new(GLOBAL_FLAGS)
    }
}

impl<'a> Resolver<'a> {
    /// Construct new resolver over a flag table.
    pub fn new(flags: &'a [FlagSpec]) -> Self {
        Self { flags }
    }

    /// Tokenize arguments, program name excluded.
    ///
    /// # Errors
    ///
    /// - Return [`ParseError::UnknownFlag`] for unregistered flag identifiers.
    /// - Return [`ParseError::ValueExpected`] if a value taking flag is
    ///   followed by another flag.
    /// - Return [`ParseError::MissingValue`] if input ends while a flag still
    ///   expects its value.
    /// - Return [`ParseError::ConflictingAction`] if `-action` disagrees with
    ///   the bare action.
    #[instrument(skip(self, args), level = "debug")]
    pub fn parse(&self, args: impl IntoIterator<Item = impl Into<String>>) -> Result<ParsedCommand> {
        let tokens = args.into_iter().map(Into::into).collect::<Vec<String>>();
        let mut state = State::ExpectingTokenOrFlag;
        let mut bare_action: Option<String> = None;
        let mut arguments = Vec::new();
        let mut flags: BTreeMap<&'static str, FlagValue> = BTreeMap::new();

        for (index, token) in tokens.iter().enumerate() {
            if is_flag_token(token) {
                if let State::ExpectingFlagValue(spec) = state {
                    return Err(ParseError::ValueExpected {
                        flag: spec.name.into(),
                        found: token.clone(),
                    });
                }

                let spec = self
                    .lookup(token)
                    .ok_or_else(|| ParseError::UnknownFlag(token.clone()))?;
                state = match spec.kind {
                    FlagKind::Bool => {
                        flags.insert(spec.name, FlagValue::Bool(true));
                        State::ExpectingTokenOrFlag
                    }
                    FlagKind::String | FlagKind::Strings => State::ExpectingFlagValue(spec),
                };
                continue;
            }

            state = match state {
                State::ExpectingFlagValue(spec) => {
                    store_value(&mut flags, spec, token);
                    match spec.kind {
                        FlagKind::Strings => State::ExpectingMoreValues(spec),
                        _ => State::ExpectingTokenOrFlag,
                    }
                }
                State::ExpectingMoreValues(spec) => {
                    let ends_run = tokens.get(index + 1).is_none_or(|next| is_flag_token(next));
                    if bare_action.is_none() && ends_run && Action::is_action_name(token) {
                        debug!("{token:?} closes list of {}, treat as action", spec.name);
                        bare_action = Some(token.clone());
                        State::ExpectingTokenOrFlag
                    } else {
                        store_value(&mut flags, spec, token);
                        State::ExpectingMoreValues(spec)
                    }
                }
                State::ExpectingTokenOrFlag => {
                    if bare_action.is_none() {
                        bare_action = Some(token.clone());
                    } else {
                        arguments.push(token.clone());
                    }
                    State::ExpectingTokenOrFlag
                }
            };
        }

        if let State::ExpectingFlagValue(spec) = state {
            return Err(ParseError::MissingValue(spec.name.into()));
        }

        let explicit = flags
            .get(ACTION)
            .and_then(FlagValue::as_str)
            .map(ToString::to_string);
        let action = match (explicit, bare_action) {
            (None, bare) => bare.unwrap_or_default(),
            (Some(explicit), None) => explicit,
            (Some(explicit), Some(bare)) if bare.eq_ignore_ascii_case(&explicit) => explicit,
            (Some(explicit), Some(bare)) if Action::is_action_name(&bare) => {
                return Err(ParseError::ConflictingAction {
                    flag: explicit,
                    token: bare,
                });
            }
            (Some(explicit), Some(bare)) => {
                arguments.insert(0, bare);
                explicit
            }
        };

        Ok(ParsedCommand {
            action,
            arguments,
            flags,
        })
    }

    /// Find flag specification through any of its identifiers.
    pub fn lookup(&self, token: &str) -> Option<&'a FlagSpec> {
        self.flags.iter().find(|spec| spec.is_identified_by(token))
    }

    /// Render flag listing for usage output.
    pub fn usage(&self) -> String {
        let mut out = String::from(
            "Usage: gomu <flags> <action> <filters>... <flags>\n\nActions:\n",
        );
        for action in Action::SUPPORTED {
            out.push_str(&format!("  {action}\n"));
        }
        out.push_str("\nFlags:\n");
        for spec in self.flags {
            out.push_str(&format!("  {:<32} {}\n", spec.to_string(), spec.help));
        }

        out
    }
}

fn is_flag_token(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-')
}

fn store_value(flags: &mut BTreeMap<&'static str, FlagValue>, spec: &FlagSpec, value: &str) {
    match spec.kind {
        FlagKind::Strings => {
            let entry = flags
                .entry(spec.name)
                .or_insert_with(|| FlagValue::Strings(Vec::new()));
            if let FlagValue::Strings(values) = entry {
                values.push(value.to_string());
            }
        }
        _ => {
            flags.insert(spec.name, FlagValue::String(value.to_string()));
        }
    }
}

/// Command line parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Flag identifier is not registered.
    #[error("unknown flag {0:?}")]
    UnknownFlag(String),

    /// Flag expected a value but got another flag.
    #[error("value expected for flag {flag}, found flag {found:?}")]
    ValueExpected { flag: String, found: String },

    /// Input ended before flag received its value.
    #[error("flag {0} missing value")]
    MissingValue(String),

    /// Explicit `-action` disagrees with bare action.
    #[error("unable to parse action: <{flag}> conflicts with command: <{token}>")]
    ConflictingAction { flag: String, token: String },

    /// Action cannot run without flag.
    #[error("action <{action}> requires flag {flag}")]
    RequiredFlag { action: String, flag: String },

    /// Action is not one gomu supports.
    #[error("unsupported action <{action}>, expected one of [{}]", Action::SUPPORTED.join("|"))]
    UnsupportedAction { action: String },
}

/// Friendly result alias :3
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::flag::{BRANCH, COMMIT, INCLUDE, NAME_ONLY, PULL_REQUEST};
    use simple_test_case::test_case;

    fn parse(input: &str) -> Result<ParsedCommand> {
        Resolver::default().parse(input.split_whitespace().skip(1))
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_command_resolves_to_nothing() -> anyhow::Result<()> {
        let result = parse("gomu")?;
        assert_eq!(result, ParsedCommand::default());
        assert_eq!(result.action, "");
        assert!(result.arguments.is_empty());
        assert!(result.flags.is_empty());

        Ok(())
    }

    #[test]
    fn list_flags_before_bool_flag_and_action() -> anyhow::Result<()> {
        let result = parse(
            "gomu -include test1 -include test2 -name-only sync -b JIRA-Ticket mod-common simply -i hatchify vroomy",
        )?;

        assert_eq!(result.action, "sync");
        assert_eq!(result.arguments, strings(&["mod-common", "simply"]));
        assert_eq!(result.flags.len(), 3);
        assert_eq!(
            result.strings_from(INCLUDE),
            strings(&["test1", "test2", "hatchify", "vroomy"])
        );
        assert_eq!(result.string_from(BRANCH), Some("JIRA-Ticket"));
        assert!(result.bool_from(NAME_ONLY));

        Ok(())
    }

    #[test]
    fn bool_flags_interleaved_with_arguments() -> anyhow::Result<()> {
        let result = parse(
            "gomu -name -include test1 test2 sync -b JIRA-Ticket mod-common -c simply -i hatchify vroomy -pr",
        )?;

        assert_eq!(result.action, "sync");
        assert_eq!(result.arguments, strings(&["mod-common", "simply"]));
        assert_eq!(result.flags.len(), 5);
        assert_eq!(
            result.strings_from(INCLUDE),
            strings(&["test1", "test2", "hatchify", "vroomy"])
        );
        assert_eq!(result.string_from(BRANCH), Some("JIRA-Ticket"));
        assert!(result.bool_from(NAME_ONLY));
        assert!(result.bool_from(PULL_REQUEST));
        assert!(result.bool_from(COMMIT));

        Ok(())
    }

    #[test]
    fn bool_flag_between_list_values_and_action() -> anyhow::Result<()> {
        let result = parse(
            "gomu -name -include test1 test2 -pr sync -b JIRA-Ticket mod-common -c simply -i hatchify vroomy",
        )?;

        assert_eq!(result.action, "sync");
        assert_eq!(result.arguments, strings(&["mod-common", "simply"]));
        assert_eq!(result.flags.len(), 5);
        assert_eq!(
            result.strings_from(INCLUDE),
            strings(&["test1", "test2", "hatchify", "vroomy"])
        );

        Ok(())
    }

    #[test]
    fn action_closing_list_run_wins_over_earlier_action_name() -> anyhow::Result<()> {
        let result = parse(
            "gomu -name -include test1 test2 sync list -b JIRA-Ticket mod-common -c simply -i hatchify vroomy -pr",
        )?;

        assert_eq!(result.action, "list");
        assert_eq!(result.arguments, strings(&["mod-common", "simply"]));
        assert_eq!(result.flags.len(), 5);
        assert_eq!(
            result.strings_from(INCLUDE),
            strings(&["test1", "test2", "sync", "hatchify", "vroomy"])
        );

        Ok(())
    }

    #[test_case("gomu sync -i a -b dev -c"; "action first")]
    #[test_case("gomu -i a sync -b dev -c"; "action after list")]
    #[test_case("gomu -i a -b dev sync -c"; "action between flags")]
    #[test_case("gomu -i a -b dev -c sync"; "action last")]
    #[test]
    fn action_position_does_not_matter(input: &str) -> anyhow::Result<()> {
        let result = parse(input)?;
        assert_eq!(result.action, "sync");
        assert_eq!(result.strings_from(INCLUDE), strings(&["a"]));
        assert_eq!(result.string_from(BRANCH), Some("dev"));
        assert!(result.bool_from(COMMIT));
        assert!(result.arguments.is_empty());

        Ok(())
    }

    #[test]
    fn bool_flag_never_consumes_value() -> anyhow::Result<()> {
        let result = parse("gomu -c list -pr mod-common -name")?;
        assert_eq!(result.action, "list");
        assert_eq!(result.arguments, strings(&["mod-common"]));
        assert!(result.bool_from(COMMIT));
        assert!(result.bool_from(PULL_REQUEST));
        assert!(result.bool_from(NAME_ONLY));

        Ok(())
    }

    #[test]
    fn second_action_name_becomes_argument() -> anyhow::Result<()> {
        let result = parse("gomu sync list")?;
        assert_eq!(result.action, "sync");
        assert_eq!(result.arguments, strings(&["list"]));

        Ok(())
    }

    #[test]
    fn first_list_value_is_always_consumed() -> anyhow::Result<()> {
        let result = parse("gomu -i sync")?;
        assert_eq!(result.action, "");
        assert_eq!(result.strings_from(INCLUDE), strings(&["sync"]));

        Ok(())
    }

    #[test]
    fn repeated_string_flag_keeps_last_value() -> anyhow::Result<()> {
        let result = parse("gomu pull -b one -branch two")?;
        assert_eq!(result.string_from(BRANCH), Some("two"));

        Ok(())
    }

    #[test_case("gomu sync -wat", ParseError::UnknownFlag("-wat".into()); "unknown flag")]
    #[test_case(
        "gomu sync -b -c",
        ParseError::ValueExpected { flag: "-branch".into(), found: "-c".into() };
        "flag as value"
    )]
    #[test_case("gomu sync -m", ParseError::MissingValue("-message".into()); "missing value")]
    #[test_case(
        "gomu -action sync list",
        ParseError::ConflictingAction { flag: "sync".into(), token: "list".into() };
        "conflicting action"
    )]
    #[test]
    fn parse_failures(input: &str, expect: ParseError) {
        assert_eq!(parse(input), Err(expect));
    }

    #[test]
    fn explicit_action_absorbs_matching_bare_action() -> anyhow::Result<()> {
        let result = parse("gomu -action sync sync mod-common")?;
        assert_eq!(result.action, "sync");
        assert_eq!(result.arguments, strings(&["mod-common"]));

        let result = parse("gomu mod-common -action pull simply")?;
        assert_eq!(result.action, "pull");
        assert_eq!(result.arguments, strings(&["mod-common", "simply"]));

        Ok(())
    }

    #[test]
    fn usage_lists_every_action_and_flag() {
        let usage = Resolver::default().usage();
        for action in Action::SUPPORTED {
            assert!(usage.contains(action), "usage misses {action}");
        }
        for spec in GLOBAL_FLAGS {
            assert!(usage.contains(spec.help), "usage misses {}", spec.name);
        }
    }
}
