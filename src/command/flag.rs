// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Flag registration.
//!
//! Every flag gomu understands is declared once in [`GLOBAL_FLAGS`]. A flag
//! has one canonical name and any number of __identifiers__, i.e., aliases
//! the user may type on the command line. The resolver only ever consults
//! this table, so adding a flag never touches the tokenizer.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Kind of value a flag carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Switch that never consumes a value token.
    Bool,

    /// Single value taken from the next token.
    String,

    /// Ordered list of values accumulated across occurrences.
    Strings,
}

/// Declaration of a single flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    /// Canonical name every identifier resolves to.
    pub name: &'static str,

    /// All accepted spellings, canonical name included.
    pub identifiers: &'static [&'static str],

    /// Value kind.
    pub kind: FlagKind,

    /// One line usage summary.
    pub help: &'static str,
}

impl FlagSpec {
    /// Check if token is one of this flag's identifiers.
    pub fn is_identified_by(&self, token: &str) -> bool {
        self.identifiers.contains(&token)
    }
}

impl Display for FlagSpec {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let value = match self.kind {
            FlagKind::Bool => "",
            FlagKind::String => " <value>",
            FlagKind::Strings => " <value>...",
        };
        write!(fmt, "{}{value}", self.identifiers.join(", "))
    }
}

pub const ACTION: &str = "-action";
pub const INCLUDE: &str = "-include";
pub const FILTER: &str = "-filter";
pub const BRANCH: &str = "-branch";
pub const MESSAGE: &str = "-message";
pub const COMMIT: &str = "-commit";
pub const PULL_REQUEST: &str = "-pull-request";
pub const TAG: &str = "-tag";
pub const SET_VERSION: &str = "-set-version";
pub const NAME_ONLY: &str = "-name-only";
pub const DIRECT_IMPORT: &str = "-direct-import";
pub const YES: &str = "-yes";
pub const SOURCE_PATH: &str = "-source-path";

/// Flags accepted anywhere on the command line.
pub const GLOBAL_FLAGS: &[FlagSpec] = &[
    FlagSpec {
        name: ACTION,
        identifiers: &["-action"],
        kind: FlagKind::String,
        help: "Name the action explicitly instead of as a bare word.",
    },
    FlagSpec {
        name: INCLUDE,
        identifiers: &["-i", "-in", "-include"],
        kind: FlagKind::Strings,
        help: "Aggregate repositories found in one or more directories.",
    },
    FlagSpec {
        name: FILTER,
        identifiers: &["-f", "-filter", "-dep"],
        kind: FlagKind::Strings,
        help: "Only process repositories depending on one of these.",
    },
    FlagSpec {
        name: BRANCH,
        identifiers: &["-b", "-branch"],
        kind: FlagKind::String,
        help: "Checkout, or create, this branch before working.",
    },
    FlagSpec {
        name: MESSAGE,
        identifiers: &["-m", "-msg", "-message"],
        kind: FlagKind::String,
        help: "Commit message used by -commit and manifest updates.",
    },
    FlagSpec {
        name: COMMIT,
        identifiers: &["-c", "-commit"],
        kind: FlagKind::Bool,
        help: "Commit local changes if present.",
    },
    FlagSpec {
        name: PULL_REQUEST,
        identifiers: &["-pr", "-pull-request"],
        kind: FlagKind::Bool,
        help: "Open a pull request when deploying a feature branch.",
    },
    FlagSpec {
        name: TAG,
        identifiers: &["-t", "-tag"],
        kind: FlagKind::Bool,
        help: "Increment tag when new commits exist since the last tag.",
    },
    FlagSpec {
        name: SET_VERSION,
        identifiers: &["-set", "-set-version"],
        kind: FlagKind::String,
        help: "Force this tag version for every repository in the chain.",
    },
    FlagSpec {
        name: NAME_ONLY,
        identifiers: &["-name", "-name-only"],
        kind: FlagKind::Bool,
        help: "Only print paths of changed repositories.",
    },
    FlagSpec {
        name: DIRECT_IMPORT,
        identifiers: &["-direct", "-direct-import"],
        kind: FlagKind::Bool,
        help: "Only match filters against direct requirements.",
    },
    FlagSpec {
        name: YES,
        identifiers: &["-y", "-yes"],
        kind: FlagKind::Bool,
        help: "Do not ask for confirmation before mutating repositories.",
    },
    FlagSpec {
        name: SOURCE_PATH,
        identifiers: &["-s", "-source", "-source-path"],
        kind: FlagKind::String,
        help: "Template file the workflow action copies into each repository.",
    },
];

/// Value collected for a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    String(String),
    Strings(Vec<String>),
}

impl FlagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::Strings(values) => Some(values.as_slice()),
            _ => None,
        }
    }
}
