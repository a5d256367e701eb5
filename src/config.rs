// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Gomu runs fine without any configuration. An optional settings file can
//! change the defaults the command line falls back to, and the external
//! commands used to build, install, and test each repository. File I/O
//! beyond [`Settings::load`] is left to the caller.

use crate::command::RequestDefaults;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Gomu settings file layout.
///
/// # General Layout
///
/// Top-level keys adjust request defaults and repository classification. The
/// `[commands]` table lists the programs used for build related actions, each
/// given as program followed by its arguments.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Branch used when `-branch` is not given.
    pub default_branch: String,

    /// Repositories whose name ends in this never receive a tag.
    pub plugin_suffix: String,

    /// Commit message used when `-message` is not given.
    pub commit_message: String,

    /// Directories searched when `-include` is not given.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Manifest files reverted by the reset action, relative to repository.
    pub manifest_files: Vec<String>,

    /// External commands for build related actions.
    pub commands: CommandSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = RequestDefaults::default();
        Self {
            default_branch: defaults.branch,
            plugin_suffix: "-plugin".into(),
            commit_message: defaults.commit_message,
            include: Vec::new(),
            manifest_files: vec!["go.mod".into(), "go.sum".into()],
            commands: CommandSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from path, falling back to defaults if path is missing.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file content is invalid.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match read_to_string(path.as_ref()) {
            Ok(content) => {
                debug!("load settings from {:?}", path.as_ref().display());
                content.parse()
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no settings at {:?}, use defaults", path.as_ref().display());
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Read {
                source: err,
                path: path.as_ref().to_path_buf(),
            }),
        }
    }

    /// Defaults handed to request validation.
    pub fn request_defaults(&self) -> RequestDefaults {
        let mut defaults = RequestDefaults {
            branch: self.default_branch.clone(),
            commit_message: self.commit_message.clone(),
            ..RequestDefaults::default()
        };

        if !self.include.is_empty() {
            defaults.target_directories = self.include.iter().map(PathBuf::from).collect();
        }

        defaults
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on include directories.
        settings.include = settings
            .include
            .iter()
            .map(|dir| shellexpand::full(dir).map(|dir| dir.into_owned()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::ShellExpansion)?;

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// External command listing.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandSettings {
    pub build: Vec<String>,
    pub clean: Vec<String>,
    pub install: Vec<String>,
    pub test: Vec<String>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        let words = |words: &[&str]| words.iter().map(ToString::to_string).collect::<Vec<_>>();
        Self {
            build: words(&["go", "build", "./..."]),
            clean: words(&["go", "clean"]),
            install: words(&["go", "install", "./..."]),
            test: words(&["go", "test", "./..."]),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Settings file exists but cannot be read.
    #[error("failed to read settings at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
