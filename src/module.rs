// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Go module manifests.
//!
//! Each repository gomu manages carries a `go.mod` file at its top-level. The
//! manifest names the module, and lists its requirements and replace
//! directives. Gomu reads requirements to order repositories, and rewrites
//! requirement versions and replace directives in place, leaving every other
//! line of the file untouched.
//!
//! # See Also
//!
//! - [Go modules reference](https://go.dev/ref/mod#go-mod-file)
//! - [`sort`]

pub mod sort;

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Name of the manifest file inside a repository.
pub const MANIFEST_FILE: &str = "go.mod";

/// Requirement on another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub path: String,
    pub version: String,
    line: usize,
}

/// Replace directive for a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub path: String,
    pub target: String,
    line: usize,
    in_block: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Require,
    Replace,
    Other,
}

/// Parsed `go.mod` file that remembers its original layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModFile {
    lines: Vec<String>,
    module: String,
    requires: Vec<Requirement>,
    replaces: Vec<Replacement>,
}

impl ModFile {
    /// Read manifest at top-level of repository.
    ///
    /// # Errors
    ///
    /// - Return [`ModuleError::Read`] if manifest cannot be read.
    /// - Return [`ModuleError::MissingModule`] if manifest names no module.
    pub fn load(repo: impl AsRef<Path>) -> Result<Self> {
        let path = repo.as_ref().join(MANIFEST_FILE);
        let content = read_to_string(&path).map_err(|err| ModuleError::Read {
            source: err,
            path: path.clone(),
        })?;

        content.parse()
    }

    /// Write manifest back to top-level of repository.
    ///
    /// # Errors
    ///
    /// - Return [`ModuleError::Write`] if manifest cannot be written.
    pub fn store(&self, repo: impl AsRef<Path>) -> Result<()> {
        let path = repo.as_ref().join(MANIFEST_FILE);
        write(&path, self.to_string()).map_err(|err| ModuleError::Write { source: err, path })
    }

    /// Module path declared by manifest.
    pub fn module(&self) -> &str {
        self.module.as_str()
    }

    pub fn requires(&self) -> &[Requirement] {
        self.requires.as_slice()
    }

    pub fn replaces(&self) -> &[Replacement] {
        self.replaces.as_slice()
    }

    /// Check if manifest requires module path.
    pub fn requires_module(&self, path: &str) -> bool {
        self.requires.iter().any(|req| req.path == path)
    }

    /// Pin required modules to new versions.
    ///
    /// Only modules already required are touched. Returns whether any line
    /// changed.
    pub fn set_versions(&mut self, versions: &BTreeMap<String, String>) -> bool {
        let mut changed = false;
        for req in self.requires.iter_mut() {
            let Some(version) = versions.get(&req.path) else {
                continue;
            };

            if &req.version == version {
                continue;
            }

            let line = &mut self.lines[req.line];
            *line = line.replacen(
                &format!("{} {}", req.path, req.version),
                &format!("{} {}", req.path, version),
                1,
            );
            req.version = version.clone();
            changed = true;
        }

        changed
    }

    /// Point required module at a local directory through a replace
    /// directive.
    ///
    /// Existing directives for the module are rewritten, new ones are
    /// appended. Returns whether any line changed.
    pub fn set_replace(&mut self, path: &str, target: &str) -> bool {
        if let Some(replace) = self.replaces.iter_mut().find(|replace| replace.path == path) {
            if replace.target == target {
                return false;
            }

            self.lines[replace.line] = match replace.in_block {
                true => format!("\t{path} => {target}"),
                false => format!("replace {path} => {target}"),
            };
            replace.target = target.to_string();
            return true;
        }

        // INVARIANT: Keep a blank line between existing content and appended directives.
        while self.lines.last().is_some_and(|line| line.trim().is_empty()) {
            self.lines.pop();
        }
        if self.replaces.is_empty() {
            self.lines.push(String::new());
        }

        self.lines.push(format!("replace {path} => {target}"));
        self.replaces.push(Replacement {
            path: path.to_string(),
            target: target.to_string(),
            line: self.lines.len() - 1,
            in_block: false,
        });

        true
    }
}

impl FromStr for ModFile {
    type Err = ModuleError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let lines = data.lines().map(str::to_owned).collect::<Vec<_>>();
        let mut module = None;
        let mut requires = Vec::new();
        let mut replaces = Vec::new();
        let mut block = Block::None;

        for (index, line) in lines.iter().enumerate() {
            // INVARIANT: Comments never carry directive content.
            let content = line.split("//").next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }

            if block != Block::None {
                if content == ")" {
                    block = Block::None;
                    continue;
                }

                match block {
                    Block::Require => requires.extend(parse_requirement(content, index)),
                    Block::Replace => replaces.extend(parse_replacement(content, index, true)),
                    _ => {}
                }
                continue;
            }

            let (keyword, rest) = content.split_once(char::is_whitespace).unwrap_or((content, ""));
            let rest = rest.trim();
            match (keyword, rest) {
                ("module", name) => module = Some(name.trim_matches('"').to_string()),
                ("require", "(") => block = Block::Require,
                ("require", single) => requires.extend(parse_requirement(single, index)),
                ("replace", "(") => block = Block::Replace,
                ("replace", single) => replaces.extend(parse_replacement(single, index, false)),
                (_, "(") => block = Block::Other,
                _ => {}
            }
        }

        let module = module.filter(|name| !name.is_empty()).ok_or(ModuleError::MissingModule)?;

        Ok(Self {
            lines,
            module,
            requires,
            replaces,
        })
    }
}

fn parse_requirement(content: &str, line: usize) -> Option<Requirement> {
    let mut words = content.split_whitespace();
    let path = words.next()?.trim_matches('"');
    let version = words.next()?;

    Some(Requirement {
        path: path.to_string(),
        version: version.to_string(),
        line,
    })
}

fn parse_replacement(content: &str, line: usize, in_block: bool) -> Option<Replacement> {
    let (left, right) = content.split_once("=>")?;
    let path = left.split_whitespace().next()?.trim_matches('"');
    let target = right.trim();

    Some(Replacement {
        path: path.to_string(),
        target: target.to_string(),
        line,
        in_block,
    })
}

impl Display for ModFile {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for line in &self.lines {
            writeln!(fmt, "{line}")?;
        }

        Ok(())
    }
}

/// Module manifest error types.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// Manifest cannot be read.
    #[error("failed to read manifest at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Manifest cannot be written.
    #[error("failed to write manifest at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Manifest lacks module directive.
    #[error("manifest does not declare a module path")]
    MissingModule,

    /// Requirements between repositories form a cycle.
    #[error("dependency cycle between {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Friendly result alias :3
pub type Result<T, E = ModuleError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = indoc! {r#"
        module github.com/hatchify/simply

        go 1.21

        require github.com/hatchify/parg v0.2.0

        require (
        	github.com/hatchify/mod-common v0.1.4
        	github.com/vroomy/plugins v1.0.0 // indirect
        )

        exclude (
        	github.com/hatchify/broken v0.0.1
        )
    "#};

    #[test]
    fn parse_manifest() -> anyhow::Result<()> {
        let result: ModFile = MANIFEST.parse()?;

        assert_eq!(result.module(), "github.com/hatchify/simply");
        let requires = result
            .requires()
            .iter()
            .map(|req| (req.path.as_str(), req.version.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            requires,
            vec![
                ("github.com/hatchify/parg", "v0.2.0"),
                ("github.com/hatchify/mod-common", "v0.1.4"),
                ("github.com/vroomy/plugins", "v1.0.0"),
            ]
        );
        assert!(result.replaces().is_empty());
        assert_eq!(result.to_string(), MANIFEST);

        Ok(())
    }

    #[test]
    fn missing_module_is_rejected() {
        let result = "go 1.21\n".parse::<ModFile>();
        assert!(matches!(result, Err(ModuleError::MissingModule)));
    }

    #[test]
    fn set_versions_rewrites_only_changed_requirements() -> anyhow::Result<()> {
        let mut manifest: ModFile = MANIFEST.parse()?;
        let versions = BTreeMap::from([
            ("github.com/hatchify/parg".to_string(), "v0.2.1".to_string()),
            ("github.com/hatchify/mod-common".to_string(), "v0.1.4".to_string()),
            ("github.com/hatchify/unrelated".to_string(), "v9.9.9".to_string()),
            ("github.com/vroomy/plugins".to_string(), "v1.1.0".to_string()),
        ]);

        assert!(manifest.set_versions(&versions));
        let expect = indoc! {r#"
            module github.com/hatchify/simply

            go 1.21

            require github.com/hatchify/parg v0.2.1

            require (
            	github.com/hatchify/mod-common v0.1.4
            	github.com/vroomy/plugins v1.1.0 // indirect
            )

            exclude (
            	github.com/hatchify/broken v0.0.1
            )
        "#};
        assert_eq!(manifest.to_string(), expect);

        assert!(!manifest.set_versions(&versions));

        Ok(())
    }

    #[test]
    fn set_replace_appends_then_rewrites() -> anyhow::Result<()> {
        let mut manifest: ModFile = indoc! {r#"
            module github.com/hatchify/simply

            require github.com/hatchify/parg v0.2.0

        "#}
        .parse()?;

        assert!(manifest.set_replace("github.com/hatchify/parg", "../parg"));
        assert!(!manifest.set_replace("github.com/hatchify/parg", "../parg"));
        let expect = indoc! {r#"
            module github.com/hatchify/simply

            require github.com/hatchify/parg v0.2.0

            replace github.com/hatchify/parg => ../parg
        "#};
        assert_eq!(manifest.to_string(), expect);

        assert!(manifest.set_replace("github.com/hatchify/parg", "../../parg"));
        assert_eq!(manifest.replaces()[0].target, "../../parg");

        Ok(())
    }

    #[test]
    fn set_replace_inside_block() -> anyhow::Result<()> {
        let mut manifest: ModFile = indoc! {r#"
            module github.com/hatchify/simply

            replace (
            	github.com/hatchify/parg => github.com/fork/parg v0.3.0
            )
        "#}
        .parse()?;

        assert!(manifest.set_replace("github.com/hatchify/parg", "../parg"));
        let expect = indoc! {r#"
            module github.com/hatchify/simply

            replace (
            	github.com/hatchify/parg => ../parg
            )
        "#};
        assert_eq!(manifest.to_string(), expect);

        Ok(())
    }
}
