// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dependency ordering of repositories.
//!
//! Repositories are ordered so that every repository comes after all the
//! repositories it requires. Ties are broken by name, then path, so the same
//! set of repositories always yields the same order.
//!
//! # Filtering
//!
//! A filter names a module either by repository name, full module path, or
//! trailing module path segment. With filters in place, only repositories
//! named by a filter, or depending on one, are kept. Dependence is
//! transitive unless direct mode is asked for.

use crate::{
    module::{ModFile, ModuleError, Result},
    repo::RepositoryDescriptor,
};

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument, warn};

/// Repository together with what its manifest declared at sort time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedRepository {
    pub repo: RepositoryDescriptor,

    /// Module path declared by manifest.
    pub module: String,

    /// Module paths of every requirement.
    pub requires: Vec<String>,
}

impl SortedRepository {
    pub fn new(
        repo: RepositoryDescriptor,
        module: impl Into<String>,
        requires: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            repo,
            module: module.into(),
            requires: requires.into_iter().map(Into::into).collect(),
        }
    }

    fn matches(&self, filter: &str) -> bool {
        self.repo.name == filter || module_matches(&self.module, filter)
    }
}

fn module_matches(module: &str, filter: &str) -> bool {
    module == filter || module.ends_with(&format!("/{filter}"))
}

/// Load manifests of repositories and order them.
///
/// Repositories without a readable manifest are skipped.
///
/// # Errors
///
/// - Return [`ModuleError::Cycle`] if requirements form a cycle.
#[instrument(skip(repos, filters), level = "debug")]
pub fn sort_repositories(
    repos: &[RepositoryDescriptor],
    filters: &[String],
    direct: bool,
) -> Result<Vec<SortedRepository>> {
    let mut nodes = Vec::new();
    for repo in repos {
        match ModFile::load(repo.as_path()) {
            Ok(manifest) => nodes.push(SortedRepository::new(
                repo.clone(),
                manifest.module(),
                manifest.requires().iter().map(|req| req.path.clone()),
            )),
            Err(ModuleError::Read { .. }) => debug!("skip {repo}, no manifest"),
            Err(err) => warn!("skip {repo}: {err}"),
        }
    }

    order(nodes, filters, direct)
}

/// Order repositories by requirement, then apply filters.
///
/// # Errors
///
/// - Return [`ModuleError::Cycle`] if requirements form a cycle.
pub fn order(
    nodes: Vec<SortedRepository>,
    filters: &[String],
    direct: bool,
) -> Result<Vec<SortedRepository>> {
    let by_module = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.module.clone(), index))
        .collect::<HashMap<_, _>>();

    // INVARIANT: Edges only exist between repositories in the set.
    let deps = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            node.requires
                .iter()
                .filter_map(|path| by_module.get(path).copied())
                .filter(|dep| *dep != index)
                .collect::<BTreeSet<usize>>()
        })
        .collect::<Vec<_>>();

    let mut pending = deps.iter().map(BTreeSet::len).collect::<Vec<_>>();
    let key = |index: usize| (nodes[index].repo.name.clone(), nodes[index].repo.path.clone(), index);
    let mut ready = (0..nodes.len())
        .filter(|index| pending[*index] == 0)
        .map(key)
        .collect::<BTreeSet<_>>();

    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(entry) = ready.pop_first() {
        let index = entry.2;
        sorted.push(index);
        for (dependent, dep_set) in deps.iter().enumerate() {
            if dep_set.contains(&index) {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(key(dependent));
                }
            }
        }
    }

    if sorted.len() < nodes.len() {
        let mut members = (0..nodes.len())
            .filter(|index| pending[*index] > 0)
            .map(|index| nodes[index].repo.name.clone())
            .collect::<Vec<_>>();
        members.sort();
        return Err(ModuleError::Cycle(members));
    }

    let mut kept = vec![filters.is_empty(); nodes.len()];
    if !filters.is_empty() {
        for &index in &sorted {
            let node = &nodes[index];
            kept[index] = filters.iter().any(|filter| {
                node.matches(filter)
                    || node.requires.iter().any(|path| module_matches(path, filter))
            }) || (!direct && deps[index].iter().any(|dep| kept[*dep]));
        }
    }

    let mut slots = nodes.into_iter().map(Some).collect::<Vec<_>>();
    Ok(sorted
        .into_iter()
        .filter(|index| kept[*index])
        .filter_map(|index| slots[index].take())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealed_test::prelude::*;
    use simple_test_case::test_case;
    use std::fs::{create_dir_all, write};

    fn node(name: &str, requires: &[&str]) -> SortedRepository {
        SortedRepository::new(
            RepositoryDescriptor::new(format!("hatchify/{name}")),
            format!("github.com/hatchify/{name}"),
            requires
                .iter()
                .map(|req| format!("github.com/hatchify/{req}")),
        )
    }

    fn chain() -> Vec<SortedRepository> {
        vec![
            node("vroomy", &["simply", "parg"]),
            node("simply", &["mod-common"]),
            node("parg", &[]),
            node("mod-common", &["errors"]),
            node("cors-plugin", &["vroomy"]),
        ]
    }

    fn names(sorted: &[SortedRepository]) -> Vec<&str> {
        sorted.iter().map(|node| node.repo.name.as_str()).collect()
    }

    #[test]
    fn dependencies_come_first() -> anyhow::Result<()> {
        let result = order(chain(), &[], false)?;
        assert_eq!(
            names(&result),
            vec!["mod-common", "parg", "simply", "vroomy", "cors-plugin"]
        );

        Ok(())
    }

    #[test_case(&["mod-common"], false, &["mod-common", "simply", "vroomy", "cors-plugin"]; "transitive")]
    #[test_case(&["mod-common"], true, &["mod-common", "simply"]; "direct")]
    #[test_case(&["github.com/hatchify/parg"], true, &["parg", "vroomy"]; "full module path")]
    #[test_case(&["errors"], true, &["mod-common"]; "requirement outside set")]
    #[test_case(&["nothing"], false, &[]; "no match")]
    #[test]
    fn filters_keep_dependents(filters: &[&str], direct: bool, expect: &[&str]) -> anyhow::Result<()> {
        let filters = filters.iter().map(ToString::to_string).collect::<Vec<_>>();
        let result = order(chain(), &filters, direct)?;
        assert_eq!(names(&result), expect);

        Ok(())
    }

    #[test]
    fn cycles_are_rejected() {
        let nodes = vec![
            node("parg", &["simply"]),
            node("simply", &["parg"]),
            node("mod-common", &[]),
        ];

        let result = order(nodes, &[], false);
        assert!(matches!(
            result,
            Err(ModuleError::Cycle(members)) if members == vec!["parg", "simply"]
        ));
    }

    #[sealed_test]
    fn sort_reads_manifests_from_disk() -> anyhow::Result<()> {
        create_dir_all("hatchify/parg")?;
        create_dir_all("hatchify/simply")?;
        create_dir_all("hatchify/docs")?;
        write("hatchify/parg/go.mod", "module github.com/hatchify/parg\n")?;
        write(
            "hatchify/simply/go.mod",
            "module github.com/hatchify/simply\n\nrequire github.com/hatchify/parg v0.1.0\n",
        )?;

        let repos = vec![
            RepositoryDescriptor::new("hatchify/docs"),
            RepositoryDescriptor::new("hatchify/simply"),
            RepositoryDescriptor::new("hatchify/parg"),
        ];
        let result = sort_repositories(&repos, &[], false)?;
        assert_eq!(names(&result), vec!["parg", "simply"]);
        assert_eq!(result[1].requires, vec!["github.com/hatchify/parg"]);

        Ok(())
    }
}
