// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::RepoFixture;

use anyhow::Result;
use gomu::git::{Git, GitOutcome};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::fs::read_to_string;

#[sealed_test]
fn stash_round_trip_restores_changes() -> Result<()> {
    let mut fixture = RepoFixture::with_module("parg", "module github.com/hatchify/parg\n")?;
    fixture.write_file("go.mod", "module github.com/hatchify/parg\n\ngo 1.21\n")?;
    let git: Git = Git::default();

    assert!(git.has_local_changes(fixture.path())?);
    assert!(git.stash(fixture.path())?);
    assert!(!git.has_local_changes(fixture.path())?);
    assert_eq!(fixture.stash_count()?, 1);

    assert!(git.stash_pop(fixture.path())?);
    assert_eq!(
        read_to_string("parg/go.mod")?,
        "module github.com/hatchify/parg\n\ngo 1.21\n"
    );
    assert!(!git.stash_pop(fixture.path())?);
    assert_eq!(fixture.stash_count()?, 0);

    Ok(())
}

#[sealed_test]
fn stash_on_clean_tree_does_nothing() -> Result<()> {
    let mut fixture = RepoFixture::with_module("parg", "module github.com/hatchify/parg\n")?;
    let git: Git = Git::default();

    assert!(!git.stash(fixture.path())?);
    assert_eq!(fixture.stash_count()?, 0);

    Ok(())
}

#[sealed_test]
fn stash_pop_leaves_foreign_stash_alone() -> Result<()> {
    let mut fixture = RepoFixture::with_module("parg", "module github.com/hatchify/parg\n")?;
    fixture.write_file("go.mod", "module github.com/hatchify/parg\n\ngo 1.21\n")?;
    let git: Git = Git::default();
    git.run_command(fixture.path(), "git", ["stash", "push", "-m", "wip"])?;

    assert!(!git.stash_pop(fixture.path())?);
    assert_eq!(fixture.stash_count()?, 1);

    Ok(())
}

#[sealed_test]
fn checkout_or_create_branch() -> Result<()> {
    let fixture = RepoFixture::with_module("parg", "module github.com/hatchify/parg\n")?;
    let git: Git = Git::default();

    assert_eq!(git.current_branch(fixture.path())?, "master");
    assert_eq!(
        git.checkout_or_create_branch(fixture.path(), "JIRA-Ticket")?,
        GitOutcome::Changed
    );
    assert_eq!(git.current_branch(fixture.path())?, "JIRA-Ticket");
    assert_eq!(
        git.checkout_or_create_branch(fixture.path(), "JIRA-Ticket")?,
        GitOutcome::Unchanged
    );
    assert_eq!(
        git.checkout_branch(fixture.path(), "master")?,
        GitOutcome::Changed
    );

    Ok(())
}

#[sealed_test]
fn tags_and_commits_since() -> Result<()> {
    let fixture = RepoFixture::with_module("parg", "module github.com/hatchify/parg\n")?;
    let git: Git = Git::default();

    assert_eq!(git.latest_tag(fixture.path())?, None);
    fixture.tag("v0.1.0")?;
    assert_eq!(git.latest_tag(fixture.path())?, Some("v0.1.0".into()));
    assert_eq!(git.commits_since(fixture.path(), "v0.1.0")?, 0);

    fixture.commit_file("parse.go", "package parg\n")?;
    fixture.commit_file("flag.go", "package parg\n")?;
    assert_eq!(git.commits_since(fixture.path(), "v0.1.0")?, 2);

    Ok(())
}

#[sealed_test]
fn commit_all_only_commits_when_dirty() -> Result<()> {
    let fixture = RepoFixture::with_module("parg", "module github.com/hatchify/parg\n")?;
    let git: Git = Git::default();

    assert!(!git.commit_all(fixture.path(), "Nothing to see")?);
    fixture.write_file("parse.go", "package parg\n")?;
    assert!(git.commit_all(fixture.path(), "Add parser")?);
    assert!(!git.has_local_changes(fixture.path())?);

    Ok(())
}
