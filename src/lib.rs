// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Batch operations over a chain of dependent Go modules.
//!
//! Gomu applies one action (list, pull, sync, deploy, install, reset,
//! replace-local, test) across every repository found in a set of target
//! directories. Repositories are visited in dependency order, so a module
//! is always handled before the modules requiring it, and versions resolved
//! along the way are pinned into the manifests that come after.
//!
//! # Working Tree Safety
//!
//! Uncommitted changes in every repository are stashed before anything else
//! happens, and replayed once the run is over, even when individual
//! repositories fail along the way. Gomu only ever pops stashes it created.
//!
//! # See Also
//!
//! - [`command`]
//! - [`orchestrate`]

pub mod command;
pub mod config;
pub mod git;
pub mod module;
pub mod orchestrate;
pub mod path;
pub mod repo;
pub mod report;
pub mod toolchain;
