// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use gomu::{
    command::{Action, ActionRequest, Resolver},
    config::Settings,
    git::Git,
    orchestrate::{InquireConfirm, Orchestrator, RunOutcome},
    path::default_settings_path,
    repo::enumerate,
    report::{render, Verbosity},
    toolchain::GoToolchain,
};

use anyhow::Result;
use std::{env, io::stderr, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    match run() {
        Ok(code) => exit(code),
        Err(error) => {
            error!("{error:?}");
            exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let settings = Settings::load(default_settings_path()?)?;
    let resolver = Resolver::default();
    let request = match resolver
        .parse(env::args().skip(1))
        .and_then(|parsed| ActionRequest::from_parsed(&parsed, &settings.request_defaults()))
    {
        Ok(request) => request,
        Err(err) => {
            println!("Error parsing arguments: {err}\n\n{}", resolver.usage());
            return Ok(1);
        }
    };

    match request.action {
        Action::Help => {
            print!("{}", resolver.usage());
            return Ok(0);
        }
        Action::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(0);
        }
        _ => {}
    }

    let verbosity = match request.name_only {
        true => Verbosity::NameOnly,
        false => Verbosity::Normal,
    };

    let repos = enumerate(&request.target_directories);
    let git: Git = Git::default();
    let toolchain = GoToolchain::new(git.clone(), settings.clone());
    let orchestrator = Orchestrator::new(git, toolchain, InquireConfirm, &settings, verbosity);

    match orchestrator.run(&request, &repos)? {
        RunOutcome::Completed(report) => {
            print!("{}", render(request.action, &request.branch, &report, verbosity));
        }
        RunOutcome::Declined => info!("{} declined, nothing changed", request.action),
    }

    Ok(0)
}
