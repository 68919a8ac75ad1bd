// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Run command - resolve and execute a job

use std::path::Path;

use crate::builtins::BuiltinRegistry;
use crate::cli::{args, list, Cli};
use crate::config::{discover, ConfigDocument, FsLoader};
use crate::errors::CrunResult;
use crate::executors::ShellExecutor;
use crate::pipeline::{PipelineExecutor, RunContext};

/// Run the job named on the command line
///
/// Without a job name the document's `default_job` runs; without that the
/// available jobs are listed.
pub async fn run(cli: Cli) -> CrunResult<()> {
    let cwd = std::env::current_dir()?;
    let path = discover(&cwd, &cli.config)?;
    let document = ConfigDocument::load(&path, &FsLoader)?;
    let builtins = BuiltinRegistry::default();

    let Some(job) = cli.job.as_deref().or(document.default_job()) else {
        list::print(&document, &builtins);
        return Ok(());
    };

    let trailing = args::parse_trailing(&cli.args)?;
    let working_dir = document
        .directory()
        .map(Path::to_path_buf)
        .unwrap_or(cwd);
    tracing::debug!("Working directory {}", working_dir.display());

    let context = RunContext::from_process(working_dir, trailing.positional);
    let runner = ShellExecutor::new(document.shell());
    let executor = PipelineExecutor::new(&document, &builtins, &runner, &context);

    executor.run(job, &trailing.overrides).await?.into_result()
}
