// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Shell executor
//!
//! Runs commands through `<shell> -c`, so pipes, `&&` and `$(...)` in job
//! commands behave as they would in a terminal.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use super::{ExecutionResult, Invocation, ProcessRunner};
use crate::config::DEFAULT_SHELL;
use crate::errors::CrunError;

/// Shell executor
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    /// Create a shell executor using `shell`
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

#[async_trait]
impl ProcessRunner for ShellExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, CrunError> {
        let start = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(&invocation.command);
        cmd.current_dir(&invocation.working_dir);
        cmd.env_clear().envs(&invocation.env);
        cmd.stdin(Stdio::inherit());
        cmd.stdout(stdio_for(invocation.stdout.as_deref()));
        cmd.stderr(stdio_for(invocation.stderr.as_deref()));

        let spawn_failed = |e: std::io::Error| CrunError::SpawnFailed {
            job: invocation.job.clone(),
            error: e.to_string(),
            help: Some(format!("Shell '{}' may not be available", self.shell)),
        };

        let child = cmd.spawn().map_err(spawn_failed)?;
        let output = child.wait_with_output().await.map_err(spawn_failed)?;
        let duration = start.elapsed();

        if let Some(path) = &invocation.stdout {
            write_capture(&invocation.working_dir, path, &output.stdout).await?;
        }
        if let Some(path) = &invocation.stderr {
            write_capture(&invocation.working_dir, path, &output.stderr).await?;
        }

        if output.status.success() {
            Ok(ExecutionResult::success(duration))
        } else {
            Ok(ExecutionResult::failure(
                output.status.code().unwrap_or(1),
                duration,
            ))
        }
    }
}

fn stdio_for(capture: Option<&Path>) -> Stdio {
    match capture {
        Some(_) => Stdio::piped(),
        None => Stdio::inherit(),
    }
}

async fn write_capture(working_dir: &Path, path: &Path, content: &[u8]) -> Result<(), CrunError> {
    let target = working_dir.join(path);
    tokio::fs::write(&target, content)
        .await
        .map_err(|e| CrunError::FileWriteError {
            path: target,
            error: e.to_string(),
        })
}
