// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Process executors
//!
//! The [`ProcessRunner`] trait is the only place crun touches child
//! processes. The pipeline executor hands it a fully rendered
//! [`Invocation`] and gets an [`ExecutionResult`] back.

mod shell;

pub use shell::ShellExecutor;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::CrunError;

/// A command ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Job the command belongs to
    pub job: String,

    /// Interpolated command line, flags included
    pub command: String,

    /// Complete process environment
    pub env: BTreeMap<OsString, OsString>,

    /// Directory the command runs in
    pub working_dir: PathBuf,

    /// Capture stdout into this file instead of inheriting it
    pub stdout: Option<PathBuf>,

    /// Capture stderr into this file instead of inheriting it
    pub stderr: Option<PathBuf>,
}

/// Result of running a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Whether execution succeeded
    pub success: bool,

    /// Exit code
    pub exit_code: i32,

    /// Execution duration
    pub duration: Duration,
}

impl ExecutionResult {
    /// Create a successful result
    pub fn success(duration: Duration) -> Self {
        Self {
            success: true,
            exit_code: 0,
            duration,
        }
    }

    /// Create a failed result
    pub fn failure(exit_code: i32, duration: Duration) -> Self {
        Self {
            success: false,
            exit_code,
            duration,
        }
    }
}

/// Runs rendered commands
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run an invocation to completion
    ///
    /// A non-zero exit is a successful call returning a failed result; `Err`
    /// is reserved for commands that could not be run at all.
    async fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, CrunError>;
}
