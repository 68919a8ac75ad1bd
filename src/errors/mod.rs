// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Error types
//!
//! Every failure crun can report lives in [`CrunError`]. Variants are grouped
//! by the stage they abort: loading configuration, resolving a job, or
//! executing it. Config and resolution errors always surface before a
//! process is spawned for the job they concern.

use miette::Diagnostic;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for crun operations
pub type CrunResult<T> = Result<T, CrunError>;

/// The stage an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    Config,
    Resolution,
    Execution,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "configuration"),
            Self::Resolution => write!(f, "resolution"),
            Self::Execution => write!(f, "execution"),
        }
    }
}

/// Main error type for crun
#[derive(Error, Debug, Diagnostic)]
pub enum CrunError {
    // ─────────────────────────────────────────────────────────────────────────
    // Config Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Configuration file {filename} not found (searched upwards from {searched_from})")]
    #[diagnostic(
        code(crun::config_not_found),
        help("crun looks in the current directory and every parent directory. Use --config to point at another file.")
    )]
    ConfigNotFound {
        filename: PathBuf,
        searched_from: PathBuf,
    },

    #[error("Base configuration {path} not found (referenced by `base` in {referenced_by})")]
    #[diagnostic(code(crun::base_not_found))]
    BaseNotFound { path: PathBuf, referenced_by: PathBuf },

    #[error("Cyclic base chain: {}", display_paths(.chain))]
    #[diagnostic(
        code(crun::base_cycle),
        help("Remove one of the `base` keys so the chain ends in a document without a base")
    )]
    BaseCycle { chain: Vec<PathBuf> },

    #[error("Failed to parse {path}: {message}")]
    #[diagnostic(code(crun::parse_error))]
    Parse { path: PathBuf, message: String },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(crun::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Invalid top-level key `{key}`: {reason}")]
    #[diagnostic(code(crun::invalid_meta))]
    InvalidMeta { key: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No job called '{job}' was found")]
    #[diagnostic(
        code(crun::unknown_job),
        help("Run crun without a job name to list the available jobs")
    )]
    UnknownJob { job: String },

    #[error("Cannot override '{path}': '{conflict}' is not a table")]
    #[diagnostic(code(crun::conflicting_override))]
    ConflictingOverride { path: String, conflict: String },

    #[error("Invalid override path '{path}'")]
    #[diagnostic(
        code(crun::invalid_override_path),
        help("Override paths are dot-separated keys, e.g. --options.level=3")
    )]
    InvalidOverridePath { path: String },

    #[error("Can't interpolate {{{placeholder}}} in command of job '{job}'")]
    #[diagnostic(code(crun::unresolved_interpolation))]
    UnresolvedPlaceholder {
        placeholder: String,
        job: String,
        #[help]
        help: Option<String>,
    },

    #[error("Broken command template in job '{job}': {reason}")]
    #[diagnostic(
        code(crun::malformed_template),
        help("Placeholders are an option name, $VAR or #N inside braces; double a brace to print it literally")
    )]
    MalformedTemplate { job: String, reason: String },

    #[error("Attribute `{attribute}` of job '{job}' must be {expected}")]
    #[diagnostic(code(crun::invalid_attribute))]
    InvalidAttribute {
        job: String,
        attribute: String,
        expected: String,
    },

    #[error("Cyclic job inheritance: {}", .chain.join(" → "))]
    #[diagnostic(code(crun::job_base_cycle))]
    JobBaseCycle { chain: Vec<String> },

    #[error("Pipeline recursion: {}", .chain.join(" → "))]
    #[diagnostic(
        code(crun::recursive_pipeline),
        help("A pipeline cannot contain itself, directly or through another pipeline")
    )]
    RecursivePipeline { chain: Vec<String> },

    #[error("Job '{job}' has neither a command nor a pipeline")]
    #[diagnostic(code(crun::not_executable))]
    NotExecutable { job: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Job '{job}' returned with non-zero exit code {exit_code}")]
    #[diagnostic(code(crun::job_failed))]
    JobFailed { job: String, exit_code: i32 },

    #[error(
        "Pipeline '{pipeline}' failed at step {position} of {total}: job '{job}' returned with exit code {exit_code}"
    )]
    #[diagnostic(
        code(crun::step_failed),
        help("Steps after the failing one were not run")
    )]
    StepFailed {
        pipeline: String,
        job: String,
        position: usize,
        total: usize,
        exit_code: i32,
    },

    #[error("Job '{job}' was skipped: precondition {gate} '{check}' was not met")]
    #[diagnostic(code(crun::precondition_failed))]
    PreconditionFailed {
        job: String,
        gate: String,
        check: String,
        exit_code: i32,
    },

    #[error("Failed to start job '{job}': {error}")]
    #[diagnostic(code(crun::spawn_failed))]
    SpawnFailed {
        job: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(crun::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(crun::io_error))]
    Io { message: String },
}

fn display_paths(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

impl From<std::io::Error> for CrunError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl CrunError {
    /// Create a parse error for a document
    pub fn parse(path: &Path, e: toml::de::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }

    /// Create an invalid attribute error
    pub fn invalid_attribute(job: &str, attribute: &str, expected: &str) -> Self {
        Self::InvalidAttribute {
            job: job.to_string(),
            attribute: attribute.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Create an unresolved placeholder error with a hint for the placeholder kind
    pub fn unresolved(placeholder: &str, job: &str) -> Self {
        let help = if let Some(var) = placeholder.strip_prefix('$') {
            Some(format!(
                "Set {var} in the job's `environment` table or in the calling environment"
            ))
        } else if placeholder.starts_with('#') {
            Some("Pass more positional arguments after the job name".to_string())
        } else {
            Some(format!(
                "Define `{placeholder}` under the job's `options`, or pass --options.{placeholder}=<value>"
            ))
        };

        Self::UnresolvedPlaceholder {
            placeholder: placeholder.to_string(),
            job: job.to_string(),
            help,
        }
    }

    /// Create a malformed template error
    pub fn malformed(job: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            job: job.to_string(),
            reason: reason.into(),
        }
    }

    /// The stage this error aborted
    pub fn stage(&self) -> ErrorStage {
        match self {
            Self::ConfigNotFound { .. }
            | Self::BaseNotFound { .. }
            | Self::BaseCycle { .. }
            | Self::Parse { .. }
            | Self::FileReadError { .. }
            | Self::InvalidMeta { .. } => ErrorStage::Config,

            Self::UnknownJob { .. }
            | Self::ConflictingOverride { .. }
            | Self::InvalidOverridePath { .. }
            | Self::UnresolvedPlaceholder { .. }
            | Self::MalformedTemplate { .. }
            | Self::InvalidAttribute { .. }
            | Self::JobBaseCycle { .. }
            | Self::RecursivePipeline { .. }
            | Self::NotExecutable { .. } => ErrorStage::Resolution,

            Self::JobFailed { .. }
            | Self::StepFailed { .. }
            | Self::PreconditionFailed { .. }
            | Self::SpawnFailed { .. }
            | Self::FileWriteError { .. }
            | Self::Io { .. } => ErrorStage::Execution,
        }
    }

    /// Process exit code the binary should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::JobFailed { exit_code, .. }
            | Self::StepFailed { exit_code, .. }
            | Self::PreconditionFailed { exit_code, .. } => nonzero(*exit_code),
            Self::UnknownJob { .. } => 3,
            Self::UnresolvedPlaceholder { .. } => 4,
            Self::MalformedTemplate { .. } => 5,
            Self::SpawnFailed { .. } | Self::FileWriteError { .. } | Self::Io { .. } => 1,
            _ => 2,
        }
    }
}

/// A failed job must never map to a successful process exit
fn nonzero(code: i32) -> i32 {
    if code == 0 {
        1
    } else {
        code
    }
}
