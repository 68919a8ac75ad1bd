// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! # crun - declarative job runner
//!
//! `crun` runs jobs and pipelines declared in a TOML project file.
//!
//! ## Features
//!
//! - **Inheritance** - project files derive from others through `base`
//! - **Overrides** - any setting can be changed from the command line
//! - **Interpolation** - commands use options, environment variables and positional arguments
//! - **Pipelines** - ordered, fail-fast sequences of jobs with `run_if`/`run_unless` gates
//! - **Builtins** - `_versionbump` and `_ping` work without any configuration
//!
//! ## Quick Start
//!
//! ```toml
//! # project.toml
//! default_job = "check"
//!
//! [test]
//! command = "cargo test {#0}"
//! aliases = ["t"]
//!
//! [lint]
//! command = "cargo clippy"
//! options = { all-targets = true }
//!
//! [check]
//! pipeline = ["lint", "test"]
//! ```
//!
//! ```bash
//! crun                        # runs default_job
//! crun t -- --nocapture       # everything after -- is positional
//! crun lint --options.fix     # adds --fix
//! ```

pub mod builtins;
pub mod cli;
pub mod config;
pub mod errors;
pub mod executors;
pub mod job;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use config::ConfigDocument;
pub use errors::{CrunError, CrunResult, ErrorStage};
pub use job::{JobResolver, OverrideSet, ResolvedJob};
pub use pipeline::{PipelineExecutor, PipelineRun, RunContext};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
