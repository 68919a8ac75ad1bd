// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Per-invocation context

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// Everything a run needs from the outside world
///
/// Captured once at startup and passed down explicitly, so resolution and
/// interpolation never read ambient process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Directory commands and builtins run in
    pub working_dir: PathBuf,

    /// Environment crun was started with
    pub process_env: BTreeMap<OsString, OsString>,

    /// Positional arguments shared by every job of the run
    pub positional: Vec<String>,
}

impl RunContext {
    pub fn new(
        working_dir: PathBuf,
        process_env: BTreeMap<OsString, OsString>,
        positional: Vec<String>,
    ) -> Self {
        Self {
            working_dir,
            process_env,
            positional,
        }
    }

    /// Capture the environment of the current process, byte for byte
    pub fn from_process(working_dir: PathBuf, positional: Vec<String>) -> Self {
        Self::new(working_dir, std::env::vars_os().collect(), positional)
    }
}
