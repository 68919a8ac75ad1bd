// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Builtin jobs
//!
//! Builtins are native routines reachable under reserved `_`-prefixed names.
//! They are looked up only after the document's own jobs and aliases, so a
//! project can shadow any of them.

mod ping;
mod versionbump;

pub use ping::Ping;
pub use versionbump::{BumpError, BumpPart, VersionBump};

use async_trait::async_trait;

use crate::errors::CrunResult;
use crate::executors::ExecutionResult;
use crate::job::ResolvedJob;
use crate::pipeline::RunContext;

/// A job implemented in Rust rather than as a shell command
#[async_trait]
pub trait Builtin: Send + Sync {
    /// Reserved name the builtin is invoked by
    fn name(&self) -> &'static str;

    /// One-line description shown in the job listing
    fn description(&self) -> &'static str;

    /// Run the builtin
    ///
    /// Expected failures (a missing input file, say) are a failed
    /// [`ExecutionResult`]; `Err` aborts the whole run.
    async fn run(&self, job: &ResolvedJob, context: &RunContext) -> CrunResult<ExecutionResult>;
}

/// Builtins by name
pub struct BuiltinRegistry {
    builtins: Vec<Box<dyn Builtin>>,
}

impl BuiltinRegistry {
    /// A registry without any builtins
    pub fn empty() -> Self {
        Self {
            builtins: Vec::new(),
        }
    }

    /// Register a builtin, replacing one with the same name
    pub fn register(&mut self, builtin: Box<dyn Builtin>) {
        self.builtins.retain(|b| b.name() != builtin.name());
        self.builtins.push(builtin);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Builtin> {
        self.builtins
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }

    /// Builtins in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Builtin> {
        self.builtins.iter().map(|b| b.as_ref())
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Ping));
        registry.register(Box::new(VersionBump));
        registry
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(|b| b.name())).finish()
    }
}
