// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Job execution
//!
//! [`PipelineExecutor`] drives a resolved job to completion: gate first, then
//! its pipeline members, builtin or shell command.

mod context;
mod executor;

pub use context::RunContext;
pub use executor::{
    Failure, GateDecision, Outcome, PipelineExecutor, PipelineRun, StepRecord, StepStatus,
};
