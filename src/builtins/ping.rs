// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

use async_trait::async_trait;
use std::time::Instant;

use super::Builtin;
use crate::errors::CrunResult;
use crate::executors::ExecutionResult;
use crate::job::ResolvedJob;
use crate::pipeline::RunContext;

/// `_ping`: prints `<msg> pong!`
#[derive(Debug, Default, Clone, Copy)]
pub struct Ping;

impl Ping {
    pub fn reply(job: &ResolvedJob) -> String {
        let msg = job.option_text("msg").unwrap_or_else(|| "ping".to_string());
        format!("{msg} pong!")
    }
}

#[async_trait]
impl Builtin for Ping {
    fn name(&self) -> &'static str {
        "_ping"
    }

    fn description(&self) -> &'static str {
        "Print a reply; option msg (default \"ping\")"
    }

    async fn run(&self, job: &ResolvedJob, _context: &RunContext) -> CrunResult<ExecutionResult> {
        let start = Instant::now();
        println!("{}", Self::reply(job));
        Ok(ExecutionResult::success(start.elapsed()))
    }
}
