// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Pipeline executor
//!
//! Runs a job and everything it pulls in: its gate, its pipeline members
//! (recursively) or its command. Steps run strictly one after another and the
//! first failing step stops the pipeline. A member whose gate refuses is
//! skipped and the pipeline carries on.
//!
//! Before anything is spawned the whole tree is resolved and every command
//! template rendered once, so a resolution error anywhere in it aborts the
//! run with no side effects.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::builtins::BuiltinRegistry;
use crate::config::ConfigDocument;
use crate::errors::{CrunError, CrunResult};
use crate::executors::{ExecutionResult, Invocation, ProcessRunner};
use crate::job::{interpolate, materialize, Gate, JobKind, JobResolver, OverrideSet, ResolvedJob};
use crate::pipeline::RunContext;

/// What happened to a pipeline member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed { exit_code: i32 },
    /// Its precondition refused to let it run
    Skipped,
    /// An earlier step failed
    NotRun,
}

/// One member of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub job: String,
    /// 1-based
    pub position: usize,
    pub status: StepStatus,
}

/// Result of evaluating a job's gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Run,
    Skipped,
}

/// Why a job did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The job's command or builtin exited non-zero
    Job { job: String, exit_code: i32 },
    /// A pipeline member failed
    Step {
        pipeline: String,
        position: usize,
        total: usize,
        cause: Box<Failure>,
    },
    /// The job's gate refused to let it run
    Precondition {
        job: String,
        gate: Gate,
        exit_code: i32,
    },
}

impl Failure {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Job { exit_code, .. } | Self::Precondition { exit_code, .. } => *exit_code,
            Self::Step { cause, .. } => cause.exit_code(),
        }
    }

    fn job(&self) -> &str {
        match self {
            Self::Job { job, .. } | Self::Precondition { job, .. } => job,
            Self::Step { pipeline, .. } => pipeline,
        }
    }

    /// The error reported for this failure
    ///
    /// Step failures name the innermost failing step.
    pub fn into_error(self) -> CrunError {
        match self {
            Self::Job { job, exit_code } => CrunError::JobFailed { job, exit_code },
            Self::Precondition {
                job,
                gate,
                exit_code,
            } => CrunError::PreconditionFailed {
                job,
                gate: gate.kind.to_string(),
                check: gate.job,
                exit_code,
            },
            Self::Step {
                pipeline,
                position,
                total,
                cause,
            } => match *cause {
                inner @ Self::Step { .. } => inner.into_error(),
                leaf => CrunError::StepFailed {
                    pipeline,
                    job: leaf.job().to_string(),
                    position,
                    total,
                    exit_code: leaf.exit_code(),
                },
            },
        }
    }
}

/// Aggregate outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(Failure),
}

/// Execution record of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    /// Canonical name of the job
    pub job: String,
    /// `None` when the job has no gate
    pub gate: Option<GateDecision>,
    /// Pipeline members; empty for commands and builtins
    pub steps: Vec<StepRecord>,
    pub outcome: Outcome,
}

impl PipelineRun {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Exit code the run amounts to
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            Outcome::Success => 0,
            Outcome::Failure(failure) => failure.exit_code(),
        }
    }

    pub fn into_result(self) -> CrunResult<()> {
        match self.outcome {
            Outcome::Success => Ok(()),
            Outcome::Failure(failure) => Err(failure.into_error()),
        }
    }
}

type BoxedRun<'r> = Pin<Box<dyn Future<Output = CrunResult<PipelineRun>> + 'r>>;

/// Pipeline executor
pub struct PipelineExecutor<'a> {
    resolver: JobResolver<'a>,
    builtins: &'a BuiltinRegistry,
    runner: &'a dyn ProcessRunner,
    context: &'a RunContext,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(
        document: &'a ConfigDocument,
        builtins: &'a BuiltinRegistry,
        runner: &'a dyn ProcessRunner,
        context: &'a RunContext,
    ) -> Self {
        Self {
            resolver: JobResolver::new(document, builtins),
            builtins,
            runner,
            context,
        }
    }

    /// Run `requested` with `overrides` applied to it
    ///
    /// `Err` means the run was aborted (a configuration or resolution
    /// problem, or a process that could not be started); a job that ran and
    /// failed is an `Ok` run with a failed outcome.
    pub async fn run(&self, requested: &str, overrides: &OverrideSet) -> CrunResult<PipelineRun> {
        self.preflight(requested, overrides, &mut Vec::new())?;

        let start = Instant::now();
        let run = self
            .run_job(requested.to_string(), overrides.clone(), 0, Vec::new())
            .await?;

        if run.succeeded() {
            info!(
                "Job {} completed in {:.2}s",
                run.job,
                start.elapsed().as_secs_f64()
            );
        }
        Ok(run)
    }

    /// Resolve `requested` and everything it pulls in without running anything
    fn preflight(
        &self,
        requested: &str,
        overrides: &OverrideSet,
        stack: &mut Vec<String>,
    ) -> CrunResult<()> {
        let job = self
            .resolver
            .resolve(requested, overrides, &self.context.positional)?;

        if stack.contains(&job.name) {
            let mut chain = stack.clone();
            chain.push(job.name);
            return Err(CrunError::RecursivePipeline { chain });
        }
        stack.push(job.name.clone());

        if let Some(gate) = &job.gate {
            self.preflight(&gate.job, &OverrideSet::new(), stack)?;
        }

        match &job.kind {
            JobKind::Pipeline(members) => {
                for member in members {
                    self.preflight(member, &job.member_overrides(member), stack)?;
                }
            }
            JobKind::Command(template) => {
                interpolate::render(template, &job, &self.context.process_env)?;
            }
            JobKind::Builtin(name) => {
                if self.builtins.get(name).is_none() {
                    return Err(CrunError::UnknownJob { job: name.clone() });
                }
            }
        }

        stack.pop();
        Ok(())
    }

    fn run_job(
        &self,
        requested: String,
        overrides: OverrideSet,
        depth: usize,
        mut stack: Vec<String>,
    ) -> BoxedRun<'_> {
        Box::pin(async move {
            let job = self
                .resolver
                .resolve(&requested, &overrides, &self.context.positional)?;

            if stack.contains(&job.name) {
                stack.push(job.name);
                return Err(CrunError::RecursivePipeline { chain: stack });
            }
            stack.push(job.name.clone());

            info!("{}› Running job {}", indent(depth), job.name);

            let gate = match &job.gate {
                None => None,
                Some(gate) => match self.check_gate(&job, gate, depth, &stack).await? {
                    Some(failure) => {
                        return Ok(PipelineRun {
                            job: job.name,
                            gate: Some(GateDecision::Skipped),
                            steps: Vec::new(),
                            outcome: Outcome::Failure(failure),
                        })
                    }
                    None => Some(GateDecision::Run),
                },
            };

            let (steps, outcome) = match &job.kind {
                JobKind::Pipeline(members) => {
                    self.run_members(&job, members, depth, &stack).await?
                }
                JobKind::Command(template) => {
                    let result = self.run_command(&job, template, depth).await?;
                    (Vec::new(), self.judge(&job, result, depth))
                }
                JobKind::Builtin(name) => {
                    let builtin = self.builtins.get(name).ok_or_else(|| CrunError::UnknownJob {
                        job: name.clone(),
                    })?;
                    let result = builtin.run(&job, self.context).await?;
                    (Vec::new(), self.judge(&job, result, depth))
                }
            };

            Ok(PipelineRun {
                job: job.name,
                gate,
                steps,
                outcome,
            })
        })
    }

    /// Run the check job of `gate`; `Some` when `job` must not run
    async fn check_gate(
        &self,
        job: &ResolvedJob,
        gate: &Gate,
        depth: usize,
        stack: &[String],
    ) -> CrunResult<Option<Failure>> {
        debug!("{}› Checking {} {}", indent(depth), gate.kind, gate.job);

        let check = self
            .run_job(gate.job.clone(), OverrideSet::new(), depth + 1, stack.to_vec())
            .await?;

        if gate.kind.allows(check.succeeded()) {
            return Ok(None);
        }

        warn!(
            "{}› Skipping {}: {} {} {}",
            indent(depth),
            job.name,
            gate.kind,
            gate.job,
            if check.succeeded() { "succeeded" } else { "failed" }
        );

        let exit_code = match check.exit_code() {
            0 => 1,
            code => code,
        };
        Ok(Some(Failure::Precondition {
            job: job.name.clone(),
            gate: gate.clone(),
            exit_code,
        }))
    }

    async fn run_members(
        &self,
        pipeline: &ResolvedJob,
        members: &[String],
        depth: usize,
        stack: &[String],
    ) -> CrunResult<(Vec<StepRecord>, Outcome)> {
        let total = members.len();
        let mut steps = Vec::with_capacity(total);
        let mut outcome = Outcome::Success;

        for (index, member) in members.iter().enumerate() {
            let position = index + 1;

            if outcome != Outcome::Success {
                steps.push(StepRecord {
                    job: member.clone(),
                    position,
                    status: StepStatus::NotRun,
                });
                continue;
            }

            debug!("{}› Step {}/{} of {}", indent(depth), position, total, pipeline.name);
            let run = self
                .run_job(
                    member.clone(),
                    pipeline.member_overrides(member),
                    depth + 1,
                    stack.to_vec(),
                )
                .await?;

            let status = match run.outcome {
                Outcome::Success => StepStatus::Succeeded,
                Outcome::Failure(_) if run.gate == Some(GateDecision::Skipped) => {
                    info!("{}› Step {} of {} skipped", indent(depth), position, pipeline.name);
                    StepStatus::Skipped
                }
                Outcome::Failure(failure) => {
                    let status = StepStatus::Failed {
                        exit_code: failure.exit_code(),
                    };
                    outcome = Outcome::Failure(Failure::Step {
                        pipeline: pipeline.name.clone(),
                        position,
                        total,
                        cause: Box::new(failure),
                    });
                    status
                }
            };

            steps.push(StepRecord {
                job: run.job,
                position,
                status,
            });
        }

        if outcome != Outcome::Success {
            error!(
                "{}› Pipeline {} stopped after step {} of {}",
                indent(depth),
                pipeline.name,
                steps.iter().filter(|s| s.status != StepStatus::NotRun).count(),
                total
            );
        }

        Ok((steps, outcome))
    }

    async fn run_command(
        &self,
        job: &ResolvedJob,
        template: &str,
        depth: usize,
    ) -> CrunResult<ExecutionResult> {
        let rendered = interpolate::render(template, job, &self.context.process_env)?;
        let invocation = Invocation {
            job: job.name.clone(),
            command: materialize::command_line(&rendered, &job.options),
            env: materialize::environment(&job.environment, &self.context.process_env),
            working_dir: self.context.working_dir.clone(),
            stdout: job.stdout.clone(),
            stderr: job.stderr.clone(),
        };

        debug!("{}  $ {}", indent(depth), invocation.command);
        self.runner.run(&invocation).await
    }

    fn judge(&self, job: &ResolvedJob, result: ExecutionResult, depth: usize) -> Outcome {
        if result.success {
            debug!(
                "{}› {} finished in {:.2}s",
                indent(depth),
                job.name,
                result.duration.as_secs_f64()
            );
            return Outcome::Success;
        }

        if job.fail_ok {
            warn!(
                "{}› {} exited with code {}; continuing (fail_ok)",
                indent(depth),
                job.name,
                result.exit_code
            );
            return Outcome::Success;
        }

        error!(
            "{}› {} failed with exit code {}",
            indent(depth),
            job.name,
            result.exit_code
        );
        Outcome::Failure(Failure::Job {
            job: job.name.clone(),
            exit_code: result.exit_code,
        })
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
