// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Jobs
//!
//! A job's settings are kept as a plain TOML table so overrides and
//! inheritance can address any dotted path. [`ResolvedJob`] is the typed view
//! on top of that table once inheritance and overrides have been applied.

pub mod interpolate;
pub mod materialize;
pub mod overrides;
pub mod resolver;

pub use overrides::{Override, OverrideSet};
pub use resolver::JobResolver;

use std::path::PathBuf;
use toml::{Table, Value};

use crate::errors::{CrunError, CrunResult};

/// Keys with a meaning of their own inside a job table
pub const ATTRIBUTES: &[&str] = &[
    "command",
    "options",
    "environment",
    "pipeline",
    "run_if",
    "run_unless",
    "aliases",
    "base",
    "fail_ok",
    "stdout",
    "stderr",
];

/// What running a job means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    /// Interpolate the template and run it through the shell
    Command(String),
    /// Run other jobs in order
    Pipeline(Vec<String>),
    /// Run a native routine from the builtin registry
    Builtin(String),
}

/// Which way a precondition has to go for the job to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    RunIf,
    RunUnless,
}

impl GateKind {
    /// Settings key declaring this gate
    pub fn key(self) -> &'static str {
        match self {
            Self::RunIf => "run_if",
            Self::RunUnless => "run_unless",
        }
    }

    /// Whether the gated job runs given the outcome of the check job
    pub fn allows(self, check_succeeded: bool) -> bool {
        match self {
            Self::RunIf => check_succeeded,
            Self::RunUnless => !check_succeeded,
        }
    }
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A precondition: another job that must succeed (or fail) first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    pub kind: GateKind,
    pub job: String,
}

/// A job after inheritance and overrides, before interpolation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedJob {
    /// Canonical name (aliases are resolved)
    pub name: String,
    pub kind: JobKind,
    /// Options in declaration order
    pub options: Table,
    /// Environment entries in declaration order
    pub environment: Vec<(String, String)>,
    pub gate: Option<Gate>,
    /// Treat a non-zero exit as success
    pub fail_ok: bool,
    /// Capture stdout into this file
    pub stdout: Option<PathBuf>,
    /// Capture stderr into this file
    pub stderr: Option<PathBuf>,
    /// Positional arguments of the invocation
    pub positional: Vec<String>,
    /// The full settings table the typed fields were read from
    pub settings: Table,
}

impl ResolvedJob {
    /// Build the typed view of `settings`
    ///
    /// `builtin` marks jobs that came from the builtin registry; they are
    /// executable without a command or pipeline.
    pub fn from_settings(
        name: &str,
        settings: Table,
        builtin: bool,
        positional: &[String],
    ) -> CrunResult<Self> {
        let kind = if let Some(pipeline) = settings.get("pipeline") {
            JobKind::Pipeline(read_pipeline(name, pipeline)?)
        } else if let Some(command) = settings.get("command") {
            let command = command
                .as_str()
                .ok_or_else(|| CrunError::invalid_attribute(name, "command", "a string"))?;
            JobKind::Command(command.to_string())
        } else if builtin {
            JobKind::Builtin(name.to_string())
        } else {
            return Err(CrunError::NotExecutable { job: name.to_string() });
        };

        let options = match settings.get("options") {
            None => Table::new(),
            Some(Value::Table(options)) => {
                for (key, value) in options {
                    if matches!(value, Value::Table(_) | Value::Array(_)) {
                        return Err(CrunError::invalid_attribute(
                            name,
                            &format!("options.{key}"),
                            "a boolean, string or number",
                        ));
                    }
                }
                options.clone()
            }
            Some(_) => return Err(CrunError::invalid_attribute(name, "options", "a table")),
        };

        let environment = match settings.get("environment") {
            None => Vec::new(),
            Some(Value::Table(environment)) => environment
                .iter()
                .map(|(key, value)| {
                    scalar_text(value)
                        .map(|text| (key.clone(), text))
                        .ok_or_else(|| {
                            CrunError::invalid_attribute(
                                name,
                                &format!("environment.{key}"),
                                "a string",
                            )
                        })
                })
                .collect::<CrunResult<Vec<_>>>()?,
            Some(_) => return Err(CrunError::invalid_attribute(name, "environment", "a table")),
        };

        let gate = match (
            read_string(name, &settings, "run_if")?,
            read_string(name, &settings, "run_unless")?,
        ) {
            (Some(_), Some(_)) => {
                return Err(CrunError::invalid_attribute(
                    name,
                    "run_if",
                    "left out when run_unless is set",
                ))
            }
            (Some(job), None) => Some(Gate {
                kind: GateKind::RunIf,
                job,
            }),
            (None, Some(job)) => Some(Gate {
                kind: GateKind::RunUnless,
                job,
            }),
            (None, None) => None,
        };

        let fail_ok = match settings.get("fail_ok") {
            None => false,
            Some(value) => truthy(value)
                .ok_or_else(|| CrunError::invalid_attribute(name, "fail_ok", "a boolean"))?,
        };

        Ok(Self {
            name: name.to_string(),
            kind,
            options,
            environment,
            gate,
            fail_ok,
            stdout: read_string(name, &settings, "stdout")?.map(PathBuf::from),
            stderr: read_string(name, &settings, "stderr")?.map(PathBuf::from),
            positional: positional.to_vec(),
            settings,
        })
    }

    /// Command template, if this is a command job
    pub fn command(&self) -> Option<&str> {
        match &self.kind {
            JobKind::Command(command) => Some(command),
            _ => None,
        }
    }

    /// Pipeline members, if this is a pipeline
    pub fn pipeline(&self) -> Option<&[String]> {
        match &self.kind {
            JobKind::Pipeline(members) => Some(members),
            _ => None,
        }
    }

    /// Value of an environment entry declared by the job
    pub fn environment_var(&self, key: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Whether a boolean option is switched on (`true` or `"true"`)
    pub fn flag(&self, option: &str) -> bool {
        self.options
            .get(option)
            .and_then(truthy)
            .unwrap_or(false)
    }

    /// Textual value of an option
    pub fn option_text(&self, option: &str) -> Option<String> {
        self.options.get(option).and_then(scalar_text)
    }

    /// Overrides this pipeline declares for one of its members
    ///
    /// A pipeline may carry a table named after a member; its leaves are
    /// applied to that member's settings when the pipeline runs it.
    pub fn member_overrides(&self, member: &str) -> OverrideSet {
        if ATTRIBUTES.contains(&member) {
            return OverrideSet::new();
        }
        match self.settings.get(member) {
            Some(Value::Table(table)) => OverrideSet::from_table(table),
            _ => OverrideSet::new(),
        }
    }
}

fn read_pipeline(job: &str, value: &Value) -> CrunResult<Vec<String>> {
    let invalid = || CrunError::invalid_attribute(job, "pipeline", "a non-empty array of job names");
    let members = value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|member| member.as_str().map(str::to_string).ok_or_else(invalid))
        .collect::<CrunResult<Vec<_>>>()?;

    if members.is_empty() {
        return Err(invalid());
    }
    Ok(members)
}

fn read_string(job: &str, settings: &Table, key: &str) -> CrunResult<Option<String>> {
    match settings.get(key) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(CrunError::invalid_attribute(job, key, "a string")),
    }
}

/// Boolean reading of a value, accepting the strings `true`/`false`
pub(crate) fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

/// Textual form of a scalar; `None` for arrays and tables
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}
