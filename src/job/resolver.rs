// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Job definition resolver
//!
//! Turns a requested name into a [`ResolvedJob`]:
//!
//! 1. exact job name in the merged document,
//! 2. alias declared by any job, in document order,
//! 3. builtin registry,
//!
//! then folds in job-level `base` inheritance and applies the overrides.
//! Resolution only reads the document; it never starts a process.

use toml::{Table, Value};

use crate::builtins::BuiltinRegistry;
use crate::config::{merge_tables, without_keys, ConfigDocument};
use crate::errors::{CrunError, CrunResult};
use crate::job::{OverrideSet, ResolvedJob};

/// Where a requested name was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// A job table in the document, by canonical name
    Document(&'a str),
    /// A builtin, by its reserved name
    Builtin(&'a str),
}

/// Resolves job names against a document and the builtin registry
#[derive(Clone, Copy)]
pub struct JobResolver<'a> {
    document: &'a ConfigDocument,
    builtins: &'a BuiltinRegistry,
}

impl<'a> JobResolver<'a> {
    pub fn new(document: &'a ConfigDocument, builtins: &'a BuiltinRegistry) -> Self {
        Self { document, builtins }
    }

    /// Find the job a name or alias refers to
    pub fn lookup<'n>(&self, requested: &'n str) -> CrunResult<Lookup<'n>>
    where
        'a: 'n,
    {
        if self.document.job(requested).is_some() {
            return Ok(Lookup::Document(requested));
        }
        if let Some(target) = self.document.alias_target(requested) {
            tracing::debug!("Alias {} refers to job {}", requested, target);
            return Ok(Lookup::Document(target));
        }
        if let Some(builtin) = self.builtins.get(requested) {
            return Ok(Lookup::Builtin(builtin.name()));
        }
        Err(CrunError::UnknownJob {
            job: requested.to_string(),
        })
    }

    /// Resolve `requested` with `overrides` applied on top of its settings
    pub fn resolve(
        &self,
        requested: &str,
        overrides: &OverrideSet,
        positional: &[String],
    ) -> CrunResult<ResolvedJob> {
        let (name, mut settings, builtin) = match self.lookup(requested)? {
            Lookup::Document(name) => (name, self.inherited_settings(name)?, false),
            Lookup::Builtin(name) => (name, Table::new(), true),
        };

        overrides.apply(&mut settings)?;

        tracing::trace!("Resolved settings of {}: {:?}", name, settings);
        ResolvedJob::from_settings(name, settings, builtin, positional)
    }

    /// Settings of a document job with its `base` jobs merged underneath
    ///
    /// Aliases belong to the job declaring them and are not inherited.
    fn inherited_settings(&self, name: &str) -> CrunResult<Table> {
        let mut chain: Vec<String> = Vec::new();
        let mut layers: Vec<Table> = Vec::new();
        let mut current = name.to_string();

        loop {
            if chain.contains(&current) {
                chain.push(current);
                return Err(CrunError::JobBaseCycle { chain });
            }

            let settings = self
                .document
                .job(&current)
                .ok_or_else(|| CrunError::UnknownJob {
                    job: current.clone(),
                })?;

            let base = match settings.get("base") {
                None => None,
                Some(Value::String(base)) => Some(base.clone()),
                Some(_) => return Err(CrunError::invalid_attribute(&current, "base", "a job name")),
            };

            let layer = if layers.is_empty() {
                settings.clone()
            } else {
                without_keys(settings.clone(), &["aliases"])
            };
            layers.push(without_keys(layer, &["base"]));
            chain.push(current);

            match base {
                Some(base) => current = base,
                None => break,
            }
        }

        if chain.len() > 1 {
            tracing::debug!("Job {} inherits from {}", name, chain[1..].join(" → "));
        }

        Ok(layers
            .into_iter()
            .rev()
            .fold(Table::new(), merge_tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobKind, Override};

    const DOCUMENT: &str = r#"
[build]
command = "cargo build"
aliases = ["b", "compile"]

[build.options]
release = false
jobs = 4

[release]
base = "build"
aliases = ["r"]

[release.options]
release = true

[test]
command = "cargo test {#1}"
aliases = ["t", "b"]

[ci]
pipeline = ["build", "test"]
run_if = "clean"

[_ping]
command = "echo shadowed"

[loop-a]
base = "loop-b"
[loop-b]
base = "loop-a"
"#;

    fn document() -> ConfigDocument {
        ConfigDocument::from_toml(DOCUMENT).unwrap()
    }

    fn resolve(requested: &str, overrides: &OverrideSet) -> CrunResult<ResolvedJob> {
        let document = document();
        let builtins = BuiltinRegistry::default();
        JobResolver::new(&document, &builtins).resolve(requested, overrides, &[])
    }

    #[test]
    fn test_exact_name() {
        let job = resolve("build", &OverrideSet::new()).unwrap();
        assert_eq!(job.name, "build");
        assert_eq!(job.kind, JobKind::Command("cargo build".into()));
        assert_eq!(job.options["jobs"].as_integer(), Some(4));
    }

    #[test]
    fn test_alias_resolves_to_first_declaring_job() {
        assert_eq!(resolve("compile", &OverrideSet::new()).unwrap().name, "build");
        assert_eq!(resolve("t", &OverrideSet::new()).unwrap().name, "test");
        // "b" is declared by both build and test; build comes first
        assert_eq!(resolve("b", &OverrideSet::new()).unwrap().name, "build");
    }

    #[test]
    fn test_builtin_fallback_and_shadowing() {
        let document = document();
        let builtins = BuiltinRegistry::default();
        let resolver = JobResolver::new(&document, &builtins);

        assert_eq!(resolver.lookup("_versionbump").unwrap(), Lookup::Builtin("_versionbump"));
        assert_eq!(resolver.lookup("_ping").unwrap(), Lookup::Document("_ping"));
    }

    #[test]
    fn test_unknown_job() {
        assert!(matches!(
            resolve("deploy", &OverrideSet::new()),
            Err(CrunError::UnknownJob { job }) if job == "deploy"
        ));
    }

    #[test]
    fn test_job_base_inherits_and_overrides() {
        let job = resolve("release", &OverrideSet::new()).unwrap();
        assert_eq!(job.command(), Some("cargo build"));
        assert_eq!(job.options["release"].as_bool(), Some(true));
        assert_eq!(job.options["jobs"].as_integer(), Some(4));
        assert!(job.settings.get("base").is_none());

        let aliases = job.settings["aliases"].as_array().unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].as_str(), Some("r"));
    }

    #[test]
    fn test_job_base_cycle() {
        assert!(matches!(
            resolve("loop-a", &OverrideSet::new()),
            Err(CrunError::JobBaseCycle { .. })
        ));
    }

    #[test]
    fn test_overrides_win_over_document() {
        let mut overrides = OverrideSet::new();
        overrides.push(Override::from_cli("options.release", Some("true")).unwrap());
        overrides.push(Override::from_cli("environment.CARGO_TERM_COLOR", Some("always")).unwrap());
        overrides.push(Override::from_cli("command", Some("cargo check")).unwrap());

        let job = resolve("build", &overrides).unwrap();
        assert_eq!(job.options["release"].as_bool(), Some(true));
        assert_eq!(job.environment_var("CARGO_TERM_COLOR"), Some("always"));
        assert_eq!(job.command(), Some("cargo check"));
    }

    #[test]
    fn test_conflicting_override_fails_resolution() {
        let mut overrides = OverrideSet::new();
        overrides.push(Override::from_cli("command.inner", Some("x")).unwrap());
        assert!(matches!(
            resolve("build", &overrides),
            Err(CrunError::ConflictingOverride { .. })
        ));
    }

    #[test]
    fn test_pipeline_with_gate() {
        let job = resolve("ci", &OverrideSet::new()).unwrap();
        assert_eq!(job.pipeline().unwrap(), ["build", "test"]);
        assert_eq!(job.gate.unwrap().job, "clean");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let document = document();
        let builtins = BuiltinRegistry::default();
        let resolver = JobResolver::new(&document, &builtins);
        let positional = vec!["spam".to_string()];

        let first = resolver.resolve("release", &OverrideSet::new(), &positional).unwrap();
        let second = resolver.resolve("release", &OverrideSet::new(), &positional).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.positional, positional);
    }
}
