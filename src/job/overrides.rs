// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Dotted-path overrides
//!
//! `--options.level=3` on the command line becomes the override
//! `options.level = "3"`. Overrides are applied to a job's settings in the
//! order they were given, so the last one on a path wins.

use std::fmt;
use toml::{Table, Value};

use crate::errors::{CrunError, CrunResult};

/// One assignment to a dotted settings path
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    path: Vec<String>,
    value: Value,
}

impl Override {
    /// Override `path` with an already typed value
    pub fn new(path: &str, value: Value) -> CrunResult<Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(CrunError::InvalidOverridePath {
                path: path.to_string(),
            });
        }
        Ok(Self {
            path: segments,
            value,
        })
    }

    /// Override from a command-line token
    ///
    /// A flag without a value is boolean `true`. Values are strings, except
    /// that `true`/`false` directly under `options` become booleans so they
    /// materialize as bare flags.
    pub fn from_cli(path: &str, raw: Option<&str>) -> CrunResult<Self> {
        let mut parsed = Self::new(path, Value::Boolean(true))?;
        if let Some(raw) = raw {
            parsed.value = match raw {
                "true" | "false" if parsed.is_option() => Value::Boolean(raw == "true"),
                _ => Value::String(raw.to_string()),
            };
        }
        Ok(parsed)
    }

    fn is_option(&self) -> bool {
        self.path.len() >= 2 && self.path[self.path.len() - 2] == "options"
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Assign the value, creating intermediate tables as needed
    pub fn apply(&self, settings: &mut Table) -> CrunResult<()> {
        let Some((leaf, parents)) = self.path.split_last() else {
            return Err(CrunError::InvalidOverridePath {
                path: self.to_string(),
            });
        };

        let mut current = settings;
        for (depth, segment) in parents.iter().enumerate() {
            if !current.contains_key(segment) {
                current.insert(segment.clone(), Value::Table(Table::new()));
            }
            current = match current.get_mut(segment) {
                Some(Value::Table(table)) => table,
                _ => {
                    return Err(CrunError::ConflictingOverride {
                        path: self.to_string(),
                        conflict: self.path[..=depth].join("."),
                    })
                }
            };
        }

        current.insert(leaf.clone(), self.value.clone());
        Ok(())
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join("."))
    }
}

/// Ordered overrides for one job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    entries: Vec<Override>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a settings table into one override per leaf, in table order
    ///
    /// Empty tables carry no assignment and are skipped.
    pub fn from_table(table: &Table) -> Self {
        let mut set = Self::new();
        flatten(table, &mut Vec::new(), &mut set.entries);
        set
    }

    pub fn push(&mut self, entry: Override) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Override> {
        self.entries.iter()
    }

    /// Apply every override in order
    pub fn apply(&self, settings: &mut Table) -> CrunResult<()> {
        for entry in &self.entries {
            tracing::trace!("Overriding {} with {}", entry, entry.value);
            entry.apply(settings)?;
        }
        Ok(())
    }
}

fn flatten(table: &Table, prefix: &mut Vec<String>, out: &mut Vec<Override>) {
    for (key, value) in table {
        prefix.push(key.clone());
        match value {
            Value::Table(nested) => flatten(nested, prefix, out),
            leaf => out.push(Override {
                path: prefix.clone(),
                value: leaf.clone(),
            }),
        }
        prefix.pop();
    }
}
