// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Options to flags, environment to process environment

use std::collections::BTreeMap;
use std::ffi::OsString;
use toml::{Table, Value};

use crate::job::scalar_text;

/// Command-line flags for `options`, in declaration order
///
/// `true` becomes `--name`, `false` is dropped, anything else becomes
/// `--name=value`.
pub fn flags(options: &Table) -> Vec<String> {
    options
        .iter()
        .filter_map(|(name, value)| match value {
            Value::Boolean(true) => Some(format!("--{name}")),
            Value::Boolean(false) => None,
            other => scalar_text(other).map(|text| format!("--{name}={text}")),
        })
        .collect()
}

/// The rendered command with the option flags appended
pub fn command_line(rendered: &str, options: &Table) -> String {
    let flags = flags(options);
    if flags.is_empty() {
        rendered.to_string()
    } else {
        format!("{} {}", rendered, flags.join(" "))
    }
}

/// Process environment overlaid with the job's entries
///
/// Inherited entries are passed through untouched, including names and
/// values that are not valid UTF-8.
pub fn environment(
    job_env: &[(String, String)],
    process_env: &BTreeMap<OsString, OsString>,
) -> BTreeMap<OsString, OsString> {
    let mut env = process_env.clone();
    env.extend(
        job_env
            .iter()
            .map(|(key, value)| (OsString::from(key), OsString::from(value))),
    );
    env
}
