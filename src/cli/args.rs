// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Tokens after the job name
//!
//! - `--path=value` and `--path value` set a dotted settings path
//! - `--path` followed by another `--` token, or by nothing, is a flag
//! - anything else is a positional argument
//! - everything after a literal `--` is positional

use crate::errors::CrunResult;
use crate::job::{Override, OverrideSet};

/// Overrides and positional arguments of an invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailingArgs {
    pub overrides: OverrideSet,
    pub positional: Vec<String>,
}

/// Split trailing tokens into overrides and positional arguments
pub fn parse_trailing(tokens: &[String]) -> CrunResult<TrailingArgs> {
    let mut parsed = TrailingArgs::default();
    let mut tokens = tokens.iter().peekable();

    while let Some(token) = tokens.next() {
        if token == "--" {
            parsed.positional.extend(tokens.by_ref().cloned());
            break;
        }

        let Some(path) = token.strip_prefix("--") else {
            parsed.positional.push(token.clone());
            continue;
        };

        let entry = match path.split_once('=') {
            Some((path, value)) => Override::from_cli(path, Some(value))?,
            None => match tokens.next_if(|next| !next.starts_with("--")) {
                Some(value) => Override::from_cli(path, Some(value))?,
                None => Override::from_cli(path, None)?,
            },
        };
        tracing::trace!("Override {} from command line", entry);
        parsed.overrides.push(entry);
    }

    Ok(parsed)
}
