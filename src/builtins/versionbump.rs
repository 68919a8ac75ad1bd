// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! `_versionbump`: increment a `version = "X.Y.Z"` assignment in place

use async_trait::async_trait;
use regex::Regex;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use super::Builtin;
use crate::errors::{CrunError, CrunResult};
use crate::executors::ExecutionResult;
use crate::job::ResolvedJob;
use crate::pipeline::RunContext;

/// File bumped when the job sets no `file` option
pub const DEFAULT_VERSION_FILE: &str = "setup.py";

const VERSION_PATTERN: &str = r#"(version\s*=\s*)"(\d+)\.(\d+)\.(\d+)""#;

/// Which component of the version to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpPart {
    Major,
    Minor,
    Patch,
}

impl BumpPart {
    /// `major` wins over `minor`; patch otherwise
    pub fn from_job(job: &ResolvedJob) -> Self {
        if job.flag("major") {
            Self::Major
        } else if job.flag("minor") {
            Self::Minor
        } else {
            Self::Patch
        }
    }

    /// `None` when the incremented component would not fit in a `u64`
    fn apply(self, (major, minor, patch): (u64, u64, u64)) -> Option<(u64, u64, u64)> {
        match self {
            Self::Major => Some((major.checked_add(1)?, 0, 0)),
            Self::Minor => Some((major, minor.checked_add(1)?, 0)),
            Self::Patch => Some((major, minor, patch.checked_add(1)?)),
        }
    }
}

/// Why a document could not be bumped
#[derive(Error, Debug)]
pub enum BumpError {
    #[error("no version = \"X.Y.Z\" assignment found")]
    NoVersion,

    #[error("version {version} is out of range")]
    OutOfRange { version: String },

    #[error("invalid version pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Outcome of bumping a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bumped {
    pub content: String,
    pub old: String,
    pub new: String,
}

/// Bump the first version assignment in `content`
///
/// Everything outside the quoted version, including the spacing around `=`,
/// is kept. Components that do not fit in a `u64`, before or after the
/// increment, are [`BumpError::OutOfRange`].
pub fn bump(content: &str, part: BumpPart) -> Result<Bumped, BumpError> {
    let re = Regex::new(VERSION_PATTERN)?;
    let caps = re.captures(content).ok_or(BumpError::NoVersion)?;

    let literal = format!("{}.{}.{}", &caps[2], &caps[3], &caps[4]);
    let out_of_range = || BumpError::OutOfRange {
        version: literal.clone(),
    };

    let number = |i: usize| caps[i].parse::<u64>().map_err(|_| out_of_range());
    let current = (number(2)?, number(3)?, number(4)?);
    let (major, minor, patch) = part.apply(current).ok_or_else(out_of_range)?;

    let old = format!("{}.{}.{}", current.0, current.1, current.2);
    let new = format!("{major}.{minor}.{patch}");

    let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
    let mut bumped = content.to_string();
    bumped.replace_range(whole, &format!("{}\"{}\"", &caps[1], new));

    Ok(Bumped {
        content: bumped,
        old,
        new,
    })
}

/// The `_versionbump` builtin
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionBump;

#[async_trait]
impl Builtin for VersionBump {
    fn name(&self) -> &'static str {
        "_versionbump"
    }

    fn description(&self) -> &'static str {
        "Bump the version in a file; options file, major, minor"
    }

    async fn run(&self, job: &ResolvedJob, context: &RunContext) -> CrunResult<ExecutionResult> {
        let start = Instant::now();
        let file = job
            .option_text("file")
            .unwrap_or_else(|| DEFAULT_VERSION_FILE.to_string());
        let path = context.working_dir.join(&file);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                error!("Cannot read {}: {}", path.display(), e);
                return Ok(ExecutionResult::failure(1, start.elapsed()));
            }
        };

        let bumped = match bump(&content, BumpPart::from_job(job)) {
            Ok(bumped) => bumped,
            Err(e) => {
                error!("Cannot bump {}: {}", path.display(), e);
                return Ok(ExecutionResult::failure(1, start.elapsed()));
            }
        };

        tokio::fs::write(&path, &bumped.content)
            .await
            .map_err(|e| CrunError::FileWriteError {
                path: path.clone(),
                error: e.to_string(),
            })?;

        info!("Bumped {} from {} to {}", file, bumped.old, bumped.new);
        Ok(ExecutionResult::success(start.elapsed()))
    }
}
