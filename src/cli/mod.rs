// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! CLI definition and handlers
//!
//! `crun [OPTIONS] [JOB] [ARGS]...`: the fixed flags are parsed by clap,
//! everything after the job name is handed to [`args::parse_trailing`].

pub mod args;
pub mod list;
pub mod run;

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::utils::ColorMode;

/// Declarative job runner
///
/// Runs jobs and pipelines declared in a TOML project file.
#[derive(Parser, Debug)]
#[clap(
    name = "crun",
    version,
    about = "Run jobs and pipelines declared in a TOML project file",
    long_about = None,
    after_help = "Examples:\n\
        crun                            List jobs, or run default_job\n\
        crun build                      Run the job (or alias) build\n\
        crun test tests/unit            Pass a positional argument ({#1})\n\
        crun lint --options.fix         Set an option flag\n\
        crun ci --build.options.x=1     Override a pipeline member's settings"
)]
pub struct Cli {
    /// Project file, looked up in the current directory and its parents
    #[clap(
        short,
        long,
        env = "CRUN_CONFIG",
        default_value = DEFAULT_CONFIG_FILE,
        value_name = "FILE"
    )]
    pub config: PathBuf,

    /// When to use colors
    #[clap(long, value_enum, default_value_t = ColorMode::Auto, value_name = "WHEN")]
    pub color: ColorMode,

    /// More log output (-v debug, -vv trace)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Less log output (-q warnings, -qq errors only)
    #[clap(short, long, action = ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,

    /// Job name or alias
    pub job: Option<String>,

    /// Overrides (--path=value, --path value, --flag) and positional arguments
    #[clap(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

impl Cli {
    /// Parse the arguments of the current process
    pub fn parse_args() -> Self {
        Self::parse_from_args(std::env::args_os())
    }

    /// Parse `argv`, exiting with clap's usage error if it is invalid
    ///
    /// clap swallows a `--` directly after the job name; it is put back so
    /// the tokens behind it stay positional.
    pub fn parse_from_args<I, T>(argv: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let matches = Self::command().get_matches_from(argv.clone());
        let mut cli = Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

        // trailing arguments are always the tail of argv
        let escaped = argv
            .len()
            .checked_sub(cli.args.len() + 1)
            .and_then(|before| argv.get(before))
            .is_some_and(|token| token == "--");
        if escaped {
            cli.args.insert(0, "--".to_string());
        }
        cli
    }

    /// Log level from the -v/-q counts, starting at `info`
    pub fn log_level(&self) -> &'static str {
        match 2 + i16::from(self.verbose) - i16::from(self.quiet) {
            i16::MIN..=0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
    }
}
