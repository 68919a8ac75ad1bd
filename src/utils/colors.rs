// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Terminal color utilities
//!
//! Provides consistent color schemes across the CLI.

use clap::ValueEnum;
use colored::Colorize;

/// When to color output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Color when writing to a terminal and `NO_COLOR` is unset
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Whether a stream should be colored
    pub fn enabled(self, is_terminal: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => is_terminal && !no_color_requested(),
        }
    }
}

/// `NO_COLOR` set to anything non-empty
fn no_color_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty())
}

/// Style for job names
pub fn job(name: &str) -> colored::ColoredString {
    name.bold()
}

/// Style for builtin names
pub fn builtin(name: &str) -> colored::ColoredString {
    name.cyan()
}

/// Style for dimmed/secondary text
pub fn dimmed(msg: &str) -> colored::ColoredString {
    msg.dimmed()
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!("{}:", title.bold());
}
