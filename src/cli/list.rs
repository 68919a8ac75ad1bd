// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Job listing, shown when no job is named and there is no `default_job`

use crate::builtins::BuiltinRegistry;
use crate::config::ConfigDocument;
use crate::utils::colors;

/// Width of the builtin name column
const BUILTIN_COLUMN: usize = 14;

/// Lines of the listing: jobs with their aliases, then builtins
pub fn render(document: &ConfigDocument, builtins: &BuiltinRegistry) -> Vec<String> {
    let mut lines = Vec::new();

    for (name, settings) in document.jobs() {
        let aliases = document.aliases_of(settings);
        if aliases.is_empty() {
            lines.push(format!("  {}", colors::job(name)));
        } else {
            let aliases = format!("({})", aliases.join(", "));
            lines.push(format!("  {} {}", colors::job(name), colors::dimmed(&aliases)));
        }
    }

    let shadowed = |name: &str| document.job(name).is_some();
    for builtin in builtins.iter().filter(|b| !shadowed(b.name())) {
        // pad before styling so escape codes never count towards the width
        let name = format!("{:<width$}", builtin.name(), width = BUILTIN_COLUMN);
        lines.push(format!(
            "  {} {}",
            colors::builtin(&name),
            colors::dimmed(builtin.description())
        ));
    }

    lines
}

/// Print the listing to stdout
pub fn print(document: &ConfigDocument, builtins: &BuiltinRegistry) {
    let lines = render(document, builtins);
    let jobs = document.jobs().count();

    colors::print_section("Available jobs");
    if jobs == 0 {
        println!("  {}", colors::dimmed("(none)"));
    }
    for (index, line) in lines.iter().enumerate() {
        if index == jobs {
            println!();
            colors::print_section("Builtins");
        }
        println!("{line}");
    }
}
