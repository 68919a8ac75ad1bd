// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Command template interpolation
//!
//! Templates are scanned once into literal runs and `{...}` placeholders.
//! Each placeholder is looked up and the pieces are joined; substituted text
//! is never scanned again, so option values cannot inject placeholders.
//!
//! | Placeholder  | Replaced by                                          |
//! |--------------|------------------------------------------------------|
//! | `{$NAME}`    | job environment, then the process environment        |
//! | `{#N}`       | N-th positional argument (1-based)                   |
//! | `{#0}`       | all positional arguments, space separated            |
//! | `{name}`     | option `name`                                        |
//! | `{a.b}`      | value at a dotted path in the job settings           |
//!
//! `{{` and `}}` produce literal braces.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use toml::Value;

use crate::errors::{CrunError, CrunResult};
use crate::job::{scalar_text, ResolvedJob};

/// A piece of a scanned template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'t> {
    Literal(String),
    Placeholder(&'t str),
}

/// Split a template into literal runs and placeholders
///
/// Errors carry the reason the template is malformed.
pub fn scan(template: &str) -> Result<Vec<Segment<'_>>, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '{' => {
                let start = index + 1;
                let end = template[start..]
                    .find(|c| c == '{' || c == '}')
                    .map(|offset| start + offset)
                    .filter(|&end| template[end..].starts_with('}'))
                    .ok_or_else(|| format!("unterminated placeholder at position {index}"))?;

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(&template[start..end]));

                while chars.next_if(|&(i, _)| i <= end).is_some() {}
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(format!("unmatched '}}' at position {index}")),
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Render the command template of `job`
///
/// `process_env` is the environment crun was started with; `{$NAME}` falls
/// back to it when the job does not set `NAME` itself. Inherited values that
/// are not valid UTF-8 are substituted lossily.
pub fn render(
    template: &str,
    job: &ResolvedJob,
    process_env: &BTreeMap<OsString, OsString>,
) -> CrunResult<String> {
    let segments = scan(template).map_err(|reason| CrunError::malformed(&job.name, reason))?;

    let mut rendered = String::with_capacity(template.len());
    for segment in segments {
        match segment {
            Segment::Literal(text) => rendered.push_str(&text),
            Segment::Placeholder(name) => rendered.push_str(&lookup(name, job, process_env)?),
        }
    }
    Ok(rendered)
}

fn lookup(
    placeholder: &str,
    job: &ResolvedJob,
    process_env: &BTreeMap<OsString, OsString>,
) -> CrunResult<String> {
    let unresolved = || CrunError::unresolved(placeholder, &job.name);

    if placeholder.is_empty() {
        return Err(CrunError::malformed(&job.name, "empty placeholder {}"));
    }

    if let Some(var) = placeholder.strip_prefix('$') {
        if var.is_empty() {
            return Err(CrunError::malformed(&job.name, "missing variable name in {$}"));
        }
        return job
            .environment_var(var)
            .map(str::to_string)
            .or_else(|| {
                process_env
                    .get(OsStr::new(var))
                    .map(|value| value.to_string_lossy().into_owned())
            })
            .ok_or_else(unresolved);
    }

    if let Some(index) = placeholder.strip_prefix('#') {
        let index: usize = index.parse().map_err(|_| {
            CrunError::malformed(
                &job.name,
                format!("{{{placeholder}}} needs a number after '#'"),
            )
        })?;
        return match index {
            0 => Ok(job.positional.join(" ")),
            n => job.positional.get(n - 1).cloned().ok_or_else(unresolved),
        };
    }

    if placeholder.chars().all(|c| c.is_ascii_digit()) {
        return Err(CrunError::malformed(
            &job.name,
            format!("use {{#{placeholder}}} for positional arguments"),
        ));
    }

    let value = if placeholder.contains('.') {
        settings_path(job, placeholder)
    } else {
        job.options.get(placeholder)
    };

    let value = value.ok_or_else(unresolved)?;
    text_of(value).ok_or_else(|| {
        CrunError::malformed(
            &job.name,
            format!("{{{placeholder}}} refers to a table, not a value"),
        )
    })
}

fn settings_path<'j>(job: &'j ResolvedJob, path: &str) -> Option<&'j Value> {
    let (parents, leaf) = path.rsplit_once('.')?;
    let mut table = &job.settings;
    for key in parents.split('.') {
        table = table.get(key)?.as_table()?;
    }
    table.get(leaf)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(" ")),
        scalar => scalar_text(scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Table;

    fn job(settings: &str, positional: &[&str]) -> ResolvedJob {
        let positional: Vec<String> = positional.iter().map(|s| s.to_string()).collect();
        ResolvedJob::from_settings("job", settings.parse::<Table>().unwrap(), false, &positional)
            .unwrap()
    }

    fn no_env() -> BTreeMap<OsString, OsString> {
        BTreeMap::new()
    }

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<OsString, OsString> {
        pairs
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }

    #[test]
    fn test_renders_all_placeholder_kinds() {
        let job = job(
            "command = \"x\"\n[options]\nbar = \"bat\"\n[environment]\nHOME = \"/x\"",
            &["spam", "ham"],
        );
        let rendered = render("echo {$HOME} {#1} {#2} {bar}", &job, &no_env()).unwrap();
        assert_eq!(rendered, "echo /x spam ham bat");
    }

    #[test]
    fn test_all_positionals() {
        let job = job("command = \"x\"", &["a", "b c"]);
        assert_eq!(render("run {#0}", &job, &no_env()).unwrap(), "run a b c");
        assert_eq!(render("run {#0}", &self::job("command = \"x\"", &[]), &no_env()).unwrap(), "run ");
    }

    #[test]
    fn test_process_environment_fallback() {
        let job = job("command = \"x\"\n[environment]\nUSER = \"job\"", &[]);
        let env = env(&[("USER", "process"), ("SHELL", "/bin/zsh")]);
        assert_eq!(
            render("{$USER} {$SHELL}", &job, &env).unwrap(),
            "job /bin/zsh"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_process_value_renders_lossily() {
        use std::os::unix::ffi::OsStringExt;

        let job = job("command = \"x\"", &[]);
        let env = BTreeMap::from([(OsString::from("RAW"), OsString::from_vec(vec![b'a', 0xff]))]);
        assert_eq!(render("{$RAW}", &job, &env).unwrap(), "a\u{FFFD}");
    }

    #[test]
    fn test_booleans_and_numbers_render_textually() {
        let job = job("command = \"x\"\n[options]\ntree = true\nlevel = 3\nratio = 0.5", &[]);
        assert_eq!(
            render("{tree} {level} {ratio}", &job, &no_env()).unwrap(),
            "true 3 0.5"
        );
    }

    #[test]
    fn test_dotted_paths_read_settings() {
        let job = job(
            "command = \"x\"\ntarget = \"wasm32\"\nlist = [\"a\", \"b\"]\n[deploy]\nhost = \"example.org\"\n[options]\nbar = 1",
            &[],
        );
        assert_eq!(
            render("{deploy.host} {options.bar}", &job, &no_env()).unwrap(),
            "example.org 1"
        );
        // plain names only look at options
        assert!(render("{target}", &job, &no_env()).is_err());
    }

    #[test]
    fn test_escaped_braces() {
        let job = job("command = \"x\"\n[options]\nn = \"v\"", &[]);
        assert_eq!(
            render("awk '{{print $1}}' {n}", &job, &no_env()).unwrap(),
            "awk '{print $1}' v"
        );
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let job = job("command = \"x\"\n[options]\nevil = \"{$HOME}\"", &[]);
        let env = env(&[("HOME", "/root")]);
        assert_eq!(render("echo {evil}", &job, &env).unwrap(), "echo {$HOME}");
    }

    #[test]
    fn test_unresolved_placeholders() {
        let job = job("command = \"x\"", &["one"]);
        for template in ["{missing}", "{#2}", "{$CRUN_SURELY_UNSET}", "{a.b}"] {
            match render(template, &job, &no_env()) {
                Err(CrunError::UnresolvedPlaceholder { placeholder, .. }) => {
                    assert_eq!(format!("{{{placeholder}}}"), template)
                }
                other => panic!("{template}: expected UnresolvedPlaceholder, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_malformed_templates() {
        let job = job("command = \"x\"\n[opt]\nnested = 1", &[]);
        for template in ["{}", "{1}", "{#x}", "{$}", "echo {oops", "a } b", "{a{b}", "{opt.x.y}z{"] {
            assert!(
                matches!(
                    render(template, &job, &no_env()),
                    Err(CrunError::MalformedTemplate { .. })
                ),
                "{template} should be malformed"
            );
        }
    }

    #[test]
    fn test_scan_segments() {
        assert_eq!(
            scan("a{b}c{{").unwrap(),
            vec![
                Segment::Literal("a".into()),
                Segment::Placeholder("b"),
                Segment::Literal("c{".into()),
            ]
        );
        assert!(scan("").unwrap().is_empty());
    }
}
