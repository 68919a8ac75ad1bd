// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Project configuration documents
//!
//! A project file is a TOML document whose top-level tables are jobs. The
//! reserved keys `base`, `default_job` and `shell` configure the document
//! itself. `base` names another document (relative to the one declaring it)
//! that this one derives from; the whole chain is deep-merged into a single
//! [`ConfigDocument`] once at startup.

mod merge;

pub use merge::{deep_merge, merge_layers, merge_tables, without_keys};

use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use toml::{Table, Value};

use crate::errors::{CrunError, CrunResult};

/// Filename looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "project.toml";

/// Top-level keys that configure the document rather than name a job
pub const META_KEYS: &[&str] = &["base", "default_job", "shell"];

/// Shell used for commands unless the document sets `shell`
pub const DEFAULT_SHELL: &str = "sh";

/// Source of raw documents
///
/// `Ok(None)` means the document does not exist; any other failure to
/// produce a table is an error.
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> CrunResult<Option<Table>>;
}

/// Loads documents from the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl DocumentLoader for FsLoader {
    fn load(&self, path: &Path) -> CrunResult<Option<Table>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CrunError::FileReadError {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                })
            }
        };

        content
            .parse::<Table>()
            .map(Some)
            .map_err(|e| CrunError::parse(path, e))
    }
}

/// Document-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub default_job: Option<String>,

    #[serde(default)]
    pub shell: Option<String>,
}

/// A fully merged, read-only configuration document
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    table: Table,
    meta: Meta,
    /// Documents that were merged, least derived first
    chain: Vec<PathBuf>,
}

impl ConfigDocument {
    /// Load `path` and everything it inherits from
    pub fn load(path: &Path, loader: &dyn DocumentLoader) -> CrunResult<Self> {
        let mut chain: Vec<PathBuf> = Vec::new();
        let mut layers: Vec<Table> = Vec::new();
        let mut current = normalize(path);
        let mut referenced_by: Option<PathBuf> = None;

        loop {
            if chain.contains(&current) {
                chain.push(current);
                return Err(CrunError::BaseCycle { chain });
            }

            tracing::debug!("Loading configuration {}", current.display());

            let Some(table) = loader.load(&current)? else {
                return Err(match referenced_by {
                    Some(referenced_by) => CrunError::BaseNotFound {
                        path: current,
                        referenced_by,
                    },
                    None => CrunError::ConfigNotFound {
                        searched_from: current
                            .parent()
                            .map(Path::to_path_buf)
                            .unwrap_or_default(),
                        filename: current,
                    },
                });
            };

            let base = match table.get("base") {
                None => None,
                Some(Value::String(base)) => Some(base.clone()),
                Some(_) => {
                    return Err(CrunError::InvalidMeta {
                        key: "base".into(),
                        reason: format!("must be a path string (in {})", current.display()),
                    })
                }
            };

            chain.push(current.clone());
            layers.push(table);

            let Some(base) = base else { break };
            let dir = current.parent().unwrap_or_else(|| Path::new(""));
            let next = normalize(&dir.join(base));
            referenced_by = Some(std::mem::replace(&mut current, next));
        }

        chain.reverse();
        layers.reverse();
        let merged = without_keys(merge_layers(layers), &["base"]);

        let mut document = Self::from_table(merged)?;
        document.chain = chain;
        Ok(document)
    }

    /// Build a document from an already merged table
    pub fn from_table(table: Table) -> CrunResult<Self> {
        let meta = extract_meta(&table)?;
        Ok(Self {
            table,
            meta,
            chain: Vec::new(),
        })
    }

    /// Parse a single document without following `base`
    pub fn from_toml(content: &str) -> CrunResult<Self> {
        let table = content
            .parse::<Table>()
            .map_err(|e| CrunError::parse(Path::new("<inline>"), e))?;
        Self::from_table(without_keys(table, &["base"]))
    }

    /// Settings of the job called exactly `name`
    pub fn job(&self, name: &str) -> Option<&Table> {
        if META_KEYS.contains(&name) {
            return None;
        }
        self.table.get(name).and_then(Value::as_table)
    }

    /// All jobs in document order
    pub fn jobs(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.table.iter().filter_map(|(name, value)| {
            if META_KEYS.contains(&name.as_str()) {
                return None;
            }
            value.as_table().map(|table| (name.as_str(), table))
        })
    }

    /// Aliases a job declares
    pub fn aliases_of<'a>(&self, settings: &'a Table) -> Vec<&'a str> {
        settings
            .get("aliases")
            .and_then(Value::as_array)
            .map(|aliases| aliases.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Name of the first job (in document order) that declares `alias`
    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        self.jobs()
            .find(|(_, settings)| self.aliases_of(settings).contains(&alias))
            .map(|(name, _)| name)
    }

    /// Job to run when none is named on the command line
    pub fn default_job(&self) -> Option<&str> {
        self.meta.default_job.as_deref()
    }

    /// Shell program used for commands
    pub fn shell(&self) -> &str {
        self.meta.shell.as_deref().unwrap_or(DEFAULT_SHELL)
    }

    /// Documents that were merged into this one, least derived first
    pub fn chain(&self) -> &[PathBuf] {
        &self.chain
    }

    /// Directory of the most derived document
    pub fn directory(&self) -> Option<&Path> {
        self.chain.last().and_then(|path| path.parent())
    }
}

fn extract_meta(table: &Table) -> CrunResult<Meta> {
    let meta: Table = table
        .iter()
        .filter(|(key, _)| META_KEYS.contains(&key.as_str()) && key.as_str() != "base")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Value::Table(meta)
        .try_into()
        .map_err(|e: toml::de::Error| CrunError::InvalidMeta {
            key: "default_job/shell".into(),
            reason: e.to_string(),
        })
}

/// Find `filename` in `start` or the closest ancestor containing it
pub fn discover(start: &Path, filename: &Path) -> CrunResult<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(filename))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| CrunError::ConfigNotFound {
            filename: filename.to_path_buf(),
            searched_from: start.to_path_buf(),
        })
}

/// Fold `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory documents keyed by path
    #[derive(Default)]
    pub(crate) struct MemoryLoader {
        files: HashMap<PathBuf, String>,
    }

    impl MemoryLoader {
        pub(crate) fn with(mut self, path: &str, content: &str) -> Self {
            self.files.insert(PathBuf::from(path), content.to_string());
            self
        }
    }

    impl DocumentLoader for MemoryLoader {
        fn load(&self, path: &Path) -> CrunResult<Option<Table>> {
            self.files
                .get(path)
                .map(|content| content.parse::<Table>().map_err(|e| CrunError::parse(path, e)))
                .transpose()
        }
    }

    #[test]
    fn test_derived_scalar_wins() {
        let loader = MemoryLoader::default()
            .with("/p/a.toml", "[build]\ncommand = \"make\"")
            .with("/p/b.toml", "base = \"a.toml\"\n[build]\ncommand = \"cargo build\"");

        let doc = ConfigDocument::load(Path::new("/p/b.toml"), &loader).unwrap();
        assert_eq!(doc.job("build").unwrap()["command"].as_str(), Some("cargo build"));
        assert_eq!(
            doc.chain(),
            [PathBuf::from("/p/a.toml"), PathBuf::from("/p/b.toml")]
        );
    }

    #[test]
    fn test_base_only_keys_survive() {
        let loader = MemoryLoader::default()
            .with(
                "/p/a.toml",
                "[test]\ncommand = \"pytest\"\n[test.options]\nverbose = true\nworkers = 4",
            )
            .with("/p/b.toml", "base = \"a.toml\"\n[test.options]\nworkers = 8\n[lint]\ncommand = \"ruff\"");

        let doc = ConfigDocument::load(Path::new("/p/b.toml"), &loader).unwrap();
        let test = doc.job("test").unwrap();
        assert_eq!(test["command"].as_str(), Some("pytest"));
        assert_eq!(test["options"]["verbose"].as_bool(), Some(true));
        assert_eq!(test["options"]["workers"].as_integer(), Some(8));
        assert!(doc.job("lint").is_some());
    }

    #[test]
    fn test_sequences_are_replaced() {
        let loader = MemoryLoader::default()
            .with("/p/a.toml", "[ci]\npipeline = [\"lint\", \"test\"]")
            .with("/p/b.toml", "base = \"a.toml\"\n[ci]\npipeline = [\"test\"]");

        let doc = ConfigDocument::load(Path::new("/p/b.toml"), &loader).unwrap();
        assert_eq!(doc.job("ci").unwrap()["pipeline"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_base_is_relative_to_declaring_document() {
        let loader = MemoryLoader::default()
            .with("/shared/root.toml", "default_job = \"build\"")
            .with("/shared/mid.toml", "base = \"root.toml\"")
            .with("/p/project.toml", "base = \"../shared/./mid.toml\"");

        let doc = ConfigDocument::load(Path::new("/p/project.toml"), &loader).unwrap();
        assert_eq!(doc.default_job(), Some("build"));
        assert_eq!(doc.chain().len(), 3);
        assert_eq!(doc.directory(), Some(Path::new("/p")));
    }

    #[test]
    fn test_cycle_is_config_error() {
        let loader = MemoryLoader::default()
            .with("/p/a.toml", "base = \"b.toml\"")
            .with("/p/b.toml", "base = \"a.toml\"");

        let err = ConfigDocument::load(Path::new("/p/a.toml"), &loader).unwrap_err();
        match err {
            CrunError::BaseCycle { chain } => {
                assert_eq!(chain.first(), chain.last());
                assert_eq!(chain.len(), 3);
            }
            other => panic!("expected BaseCycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_base_is_cycle() {
        let loader = MemoryLoader::default().with("/p/a.toml", "base = \"./a.toml\"");
        assert!(matches!(
            ConfigDocument::load(Path::new("/p/a.toml"), &loader),
            Err(CrunError::BaseCycle { .. })
        ));
    }

    #[test]
    fn test_missing_base_names_path() {
        let loader = MemoryLoader::default().with("/p/b.toml", "base = \"gone.toml\"");

        let err = ConfigDocument::load(Path::new("/p/b.toml"), &loader).unwrap_err();
        match err {
            CrunError::BaseNotFound { path, referenced_by } => {
                assert_eq!(path, PathBuf::from("/p/gone.toml"));
                assert_eq!(referenced_by, PathBuf::from("/p/b.toml"));
            }
            other => panic!("expected BaseNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_non_string_base_rejected() {
        let loader = MemoryLoader::default().with("/p/a.toml", "base = 3");
        assert!(matches!(
            ConfigDocument::load(Path::new("/p/a.toml"), &loader),
            Err(CrunError::InvalidMeta { .. })
        ));
    }

    #[test]
    fn test_parent_documents_untouched() {
        let loader = MemoryLoader::default()
            .with("/p/a.toml", "[build]\ncommand = \"make\"")
            .with("/p/b.toml", "base = \"a.toml\"\n[build]\ncommand = \"ninja\"");

        let base = ConfigDocument::load(Path::new("/p/a.toml"), &loader).unwrap();
        let _derived = ConfigDocument::load(Path::new("/p/b.toml"), &loader).unwrap();
        let again = ConfigDocument::load(Path::new("/p/a.toml"), &loader).unwrap();
        assert_eq!(base, again);
    }

    #[test]
    fn test_jobs_skip_meta_and_scalars() {
        let doc = ConfigDocument::from_toml(
            "default_job = \"b\"\nshell = \"bash\"\nstray = 1\n[a]\ncommand = \"x\"\n[b]\ncommand = \"y\"\naliases = [\"bee\"]",
        )
        .unwrap();

        let names: Vec<_> = doc.jobs().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(doc.alias_target("bee"), Some("b"));
        assert_eq!(doc.alias_target("a"), None);
        assert_eq!(doc.shell(), "bash");
        assert!(doc.job("default_job").is_none());
    }

    #[test]
    fn test_discover_walks_upwards() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("project.toml"), "").unwrap();

        let found = discover(&nested, Path::new(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(found, dir.path().join("project.toml"));
    }

    #[test]
    fn test_discover_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover(dir.path(), Path::new("no-such-crun-file.toml")),
            Err(CrunError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_fs_loader_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.toml");
        std::fs::write(&path, "[build\ncommand = ").unwrap();

        assert!(matches!(FsLoader.load(&path), Err(CrunError::Parse { .. })));
        assert!(FsLoader.load(&dir.path().join("missing.toml")).unwrap().is_none());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c.toml")), PathBuf::from("/a/c.toml"));
        assert_eq!(normalize(Path::new("../../x")), PathBuf::from("../../x"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
    }
}
