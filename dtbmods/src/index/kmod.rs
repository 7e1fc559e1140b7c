//! File-backed module index over a depmod-managed directory.
//!
//! Reads the two generated files an initramfs builder can rely on being
//! present after `depmod` has run:
//!
//! - `modules.alias` — `alias <fnmatch-pattern> <module>` lines, matched
//!   against modalias queries.
//! - `modules.dep` — `<relative/path/to.ko>: <deps...>` lines, used to
//!   locate a module's object file for metadata extraction.
//!
//! Alias patterns use shell fnmatch syntax (`*`, `?`, `[...]`), which is
//! exactly what [`glob::Pattern`] implements for plain strings.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, warn};

use super::modinfo;
use super::ModuleIndex;

/// Errors opening a module directory.
#[derive(Debug, Error)]
pub enum IndexError {
    /// `modules.alias` is missing or unreadable.
    #[error("cannot read {path}: {source}")]
    AliasDb {
        path: PathBuf,
        source: io::Error,
    },
}

/// One `modules.alias` entry: a compiled pattern and the module it names.
struct AliasEntry {
    pattern: Pattern,
    module: String,
}

/// Module index backed by a `/lib/modules/<version>` directory.
pub struct KmodIndex {
    dir: PathBuf,
    aliases: Vec<AliasEntry>,
    /// Normalized module name → path of its object file, relative to `dir`.
    dep_paths: HashMap<String, PathBuf>,
}

impl KmodIndex {
    /// Open the index for a module directory.
    ///
    /// `modules.alias` is required; `modules.dep` is optional and its
    /// absence only means every metadata lookup will miss.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let dir = dir.into();

        let alias_path = dir.join("modules.alias");
        let alias_text = fs::read_to_string(&alias_path).map_err(|source| IndexError::AliasDb {
            path: alias_path.clone(),
            source,
        })?;
        let aliases = parse_aliases(&alias_text);

        let dep_path = dir.join("modules.dep");
        let dep_paths = match fs::read_to_string(&dep_path) {
            Ok(text) => parse_deps(&text),
            Err(e) => {
                warn!(
                    "cannot read {}: {}; module metadata will be unavailable",
                    dep_path.display(),
                    e
                );
                HashMap::new()
            }
        };

        debug!(
            "opened module index at {}: {} aliases, {} modules with known paths",
            dir.display(),
            aliases.len(),
            dep_paths.len()
        );

        Ok(Self {
            dir,
            aliases,
            dep_paths,
        })
    }

    /// The module directory this index was opened on.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ModuleIndex for KmodIndex {
    fn lookup_alias(&self, alias: &str) -> Vec<String> {
        let mut matches = Vec::new();
        for entry in &self.aliases {
            if entry.pattern.matches(alias) && !matches.contains(&entry.module) {
                matches.push(entry.module.clone());
            }
        }
        matches
    }

    fn module_info(&self, name: &str) -> Option<Vec<(String, String)>> {
        let rel = self.dep_paths.get(&normalize_name(name))?;
        let path = self.dir.join(rel);
        match modinfo::read(&path) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("no metadata for {}: {}", name, e);
                None
            }
        }
    }
}

/// Parse `modules.alias` text into compiled entries.
///
/// Lines that are blank, comments, or not `alias <pattern> <module>` are
/// ignored; a pattern glob rejects is skipped with a log line.
fn parse_aliases(text: &str) -> Vec<AliasEntry> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        if fields.next() != Some("alias") {
            continue;
        }
        let (Some(pattern), Some(module)) = (fields.next(), fields.next()) else {
            continue;
        };
        match Pattern::new(pattern) {
            Ok(pattern) => entries.push(AliasEntry {
                pattern,
                module: normalize_name(module),
            }),
            Err(e) => debug!("skipping unparsable alias pattern {:?}: {}", pattern, e),
        }
    }
    entries
}

/// Parse `modules.dep` text into a name → relative-path map.
fn parse_deps(text: &str) -> HashMap<String, PathBuf> {
    let mut paths = HashMap::new();
    for line in text.lines() {
        let Some((rel, _deps)) = line.split_once(':') else {
            continue;
        };
        let rel = rel.trim();
        if rel.is_empty() {
            continue;
        }
        if let Some(name) = module_name_from_path(rel) {
            paths.insert(name, PathBuf::from(rel));
        }
    }
    paths
}

/// Module name from an object-file path: the file stem with compression
/// suffixes stripped, normalized.
fn module_name_from_path(rel: &str) -> Option<String> {
    let file = rel.rsplit('/').next()?;
    let stem = file
        .strip_suffix(".gz")
        .or_else(|| file.strip_suffix(".xz"))
        .or_else(|| file.strip_suffix(".zst"))
        .unwrap_or(file);
    let stem = stem.strip_suffix(".ko")?;
    if stem.is_empty() {
        return None;
    }
    Some(normalize_name(stem))
}

/// Kmod treats `-` and `_` as the same character in module names and
/// reports names with underscores; do the same.
pub(crate) fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}
