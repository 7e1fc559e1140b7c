//! Per-blob scan: device-tree nodes to module names and firmware paths.
//!
//! One call of [`scan_dtb`] handles one DTB file end to end: read it
//! fully into memory, validate, walk every node, and fold discoveries
//! into the two accumulator sets. The blob's memory is released when the
//! call returns; nothing is retained across files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::fdt::{self, Fdt, FdtError};
use crate::firmware::firmware_path;
use crate::index::ModuleIndex;
use crate::set::OrderedSet;

/// Modalias queries for device-tree hardware carry a wildcard node/type
/// match and an exact compatible-value match.
const OF_MODALIAS_PREFIX: &str = "of:N*T*C";

/// Why one DTB file could not be scanned.
///
/// Both variants are per-file: the caller logs them and moves on to the
/// next blob. When `scan_dtb` fails, neither set has been touched for
/// this file.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The file could not be opened or read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file's content is not a valid device-tree blob.
    #[error("{path}: {source}")]
    Fdt {
        path: PathBuf,
        #[source]
        source: FdtError,
    },
}

/// Scan one DTB file, folding results into the accumulator sets.
///
/// For every node of the tree, in the blob's native depth-first order:
///
/// - each entry of its `compatible` property becomes one modalias query
///   (`of:N*T*C<entry>`); every module the index resolves for it is
///   added to `modules`;
/// - its `firmware-name` property, when present, becomes a
///   `/lib/firmware/<name>` entry in `firmware`.
///
/// A node may have both properties, either, or neither. Both sets grow
/// monotonically; duplicates are absorbed, existing entries are never
/// reordered.
pub fn scan_dtb(
    path: &Path,
    index: &dyn ModuleIndex,
    modules: &mut OrderedSet,
    firmware: &mut OrderedSet,
) -> Result<(), ScanError> {
    let blob = fs::read(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let tree = Fdt::new(&blob).map_err(|source| ScanError::Fdt {
        path: path.to_path_buf(),
        source,
    })?;

    for node in tree.nodes() {
        if let Some(value) = node.property("compatible") {
            for compatible in fdt::strings(value) {
                let alias = format!("{OF_MODALIAS_PREFIX}{compatible}");
                for name in index.lookup_alias(&alias) {
                    if modules.add(&name) {
                        debug!(
                            "{}: node {:?} -> {} (via {})",
                            path.display(),
                            node.name,
                            name,
                            alias
                        );
                    }
                }
            }
        }

        if let Some(value) = node.property("firmware-name") {
            if let Some(name) = fdt::single_string(value) {
                firmware.add(firmware_path(name));
            }
        }
    }

    Ok(())
}
