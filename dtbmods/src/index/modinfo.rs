//! `.modinfo` extraction from kernel module objects.
//!
//! A `.ko` file is an ELF relocatable whose `.modinfo` section is a pack
//! of NUL-terminated `key=value` strings (`license=GPL`,
//! `firmware=chip/fw.bin`, ...). Keys repeat, so the result is an ordered
//! list of pairs rather than a map. Gzip-compressed modules are read
//! transparently; other compression schemes are reported as unreadable
//! and the caller skips the module.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;
use xmas_elf::ElfFile;

/// Why a module's metadata could not be read.
#[derive(Debug, Error)]
pub enum ModinfoError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("compressed with an unsupported scheme ({0})")]
    UnsupportedCompression(&'static str),

    #[error("not a readable ELF object: {0}")]
    Elf(&'static str),
}

/// Read the `key=value` metadata pairs of the module object at `path`.
///
/// A module without a `.modinfo` section yields an empty list.
pub fn read(path: &Path) -> Result<Vec<(String, String)>, ModinfoError> {
    let data = read_object(path)?;
    let elf = ElfFile::new(&data).map_err(ModinfoError::Elf)?;
    let Some(section) = elf.find_section_by_name(".modinfo") else {
        return Ok(Vec::new());
    };
    let raw = section.raw_data(&elf);
    Ok(parse(raw))
}

/// Read the object file, gunzipping `.gz` transparently.
fn read_object(path: &Path) -> Result<Vec<u8>, ModinfoError> {
    let ext = path.extension().and_then(|e| e.to_str());
    match ext {
        Some("gz") => {
            let file = fs::File::open(path)?;
            let mut data = Vec::new();
            GzDecoder::new(file).read_to_end(&mut data)?;
            Ok(data)
        }
        Some("xz") => Err(ModinfoError::UnsupportedCompression("xz")),
        Some("zst") => Err(ModinfoError::UnsupportedCompression("zstd")),
        _ => Ok(fs::read(path)?),
    }
}

/// Split raw `.modinfo` section content into key/value pairs.
///
/// Entries without an `=` and empty entries are dropped; order and
/// repeated keys are preserved.
fn parse(raw: &[u8]) -> Vec<(String, String)> {
    raw.split(|&b| b == 0)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let entry = std::str::from_utf8(entry).ok()?;
            let (key, value) = entry.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
