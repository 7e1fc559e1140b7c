//! Flattened device-tree blob reader.
//!
//! A minimal, read-only view over a compiled device-tree blob (DTB) in
//! the flattened format produced by `dtc`. Only what the scanner needs is
//! implemented: header validation, a depth-first walk over every node,
//! and property lookup by name. Nothing is copied out of the blob; all
//! accessors borrow from the caller's buffer.
//!
//! # Blob layout
//!
//! ```text
//! +-------------------+ 0
//! | header (40 bytes) |   big-endian u32 fields, magic 0xd00dfeed
//! +-------------------+ off_dt_struct
//! | structure block   |   token stream: BEGIN_NODE / PROP / END_NODE / END
//! +-------------------+ off_dt_strings
//! | strings block     |   NUL-terminated property names
//! +-------------------+ totalsize
//! ```
//!
//! Versions 16 and 17 are accepted, matching what libfdt's header check
//! allows for read-only access.

use thiserror::Error;

/// "d00dfeed", the DTB magic number.
const FDT_MAGIC: u32 = 0xd00d_feed;

/// Header size shared by all supported versions.
const FDT_HEADER_SIZE: usize = 40;

/// Oldest blob version this reader understands.
const FDT_FIRST_SUPPORTED_VERSION: u32 = 16;

/// Newest blob version this reader understands.
const FDT_LAST_SUPPORTED_VERSION: u32 = 17;

// Structure-block tokens.
const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_NOP: u32 = 0x4;
const FDT_END: u32 = 0x9;

/// Errors produced by header validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FdtError {
    /// The buffer is shorter than a DTB header.
    #[error("blob too small for a device-tree header ({0} bytes)")]
    Truncated(usize),

    /// The magic number does not identify a DTB.
    #[error("bad magic 0x{0:08x}, not a device-tree blob")]
    BadMagic(u32),

    /// The blob's version range is outside what this reader supports.
    #[error("unsupported device-tree version {version} (last compatible {last_comp})")]
    UnsupportedVersion { version: u32, last_comp: u32 },

    /// A size or offset field points outside the buffer.
    #[error("device-tree header describes blocks outside the blob")]
    BlockOutOfBounds,
}

/// A validated, borrowed view of a flattened device-tree blob.
#[derive(Debug)]
pub struct Fdt<'a> {
    data: &'a [u8],
    struct_start: usize,
    struct_end: usize,
    strings_start: usize,
    strings_end: usize,
}

impl<'a> Fdt<'a> {
    /// Validate the header and build a view over `data`.
    ///
    /// Checks the magic number, the supported version range, that the
    /// declared total size fits the buffer, and that the structure and
    /// strings blocks lie within the declared total size.
    pub fn new(data: &'a [u8]) -> Result<Self, FdtError> {
        if data.len() < FDT_HEADER_SIZE {
            return Err(FdtError::Truncated(data.len()));
        }

        let magic = read_be32(data, 0);
        if magic != FDT_MAGIC {
            return Err(FdtError::BadMagic(magic));
        }

        let totalsize = read_be32(data, 4) as usize;
        let off_dt_struct = read_be32(data, 8) as usize;
        let off_dt_strings = read_be32(data, 12) as usize;
        let version = read_be32(data, 20);
        let last_comp = read_be32(data, 24);
        let size_dt_strings = read_be32(data, 32) as usize;

        if version < FDT_FIRST_SUPPORTED_VERSION || last_comp > FDT_LAST_SUPPORTED_VERSION {
            return Err(FdtError::UnsupportedVersion { version, last_comp });
        }

        if totalsize < FDT_HEADER_SIZE || totalsize > data.len() {
            return Err(FdtError::BlockOutOfBounds);
        }

        // size_dt_struct exists from version 17 on; older blobs run the
        // structure block up to the strings block.
        let size_dt_struct = if version >= 17 {
            read_be32(data, 36) as usize
        } else {
            totalsize.saturating_sub(off_dt_struct)
        };

        let struct_end = off_dt_struct
            .checked_add(size_dt_struct)
            .ok_or(FdtError::BlockOutOfBounds)?;
        let strings_end = off_dt_strings
            .checked_add(size_dt_strings)
            .ok_or(FdtError::BlockOutOfBounds)?;

        if off_dt_struct % 4 != 0 || struct_end > totalsize || strings_end > totalsize {
            return Err(FdtError::BlockOutOfBounds);
        }

        Ok(Self {
            data,
            struct_start: off_dt_struct,
            struct_end: struct_end.min(totalsize),
            strings_start: off_dt_strings,
            strings_end: strings_end.min(totalsize),
        })
    }

    /// Walk every node in the tree, in the blob's native order.
    ///
    /// The structure block lists nodes depth-first, so this yields a
    /// parent before its children and siblings in declaration order. The
    /// root node is included. A truncated or corrupt structure block ends
    /// the walk early rather than erroring; header validation is the only
    /// format gate.
    pub fn nodes(&'a self) -> Nodes<'a> {
        Nodes {
            fdt: self,
            pos: self.struct_start,
            done: false,
        }
    }

    /// Read one big-endian token at `pos`, if in bounds.
    fn token(&self, pos: usize) -> Option<u32> {
        if pos + 4 > self.struct_end || pos + 4 > self.data.len() {
            return None;
        }
        Some(read_be32(self.data, pos))
    }

    /// Length of the NUL-terminated string at `pos`, bounded by the
    /// structure block.
    fn cstr_len(&self, pos: usize) -> Option<usize> {
        let end = self.struct_end.min(self.data.len());
        self.data[pos..end].iter().position(|&b| b == 0)
    }

    /// Property name from the strings block at `offset`.
    fn string(&self, offset: usize) -> Option<&'a str> {
        let start = self.strings_start.checked_add(offset)?;
        let end = self.strings_end.min(self.data.len());
        if start >= end {
            return None;
        }
        let nul = self.data[start..end].iter().position(|&b| b == 0)?;
        std::str::from_utf8(&self.data[start..start + nul]).ok()
    }
}

/// Iterator over every node of an [`Fdt`], depth-first.
pub struct Nodes<'a> {
    fdt: &'a Fdt<'a>,
    pos: usize,
    done: bool,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Node<'a>> {
        if self.done {
            return None;
        }
        loop {
            let token = match self.fdt.token(self.pos) {
                Some(t) => t,
                None => {
                    self.done = true;
                    return None;
                }
            };
            match token {
                FDT_BEGIN_NODE => {
                    let name_start = self.pos + 4;
                    let name_len = match self.fdt.cstr_len(name_start) {
                        Some(n) => n,
                        None => {
                            self.done = true;
                            return None;
                        }
                    };
                    let name = std::str::from_utf8(
                        &self.fdt.data[name_start..name_start + name_len],
                    )
                    .unwrap_or("");
                    // Name plus terminator, padded to the next token.
                    let body = name_start + align4(name_len + 1);
                    self.pos = body;
                    return Some(Node {
                        fdt: self.fdt,
                        name,
                        body,
                    });
                }
                FDT_END_NODE | FDT_NOP => {
                    self.pos += 4;
                }
                FDT_PROP => {
                    let len = self.fdt.token(self.pos + 4)? as usize;
                    self.pos += 12 + align4(len);
                }
                FDT_END => {
                    self.done = true;
                    return None;
                }
                _ => {
                    // Unknown token; the stream cannot be walked further.
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

/// One node of the tree, positioned at the start of its property list.
pub struct Node<'a> {
    fdt: &'a Fdt<'a>,
    /// Node name as written in the blob (empty for the root node).
    pub name: &'a str,
    body: usize,
}

impl<'a> Node<'a> {
    /// Raw bytes of the property `name`, if this node declares it.
    ///
    /// Properties always precede subnodes in the structure block, so the
    /// scan stops at the first `BEGIN_NODE` or `END_NODE` token; a child
    /// node's properties are never visible through its parent.
    pub fn property(&self, name: &str) -> Option<&'a [u8]> {
        let mut pos = self.body;
        loop {
            match self.fdt.token(pos)? {
                FDT_PROP => {
                    let len = self.fdt.token(pos + 4)? as usize;
                    let name_off = self.fdt.token(pos + 8)? as usize;
                    let data_start = pos + 12;
                    let data_end = data_start.checked_add(len)?;
                    if data_end > self.fdt.data.len() {
                        return None;
                    }
                    if self.fdt.string(name_off) == Some(name) {
                        return Some(&self.fdt.data[data_start..data_end]);
                    }
                    pos = data_start + align4(len);
                }
                FDT_NOP => pos += 4,
                _ => return None,
            }
        }
    }
}

/// Decode a multi-string property value into its entries.
///
/// A `compatible` value is a sequence of NUL-terminated strings packed
/// into one buffer. Entries are produced by repeated scan-to-NUL, bounded
/// by the declared length; a final entry missing its terminator is
/// yielded truncated at the buffer end rather than over-read. Empty and
/// non-UTF-8 segments are dropped.
pub fn strings(value: &[u8]) -> impl Iterator<Item = &str> {
    value
        .split(|&b| b == 0)
        .filter(|s| !s.is_empty())
        .filter_map(|s| std::str::from_utf8(s).ok())
}

/// Decode a single-string property value (the bytes up to the first NUL,
/// or the whole buffer when no terminator is present).
pub fn single_string(value: &[u8]) -> Option<&str> {
    let end = value.iter().position(|&b| b == 0).unwrap_or(value.len());
    let s = std::str::from_utf8(&value[..end]).ok()?;
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Round up to the next 4-byte boundary.
fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Big-endian u32 at `offset`; caller guarantees bounds.
fn read_be32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}


#[cfg(test)]
pub(crate) mod testutil;
