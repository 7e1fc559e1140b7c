//! dtbmods - static device-tree hardware inventory
//!
//! This library inspects compiled device-tree blobs (DTBs) and a kernel
//! module directory to determine, before a system ever boots, which
//! kernel modules and firmware files it will need. Initramfs builders
//! use the result to decide what to bundle.
//!
//! # Pipeline
//!
//! ```text
//! DTB files ──> scan::scan_dtb ──┬──> OrderedSet (module names)
//!                                └──> OrderedSet (firmware paths)
//!                                          │
//! modules.alias / modules.dep <── index::KmodIndex
//!                                          │
//!              firmware::expand_firmware ──┘  (module metadata → more paths)
//!                                          │
//!                          report::write_report (shell-array blocks)
//! ```
//!
//! Nothing is loaded or installed; modules are resolved by name only and
//! firmware files are never checked for existence on disk.

pub mod fdt;
pub mod firmware;
pub mod index;
pub mod report;
pub mod scan;
pub mod set;

pub use fdt::{Fdt, FdtError};
pub use index::{KmodIndex, ModuleIndex};
pub use scan::{scan_dtb, ScanError};
pub use set::OrderedSet;

/// Library version, taken from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
