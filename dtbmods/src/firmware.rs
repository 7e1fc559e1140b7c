//! Firmware expansion from module metadata.
//!
//! The scan phase discovers firmware only where a node names it directly.
//! Most firmware is declared by the module instead, as `firmware=` lines
//! in its `.modinfo` metadata; this phase folds those into the firmware
//! set once all blobs have been scanned.

use tracing::debug;

use crate::index::ModuleIndex;
use crate::set::OrderedSet;

/// Where the kernel's firmware loader looks for files.
pub const FIRMWARE_DIR: &str = "/lib/firmware";

/// Absolute path of a firmware file named by a device tree or a module.
pub fn firmware_path(name: &str) -> String {
    format!("{FIRMWARE_DIR}/{name}")
}

/// Fold the firmware declared by every collected module into `firmware`.
///
/// Iterates the module set in insertion order, exactly once; the set is a
/// snapshot and this phase never adds to it. Modules the index cannot
/// resolve are skipped silently, the expected case for a module matched
/// by alias but absent from the active module directory. Every metadata
/// pair with key `firmware` contributes one `/lib/firmware/<value>` path.
pub fn expand_firmware(
    modules: &OrderedSet,
    index: &dyn ModuleIndex,
    firmware: &mut OrderedSet,
) {
    for name in modules.iter() {
        let Some(info) = index.module_info(name) else {
            debug!("module {} not present in index, skipping metadata", name);
            continue;
        };
        for (key, value) in &info {
            if key == "firmware" {
                firmware.add(firmware_path(value));
            }
        }
    }
}
