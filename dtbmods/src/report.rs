//! Shell-array report emission.
//!
//! The report is a fixed textual contract consumed by shell scripts:
//! two array blocks, one entry per line with a four-space indent, in the
//! sets' insertion order, separated by exactly one blank line. Any
//! deviation (extra whitespace, reordering) breaks downstream tooling.

use std::io::{self, Write};

use crate::set::OrderedSet;

/// Write the two-block report to `out`.
///
/// # Example
///
/// ```
/// use dtbmods::OrderedSet;
/// use dtbmods::report::write_report;
///
/// let mut modules = OrderedSet::new();
/// modules.add("chipdrv");
/// let files = OrderedSet::new();
///
/// let mut out = Vec::new();
/// write_report(&mut out, &modules, &files).unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "MODULES=(\n    chipdrv\n)\n\nFILES=(\n)\n"
/// );
/// ```
pub fn write_report(
    out: &mut impl Write,
    modules: &OrderedSet,
    files: &OrderedSet,
) -> io::Result<()> {
    writeln!(out, "MODULES=(")?;
    for name in modules.iter() {
        writeln!(out, "    {name}")?;
    }
    writeln!(out, ")")?;
    writeln!(out)?;
    writeln!(out, "FILES=(")?;
    for path in files.iter() {
        writeln!(out, "    {path}")?;
    }
    writeln!(out, ")")?;
    Ok(())
}
