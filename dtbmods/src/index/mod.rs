//! Module alias database access.
//!
//! The scanner and the firmware expansion phase only need two questions
//! answered: "which modules claim this alias?" and "what metadata does
//! this module declare?". [`ModuleIndex`] is that seam; [`KmodIndex`] is
//! the production implementation backed by a `/lib/modules/<version>`
//! directory as laid out by depmod.

mod kmod;
mod modinfo;

pub use kmod::{IndexError, KmodIndex};

/// Read-only view of a module alias database.
pub trait ModuleIndex {
    /// Module names whose declared alias patterns match `alias`.
    ///
    /// An empty result is the normal outcome for hardware no module
    /// supports, not an error.
    fn lookup_alias(&self, alias: &str) -> Vec<String>;

    /// Declared metadata of `name` as ordered key/value pairs.
    ///
    /// Keys repeat (a module may declare several `firmware` entries).
    /// Returns `None` when the module is unknown to the index or its
    /// object file cannot be read; callers treat that as a skip.
    fn module_info(&self, name: &str) -> Option<Vec<(String, String)>>;
}
