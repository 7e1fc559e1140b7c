//! Insertion-ordered string set.
//!
//! Both accumulators of a run (module names and firmware paths) are
//! [`OrderedSet`] instances. The output contract of the report depends on
//! insertion order being preserved exactly, so a plain `Vec` with a
//! membership scan is used instead of a hash-backed set. Expected sizes
//! are tens of entries; the O(n) scan is part of the documented contract
//! and may only be replaced by something that preserves insertion order.

/// An append-only set of unique strings that remembers insertion order.
///
/// # Example
///
/// ```
/// use dtbmods::OrderedSet;
///
/// let mut set = OrderedSet::new();
/// assert!(set.add("snd_soc_wm8960"));
/// assert!(set.add("panel_simple"));
/// assert!(!set.add("snd_soc_wm8960")); // duplicate, absorbed
///
/// let entries: Vec<&str> = set.iter().collect();
/// assert_eq!(entries, ["snd_soc_wm8960", "panel_simple"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OrderedSet {
    entries: Vec<String>,
}

impl OrderedSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` unless an equal entry already exists.
    ///
    /// Returns `true` if the value was inserted. Comparison is exact,
    /// case-sensitive byte equality.
    pub fn add(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.entries.iter().any(|e| *e == value) {
            return false;
        }
        self.entries.push(value);
        true
    }

    /// Exact-match membership test.
    pub fn contains(&self, value: &str) -> bool {
        self.entries.iter().any(|e| e == value)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entry has been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a OrderedSet {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&String) -> &str>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(String::as_str)
    }
}
