//! Working set of paths still to be extracted from one package.

use std::collections::HashSet;

/// Manifest paths not yet satisfied during a single extraction pass.
///
/// Each path is handed out at most once by [`WantedSet::take`], so
/// duplicate archive entries are never processed twice. Extraction stops
/// as soon as the set is empty.
///
/// # Examples
///
/// ```
/// use mandump_core::types::WantedSet;
///
/// let mut wanted: WantedSet = ["/usr/share/man/man1/ls.1"].into_iter().collect();
/// assert!(wanted.take("/usr/share/man/man1/ls.1"));
/// assert!(!wanted.take("/usr/share/man/man1/ls.1"));
/// assert!(wanted.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WantedSet(HashSet<String>);

impl WantedSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes `name` from the set, returning whether it was wanted.
    pub fn take(&mut self, name: &str) -> bool {
        self.0.remove(name)
    }

    /// Returns `true` once every wanted path has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of paths still wanted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<S: Into<String>> FromIterator<S> for WantedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
