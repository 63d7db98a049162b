//! Confession filter: which denomination categories are shown on the map
//!
//! The filter is persisted across sessions and compared by value against the
//! filter in effect at the last data load, which is how a filter change is
//! detected when the map screen comes back into view.

use crate::church::Confession;
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Set of confession categories currently enabled
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfessionFilter(BTreeSet<Confession>);

impl ConfessionFilter {
    /// Filter with every confession enabled (the first-run default)
    pub fn all() -> Self {
        Self(Confession::ALL.into_iter().collect())
    }

    /// Filter with no confession enabled
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn of(confessions: impl IntoIterator<Item = Confession>) -> Self {
        Self(confessions.into_iter().collect())
    }

    pub fn contains(&self, confession: Confession) -> bool {
        self.0.contains(&confession)
    }

    /// Enable or disable one confession
    pub fn set(&mut self, confession: Confession, enabled: bool) {
        if enabled {
            self.0.insert(confession);
        } else {
            self.0.remove(&confession);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for ConfessionFilter {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_everything() {
        let filter = ConfessionFilter::default();
        for confession in Confession::ALL {
            assert!(filter.contains(confession));
        }
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn test_set_and_unset() {
        let mut filter = ConfessionFilter::all();
        filter.set(Confession::Catholic, false);
        assert!(!filter.contains(Confession::Catholic));
        assert!(filter.contains(Confession::Orthodox));

        filter.set(Confession::Catholic, true);
        assert!(filter.contains(Confession::Catholic));
    }

    #[test]
    fn test_equality_is_by_value() {
        let a = ConfessionFilter::of([Confession::Orthodox, Confession::Protestant]);
        let b = ConfessionFilter::of([Confession::Protestant, Confession::Orthodox]);
        assert_eq!(a, b);

        let c = ConfessionFilter::of([Confession::Orthodox]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_none_is_empty() {
        assert!(ConfessionFilter::none().is_empty());
        assert!(!ConfessionFilter::all().is_empty());
    }
}
