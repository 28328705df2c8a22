//! Node version counter.
//!
//! Every node carries a [`NodeVersion`] that increments on each content or
//! structural change (key insert, split as parent, split as child, split
//! as new sibling). It lives inside the node's lock, so reading and bumping
//! it needs no atomics.
//!
//! Versions detect staleness (e.g. a cached view of a node being out of
//! date); they never resolve conflicts. Snapshots copy them verbatim.
//!
//! ```rust
//! use snaptree::nodeversion::NodeVersion;
//!
//! let mut v = NodeVersion::new();
//! let before = v;
//! v.bump();
//!
//! assert!(v.has_changed_since(before));
//! assert_eq!(v.value(), 1);
//! ```

use std::fmt as StdFmt;

/// Monotonic per-node modification counter.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeVersion(u64);

impl NodeVersion {
    /// A fresh version (zero).
    #[must_use]
    #[inline(always)]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Raw counter value.
    #[must_use]
    #[inline(always)]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Record one modification.
    #[inline(always)]
    pub const fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// `true` if this version differs from `earlier`.
    #[must_use]
    #[inline(always)]
    pub fn has_changed_since(self, earlier: Self) -> bool {
        self != earlier
    }
}

impl StdFmt::Debug for NodeVersion {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl StdFmt::Display for NodeVersion {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        write!(f, "{}", self.0)
    }
}
