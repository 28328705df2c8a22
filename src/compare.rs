//! Key ordering.
//!
//! The tree never inspects keys itself; every ordering decision goes
//! through a [`KeyComparator`]. Comparators are shared between a tree and
//! its snapshots and invoked from many threads at once, hence the
//! `Send + Sync` bound.
//!
//! # Contract
//!
//! A comparator must be a consistent total order. An inconsistent one
//! (non-transitive, or one whose answers change over time) does not cause
//! memory unsafety but leaves key placement unspecified.

use std::cmp::Ordering;
use std::fmt as StdFmt;

/// Three-way comparison of two keys.
pub trait KeyComparator<K>: Send + Sync {
    /// Compare `a` with `b`.
    fn compare(&self, a: &K, b: &K) -> Ordering;

    /// `a < b` under this ordering.
    #[inline(always)]
    fn less(&self, a: &K, b: &K) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord> KeyComparator<K> for NaturalOrder {
    #[inline(always)]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K, F> KeyComparator<K> for F
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    #[inline(always)]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Debug adapter for comparators, which are usually closures.
pub(crate) struct ComparatorName;

impl StdFmt::Debug for ComparatorName {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.write_str("<comparator>")
    }
}
