//! Point lookup.
//!
//! Shared locks are coupled hand over hand: the child is locked before the
//! parent is released. A child split needs the parent's exclusive lock, so
//! the child a reader lands in always matches the routing it read.

use std::cmp::Ordering;

use crate::compare::KeyComparator;
use crate::node::ReadGuard;

use super::ConcurrentBTree;

impl<K, C> ConcurrentBTree<K, C>
where
    K: Clone + Send + Sync,
    C: KeyComparator<K>,
{
    /// `true` if `key` is in the tree.
    ///
    /// Not finding a key is a normal outcome, not an error.
    #[must_use]
    pub fn search(&self, key: &K) -> bool {
        let cmp: &C = &self.comparator;
        let mut node: ReadGuard<K> = self.read_root();

        loop {
            let i: usize = node.lower_bound(key, cmp);
            if i < node.len() && cmp.compare(&node.keys()[i], key) == Ordering::Equal {
                return true;
            }
            if node.is_leaf() {
                return false;
            }

            let child: ReadGuard<K> = node.child(i).read_arc();
            node = child;
        }
    }

    /// Alias for [`search`](Self::search).
    #[must_use]
    #[inline(always)]
    pub fn contains(&self, key: &K) -> bool {
        self.search(key)
    }
}
