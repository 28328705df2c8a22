//! Range scans along the leaf chain.
//!
//! A scan descends once to the leaf where the range starts and then walks
//! `next` links. Each leaf is shared-locked only while its own keys are
//! copied out, and released before the next leaf is locked.
//!
//! # Consistency
//!
//! The result is consistent per leaf, not as a whole. A concurrent insert
//! into a leaf already scanned is missed; one into a leaf not yet scanned
//! may or may not be seen. Keys present for the whole duration of the scan
//! are always returned, because splits only move keys rightward into the
//! chain.

use crate::compare::KeyComparator;
use crate::node::{Node, NodeRef, ReadGuard};

use super::ConcurrentBTree;

impl<K, C> ConcurrentBTree<K, C>
where
    K: Clone + Send + Sync,
    C: KeyComparator<K>,
{
    /// All keys in `[start, end]`, inclusive, in ascending order.
    ///
    /// Returns an empty vector when nothing falls in the range, including
    /// when `start > end`.
    #[must_use]
    pub fn range_query(&self, start: &K, end: &K) -> Vec<K> {
        let cmp: &C = &self.comparator;
        let mut out: Vec<K> = Vec::new();
        if cmp.less(end, start) {
            return out;
        }

        let mut leaf: ReadGuard<K> = self.descend_to_leaf(|node| node.lower_bound(start, cmp));
        let mut from: usize = leaf.lower_bound(start, cmp);

        loop {
            for key in &leaf.keys()[from..] {
                if cmp.less(end, key) {
                    return out;
                }
                out.push(key.clone());
            }

            match leaf.next_leaf() {
                Some(next) => {
                    drop(leaf);
                    leaf = next.read_arc();
                    from = leaf.lower_bound(start, cmp);
                }
                None => return out,
            }
        }
    }

    /// Every key in ascending order.
    ///
    /// Same per-leaf consistency as [`range_query`](Self::range_query).
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        let mut out: Vec<K> = Vec::with_capacity(self.len());
        let mut leaf: ReadGuard<K> = self.descend_to_leaf(|_| 0);

        loop {
            out.extend_from_slice(leaf.keys());
            let Some(next) = leaf.next_leaf() else {
                return out;
            };
            drop(leaf);
            leaf = next.read_arc();
        }
    }

    /// Smallest key, or `None` if the tree is empty.
    #[must_use]
    pub fn first(&self) -> Option<K> {
        let leaf: ReadGuard<K> = self.descend_to_leaf(|_| 0);
        leaf.keys().first().cloned()
    }

    /// Largest key, or `None` if the tree is empty.
    #[must_use]
    pub fn last(&self) -> Option<K> {
        let leaf: ReadGuard<K> = self.descend_to_leaf(|node| node.len());
        leaf.keys().last().cloned()
    }

    /// Shared-lock the leaf chosen by `route`, coupling locks on the way.
    ///
    /// `route` maps an internal node to a child index in `0..=len`.
    fn descend_to_leaf<F>(&self, route: F) -> ReadGuard<K>
    where
        F: Fn(&Node<K>) -> usize,
    {
        let mut node: ReadGuard<K> = self.read_root();
        while !node.is_leaf() {
            let child: &NodeRef<K> = node.child(route(&*node));
            let child: ReadGuard<K> = child.read_arc();
            node = child;
        }
        node
    }
}
