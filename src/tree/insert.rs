//! Insert with preemptive top-down splitting.
//!
//! # Protocol
//!
//! ```text
//! 1. Exclusive-lock the root; if it was replaced meanwhile, retry.
//! 2. Root full? Drop it, grow the tree under the structural lock, retry.
//! 3. Internal node: lock the routed child. If the child is full, split it
//!    (parent and child both held), then pick the half that owns the key.
//!    Release the parent.
//! 4. Leaf: insert at the upper bound, bump the version.
//! ```
//!
//! Every node held while its child is locked is guaranteed non-full, so a
//! split never has to propagate upward. Writers lock strictly top-down and
//! release a parent as soon as the child is held, which lets inserts into
//! disjoint subtrees proceed in parallel.

use std::sync::Arc;

use crate::compare::KeyComparator;
use crate::node::{Node, NodeRef, WriteGuard};
use crate::tracing_helpers::{debug_log, trace_log};

use super::ConcurrentBTree;

impl<K, C> ConcurrentBTree<K, C>
where
    K: Clone + Send + Sync,
    C: KeyComparator<K>,
{
    /// Insert `key`.
    ///
    /// Never fails. Inserting a key that is already present stores another
    /// copy; see the type-level docs on duplicates.
    pub fn insert(&self, key: K) {
        let cmp: &C = &self.comparator;
        let degree: usize = self.config.degree();
        let max_keys: usize = self.config.max_keys();

        let mut node: WriteGuard<K> = self.lock_root_for_insert();

        while !node.is_leaf() {
            let index: usize = node.upper_bound(&key, cmp);
            let mut child: WriteGuard<K> = node.child(index).write_arc();

            if child.len() == max_keys {
                let sibling: NodeRef<K> = node.split_child(index, &mut child, degree);
                self.record_split();
                trace_log!(index, "split child during descent");

                if !cmp.less(&key, &node.keys()[index]) {
                    drop(child);
                    child = sibling.write_arc();
                }
            }

            // Hand over: the parent's lock drops once the child is held.
            node = child;
        }

        let pos: usize = node.upper_bound(&key, cmp);
        node.insert_key_at(pos, key);
        self.record_insert();
    }

    /// Exclusive-lock a root that has room for one more key.
    fn lock_root_for_insert(&self) -> WriteGuard<K> {
        let max_keys: usize = self.config.max_keys();

        loop {
            let root: NodeRef<K> = self.load_root();
            let guard: WriteGuard<K> = root.write_arc();

            if !self.is_root(&root) {
                continue;
            }
            if guard.len() < max_keys {
                return guard;
            }

            drop(guard);
            self.grow_root();
        }
    }

    /// Split a full root under a new root, adding one level.
    ///
    /// Takes the structural lock exclusively and re-checks, so concurrent
    /// callers that saw the same full root grow the tree only once.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    fn grow_root(&self) {
        let _structure = self.structure.write();

        let old_root: NodeRef<K> = self.load_root();
        let mut old_guard: WriteGuard<K> = old_root.write_arc();
        if old_guard.len() < self.config.max_keys() {
            return;
        }

        let mut new_root: Node<K> = Node::new_internal(self.config.max_keys());
        new_root.push_first_child(Arc::clone(&old_root));
        new_root.split_child(0, &mut old_guard, self.config.degree());

        // Install before the old root's lock drops, so anyone who locks it
        // next sees it is no longer the root.
        self.replace_root(new_root.into_ref());
        drop(old_guard);

        self.record_root_split();
        debug_log!(
            root_splits = self.root_split_count(),
            "tree height increased"
        );
    }
}
