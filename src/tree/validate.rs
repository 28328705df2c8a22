//! Post-hoc invariant checking.
//!
//! [`ConcurrentBTree::check_invariants`] walks the whole tree and verifies:
//!
//! - keys strictly ascending within every node and across the leaf level
//! - key counts within `t-1 ..= 2t-1` (root: `0 ..= 2t-1`)
//! - internal nodes have exactly `len + 1` children, leaves none
//! - every key lies within its parent's separator bounds
//! - all leaves at the same depth
//! - the leaf chain visits exactly the in-order leaves and then stops
//! - the key counter matches the keys found
//!
//! # Quiescence
//!
//! The walk takes shared locks, so it is memory safe at any time, but it is
//! only meaningful on a quiescent tree: a concurrent insert can make the
//! key count or leaf chain disagree with an already-visited part of the
//! walk. Use it in test teardown or after joining writer threads.

use std::sync::Arc;

use crate::compare::KeyComparator;
use crate::error::InvariantViolation;
use crate::node::NodeRef;

use super::ConcurrentBTree;

/// Shape summary produced by a successful validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Keys stored in leaves.
    pub keys: usize,
    /// Levels including the root.
    pub height: usize,
    /// Leaf nodes.
    pub leaves: usize,
    /// Internal (non-leaf) nodes.
    pub internal_nodes: usize,
}

struct Walk<K> {
    leaf_depth: Option<usize>,
    /// Leaves in in-order position.
    leaves: Vec<NodeRef<K>>,
    /// Largest key of the previous leaf.
    last_key: Option<K>,
    stats: TreeStats,
}

impl<K, C> ConcurrentBTree<K, C>
where
    K: Clone + Send + Sync,
    C: KeyComparator<K>,
{
    /// Verify every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<TreeStats, InvariantViolation> {
        let root: NodeRef<K> = self.load_root();
        let mut walk: Walk<K> = Walk {
            leaf_depth: None,
            leaves: Vec::new(),
            last_key: None,
            stats: TreeStats::default(),
        };

        self.check_node(&root, 0, None, None, &mut walk)?;
        check_leaf_chain(&walk.leaves)?;

        let recorded: usize = self.len();
        if recorded != walk.stats.keys {
            return Err(InvariantViolation::KeyCountMismatch {
                recorded,
                counted: walk.stats.keys,
            });
        }

        walk.stats.height = walk.leaf_depth.unwrap_or(0) + 1;
        Ok(walk.stats)
    }

    fn check_node(
        &self,
        node_ref: &NodeRef<K>,
        depth: usize,
        lo: Option<&K>,
        hi: Option<&K>,
        walk: &mut Walk<K>,
    ) -> Result<(), InvariantViolation> {
        let cmp: &C = &self.comparator;
        let node = node_ref.read();
        let keys: &[K] = node.keys();

        let min: usize = if depth == 0 { 0 } else { self.config.min_keys() };
        let max: usize = self.config.max_keys();
        if keys.len() < min || keys.len() > max {
            return Err(InvariantViolation::KeyCountOutOfBounds {
                depth,
                len: keys.len(),
                min,
                max,
            });
        }

        if let Some(index) = keys.windows(2).position(|pair| !cmp.less(&pair[0], &pair[1])) {
            return Err(InvariantViolation::UnsortedKeys { depth, index });
        }

        // Child `i` holds keys in `[keys[i - 1], keys[i])`.
        let escapes = |key: &K| {
            lo.is_some_and(|lo| cmp.less(key, lo)) || hi.is_some_and(|hi| !cmp.less(key, hi))
        };
        if let Some(index) = keys.iter().position(escapes) {
            return Err(InvariantViolation::SeparatorBoundsViolated { depth, index });
        }

        if node.is_leaf() {
            if !node.children().is_empty() {
                return Err(InvariantViolation::ChildCountMismatch {
                    depth,
                    keys: keys.len(),
                    children: node.children().len(),
                });
            }

            match walk.leaf_depth {
                None => walk.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(InvariantViolation::UnbalancedLeaves {
                        expected,
                        found: depth,
                    });
                }
                Some(_) => {}
            }

            if let (Some(prev), Some(first)) = (&walk.last_key, keys.first()) {
                if !cmp.less(prev, first) {
                    return Err(InvariantViolation::UnsortedKeys { depth, index: 0 });
                }
            }
            if let Some(last) = keys.last() {
                walk.last_key = Some(last.clone());
            }

            walk.stats.keys += keys.len();
            walk.stats.leaves += 1;
            walk.leaves.push(Arc::clone(node_ref));
            return Ok(());
        }

        if node.children().len() != keys.len() + 1 {
            return Err(InvariantViolation::ChildCountMismatch {
                depth,
                keys: keys.len(),
                children: node.children().len(),
            });
        }
        walk.stats.internal_nodes += 1;

        for (i, child) in node.children().iter().enumerate() {
            let child_lo: Option<&K> = if i == 0 { lo } else { Some(&keys[i - 1]) };
            let child_hi: Option<&K> = if i == keys.len() { hi } else { Some(&keys[i]) };
            self.check_node(child, depth + 1, child_lo, child_hi, walk)?;
        }
        Ok(())
    }
}

/// Follow `next` from the leftmost leaf and compare against in-order leaves.
fn check_leaf_chain<K>(leaves: &[NodeRef<K>]) -> Result<(), InvariantViolation> {
    let mut current: Option<NodeRef<K>> = leaves.first().cloned();

    for (position, expected) in leaves.iter().enumerate() {
        match current {
            Some(ref leaf) if Arc::ptr_eq(leaf, expected) => {}
            _ => return Err(InvariantViolation::LeafChainMismatch { position }),
        }
        current = expected.read().next_leaf();
    }

    if current.is_some() {
        return Err(InvariantViolation::LeafChainNotTerminated);
    }
    Ok(())
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Fail fast in tests")]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_empty_tree_stats() {
        let tree: ConcurrentBTree<u32> = ConcurrentBTree::new(2);

        let stats = tree.check_invariants().unwrap();
        assert_eq!(
            stats,
            TreeStats {
                keys: 0,
                height: 1,
                leaves: 1,
                internal_nodes: 0,
            }
        );
    }

    #[test]
    fn test_stats_after_growth() {
        let tree: ConcurrentBTree<u32> = ConcurrentBTree::new(3);
        for k in 0..1000 {
            tree.insert((k * 37) % 1000);
        }

        let stats = tree.check_invariants().unwrap();
        assert_eq!(stats.keys, 1000);
        assert_eq!(stats.height, tree.height());
        assert!(stats.leaves > 1);
        assert!(stats.internal_nodes >= 1);
    }

    #[test]
    fn test_detects_unsorted_leaf() {
        let tree: ConcurrentBTree<u32> = ConcurrentBTree::new(2);
        tree.insert(5);
        // Stored after 5 in the leaf: a descending pair.
        tree.load_root().write().insert_key_at(1, 1);
        tree.record_insert();

        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::UnsortedKeys { depth: 0, index: 0 })
        );
    }

    #[test]
    fn test_detects_key_count_mismatch() {
        let tree: ConcurrentBTree<u32> = ConcurrentBTree::new(2);
        tree.insert(1);
        tree.record_insert();

        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::KeyCountMismatch {
                recorded: 2,
                counted: 1,
            })
        );
    }

    #[test]
    fn test_detects_broken_leaf_chain() {
        let tree: ConcurrentBTree<u32> = ConcurrentBTree::new(2);
        for k in 0..10 {
            tree.insert(k);
        }
        let root = tree.load_root();
        let first_leaf: NodeRef<u32> = {
            let mut node = Arc::clone(&root);
            loop {
                let child = {
                    let guard = node.read();
                    if guard.is_leaf() {
                        break;
                    }
                    Arc::clone(guard.child(0))
                };
                node = child;
            }
            node
        };

        first_leaf.write().set_next(None);
        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::LeafChainMismatch { position: 1 })
        );
    }

    #[test]
    fn test_detects_dangling_chain_end() {
        let tree: ConcurrentBTree<u32> = ConcurrentBTree::new(2);
        tree.insert(1);
        let stray: NodeRef<u32> = Node::new_leaf(3).into_ref();
        tree.load_root().write().set_next(Some(Arc::downgrade(&stray)));

        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::LeafChainNotTerminated)
        );
    }
}
