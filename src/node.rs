//! Tree nodes.
//!
//! A [`Node`] is either a leaf (keys plus a `next` link to its right
//! sibling) or an internal node (separator keys plus owned children).
//! Each node sits behind its own [`RwLock`]; the lock guards keys,
//! children, `next` and the version as one unit.
//!
//! # Routing Model
//!
//! Leaves hold every key of the tree. Internal keys are separators:
//!
//! ```text
//!            [ S0 | S1 ]              <- internal node (2 keys, 3 children)
//!           /     |     \
//!        C0      C1      C2           <- children
//!
//!   C0: keys <  S0
//!   C1: keys >= S0 and < S1
//!   C2: keys >= S1
//! ```
//!
//! A leaf split copies its median up (the median stays as the first key of
//! the new right sibling), so the leaf chain alone yields the full ordered
//! key set. An internal split moves its median up.
//!
//! # Locking
//!
//! Guards are the `arc_lock` flavour ([`ReadGuard`], [`WriteGuard`]): they
//! own a reference to the node, which lets traversals hand a guard from
//! parent to child without borrowing from a local.

mod link;

use std::fmt as StdFmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};

use crate::compare::KeyComparator;
use crate::nodeversion::NodeVersion;

/// Shared, lockable reference to a node.
pub(crate) type NodeRef<K> = Arc<RwLock<Node<K>>>;

/// Non-owning reference, used for the leaf chain.
pub(crate) type WeakNodeRef<K> = Weak<RwLock<Node<K>>>;

/// Shared lock on a node that owns its `Arc`.
pub(crate) type ReadGuard<K> = ArcRwLockReadGuard<parking_lot::RawRwLock, Node<K>>;

/// Exclusive lock on a node that owns its `Arc`.
pub(crate) type WriteGuard<K> = ArcRwLockWriteGuard<parking_lot::RawRwLock, Node<K>>;

// ============================================================================
//  Node
// ============================================================================

/// A B-tree node.
///
/// # Invariants
/// - `keys` is sorted under the tree's comparator.
/// - Internal: `children.len() == keys.len() + 1`. Leaf: `children` is empty.
/// - `next` is only ever set on leaves.
pub(crate) struct Node<K> {
    keys: Vec<K>,
    children: Vec<NodeRef<K>>,
    next: Option<WeakNodeRef<K>>,
    is_leaf: bool,
    version: NodeVersion,
}

impl<K> StdFmt::Debug for Node<K> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Node")
            .field("is_leaf", &self.is_leaf)
            .field("nkeys", &self.keys.len())
            .field("nchildren", &self.children.len())
            .field("has_next", &self.has_next())
            .field("version", &self.version)
            .finish()
    }
}

impl<K> Node<K> {
    /// Empty leaf with room for `capacity` keys.
    pub(crate) fn new_leaf(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            children: Vec::new(),
            next: None,
            is_leaf: true,
            version: NodeVersion::new(),
        }
    }

    /// Empty internal node with room for `capacity` keys.
    pub(crate) fn new_internal(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            children: Vec::with_capacity(capacity + 1),
            next: None,
            is_leaf: false,
            version: NodeVersion::new(),
        }
    }

    /// Wrap into a shared, lockable reference.
    pub(crate) fn into_ref(self) -> NodeRef<K> {
        Arc::new(RwLock::new(self))
    }

    #[inline(always)]
    pub(crate) const fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    #[inline(always)]
    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline(always)]
    pub(crate) fn children(&self) -> &[NodeRef<K>] {
        &self.children
    }

    /// Child at `index`.
    ///
    /// # Panics
    /// If `index` is out of bounds, which means the routing invariant broke.
    #[inline(always)]
    pub(crate) fn child(&self, index: usize) -> &NodeRef<K> {
        &self.children[index]
    }

    #[inline(always)]
    pub(crate) const fn version(&self) -> NodeVersion {
        self.version
    }

    /// Index of the first key `>= key`.
    #[inline]
    pub(crate) fn lower_bound<C: KeyComparator<K>>(&self, key: &K, cmp: &C) -> usize {
        self.keys.partition_point(|k| cmp.less(k, key))
    }

    /// Index of the first key `> key`.
    #[inline]
    pub(crate) fn upper_bound<C: KeyComparator<K>>(&self, key: &K, cmp: &C) -> usize {
        self.keys.partition_point(|k| !cmp.less(key, k))
    }

    /// Attach the first child of a fresh internal node.
    pub(crate) fn push_first_child(&mut self, child: NodeRef<K>) {
        debug_assert!(!self.is_leaf && self.children.is_empty());
        self.children.push(child);
    }

    /// Insert `key` into a leaf at `pos`, shifting later keys right.
    pub(crate) fn insert_key_at(&mut self, pos: usize, key: K) {
        debug_assert!(self.is_leaf, "keys are only inserted into leaves");
        self.keys.insert(pos, key);
        self.version.bump();
    }

    /// Build a node from copied parts. Used by the snapshot engine.
    pub(crate) const fn from_parts(
        keys: Vec<K>,
        children: Vec<NodeRef<K>>,
        is_leaf: bool,
        version: NodeVersion,
    ) -> Self {
        Self {
            keys,
            children,
            next: None,
            is_leaf,
            version,
        }
    }
}

impl<K: Clone> Node<K> {
    /// Split the full child at `children[index]`.
    ///
    /// `self` is the parent and `child` the locked contents of
    /// `self.children[index]`; the caller holds both exclusively. The child
    /// keeps its lower `degree - 1` keys. Its upper half moves to a new
    /// sibling installed at `children[index + 1]`, and a separator is
    /// placed at `keys[index]`:
    ///
    /// - internal child: median `keys[degree - 1]` moves up, upper `degree`
    ///   children move to the sibling.
    /// - leaf child: median is copied up and stays first in the sibling; the
    ///   sibling takes over the child's `next`, the child links to the sibling.
    ///
    /// Parent, child and sibling versions all increment. Returns the sibling.
    pub(crate) fn split_child(
        &mut self,
        index: usize,
        child: &mut Self,
        degree: usize,
    ) -> NodeRef<K> {
        debug_assert!(!self.is_leaf, "only internal nodes have children");
        debug_assert_eq!(child.keys.len(), 2 * degree - 1, "split of a non-full child");

        let (separator, mut sibling) = if child.is_leaf {
            let upper: Vec<K> = child.keys.split_off(degree - 1);
            let separator: K = upper[0].clone();
            let mut sibling = Self::new_leaf(2 * degree - 1);
            sibling.keys.extend(upper);
            (separator, sibling)
        } else {
            let upper: Vec<K> = child.keys.split_off(degree);
            let upper_children: Vec<NodeRef<K>> = child.children.split_off(degree);
            let separator: K = child
                .keys
                .pop()
                .unwrap_or_else(|| unreachable!("full internal node has a median"));
            let mut sibling = Self::new_internal(2 * degree - 1);
            sibling.keys.extend(upper);
            sibling.children.extend(upper_children);
            (separator, sibling)
        };

        sibling.version.bump();
        let sibling_ref: NodeRef<K> = if child.is_leaf {
            link::link_split(child, sibling)
        } else {
            sibling.into_ref()
        };

        self.keys.insert(index, separator);
        self.children.insert(index + 1, Arc::clone(&sibling_ref));

        child.version.bump();
        self.version.bump();

        sibling_ref
    }
}
