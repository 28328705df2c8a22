//! `ConcurrentBTree` - a concurrent B-tree with copy-on-write snapshots.
//!
//! This module holds the tree type itself, root management and
//! introspection. The operations live in submodules:
//!
//! - [`insert`]: insert with preemptive top-down splitting
//! - [`search`]: point lookup
//! - [`range`]: leaf-chain range scans
//! - [`snapshot`]: deep-copy snapshots
//! - [`validate`]: post-hoc invariant checking

use std::fmt as StdFmt;
use std::marker::PhantomData;
use std::ptr as StdPtr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, AtomicUsize};

use parking_lot::RwLock;
use seize::{Collector, Guard};

use crate::compare::{ComparatorName, KeyComparator, NaturalOrder};
use crate::config::TreeConfig;
use crate::node::{Node, NodeRef, ReadGuard};
use crate::nodeversion::NodeVersion;
use crate::ordering::{RELAXED, ROOT_LOAD, ROOT_STORE};
use crate::tracing_helpers::debug_log;

mod insert;
mod range;
mod search;
mod snapshot;
mod validate;

pub use validate::TreeStats;

// ============================================================================
//  ConcurrentBTree
// ============================================================================

/// A thread-safe, in-memory B-tree over keys of type `K`.
///
/// Keys are ordered by the comparator `C` (natural [`Ord`] order by
/// default). All operations take `&self`; share the tree between threads
/// with an `Arc`.
///
/// # Consistency
///
/// - `insert` and `search` on the same key are linearizable.
/// - `range_query` sees each leaf at one instant, but not the whole range.
/// - `snapshot` returns a valid past-or-present state and never observes a
///   half-installed root.
///
/// # Duplicates
///
/// `insert` does not deduplicate. Inserting an existing key stores a second
/// copy, which the sortedness check of
/// [`check_invariants`](Self::check_invariants) reports.
pub struct ConcurrentBTree<K, C = NaturalOrder> {
    /// Reclaims root references displaced by a root split.
    collector: Collector,

    /// Current root. Holds one strong count of the `Arc` it came from.
    root_ptr: AtomicPtr<RwLock<Node<K>>>,

    /// Structural lock. Exclusive while a new root is installed, shared
    /// while a snapshot captures the root.
    structure: RwLock<()>,

    config: TreeConfig,

    /// Shared with snapshots.
    comparator: Arc<C>,

    /// Number of keys.
    count: AtomicUsize,

    /// Node splits, including root splits.
    splits: AtomicUsize,

    /// Root splits (height increases).
    root_splits: AtomicUsize,

    /// Makes `Send`/`Sync` follow the node type, i.e. require `K: Send + Sync`.
    _marker: PhantomData<NodeRef<K>>,
}

impl<K, C> StdFmt::Debug for ConcurrentBTree<K, C> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("ConcurrentBTree")
            .field("degree", &self.config.degree())
            .field("len", &self.count.load(RELAXED))
            .field("root_ptr", &self.root_ptr.load(RELAXED))
            .field("comparator", &ComparatorName)
            .finish_non_exhaustive()
    }
}

impl<K> ConcurrentBTree<K, NaturalOrder>
where
    K: Ord + Clone + Send + Sync,
{
    /// Create an empty tree ordered by `K`'s [`Ord`].
    ///
    /// `degree` is the minimum degree `t`; values below 2 are clamped to 2.
    #[must_use]
    pub fn new(degree: usize) -> Self {
        Self::with_comparator(degree, NaturalOrder)
    }
}

impl<K> Default for ConcurrentBTree<K, NaturalOrder>
where
    K: Ord + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::with_config(TreeConfig::default(), NaturalOrder)
    }
}

impl<K, C> ConcurrentBTree<K, C>
where
    K: Clone + Send + Sync,
    C: KeyComparator<K>,
{
    /// Create an empty tree ordered by `comparator`.
    ///
    /// `degree` is the minimum degree `t`; values below 2 are clamped to 2.
    #[must_use]
    pub fn with_comparator(degree: usize, comparator: C) -> Self {
        Self::with_config(TreeConfig::new().with_degree(degree), comparator)
    }

    /// Create an empty tree from a [`TreeConfig`].
    #[must_use]
    pub fn with_config(config: TreeConfig, comparator: C) -> Self {
        let root: NodeRef<K> = Node::new_leaf(config.max_keys()).into_ref();
        Self::from_root(config, Arc::new(comparator), root, 0)
    }

    /// Assemble a tree around an existing node graph.
    pub(crate) fn from_root(
        config: TreeConfig,
        comparator: Arc<C>,
        root: NodeRef<K>,
        count: usize,
    ) -> Self {
        Self {
            collector: Collector::new(),
            root_ptr: AtomicPtr::new(Arc::into_raw(root).cast_mut()),
            structure: RwLock::new(()),
            config,
            comparator,
            count: AtomicUsize::new(count),
            splits: AtomicUsize::new(0),
            root_splits: AtomicUsize::new(0),
            _marker: PhantomData,
        }
    }
}

impl<K, C> ConcurrentBTree<K, C> {
    // ========================================================================
    //  Introspection
    // ========================================================================

    /// Number of keys in the tree.
    #[must_use]
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.count.load(RELAXED)
    }

    /// `true` if the tree holds no keys.
    #[must_use]
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Minimum degree `t`.
    #[must_use]
    #[inline(always)]
    pub const fn degree(&self) -> usize {
        self.config.degree()
    }

    /// The tree's configuration.
    #[must_use]
    #[inline(always)]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of node splits performed on this tree.
    #[must_use]
    pub fn split_count(&self) -> usize {
        self.splits.load(RELAXED)
    }

    /// Number of root splits performed on this tree.
    ///
    /// Every root split adds one level, so for a tree that was built by
    /// inserts this equals `height() - 1`.
    #[must_use]
    pub fn root_split_count(&self) -> usize {
        self.root_splits.load(RELAXED)
    }

    /// Number of levels, counting the root (an empty tree has height 1).
    #[must_use]
    pub fn height(&self) -> usize {
        let mut node: ReadGuard<K> = self.read_root();
        let mut height: usize = 1;
        while !node.is_leaf() {
            let child: ReadGuard<K> = node.child(0).read_arc();
            node = child;
            height += 1;
        }
        height
    }

    /// Version counter of the current root node.
    #[must_use]
    pub fn root_version(&self) -> NodeVersion {
        self.read_root().version()
    }

    // ========================================================================
    //  Root Management
    // ========================================================================

    /// Load the current root and take a strong reference to it.
    pub(crate) fn load_root(&self) -> NodeRef<K> {
        let guard = self.collector.enter();
        let raw: *mut RwLock<Node<K>> = guard.protect(&self.root_ptr, ROOT_LOAD);

        // SAFETY: `raw` came from `Arc::into_raw` and the tree still owns one
        // strong count for it, or that count was retired after our guard
        // entered and will not be released before the guard drops.
        unsafe {
            Arc::increment_strong_count(raw);
            Arc::from_raw(raw)
        }
    }

    /// `true` if `node` is the currently installed root.
    #[inline]
    pub(crate) fn is_root(&self, node: &NodeRef<K>) -> bool {
        StdPtr::eq(Arc::as_ptr(node), self.root_ptr.load(ROOT_LOAD))
    }

    /// Shared-lock the root.
    ///
    /// Retries if the root was replaced between the load and the lock. A
    /// replacement needs the old root's exclusive lock, so once the check
    /// passes the guard is on the real root.
    pub(crate) fn read_root(&self) -> ReadGuard<K> {
        loop {
            let root: NodeRef<K> = self.load_root();
            let guard: ReadGuard<K> = root.read_arc();
            if self.is_root(&root) {
                return guard;
            }
        }
    }

    /// Install `new_root`, retiring the tree's reference to the old one.
    ///
    /// Caller holds the structural lock exclusively and the old root's
    /// exclusive lock.
    pub(crate) fn replace_root(&self, new_root: NodeRef<K>) {
        let new_raw: *mut RwLock<Node<K>> = Arc::into_raw(new_root).cast_mut();
        let old_raw: *mut RwLock<Node<K>> = self.root_ptr.swap(new_raw, ROOT_STORE);
        debug_log!(old = ?old_raw, new = ?new_raw, "root replaced");

        let guard = self.collector.enter();
        // SAFETY: `old_raw` came from `Arc::into_raw` and is no longer
        // reachable through `root_ptr`. Readers that loaded it are protected
        // by their own guards.
        unsafe {
            guard.defer_retire(old_raw, |ptr, _| {
                drop(Arc::from_raw(ptr));
            });
        }
    }

    #[inline(always)]
    pub(crate) fn record_split(&self) {
        self.splits.fetch_add(1, RELAXED);
    }

    #[inline(always)]
    pub(crate) fn record_root_split(&self) {
        self.root_splits.fetch_add(1, RELAXED);
        self.record_split();
    }

    #[inline(always)]
    pub(crate) fn record_insert(&self) {
        self.count.fetch_add(1, RELAXED);
    }
}

impl<K, C> Drop for ConcurrentBTree<K, C> {
    fn drop(&mut self) {
        // Unique access: no reader can be holding the raw pointer.
        let raw: *mut RwLock<Node<K>> = *self.root_ptr.get_mut();

        // SAFETY: `raw` came from `Arc::into_raw` and this is the tree's
        // strong count for it.
        unsafe { drop(Arc::from_raw(raw)) };

        // Retired roots are released when `collector` drops.
    }
}

// ============================================================================
//  Tests
// ============================================================================
