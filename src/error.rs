//! Error types.
//!
//! The data path (insert, search, range, snapshot) cannot fail. The only
//! error surface is [`InvariantViolation`], reported by
//! [`ConcurrentBTree::check_invariants`](crate::ConcurrentBTree::check_invariants).
//!
//! Keys are opaque to the tree, so violations are located by depth and
//! position rather than by key value.

use thiserror::Error;

/// A structural invariant that did not hold during validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Adjacent keys in a node are not strictly ascending.
    #[error("keys out of order at depth {depth}, index {index}")]
    UnsortedKeys {
        /// Depth of the node (root = 0).
        depth: usize,
        /// Index of the first key of the offending pair.
        index: usize,
    },

    /// A node holds too few or too many keys.
    #[error("node at depth {depth} holds {len} keys (allowed {min}..={max})")]
    KeyCountOutOfBounds {
        /// Depth of the node (root = 0).
        depth: usize,
        /// Number of keys found.
        len: usize,
        /// Lower bound for this node.
        min: usize,
        /// Upper bound for this node.
        max: usize,
    },

    /// An internal node's child count is not its key count plus one,
    /// or a leaf has children.
    #[error("node at depth {depth} has {keys} keys but {children} children")]
    ChildCountMismatch {
        /// Depth of the node (root = 0).
        depth: usize,
        /// Number of keys.
        keys: usize,
        /// Number of children.
        children: usize,
    },

    /// Leaves were found at different depths.
    #[error("leaf at depth {found}, expected all leaves at depth {expected}")]
    UnbalancedLeaves {
        /// Depth of the first leaf reached.
        expected: usize,
        /// Depth of the offending leaf.
        found: usize,
    },

    /// A key lies outside the bounds its parent's separators allow.
    #[error("key at depth {depth}, index {index} escapes its separator bounds")]
    SeparatorBoundsViolated {
        /// Depth of the node holding the key.
        depth: usize,
        /// Index of the key within the node.
        index: usize,
    },

    /// The leaf chain does not visit the same leaves as an in-order walk.
    #[error("leaf chain diverges from in-order traversal at leaf {position}")]
    LeafChainMismatch {
        /// Zero-based position in the in-order leaf sequence.
        position: usize,
    },

    /// The last leaf still links to a successor.
    #[error("last leaf has a dangling next link")]
    LeafChainNotTerminated,

    /// The key counter disagrees with the number of keys in the tree.
    #[error("tree records {recorded} keys but holds {counted}")]
    KeyCountMismatch {
        /// Value of the tree's key counter.
        recorded: usize,
        /// Keys found by the walk.
        counted: usize,
    },
}
