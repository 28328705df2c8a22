//! Leaf chain.
//!
//! Leaves form a singly linked list in ascending key order through their
//! `next` field. Links are weak: the parent's `children` vector owns each
//! leaf, the chain only points at it. Leaves are never removed from a
//! live tree, so an upgrade fails only once the whole tree is gone.
//!
//! Splits only ever move keys to the right, into a sibling linked directly
//! after the split leaf. A scan that follows `next` therefore never skips
//! a key that was present before the scan started.

use std::sync::Arc;

use super::{Node, NodeRef, WeakNodeRef};

impl<K> Node<K> {
    /// Right sibling of this leaf, if any.
    #[inline]
    pub(crate) fn next_leaf(&self) -> Option<NodeRef<K>> {
        self.next.as_ref().and_then(WeakNodeRef::upgrade)
    }

    /// `true` if this leaf links to a successor.
    #[inline]
    pub(crate) const fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Replace the `next` link.
    #[inline]
    pub(crate) fn set_next(&mut self, next: Option<WeakNodeRef<K>>) {
        debug_assert!(self.is_leaf, "only leaves are chained");
        self.next = next;
    }
}

/// Splice a freshly split `sibling` into the chain right after `left`.
///
/// The sibling inherits `left`'s old successor and `left` now points at the
/// sibling. The caller holds `left` exclusively; the sibling is not yet
/// reachable by anyone else.
pub(super) fn link_split<K>(left: &mut Node<K>, mut sibling: Node<K>) -> NodeRef<K> {
    sibling.set_next(left.next.take());
    let sibling_ref: NodeRef<K> = sibling.into_ref();
    left.set_next(Some(Arc::downgrade(&sibling_ref)));
    sibling_ref
}
