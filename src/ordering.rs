//! Memory orderings for the atomics shared between threads.
//!
//! Node contents are protected by their locks; only the root pointer and
//! the tree's bookkeeping counters are plain atomics.

use std::sync::atomic::Ordering;

/// Ordering for loading the root pointer.
/// Pairs with [`ROOT_STORE`] so a new root's contents are visible.
pub const ROOT_LOAD: Ordering = Ordering::Acquire;

/// Ordering for installing a new root.
pub const ROOT_STORE: Ordering = Ordering::Release;

/// Ordering for statistics counters (key count, split counts).
/// No other memory is published through them.
pub const RELAXED: Ordering = Ordering::Relaxed;
