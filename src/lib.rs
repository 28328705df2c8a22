//! # `snaptree`
//!
//! A concurrent, in-memory B-tree index with copy-on-write snapshots.
//!
//! The tree stores opaque keys ordered by a caller-supplied comparator and
//! supports concurrent insert, point search and range scans from many
//! threads. [`ConcurrentBTree::snapshot`] produces an independent, read-only
//! copy that later writes to the live tree cannot affect.
//!
//! | Operation | Concurrency |
//! |-----------|-------------|
//! | `insert` | Exclusive lock coupling down the descent path |
//! | `search` | Shared lock coupling, linearizable per key |
//! | `range_query` | Per-leaf consistent scan along the leaf chain |
//! | `snapshot` | Full deep copy, consistent w.r.t. root replacement |
//!
//! ## Example
//!
//! ```rust
//! use snaptree::ConcurrentBTree;
//!
//! let tree: ConcurrentBTree<u64> = ConcurrentBTree::new(3);
//! for key in [1, 3, 5, 7, 9, 11] {
//!     tree.insert(key);
//! }
//!
//! assert!(tree.search(&7));
//! assert_eq!(tree.range_query(&4, &9), vec![5, 7, 9]);
//!
//! let snapshot = tree.snapshot();
//! tree.insert(4);
//! assert!(!snapshot.search(&4));
//! assert!(tree.search(&4));
//! ```
//!
//! ## Custom Ordering
//!
//! Any `Fn(&K, &K) -> Ordering + Send + Sync` closure works as a comparator:
//!
//! ```rust
//! use snaptree::ConcurrentBTree;
//!
//! let tree = ConcurrentBTree::with_comparator(2, |a: &i32, b: &i32| b.cmp(a));
//! tree.insert(1);
//! tree.insert(2);
//! assert_eq!(tree.keys(), vec![2, 1]);
//! ```
//!
//! ## Design
//!
//! Every node carries its own reader/writer lock and version counter. The
//! root reference is an atomic pointer that only changes when the root
//! splits, under a tree-wide structural lock. Displaced root references are
//! reclaimed through [`seize`], so a reader that loaded the old pointer can
//! always finish its traversal.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::inline_always)]

mod tracing_helpers;

pub mod compare;
pub mod config;
pub mod error;
mod node;
pub mod nodeversion;
pub mod ordering;
pub mod tree;

pub use compare::{KeyComparator, NaturalOrder};
pub use config::TreeConfig;
pub use error::InvariantViolation;
pub use tree::{ConcurrentBTree, TreeStats};
