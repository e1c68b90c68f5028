//! In-memory copy-on-write B-tree.
//!
//! # Structure
//!
//! The tree is made of reference-counted [`node::Node`]s. Each node records
//! the copy-on-write token of the tree generation allowed to modify it in
//! place; all other nodes are copied before being written. Emptied nodes are
//! returned to a [`FreeList`], which trees may share.
//!
//! # Usage
//!
//! ```
//! use cowtree::BTree;
//!
//! let mut tree = BTree::new(4).unwrap();
//! for item in [5i64, 1, 9, 3] {
//!     tree.replace_or_insert(item).unwrap();
//! }
//!
//! let snapshot = tree.clone();
//! tree.delete(&9).unwrap();
//!
//! assert_eq!(tree.max(), Some(&5));
//! assert_eq!(snapshot.max(), Some(&9));
//!
//! let mut below_five = Vec::new();
//! snapshot
//!     .ascend_less_than(&5, |item| {
//!         below_five.push(*item);
//!         true
//!     })
//!     .unwrap();
//! assert_eq!(below_five, vec![1, 3]);
//! ```

pub(crate) mod cow;
mod free_list;
mod iter;
pub(crate) mod node;
mod tree;

pub use free_list::{DEFAULT_FREE_LIST_CAPACITY, FreeList};
pub use iter::Iter;
pub use tree::{BTree, BTreeError, MAX_DEGREE, MIN_DEGREE};
