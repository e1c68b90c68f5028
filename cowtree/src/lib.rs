// An ordered in-memory container with cheap snapshots.
//
// Components:
//  - Comparators: natural ordering, custom orderings, reversed views
//  - B-tree: nodes, copy-on-write context, shared free list of nodes
//  - Dynamic values: items whose kind is only known at runtime
//
// Cloning a tree is O(1). Clones share nodes until one side writes, and
// separate clones can be used from separate threads.

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::disallowed_methods
    )
)]

pub mod btree;
pub mod compare;
pub mod value;

#[cfg(test)]
mod simulation;
#[cfg(test)]
mod testing;

pub use btree::{
    BTree, BTreeError, DEFAULT_FREE_LIST_CAPACITY, FreeList, Iter, MAX_DEGREE, MIN_DEGREE,
};
pub use compare::{CompareError, Comparator, Natural, Orderable, Reversed};
pub use value::Value;
