//! Free list of recycled B-tree nodes.
//!
//! The free list reduces allocation churn by keeping emptied nodes, with
//! their item and child buffers still allocated, so that later splits and
//! copies can reuse them.
//!
//! # Design
//!
//! - Bounded: at most `capacity` spare nodes are kept; extra nodes are dropped
//! - Uses a Vec as a stack for O(1) get/put
//! - Thread-safe: uses a Mutex for internal synchronization, because trees
//!   cloned from one another share their free list and may run on different
//!   threads
//! - Holds no ordering or ownership semantics: a node in the free list
//!   belongs to no tree
//!
//! # Invariants
//!
//! - `len() <= capacity()`
//! - Every spare node is empty and carries [`CowToken::UNOWNED`]

use std::sync::{Arc, Mutex};

use crate::btree::cow::CowToken;
use crate::btree::node::Node;

/// Capacity of the private free list created by constructors that do not
/// take one.
pub const DEFAULT_FREE_LIST_CAPACITY: usize = 32;

/// A bounded pool of spare nodes, shareable between trees.
///
/// Create one with [`FreeList::new`] and pass the handle to
/// [`crate::BTree::new_with_free_list`] to share it across several trees.
///
/// # Thread safety
///
/// All access goes through an internal mutex, so one free list may serve
/// trees that are mutated concurrently on different threads.
pub struct FreeList<T> {
    /// Spare nodes available for reuse.
    nodes: Mutex<Vec<Node<T>>>,
    /// Maximum number of spare nodes kept.
    capacity: usize,
}

impl<T> FreeList<T> {
    /// Create an empty free list holding at most `capacity` spare nodes.
    ///
    /// A capacity of zero disables recycling.
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            nodes: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        })
    }

    /// Take a spare node, or allocate one if none is left, stamped with
    /// `owner`.
    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    pub(crate) fn get(&self, owner: CowToken) -> Node<T> {
        let spare = self.nodes.lock().expect("lock poisoned").pop();
        let mut node = spare.unwrap_or_else(Node::new);
        node.set_owner(owner);
        node
    }

    /// Empty `node` and keep it for reuse.
    ///
    /// Returns `false` if the free list is full, in which case the node is
    /// dropped.
    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    pub(crate) fn put(&self, mut node: Node<T>) -> bool {
        // Release items and children before taking the lock.
        node.reset();
        let mut nodes = self.nodes.lock().expect("lock poisoned");
        if nodes.len() < self.capacity {
            nodes.push(node);
            true
        } else {
            drop(nodes);
            tracing::trace!(capacity = self.capacity, "free list full, dropping node");
            false
        }
    }

    /// Number of spare nodes currently held.
    #[must_use]
    #[allow(clippy::expect_used)] // Mutex poisoning indicates unrecoverable state
    pub fn len(&self) -> usize {
        self.nodes.lock().expect("lock poisoned").len()
    }

    /// Whether no spare node is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of spare nodes kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> std::fmt::Debug for FreeList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeList")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
