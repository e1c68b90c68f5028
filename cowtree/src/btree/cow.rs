//! Copy-on-write context.
//!
//! Every tree generation carries a [`CowToken`]. Nodes remember the token of
//! the generation that allocated or copied them. A mutating traversal may
//! write to a node in place only when the node carries the tree's current
//! token; any other node is copied first and the copy replaces it in the
//! parent's child slot.
//!
//! Cloning a tree forks the context: both the source and the clone receive
//! fresh tokens, so every node that existed at clone time is foreign to both
//! of them and is copied by whichever side writes to it first.
//!
//! # Invariants
//!
//! - Tokens are never reused within a process.
//! - A node carrying a tree's current token is reachable only from that tree.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::btree::free_list::FreeList;
use crate::btree::node::Node;

/// Next token to issue. Zero is reserved for nodes sitting in a free list.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifies one generation of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CowToken(u64);

impl CowToken {
    /// Token carried by recycled nodes that belong to no tree.
    pub const UNOWNED: Self = Self(0);

    /// Issue a token that has never been handed out before.
    pub fn fresh() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// The mutation context of one tree.
///
/// Holds the tree's current token and its free list handle. The token lives
/// in an atomic so that forking can rotate it through a shared reference.
pub struct CowContext<T> {
    token: AtomicU64,
    free_list: Arc<FreeList<T>>,
}

impl<T> CowContext<T> {
    pub fn new(free_list: Arc<FreeList<T>>) -> Self {
        Self {
            token: AtomicU64::new(CowToken::fresh().as_u64()),
            free_list,
        }
    }

    /// The token nodes must carry to be written in place.
    pub fn token(&self) -> CowToken {
        CowToken(self.token.load(Ordering::Acquire))
    }

    pub const fn free_list(&self) -> &Arc<FreeList<T>> {
        &self.free_list
    }

    /// Rotate this context to a fresh token and return a second context,
    /// with its own fresh token, sharing the same free list.
    #[allow(clippy::disallowed_methods)] // Arc::clone is required for shared ownership
    pub fn fork(&self) -> Self {
        let previous = self.token.swap(CowToken::fresh().as_u64(), Ordering::AcqRel);
        let forked = Self::new(Arc::clone(&self.free_list));
        tracing::debug!(
            previous,
            source = self.token().as_u64(),
            clone = forked.token().as_u64(),
            "forked copy-on-write context"
        );
        forked
    }

    /// An empty node stamped with this context's token.
    pub fn new_node(&self) -> Node<T> {
        self.free_list.get(self.token())
    }

    /// Hand a node back for reuse once nothing else references it.
    ///
    /// Nodes still shared with another tree are simply released. Returns
    /// `false` only when the node was exclusively ours and the free list was
    /// already full.
    pub fn free_node(&self, node: Arc<Node<T>>) -> bool {
        match Arc::try_unwrap(node) {
            Ok(node) => self.free_list.put(node),
            Err(_shared) => true,
        }
    }

    /// Hand back every node of a subtree that nothing else references,
    /// children before their parent.
    ///
    /// Stops at the first node the free list has no room for and returns
    /// `false`; the rest of the subtree is dropped. `recycled` counts the
    /// nodes kept.
    pub fn free_subtree(&self, node: Arc<Node<T>>, recycled: &mut usize) -> bool {
        let Ok(mut node) = Arc::try_unwrap(node) else {
            return true;
        };
        for child in node.children.drain(..) {
            if !self.free_subtree(child, recycled) {
                return false;
            }
        }
        if self.free_list.put(node) {
            *recycled += 1;
            true
        } else {
            false
        }
    }
}

impl<T: Clone> CowContext<T> {
    /// Make the node in `slot` writable by this context.
    ///
    /// A node already carrying our token is returned as is. Anything else is
    /// replaced in `slot` by a copy holding the same items and the same child
    /// references, stamped with our token.
    ///
    /// # Panics
    ///
    /// Panics if a node carrying our token is referenced from somewhere else,
    /// which would mean two trees share a writable node.
    #[allow(clippy::expect_used)] // a writable node reachable from two trees is corruption
    pub fn mutable_for<'n>(&self, slot: &'n mut Arc<Node<T>>) -> &'n mut Node<T> {
        let token = self.token();
        if slot.owner() != token {
            let mut copy = self.new_node();
            copy.copy_from(slot);
            tracing::trace!(
                from = slot.owner().as_u64(),
                to = token.as_u64(),
                items = copy.len(),
                "copied shared node"
            );
            *slot = Arc::new(copy);
        }
        Arc::get_mut(slot).expect("node carrying the current token must not be shared")
    }
}
