//! Copy-on-write B-tree.
//!
//! # Pre-conditions
//!
//! - The comparator is a strict total order over every item ever inserted.
//! - Items are never mutated in a way that changes their ordering while they
//!   are in a tree.
//!
//! # Invariants
//!
//! - Every non-root node holds between `degree - 1` and `2 * degree - 1`
//!   items; the root holds at most `2 * degree - 1`.
//! - Every internal node with `k` items has `k + 1` children.
//! - All leaves sit at the same depth.
//! - Items are strictly increasing under in-order traversal.
//! - `len()` equals the number of items reachable from the root.
//!
//! # Design
//!
//! - Clone is O(1): the clone shares the root and both trees receive fresh
//!   copy-on-write tokens, so each side copies shared nodes lazily on its
//!   first write to them
//! - Insertion splits full nodes on the way down; removal grows minimal nodes
//!   on the way down. Neither ever has to walk back up.
//! - A comparator failure aborts the operation but leaves a valid tree: any
//!   split, borrow or merge already performed preserves every invariant.

use std::ops::Bound;
use std::sync::Arc;

use crate::btree::cow::CowContext;
use crate::btree::free_list::{DEFAULT_FREE_LIST_CAPACITY, FreeList};
use crate::btree::iter::Iter;
use crate::btree::node::{Node, Removal};
use crate::compare::{CompareError, Comparator, Natural, Orderable};

/// Smallest accepted degree.
pub const MIN_DEGREE: usize = 2;

/// Largest accepted degree. A node holds up to `2 * degree - 1` items, which
/// must fit in a `usize`.
pub const MAX_DEGREE: usize = usize::MAX / 2;

/// Errors produced by tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BTreeError {
    /// The requested degree is outside `MIN_DEGREE..=MAX_DEGREE`.
    InvalidDegree { degree: usize },
    /// The comparator could not order two items.
    Compare(CompareError),
}

impl std::fmt::Display for BTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDegree { degree } => {
                write!(
                    f,
                    "invalid degree {degree}: must be between {MIN_DEGREE} and {MAX_DEGREE}"
                )
            }
            Self::Compare(e) => write!(f, "comparison failed: {e}"),
        }
    }
}

impl std::error::Error for BTreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compare(e) => Some(e),
            Self::InvalidDegree { .. } => None,
        }
    }
}

impl From<CompareError> for BTreeError {
    fn from(e: CompareError) -> Self {
        Self::Compare(e)
    }
}

/// An ordered set of items with cheap copy-on-write clones.
///
/// `BTree` is not internally synchronized: one tree must not be written from
/// two threads at once. Distinct clones, however, may be read and written
/// concurrently from different threads, since they never write to a shared
/// node.
pub struct BTree<T, C = Natural> {
    root: Option<Arc<Node<T>>>,
    length: usize,
    degree: usize,
    comparator: Arc<C>,
    cow: CowContext<T>,
}

impl<T: Orderable> BTree<T, Natural> {
    /// Create an empty tree of the given degree, ordered by the items'
    /// natural ordering, with a private free list.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::InvalidDegree`] if `degree` is below
    /// [`MIN_DEGREE`] or above [`MAX_DEGREE`].
    pub fn new(degree: usize) -> Result<Self, BTreeError> {
        Self::with_comparator(degree, Natural)
    }

    /// Like [`BTree::new`], drawing nodes from `free_list`.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::InvalidDegree`] if `degree` is below
    /// [`MIN_DEGREE`] or above [`MAX_DEGREE`].
    pub fn new_with_free_list(
        degree: usize,
        free_list: Arc<FreeList<T>>,
    ) -> Result<Self, BTreeError> {
        Self::with_comparator_and_free_list(degree, Natural, free_list)
    }
}

impl<T, C: Comparator<T>> BTree<T, C> {
    /// Create an empty tree ordered by `comparator`.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::InvalidDegree`] if `degree` is below
    /// [`MIN_DEGREE`] or above [`MAX_DEGREE`].
    pub fn with_comparator(degree: usize, comparator: C) -> Result<Self, BTreeError> {
        Self::with_comparator_and_free_list(
            degree,
            comparator,
            FreeList::new(DEFAULT_FREE_LIST_CAPACITY),
        )
    }

    /// Create an empty tree ordered by `comparator`, drawing nodes from
    /// `free_list`.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::InvalidDegree`] if `degree` is below
    /// [`MIN_DEGREE`] or above [`MAX_DEGREE`].
    pub fn with_comparator_and_free_list(
        degree: usize,
        comparator: C,
        free_list: Arc<FreeList<T>>,
    ) -> Result<Self, BTreeError> {
        if !(MIN_DEGREE..=MAX_DEGREE).contains(&degree) {
            return Err(BTreeError::InvalidDegree { degree });
        }
        let cow = CowContext::new(free_list);
        tracing::debug!(degree, token = cow.token().as_u64(), "created tree");
        Ok(Self {
            root: None,
            length: 0,
            degree,
            comparator: Arc::new(comparator),
            cow,
        })
    }

    /// Find the item equal to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] if `key` cannot be ordered against
    /// an item met on the search path.
    pub fn get(&self, key: &T) -> Result<Option<&T>, BTreeError> {
        match &self.root {
            Some(root) => Ok(root.get(key, &*self.comparator)?),
            None => Ok(None),
        }
    }

    /// Whether an item equal to `key` is present.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] on comparator failure.
    pub fn has(&self, key: &T) -> Result<bool, BTreeError> {
        Ok(self.get(key)?.is_some())
    }

    /// The smallest item, if any.
    pub fn min(&self) -> Option<&T> {
        self.root.as_deref().and_then(Node::min)
    }

    /// The largest item, if any.
    pub fn max(&self) -> Option<&T> {
        self.root.as_deref().and_then(Node::max)
    }

    /// Number of items in the tree.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[must_use]
    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// The comparator ordering this tree, shared with its clones.
    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// The free list this tree draws nodes from.
    pub const fn free_list(&self) -> &Arc<FreeList<T>> {
        self.cow.free_list()
    }

    /// Iterate over all items in increasing order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.root.as_deref(), self.length)
    }

    /// Visit every item in increasing order until `visit` returns `false`.
    ///
    /// # Errors
    ///
    /// Never fails in practice, since an unbounded walk does not compare
    /// items. The `Result` keeps the signature in line with the bounded
    /// variants.
    pub fn ascend<F>(&self, visit: F) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        self.ascend_bounded(Bound::Unbounded, Bound::Unbounded, visit)
    }

    /// Visit items in `[greater_or_equal, less_than)` in increasing order.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] if a bound cannot be ordered against
    /// an item.
    pub fn ascend_range<F>(
        &self,
        greater_or_equal: &T,
        less_than: &T,
        visit: F,
    ) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        self.ascend_bounded(
            Bound::Included(greater_or_equal),
            Bound::Excluded(less_than),
            visit,
        )
    }

    /// Visit items below `pivot` in increasing order.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] on comparator failure.
    pub fn ascend_less_than<F>(&self, pivot: &T, visit: F) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        self.ascend_bounded(Bound::Unbounded, Bound::Excluded(pivot), visit)
    }

    /// Visit items at or above `pivot` in increasing order.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] on comparator failure.
    pub fn ascend_greater_or_equal<F>(&self, pivot: &T, visit: F) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        self.ascend_bounded(Bound::Included(pivot), Bound::Unbounded, visit)
    }

    /// Visit every item in decreasing order until `visit` returns `false`.
    ///
    /// # Errors
    ///
    /// See [`BTree::ascend`].
    pub fn descend<F>(&self, visit: F) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        self.descend_bounded(Bound::Unbounded, Bound::Unbounded, visit)
    }

    /// Visit items in `(greater_than, less_or_equal]` in decreasing order.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] on comparator failure.
    pub fn descend_range<F>(
        &self,
        less_or_equal: &T,
        greater_than: &T,
        visit: F,
    ) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        self.descend_bounded(
            Bound::Included(less_or_equal),
            Bound::Excluded(greater_than),
            visit,
        )
    }

    /// Visit items at or below `pivot` in decreasing order.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] on comparator failure.
    pub fn descend_less_or_equal<F>(&self, pivot: &T, visit: F) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        self.descend_bounded(Bound::Included(pivot), Bound::Unbounded, visit)
    }

    /// Visit items above `pivot` in decreasing order.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] on comparator failure.
    pub fn descend_greater_than<F>(&self, pivot: &T, visit: F) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        self.descend_bounded(Bound::Unbounded, Bound::Excluded(pivot), visit)
    }

    fn ascend_bounded<F>(
        &self,
        lower: Bound<&T>,
        upper: Bound<&T>,
        mut visit: F,
    ) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        if let Some(root) = &self.root {
            let _flow = root.ascend(lower, upper, &*self.comparator, &mut visit)?;
        }
        Ok(())
    }

    fn descend_bounded<F>(
        &self,
        upper: Bound<&T>,
        lower: Bound<&T>,
        mut visit: F,
    ) -> Result<(), BTreeError>
    where
        F: FnMut(&T) -> bool,
    {
        if let Some(root) = &self.root {
            let _flow = root.descend(upper, lower, &*self.comparator, &mut visit)?;
        }
        Ok(())
    }

    const fn max_items(&self) -> usize {
        self.degree * 2 - 1
    }

    const fn min_items(&self) -> usize {
        self.degree - 1
    }

    #[cfg(test)]
    pub(crate) const fn root_node(&self) -> Option<&Arc<Node<T>>> {
        self.root.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn cow_token(&self) -> crate::btree::cow::CowToken {
        self.cow.token()
    }
}

impl<T: Clone, C: Comparator<T>> BTree<T, C> {
    /// Insert `item`, replacing and returning an equal item if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] if `item` cannot be ordered against
    /// an item on its insertion path. The tree is left unchanged apart from
    /// node splits, and its length is not modified.
    pub fn replace_or_insert(&mut self, item: T) -> Result<Option<T>, BTreeError> {
        let max_items = self.max_items();
        let Some(mut root) = self.root.take() else {
            let mut leaf = self.cow.new_node();
            leaf.push_item(item);
            self.root = Some(Arc::new(leaf));
            self.length = 1;
            return Ok(None);
        };

        let node = self.cow.mutable_for(&mut root);
        if node.len() >= max_items {
            let (median, second) = node.split(max_items / 2, &self.cow);
            let mut grown = self.cow.new_node();
            grown.push_item(median);
            grown.children.push(root);
            grown.children.push(Arc::new(second));
            root = Arc::new(grown);
            tracing::trace!(degree = self.degree, "grew tree by one level");
        }

        let result = self
            .cow
            .mutable_for(&mut root)
            .insert(item, max_items, &self.cow, &*self.comparator);
        self.root = Some(root);

        let replaced = result?;
        if replaced.is_none() {
            self.length += 1;
        }
        Ok(replaced)
    }

    /// Remove and return the item equal to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BTreeError::Compare`] on comparator failure. Nodes may have
    /// been rebalanced but no item is removed.
    pub fn delete(&mut self, key: &T) -> Result<Option<T>, BTreeError> {
        self.remove(Removal::Item(key))
    }

    /// Remove and return the smallest item.
    pub fn delete_min(&mut self) -> Option<T> {
        self.remove(Removal::Min)
            .unwrap_or_else(|e| unreachable!("removing the minimum compared items: {e}"))
    }

    /// Remove and return the largest item.
    pub fn delete_max(&mut self) -> Option<T> {
        self.remove(Removal::Max)
            .unwrap_or_else(|e| unreachable!("removing the maximum compared items: {e}"))
    }

    fn remove(&mut self, target: Removal<'_, T>) -> Result<Option<T>, BTreeError> {
        let min_items = self.min_items();
        let Some(root) = self.root.as_mut() else {
            return Ok(None);
        };
        if root.len() == 0 {
            return Ok(None);
        }

        let node = self.cow.mutable_for(root);
        let result = node.remove(target, min_items, &self.cow, &*self.comparator);

        // A merge at the top level can empty the root even if the removal
        // itself then failed.
        if node.len() == 0 && !node.is_leaf() {
            let child = node.children.remove(0);
            let old = std::mem::replace(root, child);
            self.cow.free_node(old);
            tracing::trace!(degree = self.degree, "shrank tree by one level");
        }

        let removed = result?;
        if removed.is_some() {
            self.length -= 1;
        }
        Ok(removed)
    }

    /// Remove every item.
    ///
    /// Nodes referenced by no other tree are handed back to the free list,
    /// children before parents, until the free list is full. Nodes still
    /// shared with a clone are left to that clone.
    pub fn clear(&mut self) {
        let mut recycled = 0;
        if let Some(root) = self.root.take() {
            self.cow.free_subtree(root, &mut recycled);
        }
        tracing::debug!(dropped = self.length, recycled, "cleared tree");
        self.length = 0;
    }
}

impl<T, C> Clone for BTree<T, C> {
    /// O(1) lazy clone.
    ///
    /// Both trees receive fresh copy-on-write tokens and continue to share
    /// every node until one of them writes to it.
    #[allow(clippy::disallowed_methods)] // Arc::clone shares the comparator between clones
    fn clone(&self) -> Self {
        let cow = self.cow.fork();
        Self {
            root: self.root.clone(),
            length: self.length,
            degree: self.degree,
            comparator: Arc::clone(&self.comparator),
            cow,
        }
    }
}

impl<T: std::fmt::Debug, C> std::fmt::Debug for BTree<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(Iter::new(self.root.as_deref(), self.length))
            .finish()
    }
}

impl<'a, T, C: Comparator<T>> IntoIterator for &'a BTree<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
