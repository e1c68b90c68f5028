//! B-tree node type and structural operations.
//!
//! A node holds up to `2 * degree - 1` items in increasing order. Internal
//! nodes also hold `items.len() + 1` child references:
//! - `children[i]` contains items < `items[i]`
//! - `children[i + 1]` contains items > `items[i]`
//!
//! Children are reference counted so that cloned trees can share whole
//! subtrees. Every mutating method assumes the caller already made `self`
//! writable through [`CowContext::mutable_for`] and goes through the same
//! accessor before touching a child.

use std::cmp::Ordering;
use std::mem;
use std::ops::{Bound, ControlFlow};
use std::sync::Arc;

use crate::btree::cow::{CowContext, CowToken};
use crate::compare::{CompareError, Comparator};

/// Which item a removal descends towards.
pub enum Removal<'k, T> {
    /// The smallest item of the subtree.
    Min,
    /// The largest item of the subtree.
    Max,
    /// The item equal to the key, if any.
    Item(&'k T),
}

impl<T> Clone for Removal<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Removal<'_, T> {}

/// A B-tree node.
#[derive(Debug)]
pub struct Node<T> {
    /// Items in strictly increasing order.
    pub(crate) items: Vec<T>,
    /// Child references. Empty for a leaf, `items.len() + 1` otherwise.
    pub(crate) children: Vec<Arc<Node<T>>>,
    /// Token of the tree generation allowed to write this node in place.
    owner: CowToken,
}

impl<T> Node<T> {
    /// Create an empty, unowned leaf.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            children: Vec::new(),
            owner: CowToken::UNOWNED,
        }
    }

    pub const fn owner(&self) -> CowToken {
        self.owner
    }

    pub(crate) const fn set_owner(&mut self, owner: CowToken) {
        self.owner = owner;
    }

    /// Drop all items and child references, keeping the buffers.
    pub(crate) fn reset(&mut self) {
        self.items.clear();
        self.children.clear();
        self.owner = CowToken::UNOWNED;
    }

    /// Number of items held by this node.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn children(&self) -> &[Arc<Self>] {
        &self.children
    }

    pub(crate) fn push_item(&mut self, item: T) {
        self.items.push(item);
    }

    /// Find the position of `key`.
    ///
    /// Returns `(i, true)` if `items[i]` equals `key`, otherwise `(i, false)`
    /// where `i` is the index `key` would be inserted at.
    pub fn find<C>(&self, key: &T, cmp: &C) -> Result<(usize, bool), CompareError>
    where
        C: Comparator<T> + ?Sized,
    {
        let mut low = 0;
        let mut high = self.items.len();
        while low < high {
            let mid = low + (high - low) / 2;
            match cmp.compare(&self.items[mid], key)? {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Ok((mid, true)),
            }
        }
        Ok((low, false))
    }

    /// Look up the item equal to `key` in this subtree.
    pub fn get<C>(&self, key: &T, cmp: &C) -> Result<Option<&T>, CompareError>
    where
        C: Comparator<T> + ?Sized,
    {
        let mut node = self;
        loop {
            let (i, found) = node.find(key, cmp)?;
            if found {
                return Ok(Some(&node.items[i]));
            }
            match node.children.get(i) {
                Some(child) => node = child.as_ref(),
                None => return Ok(None),
            }
        }
    }

    /// The smallest item of this subtree.
    pub fn min(&self) -> Option<&T> {
        let mut node = self;
        while let Some(child) = node.children.first() {
            node = child.as_ref();
        }
        node.items.first()
    }

    /// The largest item of this subtree.
    pub fn max(&self) -> Option<&T> {
        let mut node = self;
        while let Some(child) = node.children.last() {
            node = child.as_ref();
        }
        node.items.last()
    }

    /// Visit items of this subtree in increasing order, starting at `lower`
    /// and stopping before the first item past `upper`.
    ///
    /// Returns `Break` once the traversal must end, either because `visit`
    /// asked to stop or because the upper bound was reached.
    pub fn ascend<C, F>(
        &self,
        lower: Bound<&T>,
        upper: Bound<&T>,
        cmp: &C,
        visit: &mut F,
    ) -> Result<ControlFlow<()>, CompareError>
    where
        C: Comparator<T> + ?Sized,
        F: FnMut(&T) -> bool,
    {
        let start = match lower {
            Bound::Unbounded => 0,
            Bound::Included(key) => self.find(key, cmp)?.0,
            Bound::Excluded(key) => {
                let (i, found) = self.find(key, cmp)?;
                if found { i + 1 } else { i }
            }
        };

        // Only the first child visited can hold items below the lower bound.
        let mut lower = lower;
        for i in start..=self.items.len() {
            if let Some(child) = self.children.get(i) {
                if child.ascend(lower, upper, cmp, visit)?.is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
            lower = Bound::Unbounded;

            let Some(item) = self.items.get(i) else {
                break;
            };
            let past_upper = match upper {
                Bound::Unbounded => false,
                Bound::Included(key) => cmp.compare(item, key)? == Ordering::Greater,
                Bound::Excluded(key) => cmp.compare(item, key)? != Ordering::Less,
            };
            if past_upper || !visit(item) {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Visit items of this subtree in decreasing order, starting at `upper`
    /// and stopping before the first item past `lower`.
    pub fn descend<C, F>(
        &self,
        upper: Bound<&T>,
        lower: Bound<&T>,
        cmp: &C,
        visit: &mut F,
    ) -> Result<ControlFlow<()>, CompareError>
    where
        C: Comparator<T> + ?Sized,
        F: FnMut(&T) -> bool,
    {
        let end = match upper {
            Bound::Unbounded => self.items.len(),
            Bound::Included(key) => {
                let (i, found) = self.find(key, cmp)?;
                if found { i + 1 } else { i }
            }
            Bound::Excluded(key) => self.find(key, cmp)?.0,
        };

        let mut upper = upper;
        for i in (0..=end).rev() {
            if let Some(child) = self.children.get(i) {
                if child.descend(upper, lower, cmp, visit)?.is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
            upper = Bound::Unbounded;

            if i == 0 {
                break;
            }
            let item = &self.items[i - 1];
            let past_lower = match lower {
                Bound::Unbounded => false,
                Bound::Included(key) => cmp.compare(item, key)? == Ordering::Less,
                Bound::Excluded(key) => cmp.compare(item, key)? != Ordering::Greater,
            };
            if past_lower || !visit(item) {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Node<T> {
    /// Fill this (empty) node with the items and child references of `other`.
    ///
    /// Children are shared, not copied.
    #[allow(clippy::disallowed_methods)] // item and Arc clones are the copy in copy-on-write
    pub(crate) fn copy_from(&mut self, other: &Self) {
        debug_assert!(self.items.is_empty() && self.children.is_empty());
        self.items.extend(other.items.iter().cloned());
        self.children.extend(other.children.iter().cloned());
    }

    /// Split this node at item `i`.
    ///
    /// Returns the item at `i` and a new node holding everything after it.
    /// This node keeps everything before it.
    pub(crate) fn split(&mut self, i: usize, cow: &CowContext<T>) -> (T, Self) {
        let mut next = cow.new_node();
        next.items.extend(self.items.drain(i + 1..));
        let item = self.items.remove(i);
        if !self.is_leaf() {
            next.children.extend(self.children.drain(i + 1..));
        }
        (item, next)
    }

    /// Split `children[i]` if it is full, promoting its median into this
    /// node. Returns whether a split happened.
    pub(crate) fn maybe_split_child(
        &mut self,
        i: usize,
        max_items: usize,
        cow: &CowContext<T>,
    ) -> bool {
        if self.children[i].len() < max_items {
            return false;
        }
        let first = cow.mutable_for(&mut self.children[i]);
        let (item, second) = first.split(max_items / 2, cow);
        tracing::trace!(
            index = i,
            left = first.len(),
            right = second.len(),
            "split child"
        );
        self.items.insert(i, item);
        self.children.insert(i + 1, Arc::new(second));
        true
    }

    /// Insert `item` into this subtree, replacing an equal item if present.
    ///
    /// Full children are split before descending into them, so the leaf that
    /// finally receives the item always has room.
    pub(crate) fn insert<C>(
        &mut self,
        item: T,
        max_items: usize,
        cow: &CowContext<T>,
        cmp: &C,
    ) -> Result<Option<T>, CompareError>
    where
        C: Comparator<T> + ?Sized,
    {
        let (mut i, found) = self.find(&item, cmp)?;
        if found {
            return Ok(Some(mem::replace(&mut self.items[i], item)));
        }
        if self.is_leaf() {
            self.items.insert(i, item);
            return Ok(None);
        }
        if self.maybe_split_child(i, max_items, cow) {
            match cmp.compare(&item, &self.items[i])? {
                Ordering::Less => {}
                Ordering::Greater => i += 1,
                Ordering::Equal => return Ok(Some(mem::replace(&mut self.items[i], item))),
            }
        }
        cow.mutable_for(&mut self.children[i])
            .insert(item, max_items, cow, cmp)
    }

    /// Remove the item selected by `target` from this subtree.
    ///
    /// Every child descended into is first brought above minimum occupancy,
    /// so removing from it can never leave it underfull. An item found in an
    /// internal node is replaced by its in-order predecessor.
    #[allow(clippy::expect_used)] // a child above minimum occupancy always has a maximum
    pub(crate) fn remove<C>(
        &mut self,
        target: Removal<'_, T>,
        min_items: usize,
        cow: &CowContext<T>,
        cmp: &C,
    ) -> Result<Option<T>, CompareError>
    where
        C: Comparator<T> + ?Sized,
    {
        let (i, found) = match target {
            Removal::Min => {
                if self.is_leaf() {
                    return Ok((!self.items.is_empty()).then(|| self.items.remove(0)));
                }
                (0, false)
            }
            Removal::Max => {
                if self.is_leaf() {
                    return Ok(self.items.pop());
                }
                (self.items.len(), false)
            }
            Removal::Item(key) => {
                let (i, found) = self.find(key, cmp)?;
                if self.is_leaf() {
                    return Ok(found.then(|| self.items.remove(i)));
                }
                (i, found)
            }
        };

        if self.children[i].len() <= min_items {
            self.grow_child(i, min_items, cow);
            return self.remove(target, min_items, cow, cmp);
        }

        let child = cow.mutable_for(&mut self.children[i]);
        if found {
            let predecessor = child
                .remove(Removal::Max, min_items, cow, cmp)?
                .expect("child above minimum occupancy holds a predecessor");
            return Ok(Some(mem::replace(&mut self.items[i], predecessor)));
        }
        child.remove(target, min_items, cow, cmp)
    }

    /// Bring `children[i]` above minimum occupancy.
    ///
    /// Borrows an item from the left sibling if it can spare one, else from
    /// the right sibling, else merges the child with a sibling and the
    /// separating item.
    fn grow_child(&mut self, i: usize, min_items: usize, cow: &CowContext<T>) {
        if i > 0 && self.children[i - 1].len() > min_items {
            let (left, right) = self.children.split_at_mut(i);
            let steal_from = cow.mutable_for(&mut left[i - 1]);
            let child = cow.mutable_for(&mut right[0]);

            let last = steal_from.items.len() - 1;
            let stolen = steal_from.items.remove(last);
            let separator = mem::replace(&mut self.items[i - 1], stolen);
            child.items.insert(0, separator);
            if let Some(grandchild) = steal_from.children.pop() {
                child.children.insert(0, grandchild);
            }
            tracing::trace!(index = i, "borrowed from left sibling");
        } else if i < self.items.len() && self.children[i + 1].len() > min_items {
            let (left, right) = self.children.split_at_mut(i + 1);
            let child = cow.mutable_for(&mut left[i]);
            let steal_from = cow.mutable_for(&mut right[0]);

            let stolen = steal_from.items.remove(0);
            let separator = mem::replace(&mut self.items[i], stolen);
            child.items.push(separator);
            if !steal_from.is_leaf() {
                child.children.push(steal_from.children.remove(0));
            }
            tracing::trace!(index = i, "borrowed from right sibling");
        } else {
            let i = if i >= self.items.len() { i - 1 } else { i };
            let separator = self.items.remove(i);
            let sibling = self.children.remove(i + 1);
            let child = cow.mutable_for(&mut self.children[i]);
            child.items.push(separator);
            child.absorb(sibling, cow);
            tracing::trace!(index = i, items = child.len(), "merged children");
        }
    }

    /// Append the items and children of `sibling`, recycling it when no
    /// other tree references it.
    #[allow(clippy::disallowed_methods)] // a shared sibling must be copied, not moved
    fn absorb(&mut self, sibling: Arc<Self>, cow: &CowContext<T>) {
        match Arc::try_unwrap(sibling) {
            Ok(mut sibling) => {
                self.items.append(&mut sibling.items);
                self.children.append(&mut sibling.children);
                cow.free_list().put(sibling);
            }
            Err(shared) => {
                self.items.extend(shared.items.iter().cloned());
                self.children.extend(shared.children.iter().cloned());
            }
        }
    }
}
