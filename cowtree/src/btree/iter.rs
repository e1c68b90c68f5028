//! In-order iteration over a tree.

use std::iter::FusedIterator;

use crate::btree::node::Node;

/// Iterator over the items of a [`crate::BTree`] in increasing order.
///
/// Created by [`crate::BTree::iter`]. Holds the path from the root to the
/// next item, so it never compares items and allocates at most one stack
/// slot per level.
pub struct Iter<'a, T> {
    /// Nodes on the current path with the index of their next item.
    stack: Vec<(&'a Node<T>, usize)>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(root: Option<&'a Node<T>>, len: usize) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: len,
        };
        if let Some(root) = root {
            iter.descend_left(root);
        }
        iter
    }

    fn descend_left(&mut self, mut node: &'a Node<T>) {
        loop {
            self.stack.push((node, 0));
            match node.children().first() {
                Some(child) => node = child.as_ref(),
                None => break,
            }
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            let top = self.stack.last_mut()?;
            let node = top.0;
            let index = top.1;
            if index < node.len() {
                top.1 += 1;
                if let Some(child) = node.children().get(index + 1) {
                    self.descend_left(child);
                }
                self.remaining = self.remaining.saturating_sub(1);
                return Some(&node.items()[index]);
            }
            self.stack.pop();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}
