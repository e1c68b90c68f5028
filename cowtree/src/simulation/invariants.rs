//! Structural invariant checking.
//!
//! Walks a whole tree and reports every way it deviates from a valid B-tree:
//! node occupancy, child counts, leaf depth, item order, the recorded length
//! and copy-on-write ownership.

use std::cmp::Ordering;
use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::btree::BTree;
use crate::btree::cow::CowToken;
use crate::btree::node::Node;
use crate::compare::Comparator;

/// An invariant violation found in a tree.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violation.
    pub description: String,
    /// Operation index where it was detected.
    pub operation_index: usize,
    /// Additional context.
    pub context: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation {}: {} ({})",
            self.operation_index, self.description, self.context
        )
    }
}

/// Accumulates violations across the operations of a run.
#[derive(Debug, Default)]
pub struct InvariantChecker {
    violations: Vec<InvariantViolation>,
}

impl InvariantChecker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }

    #[must_use]
    pub const fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn into_violations(self) -> Vec<InvariantViolation> {
        self.violations
    }

    pub fn add_violation(&mut self, violation: InvariantViolation) {
        self.violations.push(violation);
    }

    /// Check the shape and order of `tree`.
    pub fn check_structure<T: Debug, C: Comparator<T>>(
        &mut self,
        tree: &BTree<T, C>,
        operation_index: usize,
    ) {
        let mut walk = Walk {
            tree,
            token: tree.cow_token(),
            operation_index,
            leaf_depth: None,
            count: 0,
            previous: None,
            violations: &mut self.violations,
        };
        if let Some(root) = tree.root_node() {
            walk.check_ownership(root, "root");
            walk.node(root, 0, true);
        }
        let count = walk.count;
        if count != tree.len() {
            self.violations.push(InvariantViolation {
                description: "Length does not match item count".to_string(),
                operation_index,
                context: format!("len() = {}, counted {count}", tree.len()),
            });
        }
    }

    /// Check that `tree` holds exactly `expected`, in order.
    pub fn check_contents(
        &mut self,
        tree: &BTree<i64, impl Comparator<i64>>,
        expected: impl IntoIterator<Item = i64>,
        operation_index: usize,
    ) {
        let actual: Vec<i64> = tree.iter().copied().collect();
        let expected: Vec<i64> = expected.into_iter().collect();
        if actual != expected {
            let first_difference = actual
                .iter()
                .zip(&expected)
                .position(|(a, e)| a != e)
                .unwrap_or_else(|| actual.len().min(expected.len()));
            self.violations.push(InvariantViolation {
                description: "Tree contents diverge from model".to_string(),
                operation_index,
                context: format!(
                    "tree has {} items, model has {}, first difference at {first_difference}",
                    actual.len(),
                    expected.len()
                ),
            });
        }
    }
}

/// Run every structural check on `tree` and return the violations found.
pub fn check_tree<T: Debug, C: Comparator<T>>(tree: &BTree<T, C>) -> Vec<InvariantViolation> {
    let mut checker = InvariantChecker::new();
    checker.check_structure(tree, 0);
    checker.into_violations()
}

struct Walk<'a, T, C> {
    tree: &'a BTree<T, C>,
    token: CowToken,
    operation_index: usize,
    leaf_depth: Option<usize>,
    count: usize,
    previous: Option<&'a T>,
    violations: &'a mut Vec<InvariantViolation>,
}

impl<'a, T: Debug, C: Comparator<T>> Walk<'a, T, C> {
    fn violation(&mut self, description: &str, context: String) {
        self.violations.push(InvariantViolation {
            description: description.to_string(),
            operation_index: self.operation_index,
            context,
        });
    }

    /// A node carrying the tree's token may only be referenced once.
    fn check_ownership(&mut self, node: &Arc<Node<T>>, at: &str) {
        if node.owner() == self.token && Arc::strong_count(node) != 1 {
            self.violation(
                "Writable node is shared",
                format!("{at}: token {}, {} references", self.token.as_u64(), Arc::strong_count(node)),
            );
        }
    }

    fn node(&mut self, node: &'a Node<T>, depth: usize, is_root: bool) {
        let degree = self.tree.degree();
        let len = node.len();
        if len > 2 * degree - 1 {
            self.violation("Node overfull", format!("depth {depth}: {len} items"));
        }
        if !is_root && len < degree - 1 {
            self.violation("Node underfull", format!("depth {depth}: {len} items"));
        }
        if is_root && len == 0 && !node.is_leaf() {
            self.violation("Empty root has children", format!("{} children", node.children().len()));
        }

        if node.is_leaf() {
            match self.leaf_depth {
                None => self.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    self.violation(
                        "Leaves at different depths",
                        format!("expected {expected}, found {depth}"),
                    );
                }
                Some(_) => {}
            }
            for item in node.items() {
                self.item(item);
            }
            return;
        }

        if node.children().len() != len + 1 {
            self.violation(
                "Wrong child count",
                format!("depth {depth}: {len} items, {} children", node.children().len()),
            );
            return;
        }
        for (i, child) in node.children().iter().enumerate() {
            self.check_ownership(child, "child");
            self.node(child, depth + 1, false);
            if let Some(item) = node.items().get(i) {
                self.item(item);
            }
        }
    }

    fn item(&mut self, item: &'a T) {
        self.count += 1;
        if let Some(previous) = self.previous {
            match self.tree.comparator().compare(previous, item) {
                Ok(Ordering::Less) => {}
                Ok(order) => self.violation(
                    "Items out of order",
                    format!("{previous:?} followed by {item:?} compares {order:?}"),
                ),
                Err(e) => self.violation(
                    "Items cannot be compared",
                    format!("{previous:?} vs {item:?}: {e}"),
                ),
            }
        }
        self.previous = Some(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::perm;

    #[test]
    fn test_valid_tree_has_no_violations() {
        let mut tree: BTree<i64> = BTree::new(2).unwrap();
        for item in perm(300, 1) {
            tree.replace_or_insert(item).unwrap();
        }
        assert!(check_tree(&tree).is_empty());
        let clone = tree.clone();
        assert!(check_tree(&clone).is_empty());
    }

    #[test]
    fn test_contents_mismatch_is_reported() {
        let mut tree: BTree<i64> = BTree::new(3).unwrap();
        for item in 0..10 {
            tree.replace_or_insert(item).unwrap();
        }
        let mut checker = InvariantChecker::new();
        checker.check_contents(&tree, 0..10, 0);
        assert!(!checker.has_violations());

        checker.check_contents(&tree, 0..9, 7);
        assert_eq!(checker.violations().len(), 1);
        let violation = &checker.violations()[0];
        assert_eq!(violation.operation_index, 7);
        assert_eq!(violation.description, "Tree contents diverge from model");
        assert_eq!(
            violation.context,
            "tree has 10 items, model has 9, first difference at 9"
        );
        assert_eq!(
            violation.to_string(),
            "operation 7: Tree contents diverge from model \
             (tree has 10 items, model has 9, first difference at 9)"
        );
    }
}
