use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::btree::BTree;
use crate::compare::Comparator;

/// Install a tracing subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// Override the default filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cowtree=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// `0..n` in ascending order.
pub fn rang(n: i64) -> Vec<i64> {
    (0..n).collect()
}

/// `0..n` shuffled deterministically by `seed`.
pub fn perm(n: i64, seed: u64) -> Vec<i64> {
    let mut items = rang(n);
    items.shuffle(&mut StdRng::seed_from_u64(seed));
    items
}

/// Every item of `tree`, in ascending order.
pub fn all<C: Comparator<i64>>(tree: &BTree<i64, C>) -> Vec<i64> {
    let mut out = Vec::with_capacity(tree.len());
    tree.ascend(|item| {
        out.push(*item);
        true
    })
    .unwrap();
    out
}

/// Every item of `tree`, in descending order.
pub fn all_rev<C: Comparator<i64>>(tree: &BTree<i64, C>) -> Vec<i64> {
    let mut out = Vec::with_capacity(tree.len());
    tree.descend(|item| {
        out.push(*item);
        true
    })
    .unwrap();
    out
}
