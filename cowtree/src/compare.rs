//! Item ordering.
//!
//! Every tree orders its items through a [`Comparator`]. Types with a natural
//! ordering implement [`Orderable`] and are compared by [`Natural`], the
//! default comparator. User-defined item types supply their own comparator,
//! and [`Reversed`] flips any comparator to obtain a descending view.
//!
//! # Invariants
//!
//! - A comparator must be a strict total order for the lifetime of the tree
//!   that uses it. Changing its behaviour while a tree holds items is
//!   undefined for the existing contents.
//! - Comparison failures are reported as [`CompareError`], never coerced.

use std::cmp::Ordering;
use std::time::{Duration, SystemTime};

/// Orders two items of the same type.
///
/// Implementations must be `Send + Sync` so that cloned trees sharing the
/// comparator can be driven from different threads.
pub trait Comparator<T: ?Sized>: Send + Sync {
    /// Compare `a` with `b`.
    ///
    /// # Errors
    ///
    /// Returns an error if the two values cannot be ordered relative to each
    /// other (for example two [`crate::Value`]s of different kinds).
    fn compare(&self, a: &T, b: &T) -> Result<Ordering, CompareError>;
}

/// Types with a natural ordering, used by [`Natural`].
pub trait Orderable {
    /// Compare `self` with `other` under the natural ordering.
    fn natural_cmp(&self, other: &Self) -> Result<Ordering, CompareError>;
}

/// The default comparator: delegates to [`Orderable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Natural;

impl<T: Orderable + ?Sized> Comparator<T> for Natural {
    fn compare(&self, a: &T, b: &T) -> Result<Ordering, CompareError> {
        a.natural_cmp(b)
    }
}

/// Comparator adapter that inverts the wrapped ordering by swapping the
/// operands.
///
/// A tree built with `Reversed(Natural)` stores the same item type as one
/// built with `Natural`, but `ascend` walks it from the largest item down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reversed<C>(pub C);

impl<T: ?Sized, C: Comparator<T>> Comparator<T> for Reversed<C> {
    fn compare(&self, a: &T, b: &T) -> Result<Ordering, CompareError> {
        self.0.compare(b, a)
    }
}

/// Errors produced when two items cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    /// The operands are of different kinds and no comparator resolves them.
    TypeMismatch {
        left: &'static str,
        right: &'static str,
    },
    /// A custom comparator refused to order the operands.
    Uncomparable { reason: String },
}

impl std::fmt::Display for CompareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeMismatch { left, right } => {
                write!(f, "cannot compare values of different kinds: {left} and {right}")
            }
            Self::Uncomparable { reason } => write!(f, "values cannot be compared: {reason}"),
        }
    }
}

impl std::error::Error for CompareError {}

macro_rules! orderable_by_ord {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Orderable for $ty {
                fn natural_cmp(&self, other: &Self) -> Result<Ordering, CompareError> {
                    Ok(self.cmp(other))
                }
            }
        )*
    };
}

orderable_by_ord!(
    bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, char, str, String,
    Duration, SystemTime,
);

/// Total order over floats: NaN sorts above every other value and all NaNs
/// are equal. `-0.0` and `0.0` are the same key.
macro_rules! orderable_float {
    ($($ty:ty),*) => {
        $(
            impl Orderable for $ty {
                fn natural_cmp(&self, other: &Self) -> Result<Ordering, CompareError> {
                    Ok(self
                        .partial_cmp(other)
                        .unwrap_or_else(|| self.is_nan().cmp(&other.is_nan())))
                }
            }
        )*
    };
}

orderable_float!(f32, f64);

impl<T: Orderable + ?Sized> Orderable for &T {
    fn natural_cmp(&self, other: &Self) -> Result<Ordering, CompareError> {
        (**self).natural_cmp(*other)
    }
}

impl<T: Orderable + ?Sized> Orderable for Box<T> {
    fn natural_cmp(&self, other: &Self) -> Result<Ordering, CompareError> {
        (**self).natural_cmp(other)
    }
}

impl<T: Orderable + ?Sized> Orderable for std::sync::Arc<T> {
    fn natural_cmp(&self, other: &Self) -> Result<Ordering, CompareError> {
        (**self).natural_cmp(other)
    }
}
