//! Dynamically typed items.
//!
//! [`Value`] lets a single tree hold opaque values whose kind is only known
//! at runtime. Values of the same kind follow their natural ordering; values
//! of different kinds cannot be ordered and the comparison reports
//! [`CompareError::TypeMismatch`]. Kinds are strict: an `I32` never compares
//! with an `I64`.

use std::cmp::Ordering;
use std::fmt;
use std::time::{Duration, SystemTime};

use crate::compare::{CompareError, Orderable};

/// A dynamically typed item.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    Str(String),
    Duration(Duration),
    Time(SystemTime),
}

impl Value {
    /// Name of this value's kind, as reported in comparison errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::Isize(_) => "isize",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::Usize(_) => "usize",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Str(_) => "string",
            Self::Duration(_) => "duration",
            Self::Time(_) => "time",
        }
    }
}

impl Orderable for Value {
    fn natural_cmp(&self, other: &Self) -> Result<Ordering, CompareError> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.natural_cmp(b),
            (Self::I8(a), Self::I8(b)) => a.natural_cmp(b),
            (Self::I16(a), Self::I16(b)) => a.natural_cmp(b),
            (Self::I32(a), Self::I32(b)) => a.natural_cmp(b),
            (Self::I64(a), Self::I64(b)) => a.natural_cmp(b),
            (Self::Isize(a), Self::Isize(b)) => a.natural_cmp(b),
            (Self::U8(a), Self::U8(b)) => a.natural_cmp(b),
            (Self::U16(a), Self::U16(b)) => a.natural_cmp(b),
            (Self::U32(a), Self::U32(b)) => a.natural_cmp(b),
            (Self::U64(a), Self::U64(b)) => a.natural_cmp(b),
            (Self::Usize(a), Self::Usize(b)) => a.natural_cmp(b),
            (Self::F32(a), Self::F32(b)) => a.natural_cmp(b),
            (Self::F64(a), Self::F64(b)) => a.natural_cmp(b),
            (Self::Str(a), Self::Str(b)) => a.natural_cmp(b),
            (Self::Duration(a), Self::Duration(b)) => a.natural_cmp(b),
            (Self::Time(a), Self::Time(b)) => a.natural_cmp(b),
            _ => Err(CompareError::TypeMismatch {
                left: self.kind(),
                right: other.kind(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::Isize(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::Usize(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Duration(v) => write!(f, "{v:?}"),
            Self::Time(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    String => Str,
    Duration => Duration,
    SystemTime => Time,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}
