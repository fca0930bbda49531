use std::fmt;

use crate::dtype::TypeCategory;

/// A single numeric operand broadcast against every element of a tensor
/// (or tensor list).
///
/// Integers are carried as `i64` and floats as `f64` so no caller-supplied
/// value loses precision before promotion decides the result dtype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Coarse numeric category of this scalar.
    pub fn category(&self) -> TypeCategory {
        match self {
            Scalar::Bool(_) => TypeCategory::Bool,
            Scalar::Int(_) => TypeCategory::Integer,
            Scalar::Float(_) => TypeCategory::Float,
        }
    }

    /// Widen to f64 (bool maps to 0.0/1.0).
    pub fn to_f64(&self) -> f64 {
        match self {
            Scalar::Bool(b) => {
                if *b { 1.0 } else { 0.0 }
            }
            Scalar::Int(i) => *i as f64,
            Scalar::Float(f) => *f,
        }
    }

    /// Widen to i64 (bool maps to 0/1, floats truncate toward zero).
    pub fn to_i64(&self) -> i64 {
        match self {
            Scalar::Bool(b) => *b as i64,
            Scalar::Int(i) => *i,
            Scalar::Float(f) => *f as i64,
        }
    }

    /// Truthiness (nonzero values are true).
    pub fn to_bool(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Int(i) => *i != 0,
            Scalar::Float(f) => *f != 0.0,
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

macro_rules! impl_scalar_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::Int(v as i64)
                }
            }
        )*
    };
}

impl_scalar_from_int!(u8, i8, i16, i32, i64, u32, usize);

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v as f64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
        }
    }
}
