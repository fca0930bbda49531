use std::fmt;

use crate::scalar::Scalar;

/// Data types supported by Tessera tensors.
///
/// Covers boolean, signed/unsigned integers, and IEEE floats. The set is
/// closed: promotion between any two members is defined by [`promote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Boolean, stored as one byte per element (0 or 1)
    Bool,
    /// 8-bit unsigned integer
    U8,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit IEEE 754 single-precision float
    F32,
    /// 64-bit IEEE 754 double-precision float
    F64,
}

/// Coarse numeric kind, ordered `Bool < Integer < Float`.
///
/// The ordering decides the scalar fast/slow path: a scalar whose category
/// does not exceed the tensor's keeps the tensor's dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeCategory {
    Bool,
    Integer,
    Float,
}

impl TypeCategory {
    /// The dtype a bare scalar of this category defaults to when it forces
    /// a widening (slow-path) promotion.
    pub fn default_dtype(&self) -> DType {
        match self {
            TypeCategory::Bool => DType::Bool,
            TypeCategory::Integer => DType::I64,
            TypeCategory::Float => DType::F32,
        }
    }
}

impl DType {
    /// Size in bytes of a single element.
    pub fn element_size(&self) -> usize {
        match self {
            DType::Bool | DType::U8 | DType::I8 => 1,
            DType::I16 => 2,
            DType::I32 | DType::F32 => 4,
            DType::I64 | DType::F64 => 8,
        }
    }

    /// Number of bytes needed to store `n` elements of this dtype.
    pub fn storage_bytes(&self, n: usize) -> usize {
        self.element_size() * n
    }

    /// Whether this dtype is the boolean type.
    pub fn is_bool(&self) -> bool {
        matches!(self, DType::Bool)
    }

    /// Whether this dtype is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(self, DType::U8 | DType::I8 | DType::I16 | DType::I32 | DType::I64)
    }

    /// Whether this dtype is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Coarse numeric category of this dtype.
    pub fn category(&self) -> TypeCategory {
        if self.is_bool() {
            TypeCategory::Bool
        } else if self.is_integer() {
            TypeCategory::Integer
        } else {
            TypeCategory::Float
        }
    }

    /// Whether this dtype is an unsigned integer.
    pub fn is_unsigned(&self) -> bool {
        matches!(self, DType::U8)
    }
}

/// Result dtype of a binary op between two tensors.
///
/// Identity wins; Bool yields to the other operand; Integer meeting Float
/// takes the float dtype; within a category the wider type wins. `U8`
/// against a signed integer promotes to a signed type of at least 16 bits.
pub fn promote(a: DType, b: DType) -> DType {
    use DType::*;

    if a == b {
        return a;
    }
    if a == Bool {
        return b;
    }
    if b == Bool {
        return a;
    }

    match (a.category(), b.category()) {
        (TypeCategory::Float, TypeCategory::Float) => {
            if a == F64 || b == F64 { F64 } else { F32 }
        }
        (TypeCategory::Float, TypeCategory::Integer) => a,
        (TypeCategory::Integer, TypeCategory::Float) => b,
        (TypeCategory::Integer, TypeCategory::Integer) => {
            if a.is_unsigned() || b.is_unsigned() {
                // U8 vs a signed integer: smallest signed type holding both.
                let signed = if a.is_unsigned() { b } else { a };
                if signed == I8 { I16 } else { signed }
            } else {
                let rank = |d: DType| d.element_size();
                if rank(a) >= rank(b) { a } else { b }
            }
        }
        // Bool categories handled above.
        _ => unreachable!("bool promotion handled before category match"),
    }
}

/// Result dtype of `tensor op scalar`.
///
/// Fast path: the scalar's category does not exceed the tensor's, so the
/// tensor's dtype is kept (float tensor + int scalar stays the float type).
/// Slow path: the scalar widens the computation to its category's default
/// dtype (bool tensor + int 1 → I64, int tensor + float 1.1 → F32).
pub fn scalar_result_dtype(tensor: DType, scalar: &Scalar) -> DType {
    let sc = scalar.category();
    if sc <= tensor.category() {
        tensor
    } else {
        sc.default_dtype()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Bool => write!(f, "bool"),
            DType::U8 => write!(f, "u8"),
            DType::I8 => write!(f, "i8"),
            DType::I16 => write!(f, "i16"),
            DType::I32 => write!(f, "i32"),
            DType::I64 => write!(f, "i64"),
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
        }
    }
}
