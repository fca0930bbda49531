//! Element-wise arithmetic operations on tensors, with per-pair numeric
//! type promotion.
//!
//! Float results are computed in f64, integer results in i64; the write
//! into the result dtype is the only narrowing step. Boolean results exist
//! only for bool⊕bool add (logical or) and mul (logical and).

use crate::dtype::{promote, scalar_result_dtype, DType, TypeCategory};
use crate::error::TesseraError;
use crate::scalar::Scalar;
use crate::shape::Shape;
use crate::storage::Storage;
use crate::tensor::Tensor;
use crate::Result;

/// Elementwise binary operator shared by the single-pair kernels and the
/// batched engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Operator symbol for error messages and logging.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

impl Tensor {
    /// Element-wise addition: self + other (broadcasting, promoting).
    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        tensor_op(self, other, BinaryOp::Add)
    }

    /// Element-wise subtraction: self - other.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor> {
        tensor_op(self, other, BinaryOp::Sub)
    }

    /// Element-wise multiplication: self * other.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor> {
        tensor_op(self, other, BinaryOp::Mul)
    }

    /// Element-wise division: self / other (float results only).
    pub fn div(&self, other: &Tensor) -> Result<Tensor> {
        tensor_op(self, other, BinaryOp::Div)
    }

    /// In-place addition: self += other. Fails if promotion would change
    /// self's dtype.
    pub fn add_(&mut self, other: &Tensor) -> Result<()> {
        tensor_op_(self, other, BinaryOp::Add)
    }

    /// In-place subtraction: self -= other.
    pub fn sub_(&mut self, other: &Tensor) -> Result<()> {
        tensor_op_(self, other, BinaryOp::Sub)
    }

    /// In-place multiplication: self *= other.
    pub fn mul_(&mut self, other: &Tensor) -> Result<()> {
        tensor_op_(self, other, BinaryOp::Mul)
    }

    /// In-place division: self /= other.
    pub fn div_(&mut self, other: &Tensor) -> Result<()> {
        tensor_op_(self, other, BinaryOp::Div)
    }

    /// Scalar addition: self + scalar (fast/slow path promotion).
    pub fn add_scalar(&self, scalar: impl Into<Scalar>) -> Result<Tensor> {
        scalar_op(self, BinaryOp::Add, scalar.into())
    }

    /// Scalar subtraction: self - scalar.
    pub fn sub_scalar(&self, scalar: impl Into<Scalar>) -> Result<Tensor> {
        scalar_op(self, BinaryOp::Sub, scalar.into())
    }

    /// Scalar multiplication: self * scalar.
    pub fn mul_scalar(&self, scalar: impl Into<Scalar>) -> Result<Tensor> {
        scalar_op(self, BinaryOp::Mul, scalar.into())
    }

    /// Scalar division: self / scalar (float results only).
    pub fn div_scalar(&self, scalar: impl Into<Scalar>) -> Result<Tensor> {
        scalar_op(self, BinaryOp::Div, scalar.into())
    }

    /// In-place scalar addition: self += scalar.
    pub fn add_scalar_(&mut self, scalar: impl Into<Scalar>) -> Result<()> {
        scalar_op_(self, BinaryOp::Add, scalar.into())
    }

    /// In-place scalar subtraction: self -= scalar.
    pub fn sub_scalar_(&mut self, scalar: impl Into<Scalar>) -> Result<()> {
        scalar_op_(self, BinaryOp::Sub, scalar.into())
    }

    /// In-place scalar multiplication: self *= scalar.
    pub fn mul_scalar_(&mut self, scalar: impl Into<Scalar>) -> Result<()> {
        scalar_op_(self, BinaryOp::Mul, scalar.into())
    }

    /// In-place scalar division: self /= scalar.
    pub fn div_scalar_(&mut self, scalar: impl Into<Scalar>) -> Result<()> {
        scalar_op_(self, BinaryOp::Div, scalar.into())
    }

    /// Whether every element of self is within `tol` of the corresponding
    /// element of other (same shape required; dtypes may differ).
    pub fn allclose(&self, other: &Tensor, tol: f64) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        (0..self.numel()).all(|i| {
            match (self.get(i), other.get(i)) {
                (Some(a), Some(b)) => (a.to_f64() - b.to_f64()).abs() <= tol,
                _ => false,
            }
        })
    }
}

/// Result dtype of `lhs op scalar`, after rejecting undefined combinations.
pub(crate) fn check_scalar_op(op: BinaryOp, lhs: DType, scalar: &Scalar) -> Result<DType> {
    if op == BinaryOp::Sub && lhs.is_bool() {
        return Err(TesseraError::BoolSubtraction);
    }
    let out = scalar_result_dtype(lhs, scalar);
    if op == BinaryOp::Div && !out.is_float() {
        return Err(TesseraError::IntegerDivision);
    }
    Ok(out)
}

/// Result dtype of `lhs op rhs`, after rejecting undefined combinations.
pub(crate) fn check_tensor_op(op: BinaryOp, lhs: DType, rhs: DType) -> Result<DType> {
    if op == BinaryOp::Sub && (lhs.is_bool() || rhs.is_bool()) {
        return Err(TesseraError::BoolSubtraction);
    }
    let out = promote(lhs, rhs);
    if op == BinaryOp::Div && !out.is_float() {
        return Err(TesseraError::IntegerDivision);
    }
    Ok(out)
}

/// Pre-check for an in-place op: the promoted result dtype must already be
/// the destination's dtype — in-place calls never change declared storage
/// types.
pub(crate) fn check_in_place(target: DType, promoted: DType) -> Result<()> {
    if promoted != target {
        return Err(TesseraError::InPlaceCast { target, promoted });
    }
    Ok(())
}

/// Apply `op` to a widened pair in the result's compute representation.
fn apply(op: BinaryOp, a: Scalar, b: Scalar, out: TypeCategory) -> Result<Scalar> {
    match out {
        TypeCategory::Float => {
            let (x, y) = (a.to_f64(), b.to_f64());
            Ok(Scalar::Float(match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
            }))
        }
        TypeCategory::Integer => {
            let (x, y) = (a.to_i64(), b.to_i64());
            Ok(Scalar::Int(match op {
                BinaryOp::Add => x.wrapping_add(y),
                BinaryOp::Sub => x.wrapping_sub(y),
                BinaryOp::Mul => x.wrapping_mul(y),
                // Rejected by check_scalar_op/check_tensor_op before any
                // element is touched.
                BinaryOp::Div => return Err(TesseraError::IntegerDivision),
            }))
        }
        TypeCategory::Bool => {
            let (x, y) = (a.to_bool(), b.to_bool());
            Ok(Scalar::Bool(match op {
                BinaryOp::Add => x || y,
                BinaryOp::Mul => x && y,
                BinaryOp::Sub => return Err(TesseraError::BoolSubtraction),
                BinaryOp::Div => return Err(TesseraError::IntegerDivision),
            }))
        }
    }
}

/// `tensor op scalar`, copy-producing.
pub(crate) fn scalar_op(t: &Tensor, op: BinaryOp, scalar: Scalar) -> Result<Tensor> {
    let out_dtype = check_scalar_op(op, t.dtype(), &scalar)?;
    let cat = out_dtype.category();
    let numel = t.numel();
    let mut storage = Storage::zeros(out_dtype, numel);
    for i in 0..numel {
        let a = t.get(i).expect("logical index within numel");
        storage.set(i, apply(op, a, scalar, cat)?)?;
    }
    Ok(Tensor::from_storage(storage, t.shape().dims()))
}

/// `tensor op scalar`, in place. Pre-checks the promoted dtype against the
/// destination before writing any element.
pub(crate) fn scalar_op_(t: &mut Tensor, op: BinaryOp, scalar: Scalar) -> Result<()> {
    let out_dtype = check_scalar_op(op, t.dtype(), &scalar)?;
    check_in_place(t.dtype(), out_dtype)?;
    let cat = out_dtype.category();
    for i in 0..t.numel() {
        let a = t.get(i).expect("logical index within numel");
        t.set(i, apply(op, a, scalar, cat)?)?;
    }
    Ok(())
}

/// `a op b`, copy-producing, with broadcasting and per-pair promotion.
pub(crate) fn tensor_op(a: &Tensor, b: &Tensor, op: BinaryOp) -> Result<Tensor> {
    let out_dtype = check_tensor_op(op, a.dtype(), b.dtype())?;
    let out_shape = a.shape().broadcast_with(b.shape()).ok_or_else(|| {
        TesseraError::BroadcastError {
            lhs: a.shape().dims().to_vec(),
            rhs: b.shape().dims().to_vec(),
        }
    })?;

    let cat = out_dtype.category();
    let numel = out_shape.numel();
    let mut storage = Storage::zeros(out_dtype, numel);
    for i in 0..numel {
        let ai = broadcast_index(i, &out_shape, a.shape());
        let bi = broadcast_index(i, &out_shape, b.shape());
        let x = a.get(ai).expect("broadcast index within lhs numel");
        let y = b.get(bi).expect("broadcast index within rhs numel");
        storage.set(i, apply(op, x, y, cat)?)?;
    }
    Ok(Tensor::from_storage(storage, out_shape.dims()))
}

/// `a op b`, writing into `a`'s storage. `b` must broadcast into `a`'s
/// shape and the promoted dtype must be `a`'s dtype.
pub(crate) fn tensor_op_(a: &mut Tensor, b: &Tensor, op: BinaryOp) -> Result<()> {
    let out_dtype = check_tensor_op(op, a.dtype(), b.dtype())?;
    check_in_place(a.dtype(), out_dtype)?;

    let broadcast = a.shape().broadcast_with(b.shape());
    if broadcast.as_ref() != Some(a.shape()) {
        return Err(TesseraError::BroadcastError {
            lhs: a.shape().dims().to_vec(),
            rhs: b.shape().dims().to_vec(),
        });
    }

    let cat = out_dtype.category();
    let out_shape = a.shape().clone();
    for i in 0..out_shape.numel() {
        let bi = broadcast_index(i, &out_shape, b.shape());
        let x = a.get(i).expect("logical index within numel");
        // Copy-on-write in `set` keeps aliased rhs storage reading
        // pre-call values.
        let y = b.get(bi).expect("broadcast index within rhs numel");
        a.set(i, apply(op, x, y, cat)?)?;
    }
    Ok(())
}

/// Compute the source logical index for a broadcasted element.
fn broadcast_index(flat_idx: usize, out_shape: &Shape, src_shape: &Shape) -> usize {
    let out_dims = out_shape.dims();
    let src_dims = src_shape.dims();
    let out_ndim = out_dims.len();
    let src_ndim = src_dims.len();

    let mut remaining = flat_idx;
    let mut src_idx = 0;
    let out_strides = out_shape.contiguous_strides();
    let src_strides = src_shape.contiguous_strides();

    for i in 0..out_ndim {
        let coord = remaining / out_strides[i];
        remaining %= out_strides[i];

        let src_dim_idx = i as isize - (out_ndim as isize - src_ndim as isize);
        if src_dim_idx >= 0 {
            let si = src_dim_idx as usize;
            if src_dims[si] > 1 {
                src_idx += coord * src_strides[si];
            }
            // If src_dims[si] == 1, it's broadcast — coord maps to 0
        }
    }

    src_idx
}

// Operator overloads
impl std::ops::Add for &Tensor {
    type Output = Tensor;
    fn add(self, rhs: &Tensor) -> Tensor {
        Tensor::add(self, rhs).expect("Add failed")
    }
}

impl std::ops::Sub for &Tensor {
    type Output = Tensor;
    fn sub(self, rhs: &Tensor) -> Tensor {
        Tensor::sub(self, rhs).expect("Sub failed")
    }
}

impl std::ops::Mul for &Tensor {
    type Output = Tensor;
    fn mul(self, rhs: &Tensor) -> Tensor {
        Tensor::mul(self, rhs).expect("Mul failed")
    }
}

impl std::ops::Div for &Tensor {
    type Output = Tensor;
    fn div(self, rhs: &Tensor) -> Tensor {
        Tensor::div(self, rhs).expect("Div failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DType, Scalar, Tensor};

    #[test]
    fn test_add() {
        let a = Tensor::from_f32(&[1.0, 2.0, 3.0], &[3]);
        let b = Tensor::from_f32(&[4.0, 5.0, 6.0], &[3]);
        let c = a.add(&b).unwrap();
        assert_eq!(c.as_f32_slice().unwrap(), &[5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_sub_mul() {
        let a = Tensor::from_f32(&[4.0, 5.0, 6.0], &[3]);
        let b = Tensor::from_f32(&[1.0, 2.0, 3.0], &[3]);
        assert_eq!(a.sub(&b).unwrap().as_f32_slice().unwrap(), &[3.0, 3.0, 3.0]);
        assert_eq!(a.mul(&b).unwrap().as_f32_slice().unwrap(), &[4.0, 10.0, 18.0]);
    }

    #[test]
    fn test_div_float_only() {
        let a = Tensor::from_f32(&[4.0, 6.0], &[2]);
        let b = Tensor::from_f32(&[2.0, 3.0], &[2]);
        assert_eq!(a.div(&b).unwrap().as_f32_slice().unwrap(), &[2.0, 2.0]);

        let a = Tensor::from_i32(&[4, 6], &[2]);
        let b = Tensor::from_i32(&[2, 3], &[2]);
        assert!(matches!(a.div(&b), Err(TesseraError::IntegerDivision)));
    }

    #[test]
    fn test_div_int_by_float_promotes() {
        // Integer lhs is fine as long as the result lands in a float dtype.
        let a = Tensor::from_i32(&[4, 6], &[2]);
        let c = a.div_scalar(2.0).unwrap();
        assert_eq!(c.dtype(), DType::F32);
        assert_eq!(c.as_f32_slice().unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn test_bool_sub_rejected() {
        let a = Tensor::from_bool(&[true, false], &[2]);
        assert!(matches!(
            a.sub_scalar(1),
            Err(TesseraError::BoolSubtraction)
        ));
        let b = Tensor::from_i32(&[1, 1], &[2]);
        assert!(matches!(a.sub(&b), Err(TesseraError::BoolSubtraction)));
    }

    #[test]
    fn test_mixed_dtype_pair_promotes() {
        let a = Tensor::from_f32(&[0.5], &[1]);
        let b = Tensor::from_i32(&[2], &[1]);
        let c = a.add(&b).unwrap();
        assert_eq!(c.dtype(), DType::F32);
        assert_eq!(c.as_f32_slice().unwrap(), &[2.5]);

        let d = b.add(&a).unwrap();
        assert_eq!(d.dtype(), DType::F32);
        assert_eq!(d.as_f32_slice().unwrap(), &[2.5]);
    }

    #[test]
    fn test_bool_plus_int_tensor() {
        let a = Tensor::from_bool(&[false, true], &[2]);
        let b = Tensor::from_i32(&[1, 1], &[2]);
        let c = a.add(&b).unwrap();
        assert_eq!(c.dtype(), DType::I32);
        assert_eq!(c.as_i32_slice().unwrap(), &[1, 2]);
    }

    #[test]
    fn test_scalar_fast_path() {
        let a = Tensor::from_f32(&[1.1], &[1]);
        let c = a.add_scalar(1).unwrap();
        assert_eq!(c.dtype(), DType::F32);
        assert!((c.as_f32_slice().unwrap()[0] - 2.1).abs() < 1e-6);
    }

    #[test]
    fn test_scalar_slow_path() {
        let a = Tensor::from_i32(&[1], &[1]);
        let c = a.add_scalar(1.1).unwrap();
        assert_eq!(c.dtype(), DType::F32);
        assert!((c.as_f32_slice().unwrap()[0] - 2.1).abs() < 1e-6);

        let a = Tensor::from_bool(&[false], &[1]);
        let c = a.add_scalar(1).unwrap();
        assert_eq!(c.dtype(), DType::I64);
        assert_eq!(c.as_i64_slice().unwrap(), &[1]);
    }

    #[test]
    fn test_bool_plus_bool_scalar_stays_bool() {
        let a = Tensor::from_bool(&[false, true], &[2]);
        let c = a.add_scalar(true).unwrap();
        assert_eq!(c.dtype(), DType::Bool);
        assert_eq!(c.as_bool_slice().unwrap(), &[1, 1]);
    }

    #[test]
    fn test_in_place_scalar() {
        let mut a = Tensor::from_f32(&[1.0, 2.0], &[2]);
        a.add_scalar_(1).unwrap();
        assert_eq!(a.as_f32_slice().unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn test_in_place_cast_rejected() {
        let mut a = Tensor::from_i32(&[1, 2], &[2]);
        let err = a.add_scalar_(1.1).unwrap_err();
        assert!(matches!(
            err,
            TesseraError::InPlaceCast {
                target: DType::I32,
                promoted: DType::F32
            }
        ));
        // Nothing was written.
        assert_eq!(a.as_i32_slice().unwrap(), &[1, 2]);
    }

    #[test]
    fn test_in_place_tensor_mixed_dtype() {
        // float += int promotes to float, which is the destination dtype.
        let mut a = Tensor::from_f32(&[1.0, 2.0], &[2]);
        let b = Tensor::from_i32(&[3, 4], &[2]);
        a.add_(&b).unwrap();
        assert_eq!(a.as_f32_slice().unwrap(), &[4.0, 6.0]);

        // int += float is a narrowing write and must fail.
        let mut c = Tensor::from_i32(&[1], &[1]);
        let d = Tensor::from_f32(&[1.0], &[1]);
        assert!(matches!(c.add_(&d), Err(TesseraError::InPlaceCast { .. })));
    }

    #[test]
    fn test_broadcast_add() {
        let a = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let b = Tensor::from_f32(&[10.0, 20.0, 30.0], &[3]);
        let c = a.add(&b).unwrap();
        assert_eq!(c.shape().dims(), &[2, 3]);
        assert_eq!(
            c.as_f32_slice().unwrap(),
            &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]
        );
    }

    #[test]
    fn test_in_place_broadcast_cannot_grow() {
        let mut a = Tensor::from_f32(&[1.0, 2.0], &[2]);
        let b = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]);
        assert!(a.add_(&b).is_err());
    }

    #[test]
    fn test_expanded_view_operand() {
        let base = Tensor::from_f32(&[1.0], &[1, 1]);
        let view = base.expand(&[2, 1, 3]).unwrap();
        let c = view.add_scalar(1).unwrap();
        assert!(c.is_contiguous());
        assert_eq!(c.as_f32_slice().unwrap(), &[2.0; 6]);
        // The base tensor is untouched.
        assert_eq!(base.as_f32_slice().unwrap(), &[1.0]);
    }

    #[test]
    fn test_operator_overloads() {
        let a = Tensor::from_f32(&[1.0, 2.0], &[2]);
        let b = Tensor::from_f32(&[3.0, 4.0], &[2]);
        assert_eq!((&a + &b).as_f32_slice().unwrap(), &[4.0, 6.0]);
        assert_eq!((&a * &b).as_f32_slice().unwrap(), &[3.0, 8.0]);
        assert_eq!((&b - &a).as_f32_slice().unwrap(), &[2.0, 2.0]);
        assert_eq!((&b / &a).as_f32_slice().unwrap(), &[3.0, 2.0]);
    }

    #[test]
    fn test_allclose() {
        let a = Tensor::from_f32(&[1.0, 2.0], &[2]);
        let b = Tensor::from_f64(&[1.0, 2.0], &[2]);
        assert!(a.allclose(&b, 1e-9));
        let c = Tensor::from_f32(&[1.0, 2.5], &[2]);
        assert!(!a.allclose(&c, 1e-9));
    }

    #[test]
    fn test_u8_i8_promote_to_i16() {
        let a = Tensor::from_u8(&[200], &[1]);
        let b = Tensor::from_i8(&[-100], &[1]);
        let c = a.add(&b).unwrap();
        assert_eq!(c.dtype(), DType::I16);
        assert_eq!(c.get(0), Some(Scalar::Int(100)));
    }
}
