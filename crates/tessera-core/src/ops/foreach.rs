//! Batched ("foreach") elementwise arithmetic over tensor lists.
//!
//! Each entry point applies one operator across every element of a tensor
//! list in a single logical call: `foreach_add(&list, 1)` computes
//! `list[i] + 1` for every `i`. List elements need not share a shape or
//! dtype — every element (or pair) promotes independently.
//!
//! Copy-producing forms return a new `Vec<Tensor>` in input order and never
//! mutate their inputs. In-place forms (suffixed `_`) write through each
//! tensor's storage and refuse, before touching any element, writes whose
//! promoted dtype differs from the destination's.
//!
//! Validation order: list emptiness and pairing length first, then device
//! uniformity, then per-element dtype checks; the whole call fails before
//! any element is processed. Per-element computations are independent, so
//! the copy paths fan out across a rayon pool; results keep input order.

use rayon::prelude::*;
use tracing::trace;

use crate::ops::arithmetic::{
    self, check_in_place, check_scalar_op, check_tensor_op, BinaryOp,
};
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::{Result, TesseraError};

/// `tensors[i] + scalar` for every i; returns a new list.
pub fn foreach_add(tensors: &[Tensor], scalar: impl Into<Scalar>) -> Result<Vec<Tensor>> {
    foreach_scalar(BinaryOp::Add, tensors, scalar.into())
}

/// `tensors[i] - scalar` for every i; returns a new list.
pub fn foreach_sub(tensors: &[Tensor], scalar: impl Into<Scalar>) -> Result<Vec<Tensor>> {
    foreach_scalar(BinaryOp::Sub, tensors, scalar.into())
}

/// `tensors[i] * scalar` for every i; returns a new list.
pub fn foreach_mul(tensors: &[Tensor], scalar: impl Into<Scalar>) -> Result<Vec<Tensor>> {
    foreach_scalar(BinaryOp::Mul, tensors, scalar.into())
}

/// `tensors[i] / scalar` for every i; returns a new list.
pub fn foreach_div(tensors: &[Tensor], scalar: impl Into<Scalar>) -> Result<Vec<Tensor>> {
    foreach_scalar(BinaryOp::Div, tensors, scalar.into())
}

/// `tensors[i] += scalar` for every i, in place.
///
/// In-place targets with self-overlapping storage (expanded views) are the
/// caller's responsibility.
pub fn foreach_add_(tensors: &mut [Tensor], scalar: impl Into<Scalar>) -> Result<()> {
    foreach_scalar_(BinaryOp::Add, tensors, scalar.into())
}

/// `tensors[i] -= scalar` for every i, in place.
pub fn foreach_sub_(tensors: &mut [Tensor], scalar: impl Into<Scalar>) -> Result<()> {
    foreach_scalar_(BinaryOp::Sub, tensors, scalar.into())
}

/// `tensors[i] *= scalar` for every i, in place.
pub fn foreach_mul_(tensors: &mut [Tensor], scalar: impl Into<Scalar>) -> Result<()> {
    foreach_scalar_(BinaryOp::Mul, tensors, scalar.into())
}

/// `tensors[i] /= scalar` for every i, in place.
pub fn foreach_div_(tensors: &mut [Tensor], scalar: impl Into<Scalar>) -> Result<()> {
    foreach_scalar_(BinaryOp::Div, tensors, scalar.into())
}

/// `a[i] + b[i]` for every i; each pair promotes independently.
pub fn foreach_add_list(a: &[Tensor], b: &[Tensor]) -> Result<Vec<Tensor>> {
    foreach_list(BinaryOp::Add, a, b)
}

/// `a[i] - b[i]` for every i.
pub fn foreach_sub_list(a: &[Tensor], b: &[Tensor]) -> Result<Vec<Tensor>> {
    foreach_list(BinaryOp::Sub, a, b)
}

/// `a[i] * b[i]` for every i.
pub fn foreach_mul_list(a: &[Tensor], b: &[Tensor]) -> Result<Vec<Tensor>> {
    foreach_list(BinaryOp::Mul, a, b)
}

/// `a[i] / b[i]` for every i.
pub fn foreach_div_list(a: &[Tensor], b: &[Tensor]) -> Result<Vec<Tensor>> {
    foreach_list(BinaryOp::Div, a, b)
}

/// `a[i] += b[i]` for every i, in place.
pub fn foreach_add_list_(a: &mut [Tensor], b: &[Tensor]) -> Result<()> {
    foreach_list_(BinaryOp::Add, a, b)
}

/// `a[i] -= b[i]` for every i, in place.
pub fn foreach_sub_list_(a: &mut [Tensor], b: &[Tensor]) -> Result<()> {
    foreach_list_(BinaryOp::Sub, a, b)
}

/// `a[i] *= b[i]` for every i, in place.
pub fn foreach_mul_list_(a: &mut [Tensor], b: &[Tensor]) -> Result<()> {
    foreach_list_(BinaryOp::Mul, a, b)
}

/// `a[i] /= b[i]` for every i, in place.
pub fn foreach_div_list_(a: &mut [Tensor], b: &[Tensor]) -> Result<()> {
    foreach_list_(BinaryOp::Div, a, b)
}

fn check_nonempty(tensors: &[Tensor]) -> Result<()> {
    if tensors.is_empty() {
        return Err(TesseraError::EmptyTensorList);
    }
    Ok(())
}

fn check_paired(a: &[Tensor], b: &[Tensor]) -> Result<()> {
    check_nonempty(a)?;
    check_nonempty(b)?;
    if a.len() != b.len() {
        return Err(TesseraError::ListLengthMismatch {
            lhs: a.len(),
            rhs: b.len(),
        });
    }
    Ok(())
}

fn check_devices<'a>(tensors: impl Iterator<Item = &'a Tensor>) -> Result<()> {
    let mut device = None;
    for t in tensors {
        match device {
            None => device = Some(t.device()),
            Some(d) if d == t.device() => {}
            Some(_) => return Err(TesseraError::DeviceMismatch),
        }
    }
    Ok(())
}

fn foreach_scalar(op: BinaryOp, tensors: &[Tensor], scalar: Scalar) -> Result<Vec<Tensor>> {
    check_nonempty(tensors)?;
    check_devices(tensors.iter())?;
    trace!(?op, len = tensors.len(), %scalar, "foreach scalar");

    tensors
        .par_iter()
        .map(|t| arithmetic::scalar_op(t, op, scalar))
        .collect()
}

fn foreach_scalar_(op: BinaryOp, tensors: &mut [Tensor], scalar: Scalar) -> Result<()> {
    check_nonempty(tensors)?;
    check_devices(tensors.iter())?;
    // Every element's dtype check runs before the first write.
    for t in tensors.iter() {
        let promoted = check_scalar_op(op, t.dtype(), &scalar)?;
        check_in_place(t.dtype(), promoted)?;
    }
    trace!(?op, len = tensors.len(), %scalar, "foreach scalar in-place");

    tensors
        .par_iter_mut()
        .try_for_each(|t| arithmetic::scalar_op_(t, op, scalar))
}

fn foreach_list(op: BinaryOp, a: &[Tensor], b: &[Tensor]) -> Result<Vec<Tensor>> {
    check_paired(a, b)?;
    check_devices(a.iter().chain(b.iter()))?;
    trace!(?op, len = a.len(), "foreach list");

    a.par_iter()
        .zip(b.par_iter())
        .map(|(x, y)| arithmetic::tensor_op(x, y, op))
        .collect()
}

fn foreach_list_(op: BinaryOp, a: &mut [Tensor], b: &[Tensor]) -> Result<()> {
    check_paired(a, b)?;
    check_devices(a.iter().chain(b.iter()))?;
    // Every pair's dtype and shape checks run before the first write.
    for (x, y) in a.iter().zip(b.iter()) {
        let promoted = check_tensor_op(op, x.dtype(), y.dtype())?;
        check_in_place(x.dtype(), promoted)?;
        if x.shape().broadcast_with(y.shape()).as_ref() != Some(x.shape()) {
            return Err(TesseraError::BroadcastError {
                lhs: x.shape().dims().to_vec(),
                rhs: y.shape().dims().to_vec(),
            });
        }
    }
    trace!(?op, len = a.len(), "foreach list in-place");

    a.par_iter_mut()
        .zip(b.par_iter())
        .try_for_each(|(x, y)| arithmetic::tensor_op_(x, y, op))
}
