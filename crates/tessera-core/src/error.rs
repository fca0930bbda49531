use crate::dtype::DType;

/// Errors surfaced by tensor construction, views, and the batched
/// elementwise engine.
///
/// Every failure aborts the whole call; there is no partial-success mode and
/// no internal retry.
#[derive(Debug, thiserror::Error)]
pub enum TesseraError {
    #[error("foreach: tensor list must be non-empty")]
    EmptyTensorList,

    #[error("foreach: tensor lists differ in length ({lhs} vs {rhs})")]
    ListLengthMismatch { lhs: usize, rhs: usize },

    #[error("foreach: tensors span multiple devices")]
    DeviceMismatch,

    #[error("cannot write {promoted} result into {target} storage in place")]
    InPlaceCast { target: DType, promoted: DType },

    #[error("subtraction is not supported on bool tensors")]
    BoolSubtraction,

    #[error("integer division is not supported; cast to a floating dtype first")]
    IntegerDivision,

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("shapes {lhs:?} and {rhs:?} are not broadcastable")]
    BroadcastError { lhs: Vec<usize>, rhs: Vec<usize> },

    #[error("cannot reshape tensor of {numel} elements to {shape:?}")]
    InvalidReshape { numel: usize, shape: Vec<usize> },

    #[error("axis {axis} out of range for {ndim}-dimensional tensor")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("unsupported dtype {0} for this operation")]
    UnsupportedDType(DType),

    #[error("storage error: {0}")]
    StorageError(String),
}
