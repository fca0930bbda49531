//! Tensor operations: single-pair elementwise arithmetic and the batched
//! (foreach) engine.
//!
//! All copy-producing operations return new tensors (functional style).
//! In-place variants are suffixed with `_` (e.g., `add_`, `foreach_add_`).

pub mod arithmetic;
pub mod foreach;

pub use arithmetic::BinaryOp;
