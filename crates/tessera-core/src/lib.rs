//! # tessera-core
//!
//! Core tensor engine for the Tessera ML framework.
//!
//! Provides the foundational `Tensor` type with:
//! - Multiple dtypes (Bool, U8, I8, I16, I32, I64, F32, F64)
//! - Zero-copy views (reshape, transpose, expand)
//! - Per-pair numeric type promotion
//! - Batched "foreach" elementwise arithmetic over tensor lists

pub mod dtype;
pub mod scalar;
pub mod device;
pub mod storage;
pub mod shape;
pub mod tensor;
pub mod ops;
pub mod error;
pub mod prelude;

pub use dtype::{DType, TypeCategory};
pub use scalar::Scalar;
pub use device::Device;
pub use storage::Storage;
pub use shape::Shape;
pub use tensor::Tensor;
pub use error::TesseraError;
pub use ops::foreach;

pub type Result<T> = std::result::Result<T, TesseraError>;
