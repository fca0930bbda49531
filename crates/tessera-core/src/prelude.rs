//! Convenience re-exports for common tessera-core types.
//!
//! ```rust
//! use tessera_core::prelude::*;
//! ```

pub use crate::DType;
pub use crate::Device;
pub use crate::Result;
pub use crate::Scalar;
pub use crate::Shape;
pub use crate::Tensor;
pub use crate::TesseraError;
pub use crate::ops::BinaryOp;
pub use crate::ops::foreach::*;
