use std::fmt;

use smallvec::SmallVec;

use crate::dtype::DType;
use crate::error::TesseraError;
use crate::scalar::Scalar;
use crate::shape::Shape;
use crate::storage::Storage;
use crate::{Device, Result};

/// A multi-dimensional array — the fundamental data structure in Tessera.
///
/// Tensors support:
/// - Multiple numeric dtypes plus Bool
/// - Zero-copy views (reshape, transpose, expand share storage)
/// - Per-pair type promotion in elementwise ops
///
/// # Examples
///
/// ```
/// use tessera_core::Tensor;
///
/// let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
/// assert_eq!(t.shape().dims(), &[2, 2]);
/// assert_eq!(t.numel(), 4);
///
/// // Reshape (zero-copy view)
/// let flat = t.reshape(&[4]).unwrap();
/// assert_eq!(flat.shape().dims(), &[4]);
/// ```
#[derive(Clone)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
    strides: SmallVec<[usize; 4]>,
    offset: usize,
}

macro_rules! impl_tensor_ctor {
    ($($name:ident, $t:ty, $storage_ctor:ident);* $(;)?) => {
        $(
            #[doc = concat!("Create a tensor from `", stringify!($t), "` data with the given shape.")]
            pub fn $name(data: &[$t], shape: &[usize]) -> Self {
                let s = Shape::new(shape);
                assert_eq!(
                    s.numel(),
                    data.len(),
                    "Shape {:?} requires {} elements, got {}",
                    shape,
                    s.numel(),
                    data.len()
                );
                let strides = s.contiguous_strides();
                Self {
                    storage: Storage::$storage_ctor(data),
                    shape: s,
                    strides,
                    offset: 0,
                }
            }
        )*
    };
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    impl_tensor_ctor! {
        from_u8, u8, from_u8;
        from_i8, i8, from_i8;
        from_i16, i16, from_i16;
        from_i32, i32, from_i32;
        from_i64, i64, from_i64;
        from_f32, f32, from_f32;
        from_f64, f64, from_f64;
        from_bool, bool, from_bool;
    }

    /// Create a tensor of zeros with the given shape and dtype.
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let s = Shape::new(shape);
        let strides = s.contiguous_strides();
        Self {
            storage: Storage::zeros(dtype, s.numel()),
            shape: s,
            strides,
            offset: 0,
        }
    }

    /// Create a tensor filled with `value`, converted to `dtype`.
    pub fn full(shape: &[usize], value: Scalar, dtype: DType) -> Self {
        let s = Shape::new(shape);
        let numel = s.numel();
        let mut storage = Storage::zeros(dtype, numel);
        for i in 0..numel {
            storage
                .set(i, value)
                .expect("full: index within freshly allocated storage");
        }
        let strides = s.contiguous_strides();
        Self {
            storage,
            shape: s,
            strides,
            offset: 0,
        }
    }

    /// Create a tensor of ones with the given shape and dtype
    /// (`true` for Bool).
    pub fn ones(shape: &[usize], dtype: DType) -> Self {
        let one = match dtype.category() {
            crate::TypeCategory::Bool => Scalar::Bool(true),
            crate::TypeCategory::Integer => Scalar::Int(1),
            crate::TypeCategory::Float => Scalar::Float(1.0),
        };
        Self::full(shape, one, dtype)
    }

    /// Create a scalar tensor from a single f32 value.
    pub fn scalar(value: f32) -> Self {
        Self {
            storage: Storage::from_f32(&[value]),
            shape: Shape::scalar(),
            strides: SmallVec::new(),
            offset: 0,
        }
    }

    /// Create a tensor from pre-built Storage and shape.
    pub fn from_storage(storage: Storage, shape: &[usize]) -> Self {
        let s = Shape::new(shape);
        let strides = s.contiguous_strides();
        Self {
            storage,
            shape: s,
            strides,
            offset: 0,
        }
    }

    /// Get a reference to the underlying storage.
    pub fn storage_ref(&self) -> &Storage {
        &self.storage
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Shape of the tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Total number of logical elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Data type.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Device.
    pub fn device(&self) -> Device {
        self.storage.device()
    }

    /// Strides (in elements, not bytes). Expanded dimensions have stride 0.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Whether this tensor is contiguous in memory (row-major).
    pub fn is_contiguous(&self) -> bool {
        self.strides == self.shape.contiguous_strides() && self.offset == 0
    }

    // =========================================================================
    // Data access
    // =========================================================================

    /// Read a logical element by flat index, widened to a [`Scalar`].
    pub fn get(&self, flat_index: usize) -> Option<Scalar> {
        let physical = self.flat_to_physical(flat_index)?;
        self.storage.get(physical)
    }

    /// Write a logical element by flat index (copy-on-write storage).
    ///
    /// The value is converted to this tensor's dtype; dtype compatibility is
    /// the caller's pre-check.
    pub fn set(&mut self, flat_index: usize, value: Scalar) -> Result<()> {
        let physical = self
            .flat_to_physical(flat_index)
            .ok_or_else(|| TesseraError::StorageError(format!(
                "element index {} out of range for {} elements",
                flat_index,
                self.numel()
            )))?;
        self.storage.set(physical, value)
    }

    /// Get the underlying f32 data as a slice (contiguous F32 tensors only).
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        if !self.is_contiguous() {
            return None;
        }
        self.storage.as_f32_slice()
    }

    /// Get the underlying f64 data as a slice (contiguous F64 tensors only).
    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        if !self.is_contiguous() {
            return None;
        }
        self.storage.as_f64_slice()
    }

    /// Get the underlying i32 data as a slice (contiguous I32 tensors only).
    pub fn as_i32_slice(&self) -> Option<&[i32]> {
        if !self.is_contiguous() {
            return None;
        }
        self.storage.as_i32_slice()
    }

    /// Get the underlying i64 data as a slice (contiguous I64 tensors only).
    pub fn as_i64_slice(&self) -> Option<&[i64]> {
        if !self.is_contiguous() {
            return None;
        }
        self.storage.as_i64_slice()
    }

    /// Get bool storage as 0/1 bytes (contiguous Bool tensors only).
    pub fn as_bool_slice(&self) -> Option<&[u8]> {
        if !self.is_contiguous() {
            return None;
        }
        self.storage.as_bool_slice()
    }

    /// Read every logical element widened to f64, in logical order.
    ///
    /// Works for any dtype and any view, including expanded ones.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        (0..self.numel())
            .map(|i| {
                self.get(i)
                    .expect("logical index within numel")
                    .to_f64()
            })
            .collect()
    }

    /// Convert a flat logical index to a physical storage index.
    ///
    /// Stride-0 dimensions (expanded views) map many logical indices to the
    /// same physical cell.
    fn flat_to_physical(&self, flat_index: usize) -> Option<usize> {
        if self.shape.is_scalar() {
            return if flat_index == 0 {
                Some(self.offset)
            } else {
                None
            };
        }

        if flat_index >= self.numel() {
            return None;
        }

        let mut remaining = flat_index;
        let mut physical = self.offset;
        let contiguous_strides = self.shape.contiguous_strides();

        for (i, &cs) in contiguous_strides.iter().enumerate() {
            let idx = remaining / cs;
            remaining %= cs;
            physical += idx * self.strides[i];
        }

        Some(physical)
    }

    // =========================================================================
    // Shape operations (zero-copy views)
    // =========================================================================

    /// Reshape the tensor (zero-copy, contiguous tensors only).
    pub fn reshape(&self, new_shape: &[isize]) -> Result<Tensor> {
        let resolved = self.shape.resolve_reshape(new_shape).ok_or_else(|| {
            TesseraError::InvalidReshape {
                numel: self.numel(),
                shape: new_shape.iter().map(|&d| d.unsigned_abs()).collect(),
            }
        })?;

        if !self.is_contiguous() {
            return Err(TesseraError::StorageError(
                "Cannot reshape non-contiguous tensor (call .contiguous() first)".into(),
            ));
        }

        let strides = resolved.contiguous_strides();
        Ok(Tensor {
            storage: self.storage.clone(), // Arc clone — shared data
            shape: resolved,
            strides,
            offset: self.offset,
        })
    }

    /// Transpose the last two dimensions (zero-copy view).
    pub fn transpose(&self) -> Result<Tensor> {
        let new_shape = self.shape.transpose().ok_or(TesseraError::InvalidAxis {
            axis: 0,
            ndim: self.ndim(),
        })?;

        let ndim = self.ndim();
        let mut new_strides = self.strides.clone();
        new_strides.swap(ndim - 2, ndim - 1);

        Ok(Tensor {
            storage: self.storage.clone(),
            shape: new_shape,
            strides: new_strides,
            offset: self.offset,
        })
    }

    /// Expand to a broadcast shape without copying (zero-copy view).
    ///
    /// New leading dimensions and existing size-1 dimensions get stride 0,
    /// so many logical positions alias one physical cell. Elementwise ops
    /// treat every logical position independently and materialize a
    /// contiguous result.
    pub fn expand(&self, target: &[usize]) -> Result<Tensor> {
        if !self.shape.broadcast_to(target) {
            return Err(TesseraError::BroadcastError {
                lhs: self.shape.dims().to_vec(),
                rhs: target.to_vec(),
            });
        }

        let lead = target.len() - self.ndim();
        let mut strides: SmallVec<[usize; 4]> = SmallVec::with_capacity(target.len());
        for (i, &t) in target.iter().enumerate() {
            if i < lead {
                strides.push(0);
            } else {
                let own = self.shape.dims()[i - lead];
                strides.push(if own == t { self.strides[i - lead] } else { 0 });
            }
        }

        Ok(Tensor {
            storage: self.storage.clone(),
            shape: Shape::new(target),
            strides,
            offset: self.offset,
        })
    }

    /// Return a contiguous copy of this tensor if it isn't already
    /// contiguous.
    ///
    /// Every logical position is materialized independently, so expanded
    /// views become fully-backed tensors.
    pub fn contiguous(&self) -> Tensor {
        if self.is_contiguous() {
            return self.clone();
        }

        let numel = self.numel();
        let mut storage = Storage::zeros(self.dtype(), numel);
        for i in 0..numel {
            let v = self.get(i).expect("logical index within numel");
            storage
                .set(i, v)
                .expect("index within freshly allocated storage");
        }
        Tensor::from_storage(storage, self.shape.dims())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor(shape={}, dtype={}, device={}, contiguous={})",
            self.shape,
            self.dtype(),
            self.device(),
            self.is_contiguous(),
        )
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.numel() <= 20 {
            let vals: Vec<String> = (0..self.numel())
                .map(|i| self.get(i).map_or_else(|| "?".into(), |v| v.to_string()))
                .collect();
            write!(f, "tensor([{}], shape={}, dtype={})", vals.join(", "), self.shape, self.dtype())
        } else {
            write!(f, "tensor(shape={}, dtype={})", self.shape, self.dtype())
        }
    }
}
