use std::sync::Arc;

use crate::{DType, Device, Result, Scalar, TesseraError};

/// Shared, reference-counted tensor storage.
///
/// Storage is reference-counted (`Arc`) so multiple tensors can share the
/// same underlying data (e.g., views from reshape/transpose/expand).
/// Mutation is copy-on-write: writing through a shared storage clones the
/// bytes first.
#[derive(Debug, Clone)]
pub struct Storage {
    data: Arc<Vec<u8>>,
    dtype: DType,
    device: Device,
    /// Number of logical elements (not bytes).
    numel: usize,
}

macro_rules! impl_typed_ctor {
    ($($name:ident, $t:ty, $dtype:ident);* $(;)?) => {
        $(
            #[doc = concat!("Create storage from a slice of `", stringify!($t), "` values.")]
            pub fn $name(data: &[$t]) -> Self {
                let bytes: Vec<u8> = data
                    .iter()
                    .flat_map(|v| v.to_ne_bytes())
                    .collect();
                Self {
                    data: Arc::new(bytes),
                    dtype: DType::$dtype,
                    device: Device::Cpu,
                    numel: data.len(),
                }
            }
        )*
    };
}

macro_rules! impl_typed_view {
    ($($name:ident, $name_mut:ident, $t:ty, $dtype:ident);* $(;)?) => {
        $(
            #[doc = concat!("Interpret storage as a slice of `", stringify!($t), "` values.")]
            #[doc = ""]
            #[doc = concat!("Returns None if dtype is not ", stringify!($dtype), ".")]
            pub fn $name(&self) -> Option<&[$t]> {
                if self.dtype != DType::$dtype {
                    return None;
                }
                Some(bytemuck::cast_slice(self.as_bytes()))
            }

            #[doc = concat!("Mutable `", stringify!($t), "` view (copy-on-write).")]
            pub fn $name_mut(&mut self) -> Option<&mut [$t]> {
                if self.dtype != DType::$dtype {
                    return None;
                }
                Some(bytemuck::cast_slice_mut(self.as_bytes_mut()))
            }
        )*
    };
}

impl Storage {
    /// Allocate new CPU storage for `numel` elements of the given dtype,
    /// zero-initialized.
    pub fn zeros(dtype: DType, numel: usize) -> Self {
        let nbytes = dtype.storage_bytes(numel);
        Self {
            data: Arc::new(vec![0u8; nbytes]),
            dtype,
            device: Device::Cpu,
            numel,
        }
    }

    /// Create storage from raw bytes (CPU).
    pub fn from_bytes(dtype: DType, numel: usize, bytes: Vec<u8>) -> Result<Self> {
        let expected = dtype.storage_bytes(numel);
        if bytes.len() != expected {
            return Err(TesseraError::StorageError(format!(
                "Expected {} bytes for {} elements of {}, got {}",
                expected,
                numel,
                dtype,
                bytes.len()
            )));
        }
        Ok(Self {
            data: Arc::new(bytes),
            dtype,
            device: Device::Cpu,
            numel,
        })
    }

    impl_typed_ctor! {
        from_u8, u8, U8;
        from_i8, i8, I8;
        from_i16, i16, I16;
        from_i32, i32, I32;
        from_i64, i64, I64;
        from_f32, f32, F32;
        from_f64, f64, F64;
    }

    /// Create storage from a slice of bool values (one 0/1 byte each).
    pub fn from_bool(data: &[bool]) -> Self {
        let bytes: Vec<u8> = data.iter().map(|&b| b as u8).collect();
        Self {
            data: Arc::new(bytes),
            dtype: DType::Bool,
            device: Device::Cpu,
            numel: data.len(),
        }
    }

    /// Get the dtype of this storage.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Get the device of this storage.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Number of logical elements.
    pub fn numel(&self) -> usize {
        self.numel
    }

    /// Size in bytes.
    pub fn nbytes(&self) -> usize {
        self.data.len()
    }

    /// Get a read-only reference to the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the raw bytes.
    /// This will clone the underlying data if there are other references
    /// (copy-on-write).
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    impl_typed_view! {
        as_u8_slice, as_u8_slice_mut, u8, U8;
        as_i8_slice, as_i8_slice_mut, i8, I8;
        as_i16_slice, as_i16_slice_mut, i16, I16;
        as_i32_slice, as_i32_slice_mut, i32, I32;
        as_i64_slice, as_i64_slice_mut, i64, I64;
        as_f32_slice, as_f32_slice_mut, f32, F32;
        as_f64_slice, as_f64_slice_mut, f64, F64;
    }

    /// Interpret bool storage as its 0/1 byte representation.
    pub fn as_bool_slice(&self) -> Option<&[u8]> {
        if self.dtype != DType::Bool {
            return None;
        }
        Some(self.as_bytes())
    }

    /// Read one element by physical index, widened to a [`Scalar`].
    pub fn get(&self, index: usize) -> Option<Scalar> {
        if index >= self.numel {
            return None;
        }
        let es = self.dtype.element_size();
        let off = index * es;
        let bytes = &self.data[off..off + es];
        // Byte-wise reads sidestep alignment requirements of typed casts.
        let v = match self.dtype {
            DType::Bool => Scalar::Bool(bytes[0] != 0),
            DType::U8 => Scalar::Int(bytes[0] as i64),
            DType::I8 => Scalar::Int(bytes[0] as i8 as i64),
            DType::I16 => Scalar::Int(i16::from_ne_bytes(bytes.try_into().ok()?) as i64),
            DType::I32 => Scalar::Int(i32::from_ne_bytes(bytes.try_into().ok()?) as i64),
            DType::I64 => Scalar::Int(i64::from_ne_bytes(bytes.try_into().ok()?)),
            DType::F32 => Scalar::Float(f32::from_ne_bytes(bytes.try_into().ok()?) as f64),
            DType::F64 => Scalar::Float(f64::from_ne_bytes(bytes.try_into().ok()?)),
        };
        Some(v)
    }

    /// Write one element by physical index, converting the scalar to this
    /// storage's dtype (copy-on-write). Returns an error on out-of-range
    /// indices; dtype compatibility is the caller's pre-check.
    pub fn set(&mut self, index: usize, value: Scalar) -> Result<()> {
        if index >= self.numel {
            return Err(TesseraError::StorageError(format!(
                "element index {} out of range for {} elements",
                index, self.numel
            )));
        }
        let es = self.dtype.element_size();
        let off = index * es;
        let dtype = self.dtype;
        let bytes = self.as_bytes_mut();
        let dst = &mut bytes[off..off + es];
        match dtype {
            DType::Bool => dst[0] = value.to_bool() as u8,
            DType::U8 => dst[0] = value.to_i64() as u8,
            DType::I8 => dst[0] = value.to_i64() as i8 as u8,
            DType::I16 => dst.copy_from_slice(&(value.to_i64() as i16).to_ne_bytes()),
            DType::I32 => dst.copy_from_slice(&(value.to_i64() as i32).to_ne_bytes()),
            DType::I64 => dst.copy_from_slice(&value.to_i64().to_ne_bytes()),
            DType::F32 => dst.copy_from_slice(&(value.to_f64() as f32).to_ne_bytes()),
            DType::F64 => dst.copy_from_slice(&value.to_f64().to_ne_bytes()),
        }
        Ok(())
    }

    /// Whether this storage is uniquely owned (no other Arc references).
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.data) == 1
    }

    /// Whether this storage is on CPU.
    pub fn is_cpu(&self) -> bool {
        self.device.is_cpu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let s = Storage::zeros(DType::F32, 4);
        assert_eq!(s.numel(), 4);
        assert_eq!(s.nbytes(), 16);
        assert_eq!(s.as_f32_slice().unwrap(), &[0.0; 4]);
    }

    #[test]
    fn test_typed_ctors() {
        let s = Storage::from_i64(&[1, -2, 3]);
        assert_eq!(s.dtype(), DType::I64);
        assert_eq!(s.as_i64_slice().unwrap(), &[1, -2, 3]);

        let s = Storage::from_bool(&[true, false]);
        assert_eq!(s.dtype(), DType::Bool);
        assert_eq!(s.as_bool_slice().unwrap(), &[1, 0]);
    }

    #[test]
    fn test_from_bytes_size_check() {
        assert!(Storage::from_bytes(DType::F32, 2, vec![0u8; 8]).is_ok());
        assert!(Storage::from_bytes(DType::F32, 2, vec![0u8; 7]).is_err());
    }

    #[test]
    fn test_get_set() {
        let mut s = Storage::from_f32(&[1.0, 2.0]);
        assert_eq!(s.get(0), Some(Scalar::Float(1.0)));
        s.set(1, Scalar::Float(5.5)).unwrap();
        assert_eq!(s.as_f32_slice().unwrap(), &[1.0, 5.5]);
        assert!(s.get(2).is_none());
        assert!(s.set(2, Scalar::Int(0)).is_err());
    }

    #[test]
    fn test_get_widens_small_ints() {
        let s = Storage::from_i8(&[-5]);
        assert_eq!(s.get(0), Some(Scalar::Int(-5)));
        let s = Storage::from_u8(&[200]);
        assert_eq!(s.get(0), Some(Scalar::Int(200)));
    }

    #[test]
    fn test_copy_on_write() {
        let mut a = Storage::from_f32(&[1.0, 2.0]);
        let b = a.clone();
        assert!(!a.is_unique());
        a.set(0, Scalar::Float(9.0)).unwrap();
        assert_eq!(a.as_f32_slice().unwrap(), &[9.0, 2.0]);
        // The clone still sees the original bytes.
        assert_eq!(b.as_f32_slice().unwrap(), &[1.0, 2.0]);
    }
}
