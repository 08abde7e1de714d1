//! Device image handles passed in from Python.
//!
//! The `image` argument of every operation is reduced to a [`DeviceBuffer`]
//! before any check runs. Extraction itself never fails: an object that does
//! not carry a device pointer becomes an invalid buffer, which the operation
//! reports as `InvalidArgument` after the state and dimension checks.

use std::ffi::CStr;
use std::os::raw::c_void;
use std::ptr::NonNull;

use pyo3::prelude::*;
use pyo3::types::{PyCapsule, PyDict, PyTuple};

use crate::error::{Error, Result};

/// Capsule names used by the CUDA utility bindings for image memory.
pub const CAPSULE_NAMES: [&str; 2] = ["cudaMappedMemory", "cudaDeviceMemory"];

/// Bytes per pixel of the RGBA float images the network consumes.
pub const BYTES_PER_PIXEL: usize = 4 * std::mem::size_of::<f32>();

/// How the native call uses the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    /// The native call renders into the image.
    Write,
}

/// Tagged device pointer with the layout metadata its source exposed.
///
/// Capsules carry only a pointer; `__cuda_array_interface__` objects also
/// report their size, whether they are read-only, and their strides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceBuffer {
    ptr: Option<NonNull<c_void>>,
    byte_len: Option<usize>,
    readonly: bool,
    contiguous: bool,
}

impl DeviceBuffer {
    pub fn from_raw(ptr: *mut c_void, byte_len: Option<usize>) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            byte_len,
            readonly: false,
            contiguous: true,
        }
    }

    pub fn invalid() -> Self {
        Self::from_raw(std::ptr::null_mut(), None)
    }

    #[cfg(test)]
    fn is_valid(&self) -> bool {
        self.ptr.is_some()
    }

    /// Pointer to an RGBA float image of `width * height` pixels.
    ///
    /// Fails if the handle carries no pointer, is not one contiguous block,
    /// is read-only while `access` writes, or is known to be too small.
    pub fn image_ptr(&self, op: &str, access: Access, width: u32, height: u32) -> Result<NonNull<f32>> {
        let ptr = self.ptr.ok_or_else(|| {
            Error::invalid_argument(format!(
                "segNet.{op}() failed to get image pointer from PyCapsule container"
            ))
        })?;

        if !self.contiguous {
            return Err(Error::invalid_argument(format!(
                "segNet.{op}() image must be a C-contiguous buffer"
            )));
        }
        if access == Access::Write && self.readonly {
            return Err(Error::invalid_argument(format!(
                "segNet.{op}() renders into the image, but the buffer is read-only"
            )));
        }

        if let Some(len) = self.byte_len {
            let required = (width as usize)
                .checked_mul(height as usize)
                .and_then(|px| px.checked_mul(BYTES_PER_PIXEL));
            match required {
                Some(required) if required <= len => {}
                _ => {
                    return Err(Error::invalid_argument(format!(
                        "segNet.{op}() image buffer of {len} bytes is too small for {width}x{height}"
                    )))
                }
            }
        }

        Ok(ptr.cast())
    }

    /// Reduce an arbitrary Python object to a device buffer.
    pub fn extract(obj: &Bound<'_, PyAny>) -> Self {
        if let Ok(capsule) = obj.downcast::<PyCapsule>() {
            return Self::from_capsule(capsule);
        }
        match Self::from_cuda_array_interface(obj) {
            Ok(Some(buffer)) => buffer,
            Ok(None) => Self::invalid(),
            Err(err) => {
                tracing::debug!(%err, "__cuda_array_interface__ could not be read");
                Self::invalid()
            }
        }
    }

    fn from_capsule(capsule: &Bound<'_, PyCapsule>) -> Self {
        let name = match capsule.name() {
            Ok(name) => name,
            Err(_) => return Self::invalid(),
        };
        if !capsule_name_accepted(name) {
            tracing::debug!(?name, "capsule is not a CUDA memory capsule");
            return Self::invalid();
        }
        Self::from_raw(capsule.pointer(), None)
    }

    fn from_cuda_array_interface(obj: &Bound<'_, PyAny>) -> PyResult<Option<Self>> {
        if !obj.hasattr("__cuda_array_interface__")? {
            return Ok(None);
        }
        let iface = obj.getattr("__cuda_array_interface__")?;
        let iface = iface.downcast::<PyDict>()?;

        let Some(data) = iface.get_item("data")? else {
            return Ok(None);
        };
        let data = data.downcast::<PyTuple>()?;
        let addr: usize = data.get_item(0)?.extract()?;
        let readonly = match data.get_item(1) {
            Ok(flag) => flag.is_truthy()?,
            Err(_) => false,
        };

        let shape: Vec<usize> = match iface.get_item("shape")? {
            Some(shape) => shape.extract()?,
            None => Vec::new(),
        };
        let item_size = match iface.get_item("typestr")? {
            Some(typestr) => typestr_item_size(&typestr.extract::<String>()?),
            None => None,
        };
        let strides: Option<Vec<isize>> = match iface.get_item("strides")? {
            Some(strides) if !strides.is_none() => Some(strides.extract()?),
            _ => None,
        };

        let byte_len = item_size.and_then(|size| {
            shape
                .iter()
                .try_fold(size, |acc, dim| acc.checked_mul(*dim))
        });
        let contiguous = match (&strides, item_size) {
            (None, _) => true,
            (Some(strides), Some(size)) => is_c_contiguous(&shape, strides, size),
            (Some(_), None) => false,
        };

        Ok(Some(Self {
            ptr: NonNull::new(addr as *mut c_void),
            byte_len,
            readonly,
            contiguous,
        }))
    }
}

fn capsule_name_accepted(name: Option<&CStr>) -> bool {
    match name {
        None => true,
        Some(name) => CAPSULE_NAMES
            .iter()
            .any(|accepted| name.to_bytes() == accepted.as_bytes()),
    }
}

/// Item size of an array-interface type string such as `<f4` or `|u1`.
fn typestr_item_size(typestr: &str) -> Option<usize> {
    typestr.get(2..)?.parse().ok()
}

/// Whether `strides` describe a row-major array with no gaps. Axes of
/// length one may carry any stride.
fn is_c_contiguous(shape: &[usize], strides: &[isize], item_size: usize) -> bool {
    if shape.len() != strides.len() {
        return false;
    }
    let mut expected = item_size;
    for (&dim, &stride) in shape.iter().zip(strides).rev() {
        if dim != 1 && usize::try_from(stride).ok() != Some(expected) {
            return false;
        }
        expected = match expected.checked_mul(dim) {
            Some(next) => next,
            None => return false,
        };
    }
    true
}
