//! Marshaling helpers for the native calling convention.
//!
//! The native factory takes a C `(argc, argv)` pair. [`ArgVector`] owns the
//! NUL-terminated copies of every argument plus the pointer array that
//! refers to them, so both stay alive for exactly as long as the call needs.

use std::ffi::CString;

use libc::{c_char, c_int};

use crate::error::{Error, Result};

pub struct ArgVector {
    // Owns the bytes `pointers` refers to; must outlive every use of them.
    strings: Vec<CString>,
    pointers: Vec<*mut c_char>,
}

impl ArgVector {
    /// Copy `args` into C strings.
    ///
    /// Fails with `Construction` if the vectors cannot be reserved and with
    /// `InvalidArgument` if an argument contains an interior NUL byte.
    pub fn new<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        c_int::try_from(args.len())
            .map_err(|_| Error::invalid_argument("segNet.__init__() argv list is too long"))?;

        let mut strings = Vec::new();
        strings.try_reserve_exact(args.len()).map_err(|e| {
            Error::construction(format!(
                "segNet.__init__() failed to allocate memory for argv list: {e}"
            ))
        })?;
        let mut pointers = Vec::new();
        pointers.try_reserve_exact(args.len() + 1).map_err(|e| {
            Error::construction(format!(
                "segNet.__init__() failed to allocate memory for argv list: {e}"
            ))
        })?;

        for (n, arg) in args.iter().enumerate() {
            let arg = arg.as_ref();
            let cstr = CString::new(arg).map_err(|_| {
                Error::invalid_argument(format!(
                    "segNet.__init__() argv[{n}] contains a NUL byte"
                ))
            })?;
            tracing::debug!(index = n, arg, "segNet.__init__() argv");
            strings.push(cstr);
        }

        // CString's heap buffer does not move when the Vec holding it does.
        pointers.extend(strings.iter().map(|s| s.as_ptr() as *mut c_char));
        pointers.push(std::ptr::null_mut());

        Ok(Self { strings, pointers })
    }

    pub fn argc(&self) -> c_int {
        // Bounded by the check in `new`.
        self.strings.len() as c_int
    }

    /// NULL-terminated `argv` array, valid while `self` is alive.
    pub fn argv(&mut self) -> *mut *mut c_char {
        self.pointers.as_mut_ptr()
    }

    #[cfg(test)]
    pub(crate) fn to_strings(&self) -> Vec<String> {
        self.strings
            .iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}

/// Positive image dimension as the native `uint32_t`; `None` if `value <= 0`
/// or out of range.
pub fn dimension(value: i64) -> Option<u32> {
    if value <= 0 {
        return None;
    }
    u32::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn argv_is_null_terminated() {
        let mut args = ArgVector::new(&["--model=custom.onnx", "--labels=labels.txt"]).unwrap();
        assert_eq!(args.argc(), 2);
        let argv = args.argv();
        unsafe {
            assert_eq!(CStr::from_ptr(*argv).to_str(), Ok("--model=custom.onnx"));
            assert_eq!(CStr::from_ptr(*argv.add(1)).to_str(), Ok("--labels=labels.txt"));
            assert!((*argv.add(2)).is_null());
        }
    }

    #[test]
    fn interior_nul_is_invalid_argument() {
        let err = ArgVector::new(&["--model=a\0b"]).err().unwrap();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn round_trips_argument_text() {
        let args = ArgVector::new(&["--input-blob=data", "--output-blob=score_fr"]).unwrap();
        assert_eq!(
            args.to_strings(),
            vec!["--input-blob=data".to_string(), "--output-blob=score_fr".to_string()]
        );
        assert_eq!(args.argc(), 2);
    }

    #[test]
    fn dimension_rejects_non_positive() {
        assert_eq!(dimension(512), Some(512));
        assert_eq!(dimension(0), None);
        assert_eq!(dimension(-4), None);
        assert_eq!(dimension(i64::from(u32::MAX) + 1), None);
    }
}
