//! Error detection utilities for FFI.
//!
//! CPython reports failure by recording an exception in its thread state and
//! returning a sentinel: a null pointer, or `-1` from status-returning
//! functions. These helpers turn either form into [`crate::Error`].

use std::os::raw::c_int;

use pyo3_ffi::{PyErr_Occurred, PyObject};

use crate::error::{Error, Result};

/// Check whether a Python exception is pending.
///
/// Returns `Err(Error)` if the interpreter's error indicator is set and
/// `Ok(())` otherwise. Nothing is touched on success.
///
/// Must be called with the GIL held.
pub fn check_exc() -> Result<()> {
    if unsafe { PyErr_Occurred() }.is_null() {
        Ok(())
    } else {
        Err(Error)
    }
}

/// Convert a C status code into a Result.
///
/// CPython status functions return `0` on success and `-1` (occasionally any
/// non-zero value) with an exception set on failure.
pub fn check_status(code: c_int) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(Error)
    }
}

/// Convert a possibly-null object pointer into a Result.
///
/// A null pointer is taken to mean that the call producing it has already
/// set an exception.
pub fn check_ptr(ptr: *mut PyObject) -> Result<*mut PyObject> {
    if ptr.is_null() {
        Err(Error)
    } else {
        Ok(ptr)
    }
}
