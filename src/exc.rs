//! Access to the interpreter's exception state.
//!
//! [`crate::Error`] only says that an exception is pending. What the
//! exception actually is lives in the interpreter and is inspected, raised
//! and cleared through the functions here.

use std::ffi::CString;
use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::ffi::{self, PyObject};
use crate::handle::Handle;

/// Standard exception classes used by the crate and its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcKind {
    AttributeError,
    IndexError,
    KeyError,
    OverflowError,
    RuntimeError,
    StopIteration,
    SystemError,
    TypeError,
    ValueError,
    ZeroDivisionError,
}

impl ExcKind {
    /// Get the borrowed class object of this exception kind.
    pub fn as_ptr(self) -> *mut PyObject {
        unsafe {
            match self {
                ExcKind::AttributeError => ffi::PyExc_AttributeError,
                ExcKind::IndexError => ffi::PyExc_IndexError,
                ExcKind::KeyError => ffi::PyExc_KeyError,
                ExcKind::OverflowError => ffi::PyExc_OverflowError,
                ExcKind::RuntimeError => ffi::PyExc_RuntimeError,
                ExcKind::StopIteration => ffi::PyExc_StopIteration,
                ExcKind::SystemError => ffi::PyExc_SystemError,
                ExcKind::TypeError => ffi::PyExc_TypeError,
                ExcKind::ValueError => ffi::PyExc_ValueError,
                ExcKind::ZeroDivisionError => ffi::PyExc_ZeroDivisionError,
            }
        }
    }
}

/// Check if an exception is pending.
pub fn occurred() -> bool {
    unsafe { !ffi::PyErr_Occurred().is_null() }
}

/// Check if the pending exception is an instance of `kind`.
///
/// Returns `false` when nothing is pending.
pub fn matches(kind: ExcKind) -> bool {
    unsafe {
        let exc = ffi::PyErr_Occurred();
        !exc.is_null() && ffi::PyErr_GivenExceptionMatches(exc, kind.as_ptr()) != 0
    }
}

/// Clear the pending exception, if any.
pub fn clear() {
    unsafe { ffi::PyErr_Clear() }
}

/// Raise `kind` with the given message and return the matching [`Error`].
///
/// Interior NUL bytes in `msg` are dropped.
pub fn set_string(kind: ExcKind, msg: &str) -> Error {
    let msg = CString::new(msg.replace('\0', "")).unwrap_or_default();
    unsafe { ffi::PyErr_SetString(kind.as_ptr(), msg.as_ptr()) };
    Error
}

/// Raise `kind` with `msg` unless an exception is already pending.
///
/// Used where a null pointer is met: it usually comes from a runtime call
/// that failed, and its exception must be kept.
pub(crate) fn set_string_unless_pending(kind: ExcKind, msg: &str) -> Error {
    if occurred() {
        return Error;
    }
    set_string(kind, msg)
}

/// Run extension code and translate its outcome for the interpreter.
///
/// On success the handle is turned into a new reference; a null handle
/// raises `SystemError` unless an exception is pending. On [`Error`] null
/// is returned and the exception already set by the failing call is left
/// in place. A panic is reported as `RuntimeError` instead of unwinding
/// into C.
pub fn catch<F>(f: F) -> *mut PyObject
where
    F: FnOnce() -> Result<Handle>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(handle)) => {
            if handle.is_null() {
                set_string_unless_pending(
                    ExcKind::SystemError,
                    "extension code returned a null handle",
                );
            }
            handle.into_raw()
        }
        Ok(Err(Error)) => {
            debug_assert!(occurred(), "Error returned without an exception set");
            std::ptr::null_mut()
        }
        Err(_) => {
            log::error!("panic in extension code");
            set_string(ExcKind::RuntimeError, "panic in extension code");
            std::ptr::null_mut()
        }
    }
}

/// Like [`catch`], for slots reporting a status code (`0` or `-1`).
pub fn catch_status<F>(f: F) -> c_int
where
    F: FnOnce() -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => 0,
        Ok(Err(Error)) => -1,
        Err(_) => {
            log::error!("panic in extension code");
            set_string(ExcKind::RuntimeError, "panic in extension code");
            -1
        }
    }
}
