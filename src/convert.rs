//! Building Python objects from Rust values and reading them back.
//!
//! Building goes through constructors on [`Handle`] (and the
//! [`build_value!`](crate::build_value) macro for `Py_BuildValue` formats);
//! each one steals the fresh reference produced by the runtime, so a failed
//! construction shows up as [`crate::Error`]. Reading goes through
//! [`Handle::extract`] and the [`FromHandle`] trait.

use std::os::raw::{c_long, c_ulong};

use crate::error::{Error, Result};
use crate::ffi::{self, check_exc, Py_ssize_t};
use crate::handle::Handle;

/// Build a handle from `Py_BuildValue`.
///
/// The format string must be a `&CStr` (usually a `c"..."` literal). The
/// arguments are passed through C varargs unchanged, so their types must
/// match the format exactly: `i` takes `i32`, `l` takes `c_long`, `d` takes
/// `f64`, `s` takes a `*const c_char`. The caller vouches for that by
/// wrapping the invocation in `unsafe`.
///
/// # Example
///
/// ```no_run
/// use pyhandle::build_value;
///
/// # fn example() -> pyhandle::Result<()> {
/// let list = unsafe { build_value!(c"[iii]", 1, 2, 3) }?;
/// let pair = unsafe { build_value!(c"(id)", 1, 2.5f64) }?;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! build_value {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::Handle::steal($crate::ffi::Py_BuildValue(
            ::std::ffi::CStr::as_ptr($fmt)
            $(, $arg)*
        ))
    };
}

impl Handle {
    /// Build a Python `int` from a C `long`.
    pub fn from_long(v: c_long) -> Result<Handle> {
        Handle::steal(unsafe { ffi::PyLong_FromLong(v) })
    }

    /// Build a Python `int` from a C `unsigned long`.
    pub fn from_ulong(v: c_ulong) -> Result<Handle> {
        Handle::steal(unsafe { ffi::PyLong_FromUnsignedLong(v) })
    }

    /// Build a Python `int` from an `i64`.
    pub fn from_i64(v: i64) -> Result<Handle> {
        Handle::steal(unsafe { ffi::PyLong_FromLongLong(v) })
    }

    /// Build a Python `int` from a `u64`.
    pub fn from_u64(v: u64) -> Result<Handle> {
        Handle::steal(unsafe { ffi::PyLong_FromUnsignedLongLong(v) })
    }

    /// Build a Python `float`.
    pub fn from_f64(v: f64) -> Result<Handle> {
        Handle::steal(unsafe { ffi::PyFloat_FromDouble(v) })
    }

    /// Build a Python `bool`.
    pub fn from_bool(v: bool) -> Result<Handle> {
        Handle::steal(unsafe { ffi::PyBool_FromLong(c_long::from(v)) })
    }

    /// Build a Python `str`.
    pub fn from_string(v: &str) -> Result<Handle> {
        Handle::steal(unsafe {
            ffi::PyUnicode_FromStringAndSize(v.as_ptr().cast(), v.len() as Py_ssize_t)
        })
    }

    /// Get an owning handle to `None`.
    pub fn none() -> Handle {
        unsafe {
            let none = ffi::Py_None();
            ffi::Py_INCREF(none);
            Handle::from_raw_or_null(none)
        }
    }

    /// Read the object into a Rust value.
    ///
    /// Conversion failures (wrong type, overflow) are reported by the
    /// runtime and surface as [`Error`]. The error indicator is only
    /// consulted when the runtime returns its failure value, so an exception
    /// pending from earlier does not fail an unrelated conversion.
    pub fn extract<T: FromHandle>(&self) -> Result<T> {
        T::from_handle(self)
    }
}

/// Types that can be read out of a Python object.
pub trait FromHandle: Sized {
    fn from_handle(handle: &Handle) -> Result<Self>;
}

impl FromHandle for i64 {
    fn from_handle(handle: &Handle) -> Result<Self> {
        let ptr = handle.live_ptr()?;
        let v = unsafe { ffi::PyLong_AsLongLong(ptr) };
        // -1 is also a valid result
        if v == -1 {
            check_exc()?;
        }
        Ok(v)
    }
}

impl FromHandle for u64 {
    fn from_handle(handle: &Handle) -> Result<Self> {
        let ptr = handle.live_ptr()?;
        let v = unsafe { ffi::PyLong_AsUnsignedLongLong(ptr) };
        if v == u64::MAX {
            check_exc()?;
        }
        Ok(v)
    }
}

impl FromHandle for i32 {
    fn from_handle(handle: &Handle) -> Result<Self> {
        let v = i64::from_handle(handle)?;
        i32::try_from(v).map_err(|_| {
            crate::exc::set_string(
                crate::exc::ExcKind::OverflowError,
                "Python int too large to convert to i32",
            )
        })
    }
}

impl FromHandle for f64 {
    fn from_handle(handle: &Handle) -> Result<Self> {
        let ptr = handle.live_ptr()?;
        let v = unsafe { ffi::PyFloat_AsDouble(ptr) };
        if v == -1.0 {
            check_exc()?;
        }
        Ok(v)
    }
}

impl FromHandle for bool {
    /// Python truthiness, as `bool(obj)`.
    fn from_handle(handle: &Handle) -> Result<Self> {
        let ptr = handle.live_ptr()?;
        match unsafe { ffi::PyObject_IsTrue(ptr) } {
            -1 => Err(Error),
            v => Ok(v == 1),
        }
    }
}

impl FromHandle for String {
    fn from_handle(handle: &Handle) -> Result<Self> {
        let ptr = handle.live_ptr()?;
        let mut size: Py_ssize_t = 0;
        let data = unsafe { ffi::PyUnicode_AsUTF8AndSize(ptr, &mut size) };
        if data.is_null() {
            return Err(Error);
        }
        let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size as usize) };
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

impl FromHandle for Handle {
    /// Copy the handle, as [`Clone`] does.
    fn from_handle(handle: &Handle) -> Result<Self> {
        Ok(handle.clone())
    }
}
