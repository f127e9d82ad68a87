//! FFI bindings to the CPython C API.
//!
//! The raw declarations come from `pyo3-ffi` and are re-exported unchanged.
//! Users should prefer the safe wrappers in the parent modules, but the raw
//! API stays reachable for the calls this crate does not wrap.

pub mod error;

pub use error::{check_exc, check_ptr, check_status};
pub use pyo3_ffi::*;
