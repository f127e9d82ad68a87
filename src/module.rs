//! Handles for Python modules.

use std::ffi::CStr;
use std::ops::Deref;

use crate::error::Result;
use crate::ffi::{self, check_status, PyObject};
use crate::handle::{Handle, IntoNewRef, Own};

/// Handle for a Python module.
///
/// Adds module utilities on top of [`Handle`]. Unlike [`Handle::new`], the
/// default constructor only borrows: with multi-phase initialization the
/// module is owned by the interpreter and outlives the code populating it.
#[derive(Debug, Clone)]
pub struct Module {
    handle: Handle,
}

impl Module {
    /// Borrow a module. A null pointer is an error.
    pub fn new(module: *mut PyObject) -> Result<Self> {
        Self::with_own(module, Own::Borrow, false)
    }

    /// Wrap a module with explicit ownership, as [`Handle::new`] does.
    pub fn with_own(module: *mut PyObject, own: Own, allow_null: bool) -> Result<Self> {
        Ok(Self {
            handle: Handle::new(module, own, allow_null)?,
        })
    }

    /// Create a new, empty module object owned by the handle.
    pub fn create(name: &CStr) -> Result<Self> {
        Self::with_own(unsafe { ffi::PyModule_New(name.as_ptr()) }, Own::Steal, false)
    }

    /// Get the module name.
    pub fn name(&self) -> Result<String> {
        self.handle.getattr(c"__name__")?.extract()
    }

    /// Add an object to the module namespace.
    ///
    /// The module keeps a reference of its own, taken as in
    /// [`crate::Tuple::set_item`]. On failure the reference is given back,
    /// so nothing leaks.
    pub fn add_object<T: IntoNewRef>(&self, name: &CStr, value: T) -> Result<()> {
        let module = self.handle.live_ptr()?;
        let item = value.into_new_ref();
        let res = check_status(unsafe { ffi::PyModule_AddObject(module, name.as_ptr(), item) });
        if res.is_err() {
            log::debug!("failed to add {:?} to module", name);
            // PyModule_AddObject only steals on success
            unsafe { ffi::Py_XDECREF(item) };
        }
        res
    }

    /// Convert into the plain handle.
    pub fn into_handle(self) -> Handle {
        self.handle
    }
}

impl Deref for Module {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        &self.handle
    }
}
