//! Building tuples.

use std::ops::Deref;

use crate::error::{Error, Result};
use crate::exc::{self, ExcKind};
use crate::ffi::{self, check_status, Py_ssize_t};
use crate::handle::{Handle, IntoNewRef};

/// Handle for a tuple under construction.
///
/// Meant for creating new tuples; reading existing ones is better done
/// through the generic iteration and sequence operations on [`Handle`].
///
/// # Example
///
/// ```no_run
/// use pyhandle::{Handle, Tuple};
///
/// # fn example() -> pyhandle::Result<()> {
/// let mut tup = Tuple::new(2)?;
/// tup.set_item(0, Handle::from_long(1)?)?;
/// tup.set_item(1, &Handle::from_string("two")?)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Tuple {
    handle: Handle,
}

impl Tuple {
    /// Create a tuple of the given length with all slots empty.
    pub fn new(len: usize) -> Result<Self> {
        let len = Py_ssize_t::try_from(len)
            .map_err(|_| exc::set_string(ExcKind::OverflowError, "tuple length too large"))?;
        let handle = Handle::steal(unsafe { ffi::PyTuple_New(len) })?;
        Ok(Self { handle })
    }

    /// Get the length of the tuple.
    pub fn len(&self) -> usize {
        unsafe { ffi::PyTuple_Size(self.handle.as_ptr()) }.max(0) as usize
    }

    /// Check if the tuple has no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the item at `pos`.
    ///
    /// The tuple takes a reference of its own: a borrowed `&Handle` gives a
    /// new reference, a `Handle` passed by value hands over its own. Any
    /// item previously in the slot is released. An out-of-range position
    /// raises `IndexError`; a tuple that is already shared (another
    /// reference to it exists) raises `SystemError`, as tuples are only
    /// mutable while being built.
    pub fn set_item<T: IntoNewRef>(&mut self, pos: usize, value: T) -> Result<()> {
        let item = value.into_new_ref();
        if item.is_null() {
            return Err(exc::set_string_unless_pending(
                ExcKind::SystemError,
                "cannot store a null handle in a tuple",
            ));
        }
        let pos = match Py_ssize_t::try_from(pos) {
            Ok(pos) => pos,
            Err(_) => {
                unsafe { ffi::Py_DECREF(item) };
                return Err(exc::set_string(
                    ExcKind::IndexError,
                    "tuple assignment index out of range",
                ));
            }
        };
        // PyTuple_SetItem steals `item` even when it fails
        check_status(unsafe { ffi::PyTuple_SetItem(self.handle.as_ptr(), pos, item) })
    }

    /// Get the item at `pos` as a new owning handle.
    pub fn get_item(&self, pos: usize) -> Result<Handle> {
        let pos = Py_ssize_t::try_from(pos).map_err(|_| {
            exc::set_string(ExcKind::IndexError, "tuple index out of range")
        })?;
        let item = unsafe { ffi::PyTuple_GetItem(self.handle.as_ptr(), pos) };
        if item.is_null() {
            if exc::occurred() {
                return Err(Error);
            }
            return Err(exc::set_string(ExcKind::ValueError, "tuple item is not set"));
        }
        Handle::new_ref(item)
    }

    /// Convert into the plain handle.
    pub fn into_handle(self) -> Handle {
        self.handle
    }
}

impl Deref for Tuple {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        &self.handle
    }
}

impl IntoNewRef for Tuple {
    fn into_new_ref(self) -> *mut ffi::PyObject {
        self.handle.into_raw()
    }
}

impl IntoNewRef for &Tuple {
    fn into_new_ref(self) -> *mut ffi::PyObject {
        self.handle.get_new()
    }
}
