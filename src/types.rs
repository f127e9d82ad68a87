//! Statically allocated type objects and struct sequences.
//!
//! Extension types defined in static memory cannot be finished by a
//! constant initializer: making a type ready needs a live interpreter, which
//! does not exist yet when statics are laid out. [`StaticType`] therefore
//! starts inert and is made ready on first use.

use std::cell::UnsafeCell;
use std::ffi::CStr;
use std::ops::Deref;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::Result;
use crate::exc::{self, ExcKind};
use crate::ffi::{self, check_status, PyObject, PyTypeObject, Py_ssize_t};
use crate::handle::{Handle, IntoNewRef, Own};

const PENDING: u8 = 0;
const READY: u8 = 1;
const FAILED: u8 = 2;

/// Build a type object template for [`StaticType::from_template`].
///
/// Fills in the object header, the name, the instance size and the default
/// flags; everything else is zero. Use struct update syntax for more:
///
/// ```no_run
/// use pyhandle::types::{type_template, StaticType};
/// use pyhandle::ffi::{PyObject, PyTypeObject};
///
/// static POINT: StaticType = StaticType::from_template(PyTypeObject {
///     tp_doc: c"A point.".as_ptr(),
///     ..type_template(c"geometry.Point", std::mem::size_of::<PyObject>() as isize)
/// });
/// ```
pub const fn type_template(name: &'static CStr, basicsize: Py_ssize_t) -> PyTypeObject {
    PyTypeObject {
        ob_base: ffi::PyVarObject {
            ob_base: ffi::PyObject_HEAD_INIT,
            ob_size: 0,
        },
        tp_name: name.as_ptr(),
        tp_basicsize: basicsize,
        tp_flags: ffi::Py_TPFLAGS_DEFAULT,
        // All-zero is a valid PyTypeObject: null pointers and empty slots
        ..unsafe { std::mem::zeroed() }
    }
}

/// A type object living in static memory.
///
/// Holds the type object along with its readiness. The object is built
/// inert (by a constant initializer) and made ready by one of the
/// `make_ready*` methods once the interpreter runs. Whichever initializer
/// is invoked first runs exactly once; every later call is a no-op
/// returning `Ok(false)`.
///
/// # Example
///
/// ```no_run
/// use pyhandle::types::{type_template, StaticType};
///
/// static NODDY: StaticType =
///     StaticType::from_template(type_template(c"noddy.Noddy", 16));
///
/// # fn example() -> pyhandle::Result<()> {
/// NODDY.make_ready(|tp| tp.tp_new = Some(pyhandle::ffi::PyType_GenericNew))?;
/// let noddy = NODDY.handle(false);
/// # Ok(())
/// # }
/// ```
pub struct StaticType {
    tp: UnsafeCell<PyTypeObject>,
    state: AtomicU8,
}

// Only touched with the GIL held
unsafe impl Sync for StaticType {}

impl StaticType {
    /// Create an empty, all-zero type object.
    ///
    /// This is the form struct sequence types require.
    pub const fn new() -> Self {
        Self::from_template(unsafe { std::mem::zeroed() })
    }

    /// Create from a type object template. The type is not ready yet.
    pub const fn from_template(tp: PyTypeObject) -> Self {
        Self {
            tp: UnsafeCell::new(tp),
            state: AtomicU8::new(PENDING),
        }
    }

    /// Check if the type has been made ready.
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Get the type object pointer.
    pub fn tp(&self) -> *mut PyTypeObject {
        self.tp.get()
    }

    /// Get the type object as an object pointer.
    pub fn tp_obj(&self) -> *mut PyObject {
        self.tp().cast()
    }

    /// Get a handle for the type object.
    ///
    /// The handle borrows unless `if_new` asks for a new reference.
    pub fn handle(&self, if_new: bool) -> Handle {
        let own = if if_new { Own::New } else { Own::Borrow };
        // tp_obj is never null
        Handle::new(self.tp_obj(), own, true).unwrap_or_default()
    }

    /// Make the type ready with a customization step.
    ///
    /// `action` gets the type object to finish the slots a constant
    /// initializer cannot set, then `PyType_Ready` is called. Returns
    /// `Ok(true)` if this call did the initialization and `Ok(false)` if
    /// the type was already ready, in which case `action` is not run.
    pub fn make_ready<F>(&self, action: F) -> Result<bool>
    where
        F: FnOnce(&mut PyTypeObject),
    {
        self.init_once(|tp| {
            action(unsafe { &mut *tp });
            check_status(unsafe { ffi::PyType_Ready(tp) })
        })
    }

    /// Make the type ready as a struct sequence type.
    ///
    /// Struct sequence types (the named tuples of the C API, like
    /// `os.stat_result`) have to be created on static memory through
    /// `PyStructSequence_InitType2`, which expects an all-zero type object,
    /// so use [`StaticType::new`] for these.
    ///
    /// A descriptor with more sequence fields than fields raises
    /// `ValueError` and leaves the type untouched.
    pub fn make_ready_struct_sequence(&self, desc: &StructSequenceDesc) -> Result<bool> {
        if desc.n_in_sequence > desc.fields.len() {
            return Err(exc::set_string(
                ExcKind::ValueError,
                &format!(
                    "{:?} has {} sequence fields but only {} fields",
                    desc.name,
                    desc.n_in_sequence,
                    desc.fields.len()
                ),
            ));
        }

        self.init_once(|tp| {
            let mut fields: Vec<ffi::PyStructSequence_Field> = desc
                .fields
                .iter()
                .map(|f| ffi::PyStructSequence_Field {
                    name: f.name.as_ptr(),
                    doc: f.doc.map_or(std::ptr::null(), CStr::as_ptr),
                })
                .collect();
            fields.push(ffi::PyStructSequence_Field {
                name: std::ptr::null(),
                doc: std::ptr::null(),
            });

            let n_in_sequence = c_int::try_from(desc.n_in_sequence)
                .map_err(|_| exc::set_string(ExcKind::OverflowError, "too many fields"))?;
            let mut c_desc = ffi::PyStructSequence_Desc {
                name: desc.name.as_ptr(),
                doc: desc.doc.map_or(std::ptr::null(), CStr::as_ptr),
                fields: fields.as_mut_ptr(),
                n_in_sequence,
            };

            // The field table is copied into the type; names must be 'static
            check_status(unsafe { ffi::PyStructSequence_InitType2(tp, &mut c_desc) })
        })
    }

    /// Run `init` unless the type was already initialized, or attempted.
    fn init_once<F>(&self, init: F) -> Result<bool>
    where
        F: FnOnce(*mut PyTypeObject) -> Result<()>,
    {
        match self.state.load(Ordering::Acquire) {
            READY => {
                log::trace!("static type {:?} already ready", self.name());
                return Ok(false);
            }
            FAILED => {
                return Err(exc::set_string(
                    ExcKind::SystemError,
                    "static type initialization failed earlier",
                ));
            }
            _ => {}
        }

        match init(self.tp()) {
            Ok(()) => {
                self.state.store(READY, Ordering::Release);
                log::debug!("static type {:?} ready", self.name());
                Ok(true)
            }
            Err(e) => {
                self.state.store(FAILED, Ordering::Release);
                log::debug!("static type {:?} failed to initialize", self.name());
                Err(e)
            }
        }
    }

    /// Get the type name, if one has been set.
    pub fn name(&self) -> Option<String> {
        let name = unsafe { (*self.tp()).tp_name };
        if name.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
    }
}

impl Default for StaticType {
    fn default() -> Self {
        Self::new()
    }
}

/// A field of a struct sequence type.
#[derive(Debug, Clone, Copy)]
pub struct StructSequenceField {
    pub name: &'static CStr,
    pub doc: Option<&'static CStr>,
}

/// Description of a struct sequence type.
///
/// Unlike the C structure it maps to, this can be stored in a `static`.
///
/// ```no_run
/// use pyhandle::types::{StructSequenceDesc, StructSequenceField};
///
/// static POINT_DESC: StructSequenceDesc = StructSequenceDesc {
///     name: c"geometry.Point",
///     doc: Some(c"A point in the plane."),
///     fields: &[
///         StructSequenceField { name: c"x", doc: None },
///         StructSequenceField { name: c"y", doc: None },
///     ],
///     n_in_sequence: 2,
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StructSequenceDesc {
    pub name: &'static CStr,
    pub doc: Option<&'static CStr>,
    pub fields: &'static [StructSequenceField],
    /// Number of fields visible in the tuple form; the rest are attribute
    /// only.
    pub n_in_sequence: usize,
}

/// Handle for a struct sequence object under construction.
#[derive(Debug, Clone)]
pub struct StructSequence {
    handle: Handle,
    n_fields: usize,
}

impl StructSequence {
    /// Create a struct sequence of a ready static struct sequence type.
    pub fn new(tp: &StaticType) -> Result<Self> {
        if !tp.is_ready() {
            return Err(exc::set_string(ExcKind::SystemError, "type is not ready"));
        }
        unsafe { Self::from_type(tp.tp()) }
    }

    /// Create a struct sequence of the given type.
    ///
    /// # Safety
    ///
    /// `tp` must point to a ready struct sequence type.
    pub unsafe fn from_type(tp: *mut PyTypeObject) -> Result<Self> {
        let n_fields = Handle::borrow(tp.cast())?
            .getattr(c"n_fields")?
            .extract::<u64>()?;
        let handle = Handle::steal(ffi::PyStructSequence_New(tp))?;
        Ok(Self {
            handle,
            n_fields: n_fields as usize,
        })
    }

    /// Get the number of fields, including the attribute-only ones.
    pub fn n_fields(&self) -> usize {
        self.n_fields
    }

    /// Set the field at `pos`.
    ///
    /// The reference is taken as in [`crate::Tuple::set_item`].
    pub fn set_item<T: IntoNewRef>(&mut self, pos: usize, value: T) -> Result<()> {
        if pos >= self.n_fields {
            return Err(exc::set_string(
                ExcKind::IndexError,
                "struct sequence index out of range",
            ));
        }
        let item = value.into_new_ref();
        if item.is_null() {
            return Err(exc::set_string_unless_pending(
                ExcKind::SystemError,
                "cannot store a null handle in a struct sequence",
            ));
        }

        unsafe {
            let obj = self.handle.as_ptr();
            // The slot may hold an earlier item; SetItem overwrites blindly
            let old = ffi::PyStructSequence_GetItem(obj, pos as Py_ssize_t);
            ffi::PyStructSequence_SetItem(obj, pos as Py_ssize_t, item);
            ffi::Py_XDECREF(old);
        }
        Ok(())
    }

    /// Get the field at `pos` as a new owning handle.
    pub fn get_item(&self, pos: usize) -> Result<Handle> {
        if pos >= self.n_fields {
            return Err(exc::set_string(
                ExcKind::IndexError,
                "struct sequence index out of range",
            ));
        }
        let item = unsafe { ffi::PyStructSequence_GetItem(self.handle.as_ptr(), pos as Py_ssize_t) };
        if item.is_null() {
            return Err(exc::set_string(
                ExcKind::ValueError,
                "struct sequence field is not set",
            ));
        }
        Handle::new_ref(item)
    }

    /// Convert into the plain handle.
    pub fn into_handle(self) -> Handle {
        self.handle
    }
}

impl Deref for StructSequence {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        &self.handle
    }
}

impl IntoNewRef for StructSequence {
    fn into_new_ref(self) -> *mut PyObject {
        self.handle.into_raw()
    }
}
