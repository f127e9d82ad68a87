//! Reference-counted handles for Python objects.
//!
//! A [`Handle`] pairs an object pointer with an [`Ownership`] flag. Owning
//! handles hold exactly one reference to the object and give it back when
//! dropped; borrowing handles only observe the pointer and never touch the
//! reference count. Every operation that hands pointers in or out states
//! which of the two it produces.

use std::ffi::CStr;
use std::fmt;
use std::ops::{Add, Div, Mul, Rem, Sub};
use std::os::raw::c_int;

use crate::error::{Error, Result};
use crate::exc::{self, ExcKind};
use crate::ffi::{self, check_status, PyObject, PyTypeObject};

/// How a handle takes a pointer it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Own {
    /// The pointer is a new reference and the handle takes it over.
    #[default]
    Steal,
    /// The handle observes the pointer without touching its count.
    Borrow,
    /// The pointer is borrowed, and the handle creates its own reference.
    New,
}

/// Whether a handle holds a reference of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owning,
    Borrowing,
}

/// Rich comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CompareOp {
    fn as_raw(self) -> c_int {
        match self {
            CompareOp::Lt => ffi::Py_LT,
            CompareOp::Le => ffi::Py_LE,
            CompareOp::Eq => ffi::Py_EQ,
            CompareOp::Ne => ffi::Py_NE,
            CompareOp::Gt => ffi::Py_GT,
            CompareOp::Ge => ffi::Py_GE,
        }
    }
}

/// Handle to a Python object.
///
/// A null handle is always borrowing. An owning handle to a non-null object
/// holds exactly one reference, regardless of how many other references the
/// object has.
///
/// Copying goes through [`Clone`]: the copy owns a fresh reference if the
/// source was owning and borrows otherwise. A plain Rust move transfers the
/// handle with no count traffic. [`Handle::take`] is the non-destructive
/// move, leaving a borrowing view of the same object behind.
///
/// Handles hold raw pointers, so they are neither `Send` nor `Sync`. All
/// operations require the GIL.
///
/// # Example
///
/// ```no_run
/// use pyhandle::{Handle, Own};
///
/// pyhandle::runtime::with_gil(|| -> pyhandle::Result<()> {
///     let six = Handle::from_long(6)?;
///     let seven = Handle::from_long(7)?;
///     let product = (&six * &seven)?;
///     assert_eq!(product.extract::<i64>()?, 42);
///
///     // A borrowing view never affects the count
///     let view = Handle::new(product.as_ptr(), Own::Borrow, false)?;
///     assert!(view.is(&product));
///     Ok(())
/// })?;
/// # Ok::<(), pyhandle::Error>(())
/// ```
pub struct Handle {
    ptr: *mut PyObject,
    ownership: Ownership,
}

impl Handle {
    //
    // Construction
    //

    /// Create a handle for an object.
    ///
    /// `own` says how the reference is taken. A null `ptr` is an error unless
    /// `allow_null` is set, which fits CPython functions that return null
    /// after setting an exception: the failure is reported right where the
    /// pointer is wrapped.
    pub fn new(ptr: *mut PyObject, own: Own, allow_null: bool) -> Result<Self> {
        let mut handle = Self::default();
        handle.set(ptr, own, allow_null)?;
        Ok(handle)
    }

    /// Take over a new reference.
    pub fn steal(ptr: *mut PyObject) -> Result<Self> {
        Self::new(ptr, Own::Steal, false)
    }

    /// Borrow an object without touching its count.
    pub fn borrow(ptr: *mut PyObject) -> Result<Self> {
        Self::new(ptr, Own::Borrow, false)
    }

    /// Create a new reference to a borrowed object.
    pub fn new_ref(ptr: *mut PyObject) -> Result<Self> {
        Self::new(ptr, Own::New, false)
    }

    /// Take over a new reference, accepting null as an empty handle.
    pub fn from_raw_or_null(ptr: *mut PyObject) -> Self {
        let mut handle = Self::default();
        // Cannot fail with allow_null set
        let _ = handle.set(ptr, Own::Steal, true);
        handle
    }

    //
    // Queries
    //

    /// Check if the handle holds no object.
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Check if the handle holds an object.
    pub fn is_some(&self) -> bool {
        !self.ptr.is_null()
    }

    /// Check if the handle only borrows its object.
    pub fn is_borrowed(&self) -> bool {
        self.ownership == Ownership::Borrowing
    }

    /// Get the ownership state.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Get the object pointer.
    ///
    /// Nothing happens to the ownership. The pointer is only good as a
    /// borrowed argument; passing it to a function that steals references
    /// will corrupt the count.
    pub fn as_ptr(&self) -> *mut PyObject {
        self.ptr
    }

    /// Compare object identity with another handle.
    pub fn is(&self, other: &Handle) -> bool {
        self.ptr == other.ptr
    }

    /// Compare object identity with a raw pointer.
    pub fn is_ptr(&self, ptr: *const PyObject) -> bool {
        self.ptr as *const PyObject == ptr
    }

    /// Get the reference count of the object, or 0 for a null handle.
    pub fn refcnt(&self) -> isize {
        if self.ptr.is_null() {
            return 0;
        }
        unsafe { ffi::Py_REFCNT(self.ptr) }
    }

    /// Get the name of the object's type.
    pub fn type_name(&self) -> Option<String> {
        if self.ptr.is_null() {
            return None;
        }
        unsafe {
            let tp = ffi::Py_TYPE(self.ptr);
            if tp.is_null() || (*tp).tp_name.is_null() {
                return None;
            }
            Some(CStr::from_ptr((*tp).tp_name).to_string_lossy().into_owned())
        }
    }

    //
    // Ownership transfer
    //

    /// Get a new reference to the object.
    ///
    /// The count is bumped for non-null handles; the handle itself is not
    /// changed. Suits CPython functions that steal their arguments.
    pub fn get_new(&self) -> *mut PyObject {
        if !self.ptr.is_null() {
            unsafe { ffi::Py_INCREF(self.ptr) };
        }
        self.ptr
    }

    /// Give up the ownership of the object.
    ///
    /// For a non-null handle a new reference is always returned. An owning
    /// handle hands over its own reference and becomes a borrowing handle to
    /// the same object, so the count does not move. A borrowing handle is
    /// left alone and a fresh reference is created. A null handle returns
    /// null.
    pub fn release(&mut self) -> *mut PyObject {
        if !self.ptr.is_null() {
            match self.ownership {
                Ownership::Owning => self.ownership = Ownership::Borrowing,
                Ownership::Borrowing => unsafe { ffi::Py_INCREF(self.ptr) },
            }
        }
        self.ptr
    }

    /// Consume the handle into a new reference.
    pub fn into_raw(mut self) -> *mut PyObject {
        self.release()
    }

    /// Move the object out, leaving a borrowing view behind.
    ///
    /// The returned handle takes the pointer and ownership as they are.
    /// `self` is not cleared: it still points at the same object but no
    /// longer releases it. Use it for reading only; the object lives only
    /// as long as someone else keeps it alive.
    pub fn take(&mut self) -> Handle {
        let taken = Handle {
            ptr: self.ptr,
            ownership: self.ownership,
        };
        self.ownership = Ownership::Borrowing;
        taken
    }

    /// Move-assign from another handle.
    ///
    /// `self` gets `other`'s pointer and ownership, `other` is demoted to
    /// borrowing as with [`Handle::take`], and whatever `self` owned before
    /// is released.
    pub fn move_from(&mut self, other: &mut Handle) {
        *self = other.take();
    }

    /// Copy-assign from another handle.
    ///
    /// The new reference is taken before the old one is released, so
    /// assigning a handle to the object it already refers to is harmless.
    pub fn assign(&mut self, other: &Handle) {
        self.clone_from(other);
    }

    //
    // Mutation
    //

    /// Reset the handle to refer to another object.
    ///
    /// Arguments mean the same as in [`Handle::new`]. The previously held
    /// reference is released even when the new pointer is rejected, in
    /// which case the handle is left null.
    pub fn reset(&mut self, ptr: *mut PyObject, own: Own, allow_null: bool) -> Result<()> {
        let mut fresh = Handle::default();
        let res = fresh.set(ptr, own, allow_null);
        *self = fresh;
        res
    }

    /// Get a slot to read a borrowed reference into.
    ///
    /// The handle releases what it holds and becomes a null borrowing
    /// handle; the returned pointer can then be passed to functions such as
    /// `PyArg_ParseTuple` that write a borrowed reference.
    pub fn read(&mut self) -> *mut *mut PyObject {
        *self = Handle::default();
        &mut self.ptr
    }

    /// Swap the objects of two handles.
    pub fn swap(&mut self, other: &mut Handle) {
        std::mem::swap(self, other);
    }

    //
    // Object protocol
    //

    /// Get the object pointer, raising `SystemError` for a null handle.
    ///
    /// An exception already pending is kept instead.
    pub(crate) fn live_ptr(&self) -> Result<*mut PyObject> {
        if self.ptr.is_null() {
            return Err(exc::set_string_unless_pending(
                ExcKind::SystemError,
                "operation on a null handle",
            ));
        }
        Ok(self.ptr)
    }

    /// Get an attribute of the object.
    pub fn getattr(&self, name: &CStr) -> Result<Handle> {
        let ptr = self.live_ptr()?;
        Handle::steal(unsafe { ffi::PyObject_GetAttrString(ptr, name.as_ptr()) })
    }

    /// Set an attribute of the object.
    ///
    /// The object takes its own reference to `value`; the handle is not
    /// changed.
    pub fn setattr(&self, name: &CStr, value: &Handle) -> Result<()> {
        let ptr = self.live_ptr()?;
        let value = value.live_ptr()?;
        check_status(unsafe { ffi::PyObject_SetAttrString(ptr, name.as_ptr(), value) })
    }

    /// Delete an attribute of the object.
    pub fn delattr(&self, name: &CStr) -> Result<()> {
        let ptr = self.live_ptr()?;
        check_status(unsafe { ffi::PyObject_DelAttrString(ptr, name.as_ptr()) })
    }

    /// Check if the object has an attribute. Never fails.
    pub fn hasattr(&self, name: &CStr) -> bool {
        if self.ptr.is_null() {
            return false;
        }
        unsafe { ffi::PyObject_HasAttrString(self.ptr, name.as_ptr()) == 1 }
    }

    /// Compare with another object using the Python comparison operators.
    pub fn rich_compare(&self, other: &Handle, op: CompareOp) -> Result<bool> {
        let lhs = self.live_ptr()?;
        let rhs = other.live_ptr()?;
        match unsafe { ffi::PyObject_RichCompareBool(lhs, rhs, op.as_raw()) } {
            -1 => Err(Error),
            res => Ok(res == 1),
        }
    }

    /// Python `<`.
    pub fn lt(&self, other: &Handle) -> Result<bool> {
        self.rich_compare(other, CompareOp::Lt)
    }

    /// Python `<=`.
    pub fn le(&self, other: &Handle) -> Result<bool> {
        self.rich_compare(other, CompareOp::Le)
    }

    /// Python `==`.
    pub fn eq(&self, other: &Handle) -> Result<bool> {
        self.rich_compare(other, CompareOp::Eq)
    }

    /// Python `!=`.
    pub fn ne(&self, other: &Handle) -> Result<bool> {
        self.rich_compare(other, CompareOp::Ne)
    }

    /// Python `>`.
    pub fn gt(&self, other: &Handle) -> Result<bool> {
        self.rich_compare(other, CompareOp::Gt)
    }

    /// Python `>=`.
    pub fn ge(&self, other: &Handle) -> Result<bool> {
        self.rich_compare(other, CompareOp::Ge)
    }

    //
    // Number protocol
    //

    /// Check if the object provides the number protocol. Never fails.
    pub fn check_number(&self) -> bool {
        if self.ptr.is_null() {
            return false;
        }
        unsafe { ffi::PyNumber_Check(self.ptr) == 1 }
    }

    fn binary(
        &self,
        other: &Handle,
        op: unsafe extern "C" fn(*mut PyObject, *mut PyObject) -> *mut PyObject,
    ) -> Result<Handle> {
        let lhs = self.live_ptr()?;
        let rhs = other.live_ptr()?;
        Handle::steal(unsafe { op(lhs, rhs) })
    }

    /// Add two numbers.
    pub fn add(&self, other: &Handle) -> Result<Handle> {
        self.binary(other, ffi::PyNumber_Add)
    }

    /// Subtract `other` from this number.
    pub fn sub(&self, other: &Handle) -> Result<Handle> {
        self.binary(other, ffi::PyNumber_Subtract)
    }

    /// Multiply two numbers.
    pub fn mul(&self, other: &Handle) -> Result<Handle> {
        self.binary(other, ffi::PyNumber_Multiply)
    }

    /// Floor division, Python `//`.
    pub fn floor_div(&self, other: &Handle) -> Result<Handle> {
        self.binary(other, ffi::PyNumber_FloorDivide)
    }

    /// Remainder, Python `%`.
    ///
    /// The result takes the sign of the divisor, unlike Rust's `%`.
    pub fn rem(&self, other: &Handle) -> Result<Handle> {
        self.binary(other, ffi::PyNumber_Remainder)
    }

    /// Get the quotient and the remainder, Python `divmod`.
    pub fn divmod(&self, other: &Handle) -> Result<(Handle, Handle)> {
        let pair = self.binary(other, ffi::PyNumber_Divmod)?;
        let quot = Handle::steal(unsafe { ffi::PySequence_GetItem(pair.ptr, 0) })?;
        let rem = Handle::steal(unsafe { ffi::PySequence_GetItem(pair.ptr, 1) })?;
        Ok((quot, rem))
    }

    //
    // Concrete object checks
    //

    /// Check if the object is a type object.
    pub fn check_type(&self) -> bool {
        !self.ptr.is_null() && unsafe { ffi::PyType_Check(self.ptr) } != 0
    }

    /// Check if the object is a tuple.
    pub fn check_tuple(&self) -> bool {
        !self.ptr.is_null() && unsafe { ffi::PyTuple_Check(self.ptr) } != 0
    }

    /// Get the object as a type object pointer.
    ///
    /// The caller is responsible for checking [`Handle::check_type`] first.
    pub fn as_type(&self) -> *mut PyTypeObject {
        debug_assert!(self.check_type(), "handle does not hold a type object");
        self.ptr as *mut PyTypeObject
    }

    //
    // Reference counting
    //

    /// Point the handle at `ptr`, ignoring whatever it held before.
    fn set(&mut self, ptr: *mut PyObject, own: Own, allow_null: bool) -> Result<()> {
        if ptr.is_null() {
            self.ptr = ptr;
            self.ownership = Ownership::Borrowing;
            return if allow_null { Ok(()) } else { Err(Error) };
        }

        if own == Own::New {
            unsafe { ffi::Py_INCREF(ptr) };
        }
        self.ptr = ptr;
        self.ownership = match own {
            Own::Borrow => Ownership::Borrowing,
            Own::Steal | Own::New => Ownership::Owning,
        };
        Ok(())
    }
}

impl Default for Handle {
    /// An empty, borrowing handle.
    fn default() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            ownership: Ownership::Borrowing,
        }
    }
}

impl Clone for Handle {
    /// Copy the handle. Borrowing handles give borrowing copies.
    fn clone(&self) -> Self {
        if self.ownership == Ownership::Owning && !self.ptr.is_null() {
            unsafe { ffi::Py_INCREF(self.ptr) };
        }
        Self {
            ptr: self.ptr,
            ownership: self.ownership,
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.ownership == Ownership::Owning && !self.ptr.is_null() {
            unsafe { ffi::Py_DECREF(self.ptr) };
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("ptr", &self.ptr)
            .field("ownership", &self.ownership)
            .field("type", &self.type_name())
            .finish()
    }
}

macro_rules! impl_number_op {
    ($trait:ident, $method:ident, $handle_method:ident) => {
        impl $trait for &Handle {
            type Output = Result<Handle>;

            fn $method(self, rhs: Self) -> Result<Handle> {
                Handle::$handle_method(self, rhs)
            }
        }
    };
}

impl_number_op!(Add, add, add);
impl_number_op!(Sub, sub, sub);
impl_number_op!(Mul, mul, mul);
// `/` is floor division, matching integer division in Rust for positives
impl_number_op!(Div, div, floor_div);
impl_number_op!(Rem, rem, rem);

/// Conversion into a new object reference.
///
/// Lets functions that consume a reference accept handles both by
/// reference and by value: a `&Handle` is asked for a new reference
/// ([`Handle::get_new`]), while a `Handle` that is about to be dropped
/// anyway hands over its own ([`Handle::release`]), saving an
/// increment/decrement pair.
pub trait IntoNewRef {
    fn into_new_ref(self) -> *mut PyObject;
}

impl IntoNewRef for &Handle {
    fn into_new_ref(self) -> *mut PyObject {
        self.get_new()
    }
}

impl IntoNewRef for Handle {
    fn into_new_ref(self) -> *mut PyObject {
        self.into_raw()
    }
}

/// Get a new reference out of a handle, borrowed or about to be dropped.
pub fn get_new<T: IntoNewRef>(handle: T) -> *mut PyObject {
    handle.into_new_ref()
}
