//! Reference-counted handles over the CPython C API.
//!
//! This crate lets Rust code work with Python objects through ordinary value
//! semantics while the reference counts are kept right behind the scenes.
//! A [`Handle`] either owns one reference to its object or merely borrows
//! it; copying, moving and dropping handles does the matching increments and
//! decrements. CPython's convention of "return null and set an exception"
//! is turned into [`Result`] with the payload-free [`Error`], so `?` works
//! across runtime calls and every handle on the way out is still released.
//!
//! # Example
//!
//! ```no_run
//! use pyhandle::{build_value, Handle, Module, Tuple};
//!
//! fn main() -> pyhandle::Result<()> {
//!     // Start the interpreter and take the GIL
//!     pyhandle::runtime::init();
//!     let _gil = pyhandle::runtime::Gil::acquire();
//!
//!     // Build objects; each handle owns the reference it was given
//!     let numbers = unsafe { build_value!(c"[iii]", 1, 2, 3) }?;
//!     let mut total = Handle::from_long(0)?;
//!     for item in numbers.begin()? {
//!         total = (&total + &item?)?;
//!     }
//!     assert_eq!(total.extract::<i64>()?, 6);
//!
//!     // Containers take references of their own
//!     let mut pair = Tuple::new(2)?;
//!     pair.set_item(0, &total)?;
//!     pair.set_item(1, Handle::from_string("six")?)?;
//!
//!     let module = Module::create(c"scratch")?;
//!     module.add_object(c"pair", pair)?;
//!     assert!(module.hasattr(c"pair"));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! [`Error`] only records that the interpreter has an exception pending.
//! Inspect it with the functions in [`exc`], and at the boundary back to
//! CPython use [`exc::catch`] to hand the failure over as a null return.

pub mod convert;
pub mod error;
pub mod exc;
pub mod ffi;
pub mod handle;
pub mod iter;
pub mod module;
pub mod runtime;
pub mod tuple;
pub mod types;

// Re-export main types at the crate root
pub use convert::FromHandle;
pub use error::{Error, Result};
pub use exc::ExcKind;
pub use ffi::check_exc;
pub use handle::{get_new, CompareOp, Handle, IntoNewRef, Own, Ownership};
pub use iter::IterHandle;
pub use module::Module;
pub use runtime::{Gil, RuntimeOptions};
pub use tuple::Tuple;
pub use types::{StaticType, StructSequence, StructSequenceDesc, StructSequenceField};

/// Initialize the interpreter with default options.
///
/// Shorthand for [`runtime::init`].
pub fn init() {
    runtime::init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        init();
        assert!(runtime::is_initialized());
    }

    #[test]
    fn test_check_exc_clean() {
        runtime::with_gil(|| {
            assert!(check_exc().is_ok());
        });
    }
}
