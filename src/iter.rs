//! Iteration over Python iterables.
//!
//! [`IterHandle`] wraps a Python iterator and caches the element it last
//! pulled. It is primed on construction, so [`IterHandle::current`] is valid
//! right away, and it is exhausted for good once the runtime reports the end
//! of the sequence. Two styles of loop are supported:
//!
//! ```no_run
//! # use pyhandle::{Handle, Result};
//! # fn example(list: &Handle) -> Result<()> {
//! // Cursor style, with an explicit end test
//! let mut it = list.begin()?;
//! while it != list.end() {
//!     println!("{:?}", it.current());
//!     it.advance()?;
//! }
//!
//! // Rust iterator style
//! for item in list.begin()? {
//!     let item = item?;
//!     println!("{:?}", item);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::exc::{self, ExcKind};
use crate::ffi;
use crate::handle::Handle;

/// Wrapper over a Python iterator.
///
/// Besides the iterator itself it holds the current element, which is null
/// once the iterator is exhausted. The default value is the one-past-end
/// sentinel: it holds nothing and never calls into the runtime.
///
/// Equality is only defined between a live iterator and the sentinel, and
/// answers "is the iteration over", not "are these the same iterator".
#[derive(Default)]
pub struct IterHandle {
    iter: Handle,
    val: Handle,
    done: bool,
    // `val` was handed out by `next`; pull again before yielding
    yielded: bool,
}

impl IterHandle {
    /// Wrap a new reference to a Python iterator.
    ///
    /// The reference is stolen, and a null pointer is taken to mean that an
    /// exception is already set, which fits `PyObject_GetIter` directly.
    /// An object that is not an iterator raises `TypeError` here rather than
    /// on the first pull.
    pub fn new(ptr: *mut ffi::PyObject) -> Result<Self> {
        let iter = Handle::steal(ptr)?;

        if unsafe { ffi::PyIter_Check(iter.as_ptr()) } == 0 {
            let type_name = iter.type_name().unwrap_or_default();
            return Err(exc::set_string(
                ExcKind::TypeError,
                &format!("'{:.200}' object is not an iterator", type_name),
            ));
        }

        let mut it = Self {
            iter,
            val: Handle::default(),
            done: false,
            yielded: false,
        };
        it.advance()?;
        Ok(it)
    }

    /// Create the one-past-end sentinel.
    pub fn sentinel() -> Self {
        Self::default()
    }

    /// Check if this is the sentinel rather than a live iterator.
    pub fn is_sentinel(&self) -> bool {
        self.iter.is_null()
    }

    /// Get the current element.
    ///
    /// A null handle is returned once the iterator is exhausted.
    pub fn current(&self) -> &Handle {
        &self.val
    }

    /// Check if there is a current element.
    pub fn has_val(&self) -> bool {
        self.val.is_some()
    }

    /// Pull the next element from the Python iterator.
    ///
    /// The runtime signals both the end of the sequence and failure by
    /// returning null; they are told apart by the error indicator. Advancing
    /// an exhausted iterator or the sentinel does nothing.
    pub fn advance(&mut self) -> Result<()> {
        self.yielded = false;
        if self.iter.is_null() || self.done {
            return Ok(());
        }

        let next = unsafe { ffi::PyIter_Next(self.iter.as_ptr()) };
        self.val = Handle::from_raw_or_null(next);
        if self.val.is_null() {
            self.done = true;
            if exc::occurred() {
                log::debug!("{:?} iterator failed", self.iter.type_name());
                return Err(Error);
            }
            log::trace!("{:?} iterator exhausted", self.iter.type_name());
        }
        Ok(())
    }
}

impl PartialEq for IterHandle {
    /// Check if the iteration is over.
    ///
    /// One side must be the sentinel.
    fn eq(&self, other: &Self) -> bool {
        debug_assert!(
            self.is_sentinel() != other.is_sentinel(),
            "IterHandle can only be compared with the end sentinel"
        );
        if self.is_sentinel() {
            !other.has_val()
        } else {
            !self.has_val()
        }
    }
}

impl Iterator for IterHandle {
    type Item = Result<Handle>;

    /// Yield the current element.
    ///
    /// The pull for the following element is deferred to the next call, so
    /// no exception is pending while the caller works with the item. A
    /// failure while pulling is yielded once; the iterator is exhausted
    /// afterwards.
    fn next(&mut self) -> Option<Self::Item> {
        if self.yielded {
            if let Err(e) = self.advance() {
                return Some(Err(e));
            }
        }
        if !self.has_val() {
            return None;
        }

        self.yielded = true;
        Some(Ok(self.val.clone()))
    }
}

impl std::iter::FusedIterator for IterHandle {}

impl fmt::Debug for IterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterHandle")
            .field("iter", &self.iter)
            .field("val", &self.val)
            .field("done", &self.done)
            .field("yielded", &self.yielded)
            .finish()
    }
}

impl Handle {
    /// Get an iterator over the object.
    ///
    /// Calls `PyObject_GetIter`, so non-iterable objects fail with the
    /// runtime's `TypeError`.
    pub fn begin(&self) -> Result<IterHandle> {
        let ptr = self.live_ptr()?;
        IterHandle::new(unsafe { ffi::PyObject_GetIter(ptr) })
    }

    /// Get the one-past-end sentinel to compare [`Handle::begin`] against.
    pub fn end(&self) -> IterHandle {
        IterHandle::sentinel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_holds_nothing() {
        let end = IterHandle::sentinel();
        assert!(end.is_sentinel());
        assert!(!end.has_val());
        assert!(end.current().is_null());
    }

    #[test]
    fn test_sentinel_advance_is_noop() {
        let mut end = IterHandle::default();
        assert!(end.advance().is_ok());
        assert!(end.next().is_none());
    }
}
