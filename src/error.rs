//! Error types for the pyhandle crate.

use thiserror::Error;

/// Result type alias for operations that call into the interpreter.
pub type Result<T> = std::result::Result<T, Error>;

/// Signals that a Python exception is set on the interpreter.
///
/// The value carries no payload. Whatever failed has already recorded the
/// real exception (type, message, traceback) in the interpreter's error
/// state, and that is where it has to be read from, through the helpers in
/// [`crate::exc`]. Keeping a copy here could only drift out of sync with it.
///
/// At the boundary back to the interpreter the error is turned into the
/// interpreter's own failure sentinel, see [`crate::exc::catch`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("a Python exception is set")]
pub struct Error;

impl Error {
    /// Check whether the interpreter currently holds a pending exception.
    ///
    /// A well-behaved caller only ever sees `true` here; `false` means an
    /// `Error` was produced without the runtime recording why.
    pub fn is_set(&self) -> bool {
        crate::exc::occurred()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error.to_string(), "a Python exception is set");
    }

    #[test]
    fn test_error_is_payload_free() {
        assert_eq!(std::mem::size_of::<Error>(), 0);
        assert_eq!(Error, Error::default());
    }
}
