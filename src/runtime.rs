//! Interpreter lifecycle and the GIL.
//!
//! Extension modules run inside an interpreter that is already live and
//! never need this module. Embedding programs (and this crate's tests) call
//! [`init`] once and then hold a [`Gil`] while working with handles.

use std::ffi::CStr;
use std::marker::PhantomData;
use std::sync::Once;

use crate::ffi;

/// Options for starting the embedded interpreter.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Let the interpreter install its own signal handlers (SIGINT becomes
    /// `KeyboardInterrupt`). Embedders usually keep their own handlers.
    pub install_signal_handlers: bool,
}

static INIT: Once = Once::new();

/// Initialize the interpreter with default options.
///
/// Safe to call multiple times; only the first call in the process does
/// anything.
pub fn init() {
    init_with(RuntimeOptions::default());
}

/// Initialize the interpreter with the given options.
///
/// If the interpreter was already started by the host program it is left
/// alone. Otherwise it is started and the GIL is released from the calling
/// thread, so that any thread can take it through [`Gil::acquire`].
pub fn init_with(options: RuntimeOptions) {
    INIT.call_once(|| unsafe {
        if ffi::Py_IsInitialized() != 0 {
            log::debug!("interpreter already initialized by host");
            return;
        }

        ffi::Py_InitializeEx(options.install_signal_handlers as i32);
        log::debug!("initialized Python {}", version());

        // Hand the GIL back; every user goes through PyGILState from here on
        ffi::PyEval_SaveThread();
    });
}

/// Check if the interpreter is running.
pub fn is_initialized() -> bool {
    unsafe { ffi::Py_IsInitialized() != 0 }
}

/// Get the interpreter version string (e.g. "3.11.7 (main, ...) [GCC ...]").
pub fn version() -> String {
    unsafe {
        let ptr = ffi::Py_GetVersion();
        if ptr.is_null() {
            return String::new();
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Guard holding the global interpreter lock.
///
/// Acquisition is re-entrant: a thread already holding the GIL may acquire
/// it again, and each guard restores the state it found on drop. Guards
/// must be dropped in reverse order of acquisition, which scoping gives for
/// free.
pub struct Gil {
    state: ffi::PyGILState_STATE,
    // The GIL state is per OS thread
    _not_send: PhantomData<*mut ()>,
}

impl Gil {
    /// Acquire the GIL for the current thread.
    ///
    /// The interpreter must have been initialized.
    pub fn acquire() -> Self {
        debug_assert!(is_initialized(), "interpreter is not initialized");
        let state = unsafe { ffi::PyGILState_Ensure() };
        Self {
            state,
            _not_send: PhantomData,
        }
    }
}

impl Drop for Gil {
    fn drop(&mut self) {
        unsafe { ffi::PyGILState_Release(self.state) };
    }
}

/// Run a closure with the interpreter initialized and the GIL held.
pub fn with_gil<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    init();
    let _gil = Gil::acquire();
    f()
}
