//! Build script for pyhandle.
//!
//! Resolves the Python interpreter the crate is built against and makes
//! its shared library discoverable at run time.
//!
//! Linking itself is done by pyo3-ffi; this only adds an rpath so that test
//! binaries and demos find libpython when it lives outside the system
//! library path (pyenv, conda, custom prefixes).

use pyo3_build_config::InterpreterConfig;

fn main() {
    let config = pyo3_build_config::get();

    emit_rpath(config);

    // Rerun if a different interpreter is selected
    println!("cargo:rerun-if-env-changed=PYO3_PYTHON");
    println!("cargo:rerun-if-env-changed=PYO3_CONFIG_FILE");
}

/// Emit an rpath link argument for the interpreter's library directory.
fn emit_rpath(config: &InterpreterConfig) {
    if !config.shared {
        println!("cargo:warning=Python interpreter is not built with a shared libpython");
        return;
    }

    let target = std::env::var("TARGET").unwrap_or_default();
    if target.contains("windows") {
        // Windows resolves python3x.dll through PATH
        return;
    }

    if let Some(lib_dir) = &config.lib_dir {
        println!("cargo:rustc-link-arg=-Wl,-rpath,{}", lib_dir);
    }
}
