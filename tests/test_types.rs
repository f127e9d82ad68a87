//! Static extension types.

use std::mem::size_of;
use std::sync::atomic::{AtomicUsize, Ordering};

use pyhandle::exc::{self, ExcKind};
use pyhandle::ffi::{self, PyObject, PyTypeObject, Py_ssize_t};
use pyhandle::types::type_template;
use pyhandle::{Gil, Handle, StaticType, StructSequenceDesc, StructSequenceField};

fn setup() -> Gil {
    pyhandle::init();
    Gil::acquire()
}

#[repr(C)]
struct NoddyObject {
    ob_base: PyObject,
}

// One byte short; the initializer fixes it up
static NODDY: StaticType = StaticType::from_template(PyTypeObject {
    tp_doc: c"1234".as_ptr(),
    ..type_template(
        c"pyhandle_tests.Noddy",
        (size_of::<NoddyObject>() - 1) as Py_ssize_t,
    )
});

static NODDY_INITS: AtomicUsize = AtomicUsize::new(0);

fn noddy() -> &'static StaticType {
    NODDY
        .make_ready(|tp| {
            NODDY_INITS.fetch_add(1, Ordering::SeqCst);
            tp.tp_basicsize += 1;
            tp.tp_new = Some(ffi::PyType_GenericNew);
        })
        .unwrap();
    &NODDY
}

#[test]
fn test_static_type_initialized_once() {
    let _gil = setup();

    let tp = noddy();
    noddy();
    assert!(tp.is_ready());
    assert_eq!(NODDY_INITS.load(Ordering::SeqCst), 1);

    let mut ran = false;
    assert_eq!(tp.make_ready(|_| ran = true), Ok(false));
    assert!(!ran);

    let raw = unsafe { &*tp.tp() };
    assert_eq!(raw.tp_basicsize as usize, size_of::<NoddyObject>());
    assert!(raw.tp_new.is_some());
    assert_eq!(tp.name().as_deref(), Some("pyhandle_tests.Noddy"));
}

#[test]
fn test_static_type_handles() {
    let _gil = setup();

    let tp = noddy();
    let before = unsafe { ffi::Py_REFCNT(tp.tp_obj()) };

    {
        let borrowed = tp.handle(false);
        assert!(borrowed.is_borrowed());
        assert!(borrowed.is_ptr(tp.tp_obj()));
        assert!(borrowed.check_type());
        assert_eq!(borrowed.as_type(), tp.tp());
        assert_eq!(unsafe { ffi::Py_REFCNT(tp.tp_obj()) }, before);

        let owned = tp.handle(true);
        assert!(!owned.is_borrowed());
        assert!(owned.is(&borrowed));
    }

    assert_eq!(unsafe { ffi::Py_REFCNT(tp.tp_obj()) }, before);
}

#[test]
fn test_static_type_instances() {
    let _gil = setup();

    let tp = noddy();
    let noddy = tp.handle(false);
    let obj = Handle::steal(unsafe { ffi::PyObject_CallObject(noddy.as_ptr(), std::ptr::null_mut()) })
        .unwrap();

    assert_eq!(unsafe { ffi::Py_TYPE(obj.as_ptr()) }, tp.tp());
    assert_eq!(obj.type_name().as_deref(), Some("pyhandle_tests.Noddy"));
    assert!(!obj.check_type());

    let doc = noddy.getattr(c"__doc__").unwrap();
    assert_eq!(doc.extract::<String>().unwrap(), "1234");
}

#[test]
fn test_failed_initialization_is_sticky() {
    let _gil = setup();

    // Struct sequence types must start all-zero; a template has a live header
    static BROKEN: StaticType = StaticType::from_template(type_template(
        c"pyhandle_tests.Broken",
        size_of::<PyObject>() as Py_ssize_t,
    ));
    static BROKEN_DESC: StructSequenceDesc = StructSequenceDesc {
        name: c"pyhandle_tests.Broken",
        doc: None,
        fields: &[StructSequenceField { name: c"a", doc: None }],
        n_in_sequence: 1,
    };

    assert!(BROKEN.make_ready_struct_sequence(&BROKEN_DESC).is_err());
    assert!(exc::matches(ExcKind::SystemError));
    exc::clear();
    assert!(!BROKEN.is_ready());

    let mut ran = false;
    assert!(BROKEN.make_ready(|_| ran = true).is_err());
    assert!(!ran);
    assert!(exc::matches(ExcKind::SystemError));
    exc::clear();
}
