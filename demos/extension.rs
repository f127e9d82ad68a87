//! Embeds the interpreter and builds a small extension module by hand.
//!
//! The module exposes one function, `summarize(iterable)`, returning a
//! struct sequence with the number of items and their sum.
//!
//! Run with: cargo run --example extension

use pyhandle::exc::{self, ExcKind};
use pyhandle::ffi::{self, PyObject};
use pyhandle::{
    build_value, Gil, Handle, Module, StaticType, StructSequence, StructSequenceDesc,
    StructSequenceField, Tuple,
};

static STATS_DESC: StructSequenceDesc = StructSequenceDesc {
    name: c"demo.Stats",
    doc: Some(c"Summary of an iterable of numbers."),
    fields: &[
        StructSequenceField {
            name: c"count",
            doc: Some(c"number of items"),
        },
        StructSequenceField {
            name: c"total",
            doc: Some(c"sum of the items"),
        },
    ],
    n_in_sequence: 2,
};

static STATS: StaticType = StaticType::new();

fn summarize_impl(args: &Handle) -> pyhandle::Result<Handle> {
    let mut count: u64 = 0;
    let mut total = Handle::from_long(0)?;

    let iterable = Handle::steal(unsafe { ffi::PySequence_GetItem(args.as_ptr(), 0) })?;
    for item in iterable.begin()? {
        let item = item?;
        if !item.check_number() {
            return Err(exc::set_string(
                ExcKind::TypeError,
                &format!("expected a number, got {}", item.type_name().unwrap_or_default()),
            ));
        }
        total = (&total + &item)?;
        count += 1;
    }

    let mut stats = StructSequence::new(&STATS)?;
    stats.set_item(0, Handle::from_u64(count)?)?;
    stats.set_item(1, total)?;
    Ok(stats.into_handle())
}

unsafe extern "C" fn summarize(_module: *mut PyObject, args: *mut PyObject) -> *mut PyObject {
    exc::catch(|| summarize_impl(&Handle::borrow(args)?))
}

fn build_module() -> pyhandle::Result<Module> {
    STATS.make_ready_struct_sequence(&STATS_DESC)?;

    let module = Module::create(c"demo")?;
    module.add_object(c"Stats", STATS.handle(true))?;

    // Functions keep a pointer to their definition for their whole life
    let def = Box::leak(Box::new(ffi::PyMethodDef {
        ml_name: c"summarize".as_ptr(),
        ml_meth: ffi::PyMethodDefPointer {
            PyCFunction: summarize,
        },
        ml_flags: ffi::METH_VARARGS,
        ml_doc: c"summarize(iterable) -> Stats".as_ptr(),
    }));
    let func = Handle::steal(unsafe {
        ffi::PyCFunction_NewEx(def, module.as_ptr(), std::ptr::null_mut())
    })?;
    module.add_object(c"summarize", func)?;

    Ok(module)
}

fn call(func: &Handle, arg: Handle) -> pyhandle::Result<Handle> {
    let mut args = Tuple::new(1)?;
    args.set_item(0, arg)?;
    Handle::steal(unsafe { ffi::PyObject_Call(func.as_ptr(), args.as_ptr(), std::ptr::null_mut()) })
}

fn main() -> pyhandle::Result<()> {
    pyhandle::init();
    let _gil = Gil::acquire();

    println!("Python {}", pyhandle::runtime::version());

    let module = build_module()?;
    println!("Module: {}", module.name()?);

    let summarize = module.getattr(c"summarize")?;

    println!("\n--- Summarizing a list ---");
    let numbers = unsafe { build_value!(c"[iidi]", 1, 2, 2.5f64, 4) }?;
    let stats = call(&summarize, numbers)?;
    println!("count: {}", stats.getattr(c"count")?.extract::<u64>()?);
    println!("total: {}", stats.getattr(c"total")?.extract::<f64>()?);

    println!("\n--- Summarizing bad input ---");
    let mixed = unsafe { build_value!(c"[is]", 1, c"two".as_ptr()) }?;
    match call(&summarize, mixed) {
        Ok(_) => println!("unexpected success"),
        Err(_) if exc::matches(ExcKind::TypeError) => {
            println!("raised TypeError as expected");
            exc::clear();
        }
        Err(e) => return Err(e),
    }

    Ok(())
}
