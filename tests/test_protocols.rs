//! Object, comparison and number protocols on handles, plus conversions.

use pyhandle::exc::{self, ExcKind};
use pyhandle::ffi;
use pyhandle::{build_value, Error, Gil, Handle};

fn setup() -> Gil {
    pyhandle::init();
    Gil::acquire()
}

//
// Attributes
//

#[test]
fn test_getattr() {
    let _gil = setup();

    let one = Handle::from_long(1).unwrap();
    let real = one.getattr(c"real").unwrap();
    assert!(!real.is_borrowed());
    assert!(real.eq(&one).unwrap());
}

#[test]
fn test_setattr_delattr() {
    let _gil = setup();

    let one = Handle::from_long(1).unwrap();
    let dummy = Handle::steal(unsafe { ffi::PyModule_New(c"dummymodule".as_ptr()) }).unwrap();

    assert!(!dummy.hasattr(c"aa"));
    dummy.setattr(c"aa", &one).unwrap();
    assert!(dummy.hasattr(c"aa"));
    assert!(dummy.getattr(c"aa").unwrap().is(&one));

    dummy.delattr(c"aa").unwrap();
    assert!(!dummy.hasattr(c"aa"));
    assert_eq!(dummy.getattr(c"aa").unwrap_err(), Error);
    assert!(exc::matches(ExcKind::AttributeError));
    exc::clear();
}

#[test]
fn test_delattr_missing() {
    let _gil = setup();

    let dummy = Handle::steal(unsafe { ffi::PyModule_New(c"dummymodule".as_ptr()) }).unwrap();
    assert!(dummy.delattr(c"missing").is_err());
    assert!(exc::matches(ExcKind::AttributeError));
    exc::clear();
}

#[test]
fn test_hasattr_keeps_error_clear() {
    let _gil = setup();

    let one = Handle::from_long(1).unwrap();
    assert!(one.hasattr(c"real"));
    assert!(!one.hasattr(c"no_such_attribute"));
    assert!(!exc::occurred());
}

#[test]
fn test_null_handle_operations_fail() {
    let _gil = setup();

    let empty = Handle::default();
    assert!(empty.getattr(c"real").is_err());
    assert!(exc::matches(ExcKind::SystemError));
    exc::clear();

    let one = Handle::from_long(1).unwrap();
    assert!(one.add(&empty).is_err());
    assert!(exc::matches(ExcKind::SystemError));
    exc::clear();
}

//
// Comparisons
//

#[test]
fn test_comparisons() {
    let _gil = setup();

    let small = unsafe { build_value!(c"[ii]", 1, 1) }.unwrap();
    let small2 = unsafe { build_value!(c"[ii]", 1, 1) }.unwrap();
    let big = unsafe { build_value!(c"[ii]", 1, 2) }.unwrap();
    assert!(!small.is(&small2));

    assert!(small.lt(&big).unwrap());
    assert!(!big.lt(&small).unwrap());
    assert!(!small.lt(&small2).unwrap());

    assert!(small.le(&big).unwrap());
    assert!(small.le(&small2).unwrap());
    assert!(!big.le(&small).unwrap());

    assert!(small.eq(&small2).unwrap());
    assert!(!small.eq(&big).unwrap());

    assert!(small.ne(&big).unwrap());
    assert!(!small.ne(&small2).unwrap());

    assert!(big.gt(&small).unwrap());
    assert!(!small.gt(&small2).unwrap());

    assert!(big.ge(&small).unwrap());
    assert!(small.ge(&small2).unwrap());
    assert!(!small.ge(&big).unwrap());
}

#[test]
fn test_invalid_comparison() {
    let _gil = setup();

    let list = unsafe { build_value!(c"[ii]", 1, 1) }.unwrap();
    let one = Handle::from_long(1).unwrap();

    assert_eq!(list.lt(&one), Err(Error));
    assert!(exc::matches(ExcKind::TypeError));
    exc::clear();

    // Equality between unrelated types is never an error
    assert!(!list.eq(&one).unwrap());
}

//
// Numbers
//

#[test]
fn test_arithmetic() {
    let _gil = setup();

    let six = Handle::from_long(6).unwrap();
    let thirteen = Handle::from_long(13).unwrap();

    let sum = six.add(&thirteen).unwrap();
    assert_eq!(sum.extract::<i64>().unwrap(), 19);

    let product = (&six * &thirteen).unwrap();
    assert_eq!(product.extract::<i64>().unwrap(), 78);

    let diff = (&six - &thirteen).unwrap();
    assert_eq!(diff.extract::<i64>().unwrap(), -7);

    let quot = (&thirteen / &six).unwrap();
    assert_eq!(quot.extract::<i64>().unwrap(), 2);

    let rem = (&thirteen % &six).unwrap();
    assert_eq!(rem.extract::<i64>().unwrap(), 1);
}

#[test]
fn test_floor_semantics() {
    let _gil = setup();

    let a = Handle::from_long(-7).unwrap();
    let b = Handle::from_long(3).unwrap();

    assert_eq!(a.floor_div(&b).unwrap().extract::<i64>().unwrap(), -3);
    assert_eq!(a.rem(&b).unwrap().extract::<i64>().unwrap(), 2);
}

#[test]
fn test_divmod() {
    let _gil = setup();

    let six = Handle::from_long(6).unwrap();
    let thirteen = Handle::from_long(13).unwrap();

    let (quot, rem) = thirteen.divmod(&six).unwrap();
    assert_eq!(quot.extract::<i64>().unwrap(), 2);
    assert_eq!(rem.extract::<i64>().unwrap(), 1);

    let expected = unsafe { build_value!(c"(ii)", 2, 1) }.unwrap();
    let pair = unsafe { build_value!(c"(OO)", quot.as_ptr(), rem.as_ptr()) }.unwrap();
    assert!(pair.eq(&expected).unwrap());
}

#[test]
fn test_division_by_zero() {
    let _gil = setup();

    let one = Handle::from_long(1).unwrap();
    let zero = Handle::from_long(0).unwrap();

    assert!((&one / &zero).is_err());
    assert!(exc::matches(ExcKind::ZeroDivisionError));
    exc::clear();

    assert!(one.divmod(&zero).is_err());
    assert!(exc::matches(ExcKind::ZeroDivisionError));
    exc::clear();
}

#[test]
fn test_check_number() {
    let _gil = setup();

    assert!(Handle::from_long(6).unwrap().check_number());
    assert!(Handle::from_f64(0.5).unwrap().check_number());
    assert!(!Handle::default().check_number());
    assert!(!unsafe { build_value!(c"(ii)", 1, 2) }.unwrap().check_number());
}

#[test]
fn test_mixed_operands() {
    let _gil = setup();

    let one = Handle::from_long(1).unwrap();
    let half = Handle::from_f64(0.5).unwrap();
    let text = Handle::from_string("x").unwrap();

    assert_eq!((&one + &half).unwrap().extract::<f64>().unwrap(), 1.5);

    assert!((&one + &text).is_err());
    assert!(exc::matches(ExcKind::TypeError));
    exc::clear();

    // Sequence repetition goes through the number protocol
    let three = Handle::from_long(3).unwrap();
    let repeated = (&text * &three).unwrap();
    assert_eq!(repeated.extract::<String>().unwrap(), "xxx");
}

//
// Conversions
//

#[test]
fn test_extract_values() {
    let _gil = setup();

    assert_eq!(Handle::from_i64(-5).unwrap().extract::<i64>().unwrap(), -5);
    assert_eq!(Handle::from_u64(u64::MAX).unwrap().extract::<u64>().unwrap(), u64::MAX);
    assert_eq!(Handle::from_long(42).unwrap().extract::<i32>().unwrap(), 42);
    assert_eq!(Handle::from_f64(2.25).unwrap().extract::<f64>().unwrap(), 2.25);
    assert!(Handle::from_bool(true).unwrap().extract::<bool>().unwrap());
    assert!(!Handle::none().extract::<bool>().unwrap());
    assert_eq!(
        Handle::from_string("héllo").unwrap().extract::<String>().unwrap(),
        "héllo"
    );
}

#[test]
fn test_extract_overflow() {
    let _gil = setup();

    let big = Handle::from_i64(i64::from(i32::MAX) + 1).unwrap();
    assert!(big.extract::<i32>().is_err());
    assert!(exc::matches(ExcKind::OverflowError));
    exc::clear();

    let negative = Handle::from_long(-1).unwrap();
    assert!(negative.extract::<u64>().is_err());
    assert!(exc::matches(ExcKind::OverflowError));
    exc::clear();
}

#[test]
fn test_extract_wrong_type() {
    let _gil = setup();

    let text = Handle::from_string("1").unwrap();
    assert!(text.extract::<i64>().is_err());
    assert!(exc::matches(ExcKind::TypeError));
    exc::clear();

    let one = Handle::from_long(1).unwrap();
    assert!(one.extract::<String>().is_err());
    assert!(exc::matches(ExcKind::TypeError));
    exc::clear();
}

#[test]
fn test_none_is_shared() {
    let _gil = setup();

    let none = Handle::none();
    assert!(!none.is_borrowed());
    assert!(none.is_ptr(unsafe { ffi::Py_None() }));
    assert!(none.is(&Handle::none()));
}

#[test]
fn test_build_value_error() {
    let _gil = setup();

    // Unbalanced format
    let res = unsafe { build_value!(c"(i", 1) };
    assert_eq!(res.unwrap_err(), Error);
    assert!(exc::occurred());
    exc::clear();
}

#[test]
fn test_null_from_failed_call_keeps_exception() {
    let _gil = setup();

    let one = Handle::from_long(1).unwrap();
    let missing =
        Handle::from_raw_or_null(unsafe { ffi::PyObject_GetAttrString(one.as_ptr(), c"no_such".as_ptr()) });
    assert!(missing.is_null());
    assert!(exc::matches(ExcKind::AttributeError));

    assert!(missing.getattr(c"real").is_err());
    assert!(exc::matches(ExcKind::AttributeError));
    assert!(missing.add(&one).is_err());
    assert!(exc::matches(ExcKind::AttributeError));
    exc::clear();
}

#[test]
fn test_extract_with_pending_exception() {
    let _gil = setup();

    let int = Handle::from_i64(42).unwrap();
    let big = Handle::from_u64(7).unwrap();
    let float = Handle::from_f64(0.5).unwrap();

    exc::set_string(ExcKind::RuntimeError, "unrelated");
    assert_eq!(int.extract::<i64>().unwrap(), 42);
    assert_eq!(big.extract::<u64>().unwrap(), 7);
    assert_eq!(float.extract::<f64>().unwrap(), 0.5);
    assert!(exc::matches(ExcKind::RuntimeError));
    exc::clear();
}

#[test]
fn test_extract_failure_values() {
    let _gil = setup();

    // The runtime's failure values are also ordinary results
    assert_eq!(Handle::from_i64(-1).unwrap().extract::<i64>().unwrap(), -1);
    assert_eq!(Handle::from_f64(-1.0).unwrap().extract::<f64>().unwrap(), -1.0);
    assert_eq!(
        Handle::from_u64(u64::MAX).unwrap().extract::<u64>().unwrap(),
        u64::MAX
    );
    assert!(!exc::occurred());
}
