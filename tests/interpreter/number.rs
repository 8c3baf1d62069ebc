//! Number built-ins and the numeric global functions

use super::{error_kind, eval, eval_str};
use jsgate::{ErrorKind, JsValue};

#[test]
fn test_constants() {
    assert_eq!(eval("return Number.MAX_SAFE_INTEGER"), JsValue::Number(9_007_199_254_740_991.0));
    assert_eq!(eval("return Number.MIN_SAFE_INTEGER"), JsValue::Number(-9_007_199_254_740_991.0));
    assert_eq!(eval("return Number.EPSILON"), JsValue::Number(f64::EPSILON));
    assert_eq!(eval("return Number.POSITIVE_INFINITY"), JsValue::Number(f64::INFINITY));
    assert_eq!(eval("return isNaN(Number.NaN)"), JsValue::Boolean(true));
}

#[test]
fn test_conversion() {
    assert_eq!(eval("return Number('12')"), JsValue::Number(12.0));
    assert_eq!(eval("return Number(true)"), JsValue::Number(1.0));
    assert_eq!(eval("return Number()"), JsValue::Number(0.0));
    assert_eq!(eval("return isNaN(Number('abc'))"), JsValue::Boolean(true));
    assert_eq!(eval_str("return typeof new Number(1)"), "object");
}

#[test]
fn test_predicates() {
    assert_eq!(eval("return Number.isInteger(5)"), JsValue::Boolean(true));
    assert_eq!(eval("return Number.isInteger(5.5)"), JsValue::Boolean(false));
    assert_eq!(eval("return Number.isInteger('5')"), JsValue::Boolean(false));
    assert_eq!(eval("return Number.isSafeInteger(2 ** 53)"), JsValue::Boolean(false));
    assert_eq!(eval("return Number.isFinite(Infinity)"), JsValue::Boolean(false));
    assert_eq!(eval("return Number.isFinite('1')"), JsValue::Boolean(false));
    assert_eq!(eval("return Number.isNaN('x')"), JsValue::Boolean(false));
    assert_eq!(eval("return isNaN('x')"), JsValue::Boolean(true));
    assert_eq!(eval("return isFinite('1')"), JsValue::Boolean(true));
}

#[test]
fn test_parse_int() {
    assert_eq!(eval("return parseInt('42px')"), JsValue::Number(42.0));
    assert_eq!(eval("return parseInt('  -7')"), JsValue::Number(-7.0));
    assert_eq!(eval("return parseInt('ff', 16)"), JsValue::Number(255.0));
    assert_eq!(eval("return parseInt('0x1A')"), JsValue::Number(26.0));
    assert_eq!(eval("return parseInt('101', 2)"), JsValue::Number(5.0));
    assert_eq!(eval("return isNaN(parseInt('px'))"), JsValue::Boolean(true));
    assert_eq!(eval("return Number.parseInt('9')"), JsValue::Number(9.0));
}

#[test]
fn test_parse_float() {
    assert_eq!(eval("return parseFloat('3.5abc')"), JsValue::Number(3.5));
    assert_eq!(eval("return parseFloat('.25')"), JsValue::Number(0.25));
    assert_eq!(eval("return isNaN(parseFloat('abc'))"), JsValue::Boolean(true));
}

#[test]
fn test_to_fixed() {
    assert_eq!(eval_str("return (3.14159).toFixed(2)"), "3.14");
    assert_eq!(eval_str("return (2).toFixed()"), "2");
    assert_eq!(eval_str("return (1.5).toFixed(3)"), "1.500");
    assert_eq!(error_kind("return (1).toFixed(101)"), Some(ErrorKind::Range));
}

#[test]
fn test_to_string_radix() {
    assert_eq!(eval_str("return (255).toString(16)"), "ff");
    assert_eq!(eval_str("return (5).toString(2)"), "101");
    assert_eq!(eval_str("return (42).toString()"), "42");
    assert_eq!(error_kind("return (1).toString(1)"), Some(ErrorKind::Range));
}

#[test]
fn test_number_formatting() {
    assert_eq!(eval_str("return 0.1 + 0.2"), "0.30000000000000004");
    assert_eq!(eval_str("return 1 / 0"), "Infinity");
    assert_eq!(eval_str("return -1 / 0"), "-Infinity");
    assert_eq!(eval_str("return 1e21"), "1e+21");
    assert_eq!(eval_str("return 100"), "100");
    assert_eq!(eval_str("return -0"), "0");
}
