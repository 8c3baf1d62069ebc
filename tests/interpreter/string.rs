//! String built-ins

use super::{error_kind, eval, eval_str};
use jsgate::{ErrorKind, JsValue};

#[test]
fn test_length_and_indexing() {
    assert_eq!(eval("return 'hello'.length"), JsValue::Number(5.0));
    assert_eq!(eval_str("return 'hello'[1]"), "e");
    assert_eq!(eval("return 'hi'[5]"), JsValue::Undefined);
    assert_eq!(eval("return '😀'.length"), JsValue::Number(2.0));
}

#[test]
fn test_conversion() {
    assert_eq!(eval_str("return String(12)"), "12");
    assert_eq!(eval_str("return String()"), "");
    assert_eq!(eval_str("return String(null) + String(true)"), "nulltrue");
    assert_eq!(eval_str("return typeof new String('a')"), "object");
    assert_eq!(eval_str("return String.fromCharCode(72, 105)"), "Hi");
    assert_eq!(eval_str("return 'abc'.toString() + 'd'.valueOf()"), "abcd");
}

#[test]
fn test_character_access() {
    assert_eq!(eval_str("return 'abc'.charAt(2)"), "c");
    assert_eq!(eval_str("return 'abc'.charAt(7)"), "");
    assert_eq!(eval("return 'A'.charCodeAt(0)"), JsValue::Number(65.0));
    assert_eq!(eval("return isNaN('A'.charCodeAt(3))"), JsValue::Boolean(true));
}

#[test]
fn test_search() {
    assert_eq!(eval("return 'hello hello'.indexOf('llo')"), JsValue::Number(2.0));
    assert_eq!(eval("return 'hello hello'.indexOf('llo', 3)"), JsValue::Number(8.0));
    assert_eq!(eval("return 'hello hello'.lastIndexOf('hello')"), JsValue::Number(6.0));
    assert_eq!(eval("return 'abc'.indexOf('z')"), JsValue::Number(-1.0));
    assert_eq!(eval("return 'abc'.includes('bc')"), JsValue::Boolean(true));
    assert_eq!(eval("return 'abc'.startsWith('ab')"), JsValue::Boolean(true));
    assert_eq!(eval("return 'abc'.startsWith('bc', 1)"), JsValue::Boolean(true));
    assert_eq!(eval("return 'abc'.endsWith('bc')"), JsValue::Boolean(true));
    assert_eq!(eval("return 'abc'.endsWith('ab', 2)"), JsValue::Boolean(true));
}

#[test]
fn test_extraction() {
    assert_eq!(eval_str("return 'abcdef'.slice(1, 3)"), "bc");
    assert_eq!(eval_str("return 'abcdef'.slice(-2)"), "ef");
    assert_eq!(eval_str("return 'abcdef'.substring(4, 1)"), "bcd");
    assert_eq!(eval_str("return 'abcdef'.substr(-3, 2)"), "de");
    assert_eq!(eval_str("return 'abcdef'.substr(2)"), "cdef");
}

#[test]
fn test_transformation() {
    assert_eq!(eval_str("return 'aBc'.toUpperCase()"), "ABC");
    assert_eq!(eval_str("return 'aBc'.toLowerCase()"), "abc");
    assert_eq!(eval_str("return '  x  '.trim()"), "x");
    assert_eq!(eval_str("return '  x  '.trimStart() + '|'"), "x  |");
    assert_eq!(eval_str("return '|' + '  x  '.trimEnd()"), "|  x");
    assert_eq!(eval_str("return 'ab'.repeat(3)"), "ababab");
    assert_eq!(eval_str("return '5'.padStart(3, '0')"), "005");
    assert_eq!(eval_str("return 'ab'.padEnd(5, 'xy')"), "abxyx");
    assert_eq!(eval_str("return 'abc'.padStart(2)"), "abc");
    assert_eq!(eval_str("return 'a'.concat('b', 1)"), "ab1");
}

#[test]
fn test_repeat_rejects_negative_counts() {
    assert_eq!(error_kind("return 'a'.repeat(-1)"), Some(ErrorKind::Range));
}

#[test]
fn test_split() {
    assert_eq!(eval_str("return 'a,b,c'.split(',').join('|')"), "a|b|c");
    assert_eq!(eval_str("return 'a,b,c'.split(',', 2).join('|')"), "a|b");
    assert_eq!(eval_str("return 'abc'.split('').join('|')"), "a|b|c");
    assert_eq!(eval("return 'abc'.split().length"), JsValue::Number(1.0));
}

#[test]
fn test_replace_with_strings() {
    assert_eq!(eval_str("return 'a-b-c'.replace('-', '+')"), "a+b-c");
    assert_eq!(eval_str("return 'abc'.replace('b', '[$&]')"), "a[b]c");
    assert_eq!(eval_str("return 'abc'.replace('b', s => s.toUpperCase())"), "aBc");
    assert_eq!(eval_str("return 'abc'.replace('z', 'y')"), "abc");
}

#[test]
fn test_methods_on_null_receiver() {
    assert_eq!(
        error_kind("return String.prototype.trim.call(null)"),
        Some(ErrorKind::Type)
    );
}
