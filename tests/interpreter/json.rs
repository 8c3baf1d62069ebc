//! JSON.stringify / JSON.parse and host value conversion

use super::{error_kind, eval, eval_str, sandbox};
use jsgate::{ErrorKind, JsValue};
use serde_json::json;

#[test]
fn test_stringify_primitives() {
    assert_eq!(eval_str("return JSON.stringify(1)"), "1");
    assert_eq!(eval_str("return JSON.stringify(1.5)"), "1.5");
    assert_eq!(eval_str("return JSON.stringify('a\"b')"), r#""a\"b""#);
    assert_eq!(eval_str("return JSON.stringify(null)"), "null");
    assert_eq!(eval_str("return JSON.stringify(NaN)"), "null");
    assert_eq!(eval("return JSON.stringify(undefined)"), JsValue::Undefined);
}

#[test]
fn test_stringify_leaves_out_undefined_and_functions() {
    assert_eq!(
        eval_str("return JSON.stringify({a: undefined, b: () => 1, c: 1})"),
        r#"{"c":1}"#
    );
    assert_eq!(
        eval_str("return JSON.stringify([undefined, () => 1])"),
        "[null,null]"
    );
}

#[test]
fn test_stringify_keeps_insertion_order() {
    assert_eq!(
        eval_str("const o = {z: 1}; o.a = 2; o.m = 3; return JSON.stringify(o)"),
        r#"{"z":1,"a":2,"m":3}"#
    );
}

#[test]
fn test_stringify_replacers() {
    assert_eq!(
        eval_str("return JSON.stringify({a: 1, b: 2}, ['b'])"),
        r#"{"b":2}"#
    );
    assert_eq!(
        eval_str("return JSON.stringify({a: 1, b: 'x'}, (k, v) => typeof v === 'number' ? v * 10 : v)"),
        r#"{"a":10,"b":"x"}"#
    );
}

#[test]
fn test_stringify_indent() {
    assert_eq!(
        eval_str("return JSON.stringify({a: [1]}, null, 2)"),
        "{\n  \"a\": [\n    1\n  ]\n}"
    );
}

#[test]
fn test_stringify_rejects_cycles() {
    assert_eq!(
        error_kind("const o = {}; o.self = o; return JSON.stringify(o)"),
        Some(ErrorKind::Type)
    );
}

#[test]
fn test_parse() {
    assert_eq!(eval("return JSON.parse('{\"a\": [1, 2]}').a[1]"), JsValue::Number(2.0));
    assert_eq!(eval("return JSON.parse('true')"), JsValue::Boolean(true));
    assert_eq!(eval_str("return JSON.parse('\"s\"')"), "s");
    assert_eq!(error_kind("return JSON.parse('{bad')"), Some(ErrorKind::Syntax));
}

#[test]
fn test_parse_reviver() {
    assert_eq!(
        eval("return JSON.parse('{\"a\": 1, \"b\": 2}', (k, v) => k === 'a' ? undefined : v).a"),
        JsValue::Undefined
    );
    assert_eq!(
        eval("return JSON.parse('[1, 2]', (k, v) => typeof v === 'number' ? v + 1 : v)[0]"),
        JsValue::Number(2.0)
    );
}

#[test]
fn test_parse_then_stringify() {
    assert_eq!(
        eval_str(r#"return JSON.stringify(JSON.parse('{"x":{"y":[true,null]}}'))"#),
        r#"{"x":{"y":[true,null]}}"#
    );
}

#[test]
fn test_host_json_conversion() {
    let sandbox = sandbox();
    let value = sandbox.value_from_json(json!({"list": [1, "two", null], "flag": true}));
    let program = sandbox.compile("return input.list.length").unwrap();
    let ret = program
        .execute(&[jsgate::ScopeArg::vars([("input", value)])])
        .unwrap();
    assert_eq!(ret.result, JsValue::Number(3.0));

    let out = sandbox.eval("return {n: 1, s: 'x', a: [true], u: undefined}").unwrap();
    assert_eq!(
        sandbox.to_json(&out).unwrap(),
        Some(json!({"n": 1, "s": "x", "a": [true]}))
    );
    assert_eq!(sandbox.to_json(&JsValue::Undefined).unwrap(), None);
}
