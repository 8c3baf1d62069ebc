//! Operators, precedence, literals and bindings

use super::{error_kind, eval, eval_str, sandbox};
use jsgate::{ErrorKind, JsValue, ScopeArg};

#[test]
fn test_arithmetic() {
    assert_eq!(eval("return 1 + 2"), JsValue::Number(3.0));
    assert_eq!(eval("return 10 - 4"), JsValue::Number(6.0));
    assert_eq!(eval("return 3 * 4"), JsValue::Number(12.0));
    assert_eq!(eval("return 15 / 3"), JsValue::Number(5.0));
    assert_eq!(eval("return 2 ** 3"), JsValue::Number(8.0));
    assert_eq!(eval("return 7 % 3"), JsValue::Number(1.0));
}

#[test]
fn test_precedence() {
    assert_eq!(eval("return 1 * 2 + 3 * (4 + 5) * 6"), JsValue::Number(164.0));
    assert_eq!(eval("return 1 + 2 * 3"), JsValue::Number(7.0));
    assert_eq!(eval("return (1 + 2) * 3"), JsValue::Number(9.0));
    assert_eq!(eval("return 10 - 2 - 3"), JsValue::Number(5.0));
    assert_eq!(eval("return 2 ** 3 ** 2"), JsValue::Number(512.0));
    assert_eq!(
        eval("return 1+2*4/5-6+7/8 % 9+10-11-12/13*14"),
        JsValue::Number(-16.448076923076925)
    );
}

#[test]
fn test_host_variables() {
    let sandbox = sandbox();
    let program = sandbox
        .compile("return (test2 * (2 + 3 * (4 + 5))) * 6")
        .unwrap();
    let ret = program
        .execute(&[ScopeArg::vars([("test2", JsValue::Number(1.0))])])
        .unwrap();
    assert_eq!(ret.result, JsValue::Number(174.0));
    assert!(ret.returned);
}

#[test]
fn test_comparison() {
    assert_eq!(eval("return 1 < 2"), JsValue::Boolean(true));
    assert_eq!(eval("return 2 >= 3"), JsValue::Boolean(false));
    assert_eq!(eval("return 1 === 1"), JsValue::Boolean(true));
    assert_eq!(eval("return 1 == '1'"), JsValue::Boolean(true));
    assert_eq!(eval("return 1 === '1'"), JsValue::Boolean(false));
    assert_eq!(eval("return null == undefined"), JsValue::Boolean(true));
    assert_eq!(eval("return null === undefined"), JsValue::Boolean(false));
    assert_eq!(eval("return NaN === NaN"), JsValue::Boolean(false));
    assert_eq!(eval("return 'a' < 'b'"), JsValue::Boolean(true));
}

#[test]
fn test_bitwise() {
    assert_eq!(eval("return 5 & 3"), JsValue::Number(1.0));
    assert_eq!(eval("return 5 | 2"), JsValue::Number(7.0));
    assert_eq!(eval("return 5 ^ 1"), JsValue::Number(4.0));
    assert_eq!(eval("return ~1"), JsValue::Number(-2.0));
    assert_eq!(eval("return 1 << 4"), JsValue::Number(16.0));
    assert_eq!(eval("return -16 >> 2"), JsValue::Number(-4.0));
    assert_eq!(eval("return -1 >>> 28"), JsValue::Number(15.0));
}

#[test]
fn test_coercion() {
    assert_eq!(eval_str("return [+!+[]]+[]"), "1");
    assert_eq!(eval("return +'1'"), JsValue::Number(1.0));
    assert_eq!(eval("return -'1'"), JsValue::Number(-1.0));
    assert_eq!(eval_str("return 1 + '2'"), "12");
    assert_eq!(eval("return '3' * '4'"), JsValue::Number(12.0));
    assert_eq!(eval("return !''"), JsValue::Boolean(true));
    assert_eq!(eval("return !!'0'"), JsValue::Boolean(true));
}

#[test]
fn test_typeof() {
    assert_eq!(eval_str("return typeof '1'"), "string");
    assert_eq!(eval_str("return typeof 1"), "number");
    assert_eq!(eval_str("return typeof undefined"), "undefined");
    assert_eq!(eval_str("return typeof null"), "object");
    assert_eq!(eval_str("return typeof {}"), "object");
    assert_eq!(eval_str("return typeof (() => 1)"), "function");
    assert_eq!(eval_str("return typeof notDeclaredAnywhere"), "undefined");
}

#[test]
fn test_logical_short_circuit() {
    assert_eq!(eval("let n = 0; false && n++; return n"), JsValue::Number(0.0));
    assert_eq!(eval("let n = 0; true || n++; return n"), JsValue::Number(0.0));
    assert_eq!(eval("let n = 0; 1 ?? n++; return n"), JsValue::Number(0.0));
    assert_eq!(eval("return null ?? 'd'"), JsValue::from("d"));
    assert_eq!(eval("return 0 || 'x'"), JsValue::from("x"));
    assert_eq!(eval("return 1 && 2"), JsValue::Number(2.0));
}

#[test]
fn test_ternary() {
    let sandbox = sandbox();
    let program = sandbox
        .compile("return test[test2] ? true : false ? 'not ok' : 'ok'")
        .unwrap();
    let test = sandbox.value_from_json(serde_json::json!([1]));
    let ret = program
        .execute(&[ScopeArg::vars([("test", test), ("test2", JsValue::Number(1.0))])])
        .unwrap();
    assert_eq!(ret.result, JsValue::from("ok"));
}

#[test]
fn test_template_literals() {
    let sandbox = sandbox();
    let program = sandbox.compile("return `test2 is ${`also ${test2}`}`").unwrap();
    let ret = program
        .execute(&[ScopeArg::vars([("test2", JsValue::Number(1.0))])])
        .unwrap();
    assert_eq!(ret.result, JsValue::from("test2 is also 1"));
    assert_eq!(eval_str("let a = 2; return `${a} + ${a} = ${a + a}`"), "2 + 2 = 4");
}

#[test]
fn test_string_literals() {
    assert_eq!(eval_str("return 'it\\'s'"), "it's");
    assert_eq!(eval_str(r#"return "a\tb""#), "a\tb");
    assert_eq!(eval_str("return '\\u0041'"), "A");
}

#[test]
fn test_number_literals() {
    assert_eq!(eval("return 0x1F"), JsValue::Number(31.0));
    assert_eq!(eval("return 0b101"), JsValue::Number(5.0));
    assert_eq!(eval("return 1_000"), JsValue::Number(1000.0));
    assert_eq!(eval("return 1.5e3"), JsValue::Number(1500.0));
    assert_eq!(eval("return .5"), JsValue::Number(0.5));
}

#[test]
fn test_declarations() {
    let sandbox = sandbox();
    let ret = sandbox.compile("var i = 1; return i + 1").unwrap().execute(&[]).unwrap();
    assert_eq!(ret.result, JsValue::Number(2.0));
    assert!(ret.returned);
    assert_eq!(eval("let j = 1; return j + 1"), JsValue::Number(2.0));
    assert_eq!(eval("const k = 1; return k + 1"), JsValue::Number(2.0));
    assert_eq!(eval("let a = 1, b = 2; return a + b"), JsValue::Number(3.0));
    assert_eq!(eval("let u; return u"), JsValue::Undefined);
}

#[test]
fn test_no_return_is_undefined() {
    let sandbox = sandbox();
    let ret = sandbox.compile("1 + 1").unwrap().execute(&[]).unwrap();
    assert_eq!(ret.result, JsValue::Undefined);
    assert!(!ret.returned);
}

#[test]
fn test_update_and_compound_assignment() {
    assert_eq!(eval("let a = 1; a++; return a"), JsValue::Number(2.0));
    assert_eq!(eval("let a = 1; return a++"), JsValue::Number(1.0));
    assert_eq!(eval("let a = 1; return ++a"), JsValue::Number(2.0));
    assert_eq!(eval("let a = 1; a--; return a"), JsValue::Number(0.0));
    assert_eq!(eval("let a = 1; a += 2; return a"), JsValue::Number(3.0));
    assert_eq!(eval("let a = 5; a -= 2; return a"), JsValue::Number(3.0));
    assert_eq!(eval("let a = 3; a *= 2; return a"), JsValue::Number(6.0));
    assert_eq!(eval("let a = 6; a /= 2; return a"), JsValue::Number(3.0));
    assert_eq!(eval("let a = 7; a %= 4; return a"), JsValue::Number(3.0));
    assert_eq!(eval("let a = 2; a **= 3; return a"), JsValue::Number(8.0));
    assert_eq!(eval("let a = 1; a <<= 3; return a"), JsValue::Number(8.0));
    assert_eq!(eval("let a = 3; a &= 1; return a"), JsValue::Number(1.0));
    assert_eq!(eval("let a = 1; a |= 2; return a"), JsValue::Number(3.0));
    assert_eq!(eval("let a = 1; a ^= 3; return a"), JsValue::Number(2.0));
    assert_eq!(eval("let a = null; a ??= 4; return a"), JsValue::Number(4.0));
    assert_eq!(eval("let a = 0; a ||= 5; return a"), JsValue::Number(5.0));
    assert_eq!(eval("let a = 1; a &&= 6; return a"), JsValue::Number(6.0));
}

#[test]
fn test_comma_sequence() {
    assert_eq!(eval("let a = 0, b = 0; a = 1, b = 2; return a + b"), JsValue::Number(3.0));
}

#[test]
fn test_in_and_instanceof() {
    assert_eq!(eval("return 'a' in {a: 1}"), JsValue::Boolean(true));
    assert_eq!(eval("return 'b' in {a: 1}"), JsValue::Boolean(false));
    assert_eq!(eval("return {} instanceof Object"), JsValue::Boolean(true));
    assert_eq!(eval("return [] instanceof Array"), JsValue::Boolean(true));
    assert_eq!(eval("return 1 instanceof Number"), JsValue::Boolean(false));
}

#[test]
fn test_spread() {
    assert_eq!(
        eval_str("return JSON.stringify([1, ...[2, [3, 4]], 5])"),
        "[1,2,[3,4],5]"
    );
    assert_eq!(
        eval_str("return JSON.stringify({a: 1, ...{b: 2, c: {d: 3}}, e: 5})"),
        r#"{"a":1,"b":2,"c":{"d":3},"e":5}"#
    );
    assert_eq!(eval("return Math.max(...[1, 5, 3])"), JsValue::Number(5.0));
}

#[test]
fn test_comments_are_ignored() {
    assert_eq!(
        eval("// leading\nlet a = 1; /* block\n comment */ return a + 1 // trailing"),
        JsValue::Number(2.0)
    );
}

#[test]
fn test_newlines_end_statements() {
    assert_eq!(eval("let a = 1\nlet b = 2\nreturn a + b"), JsValue::Number(3.0));
}

#[test]
fn test_optional_chaining() {
    assert_eq!(eval("let o = null; return o?.a"), JsValue::Undefined);
    assert_eq!(eval("let o = {a: {b: 2}}; return o?.a?.b"), JsValue::Number(2.0));
    assert_eq!(eval("let o = {}; return o.f?.()"), JsValue::Undefined);
    assert_eq!(eval("let a = null; return a?.[0]"), JsValue::Undefined);
}

#[test]
fn test_optional_chain_short_circuits_the_rest() {
    assert_eq!(eval("let a = null; return a?.b.c"), JsValue::Undefined);
    assert_eq!(eval("let a = undefined; return a?.b.c.d"), JsValue::Undefined);
    assert_eq!(eval("let a = null; return a?.b()"), JsValue::Undefined);
    assert_eq!(eval("let a = null; return a?.b().c[0]"), JsValue::Undefined);
    assert_eq!(eval("let o = {}; return o.f?.().g"), JsValue::Undefined);
    assert_eq!(
        eval("let n = 0; let a = null; a?.b(n++).c; return n"),
        JsValue::Number(0.0)
    );
    assert_eq!(eval("let a = {b: {c: 3}}; return a?.b.c"), JsValue::Number(3.0));
}

#[test]
fn test_parentheses_end_an_optional_chain() {
    assert_eq!(error_kind("let a = null; return (a?.b).c"), Some(ErrorKind::Type));
    assert_eq!(error_kind("let a = {}; return a.b.c"), Some(ErrorKind::Type));
}

#[test]
fn test_division_after_postfix_update() {
    assert_eq!(eval("let i = 4; let r = i++ / 2; return r"), JsValue::Number(2.0));
    assert_eq!(eval("let i = 4; return i-- / 2 / 1"), JsValue::Number(2.0));
    assert_eq!(eval("let i = 1; i++ / 2; return i"), JsValue::Number(2.0));
}

#[test]
fn test_object_literals() {
    assert_eq!(eval("let o = {'a-b': 1}; return o['a-b']"), JsValue::Number(1.0));
    assert_eq!(eval("let k = 'x'; let o = {[k]: 2}; return o.x"), JsValue::Number(2.0));
    assert_eq!(eval("let a = 3; let o = {a}; return o.a"), JsValue::Number(3.0));
    assert_eq!(eval("let o = {m() { return 4 }}; return o.m()"), JsValue::Number(4.0));
}

#[test]
fn test_delete() {
    assert_eq!(eval("let o = {a: 1}; delete o.a; return 'a' in o"), JsValue::Boolean(false));
    assert_eq!(eval("let o = {a: 1}; return delete o.a"), JsValue::Boolean(true));
}

#[test]
fn test_void() {
    assert_eq!(eval("return void 1"), JsValue::Undefined);
}
