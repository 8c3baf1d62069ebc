//! Error objects, engine errors seen from scripts and from the host

use super::{error_kind, eval, eval_result, eval_str, sandbox};
use jsgate::{ErrorKind, JsValue};

#[test]
fn test_error_constructors() {
    assert_eq!(eval_str("return new Error('m').message"), "m");
    assert_eq!(eval_str("return new Error('m').name"), "Error");
    assert_eq!(eval_str("return new RangeError('r').name"), "RangeError");
    assert_eq!(eval_str("return Error('called').message"), "called");
    assert_eq!(eval_str("return new Error().message"), "");
}

#[test]
fn test_error_to_string() {
    assert_eq!(eval_str("return new TypeError('bad').toString()"), "TypeError: bad");
    assert_eq!(eval_str("return new Error().toString()"), "Error");
    assert_eq!(eval_str("return '' + new SyntaxError('s')"), "SyntaxError: s");
}

#[test]
fn test_error_hierarchy() {
    assert_eq!(eval("return new TypeError('x') instanceof TypeError"), JsValue::Boolean(true));
    assert_eq!(eval("return new TypeError('x') instanceof Error"), JsValue::Boolean(true));
    assert_eq!(eval("return new Error('x') instanceof TypeError"), JsValue::Boolean(false));
}

#[test]
fn test_engine_errors_become_error_objects() {
    assert_eq!(
        eval_str("try { null.x } catch (e) { return e.name }"),
        "TypeError"
    );
    assert_eq!(
        eval("try { missing } catch (e) { return e instanceof ReferenceError }"),
        JsValue::Boolean(true)
    );
    assert_eq!(
        eval_str("try { new Array(-1) } catch (e) { return e.message }"),
        "Invalid array length"
    );
    assert_eq!(
        eval_str("try { JSON.parse('{') } catch (e) { return e.name }"),
        "SyntaxError"
    );
}

#[test]
fn test_throwing_any_value() {
    assert_eq!(eval("try { throw 42 } catch (e) { return e }"), JsValue::Number(42.0));
    assert_eq!(
        eval("const o = {code: 7}; try { throw o } catch (e) { return e.code }"),
        JsValue::Number(7.0)
    );
}

#[test]
fn test_rethrow() {
    assert_eq!(
        eval_str("try { try { throw 'inner' } catch (e) { throw e + '!' } } catch (e) { return e }"),
        "inner!"
    );
}

#[test]
fn test_errors_from_nested_calls() {
    let src = "
        function a() { b() }
        function b() { throw new RangeError('deep') }
        try { a() } catch (e) { return e.name + ':' + e.message }
    ";
    assert_eq!(eval_str(src), "RangeError:deep");
}

#[test]
fn test_host_sees_error_kinds() {
    assert_eq!(error_kind("undefinedVar"), Some(ErrorKind::Reference));
    assert_eq!(error_kind("null.x"), Some(ErrorKind::Type));
    assert_eq!(error_kind("throw new Error('x')"), Some(ErrorKind::Thrown));
    let err = eval_result("throw new TypeError('wrapped')").unwrap_err();
    assert_eq!(err.to_string(), "Uncaught TypeError: wrapped");
}

#[test]
fn test_parse_errors() {
    let sandbox = sandbox();
    let err = sandbox.compile("let = ;").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(sandbox.compile("return (1 + ").is_err());
    assert!(sandbox.compile("'unterminated").is_err());
    assert!(sandbox.compile("let [a, b] = [1, 2]").is_err());
}

#[test]
fn test_error_messages_are_plain() {
    let err = eval_result("missing").unwrap_err();
    assert_eq!(err.message(), "missing is not defined");
    assert_eq!(err.to_string(), "ReferenceError: missing is not defined");
}
