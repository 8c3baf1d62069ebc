//! Function declarations, expressions, arrows, closures and receivers

use super::{error_kind, eval, eval_str, sandbox};
use jsgate::{ErrorKind, JsValue, ScopeArg};

#[test]
fn test_function_declaration() {
    assert_eq!(eval("function add(a, b) { return a + b } return add(2, 3)"), JsValue::Number(5.0));
}

#[test]
fn test_declarations_are_hoisted() {
    assert_eq!(eval("return twice(4)\nfunction twice(x) { return x * 2 }"), JsValue::Number(8.0));
}

#[test]
fn test_function_expression() {
    assert_eq!(eval("const f = function (x) { return x + 1 }; return f(1)"), JsValue::Number(2.0));
    assert_eq!(
        eval_str("const f = function named() { return 1 }; return f.name"),
        "named"
    );
}

#[test]
fn test_arrow_functions() {
    assert_eq!(eval("const sq = x => x * x; return sq(5)"), JsValue::Number(25.0));
    assert_eq!(eval("const add = (a, b) => a + b; return add(1, 2)"), JsValue::Number(3.0));
    assert_eq!(eval("const f = () => { return 9 }; return f()"), JsValue::Number(9.0));
    assert_eq!(eval("const f = () => {}; return f()"), JsValue::Undefined);
    assert_eq!(eval("return (x => x + 1)(1)"), JsValue::Number(2.0));
}

#[test]
fn test_missing_arguments_are_undefined() {
    assert_eq!(eval("function f(a, b) { return b } return f(1)"), JsValue::Undefined);
}

#[test]
fn test_rest_parameters() {
    assert_eq!(
        eval("function f(first, ...others) { return others.length } return f(1, 2, 3)"),
        JsValue::Number(2.0)
    );
    assert_eq!(
        eval_str("const f = (...xs) => xs.join('+'); return f(1, 2, 3)"),
        "1+2+3"
    );
}

#[test]
fn test_closures() {
    let src = "
        function counter() {
            let n = 0
            return () => ++n
        }
        const c = counter()
        c()
        c()
        return c()
    ";
    assert_eq!(eval(src), JsValue::Number(3.0));
}

#[test]
fn test_closures_are_independent() {
    assert_eq!(
        eval("const make = () => { let n = 0; return () => ++n }; const a = make(); const b = make(); a(); a(); return b()"),
        JsValue::Number(1.0)
    );
}

#[test]
fn test_recursion() {
    assert_eq!(
        eval("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2) } return fib(15)"),
        JsValue::Number(610.0)
    );
}

#[test]
fn test_method_receiver() {
    assert_eq!(
        eval("const o = { v: 3, get() { return this.v } }; return o.get()"),
        JsValue::Number(3.0)
    );
    assert_eq!(
        eval("const o = { v: 3, get: function () { return this.v } }; return o.get()"),
        JsValue::Number(3.0)
    );
}

#[test]
fn test_arrow_sees_enclosing_receiver() {
    assert_eq!(
        eval("const o = { v: 5, run() { const f = () => this.v; return f() } }; return o.run()"),
        JsValue::Number(5.0)
    );
}

#[test]
fn test_call_apply_bind() {
    assert_eq!(
        eval("function f(a) { return this.v + a } return f.call({v: 1}, 2)"),
        JsValue::Number(3.0)
    );
    assert_eq!(
        eval("function f(a, b) { return this.v + a + b } return f.apply({v: 1}, [2, 3])"),
        JsValue::Number(6.0)
    );
    assert_eq!(
        eval("function f(a, b) { return this.v * a + b } const g = f.bind({v: 10}, 2); return g(1)"),
        JsValue::Number(21.0)
    );
    assert_eq!(
        eval_str("function f(a, b) {} return f.bind(null, 1).name"),
        "bound f"
    );
}

#[test]
fn test_function_properties() {
    assert_eq!(eval("function f(a, b, c) {} return f.length"), JsValue::Number(3.0));
    assert_eq!(eval_str("function f() {} return f.name"), "f");
    assert_eq!(eval_str("return typeof function () {}"), "function");
}

#[test]
fn test_constructor_functions() {
    let src = "
        function Point(x, y) {
            this.x = x
            this.y = y
        }
        const p = new Point(1, 2)
        return p.x + p.y
    ";
    assert_eq!(eval(src), JsValue::Number(3.0));
    assert_eq!(
        eval("function P() {} return new P() instanceof P"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_arrows_are_not_constructors() {
    assert_eq!(error_kind("const A = () => 1; new A()"), Some(ErrorKind::Type));
}

#[test]
fn test_calling_a_non_function() {
    assert_eq!(error_kind("const x = 1; x()"), Some(ErrorKind::Type));
    assert_eq!(error_kind("const o = {}; o.missing()"), Some(ErrorKind::Type));
}

#[test]
fn test_top_level_this_is_the_sandbox_global() {
    assert_eq!(eval_str("return typeof this"), "object");
    assert_eq!(eval("return this.Math === Math"), JsValue::Boolean(true));
}

#[test]
fn test_functions_returned_to_the_host() {
    let sandbox = sandbox();
    let f = sandbox.eval("return (a, b) => a * b").unwrap();
    let product = sandbox
        .call(&f, JsValue::Undefined, &[JsValue::Number(6.0), JsValue::Number(7.0)])
        .unwrap();
    assert_eq!(product, JsValue::Number(42.0));
}

#[test]
fn test_host_callbacks_in_scope() {
    let sandbox = sandbox();
    let program = sandbox.compile("return test[0]() + test[1]()").unwrap();
    let fns = sandbox.eval("return [() => 1, () => 2]").unwrap();
    let ret = program.execute(&[ScopeArg::vars([("test", fns)])]).unwrap();
    assert_eq!(ret.result, JsValue::Number(3.0));
}
