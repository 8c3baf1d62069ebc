//! Statements: conditionals, loops, switch, try/catch/finally

use super::{error_kind, eval, eval_str, throws_error};
use jsgate::{ErrorKind, JsValue};

#[test]
fn test_if_else() {
    assert_eq!(eval("if (true) { return 1 } else { return 2 }"), JsValue::Number(1.0));
    assert_eq!(eval("if (0) return 1; else return 2"), JsValue::Number(2.0));
    assert_eq!(
        eval("let x = 5; if (x < 3) { return 'a' } else if (x < 6) { return 'b' } else { return 'c' }"),
        JsValue::from("b")
    );
    assert_eq!(eval("let r = 0; if (false) r = 1; return r"), JsValue::Number(0.0));
}

#[test]
fn test_for_loop() {
    assert_eq!(
        eval("let sum = 0; for (let i = 0; i < 5; i++) { sum += i } return sum"),
        JsValue::Number(10.0)
    );
    assert_eq!(
        eval("let n = 0; for (let i = 10; i > 0; i -= 3) n++; return n"),
        JsValue::Number(4.0)
    );
}

#[test]
fn test_for_of() {
    assert_eq!(
        eval("let sum = 0; for (const x of [1, 2, 3]) { sum += x } return sum"),
        JsValue::Number(6.0)
    );
    assert_eq!(
        eval_str("let out = ''; for (const c of 'abc') { out = c + out } return out"),
        "cba"
    );
}

#[test]
fn test_for_of_binds_fresh_variable_per_iteration() {
    assert_eq!(
        eval_str("let fs = []; for (const x of [1, 2, 3]) { fs.push(() => x) } return fs.map(f => f()).join(',')"),
        "1,2,3"
    );
}

#[test]
fn test_for_in() {
    assert_eq!(
        eval_str("let keys = []; for (const k in {a: 1, b: 2}) { keys.push(k) } return keys.join(',')"),
        "a,b"
    );
    assert_eq!(
        eval_str("let keys = []; for (let k in [5, 6]) keys.push(k); return keys.join(',')"),
        "0,1"
    );
}

#[test]
fn test_while_and_do_while() {
    assert_eq!(eval("let i = 0; while (i < 4) i++; return i"), JsValue::Number(4.0));
    assert_eq!(eval("let i = 10; do { i++ } while (i < 5); return i"), JsValue::Number(11.0));
    assert_eq!(eval("let i = 0; do { i += 2 } while (i < 5); return i"), JsValue::Number(6.0));
}

#[test]
fn test_break_and_continue() {
    assert_eq!(
        eval("let i = 0; while (true) { i++; if (i > 2) break } return i"),
        JsValue::Number(3.0)
    );
    assert_eq!(
        eval("let s = 0; for (let i = 0; i < 6; i++) { if (i % 2) continue; s += i } return s"),
        JsValue::Number(6.0)
    );
    assert_eq!(
        eval("let n = 0; for (const a of [1, 2]) { for (const b of [1, 2, 3]) { if (b == 2) break; n++ } } return n"),
        JsValue::Number(2.0)
    );
}

#[test]
fn test_return_from_inside_loop() {
    assert_eq!(
        eval("for (const x of [3, 4, 5]) { if (x > 3) return x } return 0"),
        JsValue::Number(4.0)
    );
}

#[test]
fn test_illegal_break_and_continue() {
    assert_eq!(error_kind("break"), Some(ErrorKind::Sandbox));
    assert_eq!(error_kind("if (true) { continue }"), Some(ErrorKind::Sandbox));
    assert!(throws_error("const f = () => { break }; f()", "Illegal break statement"));
}

#[test]
fn test_switch() {
    let src = "
        function pick(x) {
            switch (x) {
                case 1:
                    return 'one'
                case 2:
                case 3:
                    return 'few'
                default:
                    return 'many'
            }
        }
        return [pick(1), pick(2), pick(3), pick(9)].join(',')
    ";
    assert_eq!(eval_str(src), "one,few,few,many");
}

#[test]
fn test_switch_falls_through_until_break() {
    assert_eq!(
        eval_str("let out = ''; switch (1) { case 1: out += 'a'; case 2: out += 'b'; break; case 3: out += 'c' } return out"),
        "ab"
    );
    assert_eq!(
        eval_str("let out = 'x'; switch (5) { case 1: out = 'a' } return out"),
        "x"
    );
}

#[test]
fn test_switch_uses_strict_equality() {
    assert_eq!(
        eval_str("switch ('1') { case 1: return 'number'; default: return 'string' }"),
        "string"
    );
}

#[test]
fn test_continue_inside_switch_inside_loop() {
    assert_eq!(
        eval("let n = 0; for (let i = 0; i < 4; i++) { switch (i) { case 1: continue } n++ } return n"),
        JsValue::Number(3.0)
    );
}

#[test]
fn test_try_catch() {
    assert_eq!(eval_str("try { throw 'boom' } catch (e) { return e }"), "boom");
    assert_eq!(
        eval_str("try { undefinedThing() } catch (e) { return e.message }"),
        "undefinedThing is not defined"
    );
    assert_eq!(
        eval_str("try { throw new TypeError('bad') } catch (e) { return e.name + ': ' + e.message }"),
        "TypeError: bad"
    );
    assert_eq!(eval_str("try { throw 1 } catch { return 'no binding' }"), "no binding");
}

#[test]
fn test_finally_runs() {
    assert_eq!(
        eval("let n = 0; try { n = 1 } finally { n += 10 } return n"),
        JsValue::Number(11.0)
    );
    assert_eq!(
        eval("let n = 0; try { throw 1 } catch (e) { n = 2 } finally { n *= 3 } return n"),
        JsValue::Number(6.0)
    );
}

#[test]
fn test_finally_return_wins() {
    assert_eq!(
        eval_str("function f() { try { return 'try' } finally { return 'finally' } } return f()"),
        "finally"
    );
    assert_eq!(
        eval_str("function f() { try { throw 1 } finally { return 'recovered' } } return f()"),
        "recovered"
    );
}

#[test]
fn test_uncaught_throw_reaches_host() {
    let err = super::eval_result("throw 'boom'").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Thrown);
    assert_eq!(err.thrown_value(), Some(&JsValue::from("boom")));
    assert_eq!(err.to_string(), "Uncaught boom");
}

#[test]
fn test_block_scoping() {
    assert_eq!(eval("let x = 1; { let x = 2 } return x"), JsValue::Number(1.0));
    assert_eq!(eval("var y = 1; if (true) { var y = 2 } return y"), JsValue::Number(2.0));
    assert_eq!(
        error_kind("if (true) { let z = 1 } return z"),
        Some(ErrorKind::Reference)
    );
}

#[test]
fn test_redeclaration() {
    assert!(throws_error("let a = 1; let a = 2", "Identifier 'a' has already been declared"));
    assert_eq!(eval("var a = 1; var a = 2; return a"), JsValue::Number(2.0));
}

#[test]
fn test_const_assignment() {
    assert!(throws_error("const l = 1; return l = 2", "Assignment to constant variable."));
    assert_eq!(error_kind("const c = 1; c++"), Some(ErrorKind::Type));
}

#[test]
fn test_loop_quota() {
    let config = jsgate::SandboxConfig {
        execution_quota: Some(500),
        ..jsgate::SandboxConfig::safe()
    };
    let sandbox = super::sandbox_with(config);
    let err = sandbox.eval("while (true) {}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
    let err = sandbox.eval("try { while (true) {} } catch (e) { return 'caught' }").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
    assert_eq!(sandbox.eval("return 1 + 1").unwrap(), JsValue::Number(2.0));
}
