//! Capability checks: escapes, read-only globals, allow-lists and switches

use super::{error_kind, eval, eval_result, eval_str, sandbox_with, throws_error};
use jsgate::{ErrorKind, JsValue, SandboxConfig, ScopeArg};

// ─── Code-evaluation escapes ───────────────────────────────────────────────────

#[test]
fn test_function_constructor_is_sandboxed() {
    assert_eq!(eval_str("return Function.name"), "SandboxFunction");
    assert_eq!(eval_str("return [].constructor.constructor.name"), "SandboxFunction");
    assert_eq!(eval_str("return [].filter.constructor('return \\'ok\\'')()"), "ok");
    assert_eq!(eval("return Function('a', 'b', 'return a + b')(1, 2)"), JsValue::Number(3.0));
    assert_eq!(eval("return new Function('return 7')()"), JsValue::Number(7.0));
}

#[test]
fn test_constructor_chain_escapes_stay_inside() {
    let escapes = [
        "[].filter.constructor('return bypassed = 1')()",
        "[].constructor.constructor('return bypassed = 1')()",
        "(() => 1).constructor('return bypassed = 1')()",
        "this.constructor.constructor('return bypassed = 1')()",
        "Function('return bypassed = 1')()",
        "eval('bypassed = 1')",
    ];
    for src in escapes {
        assert_eq!(
            error_kind(src),
            Some(ErrorKind::Reference),
            "{src} reached the host global"
        );
    }
}

#[test]
fn test_generated_code_sees_only_sandbox_globals() {
    assert_eq!(
        eval_str("return Function('return typeof setTimeout')()"),
        "undefined"
    );
    assert_eq!(eval_str("return eval('return typeof Math')"), "object");
}

#[test]
fn test_eval_runs_with_function_semantics() {
    assert_eq!(eval("return eval('return 1 + 1')"), JsValue::Number(2.0));
    assert_eq!(eval("return eval('1 + 1')"), JsValue::Undefined);
    assert_eq!(eval("return eval(5)"), JsValue::Number(5.0));
}

#[test]
fn test_global_object_identity() {
    assert_eq!(eval_str("return this.constructor.name"), "SandboxGlobal");
    assert!(throws_error("return new this.constructor()", "SandboxError"));
}

// ─── Read-only globals ─────────────────────────────────────────────────────────

#[test]
fn test_globals_cannot_be_overwritten() {
    assert!(throws_error("Math = 1", "global"));
    assert!(throws_error("Math.abs = 1", "Cannot assign property 'abs' of a global object"));
    assert!(throws_error("delete Math.abs", "Cannot delete property"));
    assert!(throws_error("JSON.parse = null", "SandboxError"));
}

#[test]
fn test_prototype_pollution_is_blocked() {
    assert!(throws_error("Object.prototype.polluted = 1", "SandboxError"));
    assert!(throws_error("Array.prototype.push = null", "SandboxError"));
    assert!(throws_error("[].constructor.prototype.x = 1", "SandboxError"));
    assert_eq!(eval_str("return typeof ({}).polluted"), "undefined");
}

#[test]
fn test_shared_prototypes_reached_indirectly_are_read_only() {
    let sandbox = super::sandbox();
    let writes = [
        "Object.getPrototypeOf([]).push = function () { return 'pwned' }",
        "Object.getPrototypeOf({}).hacked = 7",
        "Object.getPrototypeOf('').trim = null",
        "delete Object.getPrototypeOf([]).map",
        "const p = Object.getPrototypeOf(Object.getPrototypeOf([])); p.hacked = 7",
        "Object.assign(Object.getPrototypeOf({}), {hacked: 7})",
        "Object.assign(Math, {abs: null})",
    ];
    for src in writes {
        let err = sandbox.eval(src).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sandbox, "{src} modified a shared object");
    }
    assert_eq!(sandbox.eval("return [].push(1)").unwrap(), JsValue::Number(1.0));
    assert_eq!(sandbox.eval("return typeof ({}).hacked").unwrap(), JsValue::from("undefined"));
    assert_eq!(sandbox.eval("return typeof [1].map").unwrap(), JsValue::from("function"));
}

#[test]
fn test_prototype_methods_cannot_be_shadowed() {
    assert!(throws_error("[].filter = 1", "Override prototype property 'filter' not allowed"));
    assert!(throws_error("let o = {}; o.hasOwnProperty = 1", "Override prototype property"));
    assert_eq!(eval("let a = []; a.anything = 1; return a.anything"), JsValue::Number(1.0));
}

#[test]
fn test_sandbox_errors_are_not_catchable() {
    let result = eval_result("try { Math = 1 } catch (e) { return 'caught' }");
    assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::Sandbox));
    let result = eval_result("try { Math = 1 } finally { return 'swallowed' }");
    assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::Sandbox));
    assert_eq!(
        eval_str("try { null.x } catch (e) { return e.constructor.name }"),
        "TypeError"
    );
}

#[test]
fn test_host_variables_are_writable_but_globals_are_not() {
    let sandbox = super::sandbox();
    let test = sandbox.value_from_json(serde_json::json!({ "a": 1 }));
    let program = sandbox.compile("test.a = 2; return test.a").unwrap();
    let ret = program.execute(&[ScopeArg::vars([("test", test)])]).unwrap();
    assert_eq!(ret.result, JsValue::Number(2.0));

    let sandbox = jsgate::Sandbox::builder()
        .global_json("settings", serde_json::json!({ "a": 1 }))
        .build();
    let err = sandbox.eval("settings.a = 2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sandbox);
    assert_eq!(sandbox.eval("return settings.a").unwrap(), JsValue::Number(1.0));
}

// ─── Allow-lists ───────────────────────────────────────────────────────────────

fn with_whitelist(ctor: &str, members: &[&str]) -> SandboxConfig {
    let mut config = SandboxConfig::safe();
    config.prototype_whitelist.insert(
        ctor.to_string(),
        members.iter().map(|m| (*m).to_string()).collect(),
    );
    config
}

#[test]
fn test_prototype_member_allow_list() {
    let sandbox = sandbox_with(with_whitelist("Array", &["push", "join"]));
    assert_eq!(
        sandbox.eval("let a = [1]; a.push(2); return a.join('-')").unwrap(),
        JsValue::from("1-2")
    );
    let err = sandbox.eval("return [1].map(x => x)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sandbox);
    assert!(err.to_string().contains("Method or property access not permitted: Array.map"));
    assert_eq!(sandbox.eval("return [1, 2][1]").unwrap(), JsValue::Number(2.0));
    assert_eq!(sandbox.eval("return [1, 2].length").unwrap(), JsValue::Number(2.0));
}

#[test]
fn test_static_member_allow_list() {
    let sandbox = sandbox_with(with_whitelist("Object", &["keys"]));
    assert_eq!(
        sandbox.eval("return Object.keys({a: 1}).length").unwrap(),
        JsValue::Number(1.0)
    );
    let err = sandbox.eval("return Object.assign({}, {a: 1})").unwrap_err();
    assert!(err.to_string().contains("Static method or property access not permitted: Object.assign"));
}

#[test]
fn test_unlisted_prototype_is_closed() {
    let mut config = SandboxConfig::safe();
    config.prototype_whitelist.shift_remove("String");
    let sandbox = sandbox_with(config);
    assert_eq!(
        sandbox.eval("return 'abc'.toUpperCase()").unwrap_err().kind(),
        ErrorKind::Sandbox
    );
    assert_eq!(sandbox.eval("return 'abc' + 'd'").unwrap(), JsValue::from("abcd"));
}

#[test]
fn test_unlisted_global_is_undefined() {
    assert_eq!(error_kind("return setTimeout"), Some(ErrorKind::Reference));
    assert_eq!(eval_str("return typeof setInterval"), "undefined");
    let sandbox = sandbox_with(SandboxConfig::empty());
    assert_eq!(
        sandbox.eval("return Math.max(1, 2)").unwrap_err().kind(),
        ErrorKind::Reference
    );
    assert_eq!(sandbox.eval("return 1 + 1").unwrap(), JsValue::Number(2.0));
}

#[test]
fn test_construction_requires_allowed_constructor() {
    assert_eq!(eval("return new Array(3).length"), JsValue::Number(3.0));
    assert!(throws_error("return new Math.max(1)", "Object construction not allowed"));
    assert_eq!(
        eval("function P(x) { this.x = x } return new P(4).x"),
        JsValue::Number(4.0)
    );
}

// ─── Feature switches ──────────────────────────────────────────────────────────

#[test]
fn test_regex_literals_need_regexp() {
    assert!(throws_error("return /a/.test('a')", "Regex not permitted"));
    let mut config = SandboxConfig::safe();
    config.globals.push("RegExp".to_string());
    let sandbox = sandbox_with(config);
    assert_eq!(sandbox.eval("return /a/.test('a')").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_async_needs_promise_prototype() {
    let mut config = SandboxConfig::safe();
    config.prototype_whitelist.shift_remove("Promise");
    let sandbox = sandbox_with(config);
    let err = sandbox.eval("const f = async () => 1").unwrap_err();
    assert!(err.to_string().contains("Async/await not permitted"));
}

#[test]
fn test_forbid_function_creation() {
    let config = SandboxConfig {
        forbid_function_creation: true,
        ..SandboxConfig::safe()
    };
    let sandbox = sandbox_with(config);
    assert!(
        sandbox
            .eval("const f = () => 1")
            .unwrap_err()
            .to_string()
            .contains("Function creation is forbidden")
    );
    assert_eq!(sandbox.eval("return Math.max(1, 2)").unwrap(), JsValue::Number(2.0));
}

#[test]
fn test_forbid_function_calls() {
    let config = SandboxConfig {
        forbid_function_calls: true,
        ..SandboxConfig::safe()
    };
    let sandbox = sandbox_with(config);
    assert!(
        sandbox
            .eval("return Math.max(1, 2)")
            .unwrap_err()
            .to_string()
            .contains("Method calls are not allowed")
    );
    assert_eq!(sandbox.eval("return 1 + 2").unwrap(), JsValue::Number(3.0));
}

#[test]
fn test_await_outside_async_in_sync_mode() {
    assert!(throws_error(
        "return await 1",
        "Illegal use of 'await', must be inside async function"
    ));
}

#[test]
fn test_reserved_words_are_not_bindings() {
    assert!(eval_result("let while = 1").is_err());
    assert!(eval_result("var new = 1").is_err());
    assert!(eval_result("return typeof").is_err());
}
