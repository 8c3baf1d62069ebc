//! Timers on the host-driven virtual clock

use super::sandbox_with;
use jsgate::{ErrorKind, JsValue, Sandbox, SandboxConfig, ScopeArg};
use serde_json::json;

fn timer_sandbox() -> Sandbox {
    let mut config = SandboxConfig::safe();
    for name in ["setTimeout", "setInterval", "clearTimeout", "clearInterval"] {
        config.globals.push(name.to_string());
    }
    sandbox_with(config)
}

/// Run `source` with a fresh `log` array in scope and hand the array back
fn run_with_log(sandbox: &Sandbox, source: &str) -> JsValue {
    let log = sandbox.value_from_json(json!([]));
    sandbox
        .compile(source)
        .unwrap()
        .execute(&[ScopeArg::vars([("log", log.clone())])])
        .unwrap();
    log
}

#[test]
fn test_timeout_fires_when_clock_reaches_it() {
    let sandbox = timer_sandbox();
    let log = run_with_log(&sandbox, "setTimeout(() => log.push('done'), 100)");
    assert_eq!(sandbox.pending_timers(), 1);
    assert_eq!(sandbox.advance_timers(99).unwrap(), 0);
    assert_eq!(sandbox.to_json(&log).unwrap(), Some(json!([])));
    assert_eq!(sandbox.advance_timers(1).unwrap(), 1);
    assert_eq!(sandbox.to_json(&log).unwrap(), Some(json!(["done"])));
    assert_eq!(sandbox.pending_timers(), 0);
}

#[test]
fn test_timers_fire_in_due_order() {
    let sandbox = timer_sandbox();
    let log = run_with_log(
        &sandbox,
        "setTimeout(() => log.push('b'), 20); setTimeout(() => log.push('a'), 10); setTimeout(() => log.push('c'), 20)",
    );
    assert_eq!(sandbox.advance_timers(50).unwrap(), 3);
    assert_eq!(sandbox.to_json(&log).unwrap(), Some(json!(["a", "b", "c"])));
}

#[test]
fn test_extra_arguments_reach_the_callback() {
    let sandbox = timer_sandbox();
    let log = run_with_log(&sandbox, "setTimeout((a, b) => log.push(a + b), 0, 2, 3)");
    sandbox.advance_timers(0).unwrap();
    assert_eq!(sandbox.to_json(&log).unwrap(), Some(json!([5])));
}

#[test]
fn test_interval_repeats_until_cleared() {
    let sandbox = timer_sandbox();
    let log = run_with_log(
        &sandbox,
        "let n = 0; const id = setInterval(() => { n++; log.push(n); if (n == 3) clearInterval(id) }, 10)",
    );
    assert_eq!(sandbox.advance_timers(100).unwrap(), 3);
    assert_eq!(sandbox.to_json(&log).unwrap(), Some(json!([1, 2, 3])));
    assert_eq!(sandbox.pending_timers(), 0);
}

#[test]
fn test_clear_timeout() {
    let sandbox = timer_sandbox();
    let log = run_with_log(&sandbox, "const id = setTimeout(() => log.push(1), 5); clearTimeout(id)");
    assert_eq!(sandbox.pending_timers(), 0);
    assert_eq!(sandbox.advance_timers(10).unwrap(), 0);
    assert_eq!(sandbox.to_json(&log).unwrap(), Some(json!([])));
}

#[test]
fn test_string_handlers_run_inside_the_sandbox() {
    let sandbox = timer_sandbox();
    sandbox.eval("setTimeout('bypassed = 1', 1)").unwrap();
    let err = sandbox.advance_timers(1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reference);
}

#[test]
fn test_timer_functions_are_sandboxed_replacements() {
    let sandbox = timer_sandbox();
    assert_eq!(
        sandbox.eval("return typeof setTimeout").unwrap(),
        JsValue::from("function")
    );
    assert!(
        sandbox
            .eval("return setTimeout(1, 1)")
            .unwrap_err()
            .to_string()
            .contains("callback")
    );
}
