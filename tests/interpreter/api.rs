//! The host-facing surface: builder, scopes, audit and subscriptions

use std::cell::RefCell;
use std::rc::Rc;

use super::{sandbox, sandbox_with};
use jsgate::platform::{ConsoleLevel, ConsoleProvider, NoOpTimeProvider, StdRandomProvider};
use jsgate::{Change, ErrorKind, Exec, JsValue, PropertyKey, Sandbox, SandboxConfig, ScopeArg};
use serde_json::json;

#[derive(Default)]
struct CapturingConsole {
    lines: RefCell<Vec<(ConsoleLevel, String)>>,
}

impl ConsoleProvider for CapturingConsole {
    fn write(&self, level: ConsoleLevel, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}

/// Run `source` once with `name` bound to `value`
fn run_with(sandbox: &Sandbox, source: &str, name: &str, value: &JsValue) -> JsValue {
    sandbox
        .compile(source)
        .unwrap()
        .execute(&[ScopeArg::vars([(name, value.clone())])])
        .unwrap()
        .result
}

// ─── Builder ───────────────────────────────────────────────────────────────

#[test]
fn test_builder_host_globals() {
    let sandbox = Sandbox::builder()
        .global("factor", JsValue::Number(2.0))
        .global_json("settings", json!({"limit": 3, "tags": ["a", "b"]}))
        .global_function("countArgs", 0, |_exec: &Exec, _this: JsValue, args: &[JsValue]| {
            Ok(JsValue::Number(args.len() as f64))
        })
        .build();
    assert_eq!(sandbox.eval("return factor * 21").unwrap(), JsValue::Number(42.0));
    assert_eq!(
        sandbox.eval("return settings.limit + settings.tags.length").unwrap(),
        JsValue::Number(5.0)
    );
    assert_eq!(sandbox.eval("return countArgs(1, 'x', null)").unwrap(), JsValue::Number(3.0));
}

#[test]
fn test_host_globals_are_read_only() {
    let sandbox = Sandbox::builder()
        .global_json("settings", json!({"limit": 3}))
        .build();
    assert_eq!(
        sandbox.eval("settings = {}").unwrap_err().kind(),
        ErrorKind::Sandbox
    );
    assert_eq!(
        sandbox.eval("settings.limit = 4").unwrap_err().kind(),
        ErrorKind::Sandbox
    );
    assert_eq!(sandbox.eval("return settings.limit").unwrap(), JsValue::Number(3.0));
}

#[test]
fn test_console_goes_to_the_provider() {
    let console = Rc::new(CapturingConsole::default());
    let sandbox = Sandbox::builder()
        .console(console.clone())
        .random(Box::new(StdRandomProvider::with_seed(1)))
        .time(Box::new(NoOpTimeProvider))
        .build();
    sandbox.eval("console.log('a', 1, true); console.warn('careful')").unwrap();
    let lines = console.lines.borrow();
    assert_eq!(
        *lines,
        vec![
            (ConsoleLevel::Log, "a 1 true".to_string()),
            (ConsoleLevel::Warn, "careful".to_string()),
        ]
    );
}

#[test]
fn test_prototype_replacement() {
    let sandbox = Sandbox::builder()
        .prototype_replacement("Array", |_value: &JsValue, _is_static: bool| JsValue::from("swapped"))
        .build();
    assert_eq!(sandbox.eval("return typeof [1, 2].map").unwrap(), JsValue::from("undefined"));
    assert_eq!(sandbox.eval("return typeof [1, 2].concat").unwrap(), JsValue::from("function"));
    assert_eq!(sandbox.eval("return [1, 2][1]").unwrap(), JsValue::Number(2.0));
}

#[test]
fn test_config_from_json() {
    let config = SandboxConfig::from_json(
        r#"{"globals": ["Math"], "prototypeWhitelist": {"Number": []}, "executionQuota": 1000}"#,
    )
    .unwrap();
    assert_eq!(config.execution_quota, Some(1000));
    let sandbox = sandbox_with(config);
    assert_eq!(sandbox.eval("return Math.abs(-2)").unwrap(), JsValue::Number(2.0));
    assert_eq!(sandbox.eval("return JSON").unwrap_err().kind(), ErrorKind::Reference);
    assert_eq!(
        sandbox.eval("while (true) {}").unwrap_err().kind(),
        ErrorKind::QuotaExceeded
    );
}

#[test]
fn test_unknown_config_names_are_ignored() {
    let mut config = SandboxConfig::safe();
    config.globals.push("NoSuchGlobal".to_string());
    config.prototype_whitelist.insert("NoSuchCtor".to_string(), Vec::new());
    let sandbox = sandbox_with(config);
    assert_eq!(sandbox.eval("return 1 + 1").unwrap(), JsValue::Number(2.0));
}

// ─── Programs and scopes ───────────────────────────────────────────────────

#[test]
fn test_program_runs_repeatedly() {
    let sandbox = sandbox();
    let program = sandbox.compile("let total = 0; for (const n of items) total += n; return total").unwrap();
    assert!(!program.tree().is_empty());
    for (items, expected) in [(json!([1, 2]), 3.0), (json!([10, 20, 30]), 60.0)] {
        let items = sandbox.value_from_json(items);
        let ret = program.execute(&[ScopeArg::vars([("items", items)])]).unwrap();
        assert_eq!(ret.result, JsValue::Number(expected));
        assert!(ret.returned);
    }
}

#[test]
fn test_persistent_scope_keeps_bindings() {
    let sandbox = sandbox();
    let scope = sandbox.new_scope([("count", JsValue::Number(0.0))]);
    let program = sandbox.compile("count = count + 1; return count").unwrap();
    program.execute(&[ScopeArg::from(scope.clone())]).unwrap();
    let ret = program.execute(&[ScopeArg::from(scope.clone())]).unwrap();
    assert_eq!(ret.result, JsValue::Number(2.0));
    assert_eq!(scope.lookup("count"), Some(JsValue::Number(2.0)));
}

#[test]
fn test_later_vars_shadow_earlier_ones() {
    let sandbox = sandbox();
    let program = sandbox.compile("return a + b").unwrap();
    let ret = program
        .execute(&[
            ScopeArg::vars([("a", JsValue::Number(1.0)), ("b", JsValue::Number(2.0))]),
            ScopeArg::vars([("b", JsValue::Number(40.0))]),
        ])
        .unwrap();
    assert_eq!(ret.result, JsValue::Number(41.0));
}

#[test]
fn test_top_level_declarations_do_not_leak_between_runs() {
    let sandbox = sandbox();
    sandbox.eval("const leaked = 1").unwrap();
    assert_eq!(
        sandbox.eval("return typeof leaked").unwrap(),
        JsValue::from("undefined")
    );
}

// ─── Audit ─────────────────────────────────────────────────────────────────

#[test]
fn test_audit_reports_globals_and_members() {
    let sandbox = sandbox();
    let ret = sandbox
        .audit("return [3, 1].map(x => x * 2).join() + Math.max(1, 2) + 'a'.toUpperCase()")
        .unwrap();
    assert_eq!(ret.result, JsValue::from("6,22A"));
    let report = ret.audit.unwrap();
    assert!(report.globals_access.contains("Math"));
    let array = &report.prototype_access["Array"];
    assert!(array.contains("map"));
    assert!(array.contains("join"));
    assert!(report.prototype_access["String"].contains("toUpperCase"));
}

#[test]
fn test_audit_sees_globals_outside_the_config() {
    let sandbox = sandbox_with(SandboxConfig::empty());
    assert!(sandbox.eval("return Math.PI").is_err());
    let ret = sandbox.audit("return typeof setTimeout").unwrap();
    assert_eq!(ret.result, JsValue::from("function"));
    assert!(ret.audit.unwrap().globals_access.contains("setTimeout"));
}

#[test]
fn test_audit_flag_on_normal_runs() {
    let mut config = SandboxConfig::safe();
    config.audit = true;
    let ret = sandbox_with(config).compile("return JSON.stringify([])").unwrap().execute(&[]).unwrap();
    assert!(ret.audit.unwrap().globals_access.contains("JSON"));
    let ret = sandbox().compile("return 1").unwrap().execute(&[]).unwrap();
    assert_eq!(ret.audit, None);
}

// ─── Subscriptions ─────────────────────────────────────────────────────────

#[test]
fn test_get_subscription_sees_reads() {
    let sandbox = sandbox();
    let data = sandbox.value_from_json(json!({"a": 1, "b": 2}));
    let object = data.as_object().unwrap().clone();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let watched = object.clone();
    let subscription = sandbox.subscribe_get(move |obj, key| {
        if obj.ptr_eq(&watched) {
            sink.borrow_mut().push(key.to_string());
        }
    });
    assert_eq!(run_with(&sandbox, "return data.a + data.b", "data", &data), JsValue::Number(3.0));
    assert_eq!(*seen.borrow(), vec!["a".to_string(), "b".to_string()]);

    subscription.unsubscribe();
    run_with(&sandbox, "return data.a", "data", &data);
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn test_change_subscription_on_objects() {
    let sandbox = sandbox();
    let data = sandbox.value_from_json(json!({"a": 1}));
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    let _subscription = sandbox.subscribe_change(data.as_object().unwrap(), move |change| {
        sink.borrow_mut().push(change.clone());
    });
    run_with(&sandbox, "data.b = 2; data.a = 5; delete data.a", "data", &data);
    assert_eq!(
        *changes.borrow(),
        vec![
            Change::Create { prop: PropertyKey::from("b") },
            Change::Delete { prop: PropertyKey::from("a") },
        ]
    );
}

#[test]
fn test_change_subscription_on_arrays() {
    let sandbox = sandbox();
    let list = sandbox.value_from_json(json!([1, 2, 3]));
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    let _subscription = sandbox.subscribe_change(list.as_object().unwrap(), move |change| {
        sink.borrow_mut().push(change.clone());
    });
    run_with(&sandbox, "list.push(4); list.pop(); list.splice(0, 1, 9); list.reverse()", "list", &list);
    assert_eq!(
        *changes.borrow(),
        vec![
            Change::Push { added: vec![JsValue::Number(4.0)] },
            Change::Pop { removed: vec![JsValue::Number(4.0)] },
            Change::Splice {
                start_index: 0,
                delete_count: 1,
                added: vec![JsValue::Number(9.0)],
                removed: vec![JsValue::Number(1.0)],
            },
            Change::Reverse,
        ]
    );
    assert_eq!(sandbox.to_json(&list).unwrap(), Some(json!([3, 2, 9])));
}

#[test]
fn test_set_subscription() {
    let sandbox = sandbox();
    let data = sandbox.value_from_json(json!({"a": 1, "inner": {"x": 1}}));
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    let _a = sandbox.subscribe_set(data.as_object().unwrap(), "a", move |change| {
        sink.borrow_mut().push(change.clone());
    });
    let nested = Rc::new(RefCell::new(Vec::new()));
    let nested_sink = nested.clone();
    let _inner = sandbox.subscribe_set(data.as_object().unwrap(), "inner", move |change| {
        nested_sink.borrow_mut().push(change.clone());
    });

    run_with(&sandbox, "data.a = 2; data.a = 3; data.b = 1; data.inner.y = 2", "data", &data);
    assert_eq!(*changes.borrow(), vec![Change::Replace, Change::Replace]);
    assert_eq!(*nested.borrow(), vec![Change::Create { prop: PropertyKey::from("y") }]);
}
