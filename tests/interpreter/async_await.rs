//! Async functions, await and promises

use super::{eval, eval_str, sandbox, sandbox_with};
use futures::executor::block_on;
use jsgate::{ErrorKind, JsValue, SandboxConfig};

fn run_async(source: &str) -> Result<JsValue, jsgate::JsError> {
    let sandbox = sandbox();
    let program = sandbox.compile(source)?;
    block_on(program.execute_async(&[])).map(|ret| ret.result)
}

#[test]
fn test_top_level_await_in_async_mode() {
    assert_eq!(run_async("return await Promise.resolve(5)").unwrap(), JsValue::Number(5.0));
    assert_eq!(run_async("return await 7").unwrap(), JsValue::Number(7.0));
}

#[test]
fn test_async_function_returns_a_promise() {
    assert_eq!(eval_str("const f = async () => 1; return typeof f()"), "object");
    assert_eq!(
        eval("const f = async () => 1; return f() instanceof Promise"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_awaiting_async_functions() {
    let src = "
        async function double(x) {
            const v = await Promise.resolve(x)
            return v * 2
        }
        const a = await double(10)
        const b = await double(a)
        return a + b
    ";
    assert_eq!(run_async(src).unwrap(), JsValue::Number(60.0));
}

#[test]
fn test_async_arrows_and_methods() {
    assert_eq!(
        run_async("const f = async x => x + 1; return await f(1)").unwrap(),
        JsValue::Number(2.0)
    );
    assert_eq!(
        run_async("const o = { async get() { return 'm' } }; return await o.get()").unwrap(),
        JsValue::from("m")
    );
}

#[test]
fn test_rejections_are_catchable_with_await() {
    assert_eq!(
        run_async("try { await Promise.reject('no') } catch (e) { return 'caught ' + e }").unwrap(),
        JsValue::from("caught no")
    );
    assert_eq!(
        run_async("const f = async () => { throw new TypeError('bad') }; try { await f() } catch (e) { return e.message }").unwrap(),
        JsValue::from("bad")
    );
}

#[test]
fn test_uncaught_rejection_reaches_host() {
    let err = run_async("await Promise.reject('boom')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Thrown);
    assert_eq!(err.thrown_value(), Some(&JsValue::from("boom")));
}

#[test]
fn test_then_and_catch() {
    assert_eq!(
        eval("let out = 0; Promise.resolve(3).then(v => { out = v * 2 }); return out"),
        JsValue::Number(6.0)
    );
    assert_eq!(
        eval_str("let out = ''; Promise.reject('x').catch(e => { out = 'handled ' + e }); return out"),
        "handled x"
    );
    assert_eq!(
        run_async("return await Promise.resolve(1).then(v => v + 1).then(v => v * 10)").unwrap(),
        JsValue::Number(20.0)
    );
}

#[test]
fn test_promise_constructor() {
    assert_eq!(
        run_async("return await new Promise((resolve, reject) => resolve('ok'))").unwrap(),
        JsValue::from("ok")
    );
    assert_eq!(
        run_async("try { await new Promise(() => { throw 'inside' }) } catch (e) { return e }").unwrap(),
        JsValue::from("inside")
    );
    assert_eq!(
        super::error_kind("return Promise(() => 1)"),
        Some(ErrorKind::Type)
    );
}

#[test]
fn test_all_and_race() {
    assert_eq!(
        run_async("const r = await Promise.all([1, Promise.resolve(2), (async () => 3)()]); return r.join()").unwrap(),
        JsValue::from("1,2,3")
    );
    assert_eq!(
        run_async("return (await Promise.all([])).length").unwrap(),
        JsValue::Number(0.0)
    );
    assert_eq!(
        run_async("return await Promise.race([Promise.resolve('first'), Promise.resolve('second')])").unwrap(),
        JsValue::from("first")
    );
}

#[test]
fn test_host_settles_promises_with_timers() {
    let mut config = SandboxConfig::safe();
    config.globals.push("setTimeout".to_string());
    let sandbox = sandbox_with(config);
    let src = "
        async function later() {
            await new Promise(resolve => setTimeout(resolve, 50))
            return 'late'
        }
        return later()
    ";
    let promise = sandbox.eval(src).unwrap();
    assert_eq!(sandbox.resolve_promise(&promise).unwrap(), JsValue::from("late"));
    assert_eq!(sandbox.pending_timers(), 0);
}

#[test]
fn test_resolve_promise_passes_plain_values_through() {
    let sandbox = sandbox();
    assert_eq!(
        sandbox.resolve_promise(&JsValue::Number(1.0)).unwrap(),
        JsValue::Number(1.0)
    );
    let rejected = sandbox.eval("return (async () => { throw 'nope' })()").unwrap();
    let err = sandbox.resolve_promise(&rejected).unwrap_err();
    assert_eq!(err.thrown_value(), Some(&JsValue::from("nope")));
}

#[test]
fn test_sandbox_errors_cross_promises_uncaught() {
    let err = run_async("const f = async () => { Math.x = 1 }; try { await f() } catch (e) { return 'caught' }")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Sandbox);
}
