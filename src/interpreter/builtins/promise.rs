//! Promise constructor and Promise.prototype methods
//!
//! Settlement lives in [`PromiseCell`]; these functions only wire host
//! closures to it. Reactions run as soon as their promise settles.

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins::arg;
use crate::interpreter::function::call_function;
use crate::interpreter::ops::iterate;
use crate::interpreter::task::{PromiseCell, new_promise};
use crate::prelude::*;
use crate::realm::Intrinsics;
use crate::value::{CheapClone, JsObjectRef, JsValue};

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let proto = &intrinsics.promise_prototype;
    let ctor = intrinsics.constructor("Promise", promise_call, Some(promise_construct), 1, proto);

    intrinsics.register_method(&ctor, "resolve", promise_resolve, 1);
    intrinsics.register_method(&ctor, "reject", promise_reject, 1);
    intrinsics.register_method(&ctor, "all", promise_all, 1);
    intrinsics.register_method(&ctor, "race", promise_race, 1);

    intrinsics.register_method(proto, "then", promise_then, 2);
    intrinsics.register_method(proto, "catch", promise_catch, 1);

    global.define_hidden("Promise", JsValue::Object(ctor));
}

/// Native function settling `cell` with its first argument
fn settler(exec: &Exec, cell: &Rc<PromiseCell>, fulfil: bool) -> JsValue {
    let cell = cell.cheap_clone();
    let name = if fulfil { "resolve" } else { "reject" };
    let f = exec.realm().intrinsics.native_function(
        name,
        Rc::new(move |exec: &Exec, _this: JsValue, args: &[JsValue]| {
            if fulfil {
                cell.resolve(exec, arg(args, 0));
            } else {
                cell.reject(exec, JsError::thrown(arg(args, 0)));
            }
            Ok(JsValue::Undefined)
        }),
        None,
        1,
    );
    JsValue::Object(f)
}

fn this_promise(this: &JsValue, method: &str) -> Result<Rc<PromiseCell>, JsError> {
    this.as_object().and_then(JsObjectRef::promise).ok_or_else(|| {
        JsError::type_error(format!(
            "Method Promise.prototype.{method} called on incompatible receiver"
        ))
    })
}

fn promise_call(_exec: &Exec, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Err(JsError::type_error("Promise constructor cannot be invoked without 'new'"))
}

fn promise_construct(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let executor = arg(args, 0);
    if !executor.is_callable() {
        return Err(JsError::type_error(format!(
            "Promise resolver {executor} is not a function"
        )));
    }
    let (promise, cell) = new_promise(exec);
    let resolve = settler(exec, &cell, true);
    let reject = settler(exec, &cell, false);
    if let Err(err) = call_function(exec, &executor, JsValue::Undefined, &[resolve, reject]) {
        if !err.is_catchable() {
            return Err(err);
        }
        cell.reject(exec, err);
    }
    Ok(JsValue::Object(promise))
}

/// `Promise.resolve` semantics for any value
fn to_promise(exec: &Exec, value: JsValue) -> (JsValue, Rc<PromiseCell>) {
    if let Some(cell) = value.as_object().and_then(JsObjectRef::promise) {
        return (value, cell);
    }
    let (promise, cell) = new_promise(exec);
    cell.resolve(exec, value);
    (JsValue::Object(promise), cell)
}

fn promise_resolve(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(to_promise(exec, arg(args, 0)).0)
}

fn promise_reject(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (promise, cell) = new_promise(exec);
    cell.reject(exec, JsError::thrown(arg(args, 0)));
    Ok(JsValue::Object(promise))
}

fn promise_all(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let items = iterate(&arg(args, 0))?;
    let (promise, cell) = new_promise(exec);
    let results = Rc::new(RefCell::new(vec![JsValue::Undefined; items.len()]));
    let remaining = Rc::new(Cell::new(items.len()));
    if items.is_empty() {
        cell.resolve(exec, exec.realm().intrinsics.array_value(Vec::new()));
        return Ok(JsValue::Object(promise));
    }

    for (i, item) in items.into_iter().enumerate() {
        let (_, item_cell) = to_promise(exec, item);
        let (results, remaining, all) = (results.cheap_clone(), remaining.cheap_clone(), cell.cheap_clone());
        let on_fulfilled = exec.realm().intrinsics.native_function(
            "",
            Rc::new(move |exec: &Exec, _this: JsValue, args: &[JsValue]| {
                if let Some(slot) = results.borrow_mut().get_mut(i) {
                    *slot = arg(args, 0);
                }
                remaining.set(remaining.get().saturating_sub(1));
                if remaining.get() == 0 {
                    let values = results.borrow().clone();
                    all.resolve(exec, exec.realm().intrinsics.array_value(values));
                }
                Ok(JsValue::Undefined)
            }),
            None,
            1,
        );
        let on_rejected = settler(exec, &cell, false);
        item_cell.then(exec, JsValue::Object(on_fulfilled), on_rejected, Rc::new(PromiseCell::default()));
    }
    Ok(JsValue::Object(promise))
}

fn promise_race(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let items = iterate(&arg(args, 0))?;
    let (promise, cell) = new_promise(exec);
    for item in items {
        let (_, item_cell) = to_promise(exec, item);
        let on_fulfilled = settler(exec, &cell, true);
        let on_rejected = settler(exec, &cell, false);
        item_cell.then(exec, on_fulfilled, on_rejected, Rc::new(PromiseCell::default()));
    }
    Ok(JsValue::Object(promise))
}

fn promise_then(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let cell = this_promise(&this, "then")?;
    let (derived, derived_cell) = new_promise(exec);
    cell.then(exec, arg(args, 0), arg(args, 1), derived_cell);
    Ok(JsValue::Object(derived))
}

fn promise_catch(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let cell = this_promise(&this, "catch")?;
    let (derived, derived_cell) = new_promise(exec);
    cell.then(exec, JsValue::Undefined, arg(args, 0), derived_cell);
    Ok(JsValue::Object(derived))
}
