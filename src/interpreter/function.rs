//! Function objects: creation, calls and construction

use futures::FutureExt;

use crate::context::Exec;
use crate::error::JsError;
use crate::gate;
use crate::interpreter::control;
use crate::interpreter::task::{self, Task};
use crate::interpreter::walker::{AsyncWalker, Flow, SyncWalker, run_sync};
use crate::lisp::{FunctionDef, Item};
use crate::parser;
use crate::prelude::*;
use crate::scope::{Scope, VarKind};
use crate::value::{
    CheapClone, JsFunction, JsObjectRef, JsString, JsValue, ObjectKind, SandboxedFunction,
};

/// Wrap a parsed function in a callable object closing over `scope`
pub fn create_function(exec: &Exec, scope: Option<Scope>, def: &Rc<FunctionDef>) -> Result<JsValue, JsError> {
    gate::check_function_creation(exec, def.is_async)?;
    let intrinsics = &exec.realm().intrinsics;
    let obj = JsObjectRef::new(
        ObjectKind::Function(JsFunction::Sandboxed(SandboxedFunction {
            def: def.cheap_clone(),
            scope,
            exec: exec.cheap_clone(),
        })),
        Some(intrinsics.function_prototype.cheap_clone()),
    );
    let name = def.name.clone().unwrap_or_else(|| JsString::from(""));
    obj.define_hidden("name", JsValue::String(name));
    obj.define_hidden("length", JsValue::from(def.arity()));
    if !def.is_arrow() && !def.is_async {
        let prototype = intrinsics.object();
        prototype.define_hidden("constructor", JsValue::Object(obj.cheap_clone()));
        obj.define_hidden("prototype", JsValue::Object(prototype));
    }
    Ok(JsValue::Object(obj))
}

/// Frame a call runs in, with parameters bound
fn call_scope(exec: &Exec, f: &SandboxedFunction, this: JsValue, args: &[JsValue]) -> Result<Scope, JsError> {
    let parent = f.scope.clone().unwrap_or_else(|| exec.ctx.global_scope.cheap_clone());
    let receiver = (!f.def.is_arrow()).then_some(this);
    let scope = parent.function(receiver);
    for (i, param) in f.def.params.iter().enumerate() {
        let value = args.get(i).cloned().unwrap_or_default();
        scope.declare(param.as_str(), VarKind::Var, Some(value), false)?;
    }
    if let Some(rest) = &f.def.rest {
        let trailing = args.get(f.def.params.len()..).unwrap_or(&[]).to_vec();
        let array = exec.realm().intrinsics.array_value(trailing);
        scope.declare(rest.as_str(), VarKind::Var, Some(array), false)?;
    }
    Ok(scope)
}

fn not_a_function(callee: &JsValue) -> JsError {
    JsError::type_error(format!("{} is not a function", describe(callee)))
}

/// Short rendering of a value for error messages
pub fn describe(value: &JsValue) -> String {
    match value {
        JsValue::String(s) => format!("\"{s}\""),
        JsValue::Object(obj) => match obj.function() {
            Some(f) => format!("function {}", f.name()),
            None => obj.class_name().to_string(),
        },
        other => other.to_string(),
    }
}

/// Invoke a callable value. Sandboxed bodies run to completion here; async
/// bodies run until their first pending `await` and return a promise.
pub fn call_function(exec: &Exec, callee: &JsValue, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let Some(function) = callee.as_object().and_then(JsObjectRef::function) else {
        return Err(not_a_function(callee));
    };
    match function {
        JsFunction::Native(native) => (native.func)(exec, this, args),
        JsFunction::Sandboxed(f) => {
            exec.check_timeout()?;
            exec.tick()?;
            let run = exec.joined(&f.exec);
            let scope = call_scope(&run, &f, this, args)?;
            let body = f.def.body(&run.constants)?;
            if f.def.is_async {
                return Ok(start_async(run, scope, body));
            }
            let signal = run_sync(control::block::<SyncWalker>(&run, &scope, &body, Flow::function()))?;
            Ok(signal.map(|ret| ret.result).unwrap_or_default())
        }
    }
}

/// Run an async body until it first parks, handing back its promise
fn start_async(exec: Exec, scope: Scope, body: Rc<[Item]>) -> JsValue {
    let (promise, cell) = task::new_promise(&exec);
    let body_exec = exec.cheap_clone();
    let task: Task = async move {
        let signal = control::block::<AsyncWalker>(&body_exec, &scope, &body, Flow::function()).await?;
        Ok(signal.map(|ret| ret.result).unwrap_or_default())
    }
    .boxed_local();
    cell.set_task(task);
    cell.drive_now(&exec);
    if cell.has_task() {
        exec.realm().park(cell, exec.cheap_clone());
    }
    JsValue::Object(promise)
}

/// `new ctor(...args)`
pub fn construct(exec: &Exec, ctor: &JsObjectRef, args: &[JsValue]) -> Result<JsValue, JsError> {
    let callee = JsValue::Object(ctor.cheap_clone());
    match ctor.function() {
        Some(JsFunction::Native(native)) => match &native.construct {
            Some(construct) => construct(exec, JsValue::Undefined, args),
            None => Err(JsError::type_error(format!("{} is not a constructor", native.name))),
        },
        Some(JsFunction::Sandboxed(f)) if !f.def.is_arrow() && !f.def.is_async => {
            let proto = match ctor.get_str("prototype") {
                JsValue::Object(proto) => proto,
                _ => exec.realm().intrinsics.object_prototype.cheap_clone(),
            };
            let instance = JsObjectRef::new(ObjectKind::Ordinary, Some(proto));
            let result = call_function(exec, &callee, JsValue::Object(instance.cheap_clone()), args)?;
            Ok(match result {
                JsValue::Object(obj) => JsValue::Object(obj),
                _ => JsValue::Object(instance),
            })
        }
        Some(JsFunction::Sandboxed(f)) => Err(JsError::type_error(format!(
            "{} is not a constructor",
            f.def.name.clone().unwrap_or_else(|| JsString::from("anonymous"))
        ))),
        None => Err(JsError::type_error(format!("{} is not a constructor", describe(&callee)))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Functions from strings
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameter names of `Function("a, b", ..., body)` style arguments
fn parameter_names(sources: &[JsValue]) -> Result<Vec<JsString>, JsError> {
    let mut names = Vec::new();
    for source in sources {
        let text = source.to_js_string();
        for part in text.as_str().split(',') {
            let name = part.trim();
            let valid = !name.is_empty()
                && name
                    .chars()
                    .enumerate()
                    .all(|(i, c)| c == '_' || c == '$' || c.is_alphabetic() || (i > 0 && c.is_ascii_digit()));
            if !valid {
                return Err(JsError::syntax_error(format!("Invalid parameter name '{name}'")));
            }
            names.push(JsString::from(name));
        }
    }
    Ok(names)
}

/// Compile `Function(...params, body)` arguments against the context of
/// `exec`. The result closes over that context's global scope.
pub fn compile_function(exec: &Exec, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (body, params) = match args.split_last() {
        Some((body, params)) => (body.to_js_string(), parameter_names(params)?),
        None => (JsString::from(""), Vec::new()),
    };
    let parsed = parser::parse(body.as_str())?;
    let def = FunctionDef::lowered(
        Some(JsString::from("anonymous")),
        params,
        None,
        parsed.tree.into(),
    );
    let compiled = exec.with_constants(Rc::new(parsed.constants));
    create_function(&compiled, None, &Rc::new(def))
}

/// Compile and immediately run a code string
pub fn eval_code(exec: &Exec, code: &JsValue) -> Result<JsValue, JsError> {
    let JsValue::String(_) = code else {
        return Ok(code.cheap_clone());
    };
    let f = compile_function(exec, std::slice::from_ref(code))?;
    call_function(exec, &f, JsValue::Undefined, &[])
}
