//! Function constructor, its sandboxed stand-in and Function.prototype

use crate::context::{Exec, ExecutionContext};
use crate::error::JsError;
use crate::interpreter::builtins::arg;
use crate::interpreter::function::{call_function, compile_function, describe};
use crate::interpreter::ops::iterate;
use crate::prelude::*;
use crate::realm::Intrinsics;
use crate::value::{CheapClone, JsFunction, JsObjectRef, JsValue};

/// Install `Function` and build `SandboxFunction`. Returns both so the
/// realm can pair them up.
pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) -> (JsObjectRef, JsObjectRef) {
    let proto = &intrinsics.function_prototype;
    let function = intrinsics.constructor("Function", function_raw, Some(function_raw), 1, proto);

    intrinsics.register_method(proto, "call", function_call, 1);
    intrinsics.register_method(proto, "apply", function_apply, 2);
    intrinsics.register_method(proto, "bind", function_bind, 1);
    intrinsics.register_method(proto, "toString", function_to_string, 0);

    let sandboxed = intrinsics.native_function(
        "SandboxFunction",
        Rc::new(function_sandboxed),
        Some(Rc::new(function_sandboxed)),
        1,
    );
    sandboxed.define_hidden("prototype", JsValue::Object(proto.cheap_clone()));

    global.define_hidden("Function", JsValue::Object(function.cheap_clone()));
    (function, sandboxed)
}

/// Handle for code that runs with no Gate at all, sharing the caller's
/// quota and clock
pub(crate) fn unrestricted(exec: &Exec) -> Exec {
    let ctx = ExecutionContext::unrestricted(exec.ctx.realm.cheap_clone());
    Exec {
        ctx: Rc::new(ctx),
        constants: exec.constants.cheap_clone(),
        state: exec.state.cheap_clone(),
    }
}

/// `Function(...)` as the host sees it
fn function_raw(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    compile_function(&unrestricted(exec), args)
}

/// `Function(...)` as sandboxed code sees it: compiled against the
/// caller's sandbox
fn function_sandboxed(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    compile_function(exec, args)
}

fn function_call(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let receiver = arg(args, 0);
    call_function(exec, &this, receiver, args.get(1..).unwrap_or(&[]))
}

fn function_apply(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let receiver = arg(args, 0);
    let list = match arg(args, 1) {
        JsValue::Null | JsValue::Undefined => Vec::new(),
        other => iterate(&other)?,
    };
    call_function(exec, &this, receiver, &list)
}

fn function_bind(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let Some(target) = this.as_object().filter(|f| f.is_callable()).cloned() else {
        return Err(JsError::type_error("Bind must be called on a function"));
    };
    let bound_this = arg(args, 0);
    let bound_args: Vec<JsValue> = args.get(1..).unwrap_or(&[]).to_vec();
    let name = target.function().map(|f| f.name()).unwrap_or_else(|| "".into());
    let arity = match target.get_str("length") {
        JsValue::Number(n) => (n as usize).saturating_sub(bound_args.len()),
        _ => 0,
    };
    let callee = JsValue::Object(target);
    let bound = exec.realm().intrinsics.native_function(
        &format!("bound {name}"),
        Rc::new(move |exec: &Exec, _this: JsValue, args: &[JsValue]| {
            let mut full = bound_args.clone();
            full.extend_from_slice(args);
            call_function(exec, &callee, bound_this.cheap_clone(), &full)
        }),
        None,
        arity,
    );
    Ok(JsValue::Object(bound))
}

fn function_to_string(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let Some(function) = this.as_object().and_then(JsObjectRef::function) else {
        return Err(JsError::type_error(format!(
            "Function.prototype.toString requires that 'this' be a Function, got {}",
            describe(&this)
        )));
    };
    let text = match function {
        JsFunction::Native(f) => format!("function {}() {{ [native code] }}", f.name),
        JsFunction::Sandboxed(f) => {
            let params: Vec<&str> = f.def.params.iter().map(|p| p.as_str()).collect();
            format!(
                "function {}({}) {{ [sandboxed code] }}",
                f.def.name.as_ref().map(|n| n.as_str()).unwrap_or(""),
                params.join(", ")
            )
        }
    };
    Ok(JsValue::from(text))
}
