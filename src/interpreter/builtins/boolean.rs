//! Boolean constructor and Boolean.prototype methods

use crate::context::Exec;
use crate::error::JsError;
use crate::realm::Intrinsics;
use crate::value::{JsObjectRef, JsValue};

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let proto = &intrinsics.boolean_prototype;
    let ctor = intrinsics.constructor("Boolean", boolean_call, Some(boolean_construct), 1, proto);

    intrinsics.register_method(proto, "toString", boolean_to_string, 0);
    intrinsics.register_method(proto, "valueOf", boolean_value_of, 0);

    global.define_hidden("Boolean", JsValue::Object(ctor));
}

fn boolean_call(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(args.first().is_some_and(JsValue::to_boolean)))
}

fn boolean_construct(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = boolean_call(exec, this, args)?;
    Ok(exec
        .realm()
        .intrinsics
        .box_primitive(&value)
        .map_or(value, JsValue::Object))
}

fn this_boolean(this: &JsValue) -> Result<bool, JsError> {
    match this {
        JsValue::Boolean(b) => Ok(*b),
        JsValue::Object(obj) => match obj.primitive_value() {
            Some(JsValue::Boolean(b)) => Ok(b),
            _ => Err(JsError::type_error("Boolean.prototype method called on incompatible receiver")),
        },
        _ => Err(JsError::type_error("Boolean.prototype method called on incompatible receiver")),
    }
}

fn boolean_to_string(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::from(if this_boolean(&this)? { "true" } else { "false" }))
}

fn boolean_value_of(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(this_boolean(&this)?))
}
