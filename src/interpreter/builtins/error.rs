//! Error constructors

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins::this_object;
use crate::realm::{BuiltinFn, Intrinsics};
use crate::value::{JsObjectRef, JsValue, ObjectKind};

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let kinds: [(&str, BuiltinFn, &JsObjectRef); 5] = [
        ("Error", error_constructor, &intrinsics.error_prototype),
        ("TypeError", type_error_constructor, &intrinsics.type_error_prototype),
        ("RangeError", range_error_constructor, &intrinsics.range_error_prototype),
        ("ReferenceError", reference_error_constructor, &intrinsics.reference_error_prototype),
        ("SyntaxError", syntax_error_constructor, &intrinsics.syntax_error_prototype),
    ];
    for (name, ctor_fn, proto) in kinds {
        let ctor = intrinsics.constructor(name, ctor_fn, Some(ctor_fn), 1, proto);
        proto.define_hidden("name", JsValue::from(name));
        proto.define_hidden("message", JsValue::from(""));
        global.define_hidden(name, JsValue::Object(ctor));
    }
    intrinsics.register_method(&intrinsics.error_prototype, "toString", error_to_string, 0);
}

fn create_error(exec: &Exec, name: &str, args: &[JsValue]) -> Result<JsValue, JsError> {
    let intrinsics = &exec.realm().intrinsics;
    let proto = intrinsics.error_prototype_for(name);
    let err = JsObjectRef::new(ObjectKind::Error, Some(proto.clone()));
    match args.first() {
        None | Some(JsValue::Undefined) => {}
        Some(message) => err.define_hidden("message", JsValue::String(message.to_js_string())),
    }
    Ok(JsValue::Object(err))
}

fn error_constructor(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error(exec, "Error", args)
}

fn type_error_constructor(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error(exec, "TypeError", args)
}

fn range_error_constructor(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error(exec, "RangeError", args)
}

fn reference_error_constructor(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error(exec, "ReferenceError", args)
}

fn syntax_error_constructor(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error(exec, "SyntaxError", args)
}

fn error_to_string(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = this_object(&this, "Error.prototype.toString")?;
    let name = match obj.get_str("name") {
        JsValue::Undefined => "Error".to_string(),
        other => other.to_js_string().to_string(),
    };
    let message = match obj.get_str("message") {
        JsValue::Undefined => String::new(),
        other => other.to_js_string().to_string(),
    };
    Ok(JsValue::from(match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{name}: {message}"),
    }))
}
