//! Built-in function implementations for the sandbox realm
//!
//! Every module installs its constructor and methods on the host global
//! object. Sandboxes only ever see the subset their allow-lists expose.

pub mod array;
pub mod boolean;
pub mod console;
pub mod error;
pub mod function;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod promise;
pub mod regexp;
pub mod string;

use crate::error::JsError;
use crate::realm::{Escapes, Intrinsics};
use crate::value::{CheapClone, JsObjectRef, JsValue};

/// Populate `global` with every built-in
pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) -> Escapes {
    object::install(intrinsics, global);
    let (function, sandbox_function) = function::install(intrinsics, global);
    array::install(intrinsics, global);
    string::install(intrinsics, global);
    number::install(intrinsics, global);
    boolean::install(intrinsics, global);
    math::install(intrinsics, global);
    json::install(intrinsics, global);
    error::install(intrinsics, global);
    regexp::install(intrinsics, global);
    promise::install(intrinsics, global);
    console::install(intrinsics, global);
    global::install(intrinsics, global, function, sandbox_function)
}

/// Argument `i`, `undefined` when missing
pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).map(CheapClone::cheap_clone).unwrap_or_default()
}

/// Relative index argument clamped to `0..=len`, the way slice-like methods
/// read their bounds
pub(crate) fn relative_index(value: &JsValue, len: usize, default: usize) -> usize {
    if matches!(value, JsValue::Undefined) {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = crate::prelude::math::trunc(n);
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

/// `this` as an object, for methods that need one
pub(crate) fn this_object(this: &JsValue, method: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) => Ok(obj.cheap_clone()),
        _ => Err(JsError::type_error(format!(
            "{method} called on non-object"
        ))),
    }
}
