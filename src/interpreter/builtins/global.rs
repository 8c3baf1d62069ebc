//! Global functions and constants
//!
//! `eval`, `setTimeout` and `setInterval` each come in two flavours. The raw
//! ones evaluate strings with no Gate; the sandboxed ones compile against
//! the calling sandbox and are what the Gate hands out in their place.

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins::arg;
use crate::interpreter::builtins::function::unrestricted;
use crate::interpreter::function::{compile_function, eval_code};
use crate::realm::{Escapes, Intrinsics};
use crate::value::{CheapClone, JsObjectRef, JsValue, string_to_number};

pub fn install(
    intrinsics: &Intrinsics,
    global: &JsObjectRef,
    function: JsObjectRef,
    sandbox_function: JsObjectRef,
) -> Escapes {
    global.define_hidden("NaN", JsValue::Number(f64::NAN));
    global.define_hidden("Infinity", JsValue::Number(f64::INFINITY));

    intrinsics.register_method(global, "isNaN", global_is_nan, 1);
    intrinsics.register_method(global, "isFinite", global_is_finite, 1);
    intrinsics.register_method(global, "parseInt", global_parse_int, 2);
    intrinsics.register_method(global, "parseFloat", global_parse_float, 1);
    intrinsics.register_method(global, "clearTimeout", global_clear_timer, 1);
    intrinsics.register_method(global, "clearInterval", global_clear_timer, 1);

    let eval = intrinsics.builtin("eval", eval_raw, 1);
    let set_timeout = intrinsics.builtin("setTimeout", set_timeout_raw, 2);
    let set_interval = intrinsics.builtin("setInterval", set_interval_raw, 2);
    global.define_hidden("eval", JsValue::Object(eval.cheap_clone()));
    global.define_hidden("setTimeout", JsValue::Object(set_timeout.cheap_clone()));
    global.define_hidden("setInterval", JsValue::Object(set_interval.cheap_clone()));

    intrinsics.constructor(
        "SandboxGlobal",
        sandbox_global_call,
        None,
        0,
        &intrinsics.sandbox_global_prototype,
    );

    Escapes {
        function,
        eval,
        set_timeout,
        set_interval,
        sandbox_function,
        sandbox_eval: intrinsics.builtin("sandboxEval", eval_sandboxed, 1),
        sandbox_set_timeout: intrinsics.builtin("sandboxedSetTimeout", set_timeout_sandboxed, 2),
        sandbox_set_interval: intrinsics.builtin("sandboxedSetInterval", set_interval_sandboxed, 2),
    }
}

fn sandbox_global_call(_exec: &Exec, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Err(JsError::type_error("Illegal constructor"))
}

// ─── Numbers ───────────────────────────────────────────────────────────────────

fn global_is_nan(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(arg(args, 0).to_number().is_nan()))
}

fn global_is_finite(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(arg(args, 0).to_number().is_finite()))
}

/// Shared by `parseInt` and `Number.parseInt`
pub fn global_parse_int(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = arg(args, 0).to_js_string();
    let s = text.as_str().trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, s.get(1..).unwrap_or("")),
        Some(b'+') => (false, s.get(1..).unwrap_or("")),
        _ => (false, s),
    };
    let mut radix = match arg(args, 1) {
        JsValue::Undefined => 0,
        other => other.to_int32(),
    };
    let mut digits = s;
    if (radix == 0 || radix == 16)
        && let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
    {
        digits = rest;
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Ok(JsValue::Number(f64::NAN));
    }
    let radix = radix as u32;
    let mut value: f64 = 0.0;
    let mut any = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        value = value * radix as f64 + d as f64;
        any = true;
    }
    if !any {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::Number(if negative { -value } else { value }))
}

/// Shared by `parseFloat` and `Number.parseFloat`
pub fn global_parse_float(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = arg(args, 0).to_js_string();
    let s = text.as_str().trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s.get(end..).is_some_and(|rest| rest.starts_with("Infinity")) {
        let negative = bytes.first() == Some(&b'-');
        return Ok(JsValue::Number(if negative { f64::NEG_INFINITY } else { f64::INFINITY }));
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return Ok(JsValue::Number(f64::NAN));
    }
    // Exponent only counts when followed by digits
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while matches!(bytes.get(exp_end), Some(b'0'..=b'9')) {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    Ok(JsValue::Number(string_to_number(s.get(..end).unwrap_or(""))))
}

// ─── Code evaluation ───────────────────────────────────────────────────────────

fn eval_raw(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    eval_code(&unrestricted(exec), &arg(args, 0))
}

fn eval_sandboxed(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    eval_code(exec, &arg(args, 0))
}

// ─── Timers ────────────────────────────────────────────────────────────────────

/// Queue a timer on the realm. String handlers are compiled against `exec`.
fn schedule(exec: &Exec, args: &[JsValue], repeat: bool) -> Result<JsValue, JsError> {
    let handler = arg(args, 0);
    let callback = match &handler {
        JsValue::String(_) => compile_function(exec, std::slice::from_ref(&handler))?,
        value if value.is_callable() => handler.cheap_clone(),
        _ => {
            return Err(JsError::type_error(
                "The \"callback\" argument must be of type function",
            ));
        }
    };
    let delay = arg(args, 1).to_number();
    let extra = args.get(2..).unwrap_or(&[]).to_vec();
    let id = exec.realm().schedule(exec, callback, delay, repeat, extra);
    log::trace!(target: "jsgate::timers", "scheduled timer {id} after {delay}ms");
    Ok(JsValue::Number(id as f64))
}

fn set_timeout_raw(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    schedule(&unrestricted(exec), args, false)
}

fn set_interval_raw(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    schedule(&unrestricted(exec), args, true)
}

fn set_timeout_sandboxed(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    schedule(exec, args, false)
}

fn set_interval_sandboxed(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    schedule(exec, args, true)
}

fn global_clear_timer(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    if let JsValue::Number(id) = arg(args, 0) {
        exec.realm().cancel(id as u32);
    }
    Ok(JsValue::Undefined)
}
