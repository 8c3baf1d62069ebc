//! Number constructor and Number.prototype methods

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins::arg;
use crate::interpreter::builtins::global::{global_parse_float, global_parse_int};
use crate::prelude::math;
use crate::realm::Intrinsics;
use crate::value::{JsObjectRef, JsValue, number_to_string};

/// 2^53 - 1
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let proto = &intrinsics.number_prototype;
    let ctor = intrinsics.constructor("Number", number_call, Some(number_construct), 1, proto);

    ctor.define_hidden("MAX_SAFE_INTEGER", JsValue::Number(MAX_SAFE_INTEGER));
    ctor.define_hidden("MIN_SAFE_INTEGER", JsValue::Number(-MAX_SAFE_INTEGER));
    ctor.define_hidden("MAX_VALUE", JsValue::Number(f64::MAX));
    ctor.define_hidden("MIN_VALUE", JsValue::Number(5e-324));
    ctor.define_hidden("EPSILON", JsValue::Number(f64::EPSILON));
    ctor.define_hidden("POSITIVE_INFINITY", JsValue::Number(f64::INFINITY));
    ctor.define_hidden("NEGATIVE_INFINITY", JsValue::Number(f64::NEG_INFINITY));
    ctor.define_hidden("NaN", JsValue::Number(f64::NAN));

    intrinsics.register_method(&ctor, "isInteger", number_is_integer, 1);
    intrinsics.register_method(&ctor, "isSafeInteger", number_is_safe_integer, 1);
    intrinsics.register_method(&ctor, "isFinite", number_is_finite, 1);
    intrinsics.register_method(&ctor, "isNaN", number_is_nan, 1);
    intrinsics.register_method(&ctor, "parseFloat", global_parse_float, 1);
    intrinsics.register_method(&ctor, "parseInt", global_parse_int, 2);

    intrinsics.register_method(proto, "toFixed", number_to_fixed, 1);
    intrinsics.register_method(proto, "toString", number_to_string_method, 1);
    intrinsics.register_method(proto, "toLocaleString", number_to_string_method, 0);
    intrinsics.register_method(proto, "valueOf", number_value_of, 0);

    global.define_hidden("Number", JsValue::Object(ctor));
}

fn number_call(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Number(args.first().map_or(0.0, JsValue::to_number)))
}

fn number_construct(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = number_call(exec, this, args)?;
    Ok(exec
        .realm()
        .intrinsics
        .box_primitive(&value)
        .map_or(value, JsValue::Object))
}

fn this_number(this: &JsValue, method: &str) -> Result<f64, JsError> {
    match this {
        JsValue::Number(n) => Ok(*n),
        JsValue::Object(obj) => match obj.primitive_value() {
            Some(JsValue::Number(n)) => Ok(n),
            _ => Err(JsError::type_error(format!(
                "Number.prototype.{method} requires that 'this' be a Number"
            ))),
        },
        _ => Err(JsError::type_error(format!(
            "Number.prototype.{method} requires that 'this' be a Number"
        ))),
    }
}

fn is_integer(value: &JsValue) -> Option<f64> {
    match value {
        JsValue::Number(n) if n.is_finite() && math::trunc(*n) == *n => Some(*n),
        _ => None,
    }
}

fn number_is_integer(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(is_integer(&arg(args, 0)).is_some()))
}

fn number_is_safe_integer(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let safe = is_integer(&arg(args, 0)).is_some_and(|n| n.abs() <= MAX_SAFE_INTEGER);
    Ok(JsValue::Boolean(safe))
}

fn number_is_finite(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_finite())))
}

fn number_is_nan(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_nan())))
}

fn number_to_fixed(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = this_number(&this, "toFixed")?;
    let digits = match arg(args, 0) {
        JsValue::Undefined => 0.0,
        other => math::trunc(other.to_number()),
    };
    if !(0.0..=100.0).contains(&digits) {
        return Err(JsError::range_error("toFixed() digits argument must be between 0 and 100"));
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(JsValue::from(number_to_string(n)));
    }
    Ok(JsValue::from(format!("{:.*}", digits as usize, n)))
}

/// Digits of `n` in `radix`, fractional part cut after 20 places
fn to_radix(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let negative = n < 0.0;
    let n = n.abs();
    let mut int = math::trunc(n);
    let mut frac = n - int;

    let mut digits = Vec::new();
    loop {
        let d = math::fmod(int, radix as f64) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        int = math::trunc(int / radix as f64);
        if int < 1.0 {
            break;
        }
    }
    let mut out: String = digits.iter().rev().collect();
    if frac > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac *= radix as f64;
            let d = math::trunc(frac);
            out.push(std::char::from_digit(d as u32, radix).unwrap_or('0'));
            frac -= d;
            if frac <= 0.0 {
                break;
            }
        }
    }
    if negative {
        out.insert(0, '-');
    }
    out
}

fn number_to_string_method(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = this_number(&this, "toString")?;
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10.0,
        other => math::trunc(other.to_number()),
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(JsError::range_error("toString() radix must be between 2 and 36"));
    }
    if radix == 10.0 {
        return Ok(JsValue::from(number_to_string(n)));
    }
    Ok(JsValue::from(to_radix(n, radix as u32)))
}

fn number_value_of(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Number(this_number(&this, "valueOf")?))
}
