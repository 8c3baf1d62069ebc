//! Math built-in methods

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins::arg;
use crate::prelude::math;
use crate::realm::Intrinsics;
use crate::value::{JsObjectRef, JsValue};

/// Define a one-argument Math function in terms of an `f64 -> f64` function
macro_rules! unary {
    ($name:ident, $f:expr) => {
        fn $name(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
            let f: fn(f64) -> f64 = $f;
            Ok(JsValue::Number(f(arg(args, 0).to_number())))
        }
    };
}

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let m = intrinsics.object();

    // Constants
    m.define_hidden("PI", JsValue::Number(std::f64::consts::PI));
    m.define_hidden("E", JsValue::Number(std::f64::consts::E));
    m.define_hidden("LN2", JsValue::Number(std::f64::consts::LN_2));
    m.define_hidden("LN10", JsValue::Number(std::f64::consts::LN_10));
    m.define_hidden("LOG2E", JsValue::Number(std::f64::consts::LOG2_E));
    m.define_hidden("LOG10E", JsValue::Number(std::f64::consts::LOG10_E));
    m.define_hidden("SQRT2", JsValue::Number(std::f64::consts::SQRT_2));
    m.define_hidden("SQRT1_2", JsValue::Number(std::f64::consts::FRAC_1_SQRT_2));

    // Rounding
    intrinsics.register_method(&m, "abs", math_abs, 1);
    intrinsics.register_method(&m, "floor", math_floor, 1);
    intrinsics.register_method(&m, "ceil", math_ceil, 1);
    intrinsics.register_method(&m, "round", math_round, 1);
    intrinsics.register_method(&m, "trunc", math_trunc, 1);
    intrinsics.register_method(&m, "sign", math_sign, 1);

    intrinsics.register_method(&m, "min", math_min, 2);
    intrinsics.register_method(&m, "max", math_max, 2);

    // Powers and roots
    intrinsics.register_method(&m, "pow", math_pow, 2);
    intrinsics.register_method(&m, "sqrt", math_sqrt, 1);
    intrinsics.register_method(&m, "cbrt", math_cbrt, 1);
    intrinsics.register_method(&m, "hypot", math_hypot, 2);

    // Logarithms and exponentials
    intrinsics.register_method(&m, "log", math_log, 1);
    intrinsics.register_method(&m, "log10", math_log10, 1);
    intrinsics.register_method(&m, "log2", math_log2, 1);
    intrinsics.register_method(&m, "log1p", math_log1p, 1);
    intrinsics.register_method(&m, "exp", math_exp, 1);
    intrinsics.register_method(&m, "expm1", math_expm1, 1);

    // Trigonometry
    intrinsics.register_method(&m, "sin", math_sin, 1);
    intrinsics.register_method(&m, "cos", math_cos, 1);
    intrinsics.register_method(&m, "tan", math_tan, 1);
    intrinsics.register_method(&m, "asin", math_asin, 1);
    intrinsics.register_method(&m, "acos", math_acos, 1);
    intrinsics.register_method(&m, "atan", math_atan, 1);
    intrinsics.register_method(&m, "atan2", math_atan2, 2);
    intrinsics.register_method(&m, "sinh", math_sinh, 1);
    intrinsics.register_method(&m, "cosh", math_cosh, 1);
    intrinsics.register_method(&m, "tanh", math_tanh, 1);

    intrinsics.register_method(&m, "random", math_random, 0);

    global.define_hidden("Math", JsValue::Object(m));
}

unary!(math_abs, f64::abs);
unary!(math_floor, math::floor);
unary!(math_ceil, math::ceil);
unary!(math_round, math::round);
unary!(math_trunc, math::trunc);
unary!(math_sqrt, math::sqrt);
unary!(math_cbrt, math::cbrt);
unary!(math_log, math::log);
unary!(math_log10, math::log10);
unary!(math_log2, math::log2);
unary!(math_log1p, libm::log1p);
unary!(math_exp, math::exp);
unary!(math_expm1, libm::expm1);
unary!(math_sin, math::sin);
unary!(math_cos, math::cos);
unary!(math_tan, math::tan);
unary!(math_asin, libm::asin);
unary!(math_acos, libm::acos);
unary!(math_atan, math::atan);
unary!(math_sinh, libm::sinh);
unary!(math_cosh, libm::cosh);
unary!(math_tanh, libm::tanh);

fn math_sign(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = arg(args, 0).to_number();
    let sign = if n.is_nan() || n == 0.0 {
        // Keeps -0 and NaN as they are
        n
    } else if n > 0.0 {
        1.0
    } else {
        -1.0
    };
    Ok(JsValue::Number(sign))
}

fn math_min(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut result = f64::INFINITY;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        if n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative()) {
            result = n;
        }
    }
    Ok(JsValue::Number(result))
}

fn math_max(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut result = f64::NEG_INFINITY;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        if n > result || (n == 0.0 && result == 0.0 && n.is_sign_positive()) {
            result = n;
        }
    }
    Ok(JsValue::Number(result))
}

fn math_pow(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let base = arg(args, 0).to_number();
    let exp = arg(args, 1).to_number();
    Ok(JsValue::Number(math::powf(base, exp)))
}

fn math_hypot(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let result = args
        .iter()
        .map(JsValue::to_number)
        .fold(0.0, math::hypot);
    Ok(JsValue::Number(result))
}

fn math_atan2(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let y = arg(args, 0).to_number();
    let x = arg(args, 1).to_number();
    Ok(JsValue::Number(math::atan2(y, x)))
}

fn math_random(exec: &Exec, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Number(exec.realm().random()))
}
