//! Math built-ins

use super::{eval, sandbox_with};
use jsgate::{JsValue, SandboxConfig};

fn assert_close(source: &str, expected: f64) {
    let JsValue::Number(n) = eval(source) else {
        panic!("{source} did not produce a number");
    };
    assert!((n - expected).abs() < 1e-12, "{source} = {n}, expected {expected}");
}

#[test]
fn test_constants() {
    assert_eq!(eval("return Math.PI"), JsValue::Number(std::f64::consts::PI));
    assert_eq!(eval("return Math.E"), JsValue::Number(std::f64::consts::E));
    assert_eq!(eval("return Math.SQRT2"), JsValue::Number(std::f64::consts::SQRT_2));
}

#[test]
fn test_rounding() {
    assert_eq!(eval("return Math.abs(-3)"), JsValue::Number(3.0));
    assert_eq!(eval("return Math.floor(2.7)"), JsValue::Number(2.0));
    assert_eq!(eval("return Math.floor(-2.1)"), JsValue::Number(-3.0));
    assert_eq!(eval("return Math.ceil(2.1)"), JsValue::Number(3.0));
    assert_eq!(eval("return Math.round(2.5)"), JsValue::Number(3.0));
    assert_eq!(eval("return Math.round(2.4)"), JsValue::Number(2.0));
    assert_eq!(eval("return Math.trunc(-2.7)"), JsValue::Number(-2.0));
    assert_eq!(eval("return Math.sign(-5)"), JsValue::Number(-1.0));
    assert_eq!(eval("return Math.sign(0)"), JsValue::Number(0.0));
}

#[test]
fn test_min_max() {
    assert_eq!(eval("return Math.max(1, 9, 3)"), JsValue::Number(9.0));
    assert_eq!(eval("return Math.min(4, -2, 8)"), JsValue::Number(-2.0));
    assert_eq!(eval("return Math.max()"), JsValue::Number(f64::NEG_INFINITY));
    assert_eq!(eval("return Math.min()"), JsValue::Number(f64::INFINITY));
    assert_eq!(eval("return isNaN(Math.max(1, NaN))"), JsValue::Boolean(true));
}

#[test]
fn test_powers_and_roots() {
    assert_eq!(eval("return Math.pow(2, 10)"), JsValue::Number(1024.0));
    assert_eq!(eval("return Math.sqrt(16)"), JsValue::Number(4.0));
    assert_close("return Math.cbrt(27)", 3.0);
    assert_close("return Math.hypot(3, 4)", 5.0);
    assert_eq!(eval("return isNaN(Math.sqrt(-1))"), JsValue::Boolean(true));
}

#[test]
fn test_logarithms() {
    assert_eq!(eval("return Math.log(1)"), JsValue::Number(0.0));
    assert_close("return Math.log10(1000)", 3.0);
    assert_close("return Math.log2(8)", 3.0);
    assert_close("return Math.log(Math.E)", 1.0);
    assert_eq!(eval("return Math.exp(0)"), JsValue::Number(1.0));
}

#[test]
fn test_trigonometry() {
    assert_eq!(eval("return Math.sin(0)"), JsValue::Number(0.0));
    assert_eq!(eval("return Math.cos(0)"), JsValue::Number(1.0));
    assert_eq!(eval("return Math.atan2(0, 1)"), JsValue::Number(0.0));
}

#[test]
fn test_random_is_in_unit_range() {
    assert_eq!(
        eval("for (let i = 0; i < 50; i++) { const r = Math.random(); if (r < 0 || r >= 1) return false } return true"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_seeded_random_is_reproducible() {
    let a = sandbox_with(SandboxConfig::safe()).eval("return Math.random()").unwrap();
    let b = sandbox_with(SandboxConfig::safe()).eval("return Math.random()").unwrap();
    assert_eq!(a, b);
}
