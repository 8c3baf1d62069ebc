//! Operators over plain values
//!
//! Everything here is free of side effects and needs no evaluation context,
//! so the parser's constant folder and the evaluator share it.

use std::cmp::Ordering;

use crate::error::JsError;
use crate::lisp::Op;
use crate::prelude::*;
use crate::value::{JsString, JsValue};

/// Apply a prefix operator that only reads its operand
pub fn unary(op: Op, value: &JsValue) -> Result<JsValue, JsError> {
    Ok(match op {
        Op::Not => JsValue::Boolean(!value.to_boolean()),
        Op::BitNot => JsValue::Number(f64::from(!value.to_int32())),
        Op::Positive => JsValue::Number(value.to_number()),
        Op::Negative => JsValue::Number(-value.to_number()),
        Op::Typeof => JsValue::from(value.type_of()),
        Op::Void => JsValue::Undefined,
        other => return Err(JsError::internal(format!("{other:?} is not a unary operator"))),
    })
}

/// Apply a binary operator. `in`, `instanceof` and the short-circuiting
/// operators need the evaluator and are not handled here.
pub fn binary(op: Op, left: &JsValue, right: &JsValue) -> Result<JsValue, JsError> {
    Ok(match op {
        Op::Add => add(left, right),
        Op::Sub => JsValue::Number(left.to_number() - right.to_number()),
        Op::Mul => JsValue::Number(left.to_number() * right.to_number()),
        Op::Div => JsValue::Number(left.to_number() / right.to_number()),
        Op::Mod => JsValue::Number(math::fmod(left.to_number(), right.to_number())),
        Op::Pow => JsValue::Number(math::powf(left.to_number(), right.to_number())),

        Op::Lt => JsValue::Boolean(compare(left, right) == Some(Ordering::Less)),
        Op::Gt => JsValue::Boolean(compare(left, right) == Some(Ordering::Greater)),
        Op::Le => JsValue::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        Op::Ge => JsValue::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),

        Op::Eq => JsValue::Boolean(left.loose_equals(right)),
        Op::Ne => JsValue::Boolean(!left.loose_equals(right)),
        Op::StrictEq => JsValue::Boolean(left.strict_equals(right)),
        Op::StrictNe => JsValue::Boolean(!left.strict_equals(right)),

        Op::BitAnd => JsValue::Number(f64::from(left.to_int32() & right.to_int32())),
        Op::BitOr => JsValue::Number(f64::from(left.to_int32() | right.to_int32())),
        Op::BitXor => JsValue::Number(f64::from(left.to_int32() ^ right.to_int32())),
        Op::Shl => JsValue::Number(f64::from(
            left.to_int32().wrapping_shl(right.to_uint32() & 31),
        )),
        Op::Shr => JsValue::Number(f64::from(
            left.to_int32().wrapping_shr(right.to_uint32() & 31),
        )),
        Op::UShr => JsValue::Number(f64::from(
            left.to_uint32().wrapping_shr(right.to_uint32() & 31),
        )),

        other => {
            return Err(JsError::internal(format!(
                "{other:?} is not a pure binary operator"
            )));
        }
    })
}

/// `+`: string concatenation if either primitive is a string
pub fn add(left: &JsValue, right: &JsValue) -> JsValue {
    let l = left.to_primitive();
    let r = right.to_primitive();
    match (&l, &r) {
        (JsValue::String(_), _) | (_, JsValue::String(_)) => {
            let mut s = l.to_js_string().to_string();
            s.push_str(r.to_js_string().as_str());
            JsValue::String(JsString::from(s))
        }
        _ => JsValue::Number(l.to_number() + r.to_number()),
    }
}

/// Abstract relational comparison; `None` when either side is NaN
pub fn compare(left: &JsValue, right: &JsValue) -> Option<Ordering> {
    let l = left.to_primitive();
    let r = right.to_primitive();
    if let (JsValue::String(a), JsValue::String(b)) = (&l, &r) {
        // Strings order by UTF-16 code units
        return Some(a.as_str().encode_utf16().cmp(b.as_str().encode_utf16()));
    }
    l.to_number().partial_cmp(&r.to_number())
}
