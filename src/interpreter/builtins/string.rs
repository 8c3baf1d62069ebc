//! String constructor and String.prototype methods
//!
//! Indices and lengths count UTF-16 code units.

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins::regexp::{Found, create_regexp, find_all, find_at, match_array, utf16_offset};
use crate::interpreter::builtins::{arg, relative_index};
use crate::interpreter::function::call_function;
use crate::prelude::*;
use crate::realm::Intrinsics;
use crate::value::{JsObjectRef, JsString, JsValue, RegExpData};

/// Longest string `repeat` and the padding methods will build
const MAX_STRING_LENGTH: usize = 1 << 28;

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let proto = &intrinsics.string_prototype;
    let ctor = intrinsics.constructor("String", string_call, Some(string_construct), 1, proto);

    intrinsics.register_method(&ctor, "fromCharCode", string_from_char_code, 1);

    intrinsics.register_method(proto, "charAt", string_char_at, 1);
    intrinsics.register_method(proto, "charCodeAt", string_char_code_at, 1);
    intrinsics.register_method(proto, "indexOf", string_index_of, 1);
    intrinsics.register_method(proto, "lastIndexOf", string_last_index_of, 1);
    intrinsics.register_method(proto, "includes", string_includes, 1);
    intrinsics.register_method(proto, "startsWith", string_starts_with, 1);
    intrinsics.register_method(proto, "endsWith", string_ends_with, 1);
    intrinsics.register_method(proto, "slice", string_slice, 2);
    intrinsics.register_method(proto, "substring", string_substring, 2);
    intrinsics.register_method(proto, "substr", string_substr, 2);
    intrinsics.register_method(proto, "toUpperCase", string_to_upper_case, 0);
    intrinsics.register_method(proto, "toLowerCase", string_to_lower_case, 0);
    intrinsics.register_method(proto, "trim", string_trim, 0);
    intrinsics.register_method(proto, "trimStart", string_trim_start, 0);
    intrinsics.register_method(proto, "trimEnd", string_trim_end, 0);
    intrinsics.register_method(proto, "split", string_split, 2);
    intrinsics.register_method(proto, "replace", string_replace, 2);
    intrinsics.register_method(proto, "match", string_match, 1);
    intrinsics.register_method(proto, "repeat", string_repeat, 1);
    intrinsics.register_method(proto, "padStart", string_pad_start, 2);
    intrinsics.register_method(proto, "padEnd", string_pad_end, 2);
    intrinsics.register_method(proto, "concat", string_concat, 1);
    intrinsics.register_method(proto, "toString", string_value_of, 0);
    intrinsics.register_method(proto, "valueOf", string_value_of, 0);

    global.define_hidden("String", JsValue::Object(ctor));
}

// ─── Helpers ───────────────────────────────────────────────────────────────────

/// The string a method operates on
fn this_string(this: &JsValue, method: &str) -> Result<JsString, JsError> {
    match this {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Null | JsValue::Undefined => Err(JsError::type_error(format!(
            "String.prototype.{method} called on null or undefined"
        ))),
        JsValue::Object(obj) => match obj.primitive_value() {
            Some(JsValue::String(s)) => Ok(s),
            _ => Ok(this.to_js_string()),
        },
        other => Ok(other.to_js_string()),
    }
}

fn units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn from_units(units: &[u16]) -> JsValue {
    JsValue::from(String::from_utf16_lossy(units))
}

/// Position of `needle` in `hay` at or after `from`
fn find_units(hay: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= hay.len()).then_some(from);
    }
    (from..=hay.len().checked_sub(needle.len())?).find(|&i| hay.get(i..i + needle.len()) == Some(needle))
}

fn rfind_units(hay: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    let last = hay.len().checked_sub(needle.len())?;
    (0..=last.min(from)).rev().find(|&i| hay.get(i..i + needle.len()) == Some(needle))
}

/// Integer argument with `undefined` as `default`
fn integer(value: &JsValue, default: f64) -> f64 {
    match value {
        JsValue::Undefined => default,
        other => {
            let n = other.to_number();
            if n.is_nan() { 0.0 } else { math::trunc(n) }
        }
    }
}

fn clamp(n: f64, len: usize) -> usize {
    n.max(0.0).min(len as f64) as usize
}

fn as_regexp(value: &JsValue) -> Option<Rc<RegExpData>> {
    value.as_object().and_then(JsObjectRef::regexp)
}

// ─── Constructor ───────────────────────────────────────────────────────────────

fn string_call(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(match args.first() {
        Some(value) => JsValue::String(value.to_js_string()),
        None => JsValue::from(""),
    })
}

fn string_construct(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = string_call(exec, this, args)?;
    Ok(exec
        .realm()
        .intrinsics
        .box_primitive(&value)
        .map_or(value, JsValue::Object))
}

fn string_from_char_code(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let codes: Vec<u16> = args.iter().map(|a| a.to_uint32() as u16).collect();
    Ok(from_units(&codes))
}

// ─── Access ────────────────────────────────────────────────────────────────────

fn string_char_at(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(&this, "charAt")?;
    let i = integer(&arg(args, 0), 0.0);
    if i < 0.0 {
        return Ok(JsValue::from(""));
    }
    Ok(s.code_unit_at(i as usize).map_or_else(|| JsValue::from(""), JsValue::String))
}

fn string_char_code_at(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(&this, "charCodeAt")?;
    let i = integer(&arg(args, 0), 0.0);
    let code = if i < 0.0 { None } else { units(s.as_str()).get(i as usize).copied() };
    Ok(JsValue::Number(code.map_or(f64::NAN, f64::from)))
}

fn string_index_of(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let hay = units(this_string(&this, "indexOf")?.as_str());
    let needle = units(arg(args, 0).to_js_string().as_str());
    let from = clamp(integer(&arg(args, 1), 0.0), hay.len());
    Ok(JsValue::Number(find_units(&hay, &needle, from).map_or(-1.0, |i| i as f64)))
}

fn string_last_index_of(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let hay = units(this_string(&this, "lastIndexOf")?.as_str());
    let needle = units(arg(args, 0).to_js_string().as_str());
    let from = match arg(args, 1).to_number() {
        n if n.is_nan() => hay.len(),
        n => clamp(n, hay.len()),
    };
    Ok(JsValue::Number(rfind_units(&hay, &needle, from).map_or(-1.0, |i| i as f64)))
}

fn string_includes(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let hay = units(this_string(&this, "includes")?.as_str());
    let needle = units(arg(args, 0).to_js_string().as_str());
    let from = clamp(integer(&arg(args, 1), 0.0), hay.len());
    Ok(JsValue::Boolean(find_units(&hay, &needle, from).is_some()))
}

fn string_starts_with(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let hay = units(this_string(&this, "startsWith")?.as_str());
    let needle = units(arg(args, 0).to_js_string().as_str());
    let from = clamp(integer(&arg(args, 1), 0.0), hay.len());
    Ok(JsValue::Boolean(hay.get(from..).is_some_and(|rest| rest.starts_with(&needle))))
}

fn string_ends_with(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let hay = units(this_string(&this, "endsWith")?.as_str());
    let needle = units(arg(args, 0).to_js_string().as_str());
    let end = clamp(integer(&arg(args, 1), hay.len() as f64), hay.len());
    Ok(JsValue::Boolean(hay.get(..end).is_some_and(|head| head.ends_with(&needle))))
}

// ─── Extraction ────────────────────────────────────────────────────────────────

fn string_slice(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = units(this_string(&this, "slice")?.as_str());
    let start = relative_index(&arg(args, 0), s.len(), 0);
    let end = relative_index(&arg(args, 1), s.len(), s.len());
    Ok(from_units(s.get(start..end.max(start)).unwrap_or(&[])))
}

fn string_substring(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = units(this_string(&this, "substring")?.as_str());
    let a = clamp(integer(&arg(args, 0), 0.0), s.len());
    let b = clamp(integer(&arg(args, 1), s.len() as f64), s.len());
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    Ok(from_units(s.get(start..end).unwrap_or(&[])))
}

fn string_substr(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = units(this_string(&this, "substr")?.as_str());
    let start = relative_index(&arg(args, 0), s.len(), 0);
    let count = clamp(integer(&arg(args, 1), s.len() as f64), s.len() - start);
    Ok(from_units(s.get(start..start + count).unwrap_or(&[])))
}

// ─── Transformation ────────────────────────────────────────────────────────────

fn string_to_upper_case(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "toUpperCase")?.as_str().to_uppercase()))
}

fn string_to_lower_case(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "toLowerCase")?.as_str().to_lowercase()))
}

fn string_trim(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "trim")?.as_str().trim()))
}

fn string_trim_start(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "trimStart")?.as_str().trim_start()))
}

fn string_trim_end(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::from(this_string(&this, "trimEnd")?.as_str().trim_end()))
}

fn string_repeat(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(&this, "repeat")?;
    let count = integer(&arg(args, 0), 0.0);
    if count < 0.0 || count.is_infinite() {
        return Err(JsError::range_error(format!("Invalid count value: {count}")));
    }
    if s.len().saturating_mul(count as usize) > MAX_STRING_LENGTH {
        return Err(JsError::range_error("Invalid string length"));
    }
    Ok(JsValue::from(s.as_str().repeat(count as usize)))
}

fn pad(this: &JsValue, args: &[JsValue], method: &str, at_start: bool) -> Result<JsValue, JsError> {
    let s = units(this_string(this, method)?.as_str());
    let target = integer(&arg(args, 0), 0.0);
    if target > MAX_STRING_LENGTH as f64 {
        return Err(JsError::range_error("Invalid string length"));
    }
    let target = clamp(target, MAX_STRING_LENGTH);
    let filler = match arg(args, 1) {
        JsValue::Undefined => vec![u16::from(b' ')],
        other => units(other.to_js_string().as_str()),
    };
    if target <= s.len() || filler.is_empty() {
        return Ok(from_units(&s));
    }
    let padding: Vec<u16> = filler.iter().copied().cycle().take(target - s.len()).collect();
    let joined = if at_start { [padding, s].concat() } else { [s, padding].concat() };
    Ok(from_units(&joined))
}

fn string_pad_start(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    pad(&this, args, "padStart", true)
}

fn string_pad_end(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    pad(&this, args, "padEnd", false)
}

fn string_concat(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut s = this_string(&this, "concat")?.to_string();
    for value in args {
        s.push_str(value.to_js_string().as_str());
    }
    Ok(JsValue::from(s))
}

fn string_value_of(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    match &this {
        JsValue::String(s) => Ok(JsValue::String(s.clone())),
        JsValue::Object(obj) => match obj.primitive_value() {
            Some(JsValue::String(s)) => Ok(JsValue::String(s)),
            _ => Err(JsError::type_error("String.prototype.valueOf requires that 'this' be a String")),
        },
        _ => Err(JsError::type_error("String.prototype.valueOf requires that 'this' be a String")),
    }
}

// ─── Patterns ──────────────────────────────────────────────────────────────────

fn string_split(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(&this, "split")?;
    let separator = arg(args, 0);
    let limit = match arg(args, 1) {
        JsValue::Undefined => usize::MAX,
        other => other.to_uint32() as usize,
    };
    let text = s.as_str();
    let parts: Vec<JsValue> = if matches!(separator, JsValue::Undefined) {
        vec![JsValue::String(s.clone())]
    } else if let Some(data) = as_regexp(&separator) {
        let mut parts = Vec::new();
        let mut last = 0;
        for found in find_all(&data, text)? {
            if found.end == found.start && (found.start == 0 || found.start >= text.len()) {
                continue;
            }
            parts.push(JsValue::from(text.get(last..found.start).unwrap_or("")));
            parts.extend(
                found
                    .groups
                    .iter()
                    .skip(1)
                    .map(|g| g.as_deref().map_or(JsValue::Undefined, JsValue::from)),
            );
            last = found.end;
        }
        parts.push(JsValue::from(text.get(last..).unwrap_or("")));
        parts
    } else {
        let sep = separator.to_js_string();
        if sep.is_empty() {
            units(text).iter().map(|u| from_units(std::slice::from_ref(u))).collect()
        } else {
            text.split(sep.as_str()).map(JsValue::from).collect()
        }
    };
    let parts = parts.into_iter().take(limit).collect();
    Ok(exec.realm().intrinsics.array_value(parts))
}

/// Expand `$&`, `$n` and `$$` in a replacement template
fn expand_template(template: &str, found: &Found, text: &str) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(found.text());
            }
            Some('`') => {
                chars.next();
                out.push_str(text.get(..found.start).unwrap_or(""));
            }
            Some('\'') => {
                chars.next();
                out.push_str(text.get(found.end..).unwrap_or(""));
            }
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                let mut index = d.to_digit(10).unwrap_or(0) as usize;
                if let Some(next) = chars.peek().and_then(|c| c.to_digit(10)) {
                    let two = index * 10 + next as usize;
                    if two < found.groups.len() {
                        chars.next();
                        index = two;
                    }
                }
                match found.groups.get(index) {
                    Some(group) if index > 0 => out.push_str(group.as_deref().unwrap_or("")),
                    _ => {
                        out.push('$');
                        out.push(d);
                    }
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

fn replacement(exec: &Exec, replacer: &JsValue, found: &Found, text: &str) -> Result<String, JsError> {
    if !replacer.is_callable() {
        return Ok(expand_template(replacer.to_js_string().as_str(), found, text));
    }
    let mut args: Vec<JsValue> = found
        .groups
        .iter()
        .map(|g| g.as_deref().map_or(JsValue::Undefined, JsValue::from))
        .collect();
    args.push(JsValue::from(found.index));
    args.push(JsValue::from(text));
    let result = call_function(exec, replacer, JsValue::Undefined, &args)?;
    Ok(result.to_js_string().to_string())
}

fn string_replace(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(&this, "replace")?;
    let text = s.as_str();
    let pattern = arg(args, 0);
    let replacer = arg(args, 1);

    let matches = match as_regexp(&pattern) {
        Some(data) if data.global() => find_all(&data, text)?,
        Some(data) => find_at(&data, text, 0)?.into_iter().collect(),
        None => {
            let needle = pattern.to_js_string();
            text.find(needle.as_str())
                .map(|start| Found {
                    start,
                    end: start + needle.len(),
                    index: utf16_offset(text, start),
                    groups: vec![Some(needle.to_string())],
                    named: Vec::new(),
                })
                .into_iter()
                .collect()
        }
    };

    let mut out = String::new();
    let mut last = 0;
    for found in &matches {
        out.push_str(text.get(last..found.start).unwrap_or(""));
        out.push_str(&replacement(exec, &replacer, found, text)?);
        last = found.end;
    }
    out.push_str(text.get(last..).unwrap_or(""));
    Ok(JsValue::from(out))
}

fn string_match(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let s = this_string(&this, "match")?;
    let text = s.as_str();
    let pattern = arg(args, 0);
    let data = match as_regexp(&pattern) {
        Some(data) => data,
        None => {
            let source = match &pattern {
                JsValue::Undefined => String::new(),
                other => other.to_js_string().to_string(),
            };
            let compiled = create_regexp(exec, &source, "")?;
            as_regexp(&compiled).ok_or_else(|| JsError::internal("regexp construction failed"))?
        }
    };
    if data.global() {
        let all = find_all(&data, text)?;
        if all.is_empty() {
            return Ok(JsValue::Null);
        }
        let items = all.iter().map(|f| JsValue::from(f.text())).collect();
        return Ok(exec.realm().intrinsics.array_value(items));
    }
    Ok(match find_at(&data, text, 0)? {
        Some(found) => match_array(exec, &found, text),
        None => JsValue::Null,
    })
}
