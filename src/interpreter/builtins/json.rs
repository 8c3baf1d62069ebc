//! JSON built-in methods, converting through `serde_json::Value`

use serde::Serialize;
use serde_json::Value;

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins::arg;
use crate::interpreter::function::call_function;
use crate::realm::Intrinsics;
use crate::value::{CheapClone, JsObjectRef, JsValue, PropertyKey};

/// Largest integer serialized without a fractional part
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let json = intrinsics.object();
    intrinsics.register_method(&json, "stringify", json_stringify, 3);
    intrinsics.register_method(&json, "parse", json_parse, 2);
    global.define_hidden("JSON", JsValue::Object(json));
}

// ═══════════════════════════════════════════════════════════════════════════════
// stringify
// ═══════════════════════════════════════════════════════════════════════════════

enum Replacer {
    None,
    Function(JsValue),
    Keys(Vec<PropertyKey>),
}

struct Stringifier<'a> {
    exec: &'a Exec,
    replacer: Replacer,
    stack: Vec<JsObjectRef>,
}

fn number_value(n: f64) -> Value {
    if !n.is_finite() {
        return Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
}

impl Stringifier<'_> {
    /// Convert one value; `None` means "leave it out"
    fn convert(&mut self, holder: &JsValue, key: &PropertyKey, value: JsValue) -> Result<Option<Value>, JsError> {
        let value = match &self.replacer {
            Replacer::Function(f) => call_function(self.exec, f, holder.cheap_clone(), &[key.to_value(), value])?,
            _ => value,
        };
        Ok(match value {
            JsValue::Undefined => None,
            JsValue::Null => Some(Value::Null),
            JsValue::Boolean(b) => Some(Value::Bool(b)),
            JsValue::Number(n) => Some(number_value(n)),
            JsValue::String(s) => Some(Value::String(s.to_string())),
            JsValue::Object(obj) => {
                if obj.is_callable() {
                    return Ok(None);
                }
                if let Some(prim) = obj.primitive_value() {
                    return self.convert_primitive(prim);
                }
                Some(self.convert_object(&obj)?)
            }
        })
    }

    fn convert_primitive(&mut self, prim: JsValue) -> Result<Option<Value>, JsError> {
        Ok(match prim {
            JsValue::Boolean(b) => Some(Value::Bool(b)),
            JsValue::Number(n) => Some(number_value(n)),
            JsValue::String(s) => Some(Value::String(s.to_string())),
            _ => None,
        })
    }

    fn convert_object(&mut self, obj: &JsObjectRef) -> Result<Value, JsError> {
        if self.stack.iter().any(|o| o.ptr_eq(obj)) {
            return Err(JsError::type_error("Converting circular structure to JSON"));
        }
        self.stack.push(obj.cheap_clone());
        let holder = JsValue::Object(obj.cheap_clone());
        let result = if let Some(items) = obj.array_elements() {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let key = PropertyKey::Index(i as u32);
                out.push(self.convert(&holder, &key, item)?.unwrap_or(Value::Null));
            }
            Value::Array(out)
        } else {
            let keys = match &self.replacer {
                Replacer::Keys(keys) => keys.iter().filter(|k| obj.has_own(k)).cloned().collect(),
                _ => obj.own_keys(),
            };
            let mut map = serde_json::Map::new();
            for key in keys {
                let value = obj.get(&key);
                if let Some(converted) = self.convert(&holder, &key, value)? {
                    map.insert(key.to_string(), converted);
                }
            }
            Value::Object(map)
        };
        self.stack.pop();
        Ok(result)
    }
}

/// Convert a script value to JSON; `None` for values JSON leaves out
pub fn to_json(exec: &Exec, value: JsValue) -> Result<Option<Value>, JsError> {
    let mut stringifier = Stringifier {
        exec,
        replacer: Replacer::None,
        stack: Vec::new(),
    };
    let holder = JsValue::Object(exec.realm().intrinsics.object());
    stringifier.convert(&holder, &PropertyKey::from(""), value)
}

fn indent_of(space: &JsValue) -> String {
    match space {
        JsValue::Number(n) if *n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        JsValue::String(s) => s.as_str().chars().take(10).collect(),
        _ => String::new(),
    }
}

fn render(value: &Value, indent: &str) -> Result<String, JsError> {
    let failed = |e: serde_json::Error| JsError::internal(format!("JSON serialization failed: {e}"));
    if indent.is_empty() {
        return serde_json::to_string(value).map_err(failed);
    }
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer).map_err(failed)?;
    String::from_utf8(out).map_err(|e| JsError::internal(format!("JSON output is not UTF-8: {e}")))
}

pub fn json_stringify(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let replacer = match arg(args, 1) {
        f if f.is_callable() => Replacer::Function(f),
        JsValue::Object(list) => match list.array_elements() {
            Some(items) => Replacer::Keys(
                items
                    .iter()
                    .filter(|v| matches!(v, JsValue::String(_) | JsValue::Number(_)))
                    .map(PropertyKey::from_value)
                    .collect(),
            ),
            None => Replacer::None,
        },
        _ => Replacer::None,
    };
    let mut stringifier = Stringifier {
        exec,
        replacer,
        stack: Vec::new(),
    };
    let root = exec.realm().intrinsics.object();
    let holder = JsValue::Object(root);
    let converted = stringifier.convert(&holder, &PropertyKey::from(""), arg(args, 0))?;
    match converted {
        Some(value) => Ok(JsValue::from(render(&value, &indent_of(&arg(args, 2)))?)),
        None => Ok(JsValue::Undefined),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// parse
// ═══════════════════════════════════════════════════════════════════════════════

/// Build a script value from parsed JSON
pub fn from_json(intrinsics: &Intrinsics, value: Value) -> JsValue {
    match value {
        Value::Null => JsValue::Null,
        Value::Bool(b) => JsValue::Boolean(b),
        Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => JsValue::from(s),
        Value::Array(items) => {
            intrinsics.array_value(items.into_iter().map(|v| from_json(intrinsics, v)).collect())
        }
        Value::Object(map) => {
            let obj = intrinsics.object();
            for (key, value) in map {
                obj.set(PropertyKey::from(key.as_str()), from_json(intrinsics, value));
            }
            JsValue::Object(obj)
        }
    }
}

/// Walk a parsed value bottom-up through the reviver
fn revive(exec: &Exec, reviver: &JsValue, holder: &JsObjectRef, key: PropertyKey) -> Result<JsValue, JsError> {
    let value = holder.get(&key);
    if let JsValue::Object(obj) = &value {
        for child in obj.own_keys() {
            let revived = revive(exec, reviver, obj, child.clone())?;
            match revived {
                JsValue::Undefined => {
                    obj.delete(&child);
                }
                other => obj.set(child, other),
            }
        }
    }
    call_function(exec, reviver, JsValue::Object(holder.cheap_clone()), &[key.to_value(), value])
}

pub fn json_parse(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = arg(args, 0).to_js_string();
    let parsed: Value = serde_json::from_str(text.as_str())
        .map_err(|e| JsError::syntax_error(format!("{e} in JSON")))?;
    let value = from_json(&exec.realm().intrinsics, parsed);
    let reviver = arg(args, 1);
    if !reviver.is_callable() {
        return Ok(value);
    }
    let root = exec.realm().intrinsics.object();
    root.set_str("", value);
    revive(exec, &reviver, &root, PropertyKey::from(""))
}
