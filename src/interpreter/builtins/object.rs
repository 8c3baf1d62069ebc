//! Object constructor and Object.prototype methods

use crate::context::Exec;
use crate::error::JsError;
use crate::gate;
use crate::interpreter::builtins::arg;
use crate::interpreter::ops::iterate;
use crate::realm::Intrinsics;
use crate::value::{CheapClone, JsObjectRef, JsValue, ObjectKind, PropertyKey};

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let proto = &intrinsics.object_prototype;
    let ctor = intrinsics.constructor("Object", object_call, Some(object_call), 1, proto);

    intrinsics.register_method(&ctor, "keys", object_keys, 1);
    intrinsics.register_method(&ctor, "values", object_values, 1);
    intrinsics.register_method(&ctor, "entries", object_entries, 1);
    intrinsics.register_method(&ctor, "fromEntries", object_from_entries, 1);
    intrinsics.register_method(&ctor, "getOwnPropertyNames", object_get_own_property_names, 1);
    intrinsics.register_method(&ctor, "is", object_is, 2);
    intrinsics.register_method(&ctor, "assign", object_assign, 2);
    intrinsics.register_method(&ctor, "create", object_create, 1);
    intrinsics.register_method(&ctor, "getPrototypeOf", object_get_prototype_of, 1);

    intrinsics.register_method(proto, "hasOwnProperty", object_has_own_property, 1);
    intrinsics.register_method(proto, "isPrototypeOf", object_is_prototype_of, 1);
    intrinsics.register_method(proto, "propertyIsEnumerable", object_property_is_enumerable, 1);
    intrinsics.register_method(proto, "toString", object_to_string, 0);
    intrinsics.register_method(proto, "toLocaleString", object_to_string, 0);
    intrinsics.register_method(proto, "valueOf", object_value_of, 0);

    global.define_hidden("Object", JsValue::Object(ctor));
}

/// `Object(value)` and `new Object(value)`
fn object_call(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let intrinsics = &exec.realm().intrinsics;
    Ok(match arg(args, 0) {
        JsValue::Object(obj) => JsValue::Object(obj),
        JsValue::Null | JsValue::Undefined => JsValue::Object(intrinsics.object()),
        primitive => intrinsics
            .box_primitive(&primitive)
            .map_or(JsValue::Undefined, JsValue::Object),
    })
}

/// Enumerable own keys as strings; primitives other than strings have none
fn keys_of(value: &JsValue) -> Result<(Option<JsObjectRef>, Vec<PropertyKey>), JsError> {
    match value {
        JsValue::Null | JsValue::Undefined => Err(JsError::type_error(
            "Cannot convert undefined or null to object",
        )),
        JsValue::Object(obj) => Ok((Some(obj.cheap_clone()), obj.own_keys())),
        JsValue::String(s) => Ok((None, (0..s.utf16_len() as u32).map(PropertyKey::Index).collect())),
        _ => Ok((None, Vec::new())),
    }
}

fn read(value: &JsValue, owner: &Option<JsObjectRef>, key: &PropertyKey) -> JsValue {
    match (owner, value) {
        (Some(obj), _) => obj.get(key),
        (None, JsValue::String(s)) => match key {
            PropertyKey::Index(i) => s.code_unit_at(*i as usize).map_or(JsValue::Undefined, JsValue::String),
            PropertyKey::String(_) => JsValue::Undefined,
        },
        _ => JsValue::Undefined,
    }
}

pub fn object_keys(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, keys) = keys_of(&arg(args, 0))?;
    let keys = keys.iter().map(PropertyKey::to_value).collect();
    Ok(exec.realm().intrinsics.array_value(keys))
}

pub fn object_values(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    let (owner, keys) = keys_of(&target)?;
    let values = keys.iter().map(|k| read(&target, &owner, k)).collect();
    Ok(exec.realm().intrinsics.array_value(values))
}

pub fn object_entries(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let intrinsics = &exec.realm().intrinsics;
    let target = arg(args, 0);
    let (owner, keys) = keys_of(&target)?;
    let entries = keys
        .iter()
        .map(|k| intrinsics.array_value(vec![k.to_value(), read(&target, &owner, k)]))
        .collect();
    Ok(intrinsics.array_value(entries))
}

pub fn object_from_entries(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = exec.realm().intrinsics.object();
    for entry in iterate(&arg(args, 0))? {
        let Some(pair) = entry.as_object() else {
            return Err(JsError::type_error(format!(
                "Iterator value {entry} is not an entry object"
            )));
        };
        let key = PropertyKey::from_value(&pair.get(&PropertyKey::Index(0)));
        obj.set(key, pair.get(&PropertyKey::Index(1)));
    }
    Ok(JsValue::Object(obj))
}

pub fn object_get_own_property_names(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    let (owner, mut keys) = keys_of(&target)?;
    if let Some(obj) = owner {
        let borrowed = obj.borrow();
        for key in borrowed.properties.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        if matches!(borrowed.kind, ObjectKind::Array(_) | ObjectKind::String(_)) {
            keys.push(PropertyKey::from("length"));
        }
    } else if matches!(target, JsValue::String(_)) {
        keys.push(PropertyKey::from("length"));
    }
    let names = keys.iter().map(PropertyKey::to_value).collect();
    Ok(exec.realm().intrinsics.array_value(names))
}

/// SameValue
pub fn object_is(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (a, b) = (arg(args, 0), arg(args, 1));
    let same = match (&a, &b) {
        (JsValue::Number(x), JsValue::Number(y)) => {
            (x.is_nan() && y.is_nan()) || (x == y && x.is_sign_negative() == y.is_sign_negative())
        }
        _ => a.strict_equals(&b),
    };
    Ok(JsValue::Boolean(same))
}

pub fn object_assign(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(target) = arg(args, 0) else {
        return Err(JsError::type_error("Cannot convert undefined or null to object"));
    };
    gate::check_write_target(exec, &target)?;
    for source in args.iter().skip(1) {
        if let JsValue::Object(src) = source {
            for key in src.own_keys() {
                target.set(key.clone(), src.get(&key));
            }
        }
    }
    Ok(JsValue::Object(target))
}

pub fn object_create(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let proto = match arg(args, 0) {
        JsValue::Object(proto) => Some(proto),
        JsValue::Null => None,
        other => {
            return Err(JsError::type_error(format!(
                "Object prototype may only be an Object or null: {other}"
            )));
        }
    };
    Ok(JsValue::Object(JsObjectRef::new(ObjectKind::Ordinary, proto)))
}

pub fn object_get_prototype_of(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let intrinsics = &exec.realm().intrinsics;
    let proto = match arg(args, 0) {
        JsValue::Object(obj) => obj.prototype(),
        JsValue::Null | JsValue::Undefined => {
            return Err(JsError::type_error("Cannot convert undefined or null to object"));
        }
        primitive => intrinsics.box_primitive(&primitive).and_then(|b| b.prototype()),
    };
    Ok(proto.map_or(JsValue::Null, JsValue::Object))
}

pub fn object_has_own_property(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let key = PropertyKey::from_value(&arg(args, 0));
    let own = match &this {
        JsValue::Object(obj) => obj.has_own(&key),
        JsValue::String(s) => match &key {
            PropertyKey::Index(i) => (*i as usize) < s.utf16_len(),
            PropertyKey::String(k) => k.as_str() == "length",
        },
        _ => false,
    };
    Ok(JsValue::Boolean(own))
}

pub fn object_is_prototype_of(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (JsValue::Object(proto), JsValue::Object(obj)) = (&this, &arg(args, 0)) else {
        return Ok(JsValue::Boolean(false));
    };
    let mut current = obj.prototype();
    while let Some(p) = current {
        if p.ptr_eq(proto) {
            return Ok(JsValue::Boolean(true));
        }
        current = p.prototype();
    }
    Ok(JsValue::Boolean(false))
}

pub fn object_property_is_enumerable(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let key = PropertyKey::from_value(&arg(args, 0));
    let enumerable = match &this {
        JsValue::Object(obj) => obj.own_keys().contains(&key),
        _ => false,
    };
    Ok(JsValue::Boolean(enumerable))
}

pub fn object_to_string(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let tag = match &this {
        JsValue::Undefined => "Undefined",
        JsValue::Null => "Null",
        JsValue::Boolean(_) => "Boolean",
        JsValue::Number(_) => "Number",
        JsValue::String(_) => "String",
        JsValue::Object(obj) => obj.class_name(),
    };
    Ok(JsValue::from(format!("[object {tag}]")))
}

pub fn object_value_of(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(this)
}
