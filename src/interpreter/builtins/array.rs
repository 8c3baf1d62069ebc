//! Array constructor and Array.prototype methods

use std::cmp::Ordering;

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins::{arg, relative_index, this_object};
use crate::interpreter::function::call_function;
use crate::interpreter::operators::compare;
use crate::interpreter::ops::iterate;
use crate::realm::Intrinsics;
use crate::value::{CheapClone, JsObjectRef, JsValue, ObjectKind};

/// Longest array `Array(n)` will allocate
const MAX_ARRAY_LENGTH: usize = 1 << 24;

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let proto = &intrinsics.array_prototype;
    let ctor = intrinsics.constructor("Array", array_constructor, Some(array_constructor), 1, proto);

    intrinsics.register_method(&ctor, "isArray", array_is_array, 1);
    intrinsics.register_method(&ctor, "of", array_of, 0);
    intrinsics.register_method(&ctor, "from", array_from, 1);

    // Mutators
    intrinsics.register_method(proto, "push", array_push, 1);
    intrinsics.register_method(proto, "pop", array_pop, 0);
    intrinsics.register_method(proto, "shift", array_shift, 0);
    intrinsics.register_method(proto, "unshift", array_unshift, 1);
    intrinsics.register_method(proto, "splice", array_splice, 2);
    intrinsics.register_method(proto, "reverse", array_reverse, 0);
    intrinsics.register_method(proto, "sort", array_sort, 1);
    intrinsics.register_method(proto, "copyWithin", array_copy_within, 2);
    intrinsics.register_method(proto, "fill", array_fill, 1);

    // Accessors
    intrinsics.register_method(proto, "slice", array_slice, 2);
    intrinsics.register_method(proto, "concat", array_concat, 1);
    intrinsics.register_method(proto, "join", array_join, 1);
    intrinsics.register_method(proto, "toString", array_to_string, 0);
    intrinsics.register_method(proto, "indexOf", array_index_of, 1);
    intrinsics.register_method(proto, "lastIndexOf", array_last_index_of, 1);
    intrinsics.register_method(proto, "includes", array_includes, 1);

    // Iteration
    intrinsics.register_method(proto, "forEach", array_for_each, 1);
    intrinsics.register_method(proto, "map", array_map, 1);
    intrinsics.register_method(proto, "filter", array_filter, 1);
    intrinsics.register_method(proto, "find", array_find, 1);
    intrinsics.register_method(proto, "findIndex", array_find_index, 1);
    intrinsics.register_method(proto, "some", array_some, 1);
    intrinsics.register_method(proto, "every", array_every, 1);
    intrinsics.register_method(proto, "reduce", array_reduce, 1);
    intrinsics.register_method(proto, "reduceRight", array_reduce_right, 1);

    global.define_hidden("Array", JsValue::Object(ctor));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Snapshot of the receiver's elements
fn elements(this: &JsValue, method: &str) -> Result<(JsObjectRef, Vec<JsValue>), JsError> {
    let obj = this_object(this, method)?;
    let items = obj
        .array_elements()
        .ok_or_else(|| JsError::type_error(format!("{method} called on non-array")))?;
    Ok((obj, items))
}

/// Run `f` on the receiver's element vector in place
fn mutate<R>(this: &JsValue, method: &str, f: impl FnOnce(&mut Vec<JsValue>) -> R) -> Result<R, JsError> {
    let obj = this_object(this, method)?;
    let mut borrowed = obj.borrow_mut();
    match &mut borrowed.kind {
        ObjectKind::Array(items) => Ok(f(items)),
        _ => Err(JsError::type_error(format!("{method} called on non-array"))),
    }
}

fn callback(args: &[JsValue], method: &str) -> Result<JsValue, JsError> {
    let f = arg(args, 0);
    if !f.is_callable() {
        return Err(JsError::type_error(format!(
            "{} is not a function (in Array.prototype.{method})",
            f
        )));
    }
    Ok(f)
}

/// Call the element callback of an iteration method
fn visit(exec: &Exec, f: &JsValue, this_arg: &JsValue, item: &JsValue, i: usize, array: &JsValue) -> Result<JsValue, JsError> {
    call_function(
        exec,
        f,
        this_arg.cheap_clone(),
        &[item.cheap_clone(), JsValue::from(i), array.cheap_clone()],
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constructor
// ═══════════════════════════════════════════════════════════════════════════════

fn array_constructor(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let intrinsics = &exec.realm().intrinsics;
    if let [JsValue::Number(n)] = args {
        let len = *n as usize;
        if n.fract() != 0.0 || *n < 0.0 || len > MAX_ARRAY_LENGTH {
            return Err(JsError::range_error("Invalid array length"));
        }
        return Ok(intrinsics.array_value(vec![JsValue::Undefined; len]));
    }
    Ok(intrinsics.array_value(args.to_vec()))
}

fn array_is_array(_exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(arg(args, 0).as_object().is_some_and(JsObjectRef::is_array)))
}

fn array_of(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(exec.realm().intrinsics.array_value(args.to_vec()))
}

fn array_from(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let source = arg(args, 0);
    let items = match &source {
        JsValue::Object(obj) if !obj.is_array() => {
            // Array-likes: anything with a length
            let len = obj.get_str("length").to_number();
            let len = if len.is_finite() && len > 0.0 { (len as usize).min(MAX_ARRAY_LENGTH) } else { 0 };
            (0..len).map(|i| obj.get(&(i as u32).into())).collect()
        }
        _ => iterate(&source)?,
    };
    let map = arg(args, 1);
    let items = if map.is_callable() {
        let this_arg = arg(args, 2);
        let mut mapped = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            mapped.push(call_function(exec, &map, this_arg.cheap_clone(), &[item.cheap_clone(), JsValue::from(i)])?);
        }
        mapped
    } else {
        items
    };
    Ok(exec.realm().intrinsics.array_value(items))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Mutators
// ═══════════════════════════════════════════════════════════════════════════════

fn array_push(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let len = mutate(&this, "Array.prototype.push", |items| {
        items.extend_from_slice(args);
        items.len()
    })?;
    Ok(JsValue::from(len))
}

fn array_pop(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let popped = mutate(&this, "Array.prototype.pop", Vec::pop)?;
    Ok(popped.unwrap_or_default())
}

fn array_shift(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let shifted = mutate(&this, "Array.prototype.shift", |items| {
        (!items.is_empty()).then(|| items.remove(0))
    })?;
    Ok(shifted.unwrap_or_default())
}

fn array_unshift(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let len = mutate(&this, "Array.prototype.unshift", |items| {
        items.splice(0..0, args.iter().cloned());
        items.len()
    })?;
    Ok(JsValue::from(len))
}

fn array_splice(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let removed = mutate(&this, "Array.prototype.splice", |items| {
        let len = items.len();
        let start = relative_index(&arg(args, 0), len, 0);
        let delete_count = match args.len() {
            0 => 0,
            1 => len - start,
            _ => {
                let n = arg(args, 1).to_number();
                if n.is_nan() || n <= 0.0 { 0 } else { (n as usize).min(len - start) }
            }
        };
        let added = args.get(2..).unwrap_or(&[]).iter().cloned();
        items.splice(start..start + delete_count, added).collect::<Vec<_>>()
    })?;
    Ok(exec.realm().intrinsics.array_value(removed))
}

fn array_reverse(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    mutate(&this, "Array.prototype.reverse", |items| items.reverse())?;
    Ok(this)
}

/// Default order: by string value, `undefined` last
fn default_order(a: &JsValue, b: &JsValue) -> Ordering {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) => Ordering::Equal,
        (JsValue::Undefined, _) => Ordering::Greater,
        (_, JsValue::Undefined) => Ordering::Less,
        _ => a.to_js_string().as_str().cmp(b.to_js_string().as_str()),
    }
}

/// Stable merge sort with a comparator that may fail
fn merge_sort<F>(items: Vec<JsValue>, cmp: &mut F) -> Result<Vec<JsValue>, JsError>
where
    F: FnMut(&JsValue, &JsValue) -> Result<Ordering, JsError>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let next = if cmp(a, b)? == Ordering::Greater { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn array_sort(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let comparator = arg(args, 0);
    if !matches!(comparator, JsValue::Undefined) && !comparator.is_callable() {
        return Err(JsError::type_error(
            "The comparison function must be either a function or undefined",
        ));
    }
    let (obj, items) = elements(&this, "Array.prototype.sort")?;
    let sorted = if comparator.is_callable() {
        merge_sort(items, &mut |a, b| match (a, b) {
            (JsValue::Undefined, _) | (_, JsValue::Undefined) => Ok(default_order(a, b)),
            _ => {
                let r = call_function(exec, &comparator, JsValue::Undefined, &[a.cheap_clone(), b.cheap_clone()])?;
                Ok(compare(&r, &JsValue::Number(0.0)).unwrap_or(Ordering::Equal))
            }
        })?
    } else {
        merge_sort(items, &mut |a, b| Ok(default_order(a, b)))?
    };
    obj.borrow_mut().kind = ObjectKind::Array(sorted);
    Ok(this)
}

fn array_copy_within(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    mutate(&this, "Array.prototype.copyWithin", |items| {
        let len = items.len();
        let target = relative_index(&arg(args, 0), len, 0);
        let start = relative_index(&arg(args, 1), len, 0);
        let end = relative_index(&arg(args, 2), len, len);
        let count = end.saturating_sub(start).min(len - target);
        let copied: Vec<JsValue> = items.get(start..start + count).unwrap_or(&[]).to_vec();
        for (slot, value) in items.iter_mut().skip(target).zip(copied) {
            *slot = value;
        }
    })?;
    Ok(this)
}

fn array_fill(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = arg(args, 0);
    mutate(&this, "Array.prototype.fill", |items| {
        let len = items.len();
        let start = relative_index(&arg(args, 1), len, 0);
        let end = relative_index(&arg(args, 2), len, len);
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.cheap_clone();
        }
    })?;
    Ok(this)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Accessors
// ═══════════════════════════════════════════════════════════════════════════════

fn array_slice(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.slice")?;
    let len = items.len();
    let start = relative_index(&arg(args, 0), len, 0);
    let end = relative_index(&arg(args, 1), len, len);
    let sliced = items.get(start..end.max(start)).unwrap_or(&[]).to_vec();
    Ok(exec.realm().intrinsics.array_value(sliced))
}

fn array_concat(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, mut items) = elements(&this, "Array.prototype.concat")?;
    for value in args {
        match value.as_object().and_then(JsObjectRef::array_elements) {
            Some(more) => items.extend(more),
            None => items.push(value.cheap_clone()),
        }
    }
    Ok(exec.realm().intrinsics.array_value(items))
}

fn join(items: &[JsValue], separator: &str) -> String {
    items
        .iter()
        .map(|v| match v {
            JsValue::Undefined | JsValue::Null => String::new(),
            other => other.to_js_string().to_string(),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn array_join(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.join")?;
    let separator = match arg(args, 0) {
        JsValue::Undefined => ",".into(),
        other => other.to_js_string(),
    };
    Ok(JsValue::from(join(&items, separator.as_str())))
}

fn array_to_string(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.toString")?;
    Ok(JsValue::from(join(&items, ",")))
}

fn array_index_of(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.indexOf")?;
    let needle = arg(args, 0);
    let from = relative_index(&arg(args, 1), items.len(), 0);
    let found = items
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, v)| v.strict_equals(&needle))
        .map_or(-1.0, |(i, _)| i as f64);
    Ok(JsValue::Number(found))
}

fn array_last_index_of(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.lastIndexOf")?;
    let needle = arg(args, 0);
    let found = items
        .iter()
        .enumerate()
        .rev()
        .find(|(_, v)| v.strict_equals(&needle))
        .map_or(-1.0, |(i, _)| i as f64);
    Ok(JsValue::Number(found))
}

fn array_includes(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.includes")?;
    let needle = arg(args, 0);
    Ok(JsValue::Boolean(items.iter().any(|v| v.same_value_zero(&needle))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Iteration
// ═══════════════════════════════════════════════════════════════════════════════

fn array_for_each(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.forEach")?;
    let f = callback(args, "forEach")?;
    let this_arg = arg(args, 1);
    for (i, item) in items.iter().enumerate() {
        visit(exec, &f, &this_arg, item, i, &this)?;
    }
    Ok(JsValue::Undefined)
}

fn array_map(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.map")?;
    let f = callback(args, "map")?;
    let this_arg = arg(args, 1);
    let mut mapped = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        mapped.push(visit(exec, &f, &this_arg, item, i, &this)?);
    }
    Ok(exec.realm().intrinsics.array_value(mapped))
}

fn array_filter(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.filter")?;
    let f = callback(args, "filter")?;
    let this_arg = arg(args, 1);
    let mut kept = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if visit(exec, &f, &this_arg, item, i, &this)?.to_boolean() {
            kept.push(item.cheap_clone());
        }
    }
    Ok(exec.realm().intrinsics.array_value(kept))
}

/// First element satisfying the callback, with its index
fn find_first(exec: &Exec, this: &JsValue, args: &[JsValue], method: &str) -> Result<Option<(usize, JsValue)>, JsError> {
    let (_, items) = elements(this, method)?;
    let f = callback(args, method)?;
    let this_arg = arg(args, 1);
    for (i, item) in items.into_iter().enumerate() {
        if visit(exec, &f, &this_arg, &item, i, this)?.to_boolean() {
            return Ok(Some((i, item)));
        }
    }
    Ok(None)
}

fn array_find(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(find_first(exec, &this, args, "find")?.map(|(_, v)| v).unwrap_or_default())
}

fn array_find_index(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let index = find_first(exec, &this, args, "findIndex")?.map_or(-1.0, |(i, _)| i as f64);
    Ok(JsValue::Number(index))
}

fn array_some(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(find_first(exec, &this, args, "some")?.is_some()))
}

fn array_every(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.every")?;
    let f = callback(args, "every")?;
    let this_arg = arg(args, 1);
    for (i, item) in items.iter().enumerate() {
        if !visit(exec, &f, &this_arg, item, i, &this)?.to_boolean() {
            return Ok(JsValue::Boolean(false));
        }
    }
    Ok(JsValue::Boolean(true))
}

fn reduce<I>(exec: &Exec, this: &JsValue, args: &[JsValue], method: &str, order: I) -> Result<JsValue, JsError>
where
    I: Iterator<Item = (usize, JsValue)>,
{
    let f = callback(args, method)?;
    let mut order = order.peekable();
    let mut acc = match args.get(1) {
        Some(initial) => initial.cheap_clone(),
        None => match order.next() {
            Some((_, first)) => first,
            None => return Err(JsError::type_error("Reduce of empty array with no initial value")),
        },
    };
    for (i, item) in order {
        acc = call_function(
            exec,
            &f,
            JsValue::Undefined,
            &[acc, item, JsValue::from(i), this.cheap_clone()],
        )?;
    }
    Ok(acc)
}

fn array_reduce(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.reduce")?;
    reduce(exec, &this, args, "reduce", items.into_iter().enumerate())
}

fn array_reduce_right(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, items) = elements(&this, "Array.prototype.reduceRight")?;
    reduce(exec, &this, args, "reduceRight", items.into_iter().enumerate().rev())
}
