//! Security gate
//!
//! Checks run before a read, write, call or construction completes. Reads go
//! through [`resolve_identifier`] and [`get_property`], writes through
//! [`assign_check`]. Violations are [`JsError::SandboxError`]s, which scripts
//! cannot catch.

use crate::context::{Change, Exec};
use crate::error::JsError;
use crate::prelude::*;
use crate::reference::{Reference, Target};
use crate::scope::Scope;
use crate::value::{CheapClone, JsObjectRef, JsValue, ObjectKind, PropertyKey};

/// Function members every function may expose
const FUNCTION_OWN: &[&str] = &["name", "length", "constructor"];

/// Look up a name in the scope chain, swapping escape-prone globals for
/// their sandboxed equivalents
pub fn resolve_identifier(exec: &Exec, scope: &Scope, name: &str) -> Result<Reference, JsError> {
    let mut reference = scope.get(name)?;
    if let Target::Property { object, key } = &reference.target {
        if reference.is_global {
            exec.audit(|report| report.record_global(name));
        }
        if let JsValue::Object(value) = &reference.value
            && let Some(replacement) = exec.ctx.policy.replacement(value)
        {
            reference.value = replacement;
            return Ok(reference);
        }
        exec.ctx.subscriptions.fire_get(object, key);
    }
    Ok(reference)
}

fn record_prototype_access(exec: &Exec, object: &JsObjectRef, key: &PropertyKey) {
    if key.is_index() {
        return;
    }
    let mut current = object.prototype();
    while let Some(proto) = current {
        if proto.has_own(key) {
            exec.audit(|report| report.record_member(proto.constructor_name(), key));
        }
        current = proto.prototype();
    }
}

fn function_name(object: &JsObjectRef) -> String {
    object
        .function()
        .map(|f| f.name().to_string())
        .unwrap_or_default()
}

/// Read `key` of `base`. `base_is_global` tells whether `base` itself came
/// from a global binding, which makes its members global-protected too.
pub fn get_property(
    exec: &Exec,
    base: &JsValue,
    base_is_global: bool,
    key: PropertyKey,
) -> Result<Reference, JsError> {
    let intrinsics = &exec.realm().intrinsics;
    let object = match base {
        JsValue::Object(obj) => obj.cheap_clone(),
        JsValue::Null | JsValue::Undefined => {
            return Err(JsError::type_error(format!(
                "Cannot read properties of {base} (reading '{key}')"
            )));
        }
        primitive => intrinsics
            .box_primitive(primitive)
            .ok_or_else(|| JsError::internal("unboxable primitive"))?,
    };
    let policy = exec.ctx.policy.as_ref();
    let function = object.function();
    let is_function = function.is_some();
    let sandboxed = function.as_ref().is_some_and(|f| f.is_sandboxed());
    let own = object.has_own(&key);
    let prototype_access = is_function || !(own || key.is_index());

    if exec.ctx.options.audit && prototype_access {
        record_prototype_access(exec, &object, &key);
    }

    if prototype_access {
        if is_function {
            let exempt = FUNCTION_OWN.iter().any(|name| key.eq_str(name));
            if own && !exempt && !sandboxed {
                if let Some(replace) = policy.prototype_replacement(&object) {
                    let replaced = replace(base, true);
                    let value = member_of(exec, &replaced, &key);
                    return Ok(Reference::property(object, key, value, true));
                }
                let allowed = match object.get_own(&PropertyKey::from("prototype")) {
                    Some(JsValue::Object(proto)) => policy.allows_member(&proto, &key),
                    _ => !policy.enforcing(),
                };
                if !allowed {
                    return Err(JsError::sandbox_error(format!(
                        "Static method or property access not permitted: {}.{key}",
                        function_name(&object)
                    )));
                }
            }
        } else if !key.eq_str("constructor") {
            let mut current = object.prototype();
            while let Some(proto) = current {
                if proto.has_own(&key) {
                    if let JsValue::Object(ctor) = proto.get_str("constructor")
                        && let Some(replace) = policy.prototype_replacement(&ctor)
                    {
                        let replaced = replace(base, false);
                        let value = member_of(exec, &replaced, &key);
                        return Ok(Reference::property(object, key, value, false));
                    }
                    if policy.allows_member(&proto, &key) {
                        break;
                    }
                    return Err(JsError::sandbox_error(format!(
                        "Method or property access not permitted: {}.{key}",
                        proto.constructor_name()
                    )));
                }
                current = proto.prototype();
            }
        }
    }

    let mut value = object.get(&key);
    if let JsValue::Object(found) = &value
        && let Some(replacement) = policy.replacement(found)
    {
        value = replacement;
    }

    let is_global = base_is_global
        || (is_function && !sandboxed)
        || is_shared(exec, &object);
    if !is_global {
        exec.ctx.subscriptions.fire_get(&object, &key);
    }

    Ok(match base {
        JsValue::Object(_) => Reference::property(object, key, value, is_global),
        primitive => Reference {
            target: Target::Primitive {
                value: primitive.cheap_clone(),
                key,
            },
            value,
            is_const: false,
            is_global,
            is_variable: false,
        },
    })
}

/// Objects every program on a realm sees: exposed globals, the sandbox
/// global and the built-in prototypes
fn is_shared(exec: &Exec, object: &JsObjectRef) -> bool {
    exec.ctx.policy.is_allowed_global(object)
        || object.ptr_eq(&exec.ctx.sandbox_global)
        || exec.realm().intrinsics.is_prototype(object)
}

/// Check for built-ins that write into an object they were handed
pub fn check_write_target(exec: &Exec, target: &JsObjectRef) -> Result<(), JsError> {
    if is_shared(exec, target) && !exec.ctx.sloppy_globals {
        return Err(JsError::sandbox_error(format!(
            "Cannot modify a global object: {}",
            target.constructor_name()
        )));
    }
    Ok(())
}

fn member_of(exec: &Exec, value: &JsValue, key: &PropertyKey) -> JsValue {
    match value {
        JsValue::Object(obj) => obj.get(key),
        JsValue::Null | JsValue::Undefined => JsValue::Undefined,
        primitive => exec
            .realm()
            .intrinsics
            .box_primitive(primitive)
            .map(|boxed| boxed.get(key))
            .unwrap_or_default(),
    }
}

/// What a write is about to do, for messages and change events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Assign,
    Delete,
}

impl WriteKind {
    fn verb(self) -> &'static str {
        match self {
            WriteKind::Assign => "assign",
            WriteKind::Delete => "delete",
        }
    }
}

/// Pre-check of every mutation. Fires set/change subscriptions when the
/// write is allowed.
pub fn assign_check(exec: &Exec, reference: &Reference, kind: WriteKind) -> Result<(), JsError> {
    match &reference.target {
        Target::Undeclared(name) => {
            if exec.ctx.sloppy_globals && kind == WriteKind::Assign {
                return Ok(());
            }
            return Err(JsError::not_defined(name));
        }
        Target::Primitive { key, .. } => {
            return Err(JsError::type_error(format!(
                "Cannot {} property '{key}' of a primitive value",
                kind.verb()
            )));
        }
        Target::This | Target::Temporary | Target::ShortCircuit => {
            return Err(JsError::syntax_error(format!(
                "Invalid left-hand side in {}",
                if kind == WriteKind::Delete { "delete" } else { "assignment" }
            )));
        }
        Target::Variable { .. } | Target::Property { .. } => {}
    }

    if reference.is_const {
        return Err(JsError::type_error("Assignment to constant variable."));
    }
    if reference.is_global && !exec.ctx.sloppy_globals {
        return Err(JsError::sandbox_error(format!(
            "Cannot {} property '{}' of a global object",
            kind.verb(),
            reference.name()
        )));
    }

    if let Target::Property { object, key } = &reference.target {
        let own = object.has_own(key);
        if !own && object.get(key).is_callable() {
            return Err(JsError::sandbox_error(format!(
                "Override prototype property '{key}' not allowed"
            )));
        }
        let subscriptions = &exec.ctx.subscriptions;
        match (kind, own) {
            (WriteKind::Delete, true) => {
                subscriptions.fire_change(object, &Change::Delete { prop: key.clone() });
            }
            (WriteKind::Delete, false) => {}
            (WriteKind::Assign, true) => subscriptions.fire_set(object, key, &Change::Replace),
            (WriteKind::Assign, false) => {
                subscriptions.fire_change(object, &Change::Create { prop: key.clone() });
            }
        }
    }
    Ok(())
}

/// Write through a checked reference. Undeclared names only get here for
/// sloppy contexts, where they become properties of the global object.
pub fn write(exec: &Exec, reference: &Reference, value: JsValue) -> Result<(), JsError> {
    match &reference.target {
        Target::Undeclared(name) if exec.ctx.sloppy_globals => {
            exec.ctx.sandbox_global.set(PropertyKey::from(name.cheap_clone()), value);
            Ok(())
        }
        _ => reference.set(value),
    }
}

pub fn check_call(exec: &Exec) -> Result<(), JsError> {
    if exec.ctx.options.forbid_function_calls {
        return Err(JsError::sandbox_error("Method calls are not allowed"));
    }
    Ok(())
}

/// `new` needs an allow-listed global constructor or a sandbox-made function
pub fn check_construct(exec: &Exec, ctor: &JsObjectRef) -> Result<(), JsError> {
    let policy = exec.ctx.policy.as_ref();
    let sandboxed = ctor.function().is_some_and(|f| f.is_sandboxed());
    if policy.enforcing() && !policy.is_allowed_global(ctor) && !sandboxed {
        return Err(JsError::sandbox_error("Object construction not allowed"));
    }
    Ok(())
}

/// Regex literals need `RegExp` to be exposed
pub fn check_regex(exec: &Exec) -> Result<(), JsError> {
    let policy = exec.ctx.policy.as_ref();
    let allowed = match exec.realm().global("RegExp") {
        Some(JsValue::Object(ctor)) => policy.is_allowed_global(&ctor),
        _ => false,
    };
    if policy.enforcing() && !allowed {
        return Err(JsError::sandbox_error("Regex not permitted"));
    }
    Ok(())
}

/// `await` and async functions need the `Promise` prototype to be allowed
pub fn check_async(exec: &Exec, message: &str) -> Result<(), JsError> {
    let proto = &exec.realm().intrinsics.promise_prototype;
    if !exec.ctx.policy.is_allowed_prototype(proto) {
        return Err(JsError::sandbox_error(message));
    }
    Ok(())
}

pub fn check_function_creation(exec: &Exec, is_async: bool) -> Result<(), JsError> {
    if exec.ctx.options.forbid_function_creation {
        return Err(JsError::sandbox_error("Function creation is forbidden"));
    }
    if is_async {
        check_async(exec, "Async/await not permitted")?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Change fan-out for calls
// ═══════════════════════════════════════════════════════════════════════════════

fn index_arg(args: &[JsValue], i: usize, len: usize) -> Option<usize> {
    let n = args.get(i)?.to_number();
    if n.is_nan() {
        return Some(0);
    }
    let n = math::trunc(n);
    Some(if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    })
}

/// Describe the structural change a mutating array method is about to make
pub fn array_change(items: &[JsValue], method: &str, args: &[JsValue]) -> Option<Change> {
    let len = items.len();
    let slice = |from: usize, to: usize| items.get(from..to.min(len).max(from)).unwrap_or(&[]).to_vec();
    let change = match method {
        "push" if !args.is_empty() => Change::Push { added: args.to_vec() },
        "unshift" if !args.is_empty() => Change::Unshift { added: args.to_vec() },
        "pop" if len > 0 => Change::Pop { removed: slice(len - 1, len) },
        "shift" if len > 0 => Change::Shift { removed: slice(0, 1) },
        "splice" => {
            let start = index_arg(args, 0, len).unwrap_or(0);
            let delete_count = match args.get(1) {
                None => len - start,
                Some(count) => (math::trunc(count.to_number()).max(0.0) as usize).min(len - start),
            };
            let added = args.get(2..).unwrap_or(&[]).to_vec();
            let removed = slice(start, start + delete_count);
            if added.is_empty() && removed.is_empty() {
                return None;
            }
            Change::Splice {
                start_index: start,
                delete_count,
                added,
                removed,
            }
        }
        "reverse" if len > 0 => Change::Reverse,
        "sort" if len > 0 => Change::Sort,
        "copyWithin" => {
            let target = index_arg(args, 0, len).unwrap_or(0);
            let start = index_arg(args, 1, len).unwrap_or(0);
            let end = index_arg(args, 2, len).unwrap_or(len);
            let count = end.saturating_sub(start).min(len - target);
            let added = slice(start, start + count);
            let removed = slice(target, target + count);
            if added.is_empty() && removed.is_empty() {
                return None;
            }
            Change::CopyWithin {
                start_index: target,
                end_index: target + count,
                added,
                removed,
            }
        }
        _ => return None,
    };
    Some(change)
}

/// Fire change subscriptions before a call mutates an array receiver
pub fn before_call(exec: &Exec, receiver: &JsValue, callee: &JsObjectRef, args: &[JsValue]) {
    let subscriptions = &exec.ctx.subscriptions;
    if subscriptions.has_get()
        && is_json_stringify(exec, callee)
        && let Some(JsValue::Object(root)) = args.first()
    {
        fire_nested_gets(exec, root, &mut Vec::new());
    }

    let JsValue::Object(array) = receiver else {
        return;
    };
    if !subscriptions.has_change(array) {
        return;
    }
    let Some(name) = callee.function().map(|f| f.name()) else {
        return;
    };
    let proto_method = exec.realm().intrinsics.array_prototype.get_str(name.as_str());
    if !proto_method.as_object().is_some_and(|m| m.ptr_eq(callee)) {
        return;
    }
    let Some(items) = array.array_elements() else {
        return;
    };
    if let Some(change) = array_change(&items, name.as_str(), args) {
        subscriptions.fire_change(array, &change);
    }
}

fn is_json_stringify(exec: &Exec, callee: &JsObjectRef) -> bool {
    match exec.realm().global("JSON") {
        Some(JsValue::Object(json)) => json
            .get_str("stringify")
            .as_object()
            .is_some_and(|f| f.ptr_eq(callee)),
        _ => false,
    }
}

fn fire_nested_gets(exec: &Exec, object: &JsObjectRef, seen: &mut Vec<JsObjectRef>) {
    if seen.iter().any(|s| s.ptr_eq(object)) {
        return;
    }
    seen.push(object.cheap_clone());
    for key in object.own_keys() {
        exec.ctx.subscriptions.fire_get(object, &key);
        if let JsValue::Object(child) = object.get(&key)
            && !matches!(child.borrow().kind, ObjectKind::Function(_))
        {
            fire_nested_gets(exec, &child, seen);
        }
    }
}
