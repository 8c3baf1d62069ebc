//! Expression evaluation
//!
//! Every expression node resolves to a [`Reference`]. Member and identifier
//! nodes produce real slots so calls get their receiver and assignments get
//! their target; everything else produces a temporary.

use futures::FutureExt;

use crate::context::Exec;
use crate::error::JsError;
use crate::gate::{self, WriteKind};
use crate::interpreter::builtins::regexp::create_regexp;
use crate::interpreter::function::{call_function, construct, create_function, describe};
use crate::interpreter::operators;
use crate::interpreter::task::Settled;
use crate::interpreter::walker::{Eval, Walker};
use crate::lisp::{Item, Lisp, Literal, Op};
use crate::reference::{Reference, Target};
use crate::scope::{Scope, VarKind};
use crate::value::{CheapClone, JsString, JsValue, PropertyKey};

/// Evaluate `item` to a value
pub fn value<'a, W: Walker>(exec: &'a Exec, scope: &'a Scope, item: &'a Item) -> Eval<'a, JsValue> {
    async move { reference::<W>(exec, scope, item).await?.get() }.boxed_local()
}

/// Evaluate `item` to a reference
pub fn reference<'a, W: Walker>(exec: &'a Exec, scope: &'a Scope, item: &'a Item) -> Eval<'a, Reference> {
    async move {
        match item {
            Item::None => Ok(Reference::temporary(JsValue::Undefined)),
            Item::Literal(literal) => Ok(Reference::temporary(literal.to_value())),
            Item::Name(name) => Ok(Reference::temporary(JsValue::String(name.cheap_clone()))),
            Item::List(_) | Item::Function(_) => Err(JsError::internal("expression expected")),
            Item::Node(node) => {
                exec.tick()?;
                node_reference::<W>(exec, scope, node).await
            }
        }
    }
    .boxed_local()
}

async fn node_reference<W: Walker>(exec: &Exec, scope: &Scope, node: &Lisp) -> Result<Reference, JsError> {
    let temporary = |value: JsValue| Ok(Reference::temporary(value));
    match node.op {
        Op::Prop | Op::OptionalProp => member::<W>(exec, scope, node).await,
        Op::Call | Op::OptionalCall => call::<W>(exec, scope, node).await,
        Op::New => {
            let callee = value::<W>(exec, scope, &node.a).await?;
            let args = arguments::<W>(exec, scope, &node.b).await?;
            let Some(ctor) = callee.as_object().filter(|c| c.is_callable()) else {
                return Err(JsError::type_error(format!("{} is not a constructor", describe(&callee))));
            };
            gate::check_construct(exec, ctor)?;
            temporary(construct(exec, ctor, &args)?)
        }

        // ─── Literals ──────────────────────────────────────────────────────────
        Op::CreateObject => temporary(object_literal::<W>(exec, scope, &node.b).await?),
        Op::CreateArray => {
            let items = arguments::<W>(exec, scope, &node.b).await?;
            temporary(exec.realm().intrinsics.array_value(items))
        }
        Op::Group => {
            // Parentheses end an optional chain
            let inner = reference::<W>(exec, scope, &node.b).await?;
            if inner.is_short_circuit() {
                return temporary(JsValue::Undefined);
            }
            Ok(inner)
        }
        Op::Str => {
            let s = exec.constants.string(literal_index(&node.b)?)?;
            temporary(JsValue::String(s.cheap_clone()))
        }
        Op::Template => {
            let template = exec.constants.literal(literal_index(&node.b)?)?;
            let mut rendered = Vec::with_capacity(template.exprs.len());
            for expr in &template.exprs {
                let v = value::<W>(exec, scope, expr).await?;
                rendered.push(v.to_js_string().to_string());
            }
            temporary(JsValue::from(template.render(&rendered)))
        }
        Op::Regex => {
            gate::check_regex(exec)?;
            let regex = exec.constants.regex(literal_index(&node.b)?)?;
            temporary(create_regexp(exec, &regex.pattern, &regex.flags)?)
        }
        Op::SpreadArray | Op::SpreadObject => Err(JsError::syntax_error("Unexpected token '...'")),

        // ─── Unary ─────────────────────────────────────────────────────────────
        Op::Not | Op::BitNot | Op::Positive | Op::Negative | Op::Void => {
            let operand = value::<W>(exec, scope, &node.b).await?;
            temporary(operators::unary(node.op, &operand)?)
        }
        Op::Typeof => {
            let operand = reference::<W>(exec, scope, &node.b).await?;
            if operand.is_undeclared() {
                return temporary(JsValue::from("undefined"));
            }
            temporary(JsValue::from(operand.value.type_of()))
        }
        Op::Delete => {
            let operand = reference::<W>(exec, scope, &node.b).await?;
            temporary(JsValue::Boolean(delete(exec, &operand)?))
        }
        Op::Await => {
            if !W::CAN_SUSPEND {
                return Err(JsError::sandbox_error(
                    "Illegal use of 'await', must be inside async function",
                ));
            }
            gate::check_async(exec, "Async/await is not permitted")?;
            let operand = value::<W>(exec, scope, &node.b).await?;
            match operand.as_object().and_then(|o| o.promise()) {
                Some(cell) => temporary(Settled::new(cell, exec.cheap_clone()).await?),
                None => temporary(operand),
            }
        }

        // ─── Update ────────────────────────────────────────────────────────────
        Op::PreIncrement | Op::PreDecrement | Op::PostIncrement | Op::PostDecrement => {
            let target = reference::<W>(exec, scope, &node.a).await?;
            let old = target.get()?.to_number();
            let delta = if matches!(node.op, Op::PreIncrement | Op::PostIncrement) { 1.0 } else { -1.0 };
            let new = old + delta;
            assign(exec, &target, JsValue::Number(new))?;
            let result = if matches!(node.op, Op::PreIncrement | Op::PreDecrement) { new } else { old };
            temporary(JsValue::Number(result))
        }

        // ─── Assignment ────────────────────────────────────────────────────────
        Op::Assign => {
            let target = reference::<W>(exec, scope, &node.a).await?;
            let v = value::<W>(exec, scope, &node.b).await?;
            assign(exec, &target, v.cheap_clone())?;
            temporary(v)
        }
        Op::AndAssign | Op::OrAssign | Op::NullishAssign => {
            let target = reference::<W>(exec, scope, &node.a).await?;
            let current = target.get()?;
            let keep = match node.op {
                Op::AndAssign => !current.to_boolean(),
                Op::OrAssign => current.to_boolean(),
                _ => !current.is_null_or_undefined(),
            };
            if keep {
                return temporary(current);
            }
            let v = value::<W>(exec, scope, &node.b).await?;
            assign(exec, &target, v.cheap_clone())?;
            temporary(v)
        }
        op if op.compound_base().is_some() => {
            let base = op.compound_base().unwrap_or(Op::Add);
            let target = reference::<W>(exec, scope, &node.a).await?;
            let current = target.get()?;
            let rhs = value::<W>(exec, scope, &node.b).await?;
            let v = operators::binary(base, &current, &rhs)?;
            assign(exec, &target, v.cheap_clone())?;
            temporary(v)
        }

        // ─── Binary ────────────────────────────────────────────────────────────
        Op::And | Op::Or | Op::Nullish => {
            let left = value::<W>(exec, scope, &node.a).await?;
            let short = match node.op {
                Op::And => !left.to_boolean(),
                Op::Or => left.to_boolean(),
                _ => !left.is_null_or_undefined(),
            };
            if short {
                return temporary(left);
            }
            temporary(value::<W>(exec, scope, &node.b).await?)
        }
        Op::Instanceof => {
            let left = value::<W>(exec, scope, &node.a).await?;
            let right = value::<W>(exec, scope, &node.b).await?;
            temporary(JsValue::Boolean(instance_of(&left, &right)?))
        }
        Op::In => {
            let left = value::<W>(exec, scope, &node.a).await?;
            let right = value::<W>(exec, scope, &node.b).await?;
            let Some(obj) = right.as_object() else {
                return Err(JsError::type_error(format!(
                    "Cannot use 'in' operator to search for '{left}' in {}",
                    describe(&right)
                )));
            };
            temporary(JsValue::Boolean(obj.has_property(&PropertyKey::from_value(&left))))
        }
        op if op.precedence().is_some() => {
            let left = value::<W>(exec, scope, &node.a).await?;
            let right = value::<W>(exec, scope, &node.b).await?;
            temporary(operators::binary(op, &left, &right)?)
        }

        // ─── Conditionals and sequences ────────────────────────────────────────
        Op::Ternary => {
            let cond = value::<W>(exec, scope, &node.a).await?;
            let Some(branches) = node.b.as_node() else {
                return Err(JsError::internal("malformed conditional"));
            };
            let taken = if cond.to_boolean() { &branches.a } else { &branches.b };
            temporary(value::<W>(exec, scope, taken).await?)
        }
        Op::Multi => {
            let mut last = JsValue::Undefined;
            for item in node.b.as_list() {
                last = value::<W>(exec, scope, item).await?;
            }
            temporary(last)
        }
        Op::Var | Op::Let | Op::Const => {
            declare::<W>(exec, scope, node).await?;
            temporary(JsValue::Undefined)
        }

        // ─── Functions ─────────────────────────────────────────────────────────
        Op::InlineFunction | Op::ArrowFunc | Op::Function => match &node.b {
            Item::Function(def) => temporary(create_function(exec, Some(scope.cheap_clone()), def)?),
            _ => Err(JsError::internal("function node without a definition")),
        },

        // ─── Loop internals ────────────────────────────────────────────────────
        Op::Values => {
            let subject = value::<W>(exec, scope, &node.b).await?;
            temporary(exec.realm().intrinsics.array_value(iterate(&subject)?))
        }
        Op::Keys => {
            let subject = value::<W>(exec, scope, &node.b).await?;
            temporary(exec.realm().intrinsics.array_value(enumerate_keys(&subject)))
        }

        other => Err(JsError::syntax_error(format!("Unexpected statement {other:?} in expression"))),
    }
}

fn literal_index(item: &Item) -> Result<usize, JsError> {
    match item {
        Item::Literal(Literal::Number(n)) if *n >= 0.0 => Ok(*n as usize),
        _ => Err(JsError::internal("literal placeholder expected")),
    }
}

/// Property key of a member node's right slot
async fn member_key<W: Walker>(exec: &Exec, scope: &Scope, item: &Item) -> Result<PropertyKey, JsError> {
    match item {
        Item::Name(name) => Ok(PropertyKey::from(name.cheap_clone())),
        other => Ok(PropertyKey::from_value(&value::<W>(exec, scope, other).await?)),
    }
}

async fn member<W: Walker>(exec: &Exec, scope: &Scope, node: &Lisp) -> Result<Reference, JsError> {
    if node.a.is_none() {
        let Item::Name(name) = &node.b else {
            return Err(JsError::internal("identifier expected"));
        };
        return gate::resolve_identifier(exec, scope, name.as_str());
    }
    let base = reference::<W>(exec, scope, &node.a).await?;
    if base.is_short_circuit() {
        return Ok(base);
    }
    let object = base.get()?;
    if node.op == Op::OptionalProp && object.is_null_or_undefined() {
        return Ok(Reference::short_circuit());
    }
    let key = member_key::<W>(exec, scope, &node.b).await?;
    gate::get_property(exec, &object, base.is_global, key)
}

async fn call<W: Walker>(exec: &Exec, scope: &Scope, node: &Lisp) -> Result<Reference, JsError> {
    let callee = reference::<W>(exec, scope, &node.a).await?;
    if callee.is_short_circuit() {
        return Ok(callee);
    }
    let func = callee.get()?;
    if node.op == Op::OptionalCall && func.is_null_or_undefined() {
        return Ok(Reference::short_circuit());
    }
    let args = arguments::<W>(exec, scope, &node.b).await?;
    let Some(fobj) = func.as_object().filter(|f| f.is_callable()) else {
        return Err(JsError::type_error(format!("{} is not a function", callee_name(&callee))));
    };
    gate::check_call(exec)?;
    let this = callee.receiver();
    gate::before_call(exec, &this, fobj, &args);
    Ok(Reference::temporary(call_function(exec, &func, this, &args)?))
}

fn callee_name(callee: &Reference) -> String {
    match &callee.target {
        Target::Temporary => describe(&callee.value),
        _ => callee.name(),
    }
}

/// Argument or array item list, expanding spreads
fn arguments<'a, W: Walker>(exec: &'a Exec, scope: &'a Scope, list: &'a Item) -> Eval<'a, Vec<JsValue>> {
    async move {
        let mut out = Vec::new();
        for item in list.as_list() {
            match item.as_node() {
                Some(spread) if spread.op == Op::SpreadArray => {
                    let source = value::<W>(exec, scope, &spread.b).await?;
                    out.extend(iterate(&source)?);
                }
                _ => out.push(value::<W>(exec, scope, item).await?),
            }
        }
        Ok(out)
    }
    .boxed_local()
}

async fn object_literal<W: Walker>(exec: &Exec, scope: &Scope, entries: &Item) -> Result<JsValue, JsError> {
    let obj = exec.realm().intrinsics.object();
    for entry in entries.as_list() {
        let Some(entry) = entry.as_node() else {
            return Err(JsError::internal("malformed object literal"));
        };
        match entry.op {
            Op::KeyVal => {
                let key = match &entry.a {
                    Item::Name(name) => PropertyKey::from(name.cheap_clone()),
                    Item::Literal(literal) => PropertyKey::from_value(&literal.to_value()),
                    other => PropertyKey::from_value(&value::<W>(exec, scope, other).await?),
                };
                let v = value::<W>(exec, scope, &entry.b).await?;
                obj.set(key, v);
            }
            Op::SpreadObject => {
                let source = value::<W>(exec, scope, &entry.b).await?;
                match &source {
                    JsValue::Object(src) => {
                        for key in src.own_keys() {
                            obj.set(key.clone(), src.get(&key));
                        }
                    }
                    JsValue::String(s) => {
                        for (i, unit) in iterate(&JsValue::String(s.cheap_clone()))?.into_iter().enumerate() {
                            obj.set(PropertyKey::Index(i as u32), unit);
                        }
                    }
                    _ => {}
                }
            }
            _ => return Err(JsError::internal("malformed object literal")),
        }
    }
    Ok(JsValue::Object(obj))
}

/// `let`/`const`/`var` with an optional initializer
pub async fn declare<W: Walker>(exec: &Exec, scope: &Scope, node: &Lisp) -> Result<(), JsError> {
    let Item::Name(name) = &node.a else {
        return Err(JsError::internal("declaration without a name"));
    };
    let kind = match node.op {
        Op::Let => VarKind::Let,
        Op::Const => VarKind::Const,
        _ => VarKind::Var,
    };
    let init = if node.b.is_none() {
        (kind != VarKind::Var).then_some(JsValue::Undefined)
    } else {
        Some(value::<W>(exec, scope, &node.b).await?)
    };
    scope.declare(name.as_str(), kind, init, false)
}

/// Gate-checked write through a reference
pub fn assign(exec: &Exec, target: &Reference, value: JsValue) -> Result<(), JsError> {
    gate::assign_check(exec, target, WriteKind::Assign)?;
    gate::write(exec, target, value)
}

fn delete(exec: &Exec, target: &Reference) -> Result<bool, JsError> {
    match &target.target {
        Target::Property { object, key } => {
            gate::assign_check(exec, target, WriteKind::Delete)?;
            Ok(object.delete(key))
        }
        Target::Variable { .. } => Ok(false),
        _ => Ok(true),
    }
}

fn instance_of(left: &JsValue, right: &JsValue) -> Result<bool, JsError> {
    let Some(ctor) = right.as_object().filter(|r| r.is_callable()) else {
        return Err(JsError::type_error("Right-hand side of 'instanceof' is not callable"));
    };
    let JsValue::Object(proto) = ctor.get_str("prototype") else {
        return Ok(false);
    };
    let Some(obj) = left.as_object() else {
        return Ok(false);
    };
    let mut current = obj.prototype();
    while let Some(p) = current {
        if p.ptr_eq(&proto) {
            return Ok(true);
        }
        current = p.prototype();
    }
    Ok(false)
}

/// Values a spread or `for...of` visits
pub fn iterate(value: &JsValue) -> Result<Vec<JsValue>, JsError> {
    match value {
        JsValue::String(s) => Ok(s
            .as_str()
            .chars()
            .map(|c| JsValue::String(JsString::from(c.to_string())))
            .collect()),
        JsValue::Object(obj) => obj
            .array_elements()
            .ok_or_else(|| JsError::type_error(format!("{} is not iterable", describe(value)))),
        other => Err(JsError::type_error(format!("{} is not iterable", describe(other)))),
    }
}

/// Keys a `for...in` visits
pub fn enumerate_keys(value: &JsValue) -> Vec<JsValue> {
    match value {
        JsValue::Object(obj) => obj
            .own_keys()
            .iter()
            .map(|k| JsValue::from(k.to_string()))
            .collect(),
        JsValue::String(s) => (0..s.utf16_len()).map(|i| JsValue::from(i.to_string())).collect(),
        _ => Vec::new(),
    }
}
