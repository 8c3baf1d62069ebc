//! Statement evaluation
//!
//! Statements resolve to an optional [`ExecReturn`]. `None` means "carry on
//! with the next statement"; `Some` carries a `return`, `break` or `continue`
//! up to whichever construct consumes it.

use futures::FutureExt;

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::ExecReturn;
use crate::interpreter::function::create_function;
use crate::interpreter::ops::{declare, value};
use crate::interpreter::walker::{Eval, Flow, Walker};
use crate::lisp::{Item, LOOP_SUBJECT, Lisp, Literal, Op};
use crate::scope::{Scope, VarKind};
use crate::value::CheapClone;

/// Control signal escaping a statement
pub type Signal = Option<ExecReturn>;

/// Run a statement list in `scope`. Function declarations are bound before
/// the first statement runs.
pub fn block<'a, W: Walker>(exec: &'a Exec, scope: &'a Scope, items: &'a [Item], flow: Flow) -> Eval<'a, Signal> {
    async move {
        hoist(exec, scope, items)?;
        for item in items {
            if let Some(signal) = statement::<W>(exec, scope, item, flow).await? {
                return Ok(Some(signal));
            }
        }
        Ok(None)
    }
    .boxed_local()
}

fn hoist(exec: &Exec, scope: &Scope, items: &[Item]) -> Result<(), JsError> {
    for item in items {
        let Some(node) = item.as_node().filter(|n| n.op == Op::Function) else {
            continue;
        };
        let Item::Function(def) = &node.b else {
            continue;
        };
        let Some(name) = &def.name else {
            return Err(JsError::syntax_error("Function statements require a function name"));
        };
        let f = create_function(exec, Some(scope.cheap_clone()), def)?;
        scope.declare(name.as_str(), VarKind::Var, Some(f), false)?;
    }
    Ok(())
}

fn statement<'a, W: Walker>(exec: &'a Exec, scope: &'a Scope, item: &'a Item, flow: Flow) -> Eval<'a, Signal> {
    async move {
        let Some(node) = item.as_node() else {
            value::<W>(exec, scope, item).await?;
            return Ok(None);
        };
        match node.op {
            Op::Var | Op::Let | Op::Const => {
                exec.tick()?;
                declare::<W>(exec, scope, node).await?;
                Ok(None)
            }
            Op::Multi => {
                for part in node.b.as_list() {
                    if let Some(signal) = statement::<W>(exec, scope, part, flow).await? {
                        return Ok(Some(signal));
                    }
                }
                Ok(None)
            }
            Op::Return => {
                let result = value::<W>(exec, scope, &node.b).await?;
                Ok(Some(ExecReturn::returned(result)))
            }
            Op::Throw => {
                let thrown = value::<W>(exec, scope, &node.b).await?;
                Err(JsError::thrown(thrown))
            }
            // Bound by `hoist`
            Op::Function => Ok(None),
            Op::Block => block::<W>(exec, &scope.child(), node.b.as_list(), flow).await,
            Op::If => if_statement::<W>(exec, scope, node, flow).await,
            Op::Loop => loop_statement::<W>(exec, scope, node).await,
            Op::LoopAction => loop_action(node, flow),
            Op::Switch => switch_statement::<W>(exec, scope, node, flow).await,
            Op::Try => try_statement::<W>(exec, scope, node, flow).await,
            _ => {
                value::<W>(exec, scope, item).await?;
                Ok(None)
            }
        }
    }
    .boxed_local()
}

fn loop_action(node: &Lisp, flow: Flow) -> Result<Signal, JsError> {
    match &node.a {
        Item::Name(word) if word.as_str() == "continue" => {
            if !flow.in_loop {
                return Err(JsError::sandbox_error(
                    "Illegal continue statement: no surrounding iteration statement",
                ));
            }
            Ok(Some(ExecReturn::continued()))
        }
        _ => {
            if !flow.in_loop && !flow.in_switch {
                return Err(JsError::sandbox_error("Illegal break statement"));
            }
            Ok(Some(ExecReturn::broke()))
        }
    }
}

async fn if_statement<W: Walker>(exec: &Exec, scope: &Scope, node: &Lisp, flow: Flow) -> Result<Signal, JsError> {
    exec.tick()?;
    let cond = value::<W>(exec, scope, &node.a).await?;
    let Some(branches) = node.b.as_node() else {
        return Err(JsError::internal("malformed if statement"));
    };
    let taken = if cond.to_boolean() { &branches.a } else { &branches.b };
    block::<W>(exec, &scope.child(), taken.as_list(), flow).await
}

/// Header slots of a loop node
struct LoopHeader<'a> {
    check_first: bool,
    start_internal: &'a Item,
    get_iterator: &'a Item,
    start_step: &'a Item,
    step: &'a Item,
    condition: &'a Item,
    before_step: &'a Item,
}

impl<'a> LoopHeader<'a> {
    fn parse(item: &'a Item) -> Result<Self, JsError> {
        let [check_first, start_internal, get_iterator, start_step, step, condition, before_step] =
            item.as_list()
        else {
            return Err(JsError::internal("malformed loop header"));
        };
        Ok(LoopHeader {
            check_first: matches!(check_first, Item::Literal(Literal::Boolean(true))),
            start_internal,
            get_iterator,
            start_step,
            step,
            condition,
            before_step,
        })
    }
}

async fn loop_statement<W: Walker>(exec: &Exec, scope: &Scope, node: &Lisp) -> Result<Signal, JsError> {
    let header = LoopHeader::parse(&node.a)?;
    let body = node.b.as_list();
    let flow = Flow::default().in_loop();

    let loop_scope = scope.child();
    let subject = value::<W>(exec, &loop_scope, header.get_iterator).await?;
    let internal = loop_scope.child();
    internal.declare(LOOP_SUBJECT, VarKind::Let, Some(subject), false)?;
    if let Some(signal) = statement::<W>(exec, &loop_scope, header.start_step, flow).await? {
        return Ok(Some(signal));
    }
    statement::<W>(exec, &internal, header.start_internal, flow).await?;

    let mut running = !header.check_first || value::<W>(exec, &internal, header.condition).await?.to_boolean();
    while running {
        exec.check_timeout()?;
        exec.tick()?;
        let iteration = internal.child();
        statement::<W>(exec, &iteration, header.before_step, flow).await?;
        match block::<W>(exec, &iteration.child(), body, flow).await? {
            Some(signal) if signal.returned => return Ok(Some(signal)),
            Some(signal) if signal.break_loop => break,
            _ => {}
        }
        value::<W>(exec, &internal, header.step).await?;
        running = value::<W>(exec, &internal, header.condition).await?.to_boolean();
    }
    Ok(None)
}

async fn switch_statement<W: Walker>(exec: &Exec, scope: &Scope, node: &Lisp, flow: Flow) -> Result<Signal, JsError> {
    exec.tick()?;
    let discriminant = value::<W>(exec, scope, &node.a).await?;
    let cases: Vec<&Lisp> = node.b.as_list().iter().filter_map(Item::as_node).collect();

    let mut start = None;
    for (i, case) in cases.iter().enumerate() {
        if case.a.is_none() {
            continue;
        }
        let test = value::<W>(exec, scope, &case.a).await?;
        if discriminant.strict_equals(&test) {
            start = Some(i);
            break;
        }
    }
    let start = start.or_else(|| cases.iter().position(|case| case.a.is_none()));
    let Some(start) = start else {
        return Ok(None);
    };

    let body_scope = scope.child();
    let flow = flow.in_switch();
    for case in cases.iter().skip(start) {
        match block::<W>(exec, &body_scope, case.b.as_list(), flow).await? {
            Some(signal) if signal.break_loop => return Ok(None),
            Some(signal) => return Ok(Some(signal)),
            None => {}
        }
    }
    Ok(None)
}

async fn try_statement<W: Walker>(exec: &Exec, scope: &Scope, node: &Lisp, flow: Flow) -> Result<Signal, JsError> {
    let [param, handler, finalizer] = node.b.as_list() else {
        return Err(JsError::internal("malformed try statement"));
    };
    let mut outcome = block::<W>(exec, &scope.child(), node.a.as_list(), flow).await;

    if let Err(err) = &outcome
        && err.is_catchable()
        && !handler.is_none()
    {
        let catch_scope = scope.child();
        if let Item::Name(name) = param {
            let caught = exec.realm().intrinsics.error_value(err);
            catch_scope.declare(name.as_str(), VarKind::Let, Some(caught), false)?;
        }
        outcome = block::<W>(exec, &catch_scope, handler.as_list(), flow).await;
    }

    if finalizer.is_none() {
        return outcome;
    }
    let finished = block::<W>(exec, &scope.child(), finalizer.as_list(), flow).await;
    // A finally block may override the outcome, except policy violations and aborts
    if let Err(err) = &outcome
        && !err.is_catchable()
    {
        return outcome;
    }
    match finished? {
        Some(signal) => Ok(Some(signal)),
        None => outcome,
    }
}

