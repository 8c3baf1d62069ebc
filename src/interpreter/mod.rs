//! Execution-tree evaluator
//!
//! One evaluator, two strategies. [`execute_tree`] runs a statement list to
//! completion on the spot; [`execute_tree_async`] returns a future that may
//! park on `await`. Both share every operator through the [`walker::Walker`]
//! parameter.

pub mod builtins;
pub mod control;
pub mod function;
pub mod operators;
pub mod ops;
pub mod task;
pub mod walker;

use crate::context::{AuditReport, Exec};
use crate::error::JsError;
use crate::lisp::Item;
use crate::scope::Scope;
use crate::value::JsValue;

use walker::{AsyncWalker, Flow, SyncWalker, Walker, run_sync};

/// Outcome of running a statement list. Inside the evaluator the same
/// envelope carries `return`, `break` and `continue` outwards.
#[derive(Debug, Clone, Default)]
pub struct ExecReturn {
    pub result: JsValue,
    pub returned: bool,
    pub break_loop: bool,
    pub continue_loop: bool,
    /// Accesses recorded by an audit run
    pub audit: Option<AuditReport>,
}

impl ExecReturn {
    pub fn returned(result: JsValue) -> Self {
        ExecReturn {
            result,
            returned: true,
            ..Default::default()
        }
    }

    pub fn broke() -> Self {
        ExecReturn {
            break_loop: true,
            ..Default::default()
        }
    }

    pub fn continued() -> Self {
        ExecReturn {
            continue_loop: true,
            ..Default::default()
        }
    }
}

fn finish(exec: &Exec, signal: control::Signal) -> ExecReturn {
    let mut ret = match signal {
        Some(ret) if ret.returned => ret,
        _ => ExecReturn::default(),
    };
    ret.audit = exec.take_audit();
    ret
}

/// Run `tree` in `scope`, refusing to suspend
pub fn execute_tree(exec: &Exec, scope: &Scope, tree: &[Item]) -> Result<ExecReturn, JsError> {
    log::debug!(
        target: "jsgate::interpreter",
        "executing {} statements ({})",
        tree.len(),
        SyncWalker::NAME
    );
    let signal = run_sync(control::block::<SyncWalker>(exec, scope, tree, Flow::default()))?;
    exec.realm().run_tasks();
    Ok(finish(exec, signal))
}

/// Run `tree` in `scope`; `await` parks the returned future
pub async fn execute_tree_async(exec: &Exec, scope: &Scope, tree: &[Item]) -> Result<ExecReturn, JsError> {
    log::debug!(
        target: "jsgate::interpreter",
        "executing {} statements ({})",
        tree.len(),
        AsyncWalker::NAME
    );
    let signal = control::block::<AsyncWalker>(exec, scope, tree, Flow::default()).await?;
    exec.realm().run_tasks();
    Ok(finish(exec, signal))
}
