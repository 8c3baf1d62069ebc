//! Promise state and suspended async bodies
//!
//! A [`PromiseCell`] is the internal slot of a Promise object. Besides the
//! settlement state it may own the suspended body of the async function that
//! will settle it; whoever awaits the promise drives that body.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::function::call_function;
use crate::prelude::*;
use crate::value::{CheapClone, JsObjectRef, JsValue, ObjectKind};

/// Suspended async function body
pub type Task = LocalBoxFuture<'static, Result<JsValue, JsError>>;

#[derive(Debug, Clone, Default)]
pub enum PromiseState {
    #[default]
    Pending,
    Fulfilled(JsValue),
    /// Kept as an engine error so policy failures inside async bodies stay
    /// uncatchable after crossing the promise
    Rejected(JsError),
}

enum Reaction {
    Then {
        on_fulfilled: JsValue,
        on_rejected: JsValue,
        derived: Rc<PromiseCell>,
        exec: Exec,
    },
    /// Settle another promise the same way
    Adopt(Rc<PromiseCell>),
}

#[derive(Default)]
pub struct PromiseCell {
    state: RefCell<PromiseState>,
    reactions: RefCell<Vec<Reaction>>,
    wakers: RefCell<Vec<Waker>>,
    task: RefCell<Option<Task>>,
}

impl fmt::Debug for PromiseCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseCell")
            .field("state", &self.state.borrow())
            .finish_non_exhaustive()
    }
}

/// A fresh pending promise object and its cell
pub fn new_promise(exec: &Exec) -> (JsObjectRef, Rc<PromiseCell>) {
    let cell = Rc::new(PromiseCell::default());
    let obj = JsObjectRef::new(
        ObjectKind::Promise(cell.cheap_clone()),
        Some(exec.realm().intrinsics.promise_prototype.cheap_clone()),
    );
    (obj, cell)
}

impl PromiseCell {
    pub fn state(&self) -> PromiseState {
        self.state.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Pending)
    }

    /// Settlement, if reached
    pub fn outcome(&self) -> Option<Result<JsValue, JsError>> {
        match &*self.state.borrow() {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(value) => Some(Ok(value.cheap_clone())),
            PromiseState::Rejected(err) => Some(Err(err.clone())),
        }
    }

    /// Hand over the body that will settle this promise
    pub fn set_task(&self, task: Task) {
        *self.task.borrow_mut() = Some(task);
    }

    pub fn has_task(&self) -> bool {
        self.task.borrow().is_some()
    }

    /// Poll the owned body once. The body is taken out while it runs, so a
    /// body awaiting its own promise just stays pending.
    pub fn drive(&self, exec: &Exec, cx: &mut Context<'_>) {
        let Some(mut task) = self.task.borrow_mut().take() else {
            return;
        };
        match task.as_mut().poll(cx) {
            Poll::Ready(outcome) => self.settle(exec, outcome),
            Poll::Pending => *self.task.borrow_mut() = Some(task),
        }
    }

    /// Poll the owned body without a waker
    pub fn drive_now(&self, exec: &Exec) {
        let mut cx = Context::from_waker(noop_waker_ref());
        self.drive(exec, &mut cx);
    }

    /// Resolve with a value, adopting the state of promise values
    pub fn resolve(self: &Rc<Self>, exec: &Exec, value: JsValue) {
        let other = value.as_object().and_then(JsObjectRef::promise);
        let Some(other) = other else {
            self.settle(exec, Ok(value));
            return;
        };
        if Rc::ptr_eq(&other, self) {
            self.settle(
                exec,
                Err(JsError::type_error("Chaining cycle detected for promise")),
            );
            return;
        }
        match other.outcome() {
            Some(outcome) => self.settle(exec, outcome),
            None => other
                .reactions
                .borrow_mut()
                .push(Reaction::Adopt(self.cheap_clone())),
        }
    }

    pub fn reject(&self, exec: &Exec, err: JsError) {
        self.settle(exec, Err(err));
    }

    /// Settle once; later calls are ignored
    pub fn settle(&self, exec: &Exec, outcome: Result<JsValue, JsError>) {
        if !self.is_pending() {
            return;
        }
        *self.state.borrow_mut() = match &outcome {
            Ok(value) => PromiseState::Fulfilled(value.cheap_clone()),
            Err(err) => PromiseState::Rejected(err.clone()),
        };
        let reactions = std::mem::take(&mut *self.reactions.borrow_mut());
        for reaction in reactions {
            run_reaction(exec, reaction, outcome.clone());
        }
        for waker in std::mem::take(&mut *self.wakers.borrow_mut()) {
            waker.wake();
        }
    }

    /// Register handlers; the derived cell settles with their outcome
    pub fn then(
        &self,
        exec: &Exec,
        on_fulfilled: JsValue,
        on_rejected: JsValue,
        derived: Rc<PromiseCell>,
    ) {
        let reaction = Reaction::Then {
            on_fulfilled,
            on_rejected,
            derived,
            exec: exec.cheap_clone(),
        };
        match self.outcome() {
            Some(outcome) => run_reaction(exec, reaction, outcome),
            None => self.reactions.borrow_mut().push(reaction),
        }
    }
}

fn run_reaction(exec: &Exec, reaction: Reaction, outcome: Result<JsValue, JsError>) {
    match reaction {
        Reaction::Adopt(target) => target.settle(exec, outcome),
        Reaction::Then {
            on_fulfilled,
            on_rejected,
            derived,
            exec: registered,
        } => {
            let handled = match outcome {
                Ok(value) if on_fulfilled.is_callable() => {
                    call_function(&registered, &on_fulfilled, JsValue::Undefined, &[value])
                }
                Err(err) if err.is_catchable() && on_rejected.is_callable() => {
                    let reason = registered.realm().intrinsics.error_value(&err);
                    call_function(&registered, &on_rejected, JsValue::Undefined, &[reason])
                }
                passthrough => passthrough,
            };
            match handled {
                Ok(value) => derived.resolve(&registered, value),
                Err(err) => derived.reject(&registered, err),
            }
        }
    }
}

/// Future resolving when a promise settles, driving its body meanwhile
pub struct Settled {
    cell: Rc<PromiseCell>,
    exec: Exec,
}

impl Settled {
    pub fn new(cell: Rc<PromiseCell>, exec: Exec) -> Self {
        Settled { cell, exec }
    }
}

impl Future for Settled {
    type Output = Result<JsValue, JsError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.cell.outcome() {
            return Poll::Ready(outcome);
        }
        self.cell.drive(&self.exec, cx);
        if let Some(outcome) = self.cell.outcome() {
            return Poll::Ready(outcome);
        }
        self.cell.wakers.borrow_mut().push(cx.waker().clone());
        Poll::Pending
    }
}
