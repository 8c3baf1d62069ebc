//! Evaluation strategies
//!
//! The evaluator is written once, generic over a [`Walker`]. Every node
//! evaluation is a future. The synchronous walker drives that future to
//! completion in place and never suspends; the awaiting walker is handed to
//! the caller as a real future so `await` can park it.

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::error::JsError;

/// Pending evaluation of one node
pub type Eval<'a, T> = LocalBoxFuture<'a, Result<T, JsError>>;

pub trait Walker: 'static {
    /// Whether `await` may park the walk
    const CAN_SUSPEND: bool;
    const NAME: &'static str;
}

/// Resolves every child immediately
pub struct SyncWalker;

impl Walker for SyncWalker {
    const CAN_SUSPEND: bool = false;
    const NAME: &'static str = "sync";
}

/// Resolves children through awaited continuations
pub struct AsyncWalker;

impl Walker for AsyncWalker {
    const CAN_SUSPEND: bool = true;
    const NAME: &'static str = "async";
}

/// Where `break` and `continue` are legal
#[derive(Debug, Clone, Copy, Default)]
pub struct Flow {
    pub in_loop: bool,
    pub in_switch: bool,
}

impl Flow {
    pub fn in_loop(self) -> Flow {
        Flow {
            in_loop: true,
            in_switch: false,
        }
    }

    pub fn in_switch(self) -> Flow {
        Flow {
            in_loop: self.in_loop,
            in_switch: true,
        }
    }

    /// Function bodies start without an enclosing loop or switch
    pub fn function() -> Flow {
        Flow::default()
    }
}

/// Drive a synchronous walk to its result
pub fn run_sync<T>(walk: Eval<'_, T>) -> Result<T, JsError> {
    match walk.now_or_never() {
        Some(result) => result,
        None => Err(JsError::internal("synchronous evaluation suspended")),
    }
}
