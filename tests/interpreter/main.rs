//! Integration tests for the evaluator, organized by feature
//!
//! Every test runs through the public [`Sandbox`] API with the safe default
//! configuration unless it builds its own sandbox. Programs report their
//! value with `return`; a program without one evaluates to `undefined`.

mod api;
mod array;
mod async_await;
mod basics;
mod control_flow;
mod error;
mod function;
mod json;
mod math;
mod number;
mod regexp;
mod security;
mod string;
mod timers;

use std::rc::Rc;

use jsgate::platform::{NoOpConsoleProvider, NoOpTimeProvider, StdRandomProvider};
use jsgate::{ErrorKind, JsError, JsValue, Sandbox, SandboxConfig};

/// Sandbox with deterministic providers
pub fn sandbox_with(config: SandboxConfig) -> Sandbox {
    Sandbox::builder()
        .config(config)
        .console(Rc::new(NoOpConsoleProvider))
        .random(Box::new(StdRandomProvider::with_seed(7)))
        .time(Box::new(NoOpTimeProvider))
        .build()
}

pub fn sandbox() -> Sandbox {
    sandbox_with(SandboxConfig::safe())
}

/// Evaluate and unwrap the returned value
#[allow(clippy::expect_used)]
pub fn eval(source: &str) -> JsValue {
    eval_result(source).expect("eval failed")
}

pub fn eval_result(source: &str) -> Result<JsValue, JsError> {
    sandbox().eval(source)
}

/// Evaluate and render the result as a string, for compact assertions
pub fn eval_str(source: &str) -> String {
    eval(source).to_string()
}

/// Whether evaluation fails with a message containing `error_contains`
pub fn throws_error(source: &str, error_contains: &str) -> bool {
    match eval_result(source) {
        Err(e) => e.to_string().contains(error_contains),
        Ok(_) => false,
    }
}

/// Category of the error evaluation fails with
pub fn error_kind(source: &str) -> Option<ErrorKind> {
    eval_result(source).err().map(|e| e.kind())
}
