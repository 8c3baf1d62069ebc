//! Host services the evaluator depends on.
//!
//! The sandbox never touches the clock, the random source or an output
//! stream directly; hosts can swap any of them through the builder.

mod std_impl;

pub use std_impl::{LogConsoleProvider, StdRandomProvider, StdTimeProvider};

/// Monotonic clock behind the per-call wall-clock limit.
pub trait TimeProvider {
    /// Opaque start mark for [`TimeProvider::elapsed_millis`].
    fn start_timer(&self) -> u64;

    /// Milliseconds since `start` was taken.
    fn elapsed_millis(&self, start: u64) -> u64;
}

/// Source of `Math.random()` values.
pub trait RandomProvider {
    /// Next value in `[0, 1)`.
    fn random(&mut self) -> f64;
}

/// A clock that never advances, so timeouts never fire.
pub struct NoOpTimeProvider;

impl TimeProvider for NoOpTimeProvider {
    fn start_timer(&self) -> u64 {
        0
    }

    fn elapsed_millis(&self, _start: u64) -> u64 {
        0
    }
}

/// Which `console` method produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Debug,
    Warn,
    Error,
}

/// Receiver for the output of `console.*` calls made by scripts.
pub trait ConsoleProvider {
    /// `message` is the space-joined rendering of the call's arguments.
    fn write(&self, level: ConsoleLevel, message: &str);
}

/// Drops everything scripts print.
pub struct NoOpConsoleProvider;

impl ConsoleProvider for NoOpConsoleProvider {
    fn write(&self, _level: ConsoleLevel, _message: &str) {}
}
