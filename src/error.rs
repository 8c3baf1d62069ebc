//! Error types for the sandbox

use crate::prelude::fmt;
use crate::value::JsValue;
use thiserror::Error;

/// Main error type for compilation and evaluation.
///
/// `SandboxError`, `Timeout`, `QuotaExceeded` and `Internal` are policy or
/// engine failures: scripts cannot observe them with `try/catch`, they always
/// abort the evaluation and reach the host.
#[derive(Debug, Clone, Error)]
pub enum JsError {
    /// Malformed source. `fragment` is the piece of input the parser choked on.
    #[error("ParseError: {message}{}", format_fragment(.fragment))]
    ParseError { message: String, fragment: String },

    /// A capability rule was violated.
    #[error("SandboxError: {message}")]
    SandboxError { message: String },

    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("ReferenceError: {message}")]
    ReferenceError { message: String },

    #[error("SyntaxError: {message}")]
    SyntaxError { message: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    /// A value raised by a `throw` statement or a rejected promise.
    #[error("Uncaught {value}")]
    Thrown { value: JsValue },

    #[error("Timeout: evaluation ran for {elapsed_ms}ms, limit is {timeout_ms}ms")]
    Timeout { timeout_ms: u64, elapsed_ms: u64 },

    #[error("QuotaExceeded: execution quota of {ticks} steps exhausted")]
    QuotaExceeded { ticks: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_fragment(fragment: &str) -> String {
    if fragment.is_empty() {
        String::new()
    } else {
        format!(" near '{}'", truncate(fragment, 40))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => s.get(..end).unwrap_or(s),
        None => s,
    }
}

/// Error classes as seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Sandbox,
    Type,
    Reference,
    Syntax,
    Range,
    Thrown,
    Timeout,
    QuotaExceeded,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Parse => "ParseError",
            ErrorKind::Sandbox => "SandboxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Thrown => "Thrown",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::QuotaExceeded => "QuotaExceeded",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JsError {
    pub fn parse_error(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        JsError::ParseError {
            message: message.into(),
            fragment: fragment.into(),
        }
    }

    pub fn sandbox_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!(target: "jsgate::gate", "rejected: {message}");
        JsError::SandboxError { message }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn reference_error(message: impl Into<String>) -> Self {
        JsError::ReferenceError {
            message: message.into(),
        }
    }

    /// `name is not defined`
    pub fn not_defined(name: impl fmt::Display) -> Self {
        JsError::ReferenceError {
            message: format!("{name} is not defined"),
        }
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        JsError::SyntaxError {
            message: message.into(),
        }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    pub fn thrown(value: JsValue) -> Self {
        JsError::Thrown { value }
    }

    /// Create an internal error for unexpected interpreter states.
    /// These should never happen with a well-formed execution tree.
    pub fn internal(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JsError::ParseError { .. } => ErrorKind::Parse,
            JsError::SandboxError { .. } => ErrorKind::Sandbox,
            JsError::TypeError { .. } => ErrorKind::Type,
            JsError::ReferenceError { .. } => ErrorKind::Reference,
            JsError::SyntaxError { .. } => ErrorKind::Syntax,
            JsError::RangeError { .. } => ErrorKind::Range,
            JsError::Thrown { .. } => ErrorKind::Thrown,
            JsError::Timeout { .. } => ErrorKind::Timeout,
            JsError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            JsError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a script-level `catch` clause may intercept this error.
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self,
            JsError::SandboxError { .. }
                | JsError::Timeout { .. }
                | JsError::QuotaExceeded { .. }
                | JsError::Internal(_)
        )
    }

    /// Name of the script-visible error constructor for this error, if any.
    pub fn constructor_name(&self) -> Option<&'static str> {
        match self {
            JsError::TypeError { .. } => Some("TypeError"),
            JsError::ReferenceError { .. } => Some("ReferenceError"),
            JsError::SyntaxError { .. } | JsError::ParseError { .. } => Some("SyntaxError"),
            JsError::RangeError { .. } => Some("RangeError"),
            _ => None,
        }
    }

    /// The message without the error class prefix
    pub fn message(&self) -> String {
        match self {
            JsError::ParseError { message, .. }
            | JsError::SandboxError { message }
            | JsError::TypeError { message }
            | JsError::ReferenceError { message }
            | JsError::SyntaxError { message }
            | JsError::RangeError { message } => message.clone(),
            JsError::Internal(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// The thrown value, for `Thrown` errors
    pub fn thrown_value(&self) -> Option<&JsValue> {
        match self {
            JsError::Thrown { value } => Some(value),
            _ => None,
        }
    }
}
