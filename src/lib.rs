//! Capability-scoped evaluation of untrusted JavaScript snippets
//!
//! Source text is compiled into an execution tree once and evaluated against
//! a sandbox global object that only holds the built-ins the host allowed.
//! Every read, write, call and construction passes the security gate first:
//! globals are read-only, prototype members must be allow-listed, and the
//! built-ins that turn strings into code are swapped for sandboxed versions.
//!
//! # Example
//!
//! ```
//! use jsgate::{JsValue, Sandbox};
//!
//! let sandbox = Sandbox::default();
//! let result = sandbox.eval("return 1 * 2 + 3 * (4 + 5) * 6").unwrap();
//! assert_eq!(result, JsValue::Number(164.0));
//!
//! // Escapes through the constructor chain get the sandboxed Function
//! assert!(sandbox.eval("[].filter.constructor('return bypassed = 1')()").is_err());
//! ```

pub mod api;
pub mod context;
pub mod error;
pub mod gate;
pub mod interpreter;
pub mod lisp;
pub mod parser;
pub mod platform;
pub mod prelude;
pub mod realm;
pub mod reference;
pub mod scope;
pub mod value;

pub use api::{Program, Sandbox, SandboxBuilder, SandboxConfig, ScopeArg};
pub use context::{AuditReport, Change, Exec, Subscription};
pub use error::{ErrorKind, JsError};
pub use interpreter::ExecReturn;
pub use scope::Scope;
pub use value::{CheapClone, JsObjectRef, JsString, JsValue, PropertyKey};
