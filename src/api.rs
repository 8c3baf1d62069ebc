//! Public embedding API
//!
//! A [`Sandbox`] owns a realm plus the policy built from a
//! [`SandboxConfig`]. Source is compiled once into a [`Program`] that can be
//! executed any number of times, each call getting its own scope chain and
//! audit accumulator.
//!
//! # Example
//!
//! ```
//! use jsgate::{JsValue, Sandbox, SandboxConfig, ScopeArg};
//!
//! let sandbox = Sandbox::new(SandboxConfig::safe());
//! let program = sandbox.compile("return a * 2 + Math.max(1, 3)").unwrap();
//! let ret = program.execute(&[ScopeArg::vars([("a", JsValue::Number(4.0))])]).unwrap();
//! assert_eq!(ret.result, JsValue::Number(11.0));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::{
    AllowList, Change, Exec, ExecOptions, ExecutionContext, PrototypeReplacement, Subscription,
};
use crate::error::JsError;
use crate::interpreter::builtins::json;
use crate::interpreter::function::call_function;
use crate::interpreter::{ExecReturn, execute_tree, execute_tree_async};
use crate::lisp::Item;
use crate::parser::{self, Constants};
use crate::platform::{
    ConsoleProvider, LogConsoleProvider, RandomProvider, StdRandomProvider, StdTimeProvider,
    TimeProvider,
};
use crate::prelude::*;
use crate::realm::Realm;
use crate::scope::Scope;
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue, NativeFn, ObjectKind, PropertyKey};

/// Upper bound on timer rounds [`Sandbox::resolve_promise`] runs before
/// declaring a promise stuck
const MAX_SETTLE_ROUNDS: usize = 10_000;

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// Host policy data. Loadable from JSON; missing fields take the
/// [`SandboxConfig::safe`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SandboxConfig {
    /// Built-in globals visible to scripts
    pub globals: Vec<String>,
    /// Constructor name → allowed prototype members. An empty list allows
    /// every member.
    pub prototype_whitelist: IndexMap<String, Vec<String>>,
    pub audit: bool,
    pub forbid_function_calls: bool,
    pub forbid_function_creation: bool,
    /// Evaluation steps allowed per call
    pub execution_quota: Option<u64>,
    /// Wall-clock limit per call; 0 disables it
    pub timeout_ms: u64,
}

const SAFE_GLOBALS: &[&str] = &[
    "Function",
    "eval",
    "console",
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "NaN",
    "Infinity",
    "Boolean",
    "Number",
    "String",
    "Object",
    "Array",
    "Error",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "Promise",
    "JSON",
    "Math",
];

const SAFE_PROTOTYPES: &[&str] = &[
    "SandboxGlobal",
    "Function",
    "Boolean",
    "Object",
    "Number",
    "String",
    "RegExp",
    "Error",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "Array",
    "Promise",
];

impl SandboxConfig {
    /// Conventional safe defaults: the pure built-ins, every member of
    /// their prototypes, no timers and no regex literals
    pub fn safe() -> Self {
        let mut prototype_whitelist = IndexMap::default();
        for name in SAFE_PROTOTYPES {
            prototype_whitelist.insert((*name).to_string(), Vec::new());
        }
        SandboxConfig {
            globals: SAFE_GLOBALS.iter().map(|s| (*s).to_string()).collect(),
            prototype_whitelist,
            audit: false,
            forbid_function_calls: false,
            forbid_function_creation: false,
            execution_quota: None,
            timeout_ms: 0,
        }
    }

    /// Nothing exposed at all
    pub fn empty() -> Self {
        SandboxConfig {
            globals: Vec::new(),
            prototype_whitelist: IndexMap::default(),
            ..Self::safe()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, JsError> {
        serde_json::from_str(text)
            .map_err(|e| JsError::syntax_error(format!("invalid sandbox configuration: {e}")))
    }

    fn options(&self) -> ExecOptions {
        ExecOptions {
            audit: self.audit,
            forbid_function_calls: self.forbid_function_calls,
            forbid_function_creation: self.forbid_function_creation,
            execution_quota: self.execution_quota,
            timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::safe()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// A host value waiting for the realm to exist
enum HostGlobal {
    Value(JsValue),
    Json(serde_json::Value),
    Function { func: NativeFn, arity: usize },
}

pub struct SandboxBuilder {
    config: SandboxConfig,
    globals: Vec<(String, HostGlobal)>,
    replacements: Vec<(String, PrototypeReplacement)>,
    console: Rc<dyn ConsoleProvider>,
    random: Box<dyn RandomProvider>,
    time: Box<dyn TimeProvider>,
}

impl SandboxBuilder {
    fn new() -> Self {
        SandboxBuilder {
            config: SandboxConfig::safe(),
            globals: Vec::new(),
            replacements: Vec::new(),
            console: Rc::new(LogConsoleProvider),
            random: Box::new(StdRandomProvider::new()),
            time: Box::new(StdTimeProvider::new()),
        }
    }

    pub fn config(mut self, config: SandboxConfig) -> Self {
        self.config = config;
        self
    }

    /// Expose a read-only global binding
    pub fn global(mut self, name: impl Into<String>, value: impl Into<JsValue>) -> Self {
        self.globals.push((name.into(), HostGlobal::Value(value.into())));
        self
    }

    /// Expose a global built from JSON data
    pub fn global_json(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.globals.push((name.into(), HostGlobal::Json(value)));
        self
    }

    /// Expose a host function
    pub fn global_function<F>(mut self, name: impl Into<String>, arity: usize, func: F) -> Self
    where
        F: Fn(&Exec, JsValue, &[JsValue]) -> Result<JsValue, JsError> + 'static,
    {
        let func: NativeFn = Rc::new(func);
        self.globals.push((name.into(), HostGlobal::Function { func, arity }));
        self
    }

    /// Hand scripts `replace(value, is_static)` instead of the named
    /// constructor's members
    pub fn prototype_replacement<F>(mut self, constructor: impl Into<String>, replace: F) -> Self
    where
        F: Fn(&JsValue, bool) -> JsValue + 'static,
    {
        self.replacements.push((constructor.into(), Rc::new(replace)));
        self
    }

    pub fn console(mut self, console: Rc<dyn ConsoleProvider>) -> Self {
        self.console = console;
        self
    }

    pub fn random(mut self, random: Box<dyn RandomProvider>) -> Self {
        self.random = random;
        self
    }

    pub fn time(mut self, time: Box<dyn TimeProvider>) -> Self {
        self.time = time;
        self
    }

    pub fn build(self) -> Sandbox {
        let realm = Realm::new(self.console, self.random, self.time);
        let intrinsics = &realm.intrinsics;
        let global = JsObjectRef::new(
            ObjectKind::Ordinary,
            Some(intrinsics.sandbox_global_prototype.cheap_clone()),
        );
        let mut policy = AllowList::new();

        for name in &self.config.globals {
            match realm.global(name) {
                Some(value) => {
                    if let JsValue::Object(obj) = &value {
                        policy.allow_global(obj);
                    }
                    global.define_hidden(name.as_str(), value);
                }
                None => log::warn!(target: "jsgate::api", "unknown global '{name}' ignored"),
            }
        }
        for (original, replacement) in realm.escapes.replacements() {
            policy.replace(&original, replacement.cheap_clone());
            if let JsValue::Object(replacement) = &replacement {
                policy.allow_global(replacement);
            }
        }

        for (name, value) in self.globals {
            let value = match value {
                HostGlobal::Value(value) => value,
                HostGlobal::Json(json) => json::from_json(intrinsics, json),
                HostGlobal::Function { func, arity } => {
                    JsValue::Object(intrinsics.native_function(&name, func, None, arity))
                }
            };
            if let JsValue::Object(obj) = &value {
                policy.allow_global(obj);
            }
            global.define_hidden(name.as_str(), value);
        }

        for (name, members) in &self.config.prototype_whitelist {
            match realm.prototype_of_constructor(name) {
                Some(proto) => policy.allow_prototype(&proto, members.iter().map(String::as_str)),
                None => log::warn!(target: "jsgate::api", "no prototype for '{name}' in whitelist"),
            }
        }
        for (name, replace) in self.replacements {
            match realm.global(&name) {
                Some(JsValue::Object(ctor)) => policy.replace_prototype(&ctor, replace),
                _ => log::warn!(target: "jsgate::api", "no constructor '{name}' to replace"),
            }
        }

        let ctx = ExecutionContext::new(realm.cheap_clone(), self.config.options(), global, Box::new(policy));
        log::debug!(
            target: "jsgate::api",
            "sandbox created: {} globals, {} whitelisted prototypes",
            ctx.sandbox_global.borrow().properties.len(),
            self.config.prototype_whitelist.len()
        );
        Sandbox {
            realm,
            ctx: Rc::new(ctx),
            config: self.config,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scopes
// ═══════════════════════════════════════════════════════════════════════════════

/// One layer of the scope chain a program runs in
#[derive(Debug, Clone)]
pub enum ScopeArg {
    /// Variables layered on top of the chain built so far
    Vars(Vec<(JsString, JsValue)>),
    /// An explicit scope; replaces the chain built so far
    Scope(Scope),
}

impl ScopeArg {
    pub fn vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<JsString>,
        V: Into<JsValue>,
    {
        ScopeArg::Vars(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<Scope> for ScopeArg {
    fn from(scope: Scope) -> Self {
        ScopeArg::Scope(scope)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sandbox
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Sandbox {
    realm: Rc<Realm>,
    ctx: Rc<ExecutionContext>,
    config: SandboxConfig,
}

impl Default for Sandbox {
    fn default() -> Self {
        Sandbox::new(SandboxConfig::safe())
    }
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        SandboxBuilder::new().config(config).build()
    }

    pub fn builder() -> SandboxBuilder {
        SandboxBuilder::new()
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn realm(&self) -> &Rc<Realm> {
        &self.realm
    }

    /// The object backing the root scope
    pub fn global_object(&self) -> &JsObjectRef {
        &self.ctx.sandbox_global
    }

    pub fn compile(&self, code: &str) -> Result<Program, JsError> {
        let parsed = parser::parse(code)?;
        log::debug!(target: "jsgate::api", "compiled {} statements", parsed.tree.len());
        Ok(Program {
            ctx: self.ctx.cheap_clone(),
            tree: Rc::new(parsed.tree),
            constants: Rc::new(parsed.constants),
        })
    }

    /// Compile and run once with no host variables
    pub fn eval(&self, code: &str) -> Result<JsValue, JsError> {
        Ok(self.compile(code)?.execute(&[])?.result)
    }

    /// Run `code` with every built-in exposed and nothing enforced,
    /// recording what it touches
    pub fn audit(&self, code: &str) -> Result<ExecReturn, JsError> {
        let global = JsObjectRef::new(
            ObjectKind::Ordinary,
            Some(self.realm.intrinsics.sandbox_global_prototype.cheap_clone()),
        );
        let mut policy = AllowList::new().auditing();
        let builtins: Vec<(PropertyKey, JsValue)> = self
            .realm
            .host_global
            .borrow()
            .properties
            .iter()
            .map(|(key, prop)| (key.clone(), prop.value.cheap_clone()))
            .collect();
        for (key, value) in builtins {
            if let JsValue::Object(obj) = &value {
                policy.allow_global(obj);
            }
            global.define_hidden(&key.to_string(), value);
        }
        for (original, replacement) in self.realm.escapes.replacements() {
            policy.replace(&original, replacement);
        }
        let options = ExecOptions {
            audit: true,
            ..self.config.options()
        };
        let ctx = ExecutionContext::new(self.realm.cheap_clone(), options, global, Box::new(policy));
        let parsed = parser::parse(code)?;
        let program = Program {
            ctx: Rc::new(ctx),
            tree: Rc::new(parsed.tree),
            constants: Rc::new(parsed.constants),
        };
        program.execute(&[])
    }

    /// A scope over the sandbox globals that keeps its bindings across calls
    pub fn new_scope<I, K, V>(&self, vars: I) -> Scope
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<JsString>,
        V: Into<JsValue>,
    {
        self.ctx
            .global_scope
            .with_vars(vars.into_iter().map(|(k, v)| (k.into(), v.into())))
    }

    fn host_exec(&self) -> Exec {
        Exec::new(self.ctx.cheap_clone(), Rc::new(Constants::new()))
    }

    /// Call a script function from the host
    pub fn call(&self, callee: &JsValue, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        let exec = self.host_exec();
        let result = call_function(&exec, callee, this, args);
        self.realm.run_tasks();
        result
    }

    pub fn value_from_json(&self, value: serde_json::Value) -> JsValue {
        json::from_json(&self.realm.intrinsics, value)
    }

    /// JSON view of a script value; `None` where JSON has no representation
    pub fn to_json(&self, value: &JsValue) -> Result<Option<serde_json::Value>, JsError> {
        json::to_json(&self.host_exec(), value.cheap_clone())
    }

    // ─── Subscriptions ─────────────────────────────────────────────────────────

    /// Observe every property read scripts make on non-global objects
    pub fn subscribe_get<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&JsObjectRef, &PropertyKey) + 'static,
    {
        self.ctx.subscriptions.on_get(Rc::new(callback))
    }

    /// Observe writes to one property
    pub fn subscribe_set<F>(&self, object: &JsObjectRef, key: impl Into<PropertyKey>, callback: F) -> Subscription
    where
        F: Fn(&Change) + 'static,
    {
        self.ctx
            .subscriptions
            .on_set(object, key.into(), Rc::new(callback))
    }

    /// Observe structural changes of one object
    pub fn subscribe_change<F>(&self, object: &JsObjectRef, callback: F) -> Subscription
    where
        F: Fn(&Change) + 'static,
    {
        self.ctx.subscriptions.on_change(object, Rc::new(callback))
    }

    // ─── Timers and promises ───────────────────────────────────────────────────

    /// Move the virtual clock forward. Returns how many callbacks ran.
    pub fn advance_timers(&self, ms: u64) -> Result<usize, JsError> {
        self.realm.advance_timers(ms)
    }

    pub fn pending_timers(&self) -> usize {
        self.realm.pending_timers()
    }

    /// Settle a promise value by driving suspended bodies and timers.
    /// Non-promise values come back unchanged.
    pub fn resolve_promise(&self, value: &JsValue) -> Result<JsValue, JsError> {
        let Some(cell) = value.as_object().and_then(JsObjectRef::promise) else {
            return Ok(value.cheap_clone());
        };
        let exec = self.host_exec();
        for _ in 0..MAX_SETTLE_ROUNDS {
            cell.drive_now(&exec);
            self.realm.run_tasks();
            if let Some(outcome) = cell.outcome() {
                return outcome;
            }
            match self.realm.next_timer_delay() {
                Some(delay) => {
                    self.realm.advance_timers(delay)?;
                }
                None => break,
            }
        }
        Err(JsError::internal("promise never settles"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Program
// ═══════════════════════════════════════════════════════════════════════════════

/// A compiled program bound to its sandbox
#[derive(Clone)]
pub struct Program {
    ctx: Rc<ExecutionContext>,
    tree: Rc<Vec<Item>>,
    constants: Rc<Constants>,
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("statements", &self.tree.len())
            .finish_non_exhaustive()
    }
}

impl Program {
    pub fn tree(&self) -> &[Item] {
        &self.tree
    }

    /// Build the scope chain. Bags of variables without an explicit scope
    /// get a fresh frame, so top-level declarations never leak between calls.
    fn scope(&self, scopes: &[ScopeArg]) -> Scope {
        let mut scope: Option<Scope> = None;
        for arg in scopes {
            scope = Some(match arg {
                ScopeArg::Scope(explicit) => explicit.cheap_clone(),
                ScopeArg::Vars(vars) => scope
                    .as_ref()
                    .unwrap_or(&self.ctx.global_scope)
                    .with_vars(vars.iter().cloned()),
            });
        }
        scope.unwrap_or_else(|| self.ctx.global_scope.function(None))
    }

    pub fn execute(&self, scopes: &[ScopeArg]) -> Result<ExecReturn, JsError> {
        let exec = Exec::new(self.ctx.cheap_clone(), self.constants.cheap_clone());
        execute_tree(&exec, &self.scope(scopes), &self.tree)
    }

    /// Run with suspension support; `await` on a pending promise parks the
    /// returned future
    pub async fn execute_async(&self, scopes: &[ScopeArg]) -> Result<ExecReturn, JsError> {
        let exec = Exec::new(self.ctx.cheap_clone(), self.constants.cheap_clone());
        let scope = self.scope(scopes);
        execute_tree_async(&exec, &scope, &self.tree).await
    }
}
