//! Evaluation context
//!
//! [`ExecutionContext`] is shared by every evaluation a sandbox runs: the
//! realm, the policy the Gate consults, the subscription registry and the
//! behaviour flags. [`Exec`] pairs it with the literal tables of one compiled
//! program and the per-call state (tick counter, clock, audit accumulator).

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::Serialize;

use crate::error::JsError;
use crate::parser::Constants;
use crate::prelude::*;
use crate::realm::Realm;
use crate::scope::Scope;
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue, ObjectId, PropertyKey};

// ═══════════════════════════════════════════════════════════════════════════════
// Options
// ═══════════════════════════════════════════════════════════════════════════════

/// Behaviour flags of a sandbox
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Record accessed globals and prototype members instead of enforcing
    pub audit: bool,
    pub forbid_function_calls: bool,
    pub forbid_function_creation: bool,
    /// Maximum number of evaluation steps per call
    pub execution_quota: Option<u64>,
    /// Wall-clock limit per call
    pub timeout: Option<Duration>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy
// ═══════════════════════════════════════════════════════════════════════════════

/// Substitute object handed out instead of a constructor or its instances.
/// The flag is `true` for static access through the constructor itself.
pub type PrototypeReplacement = Rc<dyn Fn(&JsValue, bool) -> JsValue>;

/// The registry the Gate queries before reads, calls and constructions
pub trait Policy {
    /// Whether the value is one of the exposed global bindings
    fn is_allowed_global(&self, value: &JsObjectRef) -> bool;

    /// Whether the prototype has an allow-list entry at all
    fn is_allowed_prototype(&self, proto: &JsObjectRef) -> bool;

    /// Whether `member` of `proto` may be read
    fn allows_member(&self, proto: &JsObjectRef, member: &PropertyKey) -> bool;

    /// Sandboxed stand-in for an escape-prone built-in
    fn replacement(&self, value: &JsObjectRef) -> Option<JsValue>;

    fn prototype_replacement(&self, ctor: &JsObjectRef) -> Option<PrototypeReplacement>;

    /// Whether violations are recorded rather than rejected
    fn enforcing(&self) -> bool {
        true
    }
}

/// Identity-keyed allow-lists built from a sandbox configuration
#[derive(Default)]
pub struct AllowList {
    globals: FxHashSet<ObjectId>,
    /// Prototype → allowed member names. An empty set allows every member.
    prototypes: FxHashMap<ObjectId, FxHashSet<JsString>>,
    replacements: FxHashMap<ObjectId, JsValue>,
    prototype_replacements: FxHashMap<ObjectId, PrototypeReplacement>,
    /// Audit runs record instead of rejecting
    auditing: bool,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop enforcing member and construction rules
    pub fn auditing(mut self) -> Self {
        self.auditing = true;
        self
    }

    pub fn allow_global(&mut self, value: &JsObjectRef) {
        self.globals.insert(value.id());
    }

    pub fn allow_prototype<I, S>(&mut self, proto: &JsObjectRef, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<JsString>,
    {
        self.prototypes
            .insert(proto.id(), members.into_iter().map(Into::into).collect());
    }

    pub fn replace(&mut self, original: &JsObjectRef, replacement: JsValue) {
        self.replacements.insert(original.id(), replacement);
    }

    pub fn replace_prototype(&mut self, ctor: &JsObjectRef, replacement: PrototypeReplacement) {
        self.prototype_replacements.insert(ctor.id(), replacement);
    }
}

impl Policy for AllowList {
    fn is_allowed_global(&self, value: &JsObjectRef) -> bool {
        self.globals.contains(&value.id())
    }

    fn is_allowed_prototype(&self, proto: &JsObjectRef) -> bool {
        self.auditing || self.prototypes.contains_key(&proto.id())
    }

    fn allows_member(&self, proto: &JsObjectRef, member: &PropertyKey) -> bool {
        if self.auditing {
            return true;
        }
        match self.prototypes.get(&proto.id()) {
            Some(members) => {
                members.is_empty()
                    || match member {
                        PropertyKey::String(name) => members.contains(name),
                        PropertyKey::Index(i) => members.contains(i.to_string().as_str()),
                    }
            }
            None => false,
        }
    }

    fn replacement(&self, value: &JsObjectRef) -> Option<JsValue> {
        self.replacements.get(&value.id()).cloned()
    }

    fn prototype_replacement(&self, ctor: &JsObjectRef) -> Option<PrototypeReplacement> {
        self.prototype_replacements.get(&ctor.id()).cloned()
    }

    fn enforcing(&self) -> bool {
        !self.auditing
    }
}

/// No Gate at all. This is the policy of the raw code-evaluation
/// built-ins, which is why sandboxes always swap them out.
pub struct Unrestricted;

impl Policy for Unrestricted {
    fn is_allowed_global(&self, _value: &JsObjectRef) -> bool {
        false
    }

    fn is_allowed_prototype(&self, _proto: &JsObjectRef) -> bool {
        true
    }

    fn allows_member(&self, _proto: &JsObjectRef, _member: &PropertyKey) -> bool {
        true
    }

    fn replacement(&self, _value: &JsObjectRef) -> Option<JsValue> {
        None
    }

    fn prototype_replacement(&self, _ctor: &JsObjectRef) -> Option<PrototypeReplacement> {
        None
    }

    fn enforcing(&self) -> bool {
        false
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ═══════════════════════════════════════════════════════════════════════════════

/// A write or structural change observed on an object
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A new own property was assigned
    Create { prop: PropertyKey },
    /// An existing own property was overwritten
    Replace,
    Delete { prop: PropertyKey },
    Push { added: Vec<JsValue> },
    Pop { removed: Vec<JsValue> },
    Shift { removed: Vec<JsValue> },
    Unshift { added: Vec<JsValue> },
    Splice {
        start_index: usize,
        delete_count: usize,
        added: Vec<JsValue>,
        removed: Vec<JsValue>,
    },
    Reverse,
    Sort,
    CopyWithin {
        start_index: usize,
        end_index: usize,
        added: Vec<JsValue>,
        removed: Vec<JsValue>,
    },
}

pub type GetCallback = Rc<dyn Fn(&JsObjectRef, &PropertyKey)>;
pub type ChangeCallback = Rc<dyn Fn(&Change)>;

/// Callbacks registered by the host
#[derive(Default)]
pub struct Subscriptions {
    next_id: Cell<u64>,
    get: RefCell<Vec<(u64, GetCallback)>>,
    set: RefCell<FxHashMap<(ObjectId, PropertyKey), Vec<(u64, ChangeCallback)>>>,
    change: RefCell<FxHashMap<ObjectId, Vec<(u64, ChangeCallback)>>>,
}

impl Subscriptions {
    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    pub fn has_get(&self) -> bool {
        !self.get.borrow().is_empty()
    }

    pub fn on_get(self: &Rc<Self>, callback: GetCallback) -> Subscription {
        let id = self.next_id();
        self.get.borrow_mut().push((id, callback));
        Subscription::new(self, id)
    }

    /// Watch writes to `key` of `object`. When the property currently holds
    /// an object, structural changes of that object are reported too.
    pub fn on_set(self: &Rc<Self>, object: &JsObjectRef, key: PropertyKey, callback: ChangeCallback) -> Subscription {
        let id = self.next_id();
        if let JsValue::Object(inner) = object.get(&key) {
            self.change
                .borrow_mut()
                .entry(inner.id())
                .or_default()
                .push((id, callback.clone()));
        }
        self.set
            .borrow_mut()
            .entry((object.id(), key))
            .or_default()
            .push((id, callback));
        Subscription::new(self, id)
    }

    pub fn on_change(self: &Rc<Self>, object: &JsObjectRef, callback: ChangeCallback) -> Subscription {
        let id = self.next_id();
        self.change
            .borrow_mut()
            .entry(object.id())
            .or_default()
            .push((id, callback));
        Subscription::new(self, id)
    }

    fn remove(&self, id: u64) {
        self.get.borrow_mut().retain(|(i, _)| *i != id);
        for callbacks in self.set.borrow_mut().values_mut() {
            callbacks.retain(|(i, _)| *i != id);
        }
        for callbacks in self.change.borrow_mut().values_mut() {
            callbacks.retain(|(i, _)| *i != id);
        }
    }

    // Callbacks are cloned out before running so they may subscribe or
    // unsubscribe themselves.

    pub fn fire_get(&self, object: &JsObjectRef, key: &PropertyKey) {
        let callbacks: Vec<GetCallback> = self.get.borrow().iter().map(|(_, cb)| cb.clone()).collect();
        for cb in callbacks {
            cb(object, key);
        }
    }

    pub fn fire_set(&self, object: &JsObjectRef, key: &PropertyKey, change: &Change) {
        let callbacks: Vec<ChangeCallback> = self
            .set
            .borrow()
            .get(&(object.id(), key.clone()))
            .map(|list| list.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();
        for cb in callbacks {
            cb(change);
        }
    }

    pub fn has_change(&self, object: &JsObjectRef) -> bool {
        self.change
            .borrow()
            .get(&object.id())
            .is_some_and(|list| !list.is_empty())
    }

    pub fn fire_change(&self, object: &JsObjectRef, change: &Change) {
        let callbacks: Vec<ChangeCallback> = self
            .change
            .borrow()
            .get(&object.id())
            .map(|list| list.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();
        for cb in callbacks {
            cb(change);
        }
    }
}

/// Handle returned by the subscribe calls
pub struct Subscription {
    registry: Weak<Subscriptions>,
    id: u64,
}

impl Subscription {
    fn new(registry: &Rc<Subscriptions>, id: u64) -> Self {
        Subscription {
            registry: Rc::downgrade(registry),
            id,
        }
    }

    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Audit
// ═══════════════════════════════════════════════════════════════════════════════

/// Globals and prototype members a program touched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub globals_access: BTreeSet<String>,
    /// Constructor name → accessed members
    pub prototype_access: BTreeMap<String, BTreeSet<String>>,
}

impl AuditReport {
    pub fn record_global(&mut self, name: &str) {
        self.globals_access.insert(name.to_string());
    }

    pub fn record_member(&mut self, constructor: String, member: &PropertyKey) {
        self.prototype_access
            .entry(constructor)
            .or_default()
            .insert(member.to_string());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything an evaluation shares with its sandbox
pub struct ExecutionContext {
    pub realm: Rc<Realm>,
    pub options: ExecOptions,
    /// Object backing the root scope; also the top-level `this`
    pub sandbox_global: JsObjectRef,
    pub global_scope: Scope,
    pub policy: Box<dyn Policy>,
    pub subscriptions: Rc<Subscriptions>,
    /// Assignments to undeclared names create properties on the global
    /// object instead of failing
    pub sloppy_globals: bool,
}

impl ExecutionContext {
    pub fn new(
        realm: Rc<Realm>,
        options: ExecOptions,
        sandbox_global: JsObjectRef,
        policy: Box<dyn Policy>,
    ) -> Self {
        let global_scope = Scope::global(sandbox_global.cheap_clone());
        ExecutionContext {
            realm,
            options,
            sandbox_global,
            global_scope,
            policy,
            subscriptions: Rc::new(Subscriptions::default()),
            sloppy_globals: false,
        }
    }

    /// Context of the raw code-evaluation built-ins: every built-in
    /// reachable, nothing enforced
    pub fn unrestricted(realm: Rc<Realm>) -> Self {
        let global = realm.host_global.cheap_clone();
        let mut ctx = ExecutionContext::new(
            realm,
            ExecOptions::default(),
            global,
            Box::new(Unrestricted),
        );
        ctx.sloppy_globals = true;
        ctx
    }
}

/// Per-call mutable state
pub struct CallState {
    ticks: Cell<u64>,
    started: u64,
    pub audit: RefCell<Option<AuditReport>>,
}

/// Evaluation handle: shared context, literal tables and per-call state
#[derive(Clone)]
pub struct Exec {
    pub ctx: Rc<ExecutionContext>,
    pub constants: Rc<Constants>,
    pub state: Rc<CallState>,
}

impl CheapClone for Exec {}

/// Check the wall clock every this many steps
const CLOCK_INTERVAL: u64 = 256;

impl Exec {
    /// Start a new evaluation call
    pub fn new(ctx: Rc<ExecutionContext>, constants: Rc<Constants>) -> Self {
        let audit = ctx.options.audit.then(AuditReport::default);
        let started = ctx.realm.time().start_timer();
        Exec {
            ctx,
            constants,
            state: Rc::new(CallState {
                ticks: Cell::new(0),
                started,
                audit: RefCell::new(audit),
            }),
        }
    }

    /// The same call running code from other literal tables
    pub fn with_constants(&self, constants: Rc<Constants>) -> Self {
        Exec {
            ctx: self.ctx.cheap_clone(),
            constants,
            state: self.state.cheap_clone(),
        }
    }

    /// Code captured by `captured` running as part of this call
    pub fn joined(&self, captured: &Exec) -> Self {
        Exec {
            ctx: captured.ctx.cheap_clone(),
            constants: captured.constants.cheap_clone(),
            state: self.state.cheap_clone(),
        }
    }

    pub fn realm(&self) -> &Realm {
        &self.ctx.realm
    }

    pub fn ticks(&self) -> u64 {
        self.state.ticks.get()
    }

    /// Count one evaluation step against the quota
    pub fn tick(&self) -> Result<(), JsError> {
        let ticks = self.state.ticks.get() + 1;
        self.state.ticks.set(ticks);
        if let Some(quota) = self.ctx.options.execution_quota
            && ticks > quota
        {
            return Err(JsError::QuotaExceeded { ticks: quota });
        }
        if ticks % CLOCK_INTERVAL == 0 {
            self.check_timeout()?;
        }
        Ok(())
    }

    /// Consulted by loops and calls
    pub fn check_timeout(&self) -> Result<(), JsError> {
        let Some(timeout) = self.ctx.options.timeout else {
            return Ok(());
        };
        let elapsed = self.realm().time().elapsed_millis(self.state.started);
        let limit = timeout.as_millis() as u64;
        if elapsed > limit {
            return Err(JsError::Timeout {
                timeout_ms: limit,
                elapsed_ms: elapsed,
            });
        }
        Ok(())
    }

    pub fn audit(&self, record: impl FnOnce(&mut AuditReport)) {
        if let Some(report) = self.state.audit.borrow_mut().as_mut() {
            record(report);
        }
    }

    pub fn take_audit(&self) -> Option<AuditReport> {
        self.state.audit.borrow_mut().take()
    }
}
