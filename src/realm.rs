//! The built-in world sandboxed code runs in
//!
//! A [`Realm`] owns the intrinsic prototypes, the unrestricted host global
//! object holding every built-in, the virtual timer queue and the platform
//! providers. Sandboxes expose a filtered view of it.

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins;
use crate::interpreter::function::call_function;
use crate::interpreter::task::PromiseCell;
use crate::platform::{ConsoleProvider, RandomProvider, TimeProvider};
use crate::prelude::*;
use crate::value::{
    CheapClone, JsFunction, JsObjectRef, JsString, JsValue, NativeFn, NativeFunction, ObjectKind,
    PropertyKey,
};

/// Signature of the built-in functions
pub type BuiltinFn = fn(&Exec, JsValue, &[JsValue]) -> Result<JsValue, JsError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Intrinsics
// ═══════════════════════════════════════════════════════════════════════════════

/// Prototype objects every realm starts with
pub struct Intrinsics {
    pub object_prototype: JsObjectRef,
    pub function_prototype: JsObjectRef,
    pub array_prototype: JsObjectRef,
    pub string_prototype: JsObjectRef,
    pub number_prototype: JsObjectRef,
    pub boolean_prototype: JsObjectRef,
    pub regexp_prototype: JsObjectRef,
    pub promise_prototype: JsObjectRef,
    pub error_prototype: JsObjectRef,
    pub type_error_prototype: JsObjectRef,
    pub range_error_prototype: JsObjectRef,
    pub reference_error_prototype: JsObjectRef,
    pub syntax_error_prototype: JsObjectRef,
    /// Prototype of every sandbox's global object
    pub sandbox_global_prototype: JsObjectRef,
}

impl Intrinsics {
    fn new() -> Self {
        let object_prototype = JsObjectRef::new(ObjectKind::Ordinary, None);
        let proto = |kind: ObjectKind| JsObjectRef::new(kind, Some(object_prototype.cheap_clone()));
        let function_prototype = proto(ObjectKind::Ordinary);
        let array_prototype = proto(ObjectKind::Array(Vec::new()));
        let string_prototype = proto(ObjectKind::String(JsString::from("")));
        let number_prototype = proto(ObjectKind::Number(0.0));
        let boolean_prototype = proto(ObjectKind::Boolean(false));
        let regexp_prototype = proto(ObjectKind::Ordinary);
        let promise_prototype = proto(ObjectKind::Ordinary);
        let error_prototype = proto(ObjectKind::Ordinary);
        let sandbox_global_prototype = proto(ObjectKind::Ordinary);
        let error_child = || JsObjectRef::new(ObjectKind::Ordinary, Some(error_prototype.cheap_clone()));
        Intrinsics {
            type_error_prototype: error_child(),
            range_error_prototype: error_child(),
            reference_error_prototype: error_child(),
            syntax_error_prototype: error_child(),
            object_prototype: object_prototype.cheap_clone(),
            function_prototype,
            array_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            regexp_prototype,
            promise_prototype,
            error_prototype,
            sandbox_global_prototype,
        }
    }

    /// Whether `object` is one of the shared built-in prototypes
    pub fn is_prototype(&self, object: &JsObjectRef) -> bool {
        [
            &self.object_prototype,
            &self.function_prototype,
            &self.array_prototype,
            &self.string_prototype,
            &self.number_prototype,
            &self.boolean_prototype,
            &self.regexp_prototype,
            &self.promise_prototype,
            &self.error_prototype,
            &self.type_error_prototype,
            &self.range_error_prototype,
            &self.reference_error_prototype,
            &self.syntax_error_prototype,
            &self.sandbox_global_prototype,
        ]
        .into_iter()
        .any(|proto| proto.ptr_eq(object))
    }

    /// A function object backed by host code
    pub fn native_function(
        &self,
        name: &str,
        func: NativeFn,
        construct: Option<NativeFn>,
        arity: usize,
    ) -> JsObjectRef {
        let name = JsString::from(name);
        let obj = JsObjectRef::new(
            ObjectKind::Function(JsFunction::Native(NativeFunction {
                name: name.cheap_clone(),
                func,
                construct,
            })),
            Some(self.function_prototype.cheap_clone()),
        );
        obj.define_hidden("name", JsValue::String(name));
        obj.define_hidden("length", JsValue::from(arity));
        obj
    }

    pub fn builtin(&self, name: &str, func: BuiltinFn, arity: usize) -> JsObjectRef {
        self.native_function(name, Rc::new(func), None, arity)
    }

    /// Install a non-enumerable method
    pub fn register_method(&self, obj: &JsObjectRef, name: &str, func: BuiltinFn, arity: usize) {
        let f = self.builtin(name, func, arity);
        obj.define_hidden(name, JsValue::Object(f));
    }

    /// A constructor linked both ways with `prototype`
    pub fn constructor(
        &self,
        name: &str,
        call: BuiltinFn,
        construct: Option<BuiltinFn>,
        arity: usize,
        prototype: &JsObjectRef,
    ) -> JsObjectRef {
        let construct = construct.map(|f| Rc::new(f) as NativeFn);
        let ctor = self.native_function(name, Rc::new(call), construct, arity);
        ctor.define_hidden("prototype", JsValue::Object(prototype.cheap_clone()));
        prototype.define_hidden("constructor", JsValue::Object(ctor.cheap_clone()));
        ctor
    }

    pub fn object(&self) -> JsObjectRef {
        JsObjectRef::new(ObjectKind::Ordinary, Some(self.object_prototype.cheap_clone()))
    }

    pub fn array(&self, items: Vec<JsValue>) -> JsObjectRef {
        JsObjectRef::new(ObjectKind::Array(items), Some(self.array_prototype.cheap_clone()))
    }

    pub fn array_value(&self, items: Vec<JsValue>) -> JsValue {
        JsValue::Object(self.array(items))
    }

    pub fn error_prototype_for(&self, name: &str) -> &JsObjectRef {
        match name {
            "TypeError" => &self.type_error_prototype,
            "RangeError" => &self.range_error_prototype,
            "ReferenceError" => &self.reference_error_prototype,
            "SyntaxError" => &self.syntax_error_prototype,
            _ => &self.error_prototype,
        }
    }

    pub fn error(&self, name: &str, message: &str) -> JsObjectRef {
        let err = JsObjectRef::new(
            ObjectKind::Error,
            Some(self.error_prototype_for(name).cheap_clone()),
        );
        err.define_hidden("message", JsValue::from(message));
        err
    }

    /// The value a `catch` clause binds for an engine error
    pub fn error_value(&self, err: &JsError) -> JsValue {
        match err {
            JsError::Thrown { value } => value.cheap_clone(),
            other => {
                let name = other.constructor_name().unwrap_or("Error");
                JsValue::Object(self.error(name, &other.message()))
            }
        }
    }

    /// Wrapper object for a primitive receiver
    pub fn box_primitive(&self, value: &JsValue) -> Option<JsObjectRef> {
        let (kind, proto) = match value {
            JsValue::Boolean(b) => (ObjectKind::Boolean(*b), &self.boolean_prototype),
            JsValue::Number(n) => (ObjectKind::Number(*n), &self.number_prototype),
            JsValue::String(s) => (ObjectKind::String(s.cheap_clone()), &self.string_prototype),
            _ => return None,
        };
        Some(JsObjectRef::new(kind, Some(proto.cheap_clone())))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Escape-prone built-ins
// ═══════════════════════════════════════════════════════════════════════════════

/// The built-ins that evaluate strings as code, and their sandboxed stand-ins
pub struct Escapes {
    pub function: JsObjectRef,
    pub eval: JsObjectRef,
    pub set_timeout: JsObjectRef,
    pub set_interval: JsObjectRef,
    pub sandbox_function: JsObjectRef,
    pub sandbox_eval: JsObjectRef,
    pub sandbox_set_timeout: JsObjectRef,
    pub sandbox_set_interval: JsObjectRef,
}

impl Escapes {
    /// Original → replacement pairs for the Gate's replacement map
    pub fn replacements(&self) -> Vec<(JsObjectRef, JsValue)> {
        vec![
            (self.function.cheap_clone(), JsValue::Object(self.sandbox_function.cheap_clone())),
            (self.eval.cheap_clone(), JsValue::Object(self.sandbox_eval.cheap_clone())),
            (self.set_timeout.cheap_clone(), JsValue::Object(self.sandbox_set_timeout.cheap_clone())),
            (self.set_interval.cheap_clone(), JsValue::Object(self.sandbox_set_interval.cheap_clone())),
        ]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Timers
// ═══════════════════════════════════════════════════════════════════════════════

struct Timer {
    id: u32,
    due: u64,
    interval: Option<u64>,
    callback: JsValue,
    args: Vec<JsValue>,
    exec: Exec,
}

/// Host-driven virtual clock
#[derive(Default)]
struct TimerQueue {
    now: u64,
    next_id: u32,
    timers: Vec<Timer>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Realm
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Realm {
    pub intrinsics: Intrinsics,
    /// Every built-in, unfiltered
    pub host_global: JsObjectRef,
    pub escapes: Escapes,
    timers: RefCell<TimerQueue>,
    /// Async bodies parked on a pending promise
    tasks: RefCell<Vec<(Rc<PromiseCell>, Exec)>>,
    console: Rc<dyn ConsoleProvider>,
    random: RefCell<Box<dyn RandomProvider>>,
    time: Box<dyn TimeProvider>,
}

impl Realm {
    pub fn new(
        console: Rc<dyn ConsoleProvider>,
        random: Box<dyn RandomProvider>,
        time: Box<dyn TimeProvider>,
    ) -> Rc<Realm> {
        let intrinsics = Intrinsics::new();
        let host_global = intrinsics.object();
        let escapes = builtins::install(&intrinsics, &host_global);
        log::debug!(
            target: "jsgate::realm",
            "realm created with {} globals",
            host_global.own_keys().len()
        );
        Rc::new(Realm {
            intrinsics,
            host_global,
            escapes,
            timers: RefCell::new(TimerQueue::default()),
            tasks: RefCell::new(Vec::new()),
            console,
            random: RefCell::new(random),
            time,
        })
    }

    pub fn console(&self) -> &dyn ConsoleProvider {
        self.console.as_ref()
    }

    pub fn time(&self) -> &dyn TimeProvider {
        self.time.as_ref()
    }

    pub fn random(&self) -> f64 {
        self.random.borrow_mut().random()
    }

    /// A built-in global by name
    pub fn global(&self, name: &str) -> Option<JsValue> {
        self.host_global.get_own(&PropertyKey::from(name))
    }

    /// The prototype a constructor name refers to in allow-list configuration
    pub fn prototype_of_constructor(&self, name: &str) -> Option<JsObjectRef> {
        if name == "SandboxGlobal" {
            return Some(self.intrinsics.sandbox_global_prototype.cheap_clone());
        }
        match self.global(name)? {
            JsValue::Object(ctor) if ctor.is_callable() => match ctor.get_str("prototype") {
                JsValue::Object(proto) => Some(proto),
                _ => None,
            },
            _ => None,
        }
    }

    // ─── Timers ────────────────────────────────────────────────────────────────

    pub fn schedule(
        &self,
        exec: &Exec,
        callback: JsValue,
        delay: f64,
        repeat: bool,
        args: Vec<JsValue>,
    ) -> u32 {
        let delay = if delay.is_finite() && delay > 0.0 { delay as u64 } else { 0 };
        let mut queue = self.timers.borrow_mut();
        queue.next_id += 1;
        let id = queue.next_id;
        let due = queue.now + delay;
        queue.timers.push(Timer {
            id,
            due,
            interval: repeat.then_some(delay.max(1)),
            callback,
            args,
            exec: exec.cheap_clone(),
        });
        id
    }

    pub fn cancel(&self, id: u32) {
        self.timers.borrow_mut().timers.retain(|t| t.id != id);
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().timers.len()
    }

    /// Milliseconds until the next timer is due
    pub fn next_timer_delay(&self) -> Option<u64> {
        let queue = self.timers.borrow();
        queue.timers.iter().map(|t| t.due.saturating_sub(queue.now)).min()
    }

    // ─── Parked async bodies ───────────────────────────────────────────────────

    pub fn park(&self, cell: Rc<PromiseCell>, exec: Exec) {
        self.tasks.borrow_mut().push((cell, exec));
    }

    /// Poll every parked body until none makes progress
    pub fn run_tasks(&self) {
        loop {
            let parked = std::mem::take(&mut *self.tasks.borrow_mut());
            if parked.is_empty() {
                return;
            }
            let before = parked.len();
            let mut still = Vec::new();
            for (cell, exec) in parked {
                cell.drive_now(&exec);
                if cell.has_task() {
                    still.push((cell, exec));
                }
            }
            let mut tasks = self.tasks.borrow_mut();
            let progressed = still.len() < before || !tasks.is_empty();
            tasks.extend(still);
            if !progressed {
                return;
            }
        }
    }

    pub fn parked_tasks(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Move the virtual clock forward, firing every due timer in due order.
    /// Returns how many callbacks ran.
    pub fn advance_timers(&self, ms: u64) -> Result<usize, JsError> {
        let target = self.timers.borrow().now + ms;
        let mut fired = 0;
        loop {
            let timer = {
                let mut queue = self.timers.borrow_mut();
                let next = queue
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.id))
                    .map(|(i, _)| i);
                let Some(index) = next else {
                    queue.now = target;
                    break;
                };
                let timer = queue.timers.swap_remove(index);
                queue.now = timer.due;
                if let Some(interval) = timer.interval {
                    queue.timers.push(Timer {
                        id: timer.id,
                        due: timer.due + interval,
                        interval: timer.interval,
                        callback: timer.callback.cheap_clone(),
                        args: timer.args.clone(),
                        exec: timer.exec.cheap_clone(),
                    });
                }
                timer
            };
            log::trace!(target: "jsgate::realm", "timer {} fired", timer.id);
            let exec = Exec::new(timer.exec.ctx.cheap_clone(), timer.exec.constants.cheap_clone());
            call_function(&exec, &timer.callback, JsValue::Undefined, &timer.args)?;
            self.run_tasks();
            fired += 1;
        }
        Ok(fired)
    }
}
