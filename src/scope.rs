//! Scope chain
//!
//! Frames are reference counted and linked to their parent; a closure keeps
//! its defining frame alive by holding a [`Scope`] handle. Frames that belong
//! to a function call (and the root frame) are `var` boundaries. Only
//! non-arrow function frames carry a receiver; `this` lookups walk outward to
//! the nearest frame that has one.
//!
//! The root frame is backed by the sandbox global object: its own properties
//! are global bindings, which scripts can read but never overwrite.

use crate::error::JsError;
use crate::prelude::*;
use crate::reference::{Reference, Target};
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue, PropertyKey};

/// Words that can never name a binding
pub const RESERVED_WORDS: &[&str] = &[
    "instanceof",
    "typeof",
    "return",
    "try",
    "catch",
    "if",
    "finally",
    "else",
    "in",
    "of",
    "var",
    "let",
    "const",
    "for",
    "delete",
    "false",
    "true",
    "while",
    "do",
    "break",
    "continue",
    "new",
    "function",
    "async",
    "await",
    "switch",
    "case",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Declaration keyword of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Clone)]
struct Binding {
    value: JsValue,
    kind: VarKind,
    global: bool,
}

struct Frame {
    parent: Option<Scope>,
    vars: RefCell<IndexMap<JsString, Binding>>,
    /// `var` declarations stop here
    function_scope: bool,
    /// Receiver of a non-arrow function call
    this: Option<JsValue>,
    /// Backing object of the root frame
    global: Option<JsObjectRef>,
}

/// Handle to one frame of the scope chain
#[derive(Clone)]
pub struct Scope(Rc<Frame>);

impl CheapClone for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<JsString> = self.0.vars.borrow().keys().cloned().collect();
        f.debug_struct("Scope")
            .field("vars", &names)
            .field("function_scope", &self.0.function_scope)
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

fn reserved(name: &str) -> JsError {
    JsError::syntax_error(format!("Unexpected token '{name}'"))
}

impl Scope {
    fn from_frame(frame: Frame) -> Scope {
        Scope(Rc::new(frame))
    }

    /// Root frame over a global object, which is also the top-level `this`
    pub fn global(global: JsObjectRef) -> Scope {
        Scope::from_frame(Frame {
            parent: None,
            vars: RefCell::new(index_map_new()),
            function_scope: true,
            this: Some(JsValue::Object(global.cheap_clone())),
            global: Some(global),
        })
    }

    /// Block frame
    pub fn child(&self) -> Scope {
        Scope::from_frame(Frame {
            parent: Some(self.cheap_clone()),
            vars: RefCell::new(index_map_new()),
            function_scope: false,
            this: None,
            global: None,
        })
    }

    /// Function-call frame. Arrow functions pass `None` and see the
    /// enclosing receiver.
    pub fn function(&self, this: Option<JsValue>) -> Scope {
        Scope::from_frame(Frame {
            parent: Some(self.cheap_clone()),
            vars: RefCell::new(index_map_new()),
            function_scope: true,
            this,
            global: None,
        })
    }

    /// Function-scope frame seeded from a host variable bag
    pub fn with_vars<I>(&self, vars: I) -> Scope
    where
        I: IntoIterator<Item = (JsString, JsValue)>,
    {
        let scope = self.function(None);
        {
            let mut map = scope.0.vars.borrow_mut();
            for (name, value) in vars {
                map.insert(
                    name,
                    Binding {
                        value,
                        kind: VarKind::Var,
                        global: false,
                    },
                );
            }
        }
        scope
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    pub fn is_function_scope(&self) -> bool {
        self.0.function_scope
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The receiver visible from this frame
    pub fn this_value(&self) -> JsValue {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(this) = &scope.0.this {
                return this.cheap_clone();
            }
            current = scope.parent();
        }
        JsValue::Undefined
    }

    /// Resolve `name` to a reference. Unknown names resolve to an undeclared
    /// reference rather than failing, so `typeof` can inspect them.
    pub fn get(&self, name: &str) -> Result<Reference, JsError> {
        if name == "this" {
            return Ok(Reference::this(self.this_value()));
        }
        if is_reserved(name) {
            return Err(reserved(name));
        }

        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(global) = &scope.0.global {
                let key = PropertyKey::from(name);
                if let Some(value) = global.get_own(&key) {
                    return Ok(Reference {
                        target: Target::Property {
                            object: global.cheap_clone(),
                            key,
                        },
                        value,
                        is_const: false,
                        is_global: true,
                        is_variable: true,
                    });
                }
            }
            if let Some(binding) = scope.0.vars.borrow().get(name) {
                return Ok(Reference {
                    target: Target::Variable {
                        scope: scope.cheap_clone(),
                        name: JsString::from(name),
                    },
                    value: binding.value.cheap_clone(),
                    is_const: binding.kind == VarKind::Const,
                    is_global: binding.global,
                    is_variable: true,
                });
            }
            current = scope.parent();
        }
        Ok(Reference::undeclared(JsString::from(name)))
    }

    /// Value of a binding, for hosts inspecting a scope after a run
    pub fn lookup(&self, name: &str) -> Option<JsValue> {
        let reference = self.get(name).ok()?;
        match reference.target {
            Target::Undeclared(_) => None,
            _ => Some(reference.value),
        }
    }

    /// Declare a binding. `var` goes to the nearest function frame and may be
    /// repeated; anything else conflicts with an existing name in the frame.
    pub fn declare(
        &self,
        name: &str,
        kind: VarKind,
        value: Option<JsValue>,
        global: bool,
    ) -> Result<(), JsError> {
        if name == "this" {
            return Err(JsError::syntax_error("\"this\" cannot be declared"));
        }
        if is_reserved(name) {
            return Err(reserved(name));
        }

        let mut target = self;
        if kind == VarKind::Var {
            while !target.0.function_scope {
                match target.parent() {
                    Some(parent) => target = parent,
                    None => break,
                }
            }
        }

        let shadows_global = target
            .0
            .global
            .as_ref()
            .is_some_and(|g| g.has_own(&PropertyKey::from(name)));
        let mut vars = target.0.vars.borrow_mut();
        match vars.get_mut(name) {
            None if !shadows_global => {
                vars.insert(
                    JsString::from(name),
                    Binding {
                        value: value.unwrap_or_default(),
                        kind,
                        global,
                    },
                );
                Ok(())
            }
            Some(existing) if existing.kind == VarKind::Var && kind == VarKind::Var => {
                // `var x;` again keeps the current value
                if let Some(value) = value {
                    existing.value = value;
                }
                Ok(())
            }
            _ => Err(JsError::syntax_error(format!(
                "Identifier '{name}' has already been declared"
            ))),
        }
    }

    /// Write an existing binding of this frame
    pub(crate) fn write(&self, name: &str, value: JsValue) -> Result<(), JsError> {
        match self.0.vars.borrow_mut().get_mut(name) {
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => Err(JsError::not_defined(name)),
        }
    }

    /// Checked assignment: the binding must exist and be neither const nor global
    pub fn set(&self, name: &str, value: JsValue) -> Result<(), JsError> {
        if name == "this" {
            return Err(JsError::syntax_error("\"this\" cannot be assigned"));
        }
        let reference = self.get(name)?;
        if reference.is_const {
            return Err(JsError::type_error("Assignment to constant variable."));
        }
        if reference.is_global {
            return Err(JsError::sandbox_error(format!(
                "Cannot override global variable '{name}'"
            )));
        }
        reference.set(value)
    }

    /// Names declared directly in this frame, in declaration order
    pub fn own_names(&self) -> Vec<JsString> {
        self.0.vars.borrow().keys().cloned().collect()
    }
}
