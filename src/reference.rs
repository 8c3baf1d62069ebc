//! Resolved lvalues
//!
//! A [`Reference`] is what identifier and member resolution produce: the slot
//! a value was read from plus the flags the Gate checks before a write. The
//! value is captured at resolution time so reading it again is free.

use crate::error::JsError;
use crate::scope::Scope;
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue, PropertyKey};

/// Where a reference points
#[derive(Debug, Clone)]
pub enum Target {
    /// A name no frame declares
    Undeclared(JsString),
    /// A binding in a scope frame
    Variable { scope: Scope, name: JsString },
    /// A property slot of an object
    Property { object: JsObjectRef, key: PropertyKey },
    /// A property read through a primitive receiver
    Primitive { value: JsValue, key: PropertyKey },
    /// The current receiver
    This,
    /// The result of an expression that is not a slot
    Temporary,
    /// An optional chain cut short by a nullish link
    ShortCircuit,
}

#[derive(Debug, Clone)]
pub struct Reference {
    pub target: Target,
    pub value: JsValue,
    pub is_const: bool,
    pub is_global: bool,
    /// Resolved through the scope chain rather than a member access
    pub is_variable: bool,
}

impl Reference {
    pub fn undeclared(name: JsString) -> Self {
        Reference {
            target: Target::Undeclared(name),
            value: JsValue::Undefined,
            is_const: false,
            is_global: false,
            is_variable: true,
        }
    }

    pub fn this(value: JsValue) -> Self {
        Reference {
            target: Target::This,
            value,
            is_const: true,
            is_global: false,
            is_variable: true,
        }
    }

    pub fn temporary(value: JsValue) -> Self {
        Reference {
            target: Target::Temporary,
            value,
            is_const: false,
            is_global: false,
            is_variable: false,
        }
    }

    /// Rest of an optional chain after `?.` met `null` or `undefined`
    pub fn short_circuit() -> Self {
        Reference {
            target: Target::ShortCircuit,
            ..Reference::temporary(JsValue::Undefined)
        }
    }

    pub fn is_short_circuit(&self) -> bool {
        matches!(self.target, Target::ShortCircuit)
    }

    pub fn property(object: JsObjectRef, key: PropertyKey, value: JsValue, is_global: bool) -> Self {
        Reference {
            target: Target::Property { object, key },
            value,
            is_const: false,
            is_global,
            is_variable: false,
        }
    }

    pub fn is_undeclared(&self) -> bool {
        matches!(self.target, Target::Undeclared(_))
    }

    /// The referenced value; undeclared names raise a ReferenceError
    pub fn get(&self) -> Result<JsValue, JsError> {
        match &self.target {
            Target::Undeclared(name) => Err(JsError::not_defined(name)),
            _ => Ok(self.value.cheap_clone()),
        }
    }

    /// Receiver to pass when the referenced value is called
    pub fn receiver(&self) -> JsValue {
        match &self.target {
            Target::Property { object, .. } => JsValue::Object(object.cheap_clone()),
            Target::Primitive { value, .. } => value.cheap_clone(),
            _ => JsValue::Undefined,
        }
    }

    /// Name of the slot for error messages
    pub fn name(&self) -> String {
        match &self.target {
            Target::Undeclared(name) | Target::Variable { name, .. } => name.to_string(),
            Target::Property { key, .. } | Target::Primitive { key, .. } => key.to_string(),
            Target::This => "this".to_string(),
            Target::Temporary | Target::ShortCircuit => self.value.to_string(),
        }
    }

    /// Raw write, no policy checks
    pub fn set(&self, value: JsValue) -> Result<(), JsError> {
        match &self.target {
            Target::Variable { scope, name } => scope.write(name.as_str(), value),
            Target::Property { object, key } => {
                object.set(key.clone(), value);
                Ok(())
            }
            Target::Undeclared(name) => Err(JsError::not_defined(name)),
            Target::Primitive { key, .. } => Err(JsError::type_error(format!(
                "Cannot create property '{key}' on a primitive value"
            ))),
            Target::This => Err(JsError::syntax_error("Invalid left-hand side in assignment")),
            Target::Temporary | Target::ShortCircuit => {
                Err(JsError::syntax_error("Invalid left-hand side in assignment"))
            }
        }
    }
}
