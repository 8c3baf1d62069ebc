//! JavaScript value representation
//!
//! The core JsValue type and related structures for representing JavaScript values at runtime.
//! Objects are plain `Rc<RefCell<..>>` cells: a sandboxed evaluation is short-lived, so the
//! few cycles closures create live as long as the sandbox does.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::task::PromiseCell;
use crate::lisp::FunctionDef;
use crate::prelude::*;
use crate::scope::Scope;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This makes it explicit when a clone is just a reference count increment
/// versus a deep copy of data.
pub trait CheapClone: Clone {
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

// Rc<RefCell<T>> is covered by this
impl<T: ?Sized> CheapClone for Rc<T> {}

/// A JavaScript value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(JsObjectRef),
}

impl CheapClone for JsValue {}

impl JsValue {
    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    /// Check if this value is callable (a function)
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.is_callable(),
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&JsObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the typeof result for this value
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object", // Historical quirk
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(obj) => {
                if obj.is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// Convert to boolean (ToBoolean)
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }

    /// Convert to number (ToNumber)
    pub fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(true) => 1.0,
            JsValue::Boolean(false) => 0.0,
            JsValue::Number(n) => *n,
            JsValue::String(s) => string_to_number(s.as_str()),
            JsValue::Object(obj) => match obj.primitive_value() {
                Some(prim) => prim.to_number(),
                None => string_to_number(&obj.to_display_string()),
            },
        }
    }

    /// Convert to string (ToString)
    pub fn to_js_string(&self) -> JsString {
        match self {
            JsValue::String(s) => s.cheap_clone(),
            other => JsString::from(other.to_string()),
        }
    }

    /// ToPrimitive with the default hint. Objects never run script code here:
    /// wrappers unwrap, everything else uses its built-in string form.
    pub fn to_primitive(&self) -> JsValue {
        match self {
            JsValue::Object(obj) => match obj.primitive_value() {
                Some(prim) => prim,
                None => JsValue::String(JsString::from(obj.to_display_string())),
            },
            other => other.cheap_clone(),
        }
    }

    pub fn to_int32(&self) -> i32 {
        to_int32(self.to_number())
    }

    pub fn to_uint32(&self) -> u32 {
        to_int32(self.to_number()) as u32
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// SameValueZero, used by `includes`
    pub fn same_value_zero(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// Abstract equality (==)
    pub fn loose_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
            (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => {
                false
            }
            (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
            (JsValue::Number(_), JsValue::String(_)) | (JsValue::String(_), JsValue::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (JsValue::Boolean(_), _) => JsValue::Number(self.to_number()).loose_equals(other),
            (_, JsValue::Boolean(_)) => self.loose_equals(&JsValue::Number(other.to_number())),
            (JsValue::Object(_), _) => self.to_primitive().loose_equals(other),
            (_, JsValue::Object(_)) => self.loose_equals(&other.to_primitive()),
            _ => self.strict_equals(other),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            JsValue::String(s) => write!(f, "{s:?}"),
            JsValue::Object(obj) => write!(f, "[{} {}]", obj.class_name(), obj.id()),
        }
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Object(obj) => write!(f, "{}", obj.to_display_string()),
        }
    }
}

impl PartialEq for JsValue {
    /// Structural comparison for host code and tests: primitives by value,
    /// objects by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<usize> for JsValue {
    fn from(n: usize) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObjectRef> for JsValue {
    fn from(obj: JsObjectRef) -> Self {
        JsValue::Object(obj)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Strings
// ═══════════════════════════════════════════════════════════════════════════════

/// Reference-counted string for efficient string handling
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Rc<str>);

// JsString wraps Rc<str>, so clone is cheap (just reference count increment)
impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Length in UTF-16 code units, which is what scripts observe as `.length`
    pub fn utf16_len(&self) -> usize {
        self.0.encode_utf16().count()
    }

    /// The code unit at `index` as a one-unit string
    pub fn code_unit_at(&self, index: usize) -> Option<JsString> {
        let unit = self.0.encode_utf16().nth(index)?;
        Some(JsString::from(String::from_utf16_lossy(&[unit])))
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(s.into())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Property keys
// ═══════════════════════════════════════════════════════════════════════════════

/// Property key (string or array index)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Index(u32),
}

impl PropertyKey {
    pub fn from_value(value: &JsValue) -> Self {
        match value {
            JsValue::Number(n) => {
                let idx = *n as u32;
                if idx as f64 == *n && *n >= 0.0 && idx != u32::MAX {
                    PropertyKey::Index(idx)
                } else {
                    PropertyKey::String(value.to_js_string())
                }
            }
            JsValue::String(s) => PropertyKey::from(s.cheap_clone()),
            _ => PropertyKey::String(value.to_js_string()),
        }
    }

    /// Check if this key equals a string literal (avoids allocation)
    #[inline]
    pub fn eq_str(&self, s: &str) -> bool {
        match self {
            PropertyKey::String(js_str) => js_str.as_str() == s,
            PropertyKey::Index(_) => false,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, PropertyKey::Index(_))
    }

    pub fn to_value(&self) -> JsValue {
        match self {
            PropertyKey::String(s) => JsValue::String(s.cheap_clone()),
            PropertyKey::Index(i) => JsValue::String(JsString::from(i.to_string())),
        }
    }
}

fn canonical_index(s: &str) -> Option<u32> {
    let first = s.bytes().next()?;
    if !first.is_ascii_digit() {
        return None;
    }
    let idx = s.parse::<u32>().ok()?;
    // Verify it's canonical (no leading zeros except "0")
    (idx != u32::MAX && idx.to_string() == s).then_some(idx)
}

impl From<&str> for PropertyKey {
    #[inline]
    fn from(s: &str) -> Self {
        match canonical_index(s) {
            Some(idx) => PropertyKey::Index(idx),
            None => PropertyKey::String(JsString::from(s)),
        }
    }
}

impl From<JsString> for PropertyKey {
    #[inline]
    fn from(s: JsString) -> Self {
        match canonical_index(s.as_str()) {
            Some(idx) => PropertyKey::Index(idx),
            None => PropertyKey::String(s),
        }
    }
}

impl From<u32> for PropertyKey {
    fn from(idx: u32) -> Self {
        PropertyKey::Index(idx)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Object property slot
#[derive(Debug, Clone)]
pub struct Property {
    pub value: JsValue,
    pub enumerable: bool,
}

impl Property {
    pub fn data(value: JsValue) -> Self {
        Self {
            value,
            enumerable: true,
        }
    }

    /// Built-in methods and bookkeeping slots that `for...in` must skip
    pub fn hidden(value: JsValue) -> Self {
        Self {
            value,
            enumerable: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Objects
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable identity of an object, used as the key of allow-lists and
/// subscription tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sparse writes further than this past the end of an array land in the
/// property table instead of growing the element vector.
const MAX_ARRAY_GROWTH: usize = 1 << 20;

/// A JavaScript object
pub struct JsObject {
    id: ObjectId,
    pub prototype: Option<JsObjectRef>,
    pub properties: IndexMap<PropertyKey, Property>,
    pub kind: ObjectKind,
}

/// Internal slots of the exotic object kinds the sandbox knows about
pub enum ObjectKind {
    Ordinary,
    Array(Vec<JsValue>),
    Function(JsFunction),
    Error,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Promise(Rc<PromiseCell>),
    RegExp(Rc<RegExpData>),
}

/// Compiled pattern of a RegExp object
pub struct RegExpData {
    pub source: String,
    pub flags: String,
    pub regex: fancy_regex::Regex,
}

impl RegExpData {
    pub fn global(&self) -> bool {
        self.flags.contains('g')
    }
}

/// Shared, mutable handle to an object
#[derive(Clone)]
pub struct JsObjectRef(Rc<RefCell<JsObject>>);

impl CheapClone for JsObjectRef {}

impl fmt::Debug for JsObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]", self.class_name(), self.id())
    }
}

impl JsObjectRef {
    pub fn new(kind: ObjectKind, prototype: Option<JsObjectRef>) -> Self {
        JsObjectRef(Rc::new(RefCell::new(JsObject {
            id: ObjectId::next(),
            prototype,
            properties: index_map_new(),
            kind,
        })))
    }

    pub fn id(&self) -> ObjectId {
        self.0.borrow().id
    }

    pub fn borrow(&self) -> Ref<'_, JsObject> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, JsObject> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &JsObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn prototype(&self) -> Option<JsObjectRef> {
        self.0.borrow().prototype.clone()
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Array(_))
    }

    /// The function slot, if this object is callable
    pub fn function(&self) -> Option<JsFunction> {
        match &self.0.borrow().kind {
            ObjectKind::Function(f) => Some(f.clone()),
            _ => None,
        }
    }

    /// Elements of an array object
    pub fn array_elements(&self) -> Option<Vec<JsValue>> {
        match &self.0.borrow().kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    pub fn promise(&self) -> Option<Rc<PromiseCell>> {
        match &self.0.borrow().kind {
            ObjectKind::Promise(cell) => Some(cell.clone()),
            _ => None,
        }
    }

    pub fn regexp(&self) -> Option<Rc<RegExpData>> {
        match &self.0.borrow().kind {
            ObjectKind::RegExp(data) => Some(data.clone()),
            _ => None,
        }
    }

    /// Wrapped primitive of Boolean/Number/String objects
    pub fn primitive_value(&self) -> Option<JsValue> {
        match &self.0.borrow().kind {
            ObjectKind::Boolean(b) => Some(JsValue::Boolean(*b)),
            ObjectKind::Number(n) => Some(JsValue::Number(*n)),
            ObjectKind::String(s) => Some(JsValue::String(s.cheap_clone())),
            _ => None,
        }
    }

    /// Own property lookup, including the virtual slots of arrays and strings
    pub fn get_own(&self, key: &PropertyKey) -> Option<JsValue> {
        let obj = self.0.borrow();
        match (&obj.kind, key) {
            (ObjectKind::Array(items), PropertyKey::Index(i)) => {
                if let Some(v) = items.get(*i as usize) {
                    return Some(v.cheap_clone());
                }
            }
            (ObjectKind::Array(items), PropertyKey::String(s)) if s.as_str() == "length" => {
                return Some(JsValue::Number(items.len() as f64));
            }
            (ObjectKind::String(s), PropertyKey::Index(i)) => {
                if let Some(unit) = s.code_unit_at(*i as usize) {
                    return Some(JsValue::String(unit));
                }
            }
            (ObjectKind::String(s), PropertyKey::String(k)) if k.as_str() == "length" => {
                return Some(JsValue::Number(s.utf16_len() as f64));
            }
            _ => {}
        }
        obj.properties.get(key).map(|p| p.value.cheap_clone())
    }

    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.get_own(key).is_some()
    }

    /// Find the object on the prototype chain (self included) that owns `key`
    pub fn find_owner(&self, key: &PropertyKey) -> Option<JsObjectRef> {
        let mut current = Some(self.cheap_clone());
        while let Some(obj) = current {
            if obj.has_own(key) {
                return Some(obj);
            }
            current = obj.prototype();
        }
        None
    }

    /// [[Get]] walking the prototype chain
    pub fn get(&self, key: &PropertyKey) -> JsValue {
        let mut current = Some(self.cheap_clone());
        while let Some(obj) = current {
            if let Some(v) = obj.get_own(key) {
                return v;
            }
            current = obj.prototype();
        }
        JsValue::Undefined
    }

    pub fn get_str(&self, key: &str) -> JsValue {
        self.get(&PropertyKey::from(key))
    }

    pub fn has_property(&self, key: &PropertyKey) -> bool {
        self.find_owner(key).is_some()
    }

    /// [[Set]] on the own property table
    pub fn set(&self, key: PropertyKey, value: JsValue) {
        let mut obj = self.0.borrow_mut();
        let obj = &mut *obj;
        match (&mut obj.kind, &key) {
            (ObjectKind::Array(items), PropertyKey::Index(i)) => {
                let i = *i as usize;
                if i < items.len() {
                    if let Some(slot) = items.get_mut(i) {
                        *slot = value;
                    }
                    return;
                }
                if i - items.len() < MAX_ARRAY_GROWTH {
                    items.resize(i, JsValue::Undefined);
                    items.push(value);
                    return;
                }
            }
            (ObjectKind::Array(items), PropertyKey::String(s)) if s.as_str() == "length" => {
                let len = value.to_number();
                if len >= 0.0 && len.fract() == 0.0 {
                    let len = len as usize;
                    if len <= items.len() + MAX_ARRAY_GROWTH {
                        items.resize(len, JsValue::Undefined);
                    }
                }
                return;
            }
            (ObjectKind::String(_), _) if is_string_virtual(&key) => return,
            _ => {}
        }
        match obj.properties.get_mut(&key) {
            Some(prop) => prop.value = value,
            None => {
                obj.properties.insert(key, Property::data(value));
            }
        }
    }

    pub fn set_str(&self, key: &str, value: JsValue) {
        self.set(PropertyKey::from(key), value);
    }

    /// Define a non-enumerable property
    pub fn define_hidden(&self, key: &str, value: JsValue) {
        self.0
            .borrow_mut()
            .properties
            .insert(PropertyKey::from(key), Property::hidden(value));
    }

    pub fn delete(&self, key: &PropertyKey) -> bool {
        let mut obj = self.0.borrow_mut();
        if let (ObjectKind::Array(items), PropertyKey::Index(i)) = (&mut obj.kind, key) {
            if let Some(slot) = items.get_mut(*i as usize) {
                *slot = JsValue::Undefined;
            }
            return true;
        }
        obj.properties.shift_remove(key);
        true
    }

    /// Own enumerable keys in insertion order, array indices first
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let obj = self.0.borrow();
        let mut keys = Vec::new();
        match &obj.kind {
            ObjectKind::Array(items) => {
                keys.extend((0..items.len() as u32).map(PropertyKey::Index));
            }
            ObjectKind::String(s) => {
                keys.extend((0..s.utf16_len() as u32).map(PropertyKey::Index));
            }
            _ => {}
        }
        keys.extend(
            obj.properties
                .iter()
                .filter(|(_, p)| p.enumerable)
                .map(|(k, _)| k.clone()),
        );
        keys
    }

    /// Name of the constructor on the prototype chain, for messages
    pub fn constructor_name(&self) -> String {
        match self.get_str("constructor") {
            JsValue::Object(ctor) => match ctor.get_own(&PropertyKey::from("name")) {
                Some(JsValue::String(name)) => name.to_string(),
                _ => "Object".to_string(),
            },
            _ => "Object".to_string(),
        }
    }

    pub fn class_name(&self) -> &'static str {
        match &self.0.borrow().kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::Boolean(_) => "Boolean",
            ObjectKind::Number(_) => "Number",
            ObjectKind::String(_) => "String",
            ObjectKind::Promise(_) => "Promise",
            ObjectKind::RegExp(_) => "RegExp",
        }
    }

    /// The built-in string conversion of an object
    pub fn to_display_string(&self) -> String {
        let mut seen = Vec::new();
        self.display_inner(&mut seen)
    }

    fn display_inner(&self, seen: &mut Vec<ObjectId>) -> String {
        let id = self.id();
        if seen.contains(&id) {
            return String::new();
        }
        seen.push(id);
        let out = match &self.0.borrow().kind {
            ObjectKind::Array(items) => items
                .iter()
                .map(|v| match v {
                    JsValue::Undefined | JsValue::Null => String::new(),
                    JsValue::Object(o) => o.display_inner(seen),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            ObjectKind::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
            ObjectKind::Error => {
                let name = self.get_str("name").to_string();
                let message = self.get_str("message").to_string();
                if message.is_empty() {
                    name
                } else {
                    format!("{name}: {message}")
                }
            }
            ObjectKind::Boolean(b) => b.to_string(),
            ObjectKind::Number(n) => number_to_string(*n),
            ObjectKind::String(s) => s.to_string(),
            ObjectKind::RegExp(data) => format!("/{}/{}", data.source, data.flags),
            ObjectKind::Promise(_) => "[object Promise]".to_string(),
            ObjectKind::Ordinary => "[object Object]".to_string(),
        };
        seen.pop();
        out
    }
}

fn is_string_virtual(key: &PropertyKey) -> bool {
    key.is_index() || key.eq_str("length")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Functions
// ═══════════════════════════════════════════════════════════════════════════════

/// Host function signature: `(exec, this, args)`
pub type NativeFn = Rc<dyn Fn(&Exec, JsValue, &[JsValue]) -> Result<JsValue, JsError>>;

/// Function slot of a callable object
#[derive(Clone)]
pub enum JsFunction {
    /// Implemented by the host
    Native(NativeFunction),
    /// Created by sandboxed code. Only these carry the capability tag that
    /// lets `new` bypass the global allow-list.
    Sandboxed(SandboxedFunction),
}

impl JsFunction {
    pub fn name(&self) -> JsString {
        match self {
            JsFunction::Native(f) => f.name.cheap_clone(),
            JsFunction::Sandboxed(f) => f
                .def
                .name
                .clone()
                .unwrap_or_else(|| JsString::from("")),
        }
    }

    pub fn is_sandboxed(&self) -> bool {
        matches!(self, JsFunction::Sandboxed(_))
    }
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub func: NativeFn,
    /// Invoked by `new`; `None` means the function is not a constructor
    pub construct: Option<NativeFn>,
}

/// A closure over sandboxed code
#[derive(Clone)]
pub struct SandboxedFunction {
    pub def: Rc<FunctionDef>,
    /// Defining scope; `None` runs the body against the global scope
    pub scope: Option<Scope>,
    /// Evaluation handle captured at creation
    pub exec: Exec,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Numeric conversions
// ═══════════════════════════════════════════════════════════════════════════════

/// Number::toString(10)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        // Rust renders 1e21 as "1e21", JavaScript wants "1e+21"
        let s = format!("{n:e}");
        return match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => s,
        };
    }
    if n.fract() == 0.0 && abs < 9.007_199_254_740_992e15 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

/// StringToNumber
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    let (sign, body) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };
    if body == "Infinity" {
        return sign * f64::INFINITY;
    }
    let radix = |prefix_lower: &str, prefix_upper: &str, radix: u32| {
        body.strip_prefix(prefix_lower)
            .or_else(|| body.strip_prefix(prefix_upper))
            .map(|digits| (digits, radix))
    };
    if let Some((digits, radix)) = radix("0x", "0X", 16)
        .or_else(|| radix("0o", "0O", 8))
        .or_else(|| radix("0b", "0B", 2))
    {
        // Signed hex literals are not numeric strings
        if sign < 0.0 || s.starts_with('+') {
            return f64::NAN;
        }
        return u64::from_str_radix(digits, radix).map_or(f64::NAN, |v| v as f64);
    }
    // Rust accepts "inf" and "nan", JavaScript does not
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    body.parse::<f64>().map_or(f64::NAN, |v| sign * v)
}

/// ToInt32
pub fn to_int32(n: f64) -> i32 {
    if n.is_nan() || n.is_infinite() {
        return 0;
    }
    let n = math::trunc(n);
    let m = math::fmod(n, 4_294_967_296.0);
    let m = if m < 0.0 { m + 4_294_967_296.0 } else { m };
    (m as u64 as u32) as i32
}
