//! RegExp built-in, backed by fancy-regex
//!
//! Pattern text is handed to fancy-regex as is; flags `i`, `m` and `s`
//! become inline modifiers. Match positions are reported in UTF-16 code
//! units like every other string index in the sandbox.

use crate::context::Exec;
use crate::error::JsError;
use crate::interpreter::builtins::{arg, this_object};
use crate::prelude::*;
use crate::realm::Intrinsics;
use crate::value::{CheapClone, JsObjectRef, JsValue, ObjectKind, PropertyKey, RegExpData};

const KNOWN_FLAGS: &str = "gimsuy";

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let proto = &intrinsics.regexp_prototype;
    let ctor = intrinsics.constructor("RegExp", regexp_constructor, Some(regexp_constructor), 2, proto);

    intrinsics.register_method(proto, "test", regexp_test, 1);
    intrinsics.register_method(proto, "exec", regexp_exec, 1);
    intrinsics.register_method(proto, "toString", regexp_to_string, 0);

    global.define_hidden("RegExp", JsValue::Object(ctor));
}

/// Compile a pattern into the engine's syntax
fn compile(pattern: &str, flags: &str) -> Result<fancy_regex::Regex, JsError> {
    let mut seen = String::new();
    for c in flags.chars() {
        if !KNOWN_FLAGS.contains(c) || seen.contains(c) {
            return Err(JsError::syntax_error(format!(
                "Invalid flags supplied to RegExp constructor '{flags}'"
            )));
        }
        seen.push(c);
    }
    let modifiers: String = flags.chars().filter(|c| "ims".contains(*c)).collect();
    let source = if modifiers.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{modifiers}){pattern}")
    };
    fancy_regex::Regex::new(&source).map_err(|e| {
        JsError::syntax_error(format!("Invalid regular expression: /{pattern}/: {e}"))
    })
}

/// Build a RegExp object. Used by literals and the constructor.
pub fn create_regexp(exec: &Exec, pattern: &str, flags: &str) -> Result<JsValue, JsError> {
    let regex = compile(pattern, flags)?;
    let data = RegExpData {
        source: pattern.to_string(),
        flags: flags.to_string(),
        regex,
    };
    let obj = JsObjectRef::new(
        ObjectKind::RegExp(Rc::new(data)),
        Some(exec.realm().intrinsics.regexp_prototype.cheap_clone()),
    );
    obj.define_hidden("lastIndex", JsValue::Number(0.0));
    obj.define_hidden("source", JsValue::from(pattern));
    obj.define_hidden("flags", JsValue::from(flags));
    obj.define_hidden("global", JsValue::Boolean(flags.contains('g')));
    obj.define_hidden("ignoreCase", JsValue::Boolean(flags.contains('i')));
    obj.define_hidden("multiline", JsValue::Boolean(flags.contains('m')));
    Ok(JsValue::Object(obj))
}

fn regexp_constructor(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let pattern = arg(args, 0);
    let flags = arg(args, 1);
    if let Some(data) = pattern.as_object().and_then(JsObjectRef::regexp) {
        let flags = match flags {
            JsValue::Undefined => data.flags.clone(),
            other => other.to_js_string().to_string(),
        };
        return create_regexp(exec, &data.source, &flags);
    }
    let pattern = match pattern {
        JsValue::Undefined => "(?:)".to_string(),
        other => other.to_js_string().to_string(),
    };
    let flags = match flags {
        JsValue::Undefined => String::new(),
        other => other.to_js_string().to_string(),
    };
    create_regexp(exec, &pattern, &flags)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Index conversions
// ═══════════════════════════════════════════════════════════════════════════════

/// UTF-16 offset of byte offset `byte` in `s`
pub(crate) fn utf16_offset(s: &str, byte: usize) -> usize {
    s.get(..byte).map_or(0, |prefix| prefix.encode_utf16().count())
}

/// Byte offset of UTF-16 offset `unit` in `s`, clamped to the end
pub(crate) fn byte_offset(s: &str, unit: usize) -> usize {
    let mut units = 0;
    for (i, c) in s.char_indices() {
        if units >= unit {
            return i;
        }
        units += c.len_utf16();
    }
    s.len()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Matching
// ═══════════════════════════════════════════════════════════════════════════════

/// One match: whole text, groups and UTF-16 position
pub(crate) struct Found {
    pub start: usize,
    pub end: usize,
    pub index: usize,
    pub groups: Vec<Option<String>>,
    pub named: Vec<(String, Option<String>)>,
}

impl Found {
    pub fn text(&self) -> &str {
        self.groups.first().and_then(|g| g.as_deref()).unwrap_or("")
    }
}

/// First match at or after byte offset `from`
pub(crate) fn find_at(data: &RegExpData, text: &str, from: usize) -> Result<Option<Found>, JsError> {
    if from > text.len() {
        return Ok(None);
    }
    let caps = data
        .regex
        .captures_from_pos(text, from)
        .map_err(|e| JsError::range_error(format!("Regular expression failed: {e}")))?;
    let Some(caps) = caps else {
        return Ok(None);
    };
    let Some(whole) = caps.get(0) else {
        return Ok(None);
    };
    let groups = (0..caps.len())
        .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
        .collect();
    let named = data
        .regex
        .capture_names()
        .flatten()
        .map(|name| (name.to_string(), caps.name(name).map(|m| m.as_str().to_string())))
        .collect();
    Ok(Some(Found {
        start: whole.start(),
        end: whole.end(),
        index: utf16_offset(text, whole.start()),
        groups,
        named,
    }))
}

/// Every non-overlapping match, the way global replace and match walk
pub(crate) fn find_all(data: &RegExpData, text: &str) -> Result<Vec<Found>, JsError> {
    let mut all = Vec::new();
    let mut pos = 0;
    while let Some(found) = find_at(data, text, pos)? {
        pos = if found.end == found.start {
            // Step over one character on empty matches
            text.get(found.end..)
                .and_then(|rest| rest.chars().next())
                .map_or(text.len() + 1, |c| found.end + c.len_utf8())
        } else {
            found.end
        };
        all.push(found);
    }
    Ok(all)
}

/// The array `exec` and non-global `match` produce
pub(crate) fn match_array(exec: &Exec, found: &Found, input: &str) -> JsValue {
    let intrinsics = &exec.realm().intrinsics;
    let items = found
        .groups
        .iter()
        .map(|g| g.as_deref().map_or(JsValue::Undefined, JsValue::from))
        .collect();
    let array = intrinsics.array(items);
    array.set_str("index", JsValue::from(found.index));
    array.set_str("input", JsValue::from(input));
    let groups = if found.named.is_empty() {
        JsValue::Undefined
    } else {
        let obj = intrinsics.object();
        for (name, value) in &found.named {
            obj.set_str(name, value.as_deref().map_or(JsValue::Undefined, JsValue::from));
        }
        JsValue::Object(obj)
    };
    array.set_str("groups", groups);
    JsValue::Object(array)
}

fn regexp_data(this: &JsValue, method: &str) -> Result<(JsObjectRef, Rc<RegExpData>), JsError> {
    let obj = this_object(this, method)?;
    let data = obj
        .regexp()
        .ok_or_else(|| JsError::type_error(format!("{method} called on incompatible receiver")))?;
    Ok((obj, data))
}

/// Run one match honouring `lastIndex` for global and sticky patterns
fn exec_once(obj: &JsObjectRef, data: &RegExpData, text: &str) -> Result<Option<Found>, JsError> {
    let tracks = data.flags.contains('g') || data.flags.contains('y');
    let from = if tracks {
        let last = obj.get_str("lastIndex").to_number();
        if !last.is_finite() || last < 0.0 { 0 } else { last as usize }
    } else {
        0
    };
    if tracks && from > text.encode_utf16().count() {
        obj.set_str("lastIndex", JsValue::Number(0.0));
        return Ok(None);
    }
    let start = byte_offset(text, from);
    let found = find_at(data, text, start)?.filter(|f| !data.flags.contains('y') || f.start == start);
    if tracks {
        let next = found.as_ref().map_or(0, |f| utf16_offset(text, f.end));
        obj.set(PropertyKey::from("lastIndex"), JsValue::from(next));
    }
    Ok(found)
}

fn regexp_test(_exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (obj, data) = regexp_data(&this, "RegExp.prototype.test")?;
    let text = arg(args, 0).to_js_string();
    Ok(JsValue::Boolean(exec_once(&obj, &data, text.as_str())?.is_some()))
}

fn regexp_exec(exec: &Exec, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (obj, data) = regexp_data(&this, "RegExp.prototype.exec")?;
    let text = arg(args, 0).to_js_string();
    Ok(match exec_once(&obj, &data, text.as_str())? {
        Some(found) => match_array(exec, &found, text.as_str()),
        None => JsValue::Null,
    })
}

fn regexp_to_string(_exec: &Exec, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let (_, data) = regexp_data(&this, "RegExp.prototype.toString")?;
    Ok(JsValue::from(format!("/{}/{}", data.source, data.flags)))
}
