//! Console built-in methods, forwarded to the realm's console provider

use crate::context::Exec;
use crate::error::JsError;
use crate::platform::ConsoleLevel;
use crate::realm::Intrinsics;
use crate::value::{JsObjectRef, JsValue};

pub fn install(intrinsics: &Intrinsics, global: &JsObjectRef) {
    let console = intrinsics.object();
    intrinsics.register_method(&console, "log", console_log, 0);
    intrinsics.register_method(&console, "info", console_info, 0);
    intrinsics.register_method(&console, "debug", console_debug, 0);
    intrinsics.register_method(&console, "warn", console_warn, 0);
    intrinsics.register_method(&console, "error", console_error, 0);
    global.define_hidden("console", JsValue::Object(console));
}

/// Space-separated rendering of the arguments; strings print bare
fn format_args(args: &[JsValue]) -> String {
    args.iter()
        .map(|v| v.to_js_string().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn write(exec: &Exec, level: ConsoleLevel, args: &[JsValue]) -> Result<JsValue, JsError> {
    exec.realm().console().write(level, &format_args(args));
    Ok(JsValue::Undefined)
}

fn console_log(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    write(exec, ConsoleLevel::Log, args)
}

fn console_info(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    write(exec, ConsoleLevel::Info, args)
}

fn console_debug(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    write(exec, ConsoleLevel::Debug, args)
}

fn console_warn(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    write(exec, ConsoleLevel::Warn, args)
}

fn console_error(exec: &Exec, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    write(exec, ConsoleLevel::Error, args)
}
