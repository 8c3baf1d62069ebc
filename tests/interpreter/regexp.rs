//! Regular expressions. Regex literals need `RegExp` among the globals.

use super::sandbox_with;
use jsgate::{ErrorKind, JsValue, Sandbox, SandboxConfig};

fn regex_sandbox() -> Sandbox {
    let mut config = SandboxConfig::safe();
    config.globals.push("RegExp".to_string());
    sandbox_with(config)
}

fn eval(source: &str) -> JsValue {
    regex_sandbox().eval(source).unwrap()
}

fn eval_str(source: &str) -> String {
    eval(source).to_string()
}

#[test]
fn test_literal_test() {
    assert_eq!(eval(r"return /^\d+$/.test('123')"), JsValue::Boolean(true));
    assert_eq!(eval(r"return /^\d+$/.test('12a')"), JsValue::Boolean(false));
    assert_eq!(eval("return /abc/i.test('xABCx')"), JsValue::Boolean(true));
}

#[test]
fn test_literal_properties() {
    assert_eq!(eval_str("return /a+b/gi.source"), "a+b");
    assert_eq!(eval_str("return /a+b/gi.flags"), "gi");
    assert_eq!(eval("return /a/g.global"), JsValue::Boolean(true));
    assert_eq!(eval("return /a/.ignoreCase"), JsValue::Boolean(false));
    assert_eq!(eval_str("return /x/m.toString()"), "/x/m");
}

#[test]
fn test_slashes_in_strings_are_not_regexes() {
    assert_eq!(eval_str("return '/not/a/regex/'.length + ''"), "13");
    assert_eq!(eval("return 10 / 2 / 5"), JsValue::Number(1.0));
}

#[test]
fn test_constructor() {
    assert_eq!(eval("return new RegExp('b+').test('abbc')"), JsValue::Boolean(true));
    assert_eq!(eval_str("return RegExp('x', 'g').flags"), "g");
    let err = regex_sandbox().eval("return new RegExp('(')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    let err = regex_sandbox().eval("return new RegExp('a', 'q')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn test_exec_groups_and_index() {
    assert_eq!(
        eval_str(r"const m = /(\d+)-(\d+)/.exec('on 12-34'); return m[0] + '|' + m[1] + '|' + m[2] + '|' + m.index"),
        "12-34|12|34|3"
    );
    assert_eq!(eval("return /z/.exec('abc')"), JsValue::Null);
    assert_eq!(
        eval_str(r"return /(?<year>\d{4})/.exec('in 2024').groups.year"),
        "2024"
    );
}

#[test]
fn test_global_exec_advances_last_index() {
    let src = r"
        const re = /\d/g
        const seen = []
        let m
        while ((m = re.exec('a1b2c3')) !== null) seen.push(m[0] + '@' + re.lastIndex)
        return seen.join(',')
    ";
    assert_eq!(eval_str(src), "1@2,2@4,3@6");
}

#[test]
fn test_string_match() {
    assert_eq!(eval_str(r"return 'a1b22c333'.match(/\d+/g).join(',')"), "1,22,333");
    assert_eq!(eval(r"return 'abc'.match(/\d/g)"), JsValue::Null);
    assert_eq!(eval_str(r"return 'key=val'.match(/(\w+)=(\w+)/)[2]"), "val");
}

#[test]
fn test_string_replace() {
    assert_eq!(eval_str("return 'a-b-c'.replace(/-/g, '+')"), "a+b+c");
    assert_eq!(eval_str("return 'a-b-c'.replace(/-/, '+')"), "a+b-c");
    assert_eq!(eval_str(r"return 'john smith'.replace(/(\w+) (\w+)/, '$2, $1')"), "smith, john");
    assert_eq!(
        eval_str(r"return 'a1b2'.replace(/\d/g, d => d * 2)"),
        "a2b4"
    );
}

#[test]
fn test_string_split() {
    assert_eq!(eval_str(r"return 'a, b,c'.split(/,\s*/).join('|')"), "a|b|c");
    assert_eq!(eval_str(r"return 'a1b2c'.split(/(\d)/).join('|')"), "a|1|b|2|c");
}

#[test]
fn test_unicode_indices() {
    assert_eq!(eval("return /b/.exec('😀b').index"), JsValue::Number(2.0));
}
