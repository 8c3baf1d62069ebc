//! Span scanning
//!
//! [`rest_of_exp`] finds how far an expression extends given a set of
//! terminators, skipping balanced brackets and quoted text. The statement
//! splitter on top of it understands the block-bodied control constructs and
//! automatic semicolon insertion at top-level newlines.

use fancy_regex::Regex;

use crate::error::JsError;

/// A terminator for [`rest_of_exp`]
#[derive(Clone, Copy)]
pub enum Stop<'r> {
    Char(char),
    Regex(&'r Regex),
}

impl Stop<'_> {
    pub(crate) fn matches(&self, rest: &str) -> bool {
        match self {
            Stop::Char(c) => rest.starts_with(*c),
            Stop::Regex(re) => re.is_match(rest).unwrap_or(false),
        }
    }
}

fn closing_of(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        '\'' | '"' | '`' => Some(open),
        _ => None,
    }
}

fn is_quote(c: char) -> bool {
    matches!(c, '\'' | '"' | '`')
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Byte length of the identifier at the start of `s`
pub(crate) fn word_len(s: &str) -> usize {
    match s.chars().next() {
        Some(c) if is_ident_start(c) => s
            .char_indices()
            .find(|(_, c)| !is_ident_char(*c))
            .map_or(s.len(), |(i, _)| i),
        _ => 0,
    }
}

pub(crate) fn leading_word(s: &str) -> &str {
    s.get(..word_len(s)).unwrap_or("")
}

/// Byte length of the numeric literal at the start of `s`
pub(crate) fn number_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let at = |i: usize| bytes.get(i).copied().unwrap_or(0);
    let mut i = 0;
    if at(0) == b'0' && matches!(at(1), b'x' | b'X' | b'o' | b'O' | b'b' | b'B') {
        i = 2;
        while at(i).is_ascii_hexdigit() || at(i) == b'_' {
            i += 1;
        }
        return i;
    }
    while at(i).is_ascii_digit() || at(i) == b'_' {
        i += 1;
    }
    if at(i) == b'.' && (i > 0 || at(i + 1).is_ascii_digit()) {
        i += 1;
        while at(i).is_ascii_digit() || at(i) == b'_' {
            i += 1;
        }
    }
    if i > 0 && matches!(at(i), b'e' | b'E') {
        let mut j = i + 1;
        if matches!(at(j), b'+' | b'-') {
            j += 1;
        }
        if at(j).is_ascii_digit() {
            while at(j).is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

/// Length of a `/N/r` regex placeholder at the start of `s`
fn regex_placeholder_len(s: &str) -> usize {
    let Some(rest) = s.strip_prefix('/') else {
        return 0;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    match rest.get(digits..) {
        Some(tail) if digits > 0 && tail.starts_with("/r") => digits + 3,
        _ => 0,
    }
}

const MULTI_CHAR_OPERATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>",
];

/// Operators are stepped over as a unit so a terminator never matches the
/// tail of a longer operator (`*` inside `**`, `?` inside `??`)
fn operator_len(s: &str) -> usize {
    MULTI_CHAR_OPERATORS
        .iter()
        .find(|op| s.starts_with(**op))
        .map_or(0, |op| op.len())
}

/// Prefix operators allowed at the very start of an operand even when they
/// are also terminators (`-a`, `!b`, `++c`)
fn start_operator_len(s: &str) -> usize {
    if s.starts_with("++") || s.starts_with("--") {
        2
    } else if s.starts_with(['+', '-', '!', '~']) {
        1
    } else {
        0
    }
}

fn unclosed(open: char, part: &str) -> JsError {
    JsError::parse_error(format!("Unclosed '{open}'"), part)
}

/// Scan `part` up to the first top-level match of `stops`.
///
/// With `quote` set, `part` is the text right after an opening bracket or
/// quote and the scan returns everything up to (not including) the matching
/// closer; a missing closer is a parse error. Terminators are only checked
/// outside brackets and quotes, and never in the middle of an identifier or a
/// number.
pub fn rest_of_exp<'a>(
    part: &'a str,
    stops: &[Stop<'_>],
    quote: Option<char>,
) -> Result<&'a str, JsError> {
    let closer = quote.and_then(closing_of);
    let in_string = quote.is_some_and(is_quote);
    let mut is_start = true;
    let mut escape = false;
    let mut i = 0;

    while let Some(rest) = part.get(i..) {
        let Some(ch) = rest.chars().next() else {
            break;
        };

        if in_string {
            if quote == Some('`') && !escape && rest.starts_with("${") {
                let inner = rest_of_exp(rest.get(2..).unwrap_or(""), &[], Some('{'))?;
                i += 2 + inner.len() + 1;
                continue;
            }
            if Some(ch) == closer && !escape {
                return Ok(part.get(..i).unwrap_or(part));
            }
            escape = !escape && ch == '\\';
            i += ch.len_utf8();
            continue;
        }

        if quote.is_none() {
            if is_start {
                let op = start_operator_len(rest);
                if op > 0 {
                    i += op;
                    continue;
                }
            } else if stops.iter().any(|s| s.matches(rest)) {
                break;
            }
        }

        if let Some(inner_closer) = closing_of(ch) {
            let inner = rest_of_exp(rest.get(1..).unwrap_or(""), &[], Some(ch))?;
            i += 1 + inner.len() + inner_closer.len_utf8();
            is_start = false;
            continue;
        }

        if Some(ch) == closer {
            return Ok(part.get(..i).unwrap_or(part));
        }

        if ch.is_whitespace() {
            i += ch.len_utf8();
            continue;
        }

        let skip = if is_ident_start(ch) {
            word_len(rest)
        } else if ch.is_ascii_digit() || (ch == '.' && number_len(rest) > 0) {
            number_len(rest).max(1)
        } else {
            regex_placeholder_len(rest)
                .max(operator_len(rest))
                .max(ch.len_utf8())
        };
        i += skip;
        is_start = false;
    }

    if let Some(open) = quote {
        return Err(unclosed(open, part));
    }
    Ok(part.get(..i).unwrap_or(part))
}

/// Length of the bracketed group at the start of `s`, closer included
pub(crate) fn bracket_len(s: &str) -> Result<usize, JsError> {
    let Some(open) = s.chars().next().filter(|c| closing_of(*c).is_some()) else {
        return Err(JsError::parse_error("Expected bracket", s));
    };
    let inner = rest_of_exp(s.get(1..).unwrap_or(""), &[], Some(open))?;
    Ok(1 + inner.len() + 1)
}

/// Content between the bracket at the start of `s` and its closer, plus the
/// text following the closer
pub(crate) fn bracket_content(s: &str) -> Result<(&str, &str), JsError> {
    let len = bracket_len(s)?;
    let inner = s.get(1..len - 1).unwrap_or("");
    Ok((inner, s.get(len..).unwrap_or("")))
}

fn ws_len(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Statement splitting
// ═══════════════════════════════════════════════════════════════════════════════

/// Strip whitespace and empty statements from the front of `src`
pub fn skip_empty(src: &str) -> &str {
    src.trim_start_matches(|c: char| c.is_whitespace() || c == ';')
}

/// Split the next statement off the front of `src` (which must already be
/// passed through [`skip_empty`]). Returns the statement text without its
/// terminator and the remaining source.
pub fn next_statement(src: &str) -> Result<(&str, &str), JsError> {
    let len = statement_len(src)?;
    let stmt = src.get(..len).unwrap_or(src);
    let rest = src.get(len..).unwrap_or("");
    Ok((stmt.trim().trim_end_matches(';').trim_end(), rest))
}

fn statement_len(src: &str) -> Result<usize, JsError> {
    let word = leading_word(src);
    match word {
        "if" => if_len(src),
        "for" | "while" => {
            let mut i = word.len();
            i += expect_bracket(src, i, '(')?;
            Ok(i + body_len(src.get(i..).unwrap_or(""))?)
        }
        "do" => do_len(src),
        "try" => try_len(src),
        "switch" => {
            let mut i = word.len();
            i += expect_bracket(src, i, '(')?;
            i += expect_bracket(src, i, '{')?;
            Ok(i)
        }
        "function" => function_declaration_len(src, 0),
        "async" => {
            let after = src.get(word.len()..).unwrap_or("");
            let ws = ws_len(after);
            let rest = after.get(ws..).unwrap_or("");
            if leading_word(rest) == "function" {
                function_declaration_len(src, word.len() + ws)
            } else {
                expression_len(src)
            }
        }
        _ if src.starts_with('{') => bracket_len(src),
        _ => expression_len(src),
    }
}

/// Skip whitespace from `at`, then a bracket group opened by `open`.
/// Returns the number of bytes consumed.
fn expect_bracket(src: &str, at: usize, open: char) -> Result<usize, JsError> {
    let rest = src.get(at..).unwrap_or("");
    let ws = ws_len(rest);
    let group = rest.get(ws..).unwrap_or("");
    if !group.starts_with(open) {
        return Err(JsError::parse_error(format!("Expected '{open}'"), group));
    }
    Ok(ws + bracket_len(group)?)
}

/// Length of a statement body: a block, or a single statement with its `;`
fn body_len(s: &str) -> Result<usize, JsError> {
    let ws = ws_len(s);
    let rest = s.get(ws..).unwrap_or("");
    if rest.is_empty() {
        return Err(JsError::parse_error("Unexpected end of input", s));
    }
    if rest.starts_with(';') {
        return Ok(ws + 1);
    }
    if rest.starts_with('{') {
        return Ok(ws + bracket_len(rest)?);
    }
    Ok(ws + statement_len(rest)?)
}

fn if_len(src: &str) -> Result<usize, JsError> {
    let mut i = "if".len();
    i += expect_bracket(src, i, '(')?;
    i += body_len(src.get(i..).unwrap_or(""))?;
    let tail = src.get(i..).unwrap_or("");
    let ws = ws_len(tail);
    if leading_word(tail.get(ws..).unwrap_or("")) == "else" {
        i += ws + "else".len();
        i += body_len(src.get(i..).unwrap_or(""))?;
    }
    Ok(i)
}

fn do_len(src: &str) -> Result<usize, JsError> {
    let mut i = "do".len();
    i += body_len(src.get(i..).unwrap_or(""))?;
    let tail = src.get(i..).unwrap_or("");
    let ws = ws_len(tail);
    if leading_word(tail.get(ws..).unwrap_or("")) != "while" {
        return Err(JsError::parse_error("Expected 'while' after do body", tail));
    }
    i += ws + "while".len();
    i += expect_bracket(src, i, '(')?;
    Ok(i)
}

fn try_len(src: &str) -> Result<usize, JsError> {
    let mut i = "try".len();
    i += expect_bracket(src, i, '{')?;
    let mut clauses = 0;
    let tail = src.get(i..).unwrap_or("");
    let ws = ws_len(tail);
    if leading_word(tail.get(ws..).unwrap_or("")) == "catch" {
        i += ws + "catch".len();
        let after = src.get(i..).unwrap_or("");
        if after.trim_start().starts_with('(') {
            i += expect_bracket(src, i, '(')?;
        }
        i += expect_bracket(src, i, '{')?;
        clauses += 1;
    }
    let tail = src.get(i..).unwrap_or("");
    let ws = ws_len(tail);
    if leading_word(tail.get(ws..).unwrap_or("")) == "finally" {
        i += ws + "finally".len();
        i += expect_bracket(src, i, '{')?;
        clauses += 1;
    }
    if clauses == 0 {
        return Err(JsError::parse_error("Missing catch or finally after try", src));
    }
    Ok(i)
}

/// `function name(...) {...}` as a statement. Anonymous functions in
/// statement position are expression statements.
fn function_declaration_len(src: &str, keyword_at: usize) -> Result<usize, JsError> {
    let mut i = keyword_at + "function".len();
    let rest = src.get(i..).unwrap_or("");
    let mut ws = ws_len(rest);
    if rest.get(ws..).is_some_and(|r| r.starts_with('*')) {
        ws += 1 + ws_len(rest.get(ws + 1..).unwrap_or(""));
    }
    let name = word_len(rest.get(ws..).unwrap_or(""));
    if name == 0 {
        return expression_len(src);
    }
    i += ws + name;
    i += expect_bracket(src, i, '(')?;
    i += expect_bracket(src, i, '{')?;
    Ok(i)
}

fn expression_len(src: &str) -> Result<usize, JsError> {
    let stops = [Stop::Char(';'), Stop::Char('\n')];
    let mut end = 0;
    loop {
        let rest = src.get(end..).unwrap_or("");
        let chunk = rest_of_exp(rest, &stops, None)?;
        end += chunk.len();
        match src.get(end..).and_then(|s| s.chars().next()) {
            None => return Ok(end),
            Some(';') => return Ok(end + 1),
            Some(_) => {
                let before = src.get(..end).unwrap_or("");
                let after = src.get(end + 1..).unwrap_or("");
                end += 1;
                if !continues_on_next_line(before, after) {
                    return Ok(end);
                }
            }
        }
    }
}

/// Automatic semicolon insertion: whether the expression before a newline
/// carries on past it
fn continues_on_next_line(before: &str, after: &str) -> bool {
    let prev = before.trim_end();
    if prev.trim_start().is_empty() {
        return true;
    }
    let last_word = prev
        .rsplit(|c: char| !is_ident_char(c))
        .next()
        .unwrap_or("");
    if prev.ends_with("++") || prev.ends_with("--") {
        return false;
    }
    if matches!(last_word, "return" | "throw" | "break" | "continue")
        && prev.trim_start() == last_word
    {
        return false;
    }
    if prev.ends_with(|c: char| "+-*/%&|^!~<>=?:,.([{".contains(c)) {
        return true;
    }
    let next = after.trim_start();
    if next.starts_with("++") || next.starts_with("--") {
        return false;
    }
    if next.starts_with(|c: char| ".?+-*/%&|^<>=,:".contains(c)) {
        return true;
    }
    matches!(leading_word(next), "instanceof" | "in")
}

/// Split a list body (arguments, array items, object entries) at top-level commas
pub fn split_commas(s: &str) -> Result<Vec<&str>, JsError> {
    let mut parts = Vec::new();
    let mut rest = s;
    loop {
        let part = rest_of_exp(rest, &[Stop::Char(',')], None)?;
        parts.push(part.trim());
        match rest.get(part.len()..) {
            Some(tail) if tail.starts_with(',') => rest = tail.get(1..).unwrap_or(""),
            _ => break,
        }
    }
    Ok(parts)
}
