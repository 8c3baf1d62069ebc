//! Parser: source text to execution tree
//!
//! Parsing runs in three passes:
//!
//! 1. [`extract_constants`] replaces literals and comments with placeholders.
//! 2. The statement splitter cuts the placeholder text into statements.
//! 3. [`lispify`] lowers each statement by trying the grammar categories that
//!    are legal at the current position and dispatching on the first match.
//!    Operators find the extent of their right operand with [`rest_of_exp`],
//!    which is what makes the result respect precedence.
//!
//! Function bodies are not lowered here. They stay as text inside their
//! [`FunctionDef`] until the function is first called.

mod constants;
mod expect;
mod optimize;
mod scan;

pub use constants::{Constants, RegexLiteral, TemplateLiteral, extract_constants};
pub use expect::Expect;
pub use optimize::optimize;
pub use scan::{Stop, next_statement, rest_of_exp, skip_empty, split_commas};

use fancy_regex::Captures;

use crate::error::JsError;
use crate::lisp::{FunctionDef, FunctionKind, Item, LOOP_SUBJECT, Literal, Op};
use crate::prelude::*;
use crate::value::JsString;

use expect::{AFTER_OPERATOR, AFTER_PROP, AFTER_VALUE, EXPRESSION, Grammar, STATEMENT, Token, grammar};
use scan::{bracket_content, leading_word, number_len, word_len};

/// A parsed program: the top-level statements and the literal tables they refer to
#[derive(Debug, Clone)]
pub struct Parsed {
    pub tree: Vec<Item>,
    pub constants: Constants,
}

/// Parse a program
pub fn parse(source: &str) -> Result<Parsed, JsError> {
    parse_with(source, Constants::new())
}

/// Parse a program, appending its literals to existing tables
pub fn parse_with(source: &str, mut constants: Constants) -> Result<Parsed, JsError> {
    let code = extract_constants(source, &mut constants)?;
    let tree = lower_block(&code, &constants)?;
    log::debug!(
        target: "jsgate::parser",
        "parsed {} statements, {} strings, {} templates, {} regexes",
        tree.len(),
        constants.strings.len(),
        constants.literals.len(),
        constants.regexes.len()
    );
    Ok(Parsed { tree, constants })
}

/// Lower placeholder text holding a statement list
pub fn lower_block(src: &str, constants: &Constants) -> Result<Vec<Item>, JsError> {
    Ok(block(src)?
        .into_iter()
        .map(|item| optimize(item, constants))
        .collect())
}

/// Lower placeholder text holding a single (possibly comma) expression
pub fn lower_expression(src: &str, constants: &Constants) -> Result<Item, JsError> {
    Ok(optimize(expression(src)?, constants))
}

fn block(src: &str) -> Result<Vec<Item>, JsError> {
    let mut out = Vec::new();
    let mut rest = skip_empty(src);
    while !rest.is_empty() {
        let (stmt, tail) = next_statement(rest)?;
        if !stmt.is_empty() {
            out.push(statement(stmt)?);
        }
        rest = skip_empty(tail);
    }
    Ok(out)
}

const STATEMENT_KEYWORDS: &[&str] = &[
    "var", "let", "const", "if", "for", "while", "do", "try", "switch", "function", "async",
    "return", "throw", "break", "continue",
];

fn statement(stmt: &str) -> Result<Item, JsError> {
    if !stmt.starts_with('{') && !STATEMENT_KEYWORDS.contains(&leading_word(stmt)) {
        let parts = split_commas(stmt)?;
        if parts.len() > 1 {
            return multi(&parts);
        }
    }
    lispify(stmt, STATEMENT, Item::None)
}

fn expression(src: &str) -> Result<Item, JsError> {
    let parts = split_commas(src)?;
    if parts.len() > 1 {
        return multi(&parts);
    }
    lispify(src, EXPRESSION, Item::None)
}

fn multi(parts: &[&str]) -> Result<Item, JsError> {
    let items = parts
        .iter()
        .map(|p| lispify(p, EXPRESSION, Item::None))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Item::node(Op::Multi, Item::None, Item::list(items)))
}

fn unexpected(part: &str) -> JsError {
    JsError::parse_error("Unexpected token", part)
}

/// Lower `part` given the categories legal at its start. `tree` is what has
/// been built to the left of `part`.
pub fn lispify(part: &str, expected: &[Expect], tree: Item) -> Result<Item, JsError> {
    let part = part.trim();
    if part.is_empty() {
        return if expected.contains(&Expect::ExpEnd) {
            Ok(tree)
        } else {
            Err(JsError::parse_error("Unexpected end of expression", ""))
        };
    }

    let grammar = grammar()?;
    for &expect in expected {
        for pattern in grammar.patterns(expect) {
            let caps = pattern
                .regex
                .captures(part)
                .map_err(|e| JsError::parse_error(e.to_string(), part))?;
            if let Some(caps) = caps {
                log::trace!(target: "jsgate::parser", "{expect:?} -> {:?}", pattern.token);
                return build(grammar, pattern.token, &caps, part, tree);
            }
        }
    }
    Err(unexpected(part))
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> Option<&'t str> {
    caps.get(i).map(|m| m.as_str())
}

fn placeholder_index(caps: &Captures<'_>) -> Result<f64, JsError> {
    group(caps, 1)
        .and_then(|d| d.parse::<u32>().ok())
        .map(f64::from)
        .ok_or_else(|| JsError::internal("bad literal placeholder"))
}

fn build(
    grammar: &Grammar,
    token: Token,
    caps: &Captures<'_>,
    part: &str,
    tree: Item,
) -> Result<Item, JsError> {
    let matched = caps.get(0).map_or(0, |m| m.end());
    let rest = part.get(matched..).unwrap_or("");

    match token {
        // ─── Values ────────────────────────────────────────────────────────────
        Token::Number => {
            let n = parse_number(group(caps, 0).unwrap_or(""))?;
            lispify(rest, AFTER_VALUE, Item::number(n))
        }
        Token::Str | Token::Template | Token::Regex => {
            let op = match token {
                Token::Str => Op::Str,
                Token::Template => Op::Template,
                _ => Op::Regex,
            };
            let index = placeholder_index(caps)?;
            lispify(rest, AFTER_VALUE, Item::node(op, Item::None, Item::number(index)))
        }
        Token::Boolean => {
            let b = group(caps, 1) == Some("true");
            lispify(rest, AFTER_VALUE, Item::Literal(Literal::Boolean(b)))
        }
        Token::Null => lispify(rest, AFTER_VALUE, Item::Literal(Literal::Null)),
        Token::Undefined => lispify(rest, AFTER_VALUE, Item::Literal(Literal::Undefined)),
        Token::NaN => lispify(rest, AFTER_VALUE, Item::number(f64::NAN)),
        Token::Infinity => lispify(rest, AFTER_VALUE, Item::number(f64::INFINITY)),

        // ─── Member access and calls ───────────────────────────────────────────
        Token::Prop => {
            let name = group(caps, 0).unwrap_or("");
            let node = Item::node(Op::Prop, Item::None, Item::name(name));
            lispify(rest, AFTER_PROP, node)
        }
        Token::Dot => {
            let op = if group(caps, 1).is_some() {
                Op::OptionalProp
            } else {
                Op::Prop
            };
            let name = group(caps, 2).unwrap_or("");
            lispify(rest, AFTER_PROP, Item::node(op, tree, Item::name(name)))
        }
        Token::Call | Token::OptionalCall => {
            let op = if token == Token::Call {
                Op::Call
            } else {
                Op::OptionalCall
            };
            let (content, after) = bracket_content(from_bracket(part, matched))?;
            let args = list_items(content, false)?;
            lispify(after, AFTER_VALUE, Item::node(op, tree, Item::list(args)))
        }
        Token::ArrayProp | Token::OptionalArrayProp => {
            let op = if token == Token::ArrayProp {
                Op::Prop
            } else {
                Op::OptionalProp
            };
            let (content, after) = bracket_content(from_bracket(part, matched))?;
            if content.trim().is_empty() {
                return Err(unexpected(part));
            }
            let key = expression(content)?;
            lispify(after, AFTER_PROP, Item::node(op, tree, key))
        }

        // ─── Brackets ──────────────────────────────────────────────────────────
        Token::Group => {
            let (content, after) = bracket_content(part)?;
            if content.trim().is_empty() {
                return Err(unexpected(part));
            }
            let inner = expression(content)?;
            lispify(after, AFTER_VALUE, Item::node(Op::Group, Item::None, inner))
        }
        Token::CreateArray => {
            let (content, after) = bracket_content(part)?;
            let items = list_items(content, true)?;
            let node = Item::node(Op::CreateArray, Item::None, Item::list(items));
            lispify(after, AFTER_VALUE, node)
        }
        Token::CreateObject => {
            let (content, after) = bracket_content(part)?;
            let entries = object_entries(content)?;
            let node = Item::node(Op::CreateObject, Item::None, Item::list(entries));
            lispify(after, AFTER_VALUE, node)
        }

        // ─── Operators ─────────────────────────────────────────────────────────
        Token::Unary(op) => {
            let (operand, after) = unary_operand(grammar, rest)?;
            lispify(after, AFTER_OPERATOR, Item::node(op, Item::None, operand))
        }
        Token::IncrementBefore => {
            let op = if group(caps, 1) == Some("++") {
                Op::PreIncrement
            } else {
                Op::PreDecrement
            };
            let (operand, after) = unary_operand(grammar, rest)?;
            require_assignable(&operand, part)?;
            lispify(after, AFTER_OPERATOR, Item::node(op, operand, Item::None))
        }
        Token::IncrementAfter => {
            let op = if group(caps, 1) == Some("++") {
                Op::PostIncrement
            } else {
                Op::PostDecrement
            };
            require_assignable(&tree, part)?;
            lispify(rest, AFTER_OPERATOR, Item::node(op, tree, Item::None))
        }
        Token::Assign(op) => {
            require_assignable(&tree, part)?;
            let value = lispify(rest, EXPRESSION, Item::None)?;
            Ok(Item::node(op, tree, value))
        }
        Token::Binary(op) => {
            let stops = grammar.operand_stops(op);
            let operand = rest_of_exp(rest, &stops, None)?;
            let after = rest.get(operand.len()..).unwrap_or("");
            let right = lispify(operand, EXPRESSION, Item::None)?;
            lispify(after, AFTER_OPERATOR, Item::node(op, tree, right))
        }
        Token::InlineIf => ternary(grammar, tree, rest),
        Token::New => new_expression(rest),

        // ─── Functions ─────────────────────────────────────────────────────────
        Token::ArrowFunction => {
            let is_async = group(caps, 1).is_some();
            let (params, rest_param) = match (group(caps, 2), group(caps, 3)) {
                (Some(single), _) => (vec![JsString::from(single)], None),
                (None, list) => parse_params(list.unwrap_or(""))?,
            };
            let body = rest.trim_start();
            if body.starts_with('{') {
                let (content, after) = bracket_content(body)?;
                let def = FunctionDef::new(
                    None,
                    params,
                    rest_param,
                    is_async,
                    FunctionKind::Arrow,
                    content,
                    false,
                );
                let node = Item::node(Op::ArrowFunc, Item::None, Item::Function(Rc::new(def)));
                lispify(after, AFTER_OPERATOR, node)
            } else {
                if body.is_empty() {
                    return Err(JsError::parse_error("Unexpected end of expression", part));
                }
                let def = FunctionDef::new(
                    None,
                    params,
                    rest_param,
                    is_async,
                    FunctionKind::Arrow,
                    body,
                    true,
                );
                Ok(Item::node(Op::ArrowFunc, Item::None, Item::Function(Rc::new(def))))
            }
        }
        Token::InlineFunction => {
            let is_async = group(caps, 1).is_some();
            let (def, after) = function_from(rest, is_async, FunctionKind::Expression)?;
            let node = Item::node(Op::InlineFunction, Item::None, Item::Function(def));
            lispify(after, AFTER_VALUE, node)
        }
        Token::FunctionDeclaration => {
            if group(caps, 2).is_some() {
                return Err(JsError::parse_error(
                    "Generator functions are not supported",
                    part,
                ));
            }
            let is_async = group(caps, 1).is_some();
            let (def, after) = function_from(rest, is_async, FunctionKind::Declaration)?;
            expect_end(after)?;
            Ok(Item::node(Op::Function, Item::None, Item::Function(def)))
        }

        // ─── Statements ────────────────────────────────────────────────────────
        Token::Return => {
            let value = if rest.trim().is_empty() {
                Item::None
            } else {
                expression(rest)?
            };
            Ok(Item::node(Op::Return, Item::None, value))
        }
        Token::Throw => {
            if rest.trim().is_empty() {
                return Err(JsError::parse_error("Unexpected end of expression", part));
            }
            Ok(Item::node(Op::Throw, Item::None, expression(rest)?))
        }
        Token::Initialize => {
            let op = match group(caps, 1) {
                Some("let") => Op::Let,
                Some("const") => Op::Const,
                _ => Op::Var,
            };
            declarations(op, rest)
        }
        Token::If => if_statement(rest),
        Token::For => for_statement(grammar, rest),
        Token::While => {
            let (cond_src, after) = bracket_content(rest.trim_start())?;
            let cond = expression(cond_src)?;
            let (body, tail) = take_body(after)?;
            expect_end(tail)?;
            Ok(loop_node(true, Item::None, Item::None, Item::None, Item::None, cond, Item::None, body))
        }
        Token::Do => {
            let (body, tail) = take_body(rest)?;
            let tail = tail.trim_start();
            if leading_word(tail) != "while" {
                return Err(JsError::parse_error("Expected 'while' after do body", tail));
            }
            let (cond_src, after) = bracket_content(tail.get("while".len()..).unwrap_or("").trim_start())?;
            expect_end(after)?;
            let cond = expression(cond_src)?;
            Ok(loop_node(false, Item::None, Item::None, Item::None, Item::None, cond, Item::None, body))
        }
        Token::Try => try_statement(rest),
        Token::Switch => switch_statement(rest),
        Token::LoopAction => {
            if !rest.trim().is_empty() {
                return Err(JsError::parse_error("Labels are not supported", part));
            }
            let word = group(caps, 1).unwrap_or("break");
            Ok(Item::node(Op::LoopAction, Item::name(word), Item::None))
        }
        Token::Block => {
            let (content, after) = bracket_content(part)?;
            expect_end(after)?;
            Ok(Item::node(Op::Block, Item::None, Item::list(block(content)?)))
        }
    }
}

/// `part` from the bracket that ends the match at `matched`
fn from_bracket(part: &str, matched: usize) -> &str {
    part.get(matched.saturating_sub(1)..).unwrap_or("")
}

fn expect_end(after: &str) -> Result<(), JsError> {
    let after = after.trim();
    if after.is_empty() {
        Ok(())
    } else {
        Err(unexpected(after))
    }
}

fn require_assignable(target: &Item, part: &str) -> Result<(), JsError> {
    match target.op() {
        Some(Op::Prop) => Ok(()),
        _ => Err(JsError::parse_error(
            "Invalid left-hand side in assignment",
            part,
        )),
    }
}

fn parse_number(text: &str) -> Result<f64, JsError> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let radix = match digits.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    let invalid = || JsError::parse_error("Invalid number", text);
    match radix {
        Some(radix) => {
            let body = digits.get(2..).unwrap_or("");
            if body.is_empty() {
                return Err(invalid());
            }
            body.chars().try_fold(0.0_f64, |acc, c| {
                c.to_digit(radix)
                    .map(|d| acc * f64::from(radix) + f64::from(d))
                    .ok_or_else(invalid)
            })
        }
        None => digits.parse::<f64>().map_err(|_| invalid()),
    }
}

/// The operand of a prefix operator and the text after it
fn unary_operand<'a>(grammar: &Grammar, rest: &'a str) -> Result<(Item, &'a str), JsError> {
    let stops = grammar.unary_stops();
    let operand = rest_of_exp(rest, &stops, None)?;
    if operand.trim().is_empty() {
        return Err(JsError::parse_error("Unexpected end of expression", rest));
    }
    let after = rest.get(operand.len()..).unwrap_or("");
    Ok((lispify(operand, EXPRESSION, Item::None)?, after))
}

fn ternary(grammar: &Grammar, condition: Item, rest: &str) -> Result<Item, JsError> {
    let stops = [Stop::Regex(grammar.ternary()), Stop::Char(':')];
    let mut depth = 1;
    let mut pos = 0;
    loop {
        let chunk = rest_of_exp(rest.get(pos..).unwrap_or(""), &stops, None)?;
        pos += chunk.len();
        match rest.get(pos..).and_then(|s| s.chars().next()) {
            Some('?') => depth += 1,
            Some(':') => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {
                return Err(JsError::parse_error(
                    "Missing ':' in conditional expression",
                    rest,
                ));
            }
        }
        pos += 1;
    }
    let then = rest.get(..pos).unwrap_or("");
    let otherwise = rest.get(pos + 1..).unwrap_or("");
    let branches = Item::node(
        Op::Branches,
        lispify(then, EXPRESSION, Item::None)?,
        lispify(otherwise, EXPRESSION, Item::None)?,
    );
    Ok(Item::node(Op::Ternary, condition, branches))
}

/// `new Callee.path(args)`; the callee is an identifier chain
fn new_expression(rest: &str) -> Result<Item, JsError> {
    let s = rest.trim_start();
    let mut len = word_len(s);
    if len == 0 {
        return Err(JsError::parse_error("Unexpected token after 'new'", s));
    }
    loop {
        let tail = s.get(len..).unwrap_or("");
        let trimmed = tail.trim_start();
        let Some(after_dot) = trimmed.strip_prefix('.') else {
            break;
        };
        let ws = after_dot.len() - after_dot.trim_start().len();
        let word = word_len(after_dot.trim_start());
        if word == 0 {
            break;
        }
        len += (tail.len() - trimmed.len()) + 1 + ws + word;
    }
    let callee = lispify(s.get(..len).unwrap_or(""), EXPRESSION, Item::None)?;
    let after = s.get(len..).unwrap_or("").trim_start();
    let (args, after) = if after.starts_with('(') {
        let (content, after) = bracket_content(after)?;
        (list_items(content, false)?, after)
    } else {
        (Vec::new(), after)
    };
    lispify(after, AFTER_VALUE, Item::node(Op::New, callee, Item::list(args)))
}

/// Argument or array item list. Array literals may contain holes.
fn list_items(content: &str, allow_holes: bool) -> Result<Vec<Item>, JsError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parts = split_commas(content)?;
    let last = parts.len() - 1;
    let mut items = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            if i == last && i > 0 {
                break;
            }
            if !allow_holes {
                return Err(JsError::parse_error("Unexpected token ','", content));
            }
            items.push(Item::Literal(Literal::Undefined));
            continue;
        }
        items.push(match part.strip_prefix("...") {
            Some(inner) => Item::node(
                Op::SpreadArray,
                Item::None,
                lispify(inner, EXPRESSION, Item::None)?,
            ),
            None => lispify(part, EXPRESSION, Item::None)?,
        });
    }
    Ok(items)
}

/// Entries of an object literal as `KeyVal` and `SpreadObject` nodes
fn object_entries(content: &str) -> Result<Vec<Item>, JsError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for part in split_commas(content)? {
        if part.is_empty() {
            continue;
        }
        if let Some(inner) = part.strip_prefix("...") {
            let value = lispify(inner, EXPRESSION, Item::None)?;
            entries.push(Item::node(Op::SpreadObject, Item::None, value));
            continue;
        }
        entries.push(object_entry(part)?);
    }
    Ok(entries)
}

fn object_entry(part: &str) -> Result<Item, JsError> {
    let mut s = part;
    let mut is_async = false;
    if leading_word(s) == "async" {
        let after = s.get(5..).unwrap_or("").trim_start();
        if word_len(after) > 0 || after.starts_with(['"', '[']) {
            is_async = true;
            s = after;
        }
    }

    let (key, name, after) = if s.starts_with('[') {
        let (key_src, after) = bracket_content(s)?;
        (expression(key_src)?, None, after)
    } else if s.starts_with('"') {
        let len = s.get(1..).map_or(0, |t| t.bytes().take_while(u8::is_ascii_digit).count());
        let index = s
            .get(1..1 + len)
            .and_then(|d| d.parse::<u32>().ok())
            .ok_or_else(|| unexpected(part))?;
        let key = Item::node(Op::Str, Item::None, Item::number(f64::from(index)));
        (key, None, s.get(len + 2..).unwrap_or(""))
    } else if number_len(s) > 0 {
        let len = number_len(s);
        let n = parse_number(s.get(..len).unwrap_or(""))?;
        (Item::number(n), None, s.get(len..).unwrap_or(""))
    } else {
        let len = word_len(s);
        if len == 0 {
            return Err(unexpected(part));
        }
        let word = s.get(..len).unwrap_or("");
        (Item::name(word), Some(word), s.get(len..).unwrap_or(""))
    };

    let after = after.trim_start();
    if let Some(value) = after.strip_prefix(':') {
        if is_async {
            return Err(unexpected(part));
        }
        let value = lispify(value, EXPRESSION, Item::None)?;
        return Ok(Item::node(Op::KeyVal, key, value));
    }
    if after.starts_with('(') {
        let (def, tail) = function_body(name.map(JsString::from), after, is_async, FunctionKind::Expression)?;
        expect_end(tail)?;
        let value = Item::node(Op::InlineFunction, Item::None, Item::Function(def));
        return Ok(Item::node(Op::KeyVal, key, value));
    }
    match name {
        // Shorthand `{ a }`
        Some(word) if after.is_empty() && !is_async => {
            let value = Item::node(Op::Prop, Item::None, Item::name(word));
            Ok(Item::node(Op::KeyVal, key, value))
        }
        _ => Err(unexpected(part)),
    }
}

fn parse_params(src: &str) -> Result<(Vec<JsString>, Option<JsString>), JsError> {
    let mut params = Vec::new();
    let mut rest = None;
    if src.trim().is_empty() {
        return Ok((params, rest));
    }
    let parts = split_commas(src)?;
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() && i == last && i > 0 {
            break;
        }
        if rest.is_some() {
            return Err(JsError::parse_error(
                "Rest parameter must be last formal parameter",
                src,
            ));
        }
        let (name, is_rest) = match part.strip_prefix("...") {
            Some(name) => (name.trim(), true),
            None => (*part, false),
        };
        if name.is_empty() || word_len(name) != name.len() {
            return Err(JsError::parse_error("Unsupported parameter", *part));
        }
        if is_rest {
            rest = Some(JsString::from(name));
        } else {
            params.push(JsString::from(name));
        }
    }
    Ok((params, rest))
}

/// `name(params) { body }` following the `function` keyword
fn function_from(
    rest: &str,
    is_async: bool,
    kind: FunctionKind,
) -> Result<(Rc<FunctionDef>, &str), JsError> {
    let s = rest.trim_start();
    if s.starts_with('*') {
        return Err(JsError::parse_error(
            "Generator functions are not supported",
            s,
        ));
    }
    let len = word_len(s);
    let name = (len > 0).then(|| JsString::from(s.get(..len).unwrap_or("")));
    function_body(name, s.get(len..).unwrap_or(""), is_async, kind)
}

/// `(params) { body }`
fn function_body(
    name: Option<JsString>,
    s: &str,
    is_async: bool,
    kind: FunctionKind,
) -> Result<(Rc<FunctionDef>, &str), JsError> {
    let s = s.trim_start();
    if !s.starts_with('(') {
        return Err(JsError::parse_error("Expected '('", s));
    }
    let (params_src, after) = bracket_content(s)?;
    let (params, rest) = parse_params(params_src)?;
    let after = after.trim_start();
    if !after.starts_with('{') {
        return Err(JsError::parse_error("Expected '{'", after));
    }
    let (body, after) = bracket_content(after)?;
    let def = FunctionDef::new(name, params, rest, is_async, kind, body, false);
    Ok((Rc::new(def), after))
}

fn declarations(op: Op, rest: &str) -> Result<Item, JsError> {
    let mut decls = Vec::new();
    for part in split_commas(rest)? {
        let len = word_len(part);
        if len == 0 {
            return Err(JsError::parse_error(
                "Destructuring declarations are not supported",
                part,
            ));
        }
        let name = part.get(..len).unwrap_or("");
        let tail = part.get(len..).unwrap_or("").trim_start();
        let init = if tail.is_empty() {
            if op == Op::Const {
                return Err(JsError::parse_error(
                    "Missing initializer in const declaration",
                    part,
                ));
            }
            Item::None
        } else {
            match tail.strip_prefix('=') {
                Some(value) if !value.starts_with(['=', '>']) => {
                    lispify(value, EXPRESSION, Item::None)?
                }
                _ => return Err(unexpected(tail)),
            }
        };
        decls.push(Item::node(op, Item::name(name), init));
    }
    match decls.len() {
        1 => Ok(decls.pop().unwrap_or_default()),
        _ => Ok(Item::node(Op::Multi, Item::None, Item::list(decls))),
    }
}

/// A statement body: a block, an empty statement or a single statement
fn take_body(s: &str) -> Result<(Vec<Item>, &str), JsError> {
    let s = s.trim_start();
    if s.starts_with('{') {
        let (content, after) = bracket_content(s)?;
        return Ok((block(content)?, after));
    }
    if let Some(after) = s.strip_prefix(';') {
        return Ok((Vec::new(), after));
    }
    if s.is_empty() {
        return Err(JsError::parse_error("Unexpected end of input", s));
    }
    let (stmt, after) = next_statement(s)?;
    Ok((vec![statement(stmt)?], after))
}

fn if_statement(rest: &str) -> Result<Item, JsError> {
    let (cond_src, after) = bracket_content(rest.trim_start())?;
    let cond = expression(cond_src)?;
    let (then, after) = take_body(after)?;
    let after = skip_empty(after);
    let otherwise = if leading_word(after) == "else" {
        let (otherwise, tail) = take_body(after.get(4..).unwrap_or(""))?;
        expect_end(tail.trim_start_matches(|c: char| c.is_whitespace() || c == ';'))?;
        otherwise
    } else {
        expect_end(after)?;
        Vec::new()
    };
    let branches = Item::node(Op::Branches, Item::list(then), Item::list(otherwise));
    Ok(Item::node(Op::If, cond, branches))
}

/// Internal binding names used by `for...of` and `for...in`
const LOOP_LIST: &str = "$$list";
const LOOP_INDEX: &str = "$$i";

fn ident(name: &str) -> Item {
    Item::node(Op::Prop, Item::None, Item::name(name))
}

#[allow(clippy::too_many_arguments)]
fn loop_node(
    check_first: bool,
    start_internal: Item,
    get_iterator: Item,
    start_step: Item,
    step: Item,
    condition: Item,
    before_step: Item,
    body: Vec<Item>,
) -> Item {
    let header = vec![
        Item::Literal(Literal::Boolean(check_first)),
        start_internal,
        get_iterator,
        start_step,
        step,
        condition,
        before_step,
    ];
    Item::node(Op::Loop, Item::list(header), Item::list(body))
}

fn for_statement(grammar: &Grammar, rest: &str) -> Result<Item, JsError> {
    let (header, after) = bracket_content(rest.trim_start())?;
    let (body, tail) = take_body(after)?;
    expect_end(tail)?;

    let each = grammar
        .for_each()
        .captures(header)
        .map_err(|e| JsError::parse_error(e.to_string(), header))?;
    if let Some(caps) = each {
        let kind = match group(&caps, 1) {
            Some("var") => Some(Op::Var),
            Some("let") => Some(Op::Let),
            Some("const") => Some(Op::Const),
            _ => None,
        };
        let binding = group(&caps, 2).unwrap_or("");
        let collect = if group(&caps, 3) == Some("of") {
            Op::Values
        } else {
            Op::Keys
        };
        let subject = expression(group(&caps, 4).unwrap_or(""))?;

        let start_internal = Item::node(
            Op::Multi,
            Item::None,
            Item::list(vec![
                Item::node(
                    Op::Let,
                    Item::name(LOOP_LIST),
                    Item::node(collect, Item::None, ident(LOOP_SUBJECT)),
                ),
                Item::node(Op::Let, Item::name(LOOP_INDEX), Item::number(0.0)),
            ]),
        );
        let condition = Item::node(
            Op::Lt,
            ident(LOOP_INDEX),
            Item::node(Op::Prop, ident(LOOP_LIST), Item::name("length")),
        );
        let step = Item::node(Op::PostIncrement, ident(LOOP_INDEX), Item::None);
        let current = Item::node(Op::Prop, ident(LOOP_LIST), ident(LOOP_INDEX));
        let before_step = match kind {
            Some(op) => Item::node(op, Item::name(binding), current),
            None => Item::node(Op::Assign, ident(binding), current),
        };
        return Ok(loop_node(
            true,
            start_internal,
            subject,
            Item::None,
            step,
            condition,
            before_step,
            body,
        ));
    }

    let semicolon = || JsError::parse_error("Invalid for loop header", header);
    let init_src = rest_of_exp(header, &[Stop::Char(';')], None)?;
    let remaining = header
        .get(init_src.len()..)
        .and_then(|s| s.strip_prefix(';'))
        .ok_or_else(semicolon)?;
    let cond_src = rest_of_exp(remaining, &[Stop::Char(';')], None)?;
    let step_src = remaining
        .get(cond_src.len()..)
        .and_then(|s| s.strip_prefix(';'))
        .ok_or_else(semicolon)?;

    let optional = |src: &str, f: fn(&str) -> Result<Item, JsError>| -> Result<Item, JsError> {
        if src.trim().is_empty() {
            Ok(Item::None)
        } else {
            f(src.trim())
        }
    };
    let start_step = optional(init_src, statement)?;
    let condition = match optional(cond_src, expression)? {
        Item::None => Item::Literal(Literal::Boolean(true)),
        cond => cond,
    };
    let step = optional(step_src, expression)?;
    Ok(loop_node(
        true,
        Item::None,
        Item::None,
        start_step,
        step,
        condition,
        Item::None,
        body,
    ))
}

fn braced_block(s: &str) -> Result<(Vec<Item>, &str), JsError> {
    let s = s.trim_start();
    if !s.starts_with('{') {
        return Err(JsError::parse_error("Expected '{'", s));
    }
    let (content, after) = bracket_content(s)?;
    Ok((block(content)?, after.trim_start()))
}

fn try_statement(rest: &str) -> Result<Item, JsError> {
    let (body, mut after) = braced_block(rest)?;
    let mut param = Item::None;
    let mut catch = Item::None;
    let mut finally = Item::None;

    if leading_word(after) == "catch" {
        let mut s = after.get("catch".len()..).unwrap_or("").trim_start();
        if s.starts_with('(') {
            let (name, tail) = bracket_content(s)?;
            let name = name.trim();
            if name.is_empty() || word_len(name) != name.len() {
                return Err(JsError::parse_error("Unsupported catch binding", name));
            }
            param = Item::name(name);
            s = tail;
        }
        let (handler, tail) = braced_block(s)?;
        catch = Item::list(handler);
        after = tail;
    }
    if leading_word(after) == "finally" {
        let (cleanup, tail) = braced_block(after.get("finally".len()..).unwrap_or(""))?;
        finally = Item::list(cleanup);
        after = tail;
    }
    if catch.is_none() && finally.is_none() {
        return Err(JsError::parse_error("Missing catch or finally after try", rest));
    }
    expect_end(after)?;
    Ok(Item::node(
        Op::Try,
        Item::list(body),
        Item::list(vec![param, catch, finally]),
    ))
}

fn switch_statement(rest: &str) -> Result<Item, JsError> {
    let (disc_src, after) = bracket_content(rest.trim_start())?;
    let discriminant = expression(disc_src)?;
    let after = after.trim_start();
    if !after.starts_with('{') {
        return Err(JsError::parse_error("Expected '{'", after));
    }
    let (content, tail) = bracket_content(after)?;
    expect_end(tail)?;

    let mut cases = Vec::new();
    let mut s = content.trim_start();
    let mut seen_default = false;
    while !s.is_empty() {
        let (test, body_start) = match leading_word(s) {
            "case" => {
                let expr = rest_of_exp(s.get(4..).unwrap_or(""), &[Stop::Char(':')], None)?;
                let after = s.get(4 + expr.len()..).unwrap_or("");
                let after = after
                    .strip_prefix(':')
                    .ok_or_else(|| JsError::parse_error("Expected ':' after case", s))?;
                (expression(expr)?, after)
            }
            "default" => {
                if seen_default {
                    return Err(JsError::parse_error(
                        "More than one default clause in switch statement",
                        s,
                    ));
                }
                seen_default = true;
                let after = s
                    .get("default".len()..)
                    .unwrap_or("")
                    .trim_start()
                    .strip_prefix(':')
                    .ok_or_else(|| JsError::parse_error("Expected ':' after default", s))?;
                (Item::None, after)
            }
            _ => return Err(unexpected(s)),
        };

        // The case body runs up to the next `case`/`default` at statement start
        let mut body = Vec::new();
        let mut b = skip_empty(body_start);
        while !b.is_empty() && !matches!(leading_word(b), "case" | "default") {
            let (stmt, tail) = next_statement(b)?;
            if !stmt.is_empty() {
                body.push(statement(stmt)?);
            }
            b = skip_empty(tail);
        }
        cases.push(Item::node(Op::Case, test, Item::list(body)));
        s = b;
    }
    Ok(Item::node(Op::Switch, discriminant, Item::list(cases)))
}
