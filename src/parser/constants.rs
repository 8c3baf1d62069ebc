//! Literal extraction
//!
//! Before any grammar work, string literals, template literals, regex
//! literals and comments are pulled out of the source. Each literal is
//! replaced by a short placeholder that indexes into [`Constants`]:
//!
//! | literal       | placeholder |
//! |---------------|-------------|
//! | `'text'`      | `"N"`       |
//! | `` `a${b}` `` | `` `N` ``   |
//! | `/re/g`       | `/N/r`      |
//!
//! After extraction no quote character in the source is ambiguous, which is
//! what lets the span scanner treat quotes as simple brackets.

use crate::error::JsError;
use crate::lisp::Item;
use crate::parser::{self, scan};
use crate::value::JsString;

/// Side tables produced by literal extraction
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Constants {
    pub strings: Vec<JsString>,
    pub literals: Vec<TemplateLiteral>,
    pub regexes: Vec<RegexLiteral>,
}

/// A template literal. `text` holds `${N}` markers for the interpolated
/// expressions and `$$` for every literal dollar sign.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLiteral {
    pub text: String,
    pub exprs: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegexLiteral {
    pub pattern: String,
    pub flags: String,
}

impl Constants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(&self, index: usize) -> Result<&JsString, JsError> {
        self.strings
            .get(index)
            .ok_or_else(|| JsError::internal(format!("no string constant {index}")))
    }

    pub fn literal(&self, index: usize) -> Result<&TemplateLiteral, JsError> {
        self.literals
            .get(index)
            .ok_or_else(|| JsError::internal(format!("no template literal {index}")))
    }

    pub fn regex(&self, index: usize) -> Result<&RegexLiteral, JsError> {
        self.regexes
            .get(index)
            .ok_or_else(|| JsError::internal(format!("no regex literal {index}")))
    }
}

impl TemplateLiteral {
    /// Fill the `${N}` markers with rendered expression values
    pub fn render(&self, values: &[String]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut chars = self.text.char_indices().peekable();
        while let Some((at, c)) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            match chars.peek() {
                Some((_, '$')) => {
                    chars.next();
                    out.push('$');
                }
                Some((_, '{')) => {
                    let tail = self.text.get(at + 2..).unwrap_or("");
                    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
                    let value = digits
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| values.get(i))
                        .map_or("", String::as_str);
                    out.push_str(value);
                    // '{', digits, '}'
                    for _ in 0..digits.len() + 2 {
                        chars.next();
                    }
                }
                _ => out.push('$'),
            }
        }
        out
    }
}

/// Replace literals and comments in `src` with placeholders, recording the
/// literal contents in `constants`.
pub fn extract_constants(src: &str, constants: &mut Constants) -> Result<String, JsError> {
    let chars: Vec<char> = src.chars().collect();
    let at = |i: usize| chars.get(i).copied();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;

    while let Some(c) = at(i) {
        match c {
            '\'' | '"' => {
                let (text, next) = read_string(&chars, i + 1, c)?;
                constants.strings.push(JsString::from(text));
                out.push_str(&format!("\"{}\"", constants.strings.len() - 1));
                i = next;
            }
            '`' => {
                let (literal, next) = read_template(&chars, i + 1, constants)?;
                constants.literals.push(literal);
                out.push_str(&format!("`{}`", constants.literals.len() - 1));
                i = next;
            }
            '/' if at(i + 1) == Some('/') => {
                while at(i).is_some_and(|c| c != '\n') {
                    i += 1;
                }
            }
            '/' if at(i + 1) == Some('*') => {
                let start = i;
                i += 2;
                let mut newline = false;
                loop {
                    match at(i) {
                        None => {
                            let fragment: String = chars.iter().skip(start).take(20).collect();
                            return Err(JsError::parse_error("Unclosed comment", fragment));
                        }
                        Some('*') if at(i + 1) == Some('/') => {
                            i += 2;
                            break;
                        }
                        Some(c) => {
                            newline |= c == '\n';
                            i += 1;
                        }
                    }
                }
                // A multi-line comment still separates statements
                out.push(if newline { '\n' } else { ' ' });
            }
            '/' if regex_allowed(&out) => {
                let (literal, next) = read_regex(&chars, i + 1)?;
                constants.regexes.push(literal);
                out.push_str(&format!("/{}/r", constants.regexes.len() - 1));
                i = next;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// A `/` starts a regex literal unless it follows something that ends an operand
fn regex_allowed(before: &str) -> bool {
    let trimmed = before.trim_end();
    // Postfix update ends an operand
    if trimmed.ends_with("++") || trimmed.ends_with("--") {
        return false;
    }
    match trimmed.chars().last() {
        None => true,
        Some(c) if "(,=:[!&|?{};+-*%<>~^".contains(c) => true,
        Some(c) if scan::is_ident_char(c) => {
            let word = trimmed
                .rsplit(|c: char| !scan::is_ident_char(c))
                .next()
                .unwrap_or("");
            matches!(
                word,
                "return" | "typeof" | "case" | "in" | "of" | "void" | "throw" | "delete"
            )
        }
        _ => false,
    }
}

fn collect(chars: &[char], from: usize) -> String {
    chars.iter().skip(from).collect()
}

/// Read a quoted string body starting after the opening quote.
/// Returns the decoded text and the index after the closing quote.
fn read_string(chars: &[char], start: usize, quote: char) -> Result<(String, usize), JsError> {
    let mut text = String::new();
    let mut i = start;
    loop {
        match chars.get(i).copied() {
            None | Some('\n') => {
                return Err(JsError::parse_error(
                    "Unclosed quote",
                    format!("{quote}{text}"),
                ));
            }
            Some('\\') => i = read_escape(chars, i + 1, &mut text)?,
            Some(c) if c == quote => return Ok((text, i + 1)),
            Some(c) => {
                text.push(c);
                i += 1;
            }
        }
    }
}

fn hex_value(chars: &[char], from: usize, len: usize) -> Option<u32> {
    let digits: String = chars.iter().skip(from).take(len).collect();
    if digits.chars().count() != len {
        return None;
    }
    u32::from_str_radix(&digits, 16).ok()
}

/// Decode the escape sequence whose first character (after the backslash)
/// is at `i`. Returns the index after the sequence.
fn read_escape(chars: &[char], i: usize, out: &mut String) -> Result<usize, JsError> {
    let bad = |what: &str| JsError::parse_error(format!("Invalid {what} escape sequence"), collect(chars, i));
    let Some(c) = chars.get(i).copied() else {
        return Err(bad("trailing"));
    };
    let next = match c {
        'n' => {
            out.push('\n');
            i + 1
        }
        't' => {
            out.push('\t');
            i + 1
        }
        'r' => {
            out.push('\r');
            i + 1
        }
        'b' => {
            out.push('\u{8}');
            i + 1
        }
        'f' => {
            out.push('\u{c}');
            i + 1
        }
        'v' => {
            out.push('\u{b}');
            i + 1
        }
        '0' if !chars.get(i + 1).is_some_and(char::is_ascii_digit) => {
            out.push('\0');
            i + 1
        }
        'x' => {
            let code = hex_value(chars, i + 1, 2).ok_or_else(|| bad("hexadecimal"))?;
            out.push(char::from_u32(code).ok_or_else(|| bad("hexadecimal"))?);
            i + 3
        }
        'u' if chars.get(i + 1) == Some(&'{') => {
            let len = chars
                .iter()
                .skip(i + 2)
                .position(|c| *c == '}')
                .ok_or_else(|| bad("unicode"))?;
            let code = hex_value(chars, i + 2, len).ok_or_else(|| bad("unicode"))?;
            out.push(char::from_u32(code).ok_or_else(|| bad("unicode"))?);
            i + 3 + len
        }
        'u' => {
            let code = hex_value(chars, i + 1, 4).ok_or_else(|| bad("unicode"))?;
            let mut next = i + 5;
            let decoded = if (0xD800..0xDC00).contains(&code)
                && chars.get(next) == Some(&'\\')
                && chars.get(next + 1) == Some(&'u')
            {
                // Surrogate pair spelled as two escapes
                match hex_value(chars, next + 2, 4) {
                    Some(low) if (0xDC00..0xE000).contains(&low) => {
                        next += 6;
                        char::from_u32(0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00))
                    }
                    _ => None,
                }
            } else {
                char::from_u32(code)
            };
            out.push(decoded.unwrap_or('\u{FFFD}'));
            next
        }
        '\r' => {
            if chars.get(i + 1) == Some(&'\n') {
                i + 2
            } else {
                i + 1
            }
        }
        // Line continuation
        '\n' => i + 1,
        other => {
            out.push(other);
            i + 1
        }
    };
    Ok(next)
}

/// Read a template literal body starting after the opening backtick
fn read_template(
    chars: &[char],
    start: usize,
    constants: &mut Constants,
) -> Result<(TemplateLiteral, usize), JsError> {
    let mut text = String::new();
    let mut exprs = Vec::new();
    let mut i = start;
    loop {
        match chars.get(i).copied() {
            None => {
                return Err(JsError::parse_error(
                    "Unclosed template literal",
                    format!("`{text}"),
                ));
            }
            Some('`') => return Ok((TemplateLiteral { text, exprs }, i + 1)),
            Some('\\') => {
                let mut decoded = String::new();
                i = read_escape(chars, i + 1, &mut decoded)?;
                text.push_str(&decoded.replace('$', "$$"));
            }
            Some('$') if chars.get(i + 1) == Some(&'{') => {
                let rest = collect(chars, i + 2);
                let span = scan::rest_of_exp(&rest, &[], Some('{'))?;
                let span_chars = span.chars().count();
                let inner = extract_constants(span, constants)?;
                let expr = parser::lower_expression(&inner, constants)?;
                exprs.push(expr);
                text.push_str(&format!("${{{}}}", exprs.len() - 1));
                i += 2 + span_chars + 1;
            }
            Some('$') => {
                text.push_str("$$");
                i += 1;
            }
            Some(c) => {
                text.push(c);
                i += 1;
            }
        }
    }
}

/// Read a regex literal starting after the opening slash
fn read_regex(chars: &[char], start: usize) -> Result<(RegexLiteral, usize), JsError> {
    let mut pattern = String::new();
    let mut i = start;
    let mut in_class = false;
    loop {
        match chars.get(i).copied() {
            None | Some('\n') => {
                return Err(JsError::parse_error(
                    "Invalid regular expression: missing /",
                    format!("/{pattern}"),
                ));
            }
            Some('\\') => {
                pattern.push('\\');
                if let Some(c) = chars.get(i + 1) {
                    pattern.push(*c);
                }
                i += 2;
            }
            Some('/') if !in_class => {
                i += 1;
                break;
            }
            Some(c) => {
                match c {
                    '[' => in_class = true,
                    ']' => in_class = false,
                    _ => {}
                }
                pattern.push(c);
                i += 1;
            }
        }
    }
    let mut flags = String::new();
    while let Some(c) = chars.get(i).copied().filter(|c| c.is_ascii_alphabetic()) {
        if !"gimsuy".contains(c) || flags.contains(c) {
            return Err(JsError::parse_error(
                format!("Invalid regular expression flags '{c}'"),
                format!("/{pattern}/{flags}{c}"),
            ));
        }
        flags.push(c);
        i += 1;
    }
    Ok((RegexLiteral { pattern, flags }, i))
}
