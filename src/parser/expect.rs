//! Grammar tables
//!
//! Each [`Expect`] category is an ordered list of anchored patterns. The
//! driver tries the categories legal at the current position in order and
//! dispatches on the first pattern that matches.

use std::sync::OnceLock;

use fancy_regex::Regex;

use crate::error::JsError;
use crate::lisp::Op;
use crate::parser::scan::Stop;

/// Grammar categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Binary operators
    Splitter,
    /// `? :`
    InlineIf,
    Assignment,
    IncrementerBefore,
    IncrementerAfter,
    /// Call and computed member access
    ExpEdge,
    Dot,
    Prop,
    Value,
    Modifier,
    /// Grouping, array and object literals
    Exp,
    ExpFunction,
    /// `return` and `throw`
    ExpSingle,
    Initialize,
    /// Statement keywords
    StartingExpected,
    /// The input may end here
    ExpEnd,
}

/// What a matched pattern stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Binary(Op),
    InlineIf,
    Assign(Op),
    IncrementBefore,
    IncrementAfter,
    Call,
    OptionalCall,
    ArrayProp,
    OptionalArrayProp,
    Dot,
    Prop,
    Number,
    Str,
    Template,
    Regex,
    Boolean,
    Null,
    Undefined,
    NaN,
    Infinity,
    Unary(Op),
    New,
    Group,
    CreateArray,
    CreateObject,
    ArrowFunction,
    InlineFunction,
    Return,
    Throw,
    Initialize,
    If,
    For,
    While,
    Do,
    Try,
    Switch,
    LoopAction,
    FunctionDeclaration,
    Block,
}

pub struct Pattern {
    pub token: Token,
    pub regex: Regex,
}

/// Compiled grammar, built once per process
pub struct Grammar {
    categories: Vec<(Expect, Vec<Pattern>)>,
    ternary: Regex,
    for_each: Regex,
}

use Expect::*;

/// Start of a statement
pub const STATEMENT: &[Expect] = &[
    StartingExpected,
    Initialize,
    ExpSingle,
    ExpFunction,
    Modifier,
    Value,
    Prop,
    Exp,
    IncrementerBefore,
];

/// Start of an expression
pub const EXPRESSION: &[Expect] = &[ExpFunction, Modifier, Value, Prop, Exp, IncrementerBefore];

/// After something that can be assigned to
pub const AFTER_PROP: &[Expect] = &[
    ExpEdge,
    Dot,
    IncrementerAfter,
    Assignment,
    Splitter,
    InlineIf,
    ExpEnd,
];

/// After a literal, a call or a parenthesized expression. Assignment is
/// accepted here only so that it can be reported as an invalid target.
pub const AFTER_VALUE: &[Expect] = &[ExpEdge, Dot, Assignment, Splitter, InlineIf, ExpEnd];

/// After a complete operator application
pub const AFTER_OPERATOR: &[Expect] = &[Splitter, InlineIf, ExpEnd];

const IDENT: &str = r"[a-zA-Z$_][\w$]*";
const WORD_END: &str = r"(?![\w$])";

fn binary_patterns() -> Vec<(Op, String)> {
    let p = |op: Op, re: &str| (op, format!("^{re}"));
    vec![
        p(Op::Nullish, r"\?\?(?!=)"),
        p(Op::Or, r"\|\|(?!=)"),
        p(Op::And, r"&&(?!=)"),
        p(Op::BitOr, r"\|(?![|=])"),
        p(Op::BitXor, r"\^(?!=)"),
        p(Op::BitAnd, r"&(?![&=])"),
        p(Op::StrictEq, r"==="),
        p(Op::StrictNe, r"!=="),
        p(Op::Eq, r"==(?!=)"),
        p(Op::Ne, r"!=(?!=)"),
        p(Op::UShr, r">>>(?!=)"),
        p(Op::Shr, r">>(?![>=])"),
        p(Op::Shl, r"<<(?!=)"),
        p(Op::Le, r"<="),
        p(Op::Ge, r">="),
        p(Op::Lt, r"<(?![<=])"),
        p(Op::Gt, r">(?![>=])"),
        p(Op::Instanceof, &format!("instanceof{WORD_END}")),
        p(Op::In, &format!("in{WORD_END}")),
        p(Op::Add, r"\+(?![+=])"),
        p(Op::Sub, r"-(?![-=])"),
        p(Op::Pow, r"\*\*(?!=)"),
        p(Op::Mul, r"\*(?![*=])"),
        p(Op::Div, r"/(?!=)"),
        p(Op::Mod, r"%(?!=)"),
    ]
}

fn assignment_patterns() -> Vec<(Op, &'static str)> {
    vec![
        (Op::Assign, r"^=(?![=>])"),
        (Op::AddAssign, r"^\+="),
        (Op::SubAssign, r"^-="),
        (Op::PowAssign, r"^\*\*="),
        (Op::MulAssign, r"^\*="),
        (Op::DivAssign, r"^/="),
        (Op::ModAssign, r"^%="),
        (Op::ShlAssign, r"^<<="),
        (Op::UShrAssign, r"^>>>="),
        (Op::ShrAssign, r"^>>="),
        (Op::AndAssign, r"^&&="),
        (Op::OrAssign, r"^\|\|="),
        (Op::NullishAssign, r"^\?\?="),
        (Op::BitAndAssign, r"^&="),
        (Op::BitOrAssign, r"^\|="),
        (Op::BitXorAssign, r"^\^="),
    ]
}

fn compile(pattern: &str) -> Result<Regex, String> {
    Regex::new(pattern).map_err(|e| format!("grammar pattern {pattern:?}: {e}"))
}

impl Grammar {
    fn build() -> Result<Grammar, String> {
        let pat = |token: Token, re: &str| -> Result<Pattern, String> {
            Ok(Pattern {
                token,
                regex: compile(re)?,
            })
        };

        let splitter = binary_patterns()
            .into_iter()
            .map(|(op, re)| pat(Token::Binary(op), &re))
            .collect::<Result<Vec<_>, _>>()?;
        let assignment = assignment_patterns()
            .into_iter()
            .map(|(op, re)| pat(Token::Assign(op), re))
            .collect::<Result<Vec<_>, _>>()?;

        let categories = vec![
            (Splitter, splitter),
            (InlineIf, vec![pat(Token::InlineIf, r"^\?(?![?.])")?]),
            (Assignment, assignment),
            (IncrementerBefore, vec![pat(Token::IncrementBefore, r"^(\+\+|--)")?]),
            (IncrementerAfter, vec![pat(Token::IncrementAfter, r"^(\+\+|--)")?]),
            (
                ExpEdge,
                vec![
                    pat(Token::OptionalCall, r"^\?\.\(")?,
                    pat(Token::OptionalArrayProp, r"^\?\.\[")?,
                    pat(Token::Call, r"^\(")?,
                    pat(Token::ArrayProp, r"^\[")?,
                ],
            ),
            (Dot, vec![pat(Token::Dot, &format!(r"^(\?)?\.\s*({IDENT})"))?]),
            (Prop, vec![pat(Token::Prop, &format!("^{IDENT}"))?]),
            (
                Value,
                vec![
                    pat(
                        Token::Number,
                        &format!(
                            r"^(?:0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+|(?:\d[\d_]*(?:\.[\d_]*)?|\.\d[\d_]*)(?:[eE][+-]?\d+)?){WORD_END}"
                        ),
                    )?,
                    pat(Token::Str, r#"^"(\d+)""#)?,
                    pat(Token::Template, r"^`(\d+)`")?,
                    pat(Token::Regex, r"^/(\d+)/r")?,
                    pat(Token::Boolean, &format!("^(true|false){WORD_END}"))?,
                    pat(Token::Null, &format!("^null{WORD_END}"))?,
                    pat(Token::Undefined, &format!("^undefined{WORD_END}"))?,
                    pat(Token::NaN, &format!("^NaN{WORD_END}"))?,
                    pat(Token::Infinity, &format!("^Infinity{WORD_END}"))?,
                ],
            ),
            (
                Modifier,
                vec![
                    pat(Token::Unary(Op::Not), r"^!(?!=)")?,
                    pat(Token::Unary(Op::BitNot), r"^~")?,
                    pat(Token::Unary(Op::Negative), r"^-(?![-=])")?,
                    pat(Token::Unary(Op::Positive), r"^\+(?![+=])")?,
                    pat(Token::Unary(Op::Typeof), &format!("^typeof{WORD_END}"))?,
                    pat(Token::Unary(Op::Delete), &format!("^delete{WORD_END}"))?,
                    pat(Token::Unary(Op::Void), &format!("^void{WORD_END}"))?,
                    pat(Token::Unary(Op::Await), &format!("^await{WORD_END}"))?,
                    pat(Token::New, &format!("^new{WORD_END}"))?,
                ],
            ),
            (
                Exp,
                vec![
                    pat(Token::Group, r"^\(")?,
                    pat(Token::CreateArray, r"^\[")?,
                    pat(Token::CreateObject, r"^\{")?,
                ],
            ),
            (
                ExpFunction,
                vec![
                    pat(
                        Token::ArrowFunction,
                        &format!(r"^(async\s+)?(?:({IDENT})|\(([^()]*)\))\s*=>"),
                    )?,
                    pat(
                        Token::InlineFunction,
                        &format!(r"^(async\s+)?function{WORD_END}"),
                    )?,
                ],
            ),
            (
                ExpSingle,
                vec![
                    pat(Token::Return, &format!("^return{WORD_END}"))?,
                    pat(Token::Throw, &format!("^throw{WORD_END}"))?,
                ],
            ),
            (
                Initialize,
                vec![pat(
                    Token::Initialize,
                    r"^(var|let|const)\s+(?=[a-zA-Z$_\[{])",
                )?],
            ),
            (
                StartingExpected,
                vec![
                    pat(Token::If, r"^if\s*(?=\()")?,
                    pat(Token::For, r"^for\s*(?=\()")?,
                    pat(Token::While, r"^while\s*(?=\()")?,
                    pat(Token::Do, &format!("^do{WORD_END}"))?,
                    pat(Token::Try, r"^try\s*(?=\{)")?,
                    pat(Token::Switch, r"^switch\s*(?=\()")?,
                    pat(Token::LoopAction, &format!("^(break|continue){WORD_END}"))?,
                    pat(
                        Token::FunctionDeclaration,
                        &format!(r"^(async\s+)?function\s*(\*\s*)?(?={IDENT})"),
                    )?,
                    pat(Token::Block, r"^\{")?,
                ],
            ),
            (ExpEnd, Vec::new()),
        ];

        Ok(Grammar {
            categories,
            ternary: compile(r"^\?(?![?.])")?,
            for_each: compile(&format!(
                r"^\s*(?:(var|let|const)\s+)?({IDENT})\s+(of|in){WORD_END}([\s\S]+)$"
            ))?,
        })
    }

    pub fn patterns(&self, expect: Expect) -> &[Pattern] {
        self.categories
            .iter()
            .find(|(e, _)| *e == expect)
            .map_or(&[], |(_, p)| p.as_slice())
    }

    /// Terminators for the right operand of a binary operator: every binary
    /// operator binding no tighter than `op` (strictly looser for the
    /// right-associative `**`), plus the conditional operator.
    pub fn operand_stops(&self, op: Op) -> Vec<Stop<'_>> {
        let level = op.precedence().unwrap_or(u8::MAX);
        let mut stops: Vec<Stop<'_>> = self
            .patterns(Splitter)
            .iter()
            .filter(|p| match p.token {
                Token::Binary(other) => {
                    let other_level = other.precedence().unwrap_or(0);
                    if op == Op::Pow {
                        other_level < level
                    } else {
                        other_level <= level
                    }
                }
                _ => false,
            })
            .map(|p| Stop::Regex(&p.regex))
            .collect();
        stops.push(Stop::Regex(&self.ternary));
        stops.push(Stop::Char(':'));
        stops
    }

    /// Terminators for the operand of a prefix operator
    pub fn unary_stops(&self) -> Vec<Stop<'_>> {
        let mut stops: Vec<Stop<'_>> = self
            .patterns(Splitter)
            .iter()
            .map(|p| Stop::Regex(&p.regex))
            .collect();
        stops.push(Stop::Regex(&self.ternary));
        stops.push(Stop::Char(':'));
        stops
    }

    pub fn ternary(&self) -> &Regex {
        &self.ternary
    }

    /// `for` headers of the form `[kind] name of|in subject`
    pub fn for_each(&self) -> &Regex {
        &self.for_each
    }
}

static GRAMMAR: OnceLock<Result<Grammar, String>> = OnceLock::new();

/// The process-wide grammar
pub fn grammar() -> Result<&'static Grammar, JsError> {
    GRAMMAR
        .get_or_init(Grammar::build)
        .as_ref()
        .map_err(|e| JsError::internal(e.clone()))
}
