//! Execution tree
//!
//! The parser lowers source text into a small prefix tree: every node is an
//! operation tag with two operand slots. Statement lists, argument lists and
//! loop headers are plain sequences of items.

use crate::error::JsError;
use crate::parser::{self, Constants};
use crate::prelude::*;
use crate::value::{JsString, JsValue};

/// Binding that holds the subject of a `for...of`/`for...in` loop
pub(crate) const LOOP_SUBJECT: &str = "$$obj";

/// Operation tags of [`Lisp`] nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // Member access and calls
    Prop,
    OptionalProp,
    Call,
    OptionalCall,
    New,

    // Literals
    CreateObject,
    KeyVal,
    CreateArray,
    Group,
    Str,
    Template,
    Regex,
    SpreadArray,
    SpreadObject,

    // Unary
    Not,
    BitNot,
    Positive,
    Negative,
    Typeof,
    Delete,
    Void,
    Await,

    // Update
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,

    // Assignment
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    PowAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    AndAssign,
    OrAssign,
    NullishAssign,

    // Binary
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
    Nullish,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Instanceof,
    In,

    // Conditionals
    Ternary,
    /// Two-armed payload of `Ternary` and `If`
    Branches,

    // Statements
    Var,
    Let,
    Const,
    Return,
    Throw,
    Function,
    InlineFunction,
    ArrowFunc,
    Loop,
    LoopAction,
    If,
    Switch,
    Case,
    Try,
    Block,
    Multi,

    // Loop internals
    /// Snapshot of the values a `for...of` visits
    Values,
    /// Snapshot of the keys a `for...in` visits
    Keys,
}

impl Op {
    /// The plain binary operator a compound assignment applies
    pub fn compound_base(self) -> Option<Op> {
        Some(match self {
            Op::AddAssign => Op::Add,
            Op::SubAssign => Op::Sub,
            Op::MulAssign => Op::Mul,
            Op::DivAssign => Op::Div,
            Op::ModAssign => Op::Mod,
            Op::PowAssign => Op::Pow,
            Op::ShlAssign => Op::Shl,
            Op::ShrAssign => Op::Shr,
            Op::UShrAssign => Op::UShr,
            Op::BitAndAssign => Op::BitAnd,
            Op::BitOrAssign => Op::BitOr,
            Op::BitXorAssign => Op::BitXor,
            _ => return None,
        })
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Op::Assign | Op::AndAssign | Op::OrAssign | Op::NullishAssign
        ) || self.compound_base().is_some()
    }

    /// Binding strength of binary operators, higher binds tighter
    pub fn precedence(self) -> Option<u8> {
        Some(match self {
            Op::Nullish => 1,
            Op::Or => 2,
            Op::And => 3,
            Op::BitOr => 4,
            Op::BitXor => 5,
            Op::BitAnd => 6,
            Op::Eq | Op::Ne | Op::StrictEq | Op::StrictNe => 7,
            Op::Lt | Op::Gt | Op::Le | Op::Ge | Op::Instanceof | Op::In => 8,
            Op::Shl | Op::Shr | Op::UShr => 9,
            Op::Add | Op::Sub => 10,
            Op::Mul | Op::Div | Op::Mod => 11,
            Op::Pow => 12,
            _ => return None,
        })
    }

    /// Operators that only read primitive operands and can be folded ahead of time
    pub fn is_pure(self) -> bool {
        self.precedence().is_some()
            && !matches!(self, Op::Instanceof | Op::In | Op::And | Op::Or | Op::Nullish)
            || matches!(self, Op::Not | Op::BitNot | Op::Positive | Op::Negative)
    }
}

/// Primitive constant embedded in the tree
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

impl Literal {
    pub fn to_value(&self) -> JsValue {
        match self {
            Literal::Undefined => JsValue::Undefined,
            Literal::Null => JsValue::Null,
            Literal::Boolean(b) => JsValue::Boolean(*b),
            Literal::Number(n) => JsValue::Number(*n),
            Literal::String(s) => JsValue::String(s.clone()),
        }
    }

    pub fn from_value(value: &JsValue) -> Option<Literal> {
        Some(match value {
            JsValue::Undefined => Literal::Undefined,
            JsValue::Null => Literal::Null,
            JsValue::Boolean(b) => Literal::Boolean(*b),
            JsValue::Number(n) => Literal::Number(*n),
            JsValue::String(s) => Literal::String(s.clone()),
            JsValue::Object(_) => return None,
        })
    }
}

/// Operand slot of a node
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Item {
    #[default]
    None,
    Literal(Literal),
    /// Identifier, property name or declared binding
    Name(JsString),
    Node(Rc<Lisp>),
    /// Ordered sequence: statements, arguments, array items, loop headers
    List(Rc<[Item]>),
    Function(Rc<FunctionDef>),
}

impl Item {
    pub fn node(op: Op, a: Item, b: Item) -> Item {
        Item::Node(Rc::new(Lisp { op, a, b }))
    }

    pub fn list(items: Vec<Item>) -> Item {
        Item::List(items.into())
    }

    pub fn name(name: &str) -> Item {
        Item::Name(JsString::from(name))
    }

    pub fn number(n: f64) -> Item {
        Item::Literal(Literal::Number(n))
    }

    pub fn as_node(&self) -> Option<&Lisp> {
        match self {
            Item::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn op(&self) -> Option<Op> {
        self.as_node().map(|n| n.op)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Item::None)
    }

    pub fn as_list(&self) -> &[Item] {
        match self {
            Item::List(items) => items,
            _ => &[],
        }
    }
}

/// A node of the execution tree
#[derive(Debug, Clone, PartialEq)]
pub struct Lisp {
    pub op: Op,
    pub a: Item,
    pub b: Item,
}

/// How a function was written, which decides its `this` and hoisting behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Declaration,
    Expression,
    Arrow,
}

/// Parsed function header with a lazily lowered body.
///
/// The body is kept as (placeholder-substituted) source until the function
/// is first called, then cached here.
pub struct FunctionDef {
    pub name: Option<JsString>,
    pub params: Vec<JsString>,
    pub rest: Option<JsString>,
    pub is_async: bool,
    pub kind: FunctionKind,
    source: FunctionSource,
    body: OnceCell<Rc<[Item]>>,
}

enum FunctionSource {
    /// Statement block
    Block(String),
    /// Arrow function with an expression body
    Expression(String),
    /// Already lowered, used for functions built from host strings
    Lowered,
}

impl FunctionDef {
    pub fn new(
        name: Option<JsString>,
        params: Vec<JsString>,
        rest: Option<JsString>,
        is_async: bool,
        kind: FunctionKind,
        body: &str,
        expression_body: bool,
    ) -> Self {
        let source = if expression_body {
            FunctionSource::Expression(body.to_string())
        } else {
            FunctionSource::Block(body.to_string())
        };
        FunctionDef {
            name,
            params,
            rest,
            is_async,
            kind,
            source,
            body: OnceCell::new(),
        }
    }

    /// A function whose body is already lowered
    pub fn lowered(
        name: Option<JsString>,
        params: Vec<JsString>,
        rest: Option<JsString>,
        body: Rc<[Item]>,
    ) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(body);
        FunctionDef {
            name,
            params,
            rest,
            is_async: false,
            kind: FunctionKind::Expression,
            source: FunctionSource::Lowered,
            body: cell,
        }
    }

    pub fn is_arrow(&self) -> bool {
        self.kind == FunctionKind::Arrow
    }

    /// Lowered body; parses the stored source on first use
    pub fn body(&self, constants: &Constants) -> Result<Rc<[Item]>, JsError> {
        if let Some(body) = self.body.get() {
            return Ok(body.clone());
        }
        let body: Rc<[Item]> = match &self.source {
            FunctionSource::Block(src) => parser::lower_block(src, constants)?.into(),
            FunctionSource::Expression(src) => {
                let expr = parser::lower_expression(src, constants)?;
                vec![Item::node(Op::Return, Item::None, expr)].into()
            }
            FunctionSource::Lowered => {
                return Err(JsError::internal("lowered function without a body"));
            }
        };
        let _ = self.body.set(body.clone());
        Ok(body)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    fn source_text(&self) -> Option<&str> {
        match &self.source {
            FunctionSource::Block(s) | FunctionSource::Expression(s) => Some(s),
            FunctionSource::Lowered => None,
        }
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("rest", &self.rest)
            .field("is_async", &self.is_async)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl PartialEq for FunctionDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && self.rest == other.rest
            && self.is_async == other.is_async
            && self.kind == other.kind
            && self.source_text() == other.source_text()
    }
}
