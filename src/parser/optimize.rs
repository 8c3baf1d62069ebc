//! Constant folding over the lowered tree
//!
//! Runs once per lowered statement list. String placeholders become literal
//! strings, templates without interpolation become strings, and pure
//! operators over literal operands are evaluated ahead of time.

use crate::interpreter::operators;
use crate::lisp::{Item, Literal, Lisp, Op};
use crate::parser::Constants;
use crate::prelude::*;

pub fn optimize(item: Item, constants: &Constants) -> Item {
    match item {
        Item::Node(node) => optimize_node(&node, constants),
        Item::List(items) => Item::List(
            items
                .iter()
                .map(|i| optimize(i.clone(), constants))
                .collect(),
        ),
        other => other,
    }
}

fn literal_index(item: &Item) -> Option<usize> {
    match item {
        Item::Literal(Literal::Number(n)) if *n >= 0.0 => Some(*n as usize),
        _ => None,
    }
}

fn optimize_node(node: &Rc<Lisp>, constants: &Constants) -> Item {
    let a = optimize(node.a.clone(), constants);
    let b = optimize(node.b.clone(), constants);

    match node.op {
        Op::Str => {
            if let Some(s) = literal_index(&b).and_then(|i| constants.string(i).ok()) {
                return Item::Literal(Literal::String(s.clone()));
            }
        }
        Op::Template => {
            if let Some(t) = literal_index(&b).and_then(|i| constants.literal(i).ok())
                && t.exprs.is_empty()
            {
                return Item::Literal(Literal::String(t.render(&[]).into()));
            }
        }
        Op::Group => {
            if let Item::Literal(lit) = b {
                return Item::Literal(lit);
            }
        }
        Op::Not | Op::BitNot | Op::Positive | Op::Negative | Op::Typeof => {
            if let Item::Literal(lit) = &b
                && let Some(folded) = operators::unary(node.op, &lit.to_value())
                    .ok()
                    .and_then(|v| Literal::from_value(&v))
            {
                return Item::Literal(folded);
            }
        }
        op if op.is_pure() => {
            if let (Item::Literal(l), Item::Literal(r)) = (&a, &b)
                && let Some(folded) = operators::binary(op, &l.to_value(), &r.to_value())
                    .ok()
                    .and_then(|v| Literal::from_value(&v))
            {
                return Item::Literal(folded);
            }
        }
        _ => {}
    }

    // Keep the original allocation when nothing below changed
    if a == node.a && b == node.b {
        return Item::Node(node.clone());
    }
    Item::node(node.op, a, b)
}
