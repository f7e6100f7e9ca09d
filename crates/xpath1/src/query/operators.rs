//! Logical, comparison and arithmetic operators.

use super::{Context, Query};
use crate::navigator::Navigator;
use crate::value::{NodeSet, Value, string_to_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// `and` / `or`, evaluating the right operand only when needed.
#[derive(Debug, Clone)]
pub struct LogicalQuery<N> {
    op: LogicalOp,
    left: Box<Query<N>>,
    right: Box<Query<N>>,
}

impl<N: Navigator> LogicalQuery<N> {
    pub fn new(op: LogicalOp, left: Query<N>, right: Query<N>) -> Self {
        LogicalQuery {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn evaluate(&self, ctx: &Context<'_, N>) -> Value<N> {
        let left = self.left.evaluate(ctx).to_bool();
        let result = match self.op {
            LogicalOp::And => left && self.right.evaluate(ctx).to_bool(),
            LogicalOp::Or => left || self.right.evaluate(ctx).to_bool(),
        };
        Value::Boolean(result)
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// The operator that gives the same answer with the operands swapped.
    fn swapped(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            other => other,
        }
    }

    fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    fn numbers(self, a: f64, b: f64) -> bool {
        match self {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        }
    }

    fn strings(self, a: &str, b: &str) -> bool {
        match self {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            _ => self.numbers(string_to_number(a), string_to_number(b)),
        }
    }

    fn booleans(self, a: bool, b: bool) -> bool {
        match self {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            _ => self.numbers(f64::from(u8::from(a)), f64::from(u8::from(b))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompareQuery<N> {
    op: CompareOp,
    left: Box<Query<N>>,
    right: Box<Query<N>>,
}

impl<N: Navigator> CompareQuery<N> {
    pub fn new(op: CompareOp, left: Query<N>, right: Query<N>) -> Self {
        CompareQuery {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn evaluate(&self, ctx: &Context<'_, N>) -> Value<N> {
        let left = self.left.evaluate(ctx);
        let right = self.right.evaluate(ctx);
        Value::Boolean(compare(self.op, left, right))
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

/// Compares two values with the XPath 1.0 rules: node-sets compare
/// existentially, node by node, against the other operand.
pub fn compare<N: Navigator>(op: CompareOp, left: Value<N>, right: Value<N>) -> bool {
    match (left, right) {
        (Value::NodeSet(left), Value::NodeSet(right)) => {
            let right: Vec<String> = right.map(|n| n.value()).collect();
            left.map(|n| n.value())
                .any(|l| right.iter().any(|r| op.strings(&l, r)))
        }
        (Value::NodeSet(nodes), scalar) => compare_with_nodes(op, nodes, scalar),
        (scalar, Value::NodeSet(nodes)) => compare_with_nodes(op.swapped(), nodes, scalar),
        (left, right) => compare_scalars(op, &left, &right),
    }
}

fn compare_with_nodes<N: Navigator>(op: CompareOp, mut nodes: NodeSet<N>, scalar: Value<N>) -> bool {
    match scalar {
        Value::Boolean(b) => op.booleans(!nodes.is_empty(), b),
        Value::Number(n) => nodes.any(|node| op.numbers(string_to_number(&node.value()), n)),
        Value::String(s) => nodes.any(|node| op.strings(&node.value(), &s)),
        Value::NodeSet(other) => compare(op, Value::NodeSet(nodes), Value::NodeSet(other)),
    }
}

fn compare_scalars<N: Navigator>(op: CompareOp, left: &Value<N>, right: &Value<N>) -> bool {
    if !op.is_equality() {
        return op.numbers(left.to_number(), right.to_number());
    }
    match (left, right) {
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => op.booleans(left.to_bool(), right.to_bool()),
        (Value::Number(_), _) | (_, Value::Number(_)) => op.numbers(left.to_number(), right.to_number()),
        _ => op.strings(&left.to_string(), &right.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone)]
pub struct ArithmeticQuery<N> {
    op: ArithmeticOp,
    left: Box<Query<N>>,
    right: Box<Query<N>>,
}

impl<N: Navigator> ArithmeticQuery<N> {
    pub fn new(op: ArithmeticOp, left: Query<N>, right: Query<N>) -> Self {
        ArithmeticQuery {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn evaluate(&self, ctx: &Context<'_, N>) -> Value<N> {
        let l = self.left.evaluate(ctx).to_number();
        let r = self.right.evaluate(ctx).to_number();
        Value::Number(match self.op {
            ArithmeticOp::Add => l + r,
            ArithmeticOp::Subtract => l - r,
            ArithmeticOp::Multiply => l * r,
            ArithmeticOp::Divide => l / r,
            // Truncating remainder, sign follows the dividend.
            ArithmeticOp::Modulo => l % r,
        })
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}
