//! XPath values and the coercion rules between them.

use crate::lexer;
use crate::navigator::{Navigator, NodeKey};
use crate::query::Query;
use std::fmt;

/// Represents the possible result types of an XPath expression evaluation.
#[derive(Debug, Clone)]
pub enum Value<N: Navigator> {
    NodeSet(NodeSet<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<N: Navigator> Value<N> {
    /// Coerces the XPath value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
        }
    }

    /// Coerces the XPath value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::NodeSet(nodes) => nodes
                .first()
                .map(|n| string_to_number(&n.value()))
                .unwrap_or(f64::NAN),
        }
    }

    /// Returns the node-set, if this value is one.
    pub fn into_node_set(self) -> Option<NodeSet<N>> {
        match self {
            Value::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }
}

impl<N: Navigator> fmt::Display for Value<N> {
    /// Coerces the XPath value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NodeSet(nodes) => {
                write!(f, "{}", nodes.first().map(|n| n.value()).unwrap_or_default())
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Parses a string with the XPath number grammar: optional whitespace, an
/// optional minus sign, digits with an optional fraction. Anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(lexer::is_xpath_whitespace);
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    match lexer::number_literal(unsigned) {
        Ok(("", _)) => trimmed.parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Formats a number the way XPath's `string()` does: no exponent, no trailing
/// `.0` on integers, and spelled-out special values.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// A lazily evaluated node-set.
///
/// Holds its own copy of the operator plan and of the context cursor, so
/// iterating it never disturbs any other evaluation. [`restart`](NodeSet::restart)
/// gives an independent traversal from the beginning.
#[derive(Debug, Clone)]
pub struct NodeSet<N: Navigator> {
    plan: Box<Query<N>>,
    context: N,
    active: Option<Box<Query<N>>>,
}

impl<N: Navigator> NodeSet<N> {
    /// `plan` must be in its initial state.
    pub(crate) fn new(plan: Query<N>, context: N) -> Self {
        NodeSet {
            plan: Box::new(plan),
            context,
            active: None,
        }
    }

    /// A fresh traversal of the same node-set.
    pub fn restart(&self) -> Self {
        NodeSet {
            plan: self.plan.clone(),
            context: self.context.clone(),
            active: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.restart().next().is_none()
    }

    /// Number of nodes in the set.
    pub fn len(&self) -> usize {
        self.restart().count()
    }

    /// The first node in document order.
    pub fn first(&self) -> Option<N> {
        let mut nodes = self.restart();
        if self.plan.shape().ordered {
            return nodes.next();
        }
        nodes.min_by_key(NodeKey::of)
    }
}

impl<N: Navigator> Iterator for NodeSet<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let plan = &self.plan;
        self.active
            .get_or_insert_with(|| plan.clone())
            .advance(&self.context)
    }
}
