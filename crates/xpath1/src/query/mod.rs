//! The compiled form of an expression: a tree of stateful query operators.
//!
//! Node-producing operators are pulled one node at a time with
//! [`Query::advance`]; any operator can also be evaluated to a [`Value`] against
//! a context with [`Query::evaluate`]. Cloning an operator copies its whole
//! subtree including traversal state; [`Query::reset`] rewinds it.

pub mod axes;
pub mod operators;
pub mod path;

use crate::functions::FunctionQuery;
use crate::navigator::Navigator;
use crate::options::VariableValue;
use crate::value::{NodeSet, Value};
use operators::{ArithmeticQuery, CompareQuery, LogicalQuery};
use path::{ContextQuery, FilterQuery, MergeQuery, RootQuery, StepQuery, UnionQuery};

/// The evaluation context of an expression: the context node plus the
/// position and size used by `position()` and `last()`.
#[derive(Debug, Clone, Copy)]
pub struct Context<'c, N> {
    pub node: &'c N,
    pub position: usize,
    pub size: usize,
}

impl<'c, N> Context<'c, N> {
    pub fn new(node: &'c N) -> Self {
        Context {
            node,
            position: 1,
            size: 1,
        }
    }
}

/// Result type of an expression, known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    NodeSet,
    Boolean,
    Number,
    String,
}

/// What is statically known about the order of a node stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// At most one node.
    pub single: bool,
    /// No node is an ancestor of another.
    pub peers: bool,
    /// Nodes arrive in document order without duplicates.
    pub ordered: bool,
}

impl Shape {
    pub const SINGLE: Shape = Shape {
        single: true,
        peers: true,
        ordered: true,
    };
    pub const PEERS: Shape = Shape {
        single: false,
        peers: true,
        ordered: true,
    };
    pub const ORDERED: Shape = Shape {
        single: false,
        peers: false,
        ordered: true,
    };
    pub const REVERSE_PEERS: Shape = Shape {
        single: false,
        peers: true,
        ordered: false,
    };
    pub const UNORDERED: Shape = Shape {
        single: false,
        peers: false,
        ordered: false,
    };
}

#[derive(Debug, Clone)]
pub enum Query<N> {
    Context(ContextQuery),
    Root(RootQuery),
    Step(StepQuery<N>),
    Filter(FilterQuery<N>),
    Merge(MergeQuery<N>),
    Union(UnionQuery<N>),
    Logical(LogicalQuery<N>),
    Compare(CompareQuery<N>),
    Arithmetic(ArithmeticQuery<N>),
    Negate(Box<Query<N>>),
    Number(f64),
    Literal(String),
    Variable(VariableValue),
    Function(FunctionQuery<N>),
    /// Selects nothing.
    Empty,
}

impl<N: Navigator> Query<N> {
    /// Pulls the next node. Scalar operators yield nothing.
    pub fn advance(&mut self, context: &N) -> Option<N> {
        match self {
            Query::Context(q) => q.advance(context),
            Query::Root(q) => q.advance(context),
            Query::Step(q) => q.advance(context),
            Query::Filter(q) => q.advance(context),
            Query::Merge(q) => q.advance(context),
            Query::Union(q) => q.advance(context),
            _ => None,
        }
    }

    pub fn evaluate(&self, ctx: &Context<'_, N>) -> Value<N> {
        match self {
            Query::Context(_)
            | Query::Root(_)
            | Query::Step(_)
            | Query::Filter(_)
            | Query::Merge(_)
            | Query::Union(_)
            | Query::Empty => Value::NodeSet(NodeSet::new(self.fresh(), ctx.node.clone())),
            Query::Logical(q) => q.evaluate(ctx),
            Query::Compare(q) => q.evaluate(ctx),
            Query::Arithmetic(q) => q.evaluate(ctx),
            Query::Negate(q) => Value::Number(-q.evaluate(ctx).to_number()),
            Query::Number(n) => Value::Number(*n),
            Query::Literal(s) => Value::String(s.clone()),
            Query::Variable(v) => v.clone().into(),
            Query::Function(q) => q.evaluate(ctx),
        }
    }

    /// Rewinds the operator and everything below it to the initial state.
    pub fn reset(&mut self) {
        match self {
            Query::Context(q) => q.reset(),
            Query::Root(q) => q.reset(),
            Query::Step(q) => q.reset(),
            Query::Filter(q) => q.reset(),
            Query::Merge(q) => q.reset(),
            Query::Union(q) => q.reset(),
            Query::Logical(q) => q.reset(),
            Query::Compare(q) => q.reset(),
            Query::Arithmetic(q) => q.reset(),
            Query::Negate(q) => q.reset(),
            Query::Function(q) => q.reset(),
            Query::Number(_) | Query::Literal(_) | Query::Variable(_) | Query::Empty => {}
        }
    }

    /// An independent copy in the initial state.
    pub fn fresh(&self) -> Self {
        let mut query = self.clone();
        query.reset();
        query
    }

    pub fn kind(&self) -> Kind {
        match self {
            Query::Context(_)
            | Query::Root(_)
            | Query::Step(_)
            | Query::Filter(_)
            | Query::Merge(_)
            | Query::Union(_)
            | Query::Empty => Kind::NodeSet,
            Query::Logical(_) | Query::Compare(_) => Kind::Boolean,
            Query::Arithmetic(_) | Query::Negate(_) | Query::Number(_) => Kind::Number,
            Query::Literal(_) => Kind::String,
            Query::Variable(v) => v.kind(),
            Query::Function(q) => q.kind(),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Query::Step(q) => q.shape(),
            Query::Filter(q) => q.shape(),
            Query::Merge(_) | Query::Union(_) => Shape::ORDERED,
            _ => Shape::SINGLE,
        }
    }

    /// Identifies which input context produced the node most recently returned
    /// by [`advance`](Query::advance). Positional predicates restart counting
    /// whenever it changes.
    pub fn group(&self) -> usize {
        match self {
            Query::Step(q) => q.group(),
            Query::Filter(q) => q.group(),
            _ => 0,
        }
    }
}
