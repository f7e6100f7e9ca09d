//! The public compile-and-run facade.

use crate::error::XPathError;
use crate::navigator::Navigator;
use crate::options::{CompileOptions, NamespaceMap};
use crate::parser;
use crate::query::{Context, Kind, Query};
use crate::value::{NodeSet, Value};
use std::fmt;

/// A compiled XPath 1.0 expression.
///
/// Compiling once and evaluating many times is the intended use: every
/// [`select`](Expr::select) and [`evaluate`](Expr::evaluate) call works on its
/// own copy of the operator tree, so an `Expr` can be shared freely.
#[derive(Debug, Clone)]
pub struct Expr<N: Navigator> {
    source: String,
    query: Query<N>,
    fallback: Option<XPathError>,
}

impl<N: Navigator> Expr<N> {
    pub fn compile(expr: &str) -> Result<Self, XPathError> {
        Self::compile_with_options(expr, &CompileOptions::default(), &NamespaceMap::new())
    }

    /// Compiles with namespace prefixes resolved through `namespaces`.
    pub fn compile_with_ns(expr: &str, namespaces: &NamespaceMap) -> Result<Self, XPathError> {
        Self::compile_with_options(expr, &CompileOptions::default(), namespaces)
    }

    pub fn compile_with_options(
        expr: &str,
        options: &CompileOptions,
        namespaces: &NamespaceMap,
    ) -> Result<Self, XPathError> {
        if expr.trim().is_empty() {
            return Err(XPathError::EmptyExpression);
        }
        let query = parser::parse(expr, options, namespaces)?;
        log::debug!("Compiled XPath expression '{}' ({:?})", expr, query.kind());
        Ok(Expr {
            source: expr.to_string(),
            query,
            fallback: None,
        })
    }

    /// Compiles `expr`, or on failure logs the error and returns an expression
    /// that selects nothing.
    pub fn compile_or_empty(expr: &str) -> Self {
        match Self::compile(expr) {
            Ok(compiled) => compiled,
            Err(err) => {
                log::warn!("XPath expression '{}' failed to compile, selecting nothing: {}", expr, err);
                Expr {
                    source: expr.to_string(),
                    query: Query::Empty,
                    fallback: Some(err),
                }
            }
        }
    }

    /// `true` when this is the empty stand-in produced by [`compile_or_empty`](Expr::compile_or_empty).
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn fallback_error(&self) -> Option<&XPathError> {
        self.fallback.as_ref()
    }

    /// The type of value [`evaluate`](Expr::evaluate) returns.
    pub fn kind(&self) -> Kind {
        self.query.kind()
    }

    /// The source text the expression was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Lazily selects the nodes the expression yields with `context` as the
    /// context node. Scalar expressions select nothing.
    pub fn select(&self, context: &N) -> NodeIter<N> {
        NodeIter {
            nodes: NodeSet::new(self.query.fresh(), context.clone()),
            current: None,
        }
    }

    /// Evaluates the expression with `context` as the context node, at
    /// position 1 of a context of size 1.
    pub fn evaluate(&self, context: &N) -> Value<N> {
        self.query.evaluate(&Context::new(context))
    }
}

impl<N: Navigator> fmt::Display for Expr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// The lazy result of [`Expr::select`].
#[derive(Debug, Clone)]
pub struct NodeIter<N: Navigator> {
    nodes: NodeSet<N>,
    current: Option<N>,
}

impl<N: Navigator> NodeIter<N> {
    /// The node most recently returned by `next`.
    pub fn current(&self) -> Option<&N> {
        self.current.as_ref()
    }
}

impl<N: Navigator> Iterator for NodeIter<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        self.current = self.nodes.next();
        self.current.clone()
    }
}

/// Compiles `expr` and selects from `context` in one call.
pub fn select<N: Navigator>(context: &N, expr: &str) -> Result<NodeIter<N>, XPathError> {
    Ok(Expr::compile(expr)?.select(context))
}

/// Compiles `expr` and evaluates it against `context` in one call.
pub fn evaluate<N: Navigator>(context: &N, expr: &str) -> Result<Value<N>, XPathError> {
    Ok(Expr::compile(expr)?.evaluate(context))
}
