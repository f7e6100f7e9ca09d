use thiserror::Error;

/// Everything that can go wrong while compiling an expression.
///
/// Evaluation never fails: once an expression compiles, malformed coercions
/// resolve to NaN, empty strings, empty node-sets or `false`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("XPath expression is empty")]
    EmptyExpression,

    #[error("Unrecognized character '{found}' at offset {offset}")]
    Lexical { found: String, offset: usize },

    #[error("Unterminated string literal starting at offset {offset}")]
    UnterminatedLiteral { offset: usize },

    #[error("Expected {expected} at offset {offset}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("Unknown XPath function '{name}' at offset {offset}")]
    UnknownFunction { name: String, offset: usize },

    #[error("Function '{name}' at offset {offset} expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
        offset: usize,
    },

    #[error("Undeclared namespace prefix '{prefix}' at offset {offset}")]
    UndeclaredPrefix { prefix: String, offset: usize },

    #[error("Undeclared variable '${name}' at offset {offset}")]
    UndeclaredVariable { name: String, offset: usize },

    #[error("{context} requires a node-set (offset {offset})")]
    NodeSetRequired { context: String, offset: usize },

    #[error("Unexpected token after end of expression at offset {offset}: '{remainder}'")]
    TrailingInput { remainder: String, offset: usize },
}

impl XPathError {
    /// Byte offset into the source expression the error points at.
    pub fn offset(&self) -> Option<usize> {
        match self {
            XPathError::EmptyExpression => None,
            XPathError::Lexical { offset, .. }
            | XPathError::UnterminatedLiteral { offset }
            | XPathError::UnexpectedToken { offset, .. }
            | XPathError::UnknownFunction { offset, .. }
            | XPathError::Arity { offset, .. }
            | XPathError::UndeclaredPrefix { offset, .. }
            | XPathError::UndeclaredVariable { offset, .. }
            | XPathError::NodeSetRequired { offset, .. }
            | XPathError::TrailingInput { offset, .. } => Some(*offset),
        }
    }
}
