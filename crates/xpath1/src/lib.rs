//! An XPath 1.0 compiler and lazy evaluator over any tree that can be walked
//! with a [`Navigator`] cursor.
//!
//! ```ignore
//! let expr = Expr::compile("//book[price > 10]/title")?;
//! for title in expr.select(&root_cursor) {
//!     println!("{}", title.value());
//! }
//! ```

pub mod error;
pub mod expr;
mod functions;
pub mod lexer;
pub mod navigator;
pub mod options;
mod parser;
mod query;
pub mod value;

pub use error::XPathError;
pub use expr::{Expr, NodeIter, evaluate, select};
pub use navigator::{Navigator, NodeKey, NodeType, document_order};
pub use options::{CompileOptions, NamespaceMap, VariableValue};
pub use query::Kind;
pub use value::{NodeSet, Value};

// Re-export test utilities for integration testing in downstream crates
pub use navigator::tests;
