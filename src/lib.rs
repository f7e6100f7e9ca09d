//! XPath 1.0 queries over any tree that can be walked with a cursor.
//!
//! Implement [`Navigator`] for a cursor over your tree, then compile an
//! [`Expr`] once and run it against as many context nodes as needed.

pub use navpath_xpath1::*;
