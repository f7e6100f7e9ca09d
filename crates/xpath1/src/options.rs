//! Compile-time configuration.

use crate::navigator::Navigator;
use crate::query::Kind;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps namespace prefixes used in an expression to namespace URIs.
pub type NamespaceMap = HashMap<String, String>;

/// A value bound to a `$name` variable reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl VariableValue {
    pub fn kind(&self) -> Kind {
        match self {
            VariableValue::Boolean(_) => Kind::Boolean,
            VariableValue::Number(_) => Kind::Number,
            VariableValue::String(_) => Kind::String,
        }
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Boolean(value)
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        VariableValue::Number(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::String(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::String(value)
    }
}

impl<N: Navigator> From<VariableValue> for Value<N> {
    fn from(value: VariableValue) -> Self {
        match value {
            VariableValue::Boolean(b) => Value::Boolean(b),
            VariableValue::Number(n) => Value::Number(n),
            VariableValue::String(s) => Value::String(s),
        }
    }
}

/// Options passed to [`Expr::compile_with_options`](crate::Expr::compile_with_options).
///
/// Deserializable so hosts can keep them alongside their own configuration:
///
/// ```json
/// { "strict_eof": true, "variables": { "limit": 3, "label": "x" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Reject input left over after a complete expression instead of
    /// ignoring it.
    pub strict_eof: bool,
    /// Values for `$name` references, fixed at compile time.
    pub variables: HashMap<String, VariableValue>,
}

impl CompileOptions {
    /// Options that reject trailing input.
    pub fn strict() -> Self {
        CompileOptions {
            strict_eof: true,
            ..Default::default()
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}
