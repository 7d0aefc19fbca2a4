// crates/sqlserial-core/src/core/operation.rs
// ============================================================================
// Module: SQL Serial Operations
// Description: Statements and operation payloads submitted to the engine.
// Purpose: Describe one unit of serialized work against the storage connection.
// Dependencies: serde, crate::core::value
// ============================================================================

//! ## Overview
//! An [`Operation`] is either a single [`Statement`] or an ordered batch of
//! statements executed as one transactional unit. Operations are immutable
//! once submitted; the engine owns them until the executor consumes them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::slice;

use serde::Deserialize;
use serde::Serialize;

use crate::core::value::SqlValue;

// ============================================================================
// SECTION: Statements
// ============================================================================

/// One SQL statement with positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement text.
    pub sql: String,
    /// Positional parameters bound in order.
    #[serde(default)]
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Creates a statement without parameters.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a statement with positional parameters.
    #[must_use]
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Appends one positional parameter.
    #[must_use]
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Work submitted for serialized execution.
///
/// # Invariants
/// - A batch runs in order as one unit; only the final statement's rows are
///   reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "statements", rename_all = "snake_case")]
pub enum Operation {
    /// A single statement.
    Single(Statement),
    /// An ordered group of statements executed as one transaction.
    Batch(Vec<Statement>),
}

impl Operation {
    /// Creates a single-statement operation.
    #[must_use]
    pub const fn single(statement: Statement) -> Self {
        Self::Single(statement)
    }

    /// Creates a batched operation.
    #[must_use]
    pub const fn batch(statements: Vec<Statement>) -> Self {
        Self::Batch(statements)
    }

    /// Returns the statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        match self {
            Self::Single(statement) => slice::from_ref(statement),
            Self::Batch(statements) => statements,
        }
    }

    /// Returns true for batched operations.
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }
}

impl From<Statement> for Operation {
    fn from(statement: Statement) -> Self {
        Self::Single(statement)
    }
}

impl From<Vec<Statement>> for Operation {
    fn from(statements: Vec<Statement>) -> Self {
        Self::Batch(statements)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Operation;
    use super::Statement;
    use crate::core::value::SqlValue;

    #[test]
    fn single_exposes_one_statement() {
        let operation = Operation::from(Statement::new("SELECT 1"));
        assert_eq!(operation.statements().len(), 1);
        assert!(!operation.is_batch());
    }

    #[test]
    fn bind_appends_in_order() {
        let statement = Statement::new("INSERT INTO t VALUES (?, ?)").bind(1).bind("two");
        assert_eq!(statement.params, vec![SqlValue::Integer(1), SqlValue::Text("two".to_string())]);
    }

    #[test]
    fn statement_params_default_to_empty() {
        let parsed: Result<Statement, _> = serde_json::from_str(r#"{"sql": "SELECT 1"}"#);
        assert_eq!(parsed.ok(), Some(Statement::new("SELECT 1")));
    }
}
