// crates/sqlserial-core/src/core/value.rs
// ============================================================================
// Module: SQL Serial Value Model
// Description: Parameter values, result rows, and typed row decoding.
// Purpose: Give callers a backend-neutral view of statement inputs and outputs.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Values follow the `SQLite` storage classes: null, integer, real, text and
//! blob. A [`RowSet`] carries the rows produced by the last statement of an
//! operation. Callers that want structured records implement [`FromRow`] and
//! read columns through [`RowRef::get`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Values
// ============================================================================

/// A single statement parameter or result cell.
///
/// # Invariants
/// - Serializes untagged: JSON `null`, integers, floats, strings, and byte
///   arrays map to the matching variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns the storage class label for the value.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    /// Returns true for SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(value) => value.fmt(f),
            Self::Real(value) => value.fmt(f),
            Self::Text(value) => value.fmt(f),
            Self::Blob(bytes) => write!(f, "<blob {} bytes>", bytes.len()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// ============================================================================
// SECTION: Row Sets
// ============================================================================

/// Rows produced by the final statement of an operation.
///
/// # Invariants
/// - Every row has exactly `columns.len()` cells.
/// - `rows_affected` reports the change count of the final statement and is
///   zero for pure queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Result rows.
    pub rows: Vec<Vec<SqlValue>>,
    /// Rows changed by the final statement.
    #[serde(default)]
    pub rows_affected: usize,
}

impl RowSet {
    /// Creates an empty row set with no columns.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a row set from columns and rows.
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
        }
    }

    /// Creates a row set for a statement that only changed rows.
    #[must_use]
    pub const fn affected(rows_affected: usize) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected,
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when no rows were produced.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates rows with column-name access.
    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    /// Returns the first row, if any.
    #[must_use]
    pub fn first(&self) -> Option<RowRef<'_>> {
        self.iter().next()
    }

    /// Decodes every row into `T`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RowError`] raised by `T::from_row`.
    pub fn decode<T: FromRow>(&self) -> Result<Vec<T>, RowError> {
        self.iter().map(|row| T::from_row(&row)).collect()
    }

    /// Renders the rows as an array of JSON objects keyed by column name.
    #[must_use]
    pub fn to_json_objects(&self) -> serde_json::Value {
        let rows = self
            .iter()
            .map(|row| {
                let object = row
                    .columns
                    .iter()
                    .zip(row.values)
                    .map(|(column, value)| {
                        let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                        (column.clone(), json)
                    })
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

/// Borrowed view of one row with access by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    /// Column names shared by every row of the set.
    columns: &'a [String],
    /// Cells of this row.
    values: &'a [SqlValue],
}

impl<'a> RowRef<'a> {
    /// Returns the raw cells of the row.
    #[must_use]
    pub const fn values(&self) -> &'a [SqlValue] {
        self.values
    }

    /// Returns the raw cell for `column`, if present.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&'a SqlValue> {
        let index = self.columns.iter().position(|name| name == column)?;
        self.values.get(index)
    }

    /// Decodes the cell for `column` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::MissingColumn`] when the column does not exist and
    /// [`RowError::TypeMismatch`] when the cell cannot convert into `T`.
    pub fn get<T: FromSqlValue>(&self, column: &str) -> Result<T, RowError> {
        let value =
            self.value(column).ok_or_else(|| RowError::MissingColumn(column.to_string()))?;
        T::from_sql_value(value).map_err(|mismatch| RowError::TypeMismatch {
            column: column.to_string(),
            expected: mismatch.expected,
            found: mismatch.found,
        })
    }

    /// Decodes the cell at `index` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::MissingColumn`] when the index is out of range and
    /// [`RowError::TypeMismatch`] when the cell cannot convert into `T`.
    pub fn get_index<T: FromSqlValue>(&self, index: usize) -> Result<T, RowError> {
        let value = self.values.get(index).ok_or_else(|| RowError::MissingColumn(index.to_string()))?;
        T::from_sql_value(value).map_err(|mismatch| RowError::TypeMismatch {
            column: self.columns.get(index).cloned().unwrap_or_else(|| index.to_string()),
            expected: mismatch.expected,
            found: mismatch.found,
        })
    }
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Row decoding failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    /// Requested column does not exist in the row set.
    #[error("missing column: {0}")]
    MissingColumn(String),
    /// Cell storage class does not match the requested type.
    #[error("column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Column name (or index when unnamed).
        column: String,
        /// Requested type label.
        expected: &'static str,
        /// Stored type label.
        found: &'static str,
    },
    /// Record-level validation failure raised by a [`FromRow`] impl.
    #[error("invalid row: {0}")]
    Invalid(String),
}

/// Cell-level conversion failure, without column context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueMismatch {
    /// Requested type label.
    pub expected: &'static str,
    /// Stored type label.
    pub found: &'static str,
}

impl ValueMismatch {
    /// Builds a mismatch for `value` against the `expected` label.
    #[must_use]
    pub const fn new(expected: &'static str, value: &SqlValue) -> Self {
        Self {
            expected,
            found: value.type_name(),
        }
    }
}

/// Conversion from a single cell.
pub trait FromSqlValue: Sized {
    /// Converts `value` into `Self`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueMismatch`] when the storage class is incompatible.
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch>;
}

/// Conversion from a whole row into a caller-defined record.
pub trait FromRow: Sized {
    /// Builds `Self` from `row`.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] when a column is missing or mistyped.
    fn from_row(row: &RowRef<'_>) -> Result<Self, RowError>;
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch> {
        Ok(value.clone())
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch> {
        match value {
            SqlValue::Integer(value) => Ok(*value),
            other => Err(ValueMismatch::new("integer", other)),
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch> {
        match value {
            SqlValue::Integer(wide) => {
                Self::try_from(*wide).map_err(|_| ValueMismatch::new("i32", value))
            }
            other => Err(ValueMismatch::new("integer", other)),
        }
    }
}

impl FromSqlValue for u64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch> {
        match value {
            SqlValue::Integer(wide) => {
                Self::try_from(*wide).map_err(|_| ValueMismatch::new("u64", value))
            }
            other => Err(ValueMismatch::new("integer", other)),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch> {
        match value {
            SqlValue::Integer(0) => Ok(false),
            SqlValue::Integer(1) => Ok(true),
            other => Err(ValueMismatch::new("boolean", other)),
        }
    }
}

impl FromSqlValue for f64 {
    #[allow(
        clippy::cast_precision_loss,
        reason = "SQLite numeric affinity freely mixes integer and real cells."
    )]
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch> {
        match value {
            SqlValue::Real(value) => Ok(*value),
            SqlValue::Integer(value) => Ok(*value as Self),
            other => Err(ValueMismatch::new("real", other)),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch> {
        match value {
            SqlValue::Text(text) => Ok(text.clone()),
            other => Err(ValueMismatch::new("text", other)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch> {
        match value {
            SqlValue::Blob(bytes) => Ok(bytes.clone()),
            other => Err(ValueMismatch::new("blob", other)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, ValueMismatch> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
