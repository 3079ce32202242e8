//! Table schemas and column typing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syncbase_codec::{RawValue, ID_FIELD, LAST_MODIFIED_FIELD, VERSION_FIELD};

/// Name of the shared deletion log table.
pub const TOMBSTONE_TABLE: &str = "tombstone";

/// Returns the table backing an entity kind (`"TripCity"` -> `"tripcity"`).
pub fn table_name(kind: &str) -> String {
    kind.to_lowercase()
}

/// Declared type of a column.
///
/// Writes are coerced to this type. Reads return the stored representation:
/// `Json` columns come back as bytes, the rest as their native variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// UTF-8 text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// Double-precision float.
    Float,
    /// Boolean.
    Boolean,
    /// UTC timestamp.
    Timestamp,
    /// JSON document, stored as bytes.
    Json,
}

impl ColumnType {
    /// Name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
        }
    }

    /// Coerces a value for storage in a column of this type.
    ///
    /// `NULL` is accepted by every type. Returns `None` if the value cannot
    /// be represented.
    pub fn coerce(self, value: RawValue) -> Option<RawValue> {
        if value.is_null() {
            return Some(RawValue::Null);
        }
        match self {
            ColumnType::Text => match value {
                RawValue::Text(s) => Some(RawValue::Text(s)),
                RawValue::Integer(i) => Some(RawValue::Text(i.to_string())),
                RawValue::Float(f) => Some(RawValue::Text(f.to_string())),
                RawValue::Bool(b) => Some(RawValue::Text(b.to_string())),
                RawValue::Timestamp(t) => Some(RawValue::Text(t.to_rfc3339())),
                RawValue::Bytes(b) => String::from_utf8(b).ok().map(RawValue::Text),
                RawValue::Null => Some(RawValue::Null),
            },
            ColumnType::Integer => match value {
                RawValue::Integer(i) => Some(RawValue::Integer(i)),
                RawValue::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                    Some(RawValue::Integer(f as i64))
                }
                RawValue::Text(s) => s.trim().parse().ok().map(RawValue::Integer),
                _ => None,
            },
            ColumnType::Float => match value {
                RawValue::Float(f) => Some(RawValue::Float(f)),
                RawValue::Integer(i) => Some(RawValue::Float(i as f64)),
                RawValue::Text(s) => s.trim().parse().ok().map(RawValue::Float),
                _ => None,
            },
            ColumnType::Boolean => match value {
                RawValue::Bool(b) => Some(RawValue::Bool(b)),
                RawValue::Text(s) => match s.as_str() {
                    "true" | "t" => Some(RawValue::Bool(true)),
                    "false" | "f" => Some(RawValue::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            ColumnType::Timestamp => match value {
                RawValue::Timestamp(t) => Some(RawValue::Timestamp(t)),
                RawValue::Text(s) => DateTime::parse_from_rfc3339(&s)
                    .ok()
                    .map(|t| RawValue::Timestamp(t.with_timezone(&Utc))),
                _ => None,
            },
            ColumnType::Json => match value {
                RawValue::Bytes(b) => Some(RawValue::Bytes(b)),
                RawValue::Text(s) => serde_json::from_str::<serde::de::IgnoredAny>(&s)
                    .ok()
                    .map(|_| RawValue::Bytes(s.into_bytes())),
                RawValue::Integer(i) => Some(RawValue::Bytes(i.to_string().into_bytes())),
                RawValue::Bool(b) => Some(RawValue::Bytes(b.to_string().into_bytes())),
                _ => None,
            },
        }
    }
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub ty: ColumnType,
    /// Value used when an insert omits the column.
    pub default: RawValue,
}

/// Schema of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Creates the schema for an entity kind's table.
    ///
    /// Every entity table starts with `id` (text primary key), `version`
    /// (integer, default 1) and `lastModifiedDate` (timestamp).
    pub fn entity(kind: &str) -> Self {
        Self {
            name: table_name(kind),
            columns: vec![
                Column {
                    name: ID_FIELD.to_string(),
                    ty: ColumnType::Text,
                    default: RawValue::Null,
                },
                Column {
                    name: VERSION_FIELD.to_string(),
                    ty: ColumnType::Integer,
                    default: RawValue::Integer(1),
                },
                Column {
                    name: LAST_MODIFIED_FIELD.to_string(),
                    ty: ColumnType::Timestamp,
                    default: RawValue::Null,
                },
            ],
        }
    }

    /// Adds a nullable column.
    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            ty,
            default: RawValue::Null,
        });
        self
    }

    /// Adds a text column.
    pub fn text(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnType::Text)
    }

    /// Adds a JSON column.
    pub fn json(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnType::Json)
    }

    /// Returns the position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
