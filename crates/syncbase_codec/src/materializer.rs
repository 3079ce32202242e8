//! Record materialization.

use crate::error::{CodecError, CodecResult};
use crate::record::{kind_tag, EntityRecord, KIND_FIELD};
use crate::typed::classify;
use crate::value::RawValue;
use serde_json::Value;

/// Turns raw rows of one entity kind into [`EntityRecord`]s.
///
/// The materializer only knows the kind name. Column types are discovered
/// value by value through [`classify`].
#[derive(Debug, Clone)]
pub struct Materializer {
    kind_tag: String,
}

impl Materializer {
    /// Creates a materializer for `kind`.
    pub fn new(kind: &str) -> Self {
        Self {
            kind_tag: kind_tag(kind),
        }
    }

    /// Returns the tag written into every record.
    pub fn kind_tag(&self) -> &str {
        &self.kind_tag
    }

    /// Materializes one row.
    ///
    /// `NULL` values are skipped. The kind tag is written last, so it wins
    /// over a column that happens to share its name.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ColumnCountMismatch`] if `values` and `columns`
    /// differ in length.
    pub fn materialize_row(&self, columns: &[String], values: &[RawValue]) -> CodecResult<EntityRecord> {
        if columns.len() != values.len() {
            return Err(CodecError::ColumnCountMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }

        let mut record = EntityRecord::default();
        for (column, raw) in columns.iter().zip(values) {
            if let Some(typed) = classify(raw) {
                record.insert(column.clone(), typed.into_json());
            }
        }
        record.insert(KIND_FIELD, Value::String(self.kind_tag.clone()));
        Ok(record)
    }

    /// Materializes every row a cursor yields.
    ///
    /// The first cursor error (or malformed row) aborts the whole query; no
    /// partial result is returned.
    pub fn materialize_rows<I, E>(&self, columns: &[String], rows: I) -> Result<Vec<EntityRecord>, E>
    where
        I: IntoIterator<Item = Result<Vec<RawValue>, E>>,
        E: From<CodecError>,
    {
        let mut records = Vec::new();
        for row in rows {
            let values = row?;
            records.push(self.materialize_row(columns, &values)?);
        }
        Ok(records)
    }
}
