//! Materialized entity records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the entity kind tag.
pub const KIND_FIELD: &str = "kind";
/// Primary key field.
pub const ID_FIELD: &str = "id";
/// Version counter field.
pub const VERSION_FIELD: &str = "version";
/// Server-stamped modification time field.
pub const LAST_MODIFIED_FIELD: &str = "lastModifiedDate";

/// Returns the wire tag for an entity kind: the kind with its first letter
/// upper-cased (`"trip"` becomes `"Trip"`, `"TripCity"` is unchanged).
pub fn kind_tag(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A JSON-ready entity record.
///
/// Maps column names to classified values and carries a [`KIND_FIELD`] tag.
/// Serializes as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRecord(Map<String, Value>);

impl EntityRecord {
    /// Creates an empty record tagged with `kind`.
    pub fn new(kind: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(KIND_FIELD.to_string(), Value::String(kind_tag(kind)));
        Self(fields)
    }

    /// Creates the `{id, kind}` record used to announce a deletion.
    pub fn minimal(kind: &str, id: &str) -> Self {
        let mut record = Self::new(kind);
        record.insert(ID_FIELD, Value::String(id.to_string()));
        record
    }

    /// Returns the kind tag.
    pub fn kind(&self) -> Option<&str> {
        self.0.get(KIND_FIELD).and_then(Value::as_str)
    }

    /// Returns the record id.
    ///
    /// A numeric-looking id is classified as a number when read back, so
    /// numbers are rendered to their string form here.
    pub fn id(&self) -> Option<String> {
        match self.0.get(ID_FIELD)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns the version counter.
    pub fn version(&self) -> Option<i64> {
        self.0.get(VERSION_FIELD).and_then(Value::as_i64)
    }

    /// Returns one field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns true if the field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Sets one field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Returns all fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of fields, the kind tag included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<EntityRecord> for Value {
    fn from(record: EntityRecord) -> Self {
        Value::Object(record.0)
    }
}
