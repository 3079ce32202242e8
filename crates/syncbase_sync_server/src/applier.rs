//! Mutation application with version-based conflict resolution.

use crate::config::{KindSchema, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::snapshot::read_records;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use syncbase_codec::{
    encode_field_value, kind_tag, EntityRecord, RawValue, ID_FIELD, KIND_FIELD,
    LAST_MODIFIED_FIELD, VERSION_FIELD,
};
use syncbase_storage::{ColumnType, RowFilter, TableStore};
use syncbase_sync_protocol::{
    ChangeEnvelope, ChangeNotification, ChangeResponse, ChangeType, DeleteAck, FieldChange,
};
use tracing::{debug, warn};

/// Result of applying one change.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    /// Body returned to the submitter.
    pub response: ChangeResponse,
    /// Notification to fan out, if anything changed.
    pub notification: Option<ChangeNotification>,
}

impl MutationOutcome {
    fn changed(change_type: ChangeType, kind: &KindSchema, id: &str, record: EntityRecord) -> Self {
        let response = match change_type {
            ChangeType::Delete => ChangeResponse::Deleted(DeleteAck { id: id.to_string() }),
            _ => ChangeResponse::Record(record.clone()),
        };
        let notification = ChangeNotification::new(change_type, kind_tag(&kind.kind), id, record);
        Self {
            response,
            notification: Some(notification),
        }
    }
}

/// Applies client changes to the store.
///
/// # Conflict resolution
///
/// Updates are last-writer-wins on a version counter. The stored version
/// becomes `max(server, client) + 1` and the client's field values are
/// always applied, even when the server is ahead.
///
/// The version read and the write are separate statements; two racing
/// updates can both read the same server version.
pub struct MutationApplier<'a> {
    store: &'a dyn TableStore,
    config: &'a ServerConfig,
}

impl<'a> MutationApplier<'a> {
    /// Creates an applier.
    pub fn new(store: &'a dyn TableStore, config: &'a ServerConfig) -> Self {
        Self { store, config }
    }

    /// Validates and applies one change.
    ///
    /// # Errors
    ///
    /// - [`ServerError::MalformedRequest`] for an unknown change type or a
    ///   missing field; nothing is written
    /// - [`ServerError::UnknownKind`] for a kind the server does not serve
    /// - [`ServerError::RecordNotFound`] when an update target is missing
    /// - [`ServerError::Store`] for any store failure; a delete that logged
    ///   its tombstone but failed to remove the row is not rolled back
    pub fn apply(&self, envelope: &ChangeEnvelope) -> ServerResult<MutationOutcome> {
        let change_type = envelope.change_type()?;
        let kind = self
            .config
            .kind(&envelope.kind)
            .ok_or_else(|| ServerError::UnknownKind(envelope.kind.clone()))?;

        let outcome = match change_type {
            ChangeType::Create => self.create(kind, envelope)?,
            ChangeType::Update => self.update(kind, envelope)?,
            ChangeType::Delete => self.delete(kind, envelope)?,
        };
        debug!(
            change_id = envelope.id.as_deref().unwrap_or("-"),
            %change_type,
            kind = %kind.kind,
            record_id = envelope.record_id.as_deref().unwrap_or("-"),
            broadcast = outcome.notification.is_some(),
            "applied change"
        );
        Ok(outcome)
    }

    fn create(&self, kind: &KindSchema, envelope: &ChangeEnvelope) -> ServerResult<MutationOutcome> {
        let model = envelope
            .full_model
            .as_ref()
            .ok_or_else(|| ServerError::malformed("create requires fullModel"))?;
        let id = create_id(model, envelope.record_id.as_deref())?;
        if let Some(version) = model.get(VERSION_FIELD).filter(|v| !v.is_null()) {
            if version_number(version)? < 1 {
                return Err(ServerError::malformed(format!("version {version} is below 1")));
            }
        }

        let mut values = vec![(ID_FIELD.to_string(), RawValue::Text(id.clone()))];
        for (field, value) in model {
            if matches!(field.as_str(), ID_FIELD | KIND_FIELD | LAST_MODIFIED_FIELD) {
                continue;
            }
            values.push((field.clone(), encode_field_value(value)?));
        }

        self.ensure_columns(kind, model)?;
        self.store.insert(&kind.table(), values)?;
        let record = self.reread(kind, &id)?;
        Ok(MutationOutcome::changed(ChangeType::Create, kind, &id, record))
    }

    fn update(&self, kind: &KindSchema, envelope: &ChangeEnvelope) -> ServerResult<MutationOutcome> {
        let id = required_record_id(envelope)?;
        let changes = envelope
            .field_changes
            .as_ref()
            .ok_or_else(|| ServerError::malformed("update requires fieldChanges"))?;
        let incoming = incoming_version(changes)?;

        let server = self.server_version(kind, id)?;
        let version = server
            .max(incoming)
            .checked_add(1)
            .ok_or_else(|| ServerError::malformed("version overflow"))?;

        let mut assignments = Vec::with_capacity(changes.len());
        for (field, change) in changes {
            match field.as_str() {
                VERSION_FIELD | KIND_FIELD | LAST_MODIFIED_FIELD => continue,
                ID_FIELD => {
                    if id_text(&change.updated).as_deref() != Some(id) {
                        return Err(ServerError::malformed("id cannot be changed"));
                    }
                    continue;
                }
                _ => {}
            }
            assignments.push((field.clone(), encode_field_value(&change.updated)?));
        }
        assignments.push((VERSION_FIELD.to_string(), RawValue::Integer(version)));

        self.ensure_columns(kind, changes.iter().map(|(field, change)| (field, &change.updated)))?;
        if self.store.update(&kind.table(), id, assignments)? == 0 {
            return Err(not_found(kind, id));
        }
        debug!(kind = %kind.kind, id, server, incoming, version, "resolved version");

        let record = self.reread(kind, id)?;
        Ok(MutationOutcome::changed(ChangeType::Update, kind, id, record))
    }

    fn delete(&self, kind: &KindSchema, envelope: &ChangeEnvelope) -> ServerResult<MutationOutcome> {
        let id = required_record_id(envelope)?;
        let table = kind.table();

        if self.store.count(&table, id)? == 0 {
            return Ok(MutationOutcome {
                response: ChangeResponse::Deleted(DeleteAck { id: id.to_string() }),
                notification: None,
            });
        }

        self.store.insert_tombstone(id, &kind_tag(&kind.kind))?;
        if let Err(e) = self.store.delete(&table, id) {
            warn!(kind = %kind.kind, id, error = %e, "tombstone written but row delete failed");
            return Err(e.into());
        }

        let record = EntityRecord::minimal(&kind.kind, id);
        Ok(MutationOutcome::changed(ChangeType::Delete, kind, id, record))
    }

    /// Adds a column for every field the kind does not declare. Lists and
    /// objects get a JSON column; anything else a text column, which reads
    /// back through the usual number and boolean classification. Existing
    /// columns keep their type.
    fn ensure_columns<'f>(
        &self,
        kind: &KindSchema,
        fields: impl IntoIterator<Item = (&'f String, &'f Value)>,
    ) -> ServerResult<()> {
        let undeclared: Vec<(&String, ColumnType)> = fields
            .into_iter()
            .filter(|(field, _)| !is_sync_field(field) && !kind.columns.contains_key(field.as_str()))
            .map(|(field, value)| (field, inferred_column_type(value)))
            .collect();
        if undeclared.is_empty() {
            return Ok(());
        }
        let schema = undeclared
            .into_iter()
            .fold(kind.table_schema(), |schema, (field, ty)| schema.column(field.clone(), ty));
        self.store.ensure_table(schema)?;
        Ok(())
    }

    fn server_version(&self, kind: &KindSchema, id: &str) -> ServerResult<i64> {
        let mut rows = self.store.scan(&kind.table(), &RowFilter::IdEquals(id.to_string()))?;
        let version_idx = rows.columns().iter().position(|c| c == VERSION_FIELD);
        let row = rows.next().transpose()?.ok_or_else(|| not_found(kind, id))?;
        Ok(version_idx
            .and_then(|idx| row.get(idx))
            .and_then(RawValue::as_integer)
            .unwrap_or(0))
    }

    fn reread(&self, kind: &KindSchema, id: &str) -> ServerResult<EntityRecord> {
        read_records(self.store, kind, &RowFilter::IdEquals(id.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(kind, id))
    }
}

fn not_found(kind: &KindSchema, id: &str) -> ServerError {
    ServerError::RecordNotFound {
        kind: kind.kind.clone(),
        id: id.to_string(),
    }
}

fn required_record_id(envelope: &ChangeEnvelope) -> ServerResult<&str> {
    envelope
        .record_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServerError::malformed("recordId is required"))
}

fn is_sync_field(field: &str) -> bool {
    matches!(field, ID_FIELD | VERSION_FIELD | LAST_MODIFIED_FIELD | KIND_FIELD)
}

fn inferred_column_type(value: &Value) -> ColumnType {
    match value {
        Value::Array(_) | Value::Object(_) => ColumnType::Json,
        _ => ColumnType::Text,
    }
}

/// Renders an id field the way it is stored. Numeric ids become their
/// decimal text.
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The id of a new record: the model's `id`, else the envelope's `recordId`.
fn create_id(model: &Map<String, Value>, record_id: Option<&str>) -> ServerResult<String> {
    let model_id = match model.get(ID_FIELD) {
        None | Some(Value::Null) => None,
        Some(value) => Some(id_text(value).ok_or_else(|| ServerError::malformed("id must be a string"))?),
    };
    let record_id = record_id.filter(|id| !id.is_empty());

    match (model_id, record_id) {
        (Some(m), Some(r)) if m != r => Err(ServerError::malformed(format!(
            "fullModel id {m:?} does not match recordId {r:?}"
        ))),
        (Some(id), _) => Ok(id),
        (None, Some(r)) => Ok(r.to_string()),
        (None, None) => Err(ServerError::malformed("create requires an id")),
    }
}

/// The client's last-seen version from the `version` field change.
fn incoming_version(changes: &BTreeMap<String, FieldChange>) -> ServerResult<i64> {
    let change = changes
        .get(VERSION_FIELD)
        .ok_or_else(|| ServerError::malformed("update requires a version field change"))?;
    version_number(&change.updated)
}

/// Reads a version: an integer, or a float with no fractional part.
fn version_number(value: &Value) -> ServerResult<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| f as i64))
            .ok_or_else(|| ServerError::malformed(format!("version {n} is not an integer"))),
        other => Err(ServerError::malformed(format!("version {other} is not an integer"))),
    }
}
