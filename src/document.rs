use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
    error::RuntimeError,
    event::{LogData, LogEntry},
    fields::{coerce_fields, FieldValue},
};

/// Prefix shared by every index this function writes to.
pub const INDEX_PREFIX: &str = "cwl-";

/// Source body indexed for one log event.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, FieldValue>);

impl Document {
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_owned(), FieldValue::Text(value.into()));
    }
}

/// `{"index": {...}}` line that addresses one document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexAction {
    /// Addressing metadata
    pub index: ActionMeta,
}

/// Target of an index action.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionMeta {
    /// Daily index name
    #[serde(rename = "_index")]
    pub index: String,
    /// Document type, the source log group verbatim
    #[serde(rename = "_type")]
    pub doc_type: String,
    /// Document id, the log event id
    #[serde(rename = "_id")]
    pub id: String,
}

/// Name of the daily index for a timestamp in seconds, using the UTC date.
pub fn index_name(seconds: i64) -> Result<String, RuntimeError> {
    let date = Utc
        .timestamp_opt(seconds, 0)
        .single()
        .ok_or(RuntimeError::InvalidTimestamp(seconds))?;
    Ok(format!("{INDEX_PREFIX}{}", date.format("%Y.%m.%d")))
}

/// Build the index action and the document for a single log event.
///
/// Metadata fields are written last, so they replace extracted fields
/// that use the same name.
pub fn build_document(
    entry: &LogEntry,
    batch: &LogData,
) -> Result<(IndexAction, Document), RuntimeError> {
    let seconds = entry.timestamp / 1000;

    let mut document = Document(
        entry
            .extracted_fields
            .as_ref()
            .map(coerce_fields)
            .unwrap_or_default(),
    );
    document.set("@id", &entry.id);
    document.set("@timestamp", seconds.to_string());
    document.set("@message", &entry.message);
    document.set("@owner", &batch.owner);
    document.set("@log_group", &batch.log_group);
    document.set("@log_stream", &batch.log_stream);

    let action = IndexAction {
        index: ActionMeta {
            index: index_name(seconds)?,
            doc_type: batch.log_group.clone(),
            id: entry.id.clone(),
        },
    };

    Ok((action, document))
}
