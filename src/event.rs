use serde::Deserialize;
use std::{collections::BTreeMap, io::BufReader};

use crate::error::RuntimeError;

/// `LogsEvent` represents the raw event sent by CloudWatch
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct LogsEvent {
    /// Subscription payload, still compressed
    #[serde(rename = "awslogs")]
    pub aws_logs: AwsLogs,
}

/// `AwsLogs` holds the gzipped and base64 encoded log batch.
///
/// The data is kept encoded until the handler asks for it, so a
/// misconfigured function never spends time decompressing.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct AwsLogs {
    /// Base64 encoded gzip stream with a JSON [`LogData`] inside
    pub data: String,
}

impl AwsLogs {
    /// Decode, gunzip and parse the log batch.
    #[tracing::instrument(skip(self), fields(encoded_len = self.data.len()))]
    pub fn decode(&self) -> Result<LogData, RuntimeError> {
        let bytes = base64::decode(self.data.trim())?;
        let reader = BufReader::new(flate2::read::GzDecoder::new(&bytes[..]));
        let mut de = serde_json::Deserializer::from_reader(reader);
        let data = LogData::deserialize(&mut de).map_err(|err| {
            // serde_json wraps reader failures, surface them as gzip errors
            if err.is_io() {
                RuntimeError::Decompress(err.into())
            } else {
                RuntimeError::Json(err)
            }
        })?;
        de.end()?;
        Ok(data)
    }
}

/// Kind of record CloudWatch delivered
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Batch of log events
    #[default]
    DataMessage,
    /// Reachability check with nothing to index
    ControlMessage,
}

/// `LogData` represents the logs group event information
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogData {
    /// Account that owns the log group
    pub owner: String,
    /// Source log group
    pub log_group: String,
    /// Source log stream
    pub log_stream: String,
    /// Subscription filters that matched the events
    #[serde(default)]
    pub subscription_filters: Vec<String>,
    /// Data or control message
    #[serde(default)]
    pub message_type: MessageType,
    /// Events in delivery order
    pub log_events: Vec<LogEntry>,
}

/// `LogEntry` represents a log entry from cloudwatch logs
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique event id
    pub id: String,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    /// Raw log line
    pub message: String,
    /// Fields produced by a subscription filter pattern
    #[serde(default)]
    pub extracted_fields: Option<BTreeMap<String, String>>,
}
