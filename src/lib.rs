#![deny(missing_docs)]
//! <fullname>CloudWatch logs to Elasticsearch shipper</fullname>
//!
//! Lambda function subscribed to a CloudWatch Logs group. It unzips
//! every batch it receives, turns each log event into a document in
//! a daily `cwl-YYYY.MM.DD` index, and writes them to an Elasticsearch
//! domain with signed `_bulk` requests.
use aws_types::credentials::ProvideCredentials;
use lambda_runtime::LambdaEvent;
use serde::Serialize;

mod bulk;
use bulk::BulkEncoder;

mod config;
use config::Config;

mod delivery;
use delivery::DeliveryClient;

mod document;
use document::build_document;

mod error;
pub use error::RuntimeError;

mod event;
pub use event::{LogsEvent, MessageType};

mod fields;

mod signer;
use signer::SessionCredentials;

#[cfg(test)]
mod test_util;

/// Outcome reported to the caller of the function
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Every document was delivered
    Success,
    /// Control message, nothing to index
    Skip,
    /// The function is not configured, nothing was attempted
    Failed,
}

/// `handle_logs` is the Lambda function entry point
/// that receives the events from CloudWatch Logs
#[tracing::instrument(skip_all, fields(request_id = %event.context.request_id))]
pub async fn handle_logs(
    credentials: &impl ProvideCredentials,
    http: &reqwest::Client,
    event: LambdaEvent<LogsEvent>,
) -> Result<Status, RuntimeError> {
    process(|key| std::env::var(key).ok(), credentials, http, &event.payload).await
}

/// Process one subscription event.
///
/// Configuration is read first and a missing value ends the invocation
/// with [`Status::Failed`]. Decoding, credential and delivery errors are
/// returned so the trigger can redeliver the batch.
#[tracing::instrument(skip_all)]
pub async fn process<F>(
    lookup: F,
    credentials: &impl ProvideCredentials,
    http: &reqwest::Client,
    event: &LogsEvent,
) -> Result<Status, RuntimeError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match Config::from_lookup(lookup) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "function is not configured");
            return Ok(Status::Failed);
        }
    };
    tracing::info!(region = %config.region, host = %config.host, "using configuration");

    let data = event.aws_logs.decode()?;
    if data.message_type == MessageType::ControlMessage {
        tracing::info!("control message, skipping");
        return Ok(Status::Skip);
    }
    tracing::info!(
        log_group = %data.log_group,
        events = data.log_events.len(),
        "processing log events"
    );

    let mut encoder = BulkEncoder::new(config.limits);
    for entry in &data.log_events {
        let (action, document) = build_document(entry, &data)?;
        encoder.push(&action, &document)?;
    }
    let actions = encoder.actions();
    let chunks = encoder.finish();
    tracing::info!(actions, chunks = chunks.len(), "bulk payload encoded");
    if chunks.is_empty() {
        tracing::info!("no log events to index");
        return Ok(Status::Success);
    }

    let credentials = SessionCredentials::resolve(credentials).await?;
    let client = DeliveryClient::new(http.clone(), &config);
    for chunk in chunks {
        client.send(&credentials, chunk).await?.check()?;
    }

    Ok(Status::Success)
}
