use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::{
    bulk::BulkChunk,
    config::{Config, SERVICE},
    error::RuntimeError,
    signer::{sign, SessionCredentials, SigningRequest},
};

const BULK_PATH: &str = "/_bulk";
const CONTENT_TYPE: &str = "application/json";
// only the first few item errors are logged
const LOGGED_ITEM_ERRORS: usize = 5;

/// Sends signed bulk requests to the Elasticsearch domain.
#[derive(Clone, Debug)]
pub struct DeliveryClient {
    http: reqwest::Client,
    url: String,
    host: String,
    region: String,
}

/// Raw answer to a bulk request.
#[derive(Clone, Debug, PartialEq)]
pub struct BulkOutcome {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(default)]
    status: u16,
    error: Option<Value>,
}

impl BulkItem {
    fn failed(&self) -> bool {
        self.error.is_some() || self.status >= 300
    }
}

impl DeliveryClient {
    /// Create a client for the configured domain.
    pub fn new(http: reqwest::Client, config: &Config) -> DeliveryClient {
        DeliveryClient {
            http,
            url: config.bulk_url(),
            host: config.host.clone(),
            region: config.region.clone(),
        }
    }

    /// Sign and POST one bulk body. No retry is attempted.
    #[tracing::instrument(skip_all, fields(actions = chunk.actions, bytes = chunk.body.len()))]
    pub async fn send(
        &self,
        credentials: &SessionCredentials,
        chunk: BulkChunk,
    ) -> Result<BulkOutcome, RuntimeError> {
        let request = SigningRequest {
            method: "POST",
            canonical_uri: BULK_PATH,
            canonical_query: "",
            content_type: CONTENT_TYPE,
            host: &self.host,
            region: &self.region,
            service: SERVICE,
            body: chunk.body.as_bytes(),
        };
        let headers = sign(&request, credentials, Utc::now())?;

        let mut builder = self.http.post(&self.url);
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }

        tracing::info!("sending bulk request");
        let response = builder.body(chunk.body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::info!(status, "bulk request completed");

        Ok(BulkOutcome { status, body })
    }
}

impl BulkOutcome {
    /// Fail on a non-2xx status, or when any document of the request was rejected.
    pub fn check(&self) -> Result<(), RuntimeError> {
        if !(200..300).contains(&self.status) {
            return Err(RuntimeError::BulkRejected {
                status: self.status,
                body: self.body.clone(),
            });
        }

        let response: Value = match serde_json::from_str(&self.body) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%err, "unable to read bulk response, assuming success");
                return Ok(());
            }
        };
        // items may not have the shape we expect, the flag alone decides
        if response.get("errors").and_then(Value::as_bool) != Some(true) {
            return Ok(());
        }

        let items = response
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let total = items.len();
        let mut unreadable = 0;
        let mut failures: Vec<BulkItem> = Vec::new();
        for item in items {
            match serde_json::from_value::<HashMap<String, BulkItem>>(item.clone()) {
                Ok(actions) => failures.extend(actions.into_values().filter(BulkItem::failed)),
                Err(_) => unreadable += 1,
            }
        }
        if unreadable > 0 {
            tracing::warn!(unreadable, "unable to read some bulk response items");
        }

        for item in failures.iter().take(LOGGED_ITEM_ERRORS) {
            tracing::warn!(
                id = item.id.as_deref().unwrap_or_default(),
                status = item.status,
                error = %item.error.clone().unwrap_or_default(),
                "document was not indexed"
            );
        }

        Err(RuntimeError::BulkItemFailures {
            // errors is set, at least one item failed even if we can't tell which
            failed: failures.len().max(1),
            total,
        })
    }
}
