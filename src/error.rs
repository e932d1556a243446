use thiserror::Error as ThisError;

/// Different errors that the application can raise
#[derive(Debug, ThisError)]
pub enum RuntimeError {
    /// Error returned when a required environment variable is absent or empty
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    /// Error returned when an optional environment variable cannot be used
    #[error("invalid value {value:?} for environment variable {name}")]
    InvalidEnv {
        /// Name of the variable
        name: &'static str,
        /// Raw value found in the environment
        value: String,
    },
    /// Error returned if the `data` field of the envelope is not valid base64
    #[error("log data is not valid base64")]
    Base64(#[from] base64::DecodeError),
    /// Error returned if the log data cannot be gunzipped
    #[error("unable to decompress log data")]
    Decompress(#[from] std::io::Error),
    /// Error returned when JSON cannot be read or written
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    /// Error returned when a log event timestamp has no calendar date
    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),
    /// Error returned by the ambient credentials provider
    #[error("unable to load credentials")]
    Credentials(#[from] aws_types::credentials::CredentialsError),
    /// Error returned if the credentials miss the key pair or the session token
    #[error("missing credentials")]
    MissingCredentials,
    /// Error returned if the HMAC key cannot be used
    #[error("invalid signing key")]
    InvalidSigningKey,
    /// Error returned when the endpoint url cannot be used
    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),
    /// Error returned by the HTTP transport
    #[error("bulk request failed")]
    Http(#[from] reqwest::Error),
    /// Error returned when Elasticsearch answers with a non-2xx status
    #[error("bulk request rejected with status {status}: {body}")]
    BulkRejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
    /// Error returned when some documents of a bulk request were not indexed
    #[error("{failed} of {total} bulk items failed")]
    BulkItemFailures {
        /// Number of items reporting an error
        failed: usize,
        /// Number of items in the response
        total: usize,
    },
}
