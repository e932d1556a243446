use aws_types::Credentials;
use flate2::{write::GzEncoder, Compression};
use std::{collections::HashMap, io::Write};

use crate::signer::SessionCredentials;

/// Static role credentials for signing tests
pub fn mock_credentials() -> Credentials {
    Credentials::new(
        "AKIDEXAMPLE",
        "secret-key",
        Some("session-token".into()),
        None,
        "dummy",
    )
}

/// Same values as `mock_credentials`, already resolved
pub fn session_credentials() -> SessionCredentials {
    SessionCredentials {
        access_key_id: "AKIDEXAMPLE".into(),
        secret_access_key: "secret-key".into(),
        session_token: "session-token".into(),
    }
}

/// Environment lookup backed by a fixed list of variables
pub fn env_lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

/// Gzip and base64 encode a log batch the way CloudWatch delivers it
pub fn encode_log_data(json: &str) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes()).unwrap();
    base64::encode(encoder.finish().unwrap())
}
