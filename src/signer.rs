//! Signature Version 4 signing for the outbound bulk request.
//!
//! The signing key is derived per request from the secret key, the date,
//! the region and the service, so the secret itself never goes on the wire.
use aws_types::{credentials::ProvideCredentials, Credentials};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::RuntimeError;

/// Name of the signing algorithm, first token of the `Authorization` header.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Terminator of every credential scope.
pub const SCOPE_TERMINATOR: &str = "aws4_request";

/// Headers covered by the signature, in canonical order.
pub const SIGNED_HEADERS: &str = "content-type;host;x-amz-date";

type HmacSha256 = Hmac<Sha256>;

/// Temporary credentials of the function's role.
#[derive(Clone, PartialEq)]
pub struct SessionCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key, only used to derive the signing key
    pub secret_access_key: String,
    /// Session token sent as `X-Amz-Security-Token`
    pub session_token: String,
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .finish()
    }
}

impl SessionCredentials {
    /// Load the current credentials from a provider.
    #[tracing::instrument(skip(provider))]
    pub async fn resolve(provider: &impl ProvideCredentials) -> Result<Self, RuntimeError> {
        let credentials = provider.provide_credentials().await?;
        SessionCredentials::try_from(&credentials)
    }
}

impl TryFrom<&Credentials> for SessionCredentials {
    type Error = RuntimeError;

    /// Every component is required, an anonymous or long-lived key pair is refused.
    fn try_from(value: &Credentials) -> Result<Self, Self::Error> {
        let session_token = match value.session_token() {
            Some(token) if !token.is_empty() => token,
            _ => return Err(RuntimeError::MissingCredentials),
        };
        if value.access_key_id().is_empty() || value.secret_access_key().is_empty() {
            return Err(RuntimeError::MissingCredentials);
        }

        Ok(SessionCredentials {
            access_key_id: value.access_key_id().to_owned(),
            secret_access_key: value.secret_access_key().to_owned(),
            session_token: session_token.to_owned(),
        })
    }
}

/// What gets signed.
#[derive(Clone, Debug)]
pub struct SigningRequest<'a> {
    /// HTTP method
    pub method: &'a str,
    /// Absolute path
    pub canonical_uri: &'a str,
    /// Encoded query string, empty when there is none
    pub canonical_query: &'a str,
    /// `Content-Type` header value
    pub content_type: &'a str,
    /// `Host` header value
    pub host: &'a str,
    /// Region of the target domain
    pub region: &'a str,
    /// Service name, `es` for Elasticsearch
    pub service: &'a str,
    /// Request body
    pub body: &'a [u8],
}

/// Headers to attach to the request.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedHeaders {
    /// `Content-Type`
    pub content_type: String,
    /// `Host`
    pub host: String,
    /// `X-Amz-Date`
    pub amz_date: String,
    /// `X-Amz-Security-Token`
    pub security_token: String,
    /// `Authorization`
    pub authorization: String,
}

impl SignedHeaders {
    /// Header names and values, ready for an HTTP client.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Content-Type", self.content_type.as_str()),
            ("Host", self.host.as_str()),
            ("X-Amz-Date", self.amz_date.as_str()),
            ("X-Amz-Security-Token", self.security_token.as_str()),
            ("Authorization", self.authorization.as_str()),
        ]
        .into_iter()
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, RuntimeError> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| RuntimeError::InvalidSigningKey)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the key scoped to a date, a region and a service.
pub fn signing_key(
    secret_access_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, RuntimeError> {
    let k_date = hmac_sha256(
        format!("AWS4{secret_access_key}").as_bytes(),
        date_stamp.as_bytes(),
    )?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

/// Canonical form of the request, the headers block ends with its own newline.
pub fn canonical_request(request: &SigningRequest<'_>, amz_date: &str) -> String {
    let canonical_headers = format!(
        "content-type:{}\nhost:{}\nx-amz-date:{}\n",
        request.content_type, request.host, amz_date
    );
    let payload_hash = sha256_hex(request.body);
    let lines: [&str; 6] = [
        request.method,
        request.canonical_uri,
        request.canonical_query,
        &canonical_headers,
        SIGNED_HEADERS,
        &payload_hash,
    ];
    lines.join("\n")
}

/// `date/region/service/aws4_request`
pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{date_stamp}/{region}/{service}/{SCOPE_TERMINATOR}")
}

/// String that gets HMACed with the signing key.
pub fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    let request_hash = sha256_hex(canonical_request.as_bytes());
    let lines: [&str; 4] = [ALGORITHM, amz_date, scope, &request_hash];
    lines.join("\n")
}

/// Sign a request at the given instant.
pub fn sign(
    request: &SigningRequest<'_>,
    credentials: &SessionCredentials,
    now: DateTime<Utc>,
) -> Result<SignedHeaders, RuntimeError> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();

    let canonical = canonical_request(request, &amz_date);
    let scope = credential_scope(&date_stamp, request.region, request.service);
    let to_sign = string_to_sign(&amz_date, &scope, &canonical);

    let key = signing_key(
        &credentials.secret_access_key,
        &date_stamp,
        request.region,
        request.service,
    )?;
    let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes())?);

    let authorization = format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
        credentials.access_key_id
    );

    Ok(SignedHeaders {
        content_type: request.content_type.to_owned(),
        host: request.host.to_owned(),
        amz_date,
        security_token: credentials.session_token.clone(),
        authorization,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::*;
    use chrono::TimeZone;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn request(body: &[u8]) -> SigningRequest<'_> {
        SigningRequest {
            method: "POST",
            canonical_uri: "/_bulk",
            canonical_query: "",
            content_type: "application/json",
            host: "search-logs.us-east-1.es.amazonaws.com",
            region: "us-east-1",
            service: "es",
            body,
        }
    }

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 12, 16, 22, 40, 0).unwrap()
    }

    #[test]
    fn test_signing_key_matches_published_example() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d",
            hex::encode(key)
        );
    }

    #[test]
    fn test_canonical_request() {
        let canonical = canonical_request(&request(b""), "20181216T224000Z");
        assert_eq!(
            format!(
                "POST\n/_bulk\n\ncontent-type:application/json\nhost:search-logs.us-east-1.es.amazonaws.com\nx-amz-date:20181216T224000Z\n\ncontent-type;host;x-amz-date\n{EMPTY_SHA256}"
            ),
            canonical
        );
    }

    #[test]
    fn test_credential_scope() {
        assert_eq!(
            "20181216/cn-north-1/es/aws4_request",
            credential_scope("20181216", "cn-north-1", "es")
        );
    }

    #[test]
    fn test_string_to_sign() {
        let to_sign = string_to_sign("20181216T224000Z", "20181216/us-east-1/es/aws4_request", "");
        assert_eq!(
            format!(
                "AWS4-HMAC-SHA256\n20181216T224000Z\n20181216/us-east-1/es/aws4_request\n{EMPTY_SHA256}"
            ),
            to_sign
        );
    }

    #[test]
    fn test_sign_headers() {
        let headers = sign(&request(b"{}\n"), &session_credentials(), instant()).unwrap();

        assert_eq!("application/json", headers.content_type);
        assert_eq!("search-logs.us-east-1.es.amazonaws.com", headers.host);
        assert_eq!("20181216T224000Z", headers.amz_date);
        assert_eq!("session-token", headers.security_token);

        let prefix = "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20181216/us-east-1/es/aws4_request, SignedHeaders=content-type;host;x-amz-date, Signature=";
        assert!(headers.authorization.starts_with(prefix));
        let signature = &headers.authorization[prefix.len()..];
        assert_eq!(64, signature.len());
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_sign_matches_published_example() {
        // IAM ListUsers example from the AWS Signature Version 4 documentation
        let request = SigningRequest {
            method: "GET",
            canonical_uri: "/",
            canonical_query: "Action=ListUsers&Version=2010-05-08",
            content_type: "application/x-www-form-urlencoded; charset=utf-8",
            host: "iam.amazonaws.com",
            region: "us-east-1",
            service: "iam",
            body: b"",
        };
        let credentials = SessionCredentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            session_token: "session-token".into(),
        };
        let now = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();

        assert_eq!(
            "f536975d06c0309214f805bb90ccff089219ecd68b2577efef23edd43b7e1a59",
            sha256_hex(canonical_request(&request, "20150830T123600Z").as_bytes())
        );

        let headers = sign(&request, &credentials, now).unwrap();
        assert_eq!("20150830T123600Z", headers.amz_date);
        assert_eq!(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, \
             Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7",
            headers.authorization
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let first = sign(&request(b"body"), &session_credentials(), instant()).unwrap();
        let second = sign(&request(b"body"), &session_credentials(), instant()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_signature_depends_on_every_input() {
        let base = sign(&request(b"body"), &session_credentials(), instant()).unwrap();

        let body = sign(&request(b"bodz"), &session_credentials(), instant()).unwrap();
        assert_ne!(base.authorization, body.authorization);

        let later = instant() + chrono::Duration::seconds(1);
        let time = sign(&request(b"body"), &session_credentials(), later).unwrap();
        assert_ne!(base.authorization, time.authorization);

        let mut other = request(b"body");
        other.region = "eu-west-1";
        let region = sign(&other, &session_credentials(), instant()).unwrap();
        assert_ne!(base.authorization, region.authorization);

        let mut credentials = session_credentials();
        credentials.secret_access_key = "other-secret".into();
        let secret = sign(&request(b"body"), &credentials, instant()).unwrap();
        assert_ne!(base.authorization, secret.authorization);
    }

    #[test]
    fn test_date_and_scope_share_one_instant() {
        let midnight = Utc.with_ymd_and_hms(2018, 12, 31, 23, 59, 59).unwrap();
        let headers = sign(&request(b""), &session_credentials(), midnight).unwrap();
        assert_eq!("20181231T235959Z", headers.amz_date);
        assert!(headers
            .authorization
            .contains("Credential=AKIDEXAMPLE/20181231/us-east-1/es/aws4_request"));
    }

    #[test]
    fn test_headers_iter() {
        let headers = sign(&request(b""), &session_credentials(), instant()).unwrap();
        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(
            vec![
                "Content-Type",
                "Host",
                "X-Amz-Date",
                "X-Amz-Security-Token",
                "Authorization"
            ],
            names
        );
    }

    #[test]
    fn test_credentials_require_session_token() {
        let credentials = Credentials::new("AKIDEXAMPLE", "secret-key", None, None, "test");
        assert!(matches!(
            SessionCredentials::try_from(&credentials),
            Err(RuntimeError::MissingCredentials)
        ));

        let credentials = Credentials::new("", "secret-key", Some("t".into()), None, "test");
        assert!(matches!(
            SessionCredentials::try_from(&credentials),
            Err(RuntimeError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_resolve_credentials() -> Result<(), RuntimeError> {
        let credentials = SessionCredentials::resolve(&mock_credentials()).await?;
        assert_eq!(session_credentials(), credentials);
        assert!(!format!("{credentials:?}").contains("secret-key"));
        Ok(())
    }
}
