use reqwest::Url;

use crate::{
    bulk::{BulkLimits, DEFAULT_MAX_ACTIONS, DEFAULT_MAX_BYTES},
    error::RuntimeError,
};

/// AWS region of the Elasticsearch domain, e.g. `cn-north-1`
pub const ENV_REGION: &str = "region";
/// Base URL of the region, e.g. `amazonaws.com.cn`
pub const ENV_BASE_URL: &str = "baseUrl";
/// Name of the Elasticsearch domain
pub const ENV_ES_DOMAIN: &str = "esDomain";
/// Optional full endpoint url, replaces the one derived from the values above
pub const ENV_ES_ENDPOINT: &str = "esEndpoint";
/// Optional maximum number of documents per bulk request
pub const ENV_MAX_BULK_ACTIONS: &str = "maxBulkActions";
/// Optional maximum size of a bulk request body
pub const ENV_MAX_BULK_BYTES: &str = "maxBulkBytes";

/// Service name used in the endpoint and the credential scope.
pub const SERVICE: &str = "es";

/// Settings resolved at the start of every invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Region used to scope the signature
    pub region: String,
    /// Scheme and authority of the domain, without trailing slash
    pub endpoint: String,
    /// Value of the signed `Host` header
    pub host: String,
    /// Bounds of each bulk request
    pub limits: BulkLimits,
}

impl Config {
    /// Read the configuration through a lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, RuntimeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(RuntimeError::MissingEnv(name))
        };

        let region = required(ENV_REGION)?;
        let base_url = required(ENV_BASE_URL)?;
        let es_domain = required(ENV_ES_DOMAIN)?;

        let (endpoint, host) = match lookup(ENV_ES_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            Some(url) => parse_endpoint(&url)?,
            None => {
                let host = format!("{es_domain}.{region}.{SERVICE}.{base_url}");
                (format!("https://{host}"), host)
            }
        };

        let limits = BulkLimits {
            max_actions: limit(&lookup, ENV_MAX_BULK_ACTIONS, DEFAULT_MAX_ACTIONS)?,
            max_bytes: limit(&lookup, ENV_MAX_BULK_BYTES, DEFAULT_MAX_BYTES)?,
        };

        Ok(Config {
            region,
            endpoint,
            host,
            limits,
        })
    }

    /// Url of the bulk API.
    pub fn bulk_url(&self) -> String {
        format!("{}/_bulk", self.endpoint)
    }
}

fn limit<F>(lookup: &F, name: &'static str, default: usize) -> Result<usize, RuntimeError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(RuntimeError::InvalidEnv { name, value }),
        },
    }
}

/// Split an endpoint url into its base and the authority sent as `Host`.
fn parse_endpoint(raw: &str) -> Result<(String, String), RuntimeError> {
    let url = Url::parse(raw.trim()).map_err(|_| RuntimeError::InvalidEndpoint(raw.into()))?;
    let host = match url.host_str() {
        Some(host) if url.scheme() == "https" || url.scheme() == "http" => host,
        _ => return Err(RuntimeError::InvalidEndpoint(raw.into())),
    };
    // port() is None when it's the scheme default
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    Ok((format!("{}://{authority}", url.scheme()), authority))
}
