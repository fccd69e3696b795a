//! Credentials and marketplace endpoint for a client.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::{MwsError, Result};

pub const ENV_ENDPOINT: &str = "MWS_ENDPOINT";
pub const ENV_AWS_ACCESS_KEY_ID: &str = "MWS_AWS_ACCESS_KEY_ID";
pub const ENV_AUTH_TOKEN: &str = "MWS_AUTH_TOKEN";
pub const ENV_SELLER_ID: &str = "MWS_SELLER_ID";
pub const ENV_SECRET_KEY: &str = "MWS_SECRET_KEY";

/// Immutable per-client configuration.
///
/// The endpoint is the marketplace web service root, e.g.
/// `https://mws.amazonservices.com`.
pub struct MwsOptions {
    endpoint: Url,
    pub aws_access_key_id: String,
    pub mws_auth_token: String,
    pub seller_id: String,
    secret_key: SecretString,
}

impl MwsOptions {
    pub fn new(
        endpoint: &str,
        aws_access_key_id: impl Into<String>,
        mws_auth_token: impl Into<String>,
        seller_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            aws_access_key_id: aws_access_key_id.into(),
            mws_auth_token: mws_auth_token.into(),
            seller_id: seller_id.into(),
            secret_key: SecretString::from(secret_key.into()),
        })
    }

    /// Read every setting from `MWS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).ok_or_else(|| MwsError::Configuration(format!("{name} is not set")));
        Self::new(
            &get(ENV_ENDPOINT)?,
            get(ENV_AWS_ACCESS_KEY_ID)?,
            get(ENV_AUTH_TOKEN)?,
            get(ENV_SELLER_ID)?,
            get(ENV_SECRET_KEY)?,
        )
    }

    /// Endpoint root without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str().trim_end_matches('/')
    }

    /// Host as it appears in the string to sign: no scheme, port only when
    /// it is not the scheme's default.
    pub fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    pub(crate) fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl fmt::Debug for MwsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MwsOptions")
            .field("endpoint", &self.endpoint())
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("mws_auth_token", &self.mws_auth_token)
            .field("seller_id", &self.seller_id)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint).map_err(|e| MwsError::Configuration(format!("invalid endpoint {endpoint:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(MwsError::Configuration(format!(
            "endpoint {endpoint:?} must use http or https"
        )));
    }
    if url.host_str().is_none() {
        return Err(MwsError::Configuration(format!("endpoint {endpoint:?} has no host")));
    }
    if url.path() != "/" || url.query().is_some() {
        return Err(MwsError::Configuration(format!(
            "endpoint {endpoint:?} must not carry a path or query"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn options(endpoint: &str) -> Result<MwsOptions> {
        MwsOptions::new(endpoint, "AKIA", "token", "SELLER", "secret")
    }

    #[test]
    fn host_strips_scheme_and_trailing_slash() {
        let opts = options("https://mws.amazonservices.com/").unwrap();
        assert_eq!(opts.host(), "mws.amazonservices.com");
        assert_eq!(opts.endpoint(), "https://mws.amazonservices.com");
    }

    #[test]
    fn host_keeps_explicit_port() {
        let opts = options("http://127.0.0.1:8080").unwrap();
        assert_eq!(opts.host(), "127.0.0.1:8080");
        assert_eq!(opts.endpoint(), "http://127.0.0.1:8080");
        let opts = options("https://mws-eu.amazonservices.com:443").unwrap();
        assert_eq!(opts.host(), "mws-eu.amazonservices.com");
    }

    #[test]
    fn rejects_bad_endpoints() {
        for bad in ["not a url", "ftp://mws.amazonservices.com", "https://mws.amazonservices.com/Orders"] {
            assert!(matches!(options(bad), Err(MwsError::Configuration(_))), "{bad}");
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", options("https://mws.amazonservices.com").unwrap());
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("secret\""));
    }

    #[test]
    fn reads_every_variable() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_ENDPOINT, "https://mws.amazonservices.co.uk"),
            (ENV_AWS_ACCESS_KEY_ID, "AKIA"),
            (ENV_AUTH_TOKEN, "amzn.mws.token"),
            (ENV_SELLER_ID, "A1SELLER"),
            (ENV_SECRET_KEY, "s3cr3t"),
        ]);
        let opts = MwsOptions::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(opts.host(), "mws.amazonservices.co.uk");
        assert_eq!(opts.seller_id, "A1SELLER");
        assert_eq!(opts.secret_key(), "s3cr3t");
    }

    #[test]
    fn missing_variable_is_named() {
        let err = MwsOptions::from_lookup(|name| (name != ENV_SELLER_ID).then(|| "x".to_string())).unwrap_err();
        assert!(err.to_string().contains(ENV_SELLER_ID));
    }
}
