//! Authenticated session builder for the vendor's WebSocket endpoint.
//!
//! The vendor authenticates each connection through query parameters on the
//! upgrade request: an HMAC-SHA256 signature over a canonical string of the
//! host, an RFC 1123 date, and the request line. The same date string must
//! appear in the signature input and as the `date` query parameter, since
//! any mismatch invalidates the signature; it is computed once and reused.
//!
//! Signatures embed a timestamp and are single-use by convention: a session
//! is built per evaluation call and never persisted.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use url::Url;

use crate::config::{Credentials, Endpoint};
use crate::errors::{EvalError, EvalResult};

type HmacSha256 = Hmac<Sha256>;

/// One-shot authenticated connection URL for the evaluation endpoint.
#[derive(Debug, Clone)]
pub struct SignedSession {
    signed_url: String,
    issued_at: String,
}

impl SignedSession {
    /// Sign a session for `endpoint` using the current UTC time.
    pub fn new(credentials: &Credentials, endpoint: &Endpoint) -> EvalResult<Self> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        Self::with_date(credentials, endpoint, &date)
    }

    /// Sign a session with an explicit RFC 1123 date string.
    ///
    /// Split out from [`SignedSession::new`] so signing is deterministic
    /// under test.
    pub fn with_date(credentials: &Credentials, endpoint: &Endpoint, date: &str) -> EvalResult<Self> {
        credentials.validate()?;

        let authorization = authorization_param(credentials, &endpoint.host, &endpoint.path, date)?;

        let mut url = Url::parse(&endpoint.url())
            .map_err(|e| EvalError::ConnectionFailure(format!("invalid endpoint URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("authorization", &authorization)
            .append_pair("date", date)
            .append_pair("host", &endpoint.host);

        debug!(host = %endpoint.host, date, "signed evaluation session URL");
        Ok(Self {
            signed_url: url.to_string(),
            issued_at: date.to_string(),
        })
    }

    /// Fully qualified WebSocket URL with authorization parameters.
    pub fn url(&self) -> &str {
        &self.signed_url
    }

    /// The RFC 1123 timestamp embedded in both the signature and the URL.
    pub fn issued_at(&self) -> &str {
        &self.issued_at
    }
}

/// Compute the `authorization` query parameter.
///
/// The canonical signing string is three lines (`host: <host>`,
/// `date: <date>`, `GET <path> HTTP/1.1`) joined by `\n` with no trailing
/// newline. The HMAC-SHA256 digest is base64-encoded into an authorization
/// header value, and that entire value is base64-encoded again; the vendor
/// requires the double encoding.
fn authorization_param(
    credentials: &Credentials,
    host: &str,
    path: &str,
    date: &str,
) -> EvalResult<String> {
    let signing_input = format!("host: {host}\ndate: {date}\nGET {path} HTTP/1.1");

    let mut mac = HmacSha256::new_from_slice(credentials.api_secret.as_bytes())
        .map_err(|e| EvalError::AuthFailure(format!("invalid signing key: {e}")))?;
    mac.update(signing_input.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let header = format!(
        "api_key=\"{}\", algorithm=\"hmac-sha256\", headers=\"host date request-line\", signature=\"{}\"",
        credentials.api_key, signature
    );
    Ok(BASE64.encode(header))
}
