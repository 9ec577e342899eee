//! Certgen issuer client.
//!
//! This module provides [`IssuerClient`], which speaks the two halves of the
//! issuer protocol:
//!
//! - `POST {base}/api/v0/login` with HTTP Basic credentials, answered with
//!   one or more session cookies
//! - `POST {base}/certgen/{identity}?type=ssh|x509` with a multipart body
//!   carrying the public key, answered with the raw certificate bytes

use base64::prelude::*;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderValue};
use reqwest::multipart::{Form, Part};
use url::Url;
use zeroize::Zeroizing;

use crate::config::{Credentials, EnrollConfig, Password};
use crate::error::{EnrollError, Result};
use crate::tls::build_http_client;
use crate::types::{CertType, Session};

/// Path segments of the login endpoint.
pub const LOGIN_PATH: &[&str] = &["api", "v0", "login"];

/// Path segment of the certificate issuance endpoint.
pub const CERTGEN_PATH: &str = "certgen";

/// Multipart field carrying the public key.
pub const PUBKEY_FIELD: &str = "pubkeyfile";

/// Longest issuer error body kept in [`EnrollError::ServerError`].
pub const MAX_ERROR_BODY: usize = 512;

/// Client for one or more certgen issuers.
///
/// The client holds no session state of its own; sessions are returned by
/// [`login`](Self::login) and passed back explicitly.
#[derive(Debug, Clone)]
pub struct IssuerClient {
    http: reqwest::Client,
    debug_payloads: bool,
}

impl IssuerClient {
    /// Create a new issuer client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if TLS configuration fails.
    pub fn new(config: &EnrollConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        Ok(Self {
            http,
            debug_payloads: false,
        })
    }

    /// Log the key material of every certificate request at debug level.
    pub fn with_debug_payloads(mut self, enabled: bool) -> Self {
        self.debug_payloads = enabled;
        self
    }

    /// Log in to the issuer at `base_url`.
    ///
    /// Succeeds only on HTTP 200 with at least one session cookie.
    pub async fn login(&self, base_url: &Url, credentials: &Credentials) -> Result<Session> {
        let url = login_url(base_url)?;
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .header(
                AUTHORIZATION,
                basic_auth_header(&credentials.identity, &credentials.password)?,
            )
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(EnrollError::login_rejected(status.as_u16()));
        }

        let session = Session::new(
            base_url.clone(),
            response
                .cookies()
                .map(|c| (c.name().to_string(), c.value().to_string())),
        );

        if !session.is_usable() {
            return Err(EnrollError::NoSessionTokens);
        }

        tracing::debug!(cookies = session.len(), "login succeeded");
        Ok(session)
    }

    /// Upload `key_material` and retrieve a certificate of `cert_type`.
    ///
    /// The request is sent to the issuer the session belongs to.
    pub async fn request_certificate(
        &self,
        session: &Session,
        identity: &str,
        cert_type: CertType,
        key_material: &str,
    ) -> Result<Vec<u8>> {
        let url = certgen_url(session.issuer(), identity, cert_type)?;
        tracing::debug!("POST {}", url);

        if self.debug_payloads {
            tracing::debug!(%cert_type, "key material:\n{}", key_material);
        }

        let part = Part::bytes(key_material.as_bytes().to_vec())
            .file_name(key_file_name(identity, cert_type))
            .mime_str("application/octet-stream")?;
        let form = Form::new().part(PUBKEY_FIELD, part);

        let response = self
            .http
            .post(url)
            .header(COOKIE, session_cookie_header(session)?)
            .multipart(form)
            .send()
            .await?;

        let response = self.handle_error_response(response).await?;
        let body = response.bytes().await?;

        Ok(body.to_vec())
    }

    /// Handle error responses from the issuer.
    ///
    /// Only HTTP 200 carries a certificate; any other status, including
    /// other 2xx codes, is an error.
    async fn handle_error_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status == StatusCode::OK {
            return Ok(response);
        }

        let body = read_error_body(response).await;
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

        Err(EnrollError::server_error(status.as_u16(), message))
    }
}

/// Read at most [`MAX_ERROR_BODY`] bytes (plus the last chunk) of an error body.
async fn read_error_body(mut response: reqwest::Response) -> Vec<u8> {
    let mut body = Vec::new();
    while body.len() <= MAX_ERROR_BODY {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            _ => break,
        }
    }
    body
}

/// Trimmed text of an error body, cut to [`MAX_ERROR_BODY`] bytes.
fn error_message(body: &[u8]) -> Option<String> {
    let truncated = body.len() > MAX_ERROR_BODY;
    let text = String::from_utf8_lossy(&body[..body.len().min(MAX_ERROR_BODY)]);
    let mut message = text.trim().to_string();
    if message.is_empty() {
        return None;
    }
    if truncated {
        message.push_str("...");
    }
    Some(message)
}

/// Build the login URL under `base_url`.
pub fn login_url(base_url: &Url) -> Result<Url> {
    extend_path(base_url, LOGIN_PATH.iter().copied())
}

/// Build the certgen URL for `identity` and `cert_type` under `base_url`.
///
/// The identity is percent-encoded as a single path segment.
pub fn certgen_url(base_url: &Url, identity: &str, cert_type: CertType) -> Result<Url> {
    let mut url = extend_path(base_url, [CERTGEN_PATH, identity])?;
    url.query_pairs_mut()
        .clear()
        .append_pair("type", cert_type.as_str());
    Ok(url)
}

fn extend_path<'a>(base_url: &Url, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
    let mut url = base_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| EnrollError::config(format!("{} cannot be used as a base URL", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// File name attached to the uploaded key part.
fn key_file_name(identity: &str, cert_type: CertType) -> String {
    match cert_type {
        CertType::Ssh => format!("{}.pub", identity),
        CertType::X509 => format!("{}.pem", identity),
    }
}

/// Build a sensitive `Authorization: Basic ...` header value.
///
/// Intermediate buffers holding the password are wiped on return.
fn basic_auth_header(identity: &str, password: &Password) -> Result<HeaderValue> {
    let mut plain = Zeroizing::new(Vec::with_capacity(identity.len() + 1 + password.expose().len()));
    plain.extend_from_slice(identity.as_bytes());
    plain.push(b':');
    plain.extend_from_slice(password.expose());

    let encoded = Zeroizing::new(format!("Basic {}", BASE64_STANDARD.encode(plain.as_slice())));
    let mut value = HeaderValue::from_str(&encoded)
        .map_err(|_| EnrollError::config("identity contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok(value)
}

fn session_cookie_header(session: &Session) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&session.cookie_header())
        .map_err(|_| EnrollError::NoSessionTokens)?;
    value.set_sensitive(true);
    Ok(value)
}
