//! TLS configuration helpers for the enrollment client.
//!
//! This module builds the HTTP client used for every issuer request.
//! TLS 1.2 is the floor and server certificates are always verified.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rustls_pki_types::CertificateDer;

use crate::config::{EnrollConfig, TrustAnchors};
use crate::error::{EnrollError, Result};

/// Build a reqwest Client with the appropriate TLS configuration.
pub fn build_http_client(config: &EnrollConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.timeout)
        .use_rustls_tls()
        .user_agent(crate::USER_AGENT)
        // Sessions are carried explicitly, never through a shared jar.
        .redirect(reqwest::redirect::Policy::none())
        .https_only(!config.allow_plaintext_http);

    match &config.trust_anchors {
        TrustAnchors::Platform => {
            builder = builder.tls_built_in_root_certs(true);
        }
        TrustAnchors::Explicit(ca_bundles) => {
            builder = builder.tls_built_in_root_certs(false);
            for pem in ca_bundles {
                for der in parse_pem_certificates(pem)? {
                    let cert = reqwest::Certificate::from_der(der.as_ref()).map_err(|e| {
                        EnrollError::tls(format!("Failed to load CA certificate: {}", e))
                    })?;
                    builder = builder.add_root_certificate(cert);
                }
            }
        }
    }

    builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_2);

    builder = builder.default_headers(extra_headers(&config.additional_headers)?);

    builder
        .build()
        .map_err(|e| EnrollError::tls(format!("Failed to build HTTP client: {}", e)))
}

fn extra_headers(pairs: &[(String, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let header = HeaderName::try_from(name.as_str())
            .map_err(|_| EnrollError::config(format!("invalid header name {:?}", name)))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|_| EnrollError::config(format!("invalid value for header {}", name)))?;
        headers.append(header, value);
    }
    Ok(headers)
}

/// Parse PEM-encoded certificates.
pub fn parse_pem_certificates(pem_data: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::BufReader::new(pem_data);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| EnrollError::tls(format!("Failed to parse PEM: {}", e)))?;

    if certs.is_empty() {
        return Err(EnrollError::tls("No certificates found in PEM data"));
    }

    Ok(certs)
}
