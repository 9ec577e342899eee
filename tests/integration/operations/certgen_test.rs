// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Integration tests for POST /certgen/{identity}

use crate::integration::{MockIssuer, TEST_USER, certgen_path, test_config, test_key};
use certgen_enroll::client::MAX_ERROR_BODY;
use certgen_enroll::{CertType, EnrollError, IssuerClient, Session};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn session_for(mock: &MockIssuer) -> Session {
    Session::new(
        mock.url(),
        vec![
            ("auth_cookie".to_string(), "session-1".to_string()),
            ("csrf".to_string(), "token-1".to_string()),
        ],
    )
}

#[tokio::test]
async fn test_ssh_certificate_request() {
    let mock = MockIssuer::start().await;
    let key_material = test_key().key_material(CertType::Ssh).unwrap();

    Mock::given(method("POST"))
        .and(path(certgen_path(TEST_USER)))
        .and(query_param("type", "ssh"))
        .and(header("Cookie", "auth_cookie=session-1; csrf=token-1"))
        .and(body_string_contains("name=\"pubkeyfile\""))
        .and(body_string_contains("filename=\"alice.pub\""))
        .and(body_string_contains(key_material.trim_end()))
        .respond_with(ResponseTemplate::new(200).set_body_string("ssh-rsa-cert-v01@openssh.com AAAA"))
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let cert = client
        .request_certificate(&session_for(&mock), TEST_USER, CertType::Ssh, &key_material)
        .await
        .expect("Certificate request failed");

    assert_eq!(cert, b"ssh-rsa-cert-v01@openssh.com AAAA");
}

#[tokio::test]
async fn test_x509_certificate_request_uploads_pkix_key() {
    let mock = MockIssuer::start().await;
    let key_material = test_key().key_material(CertType::X509).unwrap();

    Mock::given(method("POST"))
        .and(path(certgen_path(TEST_USER)))
        .and(query_param("type", "x509"))
        .and(body_string_contains("-----BEGIN PUBLIC KEY-----"))
        .and(body_string_contains("filename=\"alice.pem\""))
        .respond_with(ResponseTemplate::new(200).set_body_string("-----BEGIN CERTIFICATE-----\n"))
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let cert = client
        .request_certificate(&session_for(&mock), TEST_USER, CertType::X509, &key_material)
        .await
        .expect("Certificate request failed");

    assert!(cert.starts_with(b"-----BEGIN CERTIFICATE-----"));
}

#[tokio::test]
async fn test_certificate_bytes_returned_verbatim() {
    let mock = MockIssuer::start().await;
    let body: Vec<u8> = vec![0x00, 0xff, 0x10, b'\n', 0x80];

    Mock::given(method("POST"))
        .and(path(certgen_path(TEST_USER)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(mock.inner())
        .await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let cert = client
        .request_certificate(&session_for(&mock), TEST_USER, CertType::Ssh, "ssh-rsa AAAA\n")
        .await
        .expect("Certificate request failed");

    assert_eq!(cert, body);
}

#[tokio::test]
async fn test_certificate_request_server_error() {
    let mock = MockIssuer::start().await;
    mock.mock_certgen("ssh", 403, "not authorized for ssh\n", 1).await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let result = client
        .request_certificate(&session_for(&mock), TEST_USER, CertType::Ssh, "ssh-rsa AAAA\n")
        .await;

    match result {
        Err(EnrollError::ServerError { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "not authorized for ssh");
        }
        other => panic!("Expected ServerError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_identity_is_path_encoded() {
    let mock = MockIssuer::start().await;

    Mock::given(method("POST"))
        .and(path("/certgen/bob%20smith"))
        .and(query_param("type", "ssh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("CERT"))
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let cert = client
        .request_certificate(&session_for(&mock), "bob smith", CertType::Ssh, "ssh-rsa AAAA\n")
        .await
        .expect("Certificate request failed");

    assert_eq!(cert, b"CERT");
}

#[tokio::test]
async fn test_request_goes_to_session_issuer() {
    let issuer = MockIssuer::start().await;
    let other = MockIssuer::start().await;
    issuer.mock_certgen("ssh", 200, "CERT", 1).await;
    other.mock_untouched().await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let cert = client
        .request_certificate(&session_for(&issuer), TEST_USER, CertType::Ssh, "ssh-rsa AAAA\n")
        .await
        .expect("Certificate request failed");

    assert_eq!(cert, b"CERT");
}

#[tokio::test]
async fn test_no_content_is_not_a_certificate() {
    let mock = MockIssuer::start().await;
    mock.mock_certgen("ssh", 204, "", 1).await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let result = client
        .request_certificate(&session_for(&mock), TEST_USER, CertType::Ssh, "ssh-rsa AAAA\n")
        .await;

    match result {
        Err(EnrollError::ServerError { status, message }) => {
            assert_eq!(status, 204);
            assert_eq!(message, "No Content");
        }
        other => panic!("Expected ServerError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_large_error_body_truncated() {
    let mock = MockIssuer::start().await;
    let body = "E".repeat(64 * 1024);
    mock.mock_certgen("ssh", 500, &body, 1).await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let result = client
        .request_certificate(&session_for(&mock), TEST_USER, CertType::Ssh, "ssh-rsa AAAA\n")
        .await;

    match result {
        Err(EnrollError::ServerError { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message.len(), MAX_ERROR_BODY + 3);
            assert!(message.ends_with("..."));
        }
        other => panic!("Expected ServerError, got {:?}", other),
    }
}
