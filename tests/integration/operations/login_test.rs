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

//! Integration tests for POST /api/v0/login

use std::time::Duration;

use crate::integration::{
    MockIssuer, PATH_LOGIN, TEST_PASSWORD, TEST_USER, test_config, test_credentials,
};
use certgen_enroll::{EnrollConfig, EnrollError, IssuerClient};
use wiremock::matchers::{basic_auth, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_successful_login_collects_cookies() {
    let mock = MockIssuer::start().await;
    mock.mock_login_success().await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let session = client
        .login(&mock.url(), &test_credentials())
        .await
        .expect("Login failed");

    assert_eq!(session.len(), 2);
    assert_eq!(session.issuer(), &mock.url());
    assert_eq!(
        session.cookie_header(),
        "auth_cookie=session-1; csrf=token-1"
    );
}

#[tokio::test]
async fn test_login_sends_basic_credentials() {
    let mock = MockIssuer::start().await;

    Mock::given(method("POST"))
        .and(path(PATH_LOGIN))
        .and(basic_auth(TEST_USER, TEST_PASSWORD))
        .respond_with(ResponseTemplate::new(200).append_header("Set-Cookie", "auth_cookie=ok"))
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let session = client.login(&mock.url(), &test_credentials()).await;

    assert!(session.is_ok(), "login failed: {:?}", session.err());
}

#[tokio::test]
async fn test_login_rejected() {
    let mock = MockIssuer::start().await;
    mock.mock_login(403, &[], 1).await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let result = client.login(&mock.url(), &test_credentials()).await;

    match result {
        Err(EnrollError::LoginRejected { status }) => assert_eq!(status, 403),
        other => panic!("Expected LoginRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_login_success_status_without_cookies() {
    let mock = MockIssuer::start().await;
    mock.mock_login(200, &[], 1).await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let result = client.login(&mock.url(), &test_credentials()).await;

    assert!(matches!(result, Err(EnrollError::NoSessionTokens)));
}

#[tokio::test]
async fn test_login_requires_exactly_200() {
    let mock = MockIssuer::start().await;
    mock.mock_login(204, &[("auth_cookie", "x")], 1).await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let result = client.login(&mock.url(), &test_credentials()).await;

    assert!(matches!(result, Err(EnrollError::LoginRejected { status: 204 })));
}

#[tokio::test]
async fn test_login_redirect_not_followed() {
    let mock = MockIssuer::start().await;

    Mock::given(method("POST"))
        .and(path(PATH_LOGIN))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/elsewhere"))
        .expect(1)
        .mount(mock.inner())
        .await;

    let client = IssuerClient::new(&test_config()).expect("Client creation failed");
    let result = client.login(&mock.url(), &test_credentials()).await;

    assert!(matches!(result, Err(EnrollError::LoginRejected { status: 302 })));
}

#[tokio::test]
async fn test_login_under_path_prefix() {
    let mock = MockIssuer::start().await;

    Mock::given(method("POST"))
        .and(path("/keymaster/api/v0/login"))
        .respond_with(ResponseTemplate::new(200).append_header("Set-Cookie", "auth_cookie=ok"))
        .expect(1)
        .mount(mock.inner())
        .await;

    let base = mock.url().join("/keymaster/").expect("Valid URL");
    let client = IssuerClient::new(&test_config()).expect("Client creation failed");

    assert!(client.login(&base, &test_credentials()).await.is_ok());
}

#[tokio::test]
async fn test_login_timeout() {
    let mock = MockIssuer::start().await;

    Mock::given(method("POST"))
        .and(path(PATH_LOGIN))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "auth_cookie=late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(mock.inner())
        .await;

    let config = EnrollConfig::builder()
        .allow_plaintext_http()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("Valid config");
    let client = IssuerClient::new(&config).expect("Client creation failed");

    let result = client.login(&mock.url(), &test_credentials()).await;
    assert!(matches!(result, Err(EnrollError::Http(ref e)) if e.is_timeout()));
}

#[tokio::test]
async fn test_plaintext_issuer_refused_by_default() {
    let mock = MockIssuer::start().await;
    mock.mock_untouched().await;

    let client = IssuerClient::new(&EnrollConfig::default()).expect("Client creation failed");
    let result = client.login(&mock.url(), &test_credentials()).await;

    assert!(matches!(result, Err(EnrollError::Http(_))));
}
