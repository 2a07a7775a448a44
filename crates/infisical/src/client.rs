//! HTTP transport bound to an Infisical instance.

use crate::error::{ClientError, read_error_body, report_remote_error, report_request_error};
use crate::AuthError;
use indexmap::IndexMap;
use keyrelay_secrets::Credential;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

/// Infisical Cloud.
pub const DEFAULT_DOMAIN: &str = "https://app.infisical.com";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
}

/// A `reqwest` client bound to a base URL with default headers.
///
/// Cloning is cheap; the connection pool is shared.
#[derive(Debug, Clone)]
pub struct InfisicalClient {
    http: Client,
    base_url: String,
}

impl InfisicalClient {
    /// Build a client for `domain`, sending `default_headers` on every request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the domain is not an http(s) URL, a header
    /// name or value is invalid, or the TLS backend fails to initialise.
    pub fn new(
        domain: &str,
        default_headers: &IndexMap<String, String>,
    ) -> Result<Self, ClientError> {
        let url = Url::parse(domain).map_err(|e| ClientError::InvalidDomain {
            domain: domain.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidDomain {
                domain: domain.to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let mut headers = HeaderMap::with_capacity(default_headers.len());
        for (name, value) in default_headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        let http = Client::builder()
            .user_agent(concat!("keyrelay/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Build {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: domain.trim_end_matches('/').to_string(),
        })
    }

    /// The base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Submit a form-encoded login and return the issued access token.
    pub(crate) async fn login(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Credential, AuthError> {
        let url = self.url(path);
        debug!(%url, "Submitting login request");

        let response = self
            .http
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::RemoteRejected {
                status: None,
                message: report_request_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(AuthError::RemoteRejected {
                status: Some(status.as_u16()),
                message: report_remote_error(status, &body),
            });
        }

        let login: LoginResponse = response.json().await.map_err(|e| AuthError::RemoteRejected {
            status: Some(status.as_u16()),
            message: report_request_error(&e),
        })?;
        if login.access_token.is_empty() {
            return Err(AuthError::RemoteRejected {
                status: Some(status.as_u16()),
                message: "login response did not include an access token".to_string(),
            });
        }

        Ok(Credential::new(login.access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rejects_non_http_domain() {
        let err = InfisicalClient::new("ftp://example.com", &IndexMap::new()).unwrap_err();
        assert!(matches!(err, ClientError::InvalidDomain { .. }));

        let err = InfisicalClient::new("not a url", &IndexMap::new()).unwrap_err();
        assert!(matches!(err, ClientError::InvalidDomain { .. }));
    }

    #[test]
    fn rejects_invalid_header_name() {
        let headers = IndexMap::from([("bad header".to_string(), "v".to_string())]);
        let err = InfisicalClient::new(DEFAULT_DOMAIN, &headers).unwrap_err();
        assert!(matches!(err, ClientError::InvalidHeader { .. }));
    }

    #[test]
    fn trims_trailing_slash() {
        let client = InfisicalClient::new("https://vault.example.com/", &IndexMap::new()).unwrap();
        assert_eq!(client.base_url(), "https://vault.example.com");
        assert_eq!(
            client.url("/api/v1/auth/universal-auth/login"),
            "https://vault.example.com/api/v1/auth/universal-auth/login"
        );
    }

    #[tokio::test]
    async fn sends_default_headers_and_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header("x-tenant", "acme"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("a=1&b=two+words"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "accessToken": "client-test-token",
                    "expiresIn": 7200,
                    "tokenType": "Bearer"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let headers = IndexMap::from([("x-tenant".to_string(), "acme".to_string())]);
        let client = InfisicalClient::new(&server.uri(), &headers).unwrap();
        let credential = client
            .login("/login", &[("a", "1"), ("b", "two words")])
            .await
            .unwrap();
        assert_eq!(credential.expose(), "client-test-token");
    }

    #[tokio::test]
    async fn empty_access_token_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"accessToken": ""})),
            )
            .mount(&server)
            .await;

        let client = InfisicalClient::new(&server.uri(), &IndexMap::new()).unwrap();
        let err = client.login("/login", &[]).await.unwrap_err();
        assert!(matches!(err, AuthError::RemoteRejected { status: Some(200), .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_rejected_without_status() {
        let client = InfisicalClient::new("http://127.0.0.1:1", &IndexMap::new()).unwrap();
        let err = client.login("/login", &[]).await.unwrap_err();
        assert!(matches!(err, AuthError::RemoteRejected { status: None, .. }));
    }
}
