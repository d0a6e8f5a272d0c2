//! The HTTP session client.
//!
//! `SessionClient` holds the configuration and a pooled `reqwest::Client`. It
//! never holds a token: operations take the `Credential` returned by sign-in,
//! so any number of independent sessions can share one client.

use crate::config::ClientConfig;
use crate::xml::{XmlElement, decode_envelope, ts_request};
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use tableau_abstraction::{RestError, TsResponse};
use tracing::{debug, error};

/// Header carrying the session token on every authenticated request.
pub const AUTH_HEADER: &str = "X-Tableau-Auth";

/// How a failed response is classified for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    /// Classified by HTTP status.
    General,
    /// Sign-in, sign-out and site switch: every failure is an auth failure.
    Auth,
    /// Upload sessions and publishing: every failure is an upload failure.
    Upload,
}

/// Tableau Server REST session client.
#[derive(Debug, Clone)]
pub struct SessionClient {
    config: ClientConfig,
    http: Client,
}

impl SessionClient {
    /// Creates a client from a validated configuration.
    ///
    /// # Errors
    /// Returns `RestError::Config` if the configuration is invalid, or
    /// `RestError::Network` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, RestError> {
        config.validate().map_err(|e| RestError::Config(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RestError::Network(format!("Failed to build HTTP client: {e}")))?;

        debug!(
            server_url = %config.server_url,
            api_version = %config.api_version,
            "Created Tableau session client"
        );

        Ok(Self { config, http })
    }

    /// Creates a client for `server_url` with default settings.
    ///
    /// # Errors
    /// Returns `RestError::Config` if the URL is invalid.
    pub fn with_server_url(server_url: impl Into<String>) -> Result<Self, RestError> {
        Self::new(ClientConfig::new(server_url))
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `{server}/api/{version}/{path}`
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.config.base_url(), self.config.api_version, path)
    }

    /// `{server}/api/-/pulse/{path}`
    pub(crate) fn pulse_url(&self, path: &str) -> String {
        format!("{}/api/-/pulse/{}", self.config.base_url(), path)
    }

    /// Starts a REST request, attaching the token when one is given.
    pub(crate) fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(ACCEPT, self.config.response_format.accept());
        match token {
            Some(token) => builder.header(AUTH_HEADER, token),
            None => builder,
        }
    }

    /// Starts a Pulse request. Pulse always speaks JSON, so `accept` is a JSON
    /// media type regardless of the configured response format.
    pub(crate) fn pulse_request(
        &self,
        method: Method,
        path: &str,
        token: &str,
        accept: &str,
    ) -> RequestBuilder {
        self.http
            .request(method, self.pulse_url(path))
            .header(ACCEPT, accept)
            .header(AUTH_HEADER, token)
    }

    /// Starts a REST request carrying a `tsRequest` XML body.
    pub(crate) fn xml_request(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<XmlElement>,
    ) -> Result<RequestBuilder, RestError> {
        let payload = ts_request(body)?;
        Ok(self
            .request(method, url, token)
            .header(CONTENT_TYPE, "application/xml")
            .body(payload))
    }

    /// Sends a request and returns the status and the raw body of a successful response.
    pub(crate) async fn send_raw(
        &self,
        builder: RequestBuilder,
        operation: &str,
        kind: FailureKind,
    ) -> Result<(StatusCode, Bytes), RestError> {
        let response = builder.send().await.map_err(|e| {
            error!(operation = %operation, error = %e, "Failed to send request to Tableau Server");
            RestError::Network(format!("Failed to {operation}: {e}"))
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!(operation = %operation, error = %e, "Failed to read response body");
            RestError::Network(format!("Failed to read response for {operation}: {e}"))
        })?;

        if !status.is_success() {
            error!(
                operation = %operation,
                status = %status,
                "Tableau Server returned error status"
            );
            return Err(map_http_error(status, &body, operation, kind));
        }

        Ok((status, body))
    }

    /// Sends a request and decodes the response envelope.
    pub(crate) async fn send_envelope(
        &self,
        builder: RequestBuilder,
        operation: &str,
        kind: FailureKind,
    ) -> Result<TsResponse, RestError> {
        let (_, body) = self.send_raw(builder, operation, kind).await?;
        decode_envelope(&body)
    }

    /// Sends a request whose successful response carries no section of interest.
    pub(crate) async fn send_empty(
        &self,
        builder: RequestBuilder,
        operation: &str,
        kind: FailureKind,
    ) -> Result<StatusCode, RestError> {
        let (status, _) = self.send_raw(builder, operation, kind).await?;
        Ok(status)
    }
}

/// Returns the `section` of a response, or `RestError::NotFound` if it is absent.
pub(crate) fn require<T>(section: Option<T>, name: &str, operation: &str) -> Result<T, RestError> {
    section.ok_or_else(|| {
        RestError::NotFound(format!("Response to {operation} carried no {name} section"))
    })
}

/// Maps a failed response to the `RestError` variant for `kind`.
pub(crate) fn map_http_error(
    status: StatusCode,
    body: &[u8],
    operation: &str,
    kind: FailureKind,
) -> RestError {
    let (code, detail) = describe_error_body(body);
    let message = format!("{operation} failed ({status}): {detail}");

    match kind {
        FailureKind::Auth => RestError::Auth(message),
        FailureKind::Upload => RestError::Upload(message),
        FailureKind::General => match status.as_u16() {
            400 => RestError::Validation(message),
            401 | 403 => RestError::Auth(message),
            404 => RestError::NotFound(message),
            _ => RestError::Api { status: status.as_u16(), code, message },
        },
    }
}

/// Extracts the Tableau error code and a `code: summary - detail` description from a body.
fn describe_error_body(body: &[u8]) -> (Option<String>, String) {
    if let Ok(TsResponse { error: Some(error), .. }) = decode_envelope(body) {
        return (error.code.clone(), error.to_string());
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        (None, "no response body".to_string())
    } else {
        (None, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SessionClient {
        SessionClient::with_server_url("https://tableau.example.com/").unwrap()
    }

    #[test]
    fn test_urls() {
        let client = client();
        assert_eq!(
            client.api_url("sites/S1/projects"),
            "https://tableau.example.com/api/3.19/sites/S1/projects"
        );
        assert_eq!(
            client.pulse_url("user/preferences"),
            "https://tableau.example.com/api/-/pulse/user/preferences"
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = SessionClient::new(ClientConfig::new("ftp://tableau.example.com"));
        assert!(matches!(result, Err(RestError::Config(_))));
    }

    #[test]
    fn test_map_http_error_general() {
        let body = br#"<tsResponse><error code="400009"><summary>Bad Request</summary><detail>Capability 'Reed' is not valid</detail></error></tsResponse>"#;
        let error = map_http_error(StatusCode::BAD_REQUEST, body, "add permissions", FailureKind::General);
        match error {
            RestError::Validation(msg) => {
                assert!(msg.contains("400009: Bad Request - Capability 'Reed' is not valid"));
            }
            other => panic!("Expected Validation error, got {other:?}"),
        }

        let error = map_http_error(StatusCode::UNAUTHORIZED, b"", "query", FailureKind::General);
        assert!(matches!(error, RestError::Auth(_)));

        let error = map_http_error(StatusCode::NOT_FOUND, b"", "query", FailureKind::General);
        assert!(matches!(error, RestError::NotFound(_)));

        let error = map_http_error(
            StatusCode::CONFLICT,
            br#"{"error": {"code": "409009", "summary": "Conflict", "detail": "Group exists"}}"#,
            "create group",
            FailureKind::General,
        );
        assert!(matches!(
            error,
            RestError::Api { status: 409, code: Some(ref c), .. } if c == "409009"
        ));
    }

    #[test]
    fn test_map_http_error_by_kind() {
        let error = map_http_error(StatusCode::NOT_FOUND, b"", "sign in", FailureKind::Auth);
        assert!(matches!(error, RestError::Auth(_)));

        let error = map_http_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            b"too big",
            "publish workbook",
            FailureKind::Upload,
        );
        match error {
            RestError::Upload(msg) => assert!(msg.contains("too big")),
            other => panic!("Expected Upload error, got {other:?}"),
        }
    }

    #[test]
    fn test_require_reports_missing_section() {
        let error = require::<u8>(None, "projects", "query projects").unwrap_err();
        assert_eq!(
            error,
            RestError::NotFound("Response to query projects carried no projects section".to_string())
        );
        assert_eq!(require(Some(1), "projects", "query projects").unwrap(), 1);
    }
}
