//! Shared types for the Tableau REST client.
//!
//! This crate defines the error taxonomy, the session credential and the plain
//! data records returned by the Tableau Server REST API and the Pulse API,
//! plus the request types whose shape the server defines. It performs no
//! I/O; see `tableau-client` for the HTTP session client.

pub mod data_update;
pub mod extensions;
pub mod pulse;
pub mod records;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use data_update::DataAction;
pub use extensions::{
    ExtensionUrlStatus, ExtensionsServerSettings, ExtensionsSiteSettings, SafeListEntry,
};
pub use pulse::{
    Cadence, ChannelPreference, ChannelPreferenceRequest, ChannelStatus, DeliveryChannel,
    Follower, GroupBy, MetricGroupingPreferences, PreferencesUpdate, SortOrder, Subscription,
    SubscriptionPage, UserPreferences,
};
pub use records::{
    ApiErrorBody, Capability, CredentialsBody, DataSource, EntityRef, Favorite, FileUpload,
    GranteeCapabilities, Group, Job, Pagination, Permissions, Project, Site, TsResponse, User,
    View, Webhook, WebhookTestResult, Workbook,
};

/// Represents an error that can occur when talking to Tableau Server.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestError {
    /// Sign-in, sign-out or site switch was rejected, or the token is not accepted.
    #[error("Authentication Error: {0}")]
    Auth(String),

    /// An expected section was absent from the response, or the entity does not exist.
    #[error("Not Found: {0}")]
    NotFound(String),

    /// The server rejected a field of the request (e.g. an unknown capability name).
    #[error("Validation Error: {0}")]
    Validation(String),

    /// A file upload session or publish request failed.
    #[error("Upload Error: {0}")]
    Upload(String),

    /// The HTTP exchange itself failed (connection, timeout, truncated body).
    #[error("Network Error: {0}")]
    Network(String),

    /// The server returned an error status that has no more specific mapping.
    #[error("API Error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Tableau error code from the `<error code="...">` element, if present.
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Human-readable error message.
        message: String,
    },

    /// A request could not be encoded or a response could not be decoded.
    #[error("Serialization Error: {0}")]
    Serialization(String),

    /// The client configuration is invalid.
    #[error("Configuration Error: {0}")]
    Config(String),
}

/// The authenticated session returned by sign-in.
///
/// Every request after sign-in presents `token` in the `X-Tableau-Auth` header.
/// The `Debug` output redacts the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque authentication token.
    pub token: String,
    /// LUID of the site the session is bound to.
    pub site_id: String,
    /// LUID of the signed-in user.
    pub user_id: String,
    /// Content URL of the site ("" for the default site).
    pub site_content_url: String,
}

impl Credential {
    /// Creates a credential for the default site.
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        site_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            site_id: site_id.into(),
            user_id: user_id.into(),
            site_content_url: String::new(),
        }
    }

    /// Builds a credential from the `<credentials>` section of a sign-in response.
    ///
    /// # Errors
    /// Returns `RestError::Auth` if the token, site or user is missing.
    pub fn from_body(body: CredentialsBody) -> Result<Self, RestError> {
        if body.token.is_empty() {
            return Err(RestError::Auth("Sign-in response carried an empty token".to_string()));
        }
        let site = body
            .site
            .ok_or_else(|| RestError::Auth("Sign-in response carried no site".to_string()))?;
        let user = body
            .user
            .ok_or_else(|| RestError::Auth("Sign-in response carried no user".to_string()))?;

        Ok(Self {
            token: body.token,
            site_id: site.id,
            user_id: user.id,
            site_content_url: site.content_url,
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("site_id", &self.site_id)
            .field("user_id", &self.user_id)
            .field("site_content_url", &self.site_content_url)
            .finish()
    }
}

/// Permission mode attached to a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionMode {
    /// The capability is granted.
    Allow,
    /// The capability is explicitly denied.
    Deny,
}

impl PermissionMode {
    /// Returns the wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionMode {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Allow" => Ok(Self::Allow),
            "Deny" => Ok(Self::Deny),
            other => Err(RestError::Validation(format!("Unknown permission mode: {other}"))),
        }
    }
}
