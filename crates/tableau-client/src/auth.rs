//! Sign-in, sign-out and site switching.

use crate::client::{FailureKind, SessionClient, require};
use crate::xml::XmlElement;
use reqwest::{Method, StatusCode};
use tableau_abstraction::{Credential, RestError, TsResponse};
use tracing::{debug, warn};

impl SessionClient {
    /// Signs in with a username and password.
    ///
    /// `site_content_url` is "" for the default site.
    ///
    /// # Errors
    /// Returns `RestError::Auth` if the server rejects the sign-in or the
    /// response carries no usable credentials, and `RestError::Network` if the
    /// server cannot be reached.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
        site_content_url: &str,
    ) -> Result<Credential, RestError> {
        debug!(username = %username, site = %site_content_url, "Signing in");

        let credentials = XmlElement::new("credentials")
            .attr("name", username)
            .attr("password", password)
            .child(XmlElement::new("site").attr("contentUrl", site_content_url));

        self.authenticate(credentials, "sign in").await
    }

    /// Signs in with a personal access token.
    ///
    /// # Errors
    /// Same as [`SessionClient::sign_in`].
    pub async fn sign_in_with_token(
        &self,
        token_name: &str,
        token_secret: &str,
        site_content_url: &str,
    ) -> Result<Credential, RestError> {
        debug!(token_name = %token_name, site = %site_content_url, "Signing in with personal access token");

        let credentials = XmlElement::new("credentials")
            .attr("personalAccessTokenName", token_name)
            .attr("personalAccessTokenSecret", token_secret)
            .child(XmlElement::new("site").attr("contentUrl", site_content_url));

        self.authenticate(credentials, "sign in with token").await
    }

    async fn authenticate(
        &self,
        credentials: XmlElement,
        operation: &str,
    ) -> Result<Credential, RestError> {
        let url = self.api_url("auth/signin");
        let request = self.xml_request(Method::POST, &url, None, Some(credentials))?;
        let response = self.send_envelope(request, operation, FailureKind::Auth).await?;
        let credential = credential_from(response, operation)?;

        debug!(
            site_id = %credential.site_id,
            user_id = %credential.user_id,
            "Signed in"
        );
        Ok(credential)
    }

    /// Signs out, invalidating the token.
    ///
    /// The credential is consumed whether or not the server acknowledges the
    /// sign-out.
    ///
    /// # Errors
    /// Returns `RestError::Auth` unless the server answers 204 No Content,
    /// e.g. when the token was already invalidated.
    pub async fn sign_out(&self, credential: Credential) -> Result<(), RestError> {
        let url = self.api_url("auth/signout");
        let request = self.request(Method::POST, &url, Some(&credential.token));

        let status = match self.send_empty(request, "sign out", FailureKind::Auth).await {
            Ok(status) => status,
            Err(e) => {
                warn!(site_id = %credential.site_id, error = %e, "Sign-out was not acknowledged");
                return Err(e);
            }
        };

        if status != StatusCode::NO_CONTENT {
            warn!(site_id = %credential.site_id, status = %status, "Unexpected sign-out status");
            return Err(RestError::Auth(format!(
                "sign out was not acknowledged: expected 204 No Content, got {status}"
            )));
        }

        debug!(site_id = %credential.site_id, "Signed out");
        Ok(())
    }

    /// Switches the session to another site and returns the new credential.
    ///
    /// The server invalidates the old token.
    ///
    /// # Errors
    /// Returns `RestError::Auth` if the switch is rejected.
    pub async fn switch_site(
        &self,
        credential: &Credential,
        site_content_url: &str,
    ) -> Result<Credential, RestError> {
        debug!(from_site_id = %credential.site_id, site = %site_content_url, "Switching site");

        let url = self.api_url("auth/switchSite");
        let site = XmlElement::new("site").attr("contentUrl", site_content_url);
        let request = self.xml_request(Method::POST, &url, Some(&credential.token), Some(site))?;
        let response = self.send_envelope(request, "switch site", FailureKind::Auth).await?;
        credential_from(response, "switch site")
    }
}

fn credential_from(response: TsResponse, operation: &str) -> Result<Credential, RestError> {
    let body = require(response.credentials, "credentials", operation)
        .map_err(|e| RestError::Auth(e.to_string()))?;
    Credential::from_body(body)
}
