//! Site queries.

use crate::client::{FailureKind, SessionClient, require};
use reqwest::Method;
use tableau_abstraction::{Credential, RestError, Site};
use tracing::debug;

impl SessionClient {
    /// Lists the sites the signed-in user can access.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the response carries no sites section.
    pub async fn query_sites(&self, credential: &Credential) -> Result<Vec<Site>, RestError> {
        let url = self.api_url("sites");
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response = self.send_envelope(request, "query sites", FailureKind::General).await?;
        let sites = require(response.sites, "sites", "query sites")?.items;

        debug!(count = sites.len(), "Queried sites");
        Ok(sites)
    }

    /// Deletes a site and all of its content.
    ///
    /// # Errors
    /// Returns `RestError::Auth` if the user is not a server administrator.
    pub async fn delete_site(&self, credential: &Credential, site_id: &str) -> Result<(), RestError> {
        debug!(site_id = %site_id, "Deleting site");
        let url = self.api_url(&format!("sites/{site_id}"));
        let request = self.request(Method::DELETE, &url, Some(&credential.token));
        self.send_empty(request, "delete site", FailureKind::General).await?;
        Ok(())
    }
}
