//! A user's favorites.

use crate::client::{FailureKind, SessionClient, require};
use crate::xml::XmlElement;
use reqwest::Method;
use tableau_abstraction::{Credential, Favorite, RestError};
use tracing::debug;

impl SessionClient {
    /// Adds a workbook to a user's favorites under `label`.
    ///
    /// Returns the user's favorites after the addition.
    pub async fn add_favorite_workbook(
        &self,
        credential: &Credential,
        site_id: &str,
        user_id: &str,
        label: &str,
        workbook_id: &str,
    ) -> Result<Vec<Favorite>, RestError> {
        debug!(user_id = %user_id, workbook_id = %workbook_id, "Adding favorite workbook");
        self.add_favorite(credential, site_id, user_id, label, "workbook", workbook_id).await
    }

    /// Adds a project to a user's favorites under `label`.
    ///
    /// Returns the user's favorites after the addition.
    pub async fn add_favorite_project(
        &self,
        credential: &Credential,
        site_id: &str,
        user_id: &str,
        label: &str,
        project_id: &str,
    ) -> Result<Vec<Favorite>, RestError> {
        debug!(user_id = %user_id, project_id = %project_id, "Adding favorite project");
        self.add_favorite(credential, site_id, user_id, label, "project", project_id).await
    }

    async fn add_favorite(
        &self,
        credential: &Credential,
        site_id: &str,
        user_id: &str,
        label: &str,
        content: &str,
        content_id: &str,
    ) -> Result<Vec<Favorite>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/favorites/{user_id}"));
        let favorite = XmlElement::new("favorite")
            .attr("label", label)
            .child(XmlElement::new(content).attr("id", content_id));
        let request = self.xml_request(Method::PUT, &url, Some(&credential.token), Some(favorite))?;
        let response = self.send_envelope(request, "add favorite", FailureKind::General).await?;
        Ok(require(response.favorites, "favorites", "add favorite")?.items)
    }

    /// Lists a user's favorites.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the response carries no favorites section.
    pub async fn query_favorites(
        &self,
        credential: &Credential,
        site_id: &str,
        user_id: &str,
    ) -> Result<Vec<Favorite>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/favorites/{user_id}"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response = self.send_envelope(request, "query favorites", FailureKind::General).await?;
        Ok(require(response.favorites, "favorites", "query favorites")?.items)
    }
}
