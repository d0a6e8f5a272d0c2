//! Workbook queries, updates and downloads. Publishing lives in `publish`.

use crate::client::{FailureKind, SessionClient, require};
use crate::xml::XmlElement;
use bytes::Bytes;
use reqwest::Method;
use tableau_abstraction::{Credential, RestError, Workbook};
use tracing::debug;

/// Changes applied by [`SessionClient::update_workbook`]. Unset fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookUpdate {
    /// New workbook name.
    pub name: Option<String>,
    /// Project to move the workbook to.
    pub project_id: Option<String>,
    /// Whether views are shown as tabs.
    pub show_tabs: Option<bool>,
}

impl WorkbookUpdate {
    #[must_use]
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn move_to(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    #[must_use]
    pub fn show_tabs(mut self, show_tabs: bool) -> Self {
        self.show_tabs = Some(show_tabs);
        self
    }

    fn to_element(&self) -> XmlElement {
        let show_tabs = self.show_tabs.map(|v| v.to_string());
        let element = XmlElement::new("workbook")
            .attr_opt("name", self.name.as_deref())
            .attr_opt("showTabs", show_tabs.as_deref());
        match &self.project_id {
            Some(project_id) => element.child(XmlElement::new("project").attr("id", project_id.as_str())),
            None => element,
        }
    }
}

impl SessionClient {
    /// Lists the workbooks a user owns or can read.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the response carries no workbooks section.
    pub async fn query_workbooks(
        &self,
        credential: &Credential,
        site_id: &str,
        user_id: &str,
    ) -> Result<Vec<Workbook>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/users/{user_id}/workbooks"));
        self.list_workbooks(credential, &url, "query workbooks").await
    }

    /// Lists every workbook on a site.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the response carries no workbooks section.
    pub async fn query_site_workbooks(
        &self,
        credential: &Credential,
        site_id: &str,
    ) -> Result<Vec<Workbook>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/workbooks"));
        self.list_workbooks(credential, &url, "query site workbooks").await
    }

    async fn list_workbooks(
        &self,
        credential: &Credential,
        url: &str,
        operation: &str,
    ) -> Result<Vec<Workbook>, RestError> {
        let request = self.request(Method::GET, url, Some(&credential.token));
        let response = self.send_envelope(request, operation, FailureKind::General).await?;
        let workbooks = require(response.workbooks, "workbooks", operation)?.items;

        debug!(operation = %operation, count = workbooks.len(), "Queried workbooks");
        Ok(workbooks)
    }

    /// Finds one of a user's workbooks by exact name.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the user has no workbook with that name.
    pub async fn find_workbook_by_name(
        &self,
        credential: &Credential,
        site_id: &str,
        user_id: &str,
        name: &str,
    ) -> Result<Workbook, RestError> {
        self.query_workbooks(credential, site_id, user_id)
            .await?
            .into_iter()
            .find(|w| w.name == name)
            .ok_or_else(|| RestError::NotFound(format!("No workbook named '{name}' for user {user_id}")))
    }

    /// Fetches a single workbook.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the workbook does not exist.
    pub async fn get_workbook(
        &self,
        credential: &Credential,
        site_id: &str,
        workbook_id: &str,
    ) -> Result<Workbook, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/workbooks/{workbook_id}"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response = self.send_envelope(request, "get workbook", FailureKind::General).await?;
        require(response.workbook, "workbook", "get workbook")
    }

    /// Renames a workbook, moves it to another project, or both.
    ///
    /// # Errors
    /// Returns `RestError::Validation` if the server rejects the update.
    pub async fn update_workbook(
        &self,
        credential: &Credential,
        site_id: &str,
        workbook_id: &str,
        update: &WorkbookUpdate,
    ) -> Result<Workbook, RestError> {
        debug!(site_id = %site_id, workbook_id = %workbook_id, "Updating workbook");

        let url = self.api_url(&format!("sites/{site_id}/workbooks/{workbook_id}"));
        let request =
            self.xml_request(Method::PUT, &url, Some(&credential.token), Some(update.to_element()))?;
        let response = self.send_envelope(request, "update workbook", FailureKind::General).await?;
        require(response.workbook, "workbook", "update workbook")
    }

    /// # Errors
    /// Returns `RestError::NotFound` if the workbook does not exist.
    pub async fn delete_workbook(
        &self,
        credential: &Credential,
        site_id: &str,
        workbook_id: &str,
    ) -> Result<(), RestError> {
        debug!(site_id = %site_id, workbook_id = %workbook_id, "Deleting workbook");
        let url = self.api_url(&format!("sites/{site_id}/workbooks/{workbook_id}"));
        let request = self.request(Method::DELETE, &url, Some(&credential.token));
        self.send_empty(request, "delete workbook", FailureKind::General).await?;
        Ok(())
    }

    /// Downloads the workbook file (`.twb` or `.twbx`).
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the workbook does not exist.
    pub async fn download_workbook(
        &self,
        credential: &Credential,
        site_id: &str,
        workbook_id: &str,
    ) -> Result<Bytes, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/workbooks/{workbook_id}/content"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let (_, body) = self.send_raw(request, "download workbook", FailureKind::General).await?;

        debug!(workbook_id = %workbook_id, bytes = body.len(), "Downloaded workbook");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SITE, client_for, credential, ts_response};
    use mockito::Matcher;

    const WORKBOOKS: &str = r#"<workbooks><workbook id="W1" name="Sales" contentUrl="Sales"><project id="P1" name="Default"/><owner id="U1"/></workbook><workbook id="W2" name="Finance"/></workbooks>"#;

    #[tokio::test]
    async fn test_query_workbooks_for_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/3.19/sites/S1/users/U1/workbooks")
            .match_header("x-tableau-auth", "T1")
            .with_status(200)
            .with_body(ts_response(WORKBOOKS))
            .create_async()
            .await;

        let client = client_for(&server);
        let workbooks = client.query_workbooks(&credential(), SITE, "U1").await.unwrap();
        assert_eq!(workbooks.len(), 2);
        assert_eq!(workbooks[0].project.as_ref().map(|p| p.id.as_str()), Some("P1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_workbooks_missing_section_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/3.19/sites/S1/users/U1/workbooks")
            .with_status(200)
            .with_body(ts_response(""))
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.query_workbooks(&credential(), SITE, "U1").await;
        assert!(matches!(result, Err(RestError::NotFound(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_workbook_by_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/3.19/sites/S1/users/U1/workbooks")
            .with_status(200)
            .with_body(ts_response(WORKBOOKS))
            .create_async()
            .await;

        let client = client_for(&server);
        let workbook = client.find_workbook_by_name(&credential(), SITE, "U1", "Finance").await.unwrap();
        assert_eq!(workbook.id, "W2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_workbook_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/3.19/sites/S1/workbooks/W9")
            .with_status(404)
            .with_body(ts_response(
                r#"<error code="404006"><summary>Resource Not Found</summary><detail>Workbook 'W9' could not be found.</detail></error>"#,
            ))
            .create_async()
            .await;

        let client = client_for(&server);
        match client.get_workbook(&credential(), SITE, "W9").await {
            Err(RestError::NotFound(msg)) => assert!(msg.contains("404006")),
            other => panic!("Expected NotFound error, got {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_workbook_moves_project() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/3.19/sites/S1/workbooks/W1")
            .match_body(Matcher::Regex(
                r#"<workbook name="Sales 2024"><project id="P2"/></workbook>"#.to_string(),
            ))
            .with_status(200)
            .with_body(ts_response(
                r#"<workbook id="W1" name="Sales 2024"><project id="P2"/></workbook>"#,
            ))
            .create_async()
            .await;

        let client = client_for(&server);
        let update = WorkbookUpdate::default().rename("Sales 2024").move_to("P2");
        let workbook = client.update_workbook(&credential(), SITE, "W1", &update).await.unwrap();
        assert_eq!(workbook.name, "Sales 2024");
        mock.assert_async().await;
    }

    #[test]
    fn test_workbook_update_show_tabs_only() {
        let payload = crate::xml::ts_request(Some(WorkbookUpdate::default().show_tabs(true).to_element()))
            .unwrap();
        assert_eq!(payload, r#"<tsRequest><workbook showTabs="true"/></tsRequest>"#);
    }

    #[tokio::test]
    async fn test_download_and_delete_workbook() {
        let mut server = mockito::Server::new_async().await;
        let download = server
            .mock("GET", "/api/3.19/sites/S1/workbooks/W1/content")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(b"PK\x03\x04twbx")
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/3.19/sites/S1/workbooks/W1")
            .with_status(204)
            .create_async()
            .await;

        let client = client_for(&server);
        let bytes = client.download_workbook(&credential(), SITE, "W1").await.unwrap();
        assert_eq!(bytes.as_ref(), b"PK\x03\x04twbx");
        client.delete_workbook(&credential(), SITE, "W1").await.unwrap();

        download.assert_async().await;
        delete.assert_async().await;
    }
}
