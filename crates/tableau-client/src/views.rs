use crate::client::{FailureKind, SessionClient, require};
use reqwest::Method;
use tableau_abstraction::{Credential, RestError, View};

impl SessionClient {
    /// Lists the views on a site.
    pub async fn query_views(&self, credential: &Credential, site_id: &str) -> Result<Vec<View>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/views"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response = self.send_envelope(request, "query views", FailureKind::General).await?;
        Ok(require(response.views, "views", "query views")?.items)
    }
}
