//! Server-side jobs.

use crate::client::{FailureKind, SessionClient, require};
use reqwest::Method;
use tableau_abstraction::{Credential, Job, RestError};
use tracing::debug;

impl SessionClient {
    /// Runs an extract refresh task immediately and returns the queued job.
    pub async fn run_extract_refresh(
        &self,
        credential: &Credential,
        site_id: &str,
        task_id: &str,
    ) -> Result<Job, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/tasks/extractRefreshes/{task_id}/runNow"));
        let request = self.xml_request(Method::POST, &url, Some(&credential.token), None)?;
        let response = self.send_envelope(request, "run extract refresh", FailureKind::General).await?;
        let job = require(response.job, "job", "run extract refresh")?;

        debug!(task_id = %task_id, job_id = %job.id, "Queued extract refresh");
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{SITE, client_for, credential, ts_response};
    use mockito::Matcher;
    use tableau_abstraction::RestError;

    #[tokio::test]
    async fn test_run_extract_refresh() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/3.19/sites/S1/tasks/extractRefreshes/T9/runNow")
            .match_body(Matcher::Exact("<tsRequest/>".to_string()))
            .with_status(200)
            .with_body(ts_response(
                r#"<job id="J1" mode="Asynchronous" type="RefreshExtract" createdAt="2024-05-01T12:00:00Z"/>"#,
            ))
            .create_async()
            .await;

        let client = client_for(&server);
        let job = client.run_extract_refresh(&credential(), SITE, "T9").await.unwrap();
        assert_eq!(job.id, "J1");
        assert_eq!(job.kind.as_deref(), Some("RefreshExtract"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_extract_refresh_unknown_task() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/3.19/sites/S1/tasks/extractRefreshes/T0/runNow")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.run_extract_refresh(&credential(), SITE, "T0").await;
        assert!(matches!(result, Err(RestError::NotFound(_))));
        mock.assert_async().await;
    }
}
