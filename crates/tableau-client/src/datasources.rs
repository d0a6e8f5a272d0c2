//! Data source queries, downloads and in-place data updates. Publishing lives
//! in `publish`.

use crate::client::{FailureKind, SessionClient, require};
use crate::publish::{UploadSession, chunk_ranges};
use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use tableau_abstraction::{Credential, DataAction, DataSource, Job, RestError};
use tracing::debug;
use uuid::Uuid;

/// Header that identifies a data update request to the server.
const REQUEST_ID_HEADER: &str = "RequestID";

#[derive(Serialize)]
struct DataUpdate<'a> {
    actions: &'a [DataAction],
}

impl SessionClient {
    /// Lists the data sources on a site, optionally only those whose name equals `name_filter`.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the response carries no datasources section.
    pub async fn query_datasources(
        &self,
        credential: &Credential,
        site_id: &str,
        name_filter: Option<&str>,
    ) -> Result<Vec<DataSource>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/datasources"));
        let mut request = self.request(Method::GET, &url, Some(&credential.token));
        if let Some(name) = name_filter {
            request = request.query(&[("filter", format!("name:eq:{name}"))]);
        }

        let response = self.send_envelope(request, "query datasources", FailureKind::General).await?;
        let datasources = require(response.datasources, "datasources", "query datasources")?.items;

        debug!(site_id = %site_id, count = datasources.len(), "Queried data sources");
        Ok(datasources)
    }

    /// Finds a data source by exact name.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if no data source has that name.
    pub async fn find_datasource_by_name(
        &self,
        credential: &Credential,
        site_id: &str,
        name: &str,
    ) -> Result<DataSource, RestError> {
        self.query_datasources(credential, site_id, Some(name))
            .await?
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| {
                RestError::NotFound(format!("No data source named '{name}' on site {site_id}"))
            })
    }

    /// Downloads the data source file (`.tds` or `.tdsx`).
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if the data source does not exist.
    pub async fn download_datasource(
        &self,
        credential: &Credential,
        site_id: &str,
        datasource_id: &str,
    ) -> Result<Bytes, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/datasources/{datasource_id}/content"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let (_, body) = self.send_raw(request, "download datasource", FailureKind::General).await?;
        Ok(body)
    }

    /// Deletes a data source.
    pub async fn delete_datasource(
        &self,
        credential: &Credential,
        site_id: &str,
        datasource_id: &str,
    ) -> Result<(), RestError> {
        debug!(site_id = %site_id, datasource_id = %datasource_id, "Deleting data source");
        let url = self.api_url(&format!("sites/{site_id}/datasources/{datasource_id}"));
        let request = self.request(Method::DELETE, &url, Some(&credential.token));
        self.send_empty(request, "delete datasource", FailureKind::General).await?;
        Ok(())
    }

    /// Uploads a Hyper file of changed rows and applies `actions` to a
    /// published Hyper data source.
    ///
    /// The file goes up through an upload session in `chunk_size` appends.
    /// The server runs the update asynchronously; the returned job tracks it.
    ///
    /// # Errors
    /// Returns `RestError::Validation` if `actions` is empty (nothing is
    /// uploaded), or `RestError::Upload` if any step fails.
    pub async fn update_datasource_data(
        &self,
        credential: &Credential,
        site_id: &str,
        datasource_id: &str,
        data: Bytes,
        actions: &[DataAction],
    ) -> Result<Job, RestError> {
        require_actions(actions)?;

        let mut session = self.initiate_upload(credential, site_id).await?;
        for range in chunk_ranges(data.len(), self.config().chunk_size) {
            self.append_chunk(credential, site_id, &mut session, data.slice(range)).await?;
        }
        self.commit_datasource_update(credential, site_id, datasource_id, session, actions).await
    }

    /// Applies `actions` to a published Hyper data source using the file held
    /// by an upload session. Consumes the session.
    ///
    /// # Errors
    /// Returns `RestError::Validation` if `actions` is empty, or
    /// `RestError::Upload` if the server rejects the update.
    pub async fn commit_datasource_update(
        &self,
        credential: &Credential,
        site_id: &str,
        datasource_id: &str,
        session: UploadSession,
        actions: &[DataAction],
    ) -> Result<Job, RestError> {
        require_actions(actions)?;

        let request_id = Uuid::new_v4().to_string();
        debug!(
            datasource_id = %datasource_id,
            upload_session_id = %session.session_id(),
            request_id = %request_id,
            actions = actions.len(),
            "Updating data source data"
        );

        let url = self.api_url(&format!("sites/{site_id}/datasources/{datasource_id}/data"));
        let request = self
            .request(Method::PATCH, &url, Some(&credential.token))
            .query(&[("uploadSessionId", session.session_id())])
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .json(&DataUpdate { actions });
        let response =
            self.send_envelope(request, "update datasource data", FailureKind::Upload).await?;

        require(response.job, "job", "update datasource data")
            .map_err(|e| RestError::Upload(e.to_string()))
    }
}

fn require_actions(actions: &[DataAction]) -> Result<(), RestError> {
    if actions.is_empty() {
        return Err(RestError::Validation("A data update needs at least one action".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::ClientConfig;
    use crate::testing::{SITE, appended_chunk, client_for, client_with, credential, ts_response};
    use bytes::Bytes;
    use mockito::Matcher;
    use std::sync::{Arc, Mutex};
    use tableau_abstraction::{DataAction, RestError};

    const FILE_UPLOAD: &str = r#"<fileUpload uploadSessionId="5:HY" fileSize="0"/>"#;

    #[tokio::test]
    async fn test_query_datasources() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/3.19/sites/S1/datasources")
            .with_status(200)
            .with_body(ts_response(
                r#"<datasources><datasource id="D1" name="Orders" type="hyper"><project id="P1"/></datasource></datasources>"#,
            ))
            .create_async()
            .await;

        let client = client_for(&server);
        let datasources = client.query_datasources(&credential(), SITE, None).await.unwrap();
        assert_eq!(datasources.len(), 1);
        assert_eq!(datasources[0].kind.as_deref(), Some("hyper"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_datasource_by_name_filters_on_server() {
        let mut server = mockito::Server::new_async().await;
        let found = server
            .mock("GET", "/api/3.19/sites/S1/datasources")
            .match_query(Matcher::UrlEncoded("filter".into(), "name:eq:Sales Data".into()))
            .with_status(200)
            .with_body(ts_response(
                r#"<datasources><datasource id="D2" name="Sales Data"/></datasources>"#,
            ))
            .create_async()
            .await;
        let missing = server
            .mock("GET", "/api/3.19/sites/S1/datasources")
            .match_query(Matcher::UrlEncoded("filter".into(), "name:eq:Archive".into()))
            .with_status(200)
            .with_body(ts_response("<datasources/>"))
            .create_async()
            .await;

        let client = client_for(&server);
        let datasource = client.find_datasource_by_name(&credential(), SITE, "Sales Data").await.unwrap();
        assert_eq!(datasource.id, "D2");

        let result = client.find_datasource_by_name(&credential(), SITE, "Archive").await;
        assert!(matches!(result, Err(RestError::NotFound(_))));

        found.assert_async().await;
        missing.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_then_delete_datasource() {
        let mut server = mockito::Server::new_async().await;
        let download = server
            .mock("GET", "/api/3.19/sites/S1/datasources/D1/content")
            .with_status(200)
            .with_body("tdsx-bytes")
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/3.19/sites/S1/datasources/D1")
            .with_status(204)
            .create_async()
            .await;

        let client = client_for(&server);
        let bytes = client.download_datasource(&credential(), SITE, "D1").await.unwrap();
        assert_eq!(bytes.as_ref(), b"tdsx-bytes");
        client.delete_datasource(&credential(), SITE, "D1").await.unwrap();

        download.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_datasource_data_uploads_then_patches() {
        let mut server = mockito::Server::new_async().await;
        let initiate = server
            .mock("POST", "/api/3.19/sites/S1/fileUploads")
            .with_status(201)
            .with_body(ts_response(FILE_UPLOAD))
            .expect(1)
            .create_async()
            .await;

        let received = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&received);
        let append = server
            .mock("PUT", "/api/3.19/sites/S1/fileUploads/5:HY")
            .with_status(200)
            .with_body_from_request(move |request| {
                let body = request.body().map(|b| b.to_vec()).unwrap_or_default();
                recorder.lock().unwrap().push(appended_chunk(&body));
                ts_response(FILE_UPLOAD).into_bytes()
            })
            .expect(2)
            .create_async()
            .await;
        let update = server
            .mock("PATCH", "/api/3.19/sites/S1/datasources/D1/data")
            .match_query(Matcher::UrlEncoded("uploadSessionId".into(), "5:HY".into()))
            .match_header("x-tableau-auth", "T1")
            .match_header("content-type", "application/json")
            .match_header("requestid", Matcher::Regex("^[0-9a-f-]{36}$".to_string()))
            .match_body(Matcher::Json(serde_json::json!({
                "actions": [{
                    "action": "upsert",
                    "target-schema": "Sales",
                    "target-table": "Sales",
                    "source-schema": "Sales",
                    "source-table": "Sales_Delta",
                    "condition": {"op": "eq", "target-col": "Order Number", "source-col": "Order Number"}
                }]
            })))
            .with_status(202)
            .with_body(ts_response(r#"<job id="J9" mode="Asynchronous" type="UpdateUploadedFile"/>"#))
            .create_async()
            .await;

        let client = client_with(&server, ClientConfig::default().with_chunk_size(6));
        let actions = [DataAction::upsert("Sales", "Sales", "Sales", "Sales_Delta")
            .matching_column("Order Number")];
        let job = client
            .update_datasource_data(&credential(), SITE, "D1", Bytes::from_static(b"hyper-delta"), &actions)
            .await
            .unwrap();
        assert_eq!(job.id, "J9");
        assert_eq!(job.kind.as_deref(), Some("UpdateUploadedFile"));

        let chunks = received.lock().unwrap().clone();
        assert_eq!(chunks, vec![b"hyper-".to_vec(), b"delta".to_vec()]);

        initiate.assert_async().await;
        append.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_without_actions_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let client = client_for(&server);
        let result = client
            .update_datasource_data(&credential(), SITE, "D1", Bytes::from_static(b"x"), &[])
            .await;
        assert!(matches!(result, Err(RestError::Validation(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_update_is_upload_error() {
        let mut server = mockito::Server::new_async().await;
        let initiate = server
            .mock("POST", "/api/3.19/sites/S1/fileUploads")
            .with_status(201)
            .with_body(ts_response(FILE_UPLOAD))
            .create_async()
            .await;
        let append = server
            .mock("PUT", "/api/3.19/sites/S1/fileUploads/5:HY")
            .with_status(200)
            .with_body(ts_response(FILE_UPLOAD))
            .create_async()
            .await;
        let update = server
            .mock("PATCH", "/api/3.19/sites/S1/datasources/D1/data")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(ts_response(
                r#"<error code="400011"><summary>Bad Request</summary><detail>Table Sales_Delta not found</detail></error>"#,
            ))
            .create_async()
            .await;

        let client = client_for(&server);
        let mut session = client.initiate_upload(&credential(), SITE).await.unwrap();
        client
            .append_chunk(&credential(), SITE, &mut session, Bytes::from_static(b"rows"))
            .await
            .unwrap();
        let actions = [DataAction::insert("Sales", "Sales", "Sales", "Sales_Delta")];
        let result = client.commit_datasource_update(&credential(), SITE, "D1", session, &actions).await;
        match result {
            Err(RestError::Upload(msg)) => assert!(msg.contains("400011")),
            other => panic!("Expected Upload error, got {other:?}"),
        }

        initiate.assert_async().await;
        append.assert_async().await;
        update.assert_async().await;
    }
}
