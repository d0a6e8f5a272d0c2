//! Publishing workbooks and data sources.
//!
//! Files up to the configured single-request limit go up in one
//! `multipart/mixed` POST. Larger files use an upload session:
//!
//! 1. `initiate_upload` opens a session on the site.
//! 2. `append_chunk` sends the file in order, one chunk per PUT. The server
//!    assembles the file by call order, so appends are never concurrent.
//! 3. `finalize_publish` commits the session as a workbook.
//!
//! A failed append aborts the publish. Sessions cannot be resumed; the caller
//! starts over with a new session.

use crate::client::{FailureKind, SessionClient, require};
use crate::multipart::{FILE_UPLOAD_PART, MixedBody, PAYLOAD_PART};
use crate::xml::{XmlElement, ts_request};
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use std::ops::Range;
use std::path::Path;
use tableau_abstraction::{Credential, DataSource, RestError, TsResponse, Workbook};
use tracing::{debug, error};

/// An open file upload session.
///
/// Finalizing consumes the session, so its id cannot be reused.
#[derive(Debug, PartialEq, Eq)]
pub struct UploadSession {
    session_id: String,
    bytes_sent: u64,
}

impl UploadSession {
    /// Server-assigned upload session id.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Bytes appended so far.
    #[must_use]
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}

/// The kind of content being published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// A `.twb` or `.twbx` workbook.
    Workbook,
    /// A `.tds`, `.tdsx` or `.hyper` data source.
    Datasource,
}

impl ContentKind {
    fn collection(self) -> &'static str {
        match self {
            Self::Workbook => "workbooks",
            Self::Datasource => "datasources",
        }
    }

    fn element(self) -> &'static str {
        match self {
            Self::Workbook => "workbook",
            Self::Datasource => "datasource",
        }
    }

    /// Name of the file part of a single-request publish.
    fn file_part(self) -> &'static str {
        match self {
            Self::Workbook => "tableau_workbook",
            Self::Datasource => "tableau_datasource",
        }
    }

    /// Query parameter that names the file extension.
    fn type_param(self) -> &'static str {
        match self {
            Self::Workbook => "workbookType",
            Self::Datasource => "datasourceType",
        }
    }

    /// File extension assumed when none is given.
    pub fn default_file_type(self) -> &'static str {
        match self {
            Self::Workbook => "twbx",
            Self::Datasource => "tdsx",
        }
    }
}

/// A file to publish and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub site_id: String,
    pub project_id: String,
    /// Display name of the published content.
    pub name: String,
    /// File extension without the dot, e.g. "twbx". Defaults per content kind.
    pub file_type: Option<String>,
    /// Replace existing content with the same name.
    pub overwrite: bool,
    pub content: Bytes,
}

impl PublishRequest {
    #[must_use]
    pub fn new(
        site_id: impl Into<String>,
        project_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            project_id: project_id.into(),
            name: name.into(),
            file_type: None,
            overwrite: false,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    fn file_type_for(&self, kind: ContentKind) -> &str {
        self.file_type.as_deref().unwrap_or_else(|| kind.default_file_type())
    }

    fn content_len(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Metadata shared by the single-request and session publishes.
struct PublishTarget<'a> {
    kind: ContentKind,
    site_id: &'a str,
    project_id: &'a str,
    name: &'a str,
    file_type: &'a str,
    overwrite: bool,
}

impl<'a> PublishTarget<'a> {
    fn of(kind: ContentKind, request: &'a PublishRequest) -> Self {
        Self {
            kind,
            site_id: &request.site_id,
            project_id: &request.project_id,
            name: &request.name,
            file_type: request.file_type_for(kind),
            overwrite: request.overwrite,
        }
    }

    fn payload(&self) -> Result<String, RestError> {
        ts_request(Some(
            XmlElement::new(self.kind.element())
                .attr("name", self.name)
                .child(XmlElement::new("project").attr("id", self.project_id)),
        ))
    }

    fn filename(&self) -> String {
        format!("{}.{}", self.name, self.file_type)
    }

    fn query(&self, upload_session_id: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(3);
        if let Some(id) = upload_session_id {
            query.push(("uploadSessionId", id.to_string()));
        }
        query.push((self.kind.type_param(), self.file_type.to_string()));
        query.push(("overwrite", self.overwrite.to_string()));
        query
    }
}

/// Splits `len` bytes into consecutive ranges of at most `chunk_size` bytes.
///
/// An empty input yields no ranges.
pub(crate) fn chunk_ranges(len: usize, chunk_size: usize) -> impl Iterator<Item = Range<usize>> {
    let step = chunk_size.max(1);
    (0..len).step_by(step).map(move |start| start..(start + step).min(len))
}

impl SessionClient {
    /// Opens an upload session on a site.
    ///
    /// # Errors
    /// Returns `RestError::Upload` if the server rejects the request or returns
    /// no upload session id.
    pub async fn initiate_upload(
        &self,
        credential: &Credential,
        site_id: &str,
    ) -> Result<UploadSession, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/fileUploads"));
        let request = self.request(Method::POST, &url, Some(&credential.token));
        let response = self.send_envelope(request, "initiate upload", FailureKind::Upload).await?;

        let upload = require(response.file_upload, "fileUpload", "initiate upload")
            .map_err(|e| RestError::Upload(e.to_string()))?;
        if upload.upload_session_id.is_empty() {
            return Err(RestError::Upload("initiate upload returned an empty session id".to_string()));
        }

        debug!(site_id = %site_id, upload_session_id = %upload.upload_session_id, "Initiated upload session");
        Ok(UploadSession { session_id: upload.upload_session_id, bytes_sent: 0 })
    }

    /// Appends the next chunk of the file to an upload session.
    ///
    /// `bytes_sent` only advances when the server accepts the chunk.
    ///
    /// # Errors
    /// Returns `RestError::Upload` if the server rejects the chunk.
    pub async fn append_chunk(
        &self,
        credential: &Credential,
        site_id: &str,
        session: &mut UploadSession,
        chunk: Bytes,
    ) -> Result<(), RestError> {
        let chunk_len = chunk.len() as u64;
        let url = self.api_url(&format!("sites/{site_id}/fileUploads/{}", session.session_id));
        let body = MixedBody::new()
            .xml_part(PAYLOAD_PART, "")
            .file_part(FILE_UPLOAD_PART, "file", chunk);

        let request = self
            .request(Method::PUT, &url, Some(&credential.token))
            .header(CONTENT_TYPE, body.content_type())
            .body(body.into_bytes());
        self.send_empty(request, "append chunk", FailureKind::Upload).await?;

        session.bytes_sent += chunk_len;
        debug!(
            upload_session_id = %session.session_id,
            chunk = chunk_len,
            bytes_sent = session.bytes_sent,
            "Appended chunk"
        );
        Ok(())
    }

    /// Commits an upload session as a `.twbx` workbook without overwriting.
    ///
    /// The session's appended byte count must equal `expected_len`; otherwise
    /// no request is sent.
    ///
    /// # Errors
    /// Returns `RestError::Upload` on a size mismatch or if the server rejects
    /// the publish.
    pub async fn finalize_publish(
        &self,
        credential: &Credential,
        site_id: &str,
        project_id: &str,
        name: &str,
        session: UploadSession,
        expected_len: u64,
    ) -> Result<Workbook, RestError> {
        self.finalize_publish_as(
            credential,
            site_id,
            project_id,
            name,
            ContentKind::Workbook.default_file_type(),
            false,
            session,
            expected_len,
        )
        .await
    }

    /// Commits an upload session as a workbook of `file_type`, e.g. "twb".
    ///
    /// # Errors
    /// Returns `RestError::Upload` on a size mismatch or if the server rejects
    /// the publish.
    pub async fn finalize_publish_as(
        &self,
        credential: &Credential,
        site_id: &str,
        project_id: &str,
        name: &str,
        file_type: &str,
        overwrite: bool,
        session: UploadSession,
        expected_len: u64,
    ) -> Result<Workbook, RestError> {
        let target = PublishTarget {
            kind: ContentKind::Workbook,
            site_id,
            project_id,
            name,
            file_type,
            overwrite,
        };
        let response = self.finalize(credential, &target, session, expected_len).await?;
        require_upload(response.workbook, "workbook", "finalize publish")
    }

    /// Publishes a workbook in a single request.
    ///
    /// The server enforces its own size limit for single-request publishing.
    ///
    /// # Errors
    /// Returns `RestError::Upload` if the server rejects the publish.
    pub async fn publish_workbook_simple(
        &self,
        credential: &Credential,
        site_id: &str,
        project_id: &str,
        name: &str,
        file_bytes: Bytes,
    ) -> Result<Workbook, RestError> {
        let request = PublishRequest::new(site_id, project_id, name, file_bytes);
        let target = PublishTarget::of(ContentKind::Workbook, &request);
        let response = self.publish_single(credential, &target, request.content.clone()).await?;
        require_upload(response.workbook, "workbook", "publish workbook")
    }

    /// Publishes a workbook through an upload session, `chunk_size` bytes per append.
    ///
    /// # Errors
    /// Returns `RestError::Upload` if any step fails. The publish is aborted at
    /// the first failed append.
    pub async fn publish_workbook_chunked(
        &self,
        credential: &Credential,
        site_id: &str,
        project_id: &str,
        name: &str,
        file_bytes: Bytes,
    ) -> Result<Workbook, RestError> {
        let request = PublishRequest::new(site_id, project_id, name, file_bytes);
        let target = PublishTarget::of(ContentKind::Workbook, &request);
        let response = self.publish_chunked(credential, &target, &request.content).await?;
        require_upload(response.workbook, "workbook", "publish workbook")
    }

    /// Publishes a workbook, choosing a single request or an upload session by size.
    ///
    /// # Errors
    /// Returns `RestError::Upload` if the publish fails.
    pub async fn publish_workbook(
        &self,
        credential: &Credential,
        request: &PublishRequest,
    ) -> Result<Workbook, RestError> {
        let response = self.publish(credential, ContentKind::Workbook, request).await?;
        require_upload(response.workbook, "workbook", "publish workbook")
    }

    /// Publishes a data source, choosing a single request or an upload session by size.
    ///
    /// # Errors
    /// Returns `RestError::Upload` if the publish fails.
    pub async fn publish_datasource(
        &self,
        credential: &Credential,
        request: &PublishRequest,
    ) -> Result<DataSource, RestError> {
        let response = self.publish(credential, ContentKind::Datasource, request).await?;
        require_upload(response.datasource, "datasource", "publish datasource")
    }

    /// Reads a workbook file and publishes it under its file stem.
    ///
    /// The extension becomes the workbook type.
    ///
    /// # Errors
    /// Returns `RestError::Upload` if the file cannot be read or has no
    /// usable name, or if the publish fails.
    pub async fn publish_workbook_file(
        &self,
        credential: &Credential,
        site_id: &str,
        project_id: &str,
        path: &Path,
        overwrite: bool,
    ) -> Result<Workbook, RestError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RestError::Upload(format!("{} has no file name", path.display())))?;
        let file_type = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_else(|| ContentKind::Workbook.default_file_type());

        let content = tokio::fs::read(path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to read workbook file");
            RestError::Upload(format!("Failed to read {}: {e}", path.display()))
        })?;

        let request = PublishRequest::new(site_id, project_id, name, content)
            .with_file_type(file_type)
            .with_overwrite(overwrite);
        self.publish_workbook(credential, &request).await
    }

    async fn publish(
        &self,
        credential: &Credential,
        kind: ContentKind,
        request: &PublishRequest,
    ) -> Result<TsResponse, RestError> {
        let target = PublishTarget::of(kind, request);
        if request.content_len() > self.config().single_request_limit {
            self.publish_chunked(credential, &target, &request.content).await
        } else {
            self.publish_single(credential, &target, request.content.clone()).await
        }
    }

    async fn publish_single(
        &self,
        credential: &Credential,
        target: &PublishTarget<'_>,
        content: Bytes,
    ) -> Result<TsResponse, RestError> {
        debug!(
            site_id = %target.site_id,
            project_id = %target.project_id,
            bytes = content.len(),
            "Publishing {} in a single request",
            target.kind.element()
        );

        let url = self.api_url(&format!("sites/{}/{}", target.site_id, target.kind.collection()));
        let body = MixedBody::new()
            .xml_part(PAYLOAD_PART, target.payload()?)
            .file_part(target.kind.file_part(), &target.filename(), content);

        let request = self
            .request(Method::POST, &url, Some(&credential.token))
            .query(&target.query(None))
            .header(CONTENT_TYPE, body.content_type())
            .body(body.into_bytes());
        self.send_envelope(request, "publish", FailureKind::Upload).await
    }

    async fn publish_chunked(
        &self,
        credential: &Credential,
        target: &PublishTarget<'_>,
        content: &Bytes,
    ) -> Result<TsResponse, RestError> {
        let chunk_size = self.config().chunk_size;
        debug!(
            site_id = %target.site_id,
            project_id = %target.project_id,
            bytes = content.len(),
            chunk_size,
            "Publishing {} through an upload session",
            target.kind.element()
        );

        let mut session = self.initiate_upload(credential, target.site_id).await?;
        for range in chunk_ranges(content.len(), chunk_size) {
            self.append_chunk(credential, target.site_id, &mut session, content.slice(range)).await?;
        }
        self.finalize(credential, target, session, content.len() as u64).await
    }

    async fn finalize(
        &self,
        credential: &Credential,
        target: &PublishTarget<'_>,
        session: UploadSession,
        expected_len: u64,
    ) -> Result<TsResponse, RestError> {
        if session.bytes_sent != expected_len {
            error!(
                upload_session_id = %session.session_id,
                bytes_sent = session.bytes_sent,
                expected_len,
                "Upload session size does not match the file"
            );
            return Err(RestError::Upload(format!(
                "Upload session {} holds {} bytes but the file has {} bytes",
                session.session_id, session.bytes_sent, expected_len
            )));
        }

        let url = self.api_url(&format!("sites/{}/{}", target.site_id, target.kind.collection()));
        let body = MixedBody::new().xml_part(PAYLOAD_PART, target.payload()?);

        let request = self
            .request(Method::POST, &url, Some(&credential.token))
            .query(&target.query(Some(&session.session_id)))
            .header(CONTENT_TYPE, body.content_type())
            .body(body.into_bytes());
        let response = self.send_envelope(request, "finalize publish", FailureKind::Upload).await?;

        debug!(upload_session_id = %session.session_id, "Finalized upload session");
        Ok(response)
    }
}

fn require_upload<T>(section: Option<T>, name: &str, operation: &str) -> Result<T, RestError> {
    require(section, name, operation).map_err(|e| RestError::Upload(e.to_string()))
}
