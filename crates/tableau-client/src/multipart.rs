//! `multipart/mixed` bodies for publish and file-upload requests.
//!
//! Tableau rejects `multipart/form-data` on these endpoints, so the body is
//! assembled here rather than with `reqwest::multipart`.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// Name of the XML part carried by every publish and append request.
pub(crate) const PAYLOAD_PART: &str = "request_payload";

/// Name of the file part of an append-to-upload request.
pub(crate) const FILE_UPLOAD_PART: &str = "tableau_file";

const XML_TYPE: &str = "text/xml";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone)]
struct MixedPart {
    name: String,
    filename: Option<String>,
    content_type: &'static str,
    body: Bytes,
}

/// A `multipart/mixed` body under construction.
#[derive(Debug, Clone)]
pub(crate) struct MixedBody {
    boundary: String,
    parts: Vec<MixedPart>,
}

impl MixedBody {
    pub(crate) fn new() -> Self {
        Self::with_boundary(Uuid::new_v4().simple().to_string())
    }

    pub(crate) fn with_boundary(boundary: impl Into<String>) -> Self {
        Self { boundary: boundary.into(), parts: Vec::new() }
    }

    /// Adds a `text/xml` part.
    pub(crate) fn xml_part(mut self, name: &str, xml: impl Into<String>) -> Self {
        self.parts.push(MixedPart {
            name: name.to_string(),
            filename: None,
            content_type: XML_TYPE,
            body: Bytes::from(xml.into()),
        });
        self
    }

    /// Adds an `application/octet-stream` part with a filename.
    pub(crate) fn file_part(mut self, name: &str, filename: &str, body: Bytes) -> Self {
        self.parts.push(MixedPart {
            name: name.to_string(),
            filename: Some(filename.to_string()),
            content_type: OCTET_STREAM,
            body,
        });
        self
    }

    /// Returns the `Content-Type` header value for this body.
    pub(crate) fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }

    /// Renders the body.
    pub(crate) fn into_bytes(self) -> Bytes {
        let payload_len: usize = self.parts.iter().map(|p| p.body.len() + 128).sum();
        let mut out = BytesMut::with_capacity(payload_len + self.boundary.len() + 8);

        for part in &self.parts {
            out.put_slice(b"--");
            out.put_slice(self.boundary.as_bytes());
            out.put_slice(b"\r\nContent-Disposition: name=\"");
            out.put_slice(part.name.as_bytes());
            out.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                out.put_slice(b"; filename=\"");
                out.put_slice(filename.as_bytes());
                out.put_slice(b"\"");
            }
            out.put_slice(b"\r\nContent-Type: ");
            out.put_slice(part.content_type.as_bytes());
            out.put_slice(b"\r\n\r\n");
            out.put_slice(&part.body);
            out.put_slice(b"\r\n");
        }

        out.put_slice(b"--");
        out.put_slice(self.boundary.as_bytes());
        out.put_slice(b"--\r\n");
        out.freeze()
    }
}
