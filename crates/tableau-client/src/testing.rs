//! Shared fixtures for the mockito-backed unit tests.

use crate::{ClientConfig, Credential, SessionClient};

pub(crate) const SITE: &str = "S1";

pub(crate) fn client_for(server: &mockito::ServerGuard) -> SessionClient {
    SessionClient::new(ClientConfig::new(server.url())).unwrap()
}

pub(crate) fn client_with(server: &mockito::ServerGuard, config: ClientConfig) -> SessionClient {
    SessionClient::new(ClientConfig { server_url: server.url(), ..config }).unwrap()
}

pub(crate) fn credential() -> Credential {
    Credential::new("T1", SITE, "U1")
}

/// Wraps a response section in a `tsResponse` document.
pub(crate) fn ts_response(inner: &str) -> String {
    format!(r#"<?xml version="1.0" encoding="UTF-8"?><tsResponse xmlns="http://tableau.com/api">{inner}</tsResponse>"#)
}

/// The file part of an upload body: everything between the last part header
/// and the closing boundary.
pub(crate) fn appended_chunk(body: &[u8]) -> Vec<u8> {
    let start = body.windows(4).rposition(|w| w == b"\r\n\r\n").map_or(0, |i| i + 4);
    let len = body[start..]
        .windows(4)
        .position(|w| w == b"\r\n--")
        .unwrap_or(body.len() - start);
    body[start..start + len].to_vec()
}
