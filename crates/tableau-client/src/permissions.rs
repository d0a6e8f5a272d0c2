//! Workbook permissions.

use crate::client::{FailureKind, SessionClient, require};
use crate::xml::XmlElement;
use reqwest::Method;
use std::collections::BTreeMap;
use tableau_abstraction::{Credential, PermissionMode, Permissions, RestError};
use tracing::debug;

/// The user or group a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grantee {
    Group(String),
    User(String),
}

impl Grantee {
    fn element(&self) -> XmlElement {
        match self {
            Self::Group(id) => XmlElement::new("group").attr("id", id.as_str()),
            Self::User(id) => XmlElement::new("user").attr("id", id.as_str()),
        }
    }

    /// Path segment used by the delete endpoint, e.g. `groups/G1`.
    fn path(&self) -> String {
        match self {
            Self::Group(id) => format!("groups/{id}"),
            Self::User(id) => format!("users/{id}"),
        }
    }
}

/// Capabilities granted to one grantee, e.g. group G1 may `Read` but not `Write`.
///
/// Capability names are not checked locally; the server rejects unknown names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub grantee: Grantee,
    pub capabilities: BTreeMap<String, PermissionMode>,
}

impl Grant {
    #[must_use]
    pub fn group(group_id: impl Into<String>) -> Self {
        Self { grantee: Grantee::Group(group_id.into()), capabilities: BTreeMap::new() }
    }

    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self { grantee: Grantee::User(user_id.into()), capabilities: BTreeMap::new() }
    }

    #[must_use]
    pub fn with(mut self, capability: impl Into<String>, mode: PermissionMode) -> Self {
        self.capabilities.insert(capability.into(), mode);
        self
    }

    #[must_use]
    pub fn allow(self, capability: impl Into<String>) -> Self {
        self.with(capability, PermissionMode::Allow)
    }

    #[must_use]
    pub fn deny(self, capability: impl Into<String>) -> Self {
        self.with(capability, PermissionMode::Deny)
    }

    fn element(&self) -> XmlElement {
        let capabilities = self.capabilities.iter().map(|(name, mode)| {
            XmlElement::new("capability").attr("name", name.as_str()).attr("mode", mode.as_str())
        });
        XmlElement::new("granteeCapabilities")
            .child(self.grantee.element())
            .child(XmlElement::new("capabilities").children(capabilities))
    }
}

fn permissions_element(workbook_id: &str, grants: &[Grant]) -> XmlElement {
    XmlElement::new("permissions")
        .child(XmlElement::new("workbook").attr("id", workbook_id))
        .children(grants.iter().map(Grant::element))
}

impl SessionClient {
    /// Adds capabilities to a workbook and returns the permissions the server applied.
    ///
    /// # Errors
    /// Returns `RestError::Validation` if `grants` is empty or a grant has no
    /// capabilities (no request is sent), or if the server rejects a capability
    /// name or mode.
    pub async fn add_workbook_permissions(
        &self,
        credential: &Credential,
        site_id: &str,
        workbook_id: &str,
        grants: &[Grant],
    ) -> Result<Permissions, RestError> {
        if grants.is_empty() {
            return Err(RestError::Validation("No permission grants given".to_string()));
        }
        if let Some(empty) = grants.iter().find(|g| g.capabilities.is_empty()) {
            return Err(RestError::Validation(format!(
                "Grant for {:?} has no capabilities",
                empty.grantee
            )));
        }

        debug!(
            site_id = %site_id,
            workbook_id = %workbook_id,
            grants = grants.len(),
            "Adding workbook permissions"
        );

        let url = self.api_url(&format!("sites/{site_id}/workbooks/{workbook_id}/permissions"));
        let body = permissions_element(workbook_id, grants);
        let request = self.xml_request(Method::PUT, &url, Some(&credential.token), Some(body))?;
        let response =
            self.send_envelope(request, "add workbook permissions", FailureKind::General).await?;
        require(response.permissions, "permissions", "add workbook permissions")
    }

    /// Lists the explicit permissions on a workbook.
    pub async fn query_workbook_permissions(
        &self,
        credential: &Credential,
        site_id: &str,
        workbook_id: &str,
    ) -> Result<Permissions, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/workbooks/{workbook_id}/permissions"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response =
            self.send_envelope(request, "query workbook permissions", FailureKind::General).await?;
        require(response.permissions, "permissions", "query workbook permissions")
    }

    /// Removes one capability from a grantee.
    ///
    /// `mode` must be the mode currently recorded for the capability.
    pub async fn delete_workbook_permission(
        &self,
        credential: &Credential,
        site_id: &str,
        workbook_id: &str,
        grantee: &Grantee,
        capability: &str,
        mode: PermissionMode,
    ) -> Result<(), RestError> {
        debug!(workbook_id = %workbook_id, capability = %capability, mode = %mode, "Deleting workbook permission");

        let url = self.api_url(&format!(
            "sites/{site_id}/workbooks/{workbook_id}/permissions/{}/{capability}/{mode}",
            grantee.path()
        ));
        let request = self.request(Method::DELETE, &url, Some(&credential.token));
        self.send_empty(request, "delete workbook permission", FailureKind::General).await?;
        Ok(())
    }
}
