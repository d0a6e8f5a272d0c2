//! Local groups and their membership.

use crate::client::{FailureKind, SessionClient, require};
use crate::xml::XmlElement;
use reqwest::Method;
use tableau_abstraction::{Credential, Group, RestError, User};
use tracing::debug;

impl SessionClient {
    /// Creates a local group.
    ///
    /// # Errors
    /// Returns `RestError::Api` with status 409 if a group with that name exists.
    pub async fn create_group(
        &self,
        credential: &Credential,
        site_id: &str,
        name: &str,
    ) -> Result<Group, RestError> {
        debug!(site_id = %site_id, name = %name, "Creating group");

        let url = self.api_url(&format!("sites/{site_id}/groups"));
        let group = XmlElement::new("group").attr("name", name);
        let request = self.xml_request(Method::POST, &url, Some(&credential.token), Some(group))?;
        let response = self.send_envelope(request, "create group", FailureKind::General).await?;
        require(response.group, "group", "create group")
    }

    pub async fn query_groups(
        &self,
        credential: &Credential,
        site_id: &str,
    ) -> Result<Vec<Group>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/groups"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response = self.send_envelope(request, "query groups", FailureKind::General).await?;
        Ok(require(response.groups, "groups", "query groups")?.items)
    }

    /// Lists the members of a group.
    pub async fn query_group_users(
        &self,
        credential: &Credential,
        site_id: &str,
        group_id: &str,
    ) -> Result<Vec<User>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/groups/{group_id}/users"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response = self.send_envelope(request, "query group users", FailureKind::General).await?;
        let users = require(response.users, "users", "query group users")?.items;

        debug!(group_id = %group_id, count = users.len(), "Queried group members");
        Ok(users)
    }

    /// Adds a user to a group and returns the added user.
    ///
    /// # Errors
    /// Returns `RestError::Api` with status 409 if the user is already a member.
    pub async fn add_user_to_group(
        &self,
        credential: &Credential,
        site_id: &str,
        group_id: &str,
        user_id: &str,
    ) -> Result<User, RestError> {
        debug!(group_id = %group_id, user_id = %user_id, "Adding user to group");

        let url = self.api_url(&format!("sites/{site_id}/groups/{group_id}/users"));
        let user = XmlElement::new("user").attr("id", user_id);
        let request = self.xml_request(Method::POST, &url, Some(&credential.token), Some(user))?;
        let response = self.send_envelope(request, "add user to group", FailureKind::General).await?;
        require(response.user, "user", "add user to group")
    }
}
