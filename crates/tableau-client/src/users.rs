//! Site users.

use crate::client::{FailureKind, SessionClient, require};
use reqwest::Method;
use tableau_abstraction::{Credential, RestError, User};
use tracing::debug;

impl SessionClient {
    /// Lists the users on a site, optionally only those whose name equals `name_filter`.
    ///
    /// Returns the first page only.
    pub async fn query_users(
        &self,
        credential: &Credential,
        site_id: &str,
        name_filter: Option<&str>,
    ) -> Result<Vec<User>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/users"));
        let mut request = self.request(Method::GET, &url, Some(&credential.token));
        if let Some(name) = name_filter {
            request = request.query(&[("filter", format!("name:eq:{name}"))]);
        }

        let response = self.send_envelope(request, "query users", FailureKind::General).await?;
        let users = require(response.users, "users", "query users")?.items;

        debug!(site_id = %site_id, count = users.len(), "Queried users");
        Ok(users)
    }

    /// Finds a user by exact name.
    ///
    /// # Errors
    /// Returns `RestError::NotFound` if no user has that name.
    pub async fn find_user_by_name(
        &self,
        credential: &Credential,
        site_id: &str,
        name: &str,
    ) -> Result<User, RestError> {
        self.query_users(credential, site_id, Some(name))
            .await?
            .into_iter()
            .find(|u| u.name == name)
            .ok_or_else(|| RestError::NotFound(format!("No user named '{name}' on site {site_id}")))
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{SITE, client_for, credential, ts_response};
    use mockito::Matcher;
    use tableau_abstraction::RestError;

    #[tokio::test]
    async fn test_query_users_unfiltered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/3.19/sites/S1/users")
            .with_status(200)
            .with_body(ts_response(
                r#"<users><user id="U1" name="alice" siteRole="SiteAdministratorCreator" lastLogin="2024-03-01T10:00:00Z"/></users>"#,
            ))
            .create_async()
            .await;

        let client = client_for(&server);
        let users = client.query_users(&credential(), SITE, None).await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].last_login.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_user_by_name_uses_filter() {
        let mut server = mockito::Server::new_async().await;
        let found = server
            .mock("GET", "/api/3.19/sites/S1/users")
            .match_query(Matcher::UrlEncoded("filter".into(), "name:eq:bob".into()))
            .with_status(200)
            .with_body(ts_response(r#"<users><user id="U2" name="bob"/></users>"#))
            .create_async()
            .await;
        let empty = server
            .mock("GET", "/api/3.19/sites/S1/users")
            .match_query(Matcher::UrlEncoded("filter".into(), "name:eq:carol".into()))
            .with_status(200)
            .with_body(ts_response("<users/>"))
            .create_async()
            .await;

        let client = client_for(&server);
        let user = client.find_user_by_name(&credential(), SITE, "bob").await.unwrap();
        assert_eq!(user.id, "U2");

        let missing = client.find_user_by_name(&credential(), SITE, "carol").await;
        assert!(matches!(missing, Err(RestError::NotFound(_))));

        found.assert_async().await;
        empty.assert_async().await;
    }
}
