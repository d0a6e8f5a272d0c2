//! Pulse metric subscriptions and user preferences.
//!
//! Pulse lives under `/api/-/pulse` and speaks JSON. It accepts the same
//! `X-Tableau-Auth` token as the REST API.

use crate::client::{FailureKind, SessionClient};
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tableau_abstraction::{
    Credential, Follower, PreferencesUpdate, RestError, Subscription, SubscriptionPage,
    UserPreferences,
};
use tracing::{debug, warn};

const JSON: &str = "application/json";
const UPDATE_PREFERENCES_REQUEST: &str =
    "application/vnd.tableau.pulse.subscriptionservice.v1.UpdateUserPreferencesRequest+json";
const UPDATE_PREFERENCES_RESPONSE: &str =
    "application/vnd.tableau.pulse.subscriptionservice.v1.UpdateUserPreferencesResponse+json";

/// Largest page the subscription listing returns.
const PAGE_SIZE: &str = "1000";

#[derive(Serialize)]
struct CreateSubscription<'a> {
    metric_id: &'a str,
    follower: Follower,
}

#[derive(Serialize)]
struct BatchCreateSubscriptions<'a> {
    metric_id: &'a str,
    followers: Vec<Follower>,
}

/// Decodes a Pulse response that may wrap its payload in a `key` object.
fn decode_json<T: DeserializeOwned>(body: &[u8], key: &str, operation: &str) -> Result<T, RestError> {
    let mut value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        RestError::Serialization(format!("Failed to parse {operation} response: {e}"))
    })?;
    if let Some(inner) = value.get_mut(key).map(serde_json::Value::take) {
        value = inner;
    }
    serde_json::from_value(value)
        .map_err(|e| RestError::Serialization(format!("Failed to parse {operation} response: {e}")))
}

impl SessionClient {
    /// Returns the signed-in user's Pulse preferences.
    pub async fn get_pulse_preferences(
        &self,
        credential: &Credential,
    ) -> Result<UserPreferences, RestError> {
        let request = self.pulse_request(Method::GET, "user/preferences", &credential.token, JSON);
        let (_, body) = self.send_raw(request, "get pulse preferences", FailureKind::General).await?;
        decode_json(&body, "user_preferences", "get pulse preferences")
    }

    /// Updates Pulse preferences and returns the resulting preferences.
    ///
    /// Only the fields set on `update` change. An update with `user_id` set
    /// changes another user's preferences and requires administrator rights.
    /// When the server answers without a body, the preferences are fetched.
    ///
    /// # Errors
    /// Returns `RestError::Validation` if `update` sets no preference.
    pub async fn update_pulse_preferences(
        &self,
        credential: &Credential,
        update: &PreferencesUpdate,
    ) -> Result<UserPreferences, RestError> {
        if update.is_empty() {
            return Err(RestError::Validation("Preferences update sets no preference".to_string()));
        }

        debug!(
            user_id = update.user_id.as_deref().unwrap_or(credential.user_id.as_str()),
            "Updating Pulse preferences"
        );

        let request = self
            .pulse_request(
                Method::PATCH,
                "user/preferences",
                &credential.token,
                UPDATE_PREFERENCES_RESPONSE,
            )
            .header(CONTENT_TYPE, UPDATE_PREFERENCES_REQUEST)
            .json(update);
        let (_, body) = self.send_raw(request, "update pulse preferences", FailureKind::General).await?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return self.get_pulse_preferences(credential).await;
        }
        decode_json(&body, "user_preferences", "update pulse preferences")
    }

    /// Lists one page of subscriptions, optionally only those for `metric_id`.
    pub async fn list_subscriptions(
        &self,
        credential: &Credential,
        metric_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<SubscriptionPage, RestError> {
        let mut query = vec![("page_size", PAGE_SIZE)];
        if let Some(metric_id) = metric_id {
            query.push(("metric_id", metric_id));
        }
        if let Some(token) = page_token {
            query.push(("page_token", token));
        }

        let request = self
            .pulse_request(Method::GET, "subscriptions", &credential.token, JSON)
            .query(&query);
        let (_, body) = self.send_raw(request, "list subscriptions", FailureKind::General).await?;
        decode_json(&body, "subscription_page", "list subscriptions")
    }

    /// Returns every subscription to a metric, following page tokens.
    async fn metric_subscriptions(
        &self,
        credential: &Credential,
        metric_id: &str,
    ) -> Result<Vec<Subscription>, RestError> {
        let mut subscriptions = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .list_subscriptions(credential, Some(metric_id), page_token.as_deref())
                .await?;
            let next = page.next_token().map(str::to_string);
            subscriptions.extend(page.subscriptions);
            match next {
                Some(token) if page_token.as_deref() != Some(token.as_str()) => page_token = Some(token),
                _ => break,
            }
        }
        Ok(subscriptions)
    }

    /// Returns the ids of the users following a metric.
    pub async fn metric_followers(
        &self,
        credential: &Credential,
        metric_id: &str,
    ) -> Result<Vec<String>, RestError> {
        let followers: Vec<String> = self
            .metric_subscriptions(credential, metric_id)
            .await?
            .into_iter()
            .map(|s| s.follower.user_id)
            .collect();

        debug!(metric_id = %metric_id, count = followers.len(), "Queried metric followers");
        Ok(followers)
    }

    /// Subscribes a user to a metric.
    pub async fn create_subscription(
        &self,
        credential: &Credential,
        metric_id: &str,
        user_id: &str,
    ) -> Result<Subscription, RestError> {
        debug!(metric_id = %metric_id, user_id = %user_id, "Creating Pulse subscription");

        let payload = CreateSubscription {
            metric_id,
            follower: Follower { user_id: user_id.to_string() },
        };
        let request = self
            .pulse_request(Method::POST, "subscriptions", &credential.token, JSON)
            .json(&payload);
        let (_, body) = self.send_raw(request, "create subscription", FailureKind::General).await?;
        decode_json(&body, "subscription", "create subscription")
    }

    /// Subscribes several users to a metric in one request.
    ///
    /// An empty `user_ids` sends nothing.
    pub async fn batch_create_subscriptions(
        &self,
        credential: &Credential,
        metric_id: &str,
        user_ids: &[String],
    ) -> Result<Vec<Subscription>, RestError> {
        if user_ids.is_empty() {
            debug!(metric_id = %metric_id, "No followers to add");
            return Ok(Vec::new());
        }

        debug!(metric_id = %metric_id, count = user_ids.len(), "Batch creating Pulse subscriptions");

        let payload = BatchCreateSubscriptions {
            metric_id,
            followers: user_ids.iter().map(|id| Follower { user_id: id.clone() }).collect(),
        };
        let request = self
            .pulse_request(Method::POST, "subscriptions:batchCreate", &credential.token, JSON)
            .json(&payload);
        let (_, body) =
            self.send_raw(request, "batch create subscriptions", FailureKind::General).await?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        decode_json(&body, "subscriptions", "batch create subscriptions")
    }

    /// Deletes a subscription, so its follower stops following the metric.
    pub async fn delete_subscription(
        &self,
        credential: &Credential,
        subscription_id: &str,
    ) -> Result<(), RestError> {
        let request = self.pulse_request(
            Method::DELETE,
            &format!("subscriptions/{subscription_id}"),
            &credential.token,
            JSON,
        );
        self.send_empty(request, "delete subscription", FailureKind::General).await?;
        Ok(())
    }

    /// Makes the given users follow a metric, skipping users who already do.
    ///
    /// Returns the ids of the users that were added, in input order.
    pub async fn add_followers(
        &self,
        credential: &Credential,
        metric_id: &str,
        user_ids: &[String],
    ) -> Result<Vec<String>, RestError> {
        let existing: HashSet<String> =
            self.metric_followers(credential, metric_id).await?.into_iter().collect();

        let mut seen = HashSet::new();
        let to_add: Vec<String> = user_ids
            .iter()
            .filter(|id| !existing.contains(*id) && seen.insert(id.as_str()))
            .cloned()
            .collect();

        self.batch_create_subscriptions(credential, metric_id, &to_add).await?;
        debug!(metric_id = %metric_id, added = to_add.len(), "Added metric followers");
        Ok(to_add)
    }

    /// Stops the given users following a metric.
    ///
    /// Only existing subscriptions are deleted. Returns the ids of the users
    /// that were removed.
    pub async fn remove_followers(
        &self,
        credential: &Credential,
        metric_id: &str,
        user_ids: &[String],
    ) -> Result<Vec<String>, RestError> {
        let wanted: HashSet<&str> = user_ids.iter().map(String::as_str).collect();
        let mut removed = Vec::new();

        for subscription in self.metric_subscriptions(credential, metric_id).await? {
            if !wanted.contains(subscription.follower.user_id.as_str()) {
                continue;
            }
            if let Err(e) = self.delete_subscription(credential, &subscription.id).await {
                warn!(
                    metric_id = %metric_id,
                    subscription_id = %subscription.id,
                    error = %e,
                    "Failed to remove metric follower"
                );
                return Err(e);
            }
            removed.push(subscription.follower.user_id);
        }

        debug!(metric_id = %metric_id, removed = removed.len(), "Removed metric followers");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_for, credential};
    use mockito::Matcher;
    use tableau_abstraction::{Cadence, ChannelStatus, DeliveryChannel};

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_decode_json_unwraps_key() {
        let wrapped: Subscription = decode_json(
            br#"{"subscription": {"id": "SUB1", "metric_id": "M1", "follower": {"user_id": "U1"}}}"#,
            "subscription",
            "create subscription",
        )
        .unwrap();
        let bare: Subscription = decode_json(
            br#"{"id": "SUB1", "metric_id": "M1", "follower": {"user_id": "U1"}}"#,
            "subscription",
            "create subscription",
        )
        .unwrap();
        assert_eq!(wrapped, bare);
    }

    #[tokio::test]
    async fn test_get_pulse_preferences() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/-/pulse/user/preferences")
            .match_header("x-tableau-auth", "T1")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body(r#"{"user_preferences": {"cadence": "CADENCE_WEEKLY", "channel_preferences": []}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let preferences = client.get_pulse_preferences(&credential()).await.unwrap();
        assert_eq!(preferences.cadence, Some(Cadence::Weekly));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_pulse_preferences_uses_vendor_types() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/api/-/pulse/user/preferences")
            .match_header("content-type", UPDATE_PREFERENCES_REQUEST)
            .match_header("accept", UPDATE_PREFERENCES_RESPONSE)
            .match_body(Matcher::Json(serde_json::json!({
                "cadence": "CADENCE_DAILY",
                "channel_preferences_request": [
                    {"channel": "DELIVERY_CHANNEL_EMAIL", "status": "CHANNEL_STATUS_ENABLED"}
                ],
                "user_id": "U2"
            })))
            .with_status(200)
            .with_body(r#"{"user_preferences": {"cadence": "CADENCE_DAILY", "channel_preferences": [{"channel": "DELIVERY_CHANNEL_EMAIL", "status": "CHANNEL_STATUS_ENABLED"}]}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let update = PreferencesUpdate::default()
            .with_cadence(Cadence::Daily)
            .with_channel(DeliveryChannel::Email, ChannelStatus::Enabled)
            .for_user("U2");
        let preferences = client.update_pulse_preferences(&credential(), &update).await.unwrap();
        assert_eq!(preferences.cadence, Some(Cadence::Daily));
        assert_eq!(preferences.channel_preferences.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_preferences_update_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("PATCH", Matcher::Any).expect(0).create_async().await;

        let client = client_for(&server);
        let result = client
            .update_pulse_preferences(&credential(), &PreferencesUpdate::default().for_user("U2"))
            .await;
        assert!(matches!(result, Err(RestError::Validation(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_metric_followers_follows_page_tokens() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/api/-/pulse/subscriptions")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("metric_id".into(), "M1".into()),
                Matcher::UrlEncoded("page_size".into(), "1000".into()),
            ]))
            .expect(1)
            .with_status(200)
            .with_body(r#"{"subscriptions": [{"id": "SUB1", "follower": {"user_id": "U1"}}], "next_page_token": "p2"}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/-/pulse/subscriptions")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("metric_id".into(), "M1".into()),
                Matcher::UrlEncoded("page_token".into(), "p2".into()),
            ]))
            .expect(1)
            .with_status(200)
            .with_body(r#"{"subscriptions": [{"id": "SUB2", "follower": {"user_id": "U2"}}], "next_page_token": ""}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let followers = client.metric_followers(&credential(), "M1").await.unwrap();
        assert_eq!(followers, ids(&["U1", "U2"]));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_subscription() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/-/pulse/subscriptions")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "metric_id": "M1",
                "follower": {"user_id": "U3"}
            })))
            .with_status(201)
            .with_body(r#"{"subscription": {"id": "SUB3", "metric_id": "M1", "follower": {"user_id": "U3"}}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let subscription = client.create_subscription(&credential(), "M1", "U3").await.unwrap();
        assert_eq!(subscription.id, "SUB3");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_batch_create_with_no_users_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let client = client_for(&server);
        let created = client.batch_create_subscriptions(&credential(), "M1", &[]).await.unwrap();
        assert!(created.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_followers_skips_existing() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/api/-/pulse/subscriptions")
            .match_query(Matcher::UrlEncoded("metric_id".into(), "M1".into()))
            .with_status(200)
            .with_body(r#"{"subscriptions": [{"id": "SUB1", "follower": {"user_id": "U1"}}]}"#)
            .create_async()
            .await;
        let batch = server
            .mock("POST", "/api/-/pulse/subscriptions:batchCreate")
            .match_body(Matcher::Json(serde_json::json!({
                "metric_id": "M1",
                "followers": [{"user_id": "U2"}, {"user_id": "U3"}]
            })))
            .with_status(200)
            .with_body(r#"{"subscriptions": [{"id": "SUB2", "follower": {"user_id": "U2"}}, {"id": "SUB3", "follower": {"user_id": "U3"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let added = client
            .add_followers(&credential(), "M1", &ids(&["U1", "U2", "U3", "U2"]))
            .await
            .unwrap();
        assert_eq!(added, ids(&["U2", "U3"]));
        list.assert_async().await;
        batch.assert_async().await;
    }

    #[tokio::test]
    async fn test_remove_followers_deletes_matching_subscriptions() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/api/-/pulse/subscriptions")
            .match_query(Matcher::UrlEncoded("metric_id".into(), "M1".into()))
            .with_status(200)
            .with_body(r#"{"subscriptions": [{"id": "SUB1", "follower": {"user_id": "U1"}}, {"id": "SUB2", "follower": {"user_id": "U2"}}]}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/-/pulse/subscriptions/SUB2")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;
        let others = server
            .mock("DELETE", "/api/-/pulse/subscriptions/SUB1")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let removed = client
            .remove_followers(&credential(), "M1", &ids(&["U2", "U9"]))
            .await
            .unwrap();
        assert_eq!(removed, ids(&["U2"]));
        list.assert_async().await;
        delete.assert_async().await;
        others.assert_async().await;
    }
}
