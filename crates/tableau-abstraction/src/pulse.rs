//! Pulse subscription and preference records.
//!
//! The Pulse API lives under `/api/-/pulse` and speaks JSON with snake_case keys.

use serde::{Deserialize, Serialize};

/// How often Pulse sends digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cadence {
    #[serde(rename = "CADENCE_DAILY")]
    Daily,
    #[serde(rename = "CADENCE_WEEKLY")]
    Weekly,
    #[serde(rename = "CADENCE_MONTHLY")]
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryChannel {
    #[serde(rename = "DELIVERY_CHANNEL_EMAIL")]
    Email,
    #[serde(rename = "DELIVERY_CHANNEL_SLACK")]
    Slack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    #[serde(rename = "CHANNEL_STATUS_ENABLED")]
    Enabled,
    #[serde(rename = "CHANNEL_STATUS_DISABLED")]
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBy {
    #[serde(rename = "GROUP_BY_DEFINITION_NAME")]
    DefinitionName,
    #[serde(rename = "GROUP_BY_TIME_RANGE")]
    TimeRange,
    #[serde(rename = "GROUP_BY_RECENTLY_FOLLOWED")]
    RecentlyFollowed,
    #[serde(rename = "GROUP_BY_DATASOURCE_LABEL")]
    DatasourceLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "SORT_ORDER_ASCENDING")]
    Ascending,
    #[serde(rename = "SORT_ORDER_DESCENDING")]
    Descending,
}

/// A delivery channel as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPreference {
    pub channel: DeliveryChannel,
    pub status: ChannelStatus,
    /// Managed by Tableau; read-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
}

/// A delivery channel as sent in an update. Availability is never sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPreferenceRequest {
    pub channel: DeliveryChannel,
    pub status: ChannelStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricGroupingPreferences {
    pub group_by: GroupBy,
    pub sort_order: SortOrder,
}

/// A user's Pulse preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub cadence: Option<Cadence>,
    #[serde(default)]
    pub channel_preferences: Vec<ChannelPreference>,
    #[serde(default)]
    pub metric_grouping_preferences: Option<MetricGroupingPreferences>,
}

/// Body of `PATCH /api/-/pulse/user/preferences`.
///
/// Only the fields that are set are sent. `user_id` targets another user and
/// requires site administrator rights.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<Cadence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_preferences_request: Vec<ChannelPreferenceRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_grouping_preferences: Option<MetricGroupingPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl PreferencesUpdate {
    #[must_use]
    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }

    #[must_use]
    pub fn with_channel(mut self, channel: DeliveryChannel, status: ChannelStatus) -> Self {
        self.channel_preferences_request
            .push(ChannelPreferenceRequest { channel, status });
        self
    }

    #[must_use]
    pub fn with_grouping(mut self, group_by: GroupBy, sort_order: SortOrder) -> Self {
        self.metric_grouping_preferences = Some(MetricGroupingPreferences { group_by, sort_order });
        self
    }

    #[must_use]
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Returns true if the update would send no preference at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cadence.is_none()
            && self.channel_preferences_request.is_empty()
            && self.metric_grouping_preferences.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follower {
    pub user_id: String,
}

/// A user following a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub metric_id: Option<String>,
    pub follower: Follower,
}

/// One page of `GET /api/-/pulse/subscriptions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPage {
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    /// Token for the next page; absent or empty on the last page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl SubscriptionPage {
    /// Returns the next page token, treating an empty token as the last page.
    #[must_use]
    pub fn next_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}
