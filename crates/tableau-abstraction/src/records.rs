//! Entity records and the `tsResponse` envelope.
//!
//! Records deserialize from both renderings of the REST schema: XML, where
//! scalar fields are attributes (`@id`), and JSON, where they are plain keys
//! (`id`). Each attribute field is renamed to its XML form and aliased to its
//! JSON form. Nested elements use the same name in both renderings.

use crate::extensions::{ExtensionUrlStatus, ExtensionsServerSettings, ExtensionsSiteSettings};
use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Deserializes an integer that may arrive as a string attribute, a JSON string or a JSON number.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientU64;

    impl Visitor<'_> for LenientU64 {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer or a string containing one")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("negative value: {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.trim()
                .parse()
                .map_err(|e| E::custom(format!("invalid integer '{v}': {e}")))
        }
    }

    deserializer.deserialize_any(LenientU64)
}

/// A reference to another entity, as nested inside a record (`<project id="..." name="..."/>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntityRef {
    /// Entity LUID.
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    /// Entity name, when the server includes it.
    #[serde(rename = "@name", alias = "name", default)]
    pub name: Option<String>,
}

/// A tenant namespace on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Site {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "@name", alias = "name", default)]
    pub name: Option<String>,
    #[serde(rename = "@contentUrl", alias = "contentUrl", default)]
    pub content_url: String,
    #[serde(rename = "@state", alias = "state", default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Project {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "@name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "@description", alias = "description", default)]
    pub description: Option<String>,
    #[serde(rename = "@parentProjectId", alias = "parentProjectId", default)]
    pub parent_project_id: Option<String>,
    #[serde(rename = "@contentPermissions", alias = "contentPermissions", default)]
    pub content_permissions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Workbook {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "@name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "@contentUrl", alias = "contentUrl", default)]
    pub content_url: Option<String>,
    #[serde(rename = "@webpageUrl", alias = "webpageUrl", default)]
    pub webpage_url: Option<String>,
    #[serde(rename = "@createdAt", alias = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "@updatedAt", alias = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project: Option<EntityRef>,
    #[serde(default)]
    pub owner: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DataSource {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "@name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "@contentUrl", alias = "contentUrl", default)]
    pub content_url: Option<String>,
    /// Connection type, e.g. "hyper" or "sqlserver".
    #[serde(rename = "@type", alias = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "@createdAt", alias = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "@updatedAt", alias = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project: Option<EntityRef>,
    #[serde(default)]
    pub owner: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct View {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "@name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "@contentUrl", alias = "contentUrl", default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub workbook: Option<EntityRef>,
    #[serde(default)]
    pub owner: Option<EntityRef>,
    #[serde(default)]
    pub project: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Group {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "@name", alias = "name", default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "@name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "@siteRole", alias = "siteRole", default)]
    pub site_role: Option<String>,
    #[serde(rename = "@fullName", alias = "fullName", default)]
    pub full_name: Option<String>,
    #[serde(rename = "@email", alias = "email", default)]
    pub email: Option<String>,
    #[serde(rename = "@lastLogin", alias = "lastLogin", default)]
    pub last_login: Option<DateTime<Utc>>,
}

/// A single capability and its mode, e.g. `Read` / `Allow`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Capability {
    #[serde(rename = "@name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "@mode", alias = "mode", default)]
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CapabilityList {
    #[serde(rename = "capability", default)]
    pub items: Vec<Capability>,
}

/// The capabilities granted to one grantee (a group or a user).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GranteeCapabilities {
    #[serde(default)]
    pub group: Option<EntityRef>,
    #[serde(default)]
    pub user: Option<EntityRef>,
    #[serde(default)]
    pub capabilities: CapabilityList,
}

impl GranteeCapabilities {
    /// Returns the mode recorded for `capability`, if any.
    #[must_use]
    pub fn mode_of(&self, capability: &str) -> Option<&str> {
        self.capabilities
            .items
            .iter()
            .find(|c| c.name == capability)
            .map(|c| c.mode.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub workbook: Option<EntityRef>,
    #[serde(default)]
    pub project: Option<EntityRef>,
    #[serde(default)]
    pub datasource: Option<EntityRef>,
    #[serde(rename = "granteeCapabilities", default)]
    pub grantee_capabilities: Vec<GranteeCapabilities>,
}

impl Permissions {
    /// Returns the grantee entry for `user_id`.
    #[must_use]
    pub fn for_user(&self, user_id: &str) -> Option<&GranteeCapabilities> {
        self.grantee_capabilities
            .iter()
            .find(|g| g.user.as_ref().is_some_and(|u| u.id == user_id))
    }

    /// Returns the grantee entry for `group_id`.
    #[must_use]
    pub fn for_group(&self, group_id: &str) -> Option<&GranteeCapabilities> {
        self.grantee_capabilities
            .iter()
            .find(|g| g.group.as_ref().is_some_and(|grp| grp.id == group_id))
    }
}

/// An upload session on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileUpload {
    #[serde(rename = "@uploadSessionId", alias = "uploadSessionId", default)]
    pub upload_session_id: String,
    /// Size reported by the server (Tableau reports megabytes).
    #[serde(
        rename = "@fileSize",
        alias = "fileSize",
        default,
        deserialize_with = "lenient_u64"
    )]
    pub file_size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Favorite {
    #[serde(rename = "@label", alias = "label", default)]
    pub label: String,
    #[serde(default)]
    pub workbook: Option<EntityRef>,
    #[serde(default)]
    pub view: Option<EntityRef>,
    #[serde(default)]
    pub datasource: Option<EntityRef>,
    #[serde(default)]
    pub project: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookHttpDestination {
    #[serde(rename = "@method", alias = "method", default)]
    pub method: String,
    #[serde(rename = "@url", alias = "url", default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookDestination {
    #[serde(rename = "webhook-destination-http", default)]
    pub http: Option<WebhookHttpDestination>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Webhook {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "@name", alias = "name", default)]
    pub name: String,
    /// Source event name, e.g. "WorkbookCreated".
    #[serde(rename = "@event", alias = "event", default)]
    pub event: Option<String>,
    #[serde(rename = "webhook-destination", default)]
    pub destination: Option<WebhookDestination>,
    #[serde(default)]
    pub owner: Option<EntityRef>,
}

impl Webhook {
    /// Returns the destination URL, if the webhook posts over HTTP.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.destination
            .as_ref()
            .and_then(|d| d.http.as_ref())
            .map(|h| h.url.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookTestResult {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    /// HTTP status the destination answered with.
    #[serde(rename = "@status", alias = "status", default, deserialize_with = "lenient_u64")]
    pub status: u64,
}

/// An asynchronous server job, e.g. an extract refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Job {
    #[serde(rename = "@id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "@mode", alias = "mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "@type", alias = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "@createdAt", alias = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(rename = "@pageNumber", alias = "pageNumber", default, deserialize_with = "lenient_u64")]
    pub page_number: u64,
    #[serde(rename = "@pageSize", alias = "pageSize", default, deserialize_with = "lenient_u64")]
    pub page_size: u64,
    #[serde(
        rename = "@totalAvailable",
        alias = "totalAvailable",
        default,
        deserialize_with = "lenient_u64"
    )]
    pub total_available: u64,
}

/// The `<credentials>` section of a sign-in or switch-site response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CredentialsBody {
    #[serde(rename = "@token", alias = "token", default)]
    pub token: String,
    #[serde(default)]
    pub site: Option<Site>,
    #[serde(default)]
    pub user: Option<EntityRef>,
}

/// The `<error>` section of a failed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "@code", alias = "code", default)]
    pub code: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} - {}",
            self.code.as_deref().unwrap_or("unknown code"),
            self.summary.as_deref().unwrap_or("unknown summary"),
            self.detail.as_deref().unwrap_or("unknown detail"),
        )
    }
}

macro_rules! record_list {
    ($(#[$meta:meta])* $list:ident, $item:ty, $element:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
        pub struct $list {
            #[serde(rename = $element, default)]
            pub items: Vec<$item>,
        }
    };
}

record_list!(
    /// `<sites>`
    SiteList, Site, "site"
);
record_list!(
    /// `<projects>`
    ProjectList, Project, "project"
);
record_list!(
    /// `<workbooks>`
    WorkbookList, Workbook, "workbook"
);
record_list!(
    /// `<datasources>`
    DataSourceList, DataSource, "datasource"
);
record_list!(
    /// `<views>`
    ViewList, View, "view"
);
record_list!(
    /// `<groups>`
    GroupList, Group, "group"
);
record_list!(
    /// `<users>`
    UserList, User, "user"
);
record_list!(
    /// `<favorites>`
    FavoriteList, Favorite, "favorite"
);
record_list!(
    /// `<webhooks>`
    WebhookList, Webhook, "webhook"
);

/// The top-level response container.
///
/// A well-formed response carries at most one entity section (plus optional
/// pagination); callers pick the section they expect and treat its absence
/// as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TsResponse {
    pub error: Option<ApiErrorBody>,
    pub pagination: Option<Pagination>,
    pub credentials: Option<CredentialsBody>,
    pub sites: Option<SiteList>,
    pub site: Option<Site>,
    pub projects: Option<ProjectList>,
    pub project: Option<Project>,
    pub workbooks: Option<WorkbookList>,
    pub workbook: Option<Workbook>,
    pub datasources: Option<DataSourceList>,
    pub datasource: Option<DataSource>,
    pub views: Option<ViewList>,
    pub groups: Option<GroupList>,
    pub group: Option<Group>,
    pub users: Option<UserList>,
    pub user: Option<User>,
    pub permissions: Option<Permissions>,
    pub file_upload: Option<FileUpload>,
    pub favorites: Option<FavoriteList>,
    pub webhooks: Option<WebhookList>,
    pub webhook: Option<Webhook>,
    pub webhook_test_result: Option<WebhookTestResult>,
    pub job: Option<Job>,
    pub extensions_server_settings: Option<ExtensionsServerSettings>,
    pub extensions_site_settings: Option<ExtensionsSiteSettings>,
    pub extension_url_status: Option<ExtensionUrlStatus>,
}
