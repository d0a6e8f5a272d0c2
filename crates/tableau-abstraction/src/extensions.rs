//! Dashboard extension settings.
//!
//! Unlike the entity records, these sections carry their values as child
//! elements (`<extensionsEnabled>true</extensionsEnabled>`), so the same field
//! names serve the XML and JSON renderings.

use serde::Deserialize;

/// Server-wide extension settings (`<extensionsServerSettings>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionsServerSettings {
    /// Whether extensions may run anywhere on the server.
    #[serde(default)]
    pub extensions_globally_enabled: Option<bool>,
    /// Extension URLs that may never run.
    #[serde(default)]
    pub block_list: Vec<String>,
}

impl ExtensionsServerSettings {
    #[must_use]
    pub fn enabled(enabled: bool) -> Self {
        Self { extensions_globally_enabled: Some(enabled), block_list: Vec::new() }
    }

    #[must_use]
    pub fn block(mut self, url: impl Into<String>) -> Self {
        self.block_list.push(url.into());
        self
    }
}

/// One extension a site allows explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeListEntry {
    #[serde(default)]
    pub url: String,
    /// The extension may read the full underlying data.
    #[serde(default)]
    pub full_data_allowed: Option<bool>,
    /// Users are asked before the extension runs.
    #[serde(default)]
    pub prompt_needed: Option<bool>,
}

impl SafeListEntry {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), full_data_allowed: None, prompt_needed: None }
    }

    #[must_use]
    pub fn full_data_allowed(mut self, allowed: bool) -> Self {
        self.full_data_allowed = Some(allowed);
        self
    }

    #[must_use]
    pub fn prompt_needed(mut self, needed: bool) -> Self {
        self.prompt_needed = Some(needed);
        self
    }
}

/// Extension settings of one site (`<extensionsSiteSettings>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionsSiteSettings {
    #[serde(default)]
    pub extensions_enabled: Option<bool>,
    /// Follow the server's defaults for extensions not on the safe list.
    #[serde(default)]
    pub use_default_setting: Option<bool>,
    #[serde(default)]
    pub safe_list: Vec<SafeListEntry>,
}

impl ExtensionsSiteSettings {
    #[must_use]
    pub fn enabled(enabled: bool) -> Self {
        Self { extensions_enabled: Some(enabled), ..Self::default() }
    }

    #[must_use]
    pub fn use_default_setting(mut self, use_default: bool) -> Self {
        self.use_default_setting = Some(use_default);
        self
    }

    #[must_use]
    pub fn allow(mut self, entry: SafeListEntry) -> Self {
        self.safe_list.push(entry);
        self
    }
}

/// How a site would treat an extension URL (`<extensionUrlStatus>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionUrlStatus {
    /// e.g. "ALLOWED", "BLOCKED" or "PROMPTED".
    #[serde(default)]
    pub url_status: Option<String>,
    #[serde(default)]
    pub full_data_allowed: Option<bool>,
    #[serde(default)]
    pub prompt_needed: Option<bool>,
}
