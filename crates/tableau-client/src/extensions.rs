//! Dashboard extension settings for the server and for sites.

use crate::client::{FailureKind, SessionClient, require};
use crate::xml::XmlElement;
use reqwest::Method;
use tableau_abstraction::{
    Credential, ExtensionUrlStatus, ExtensionsServerSettings, ExtensionsSiteSettings, RestError,
};
use tracing::debug;

fn flag(element: XmlElement, name: &str, value: Option<bool>) -> XmlElement {
    match value {
        Some(v) => element.child(XmlElement::leaf(name, v.to_string())),
        None => element,
    }
}

fn server_settings_element(settings: &ExtensionsServerSettings) -> XmlElement {
    let element = flag(
        XmlElement::new("extensionsServerSettings"),
        "extensionsGloballyEnabled",
        settings.extensions_globally_enabled,
    );
    element.children(settings.block_list.iter().map(|url| XmlElement::leaf("blockList", url)))
}

fn site_settings_element(settings: &ExtensionsSiteSettings) -> XmlElement {
    let mut element = XmlElement::new("extensionsSiteSettings");
    element = flag(element, "extensionsEnabled", settings.extensions_enabled);
    element = flag(element, "useDefaultSetting", settings.use_default_setting);
    element.children(settings.safe_list.iter().map(|entry| {
        let item = XmlElement::new("safeList").child(XmlElement::leaf("url", &entry.url));
        let item = flag(item, "fullDataAllowed", entry.full_data_allowed);
        flag(item, "promptNeeded", entry.prompt_needed)
    }))
}

impl SessionClient {
    /// Returns the server-wide extension settings. Requires a server administrator.
    pub async fn get_server_extension_settings(
        &self,
        credential: &Credential,
    ) -> Result<ExtensionsServerSettings, RestError> {
        let url = self.api_url("settings/extensions");
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response =
            self.send_envelope(request, "get server extension settings", FailureKind::General).await?;
        require(
            response.extensions_server_settings,
            "extensionsServerSettings",
            "get server extension settings",
        )
    }

    /// Replaces the server-wide extension settings and returns the stored result.
    ///
    /// Unset flags are left out of the request, so the server keeps their values.
    pub async fn update_server_extension_settings(
        &self,
        credential: &Credential,
        settings: &ExtensionsServerSettings,
    ) -> Result<ExtensionsServerSettings, RestError> {
        debug!(blocked = settings.block_list.len(), "Updating server extension settings");

        let url = self.api_url("settings/extensions");
        let request = self.xml_request(
            Method::PUT,
            &url,
            Some(&credential.token),
            Some(server_settings_element(settings)),
        )?;
        let response = self
            .send_envelope(request, "update server extension settings", FailureKind::General)
            .await?;
        require(
            response.extensions_server_settings,
            "extensionsServerSettings",
            "update server extension settings",
        )
    }

    pub async fn get_site_extension_settings(
        &self,
        credential: &Credential,
        site_id: &str,
    ) -> Result<ExtensionsSiteSettings, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/settings/extensions"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response =
            self.send_envelope(request, "get site extension settings", FailureKind::General).await?;
        require(
            response.extensions_site_settings,
            "extensionsSiteSettings",
            "get site extension settings",
        )
    }

    /// Replaces a site's extension settings, including its safe list.
    pub async fn update_site_extension_settings(
        &self,
        credential: &Credential,
        site_id: &str,
        settings: &ExtensionsSiteSettings,
    ) -> Result<ExtensionsSiteSettings, RestError> {
        debug!(
            site_id = %site_id,
            safe_list = settings.safe_list.len(),
            "Updating site extension settings"
        );

        let url = self.api_url(&format!("sites/{site_id}/settings/extensions"));
        let request = self.xml_request(
            Method::PUT,
            &url,
            Some(&credential.token),
            Some(site_settings_element(settings)),
        )?;
        let response = self
            .send_envelope(request, "update site extension settings", FailureKind::General)
            .await?;
        require(
            response.extensions_site_settings,
            "extensionsSiteSettings",
            "update site extension settings",
        )
    }

    /// Reports whether an extension at `extension_url` would be allowed to run on a site.
    pub async fn test_extension_url(
        &self,
        credential: &Credential,
        site_id: &str,
        extension_url: &str,
        full_data_required: bool,
    ) -> Result<ExtensionUrlStatus, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/settings/extensions:test"));
        let request = self.request(Method::GET, &url, Some(&credential.token)).query(&[
            ("url", extension_url.to_string()),
            ("fullDataRequired", full_data_required.to_string()),
        ]);
        let response = self.send_envelope(request, "test extension url", FailureKind::General).await?;
        let status = require(response.extension_url_status, "extensionUrlStatus", "test extension url")?;

        debug!(extension_url = %extension_url, status = ?status.url_status, "Tested extension URL");
        Ok(status)
    }
}
