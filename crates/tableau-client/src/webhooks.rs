//! Webhooks.

use crate::client::{FailureKind, SessionClient, require};
use crate::xml::XmlElement;
use reqwest::Method;
use tableau_abstraction::{Credential, RestError, Webhook, WebhookTestResult};
use tracing::debug;

impl SessionClient {
    /// Lists the webhooks on a site.
    pub async fn query_webhooks(
        &self,
        credential: &Credential,
        site_id: &str,
    ) -> Result<Vec<Webhook>, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/webhooks"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response = self.send_envelope(request, "query webhooks", FailureKind::General).await?;
        Ok(require(response.webhooks, "webhooks", "query webhooks")?.items)
    }

    /// Creates a webhook that POSTs to `url` when `source_event` fires.
    ///
    /// `source_event` is the event element name, e.g.
    /// "webhook-source-event-workbook-created".
    pub async fn create_webhook(
        &self,
        credential: &Credential,
        site_id: &str,
        name: &str,
        source_event: &str,
        url: &str,
    ) -> Result<Webhook, RestError> {
        debug!(site_id = %site_id, name = %name, event = %source_event, "Creating webhook");

        let endpoint = self.api_url(&format!("sites/{site_id}/webhooks"));
        let webhook = XmlElement::new("webhook")
            .attr("name", name)
            .child(XmlElement::new("webhook-source").child(XmlElement::new(source_event)))
            .child(
                XmlElement::new("webhook-destination").child(
                    XmlElement::new("webhook-destination-http")
                        .attr("method", "POST")
                        .attr("url", url),
                ),
            );
        let request =
            self.xml_request(Method::POST, &endpoint, Some(&credential.token), Some(webhook))?;
        let response = self.send_envelope(request, "create webhook", FailureKind::General).await?;
        require(response.webhook, "webhook", "create webhook")
    }

    /// Sends a test event to the webhook's destination.
    pub async fn test_webhook(
        &self,
        credential: &Credential,
        site_id: &str,
        webhook_id: &str,
    ) -> Result<WebhookTestResult, RestError> {
        let url = self.api_url(&format!("sites/{site_id}/webhooks/{webhook_id}/test"));
        let request = self.request(Method::GET, &url, Some(&credential.token));
        let response = self.send_envelope(request, "test webhook", FailureKind::General).await?;
        let result = require(response.webhook_test_result, "webhookTestResult", "test webhook")?;

        debug!(webhook_id = %webhook_id, status = result.status, "Tested webhook");
        Ok(result)
    }

    /// Deletes a webhook.
    pub async fn delete_webhook(
        &self,
        credential: &Credential,
        site_id: &str,
        webhook_id: &str,
    ) -> Result<(), RestError> {
        debug!(site_id = %site_id, webhook_id = %webhook_id, "Deleting webhook");
        let url = self.api_url(&format!("sites/{site_id}/webhooks/{webhook_id}"));
        let request = self.request(Method::DELETE, &url, Some(&credential.token));
        self.send_empty(request, "delete webhook", FailureKind::General).await?;
        Ok(())
    }
}
