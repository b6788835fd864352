//! Mailgun HTTP API transport.
//!
//! Posts form-encoded messages to `{api_base}/v3/{domain}/messages` with
//! basic auth `api:{key}`.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{from_header, MailTransport, TransportError};
use crate::render::RenderedMessage;

/// Longest provider error body kept in a recipient record.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct MailgunTransport {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl MailgunTransport {
    pub fn new(
        api_base: &str,
        domain: &str,
        api_key: &str,
        from: &str,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::NotConfigured(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint: messages_endpoint(api_base, domain),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

fn messages_endpoint(api_base: &str, domain: &str) -> String {
    format!("{}/v3/{}/messages", api_base.trim_end_matches('/'), domain)
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[async_trait]
impl MailTransport for MailgunTransport {
    async fn send(&self, message: &RenderedMessage) -> Result<(), TransportError> {
        let from = from_header(&message.sender, &self.from);
        let form = [
            ("from", from.as_str()),
            ("to", message.to.as_str()),
            ("subject", message.subject.as_str()),
            ("html", message.html.as_str()),
        ];

        let resp = self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| TransportError::Delivery(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                to = %message.to,
                status_code = status.as_u16(),
                "mailgun_send_rejected"
            );
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body: truncate(body.trim()),
            });
        }

        debug!(to = %message.to, status_code = status.as_u16(), "mailgun_accepted");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mailgun"
    }
}
