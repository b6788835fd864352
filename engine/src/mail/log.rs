//! Transport that only logs. Every send succeeds.

use async_trait::async_trait;
use tracing::info;

use super::{from_header, MailTransport, TransportError};
use crate::render::RenderedMessage;

#[derive(Debug, Clone)]
pub struct LogTransport {
    from: String,
}

impl LogTransport {
    pub fn new(from: &str) -> Self {
        Self {
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, message: &RenderedMessage) -> Result<(), TransportError> {
        info!(
            from = %from_header(&message.sender, &self.from),
            to = %message.to,
            subject = %message.subject,
            html_length = message.html.len(),
            link_embedded = message.link_embedded,
            "mail_logged"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
