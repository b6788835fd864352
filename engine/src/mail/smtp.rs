//! SMTP relay transport.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use super::{MailTransport, TransportError};
use crate::render::RenderedMessage;

/// Sends through an authenticated SMTP relay over TLS.
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Address,
}

impl SmtpTransport {
    pub fn new(
        host: &str,
        port: u16,
        user: Option<String>,
        pass: Option<String>,
        from: &str,
    ) -> Result<Self, TransportError> {
        let from: Address = from.parse().map_err(|e: lettre::address::AddressError| {
            TransportError::InvalidAddress {
                address: from.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| TransportError::NotConfigured(format!("smtp relay {host}: {e}")))?
            .port(port);

        if let (Some(user), Some(pass)) = (user, pass) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }

    fn build_message(&self, message: &RenderedMessage) -> Result<Message, TransportError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| TransportError::InvalidAddress {
                address: message.to.clone(),
                reason: e.to_string(),
            })?;

        let display = Some(message.sender.trim().to_string()).filter(|s| !s.is_empty());
        let from = Mailbox::new(display, self.from.clone());

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(|e| TransportError::Delivery(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, message: &RenderedMessage) -> Result<(), TransportError> {
        let email = self.build_message(message)?;

        let response = self
            .mailer
            .send(email)
            .await
            .map_err(|e| TransportError::Delivery(e.to_string()))?;

        debug!(to = %message.to, code = %response.code(), "smtp_accepted");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
