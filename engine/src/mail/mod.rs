//! Outbound mail transports.
//!
//! The dispatcher only sees [`MailTransport`]; which implementation backs it
//! is chosen once at startup from [`Config`].

pub mod log;
pub mod mailgun;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, MailTransportKind};
use crate::render::RenderedMessage;

pub use self::log::LogTransport;
pub use mailgun::MailgunTransport;
pub use smtp::SmtpTransport;

/// Why one message could not be handed off.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("send timed out after {0}ms")]
    Timeout(u64),

    #[error("dispatch deadline exceeded")]
    DeadlineExceeded,

    #[error("provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("mail transport not configured: {0}")]
    NotConfigured(String),
}

/// Something that can send one rendered message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &RenderedMessage) -> Result<(), TransportError>;

    /// Short name for log fields.
    fn name(&self) -> &'static str;
}

/// Build the transport selected by `MAIL_TRANSPORT`.
pub fn from_config(config: &Config) -> Result<Arc<dyn MailTransport>, TransportError> {
    let transport: Arc<dyn MailTransport> = match config.mail_transport {
        MailTransportKind::Smtp => {
            let host = config
                .smtp_host
                .as_deref()
                .ok_or_else(|| TransportError::NotConfigured("SMTP_HOST is not set".to_string()))?;
            Arc::new(SmtpTransport::new(
                host,
                config.smtp_port,
                config.smtp_user.clone(),
                config.smtp_pass.clone(),
                &config.mail_from,
            )?)
        }
        MailTransportKind::Mailgun => {
            let api_key = config.mailgun_api_key.as_deref().ok_or_else(|| {
                TransportError::NotConfigured("MAILGUN_API_KEY is not set".to_string())
            })?;
            let domain = config.mailgun_domain.as_deref().ok_or_else(|| {
                TransportError::NotConfigured("MAILGUN_DOMAIN is not set".to_string())
            })?;
            Arc::new(MailgunTransport::new(
                &config.mailgun_api_base,
                domain,
                api_key,
                &config.mail_from,
            )?)
        }
        MailTransportKind::Log => Arc::new(LogTransport::new(&config.mail_from)),
    };

    Ok(transport)
}

/// RFC 5322 style From value: `Display Name <address>`.
pub(crate) fn from_header(display: &str, address: &str) -> String {
    let display = display.trim();
    if display.is_empty() {
        address.to_string()
    } else {
        format!("\"{}\" <{}>", display.replace('"', "'"), address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header() {
        assert_eq!(from_header("", "it@corp.test"), "it@corp.test");
        assert_eq!(from_header("IT Desk", "it@corp.test"), "\"IT Desk\" <it@corp.test>");
        assert_eq!(from_header("The \"Boss\"", "b@corp.test"), "\"The 'Boss'\" <b@corp.test>");
    }

    #[test]
    fn test_transport_error_messages() {
        assert_eq!(TransportError::Timeout(250).to_string(), "send timed out after 250ms");
        assert_eq!(
            TransportError::DeadlineExceeded.to_string(),
            "dispatch deadline exceeded"
        );
    }
}
