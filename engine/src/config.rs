//! Configuration module for environment variable parsing.
//!
//! Every setting has a default so a bare `phishguard-server` starts with an
//! in-memory store, a logging mail transport and unkeyed tracking tokens.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use url::Url;

/// Which outbound mail transport the dispatcher hands messages to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransportKind {
    /// Relay through an SMTP server.
    Smtp,
    /// Post to the Mailgun messages API.
    Mailgun,
    /// Log the message and report success. Development only.
    Log,
}

impl FromStr for MailTransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "mailgun" => Ok(Self::Mailgun),
            "log" => Ok(Self::Log),
            other => Err(format!("unknown mail transport '{other}'")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Externally reachable base URL used to build tracking links
    pub public_base_url: String,

    /// Where every click-through is redirected
    pub landing_url: String,

    /// Optional key mixed into tracking tokens (HMAC-SHA256)
    pub tracking_secret: Option<String>,

    /// Optional bearer token gating the campaign endpoints
    pub admin_token: Option<String>,

    // =========================================================================
    // Outbound mail
    // =========================================================================

    pub mail_transport: MailTransportKind,

    /// Envelope sender address; the template's sender string becomes its display name
    pub mail_from: String,

    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,

    pub mailgun_api_key: Option<String>,
    pub mailgun_domain: Option<String>,
    pub mailgun_api_base: String,

    /// Upper bound on a single send
    pub send_timeout_ms: u64,

    /// Upper bound on a whole dispatch
    pub dispatch_deadline_ms: u64,

    // =========================================================================
    // Storage and events
    // =========================================================================

    /// Directory for JSON campaign documents; in-memory when unset
    pub data_dir: Option<PathBuf>,

    /// Capacity of the in-process broadcast channel
    pub event_buffer: usize,

    /// RabbitMQ connection URL; enables the AMQP event fan-out when set
    pub cloudamqp_url: Option<String>,

    /// Fanout exchange carrying campaign events
    pub event_exchange: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 5000,
            public_base_url: "http://localhost:5000".to_string(),
            landing_url: "https://yourcompany.com/phishing-landing".to_string(),
            tracking_secret: None,
            admin_token: None,
            mail_transport: MailTransportKind::Log,
            mail_from: "phishguard@localhost".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            mailgun_api_key: None,
            mailgun_domain: None,
            mailgun_api_base: "https://api.mailgun.net".to_string(),
            send_timeout_ms: 30_000,
            dispatch_deadline_ms: 300_000,
            data_dir: None,
            event_buffer: 256,
            cloudamqp_url: None,
            event_exchange: "phishguard_events".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let d = Config::default();

        Config {
            port: parse_or("PORT", d.port),

            public_base_url: parse_url("PUBLIC_BASE_URL", &d.public_base_url),

            landing_url: parse_url("LANDING_URL", &d.landing_url),

            tracking_secret: non_empty("TRACKING_SECRET"),

            admin_token: non_empty("ADMIN_TOKEN"),

            mail_transport: parse_or("MAIL_TRANSPORT", d.mail_transport),

            mail_from: non_empty("MAIL_FROM").unwrap_or(d.mail_from),

            smtp_host: non_empty("SMTP_HOST"),

            smtp_port: parse_or("SMTP_PORT", d.smtp_port),

            smtp_user: non_empty("SMTP_USER"),

            smtp_pass: non_empty("SMTP_PASS"),

            mailgun_api_key: non_empty("MAILGUN_API_KEY"),

            mailgun_domain: non_empty("MAILGUN_DOMAIN"),

            mailgun_api_base: parse_url("MAILGUN_API_BASE", &d.mailgun_api_base),

            send_timeout_ms: parse_or("SEND_TIMEOUT_MS", d.send_timeout_ms),

            dispatch_deadline_ms: parse_or("DISPATCH_DEADLINE_MS", d.dispatch_deadline_ms),

            data_dir: non_empty("DATA_DIR").map(PathBuf::from),

            event_buffer: parse_or("EVENT_BUFFER", d.event_buffer).max(1),

            cloudamqp_url: non_empty("CLOUDAMQP_URL"),

            event_exchange: non_empty("EVENT_EXCHANGE").unwrap_or(d.event_exchange),
        }
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn dispatch_deadline(&self) -> Duration {
        Duration::from_millis(self.dispatch_deadline_ms)
    }
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Read a variable that must hold an absolute URL. Trailing slashes are dropped.
fn parse_url(name: &str, default: &str) -> String {
    let raw = match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return default.to_string(),
    };

    match Url::parse(raw.trim()) {
        Ok(_) => raw.trim().trim_end_matches('/').to_string(),
        Err(e) => {
            warn!(env_var = name, value = %raw, error = %e, "Invalid URL, using default");
            default.to_string()
        }
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
