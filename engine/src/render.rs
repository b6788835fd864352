//! Message rendering - tracking link and open beacon substitution.

use crate::model::{Template, PHISHING_LINK_PLACEHOLDER};
use crate::token::TokenCodec;

/// A message ready for the mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub to: String,
    pub subject: String,
    /// Display name for the From header; may be empty
    pub sender: String,
    pub html: String,
    /// Token embedded in both tracking URLs
    pub tracking_id: String,
    /// False when the template had no placeholder and no link was offered
    pub link_embedded: bool,
}

/// Builds per-recipient message bodies.
#[derive(Debug, Clone)]
pub struct Renderer {
    base_url: String,
    codec: TokenCodec,
}

impl Renderer {
    pub fn new(base_url: impl Into<String>, codec: TokenCodec) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, codec }
    }

    pub fn click_url(&self, campaign_id: &str, token: &str) -> String {
        format!("{}/track/click/{}/{}", self.base_url, campaign_id, token)
    }

    pub fn open_url(&self, campaign_id: &str, token: &str) -> String {
        format!("{}/track/open/{}/{}", self.base_url, campaign_id, token)
    }

    /// Render `template` for one recipient.
    ///
    /// The first `[PHISHING_LINK]` becomes an anchor to the click-through URL
    /// and a hidden 1x1 image pointing at the open beacon is appended. A
    /// template without the marker is sent without a link.
    pub fn render(&self, template: &Template, campaign_id: &str, recipient: &str) -> RenderedMessage {
        let tracking_id = self.codec.derive(campaign_id, recipient);
        let click_url = self.click_url(campaign_id, &tracking_id);
        let open_url = self.open_url(campaign_id, &tracking_id);

        let link_embedded = template.body.contains(PHISHING_LINK_PLACEHOLDER);
        let anchor = format!(r#"<a href="{}">Click here</a>"#, click_url);
        let body = template.body.replacen(PHISHING_LINK_PLACEHOLDER, &anchor, 1);

        let pixel = format!(
            r#"<img src="{}" width="1" height="1" style="display:none" />"#,
            open_url
        );

        RenderedMessage {
            to: recipient.to_string(),
            subject: template.subject.clone(),
            sender: template.sender.clone(),
            html: body + &pixel,
            tracking_id,
            link_embedded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn template(body: &str) -> Template {
        Template {
            subject: "Password expiry".to_string(),
            sender: "IT Helpdesk".to_string(),
            body: body.to_string(),
        }
    }

    fn attrs(html: &str, selector: &str, attr: &str) -> Vec<String> {
        let document = Html::parse_fragment(html);
        let selector = Selector::parse(selector).unwrap();
        document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_render_embeds_link_and_beacon() {
        let renderer = Renderer::new("http://localhost:5000/", TokenCodec::unkeyed());
        let msg = renderer.render(&template("click [PHISHING_LINK]"), "c1", "a@x.com");

        let token = TokenCodec::unkeyed().derive("c1", "a@x.com");
        assert_eq!(msg.tracking_id, token);
        assert!(msg.link_embedded);
        assert!(!msg.html.contains(PHISHING_LINK_PLACEHOLDER));

        assert_eq!(
            attrs(&msg.html, "a[href]", "href"),
            vec![format!("http://localhost:5000/track/click/c1/{token}")]
        );
        assert_eq!(
            attrs(&msg.html, "img[src]", "src"),
            vec![format!("http://localhost:5000/track/open/c1/{token}")]
        );
        assert_eq!(attrs(&msg.html, "img", "width"), vec!["1"]);
    }

    #[test]
    fn test_render_copies_headers() {
        let renderer = Renderer::new("https://t.example.com", TokenCodec::unkeyed());
        let msg = renderer.render(&template("[PHISHING_LINK]"), "c1", "a@x.com");
        assert_eq!(msg.to, "a@x.com");
        assert_eq!(msg.subject, "Password expiry");
        assert_eq!(msg.sender, "IT Helpdesk");
    }

    #[test]
    fn test_render_without_placeholder_still_has_beacon() {
        let renderer = Renderer::new("https://t.example.com", TokenCodec::unkeyed());
        let msg = renderer.render(&template("No link in this one."), "c1", "a@x.com");

        assert!(!msg.link_embedded);
        assert!(msg.html.starts_with("No link in this one."));
        assert!(attrs(&msg.html, "a[href]", "href").is_empty());
        assert_eq!(attrs(&msg.html, "img[src]", "src").len(), 1);
    }

    #[test]
    fn test_render_replaces_first_placeholder_only() {
        let renderer = Renderer::new("https://t.example.com", TokenCodec::unkeyed());
        let msg = renderer.render(
            &template("[PHISHING_LINK] and again [PHISHING_LINK]"),
            "c1",
            "a@x.com",
        );
        assert_eq!(attrs(&msg.html, "a[href]", "href").len(), 1);
        assert!(msg.html.contains(PHISHING_LINK_PLACEHOLDER));
    }

    #[test]
    fn test_render_uses_keyed_codec() {
        let codec = TokenCodec::keyed("k").unwrap();
        let renderer = Renderer::new("https://t.example.com", codec.clone());
        let msg = renderer.render(&template("[PHISHING_LINK]"), "c1", "a@x.com");
        assert_eq!(msg.tracking_id, codec.derive("c1", "a@x.com"));
        assert_ne!(msg.tracking_id, TokenCodec::unkeyed().derive("c1", "a@x.com"));
    }
}
