//! Message rendering: campaign template + contact → deliverable content.

use crate::crm::{Campaign, ChannelKind, Contact};

/// Content ready for one contact on one channel. Email carries a subject;
/// network messages are body-only.
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub subject: Option<String>,
    pub body: String,
}

/// Render the campaign's template for a contact on the given channel.
pub fn render(campaign: &Campaign, contact: &Contact, kind: ChannelKind) -> RenderedMessage {
    match kind {
        ChannelKind::Email => RenderedMessage {
            subject: Some(
                campaign
                    .email_subject
                    .clone()
                    .unwrap_or_else(|| campaign.name.clone()),
            ),
            body: personalize(&email_body(campaign), contact),
        },
        ChannelKind::NetworkMessage => RenderedMessage {
            subject: None,
            body: personalize(&network_body(campaign), contact),
        },
    }
}

/// Email body, wrapped in minimal HTML when the template is not already a
/// full document.
fn email_body(campaign: &Campaign) -> String {
    let body = campaign.email_body.clone().unwrap_or_default();
    if body.trim_start().to_lowercase().starts_with("<!doctype") {
        body
    } else {
        format!("<html><body><p>{body}</p></body></html>")
    }
}

/// Network message text: the dedicated field, else the email body with tags
/// stripped, else a short default built from the campaign name.
fn network_body(campaign: &Campaign) -> String {
    if let Some(text) = campaign.message_text.as_deref()
        && !text.trim().is_empty()
    {
        return text.trim().to_string();
    }

    if let Some(html) = campaign.email_body.as_deref() {
        let stripped = strip_html(html);
        if !stripped.is_empty() {
            return stripped;
        }
    }

    format!(
        "Hi {{{{name}}}}, I'm reaching out about \"{}\". Would love to connect!",
        campaign.name
    )
}

/// Substitute the `{{name}}` placeholder with the contact's name.
pub fn personalize(template: &str, contact: &Contact) -> String {
    template.replace("{{name}}", &contact.name)
}

/// Strip HTML tags and normalize whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign() -> Campaign {
        Campaign {
            id: 3,
            name: "Climate Week".into(),
            email_subject: None,
            email_body: None,
            message_text: None,
        }
    }

    fn contact() -> Contact {
        Contact {
            id: 10,
            name: "Ada".into(),
            email: Some("ada@example.com".into()),
            handle: None,
        }
    }

    #[test]
    fn email_subject_falls_back_to_campaign_name() {
        let rendered = render(&campaign(), &contact(), ChannelKind::Email);
        assert_eq!(rendered.subject.as_deref(), Some("Climate Week"));
    }

    #[test]
    fn email_body_wrapped_when_not_full_document() {
        let mut c = campaign();
        c.email_body = Some("Hello {{name}}".into());
        let rendered = render(&c, &contact(), ChannelKind::Email);
        assert_eq!(
            rendered.body,
            "<html><body><p>Hello Ada</p></body></html>"
        );
    }

    #[test]
    fn email_body_full_document_kept_as_is() {
        let mut c = campaign();
        c.email_body = Some("<!DOCTYPE html><html><body>Hi</body></html>".into());
        let rendered = render(&c, &contact(), ChannelKind::Email);
        assert!(rendered.body.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn network_body_prefers_message_text() {
        let mut c = campaign();
        c.message_text = Some("Quick intro, {{name}}?".into());
        c.email_body = Some("<p>ignored</p>".into());
        let rendered = render(&c, &contact(), ChannelKind::NetworkMessage);
        assert_eq!(rendered.body, "Quick intro, Ada?");
        assert!(rendered.subject.is_none());
    }

    #[test]
    fn network_body_falls_back_to_stripped_email_body() {
        let mut c = campaign();
        c.email_body = Some("<div><b>Hello</b> there</div>".into());
        let rendered = render(&c, &contact(), ChannelKind::NetworkMessage);
        assert_eq!(rendered.body, "Hello there");
    }

    #[test]
    fn network_body_default_mentions_campaign() {
        let rendered = render(&campaign(), &contact(), ChannelKind::NetworkMessage);
        assert!(rendered.body.contains("Climate Week"));
        assert!(rendered.body.contains("Ada"));
    }

    #[test]
    fn strip_html_nested_tags() {
        assert_eq!(
            strip_html("<div><b>Bold</b> and <i>italic</i></div>"),
            "Bold and italic"
        );
    }

    #[test]
    fn strip_html_normalizes_whitespace() {
        assert_eq!(strip_html("<p>  Hello   World  </p>"), "Hello World");
    }
}
