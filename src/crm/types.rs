//! CRM data model: campaigns, contacts, channel kinds, outreach log entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CampaignId = i64;
pub type ContactId = i64;

/// Direction tag written on every log entry this engine produces.
pub const DIRECTION_OUTBOUND: &str = "outbound";

/// A campaign as stored in the CRM. Read-only here; the CRM owns identity
/// and the message templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    /// Subject line for email outreach. Falls back to the campaign name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    /// Body (HTML or plain text) for email outreach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
    /// Plain-text body for network messages. Falls back to the email body
    /// with tags stripped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_text: Option<String>,
}

/// A contact belonging to a campaign. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    #[serde(alias = "first_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        alias = "linkedin",
        alias = "linkedin_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub handle: Option<String>,
}

impl Contact {
    /// The destination identifier for a given channel, if the contact has a
    /// usable one. Whitespace-only values count as absent.
    pub fn address_for(&self, kind: ChannelKind) -> Option<&str> {
        let addr = match kind {
            ChannelKind::Email => self.email.as_deref(),
            ChannelKind::NetworkMessage => self.handle.as_deref(),
        };
        addr.map(str::trim).filter(|a| !a.is_empty())
    }
}

/// Outbound communication mechanism. Selects the `Channel` implementation
/// and which `Contact` field is the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    Email,
    NetworkMessage,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::NetworkMessage => "network-message",
        }
    }

    /// Parse the wire form used by the HTTP surface and the CRM log rows.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            "network-message" => Some(Self::NetworkMessage),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one delivery attempt. Only `Delivered` entries satisfy the
/// dedup lookup; `Failed` entries exist for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

/// One append-only outreach log record. The engine's sole CRM write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachLogEntry {
    #[serde(rename = "campaign")]
    pub campaign_id: CampaignId,
    #[serde(rename = "contact")]
    pub contact_id: ContactId,
    pub channel: ChannelKind,
    pub direction: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl OutreachLogEntry {
    /// Build an outbound entry stamped with the current time.
    pub fn outbound(
        campaign_id: CampaignId,
        contact_id: ContactId,
        channel: ChannelKind,
        outcome: DeliveryStatus,
        detail: Option<String>,
    ) -> Self {
        Self {
            campaign_id,
            contact_id,
            channel,
            direction: DIRECTION_OUTBOUND.to_string(),
            timestamp: Utc::now(),
            outcome,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_kind_wire_roundtrip() {
        assert_eq!(ChannelKind::from_wire("email"), Some(ChannelKind::Email));
        assert_eq!(
            ChannelKind::from_wire("network-message"),
            Some(ChannelKind::NetworkMessage)
        );
        assert_eq!(ChannelKind::from_wire("sms"), None);
        assert_eq!(ChannelKind::Email.as_str(), "email");
        assert_eq!(ChannelKind::NetworkMessage.as_str(), "network-message");
    }

    #[test]
    fn channel_kind_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ChannelKind::NetworkMessage).unwrap();
        assert_eq!(json, "\"network-message\"");
        let kind: ChannelKind = serde_json::from_str("\"email\"").unwrap();
        assert_eq!(kind, ChannelKind::Email);
    }

    #[test]
    fn address_for_selects_channel_field() {
        let contact = Contact {
            id: 1,
            name: "Ada".into(),
            email: Some("ada@example.com".into()),
            handle: Some("https://network.example/in/ada".into()),
        };
        assert_eq!(
            contact.address_for(ChannelKind::Email),
            Some("ada@example.com")
        );
        assert_eq!(
            contact.address_for(ChannelKind::NetworkMessage),
            Some("https://network.example/in/ada")
        );
    }

    #[test]
    fn address_for_treats_blank_as_absent() {
        let contact = Contact {
            id: 2,
            name: "Bea".into(),
            email: Some("   ".into()),
            handle: None,
        };
        assert_eq!(contact.address_for(ChannelKind::Email), None);
        assert_eq!(contact.address_for(ChannelKind::NetworkMessage), None);
    }

    #[test]
    fn contact_deserializes_crm_field_names() {
        let contact: Contact = serde_json::from_str(
            r#"{"id": 7, "first_name": "Cleo", "linkedin_url": "https://network.example/in/cleo"}"#,
        )
        .unwrap();
        assert_eq!(contact.name, "Cleo");
        assert_eq!(
            contact.handle.as_deref(),
            Some("https://network.example/in/cleo")
        );
        assert!(contact.email.is_none());
    }

    #[test]
    fn campaign_template_fields_default_to_none() {
        let campaign: Campaign = serde_json::from_str(r#"{"id": 3, "name": "Climate Week"}"#).unwrap();
        assert!(campaign.email_subject.is_none());
        assert!(campaign.email_body.is_none());
        assert!(campaign.message_text.is_none());
    }

    #[test]
    fn log_entry_serializes_crm_shape() {
        let entry = OutreachLogEntry::outbound(
            3,
            10,
            ChannelKind::Email,
            DeliveryStatus::Delivered,
            None,
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["campaign"], 3);
        assert_eq!(value["contact"], 10);
        assert_eq!(value["channel"], "email");
        assert_eq!(value["direction"], "outbound");
        assert_eq!(value["outcome"], "delivered");
        assert!(value.get("detail").is_none());
    }
}
