//! Narrow interface over the CRM collaborator.
//!
//! The CRM owns campaigns, contacts, and the outreach log; the engine only
//! reads the first two and appends to the third. Keeping everything behind
//! one trait keeps dedup anchored to a single source of truth and makes the
//! orchestrator testable against an in-memory double.

use async_trait::async_trait;

use crate::crm::types::{Campaign, CampaignId, ChannelKind, Contact, ContactId, OutreachLogEntry};
use crate::error::CrmError;

#[async_trait]
pub trait CrmApi: Send + Sync {
    /// All campaigns visible to the configured credentials.
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, CrmError>;

    /// A single campaign by id. `CrmError::NotFound` if the id is unknown.
    async fn get_campaign(&self, id: CampaignId) -> Result<Campaign, CrmError>;

    /// Contacts of a campaign that carry a usable address for `channel`,
    /// in CRM order.
    async fn list_contacts(
        &self,
        campaign_id: CampaignId,
        channel: ChannelKind,
    ) -> Result<Vec<Contact>, CrmError>;

    /// Whether a successful outbound entry already exists for this
    /// `(campaign, contact, channel)` triple.
    async fn has_been_contacted(
        &self,
        campaign_id: CampaignId,
        contact_id: ContactId,
        channel: ChannelKind,
    ) -> Result<bool, CrmError>;

    /// Append one log entry. Called exactly once per attempted send,
    /// whatever the outcome, so failed attempts stay visible for audit.
    async fn record_outreach(&self, entry: &OutreachLogEntry) -> Result<(), CrmError>;
}
