//! Run requests and the per-run report.

use serde::Serialize;
use uuid::Uuid;

use crate::crm::{CampaignId, ChannelKind, ContactId};

/// Which of a campaign's contacts to target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactSelector {
    All,
    /// Explicit non-empty id set. Ids outside the campaign's contact set
    /// fail the run with `CrmError::NotFound`.
    Ids(Vec<ContactId>),
}

/// One orchestrator invocation. Built per call, never persisted.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub campaign_id: CampaignId,
    pub channel: ChannelKind,
    pub selector: ContactSelector,
}

impl SendRequest {
    /// An empty explicit id list means "all" (the HTTP surface convention).
    pub fn new(campaign_id: CampaignId, channel: ChannelKind, contact_ids: Vec<ContactId>) -> Self {
        let selector = if contact_ids.is_empty() {
            ContactSelector::All
        } else {
            ContactSelector::Ids(contact_ids)
        };
        Self {
            campaign_id,
            channel,
            selector,
        }
    }

    pub fn all(campaign_id: CampaignId, channel: ChannelKind) -> Self {
        Self::new(campaign_id, channel, Vec::new())
    }
}

/// A contact the run could not deliver to, with the reason.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SendFailure {
    pub contact_id: ContactId,
    pub reason: String,
}

/// Aggregated outcome of one run. Built incrementally; partial progress is
/// always reflected even when the run halts early.
#[derive(Debug, Serialize)]
pub struct SendReport {
    pub run_id: Uuid,
    pub campaign_id: CampaignId,
    pub channel: ChannelKind,
    /// Contacts a delivery was actually dispatched for, in order.
    pub attempted: Vec<ContactId>,
    pub sent: Vec<ContactId>,
    #[serde(rename = "skipped")]
    pub skipped_already_contacted: Vec<ContactId>,
    pub failed: Vec<SendFailure>,
    /// Set when the run stopped before exhausting its contact set
    /// (session-fatal channel failure); tells the caller that manual
    /// remediation is needed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
}

impl SendReport {
    pub fn new(run_id: Uuid, campaign_id: CampaignId, channel: ChannelKind) -> Self {
        Self {
            run_id,
            campaign_id,
            channel,
            attempted: Vec::new(),
            sent: Vec::new(),
            skipped_already_contacted: Vec::new(),
            failed: Vec::new(),
            halted: None,
        }
    }

    pub fn record_failure(&mut self, contact_id: ContactId, reason: impl Into<String>) {
        self.failed.push(SendFailure {
            contact_id,
            reason: reason.into(),
        });
    }

    /// One-line summary for logs and the HTTP response message.
    pub fn summary(&self) -> String {
        format!(
            "{} sent, {} skipped, {} failed",
            self.sent.len(),
            self.skipped_already_contacted.len(),
            self.failed.len()
        )
    }
}
