//! Dedup filter — drops contacts already successfully messaged for a
//! campaign/channel pair.
//!
//! This is the correctness-critical step: a contact that passes the filter
//! is considered claimed for sending in the current run. The CRM log is the
//! single source of truth; nothing is cached locally. Two concurrent runs
//! against the same campaign and channel can both pass a contact before
//! either logs success; that race is accepted and excluded by deployment
//! policy, not by a lock here.

use std::sync::Arc;

use tracing::debug;

use crate::crm::{CampaignId, ChannelKind, Contact, ContactId, CrmApi};
use crate::error::CrmError;

/// Result of partitioning a candidate set, input order preserved.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub eligible: Vec<Contact>,
    pub skipped: Vec<ContactId>,
}

pub struct DedupFilter {
    crm: Arc<dyn CrmApi>,
}

impl DedupFilter {
    pub fn new(crm: Arc<dyn CrmApi>) -> Self {
        Self { crm }
    }

    /// Partition `contacts` into never-contacted (eligible) and
    /// already-contacted (skipped). One log lookup per candidate; a CRM
    /// failure aborts the whole partition so no send proceeds on stale
    /// knowledge.
    pub async fn filter_uncontacted(
        &self,
        campaign_id: CampaignId,
        channel: ChannelKind,
        contacts: Vec<Contact>,
    ) -> Result<DedupOutcome, CrmError> {
        let mut outcome = DedupOutcome::default();
        for contact in contacts {
            if self
                .crm
                .has_been_contacted(campaign_id, contact.id, channel)
                .await?
            {
                debug!(
                    campaign = campaign_id,
                    contact = contact.id,
                    channel = %channel,
                    "Already contacted, skipping"
                );
                outcome.skipped.push(contact.id);
            } else {
                outcome.eligible.push(contact);
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::crm::{Campaign, OutreachLogEntry};

    struct FixedLogCrm {
        contacted: HashSet<ContactId>,
        lookups: Mutex<Vec<ContactId>>,
    }

    #[async_trait]
    impl CrmApi for FixedLogCrm {
        async fn list_campaigns(&self) -> Result<Vec<Campaign>, CrmError> {
            unimplemented!()
        }

        async fn get_campaign(&self, _id: CampaignId) -> Result<Campaign, CrmError> {
            unimplemented!()
        }

        async fn list_contacts(
            &self,
            _campaign_id: CampaignId,
            _channel: ChannelKind,
        ) -> Result<Vec<Contact>, CrmError> {
            unimplemented!()
        }

        async fn has_been_contacted(
            &self,
            _campaign_id: CampaignId,
            contact_id: ContactId,
            _channel: ChannelKind,
        ) -> Result<bool, CrmError> {
            self.lookups.lock().unwrap().push(contact_id);
            Ok(self.contacted.contains(&contact_id))
        }

        async fn record_outreach(&self, _entry: &OutreachLogEntry) -> Result<(), CrmError> {
            unimplemented!()
        }
    }

    fn contact(id: ContactId) -> Contact {
        Contact {
            id,
            name: format!("c{id}"),
            email: Some(format!("c{id}@example.com")),
            handle: None,
        }
    }

    #[tokio::test]
    async fn partitions_and_preserves_order() {
        let crm = Arc::new(FixedLogCrm {
            contacted: [11].into_iter().collect(),
            lookups: Mutex::new(Vec::new()),
        });
        let filter = DedupFilter::new(crm.clone());

        let outcome = filter
            .filter_uncontacted(
                3,
                ChannelKind::Email,
                vec![contact(10), contact(11), contact(12)],
            )
            .await
            .unwrap();

        let eligible: Vec<_> = outcome.eligible.iter().map(|c| c.id).collect();
        assert_eq!(eligible, vec![10, 12]);
        assert_eq!(outcome.skipped, vec![11]);
        assert_eq!(*crm.lookups.lock().unwrap(), vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_partition() {
        let crm = Arc::new(FixedLogCrm {
            contacted: HashSet::new(),
            lookups: Mutex::new(Vec::new()),
        });
        let filter = DedupFilter::new(crm);

        let outcome = filter
            .filter_uncontacted(3, ChannelKind::NetworkMessage, Vec::new())
            .await
            .unwrap();
        assert!(outcome.eligible.is_empty());
        assert!(outcome.skipped.is_empty());
    }
}
