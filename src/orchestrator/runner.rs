//! Send orchestrator: resolves the contact set, dedups it, then dispatches
//! sequentially with paced delays, logging every attempt.
//!
//! One run processes its contact set strictly sequentially: the pacing
//! delays only mean something without concurrent dispatch, and the
//! network-message channel owns a single exclusive session. Runs against
//! different campaigns or channels may overlap freely; the CRM's
//! append-only log is the only shared state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::channels::{Channel, ChannelSet, render};
use crate::crm::{Campaign, Contact, ContactId, CrmApi, DeliveryStatus, OutreachLogEntry};
use crate::dedup::DedupFilter;
use crate::error::{ChannelError, ConfigError, CrmError, Error, Result};
use crate::orchestrator::report::{ContactSelector, SendReport, SendRequest};
use crate::pacing::RateLimiter;

/// Cooperative cancellation handle, observed between contacts (never
/// mid-send). Clone freely; all clones share one flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct Orchestrator {
    crm: Arc<dyn CrmApi>,
    dedup: DedupFilter,
    channels: ChannelSet,
    limiter: RateLimiter,
    send_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        crm: Arc<dyn CrmApi>,
        channels: ChannelSet,
        limiter: RateLimiter,
        send_timeout: Duration,
    ) -> Self {
        Self {
            dedup: DedupFilter::new(Arc::clone(&crm)),
            crm,
            channels,
            limiter,
            send_timeout,
        }
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Run one campaign send end-to-end and return the aggregated report.
    ///
    /// CRM failures during contact resolution or dedup abort before any
    /// send is attempted and before any log entry is written. Once the
    /// dispatch loop starts, progress already made is always preserved in
    /// the returned report.
    pub async fn run(&self, request: SendRequest, cancel: CancelFlag) -> Result<SendReport> {
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            campaign = request.campaign_id,
            channel = %request.channel,
            "Starting campaign send run"
        );

        let channel = self.channels.get(request.channel).ok_or_else(|| {
            Error::Config(ConfigError::InvalidValue {
                key: "contact_method".into(),
                message: format!("channel {} is not configured", request.channel),
            })
        })?;

        let campaign = self.crm.get_campaign(request.campaign_id).await?;
        let targets = self.resolve_targets(&request).await?;
        let partition = self
            .dedup
            .filter_uncontacted(request.campaign_id, request.channel, targets)
            .await?;

        let mut report = SendReport::new(run_id, request.campaign_id, request.channel);
        report.skipped_already_contacted = partition.skipped;

        let eligible = partition.eligible;
        info!(
            run_id = %run_id,
            eligible = eligible.len(),
            skipped = report.skipped_already_contacted.len(),
            "Resolved contact set"
        );

        for (idx, contact) in eligible.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(run_id = %run_id, remaining = eligible.len() - idx, "Run cancelled");
                for unattempted in &eligible[idx..] {
                    report.record_failure(unattempted.id, "cancelled");
                }
                break;
            }

            if idx > 0 {
                self.limiter.wait_before_next_send().await;
            }

            let outcome = self
                .dispatch(channel.as_ref(), &campaign, contact, &request)
                .await;
            report.attempted.push(contact.id);

            let session_fatal = matches!(&outcome, Err(e) if e.is_session_fatal());
            self.log_and_classify(&request, contact.id, outcome, &mut report)
                .await;

            if session_fatal {
                error!(
                    run_id = %run_id,
                    channel = %request.channel,
                    "Channel session invalid, aborting run"
                );
                for unattempted in &eligible[idx + 1..] {
                    report.record_failure(unattempted.id, "aborted: session invalid");
                }
                report.halted = Some("session invalid; re-authentication required".into());
                break;
            }
        }

        info!(run_id = %run_id, summary = %report.summary(), "Campaign send run complete");
        Ok(report)
    }

    /// Resolve the request's selector against the campaign's contact set.
    async fn resolve_targets(&self, request: &SendRequest) -> std::result::Result<Vec<Contact>, CrmError> {
        let contacts = self
            .crm
            .list_contacts(request.campaign_id, request.channel)
            .await?;

        match &request.selector {
            ContactSelector::All => Ok(contacts),
            ContactSelector::Ids(ids) => {
                let mut by_id: HashMap<_, _> =
                    contacts.into_iter().map(|c| (c.id, c)).collect();
                let mut seen = HashSet::new();
                let mut selected = Vec::with_capacity(ids.len());
                for id in ids {
                    if !seen.insert(*id) {
                        continue;
                    }
                    match by_id.remove(id) {
                        Some(contact) => selected.push(contact),
                        None => {
                            return Err(CrmError::NotFound {
                                entity: "contact",
                                id: *id,
                            });
                        }
                    }
                }
                Ok(selected)
            }
        }
    }

    /// One delivery, bounded by the configured send timeout.
    async fn dispatch(
        &self,
        channel: &dyn Channel,
        campaign: &Campaign,
        contact: &Contact,
        request: &SendRequest,
    ) -> std::result::Result<(), ChannelError> {
        let message = render(campaign, contact, request.channel);
        match tokio::time::timeout(self.send_timeout, channel.deliver(contact, &message)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout {
                name: channel.name(),
                after: self.send_timeout,
            }),
        }
    }

    /// Record the attempt in the CRM log (always, whatever the outcome)
    /// and classify the contact into `sent` or `failed`.
    async fn log_and_classify(
        &self,
        request: &SendRequest,
        contact_id: ContactId,
        outcome: std::result::Result<(), ChannelError>,
        report: &mut SendReport,
    ) {
        let (status, reason) = match &outcome {
            Ok(()) => (DeliveryStatus::Delivered, None),
            Err(e) => (DeliveryStatus::Failed, Some(failure_reason(e))),
        };

        let entry = OutreachLogEntry::outbound(
            request.campaign_id,
            contact_id,
            request.channel,
            status,
            reason.clone(),
        );
        let log_result = self.record_with_retry(&entry).await;

        match (outcome, log_result) {
            (Ok(()), Ok(())) => {
                info!(contact = contact_id, channel = %request.channel, "Send delivered and logged");
                report.sent.push(contact_id);
            }
            (Ok(()), Err(e)) => {
                // A delivered-but-unrecorded send must not look untouched
                // to the next dedup pass.
                error!(contact = contact_id, error = %e, "Delivered but log write failed");
                report.record_failure(contact_id, format!("log write failed: {e}"));
            }
            (Err(_), log_result) => {
                if let Err(e) = log_result {
                    error!(contact = contact_id, error = %e, "Failed attempt could not be logged");
                }
                let reason = reason.unwrap_or_else(|| "send failed".into());
                warn!(contact = contact_id, reason = %reason, "Send failed");
                report.record_failure(contact_id, reason);
            }
        }
    }

    /// The CRM client applies no retry itself; the orchestrator retries a
    /// failed log write once before giving up.
    async fn record_with_retry(&self, entry: &OutreachLogEntry) -> std::result::Result<(), CrmError> {
        match self.crm.record_outreach(entry).await {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(
                    contact = entry.contact_id,
                    error = %first,
                    "Outreach log write failed, retrying once"
                );
                self.crm.record_outreach(entry).await
            }
        }
    }
}

/// Report/log reason string for a failed delivery.
fn failure_reason(err: &ChannelError) -> String {
    match err {
        ChannelError::Timeout { .. } => "timeout".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_shared_across_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn timeout_reason_is_bare_timeout() {
        let err = ChannelError::Timeout {
            name: "email",
            after: Duration::from_secs(120),
        };
        assert_eq!(failure_reason(&err), "timeout");
    }

    #[test]
    fn session_invalid_reason_matches_wire_form() {
        let err = ChannelError::SessionInvalid {
            name: "network-message",
        };
        assert_eq!(failure_reason(&err), "session_invalid");
    }
}
