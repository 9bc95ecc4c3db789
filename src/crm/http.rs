//! HTTP implementation of [`CrmApi`] against the CRM's JSON REST backend.
//!
//! The backend paginates list endpoints as `{results: [...], next: url}`;
//! this client follows `next` links. Contacts are attached to campaigns via
//! `campaign-contact-methods` assignment rows, so listing a campaign's
//! contacts is a two-step fetch: assignments first, then each contact.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::CrmConfig;
use crate::crm::api::CrmApi;
use crate::crm::types::{
    Campaign, CampaignId, ChannelKind, Contact, ContactId, DIRECTION_OUTBOUND, OutreachLogEntry,
};
use crate::error::{ConfigError, CrmError};

/// One page of a paginated list response.
#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

/// Row linking a contact to a campaign for one contact method.
#[derive(Debug, Deserialize)]
struct AssignmentRow {
    contact: ContactId,
}

/// Raw outreach log row; `outcome` is kept as a string so that rows written
/// by other tools never fail the whole page parse.
#[derive(Debug, Deserialize)]
struct LogRow {
    #[serde(default)]
    outcome: Option<String>,
}

/// reqwest-backed CRM client. Applies no retry of its own; retry policy
/// belongs to the orchestrator.
pub struct HttpCrmClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<SecretString>,
    email_method_id: u32,
    network_method_id: u32,
}

impl HttpCrmClient {
    pub fn new(config: &CrmConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "CRM_TIMEOUT_SECS".into(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            email_method_id: config.email_method_id,
            network_method_id: config.network_method_id,
        })
    }

    /// The CRM's numeric contact-method id for a channel kind.
    fn method_id(&self, channel: ChannelKind) -> u32 {
        match channel {
            ChannelKind::Email => self.email_method_id,
            ChannelKind::NetworkMessage => self.network_method_id,
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CrmError> {
        debug!(url, "CRM GET");
        let resp = self
            .authed(self.http.get(url))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CrmError::Upstream {
                status: Some(status.as_u16()),
                reason: format!("GET {url} returned {status}"),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| CrmError::Malformed(e.to_string()))
    }

    /// Fetch every page of a paginated list endpoint.
    async fn get_all_pages<T: DeserializeOwned>(&self, first_url: &str) -> Result<Vec<T>, CrmError> {
        let mut items = Vec::new();
        let mut url = first_url.to_string();
        loop {
            let page: Page<T> = self.get_json(&url).await?;
            items.extend(page.results);
            match page.next {
                Some(next) => url = next,
                None => return Ok(items),
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> CrmError {
    if e.is_timeout() {
        CrmError::Upstream {
            status: None,
            reason: "request timed out".into(),
        }
    } else {
        CrmError::Upstream {
            status: e.status().map(|s| s.as_u16()),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl CrmApi for HttpCrmClient {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, CrmError> {
        let url = format!("{}/outreach/campaigns/", self.base_url);
        self.get_all_pages(&url).await
    }

    async fn get_campaign(&self, id: CampaignId) -> Result<Campaign, CrmError> {
        let url = format!("{}/outreach/campaigns/{id}/", self.base_url);
        match self.get_json(&url).await {
            Err(CrmError::Upstream {
                status: Some(404), ..
            }) => Err(CrmError::NotFound {
                entity: "campaign",
                id,
            }),
            other => other,
        }
    }

    async fn list_contacts(
        &self,
        campaign_id: CampaignId,
        channel: ChannelKind,
    ) -> Result<Vec<Contact>, CrmError> {
        let url = format!(
            "{}/outreach/campaign-contact-methods/?campaign={}&contact_method={}",
            self.base_url,
            campaign_id,
            self.method_id(channel)
        );
        let rows: Vec<AssignmentRow> = self.get_all_pages(&url).await?;
        debug!(
            campaign = campaign_id,
            channel = %channel,
            rows = rows.len(),
            "Fetched campaign contact assignments"
        );

        let mut contacts = Vec::with_capacity(rows.len());
        for row in rows {
            let url = format!("{}/outreach/contacts/{}/", self.base_url, row.contact);
            let contact: Contact = match self.get_json(&url).await {
                Err(CrmError::Upstream {
                    status: Some(404), ..
                }) => {
                    return Err(CrmError::Malformed(format!(
                        "assignment references missing contact {}",
                        row.contact
                    )));
                }
                other => other?,
            };

            if contact.address_for(channel).is_some() {
                contacts.push(contact);
            } else {
                debug!(
                    contact = contact.id,
                    channel = %channel,
                    "Contact has no address for channel, skipping"
                );
            }
        }
        Ok(contacts)
    }

    async fn has_been_contacted(
        &self,
        campaign_id: CampaignId,
        contact_id: ContactId,
        channel: ChannelKind,
    ) -> Result<bool, CrmError> {
        let url = format!(
            "{}/outreach/contact-logs/?campaign={}&contact={}&channel={}&direction={}",
            self.base_url,
            campaign_id,
            contact_id,
            channel.as_str(),
            DIRECTION_OUTBOUND
        );
        let rows: Vec<LogRow> = self.get_all_pages(&url).await?;
        Ok(rows
            .iter()
            .any(|row| row.outcome.as_deref() == Some("delivered")))
    }

    async fn record_outreach(&self, entry: &OutreachLogEntry) -> Result<(), CrmError> {
        let url = format!("{}/outreach/contact-logs/", self.base_url);
        debug!(
            url = %url,
            campaign = entry.campaign_id,
            contact = entry.contact_id,
            outcome = entry.outcome.as_str(),
            "CRM POST"
        );
        let resp = self
            .authed(self.http.post(&url))
            .json(entry)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CrmError::Upstream {
                status: Some(status.as_u16()),
                reason: format!("POST {url} returned {status}"),
            });
        }
        Ok(())
    }
}
