//! CRM collaborator: data model, access trait, HTTP client.

pub mod api;
pub mod http;
pub mod types;

pub use api::CrmApi;
pub use http::HttpCrmClient;
pub use types::{
    Campaign, CampaignId, ChannelKind, Contact, ContactId, DeliveryStatus, OutreachLogEntry,
};
