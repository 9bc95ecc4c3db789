//! Network-message channel — professional-network DMs over a persisted
//! authenticated session.
//!
//! The session is established out-of-band (an interactive login whose
//! storage state is saved to disk) and consumed here: cookies are loaded
//! once at startup and reused for every send. When the session has expired
//! the network answers with an auth rejection or bounces the request to its
//! login page; both degrade the send to `session_invalid`, which callers
//! treat as fatal for the whole run.

use std::path::Path;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header;
use serde::Deserialize;

use crate::channels::channel::Channel;
use crate::channels::message::RenderedMessage;
use crate::config::NetworkChannelConfig;
use crate::crm::{ChannelKind, Contact};
use crate::error::{ChannelError, ConfigError};

/// Persisted browser session state, reduced to its cookie jar.
#[derive(Debug, Deserialize)]
struct SessionState {
    #[serde(default)]
    cookies: Vec<SessionCookie>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

/// Join cookies into a `Cookie` request header value.
fn cookie_header(cookies: &[SessionCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The network requires its session cookie echoed back as a CSRF header,
/// with the surrounding quotes removed.
fn csrf_token(cookies: &[SessionCookie]) -> Option<String> {
    cookies
        .iter()
        .find(|c| c.name == "JSESSIONID")
        .map(|c| c.value.trim_matches('"').to_string())
}

/// A response that landed on the login or challenge page means the session
/// is no longer authenticated.
fn is_login_redirect(path: &str) -> bool {
    let path = path.to_lowercase();
    path.contains("login") || path.contains("challenge")
}

/// Channel sending DMs through the network's messaging endpoint, reusing
/// one long-lived session for the whole process lifetime.
pub struct NetworkMessageChannel {
    http: reqwest::Client,
    api_base: String,
    cookie_header: String,
    csrf: Option<String>,
}

impl NetworkMessageChannel {
    /// Load the persisted session and build the channel. A missing or
    /// empty session file is a configuration error: the operator has to
    /// authenticate out-of-band before outreach can run.
    pub fn from_session_file(config: &NetworkChannelConfig) -> Result<Self, ConfigError> {
        let state = load_session_state(&config.session_path)?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "NETWORK_API_BASE".into(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            cookie_header: cookie_header(&state.cookies),
            csrf: csrf_token(&state.cookies),
        })
    }
}

fn load_session_state(path: &Path) -> Result<SessionState, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let state: SessionState =
        serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidValue {
            key: "NETWORK_SESSION_PATH".into(),
            message: format!("invalid session state in {}: {e}", path.display()),
        })?;

    if state.cookies.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "NETWORK_SESSION_PATH".into(),
            message: format!("session state in {} has no cookies", path.display()),
        });
    }
    Ok(state)
}

#[async_trait]
impl Channel for NetworkMessageChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::NetworkMessage
    }

    async fn deliver(
        &self,
        contact: &Contact,
        message: &RenderedMessage,
    ) -> Result<(), ChannelError> {
        let recipient = contact
            .address_for(ChannelKind::NetworkMessage)
            .ok_or_else(|| ChannelError::InvalidRecipient {
                name: "network-message",
                reason: format!("contact {} has no network handle", contact.id),
            })?;

        let url = format!("{}/messaging/messages", self.api_base);
        let mut request = self
            .http
            .post(&url)
            .header(header::COOKIE, &self.cookie_header)
            .json(&serde_json::json!({
                "recipient": recipient,
                "text": message.body,
            }));
        if let Some(token) = &self.csrf {
            request = request.header("csrf-token", token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "network-message",
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ChannelError::SessionInvalid {
                name: "network-message",
            });
        }
        if is_login_redirect(resp.url().path()) {
            return Err(ChannelError::SessionInvalid {
                name: "network-message",
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "network-message",
                reason: format!("messaging endpoint returned {status}: {body}"),
            });
        }

        tracing::info!(contact = contact.id, "Network message sent");
        Ok(())
    }
}
