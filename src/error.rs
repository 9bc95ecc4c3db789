//! Error types for the outreach engine.

use std::time::Duration;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors. Surfaced at startup, never mid-run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the CRM collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    /// CRM unreachable, returned a non-2xx status, or the request timed out.
    #[error("CRM upstream failure: {reason}")]
    Upstream { status: Option<u16>, reason: String },

    /// A referenced campaign or contact does not exist in the CRM.
    #[error("{entity} {id} not found in CRM")]
    NotFound { entity: &'static str, id: i64 },

    /// The CRM answered 2xx but the body did not parse as expected.
    #[error("Malformed CRM response: {0}")]
    Malformed(String),
}

impl CrmError {
    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors from a delivery channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: &'static str, reason: String },

    #[error("Invalid recipient on channel {name}: {reason}")]
    InvalidRecipient { name: &'static str, reason: String },

    /// The channel's authenticated session is unusable. Fatal for the whole
    /// run; remediation is out-of-band re-authentication, not a retry.
    #[error("session_invalid")]
    SessionInvalid { name: &'static str },

    #[error("Send on channel {name} timed out after {after:?}")]
    Timeout { name: &'static str, after: Duration },
}

impl ChannelError {
    /// True for failures that invalidate the channel for every remaining
    /// contact in the run, not just the current one.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::SessionInvalid { .. })
    }
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
