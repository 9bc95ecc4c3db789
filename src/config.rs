//! Configuration, read from the environment once at startup.
//!
//! Invalid values fail here, never mid-run. Channels follow the
//! enabled-when-configured convention: a channel section is `None` when its
//! anchor variable is unset, and an error when the anchor is set but the
//! rest of the section is unusable.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// CRM access settings.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub base_url: String,
    /// Optional bearer token for the CRM API.
    pub api_token: Option<SecretString>,
    pub request_timeout: Duration,
    /// The CRM's numeric contact-method id for email outreach.
    pub email_method_id: u32,
    /// The CRM's numeric contact-method id for network-message outreach.
    pub network_method_id: u32,
}

/// Randomized inter-send delay bounds.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

/// SMTP settings for the email channel.
#[derive(Debug, Clone)]
pub struct EmailChannelConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

/// Persisted-session settings for the network-message channel.
#[derive(Debug, Clone)]
pub struct NetworkChannelConfig {
    pub session_path: PathBuf,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub crm: CrmConfig,
    pub pacing: PacingConfig,
    /// `None` when `SMTP_HOST` is unset (email channel disabled).
    pub email: Option<EmailChannelConfig>,
    /// `None` when `NETWORK_SESSION_PATH` is unset (network channel disabled).
    pub network: Option<NetworkChannelConfig>,
    /// Upper bound on a single `Channel::deliver` call.
    pub send_timeout: Duration,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let crm = CrmConfig {
            base_url: required(get, "CRM_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            api_token: get("CRM_API_TOKEN")
                .filter(|t| !t.trim().is_empty())
                .map(SecretString::from),
            request_timeout: Duration::from_secs(parsed_or(get, "CRM_TIMEOUT_SECS", 20u64)?),
            email_method_id: parsed_or(get, "CRM_EMAIL_METHOD_ID", 2u32)?,
            network_method_id: parsed_or(get, "CRM_NETWORK_METHOD_ID", 4u32)?,
        };

        let pacing = PacingConfig {
            min_delay: Duration::from_millis(parsed_or(get, "SEND_MIN_DELAY_MS", 1500u64)?),
            max_delay: Duration::from_millis(parsed_or(get, "SEND_MAX_DELAY_MS", 3500u64)?),
        };
        if pacing.min_delay > pacing.max_delay {
            return Err(ConfigError::InvalidValue {
                key: "SEND_MIN_DELAY_MS".into(),
                message: format!(
                    "min delay {}ms exceeds max delay {}ms",
                    pacing.min_delay.as_millis(),
                    pacing.max_delay.as_millis()
                ),
            });
        }

        let email = match get("SMTP_HOST") {
            Some(host) if !host.trim().is_empty() => {
                let username = required(get, "SMTP_USERNAME")?;
                Some(EmailChannelConfig {
                    smtp_host: host.trim().to_string(),
                    smtp_port: parsed_or(get, "SMTP_PORT", 587u16)?,
                    password: SecretString::from(required(get, "SMTP_PASSWORD")?),
                    from_address: get("SMTP_FROM_ADDRESS")
                        .filter(|a| !a.trim().is_empty())
                        .unwrap_or_else(|| username.clone()),
                    username,
                })
            }
            _ => None,
        };

        let network = match get("NETWORK_SESSION_PATH") {
            Some(path) if !path.trim().is_empty() => Some(NetworkChannelConfig {
                session_path: PathBuf::from(path.trim()),
                api_base: required(get, "NETWORK_API_BASE")?,
            }),
            _ => None,
        };

        Ok(Self {
            crm,
            pacing,
            email,
            network,
            send_timeout: Duration::from_secs(parsed_or(get, "SEND_TIMEOUT_SECS", 120u64)?),
            bind_addr: get("BIND_ADDR")
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        })
    }
}

fn required(get: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parsed_or<T>(
    get: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}
