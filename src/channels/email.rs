//! Email channel — SMTP via lettre over an already-authenticated relay.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use crate::channels::channel::Channel;
use crate::channels::message::RenderedMessage;
use crate::config::EmailChannelConfig;
use crate::crm::{ChannelKind, Contact};
use crate::error::ChannelError;

/// Stateless-per-call SMTP sender. Each delivery builds a fresh transport;
/// the relay connection itself is cheap next to the pacing delays.
pub struct EmailChannel {
    config: EmailChannelConfig,
}

impl EmailChannel {
    pub fn new(config: EmailChannelConfig) -> Self {
        Self { config }
    }

    /// Blocking SMTP send — run inside `spawn_blocking`.
    fn send_email(
        config: &EmailChannelConfig,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), ChannelError> {
        let creds = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| ChannelError::SendFailed {
                name: "email",
                reason: format!("SMTP relay error: {e}"),
            })?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        let email = Message::builder()
            .from(
                config
                    .from_address
                    .parse()
                    .map_err(|e| ChannelError::SendFailed {
                        name: "email",
                        reason: format!("Invalid from address: {e}"),
                    })?,
            )
            .to(to.parse().map_err(|e| ChannelError::InvalidRecipient {
                name: "email",
                reason: format!("{to}: {e}"),
            })?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| ChannelError::SendFailed {
                name: "email",
                reason: format!("Failed to build email: {e}"),
            })?;

        transport.send(&email).map_err(|e| ChannelError::SendFailed {
            name: "email",
            reason: format!("SMTP send failed: {e}"),
        })?;

        Ok(())
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn deliver(
        &self,
        contact: &Contact,
        message: &RenderedMessage,
    ) -> Result<(), ChannelError> {
        let to = contact
            .address_for(ChannelKind::Email)
            .ok_or_else(|| ChannelError::InvalidRecipient {
                name: "email",
                reason: format!("contact {} has no email address", contact.id),
            })?
            .to_string();

        let config = self.config.clone();
        let subject = message.subject.clone().unwrap_or_default();
        let body = message.body.clone();

        tokio::task::spawn_blocking(move || Self::send_email(&config, &to, &subject, &body))
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "email",
                reason: format!("send task failed: {e}"),
            })??;

        tracing::info!(contact = contact.id, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config() -> EmailChannelConfig {
        EmailChannelConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            username: "outreach@example.com".into(),
            password: SecretString::from("secret"),
            from_address: "outreach@example.com".into(),
        }
    }

    #[tokio::test]
    async fn deliver_without_address_is_invalid_recipient() {
        let channel = EmailChannel::new(config());
        let contact = Contact {
            id: 5,
            name: "Noah".into(),
            email: None,
            handle: Some("https://network.example/in/noah".into()),
        };
        let message = RenderedMessage {
            subject: Some("Hello".into()),
            body: "Hi".into(),
        };

        let err = channel.deliver(&contact, &message).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidRecipient { .. }));
        assert!(!err.is_session_fatal());
    }
}
