//! Outbound delivery capability, one implementation per [`ChannelKind`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::channels::message::RenderedMessage;
use crate::crm::{ChannelKind, Contact};
use crate::error::ChannelError;

/// Capability to deliver one message to one contact.
///
/// Implementations are handed an already-authenticated transport; acquiring
/// credentials or sessions is out of scope. `deliver` may take non-trivial
/// wall-clock time (browser-backed channels especially), so the
/// orchestrator bounds every call with its own timeout.
#[async_trait]
pub trait Channel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Deliver `message` to `contact`'s address for this channel.
    ///
    /// A `ChannelError::SessionInvalid` marks the channel unusable for the
    /// rest of the run; any other error is a per-contact failure.
    async fn deliver(
        &self,
        contact: &Contact,
        message: &RenderedMessage,
    ) -> Result<(), ChannelError>;
}

/// The channels configured for this process, keyed by kind.
#[derive(Default, Clone)]
pub struct ChannelSet {
    channels: HashMap<ChannelKind, Arc<dyn Channel>>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        self.channels.insert(channel.kind(), channel);
    }

    pub fn get(&self, kind: ChannelKind) -> Option<Arc<dyn Channel>> {
        self.channels.get(&kind).cloned()
    }

    /// Kinds with a registered implementation.
    pub fn available(&self) -> Vec<ChannelKind> {
        let mut kinds: Vec<_> = self.channels.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopChannel(ChannelKind);

    #[async_trait]
    impl Channel for NoopChannel {
        fn kind(&self) -> ChannelKind {
            self.0
        }

        async fn deliver(
            &self,
            _contact: &Contact,
            _message: &RenderedMessage,
        ) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    #[test]
    fn channel_set_lookup_by_kind() {
        let mut set = ChannelSet::new();
        set.register(Arc::new(NoopChannel(ChannelKind::Email)));

        assert!(set.get(ChannelKind::Email).is_some());
        assert!(set.get(ChannelKind::NetworkMessage).is_none());
        assert_eq!(set.available(), vec![ChannelKind::Email]);
    }

    #[test]
    fn default_name_is_wire_string() {
        let channel = NoopChannel(ChannelKind::NetworkMessage);
        assert_eq!(channel.name(), "network-message");
    }
}
