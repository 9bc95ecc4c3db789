//! Channel abstraction for outbound delivery.

pub mod channel;
pub mod email;
pub mod message;
pub mod network;

pub use channel::{Channel, ChannelSet};
pub use email::EmailChannel;
pub use message::{RenderedMessage, render};
pub use network::NetworkMessageChannel;
