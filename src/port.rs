//! The outbound half of the message channel.
//!
//! A [`Port`] only has to hand messages over in order; it never reports
//! delivery. Replies travel the other way through
//! [`Chuck::receive`](crate::Chuck::receive).

use futures_channel::mpsc;
use tracing::warn;
use webchuck_shared::OutMessage;

/// Transmits commands to the engine.
pub trait Port {
    /// Hand `message` to the transport. Must not block.
    fn post(&self, message: OutMessage);

    /// Release the transport. Called at most once, by
    /// [`Chuck::close`](crate::Chuck::close).
    fn close(&self) {}

    /// The audio graph node carrying the engine, for transports that have one.
    #[cfg(feature = "web")]
    fn audio_node(&self) -> Option<web_sys::AudioWorkletNode> {
        None
    }
}

/// An in-process port backed by an unbounded channel.
///
/// Whatever drives the engine (a native bridge, a test double) reads the
/// messages from the receiver returned by [`ChannelPort::new`].
#[derive(Debug, Clone)]
pub struct ChannelPort {
    sender: mpsc::UnboundedSender<OutMessage>,
}

impl ChannelPort {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutMessage>) {
        let (sender, receiver) = mpsc::unbounded();
        (Self { sender }, receiver)
    }
}

impl Port for ChannelPort {
    fn post(&self, message: OutMessage) {
        let tag = message.tag();
        if let Err(e) = self.sender.unbounded_send(message) {
            warn!("Dropping {tag} message, engine side of the channel is gone: {e:?}");
        }
    }

    fn close(&self) {
        self.sender.close_channel();
    }
}
