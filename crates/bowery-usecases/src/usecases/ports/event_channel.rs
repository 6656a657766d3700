//! Pub/sub subscription port.
//!
//! Events are not returned from these calls. The adapter forwards every decoded
//! event as a `ChannelMessage` into the event loop that owns the sessions.

use super::errors::ChannelError;
use crate::domain::ContainerId;

/// An owned handle on one `container-{id}` topic.
pub trait Subscription: Send {
    fn channel(&self) -> &str;

    /// Stops delivery. Calling it twice is a no-op.
    fn unsubscribe(&mut self);
}

pub trait EventChannel: Send + Sync {
    fn subscribe(&self, container_id: &ContainerId) -> Result<Box<dyn Subscription>, ChannelError>;
}
