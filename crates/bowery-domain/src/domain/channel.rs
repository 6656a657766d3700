//! Lifecycle events pushed on a container's pub/sub channel.

use serde_json::Value;

use crate::domain::container::Container;
use crate::domain::container::ContainerId;

const CHANNEL_PREFIX: &str = "container-";

pub fn channel_name(id: &ContainerId) -> String {
    format!("{CHANNEL_PREFIX}{id}")
}

pub fn container_id_from_channel(channel: &str) -> Option<ContainerId> {
    channel
        .strip_prefix(CHANNEL_PREFIX)
        .and_then(|id| ContainerId::try_new(id).ok())
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Provisioning finished; carries the finalized container.
    Created(Container),
    Update(Value),
    Error(Value),
    /// A save started by `PUT /containers/{id}` is durable.
    Saved(Value),
}

impl ChannelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::Created(_) => "created",
            ChannelEvent::Update(_) => "update",
            ChannelEvent::Error(_) => "error",
            ChannelEvent::Saved(_) => "saved",
        }
    }

    /// Decodes a named event. Unknown names (protocol housekeeping included) yield `None`.
    ///
    /// Pusher delivers `data` as a JSON-encoded string; plain objects are accepted too.
    pub fn from_wire(name: &str, data: Value) -> Result<Option<Self>, serde_json::Error> {
        let data = match data {
            Value::String(raw) if raw.trim().is_empty() => Value::Null,
            Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
            other => other,
        };
        let event = match name {
            "created" => ChannelEvent::Created(serde_json::from_value(data)?),
            "update" => ChannelEvent::Update(data),
            "error" => ChannelEvent::Error(data),
            "saved" => ChannelEvent::Saved(data),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// An event tagged with the container whose channel delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    pub container_id: ContainerId,
    pub event: ChannelEvent,
}
