//! Home Assistant MQTT discovery
//!
//! On every (re)connection the device publishes a retained config record so
//! Home Assistant registers it as a `text` entity whose command topic feeds
//! the display. The record depends only on [`DeviceIdentity`], so
//! republishing it is idempotent.
//!
//! Topic: `{prefix}/{component}/{hostname}/config`
//! Payload: `{"name":..,"command_topic":..,"state_topic":..,"unique_id":..}`

use heapless::String;
use serde::Serialize;

use crate::config::DeviceIdentity;
use crate::error::{SessionError, TopicError};

/// Maximum MQTT topic length handled by the device
pub const MAX_TOPIC_LEN: usize = 96;

/// Maximum serialized discovery record length
pub const MAX_DISCOVERY_LEN: usize = 256;

/// Maximum client identifier length (`{hostname}-{username}`)
pub const MAX_CLIENT_ID_LEN: usize = 64;

#[derive(Serialize)]
struct DiscoveryRecord<'a> {
    name: &'a str,
    command_topic: &'a str,
    state_topic: &'a str,
    unique_id: &'a str,
}

/// Discovery message ready to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: String<MAX_DISCOVERY_LEN>,
}

impl Discovery {
    /// Build the discovery topic and record for `identity`
    pub fn for_identity(identity: &DeviceIdentity) -> Result<Self, SessionError> {
        let topic = join_topic(&[
            identity.discovery_prefix,
            identity.discovery_component,
            identity.hostname,
            "config",
        ])?;

        let record = DiscoveryRecord {
            name: identity.hostname,
            command_topic: identity.command_topic,
            state_topic: identity.state_topic,
            unique_id: identity.hostname,
        };
        let payload = serde_json_core::to_string::<_, MAX_DISCOVERY_LEN>(&record)
            .map_err(|_| SessionError::Encode)?;

        Ok(Self { topic, payload })
    }
}

/// Client identifier presented to the broker
pub fn client_id(hostname: &str, username: &str) -> Result<String<MAX_CLIENT_ID_LEN>, TopicError> {
    let mut id = String::new();
    id.push_str(hostname).map_err(|_| TopicError::TooLong)?;
    id.push('-').map_err(|_| TopicError::TooLong)?;
    id.push_str(username).map_err(|_| TopicError::TooLong)?;
    Ok(id)
}

/// Join topic segments with `/`
///
/// MQTT topic names cannot contain wildcards (`+`, `#`) or NUL.
fn join_topic(segments: &[&str]) -> Result<String<MAX_TOPIC_LEN>, TopicError> {
    let mut topic = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if segment.contains(['+', '#', '\0']) {
            return Err(TopicError::InvalidCharacter);
        }
        if i > 0 {
            topic.push('/').map_err(|_| TopicError::TooLong)?;
        }
        topic.push_str(segment).map_err(|_| TopicError::TooLong)?;
    }
    Ok(topic)
}
