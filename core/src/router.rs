//! Inbound message routing
//!
//! Only the command topic is subscribed, so every delivered message is text
//! for the display. Payloads are forwarded verbatim, without decoding or
//! topic filtering.

use hal_abstractions::{DisplaySink, InboundHandler};

use crate::logging::info;

/// Hands inbound payloads to the display for the duration of one poll
pub struct MessageRouter<'a, D> {
    display: &'a mut D,
    forwarded: usize,
}

impl<'a, D: DisplaySink> MessageRouter<'a, D> {
    pub fn new(display: &'a mut D) -> Self {
        Self {
            display,
            forwarded: 0,
        }
    }

    /// Messages forwarded since construction
    pub fn forwarded(&self) -> usize {
        self.forwarded
    }
}

impl<D: DisplaySink> InboundHandler for MessageRouter<'_, D> {
    fn on_message(&mut self, topic: &str, payload: &[u8]) {
        info!(
            "Received MQTT message for topic {}, length {}",
            topic,
            payload.len()
        );
        self.display.show(payload, true);
        self.forwarded += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::RecordingDisplay;

    #[test]
    fn test_payload_forwarded_verbatim() {
        let mut display = RecordingDisplay::default();
        let mut router = MessageRouter::new(&mut display);
        router.on_message("splitflap/text/set", b"HELLO \xff");
        router.on_message("anything/else", b"");
        assert_eq!(router.forwarded(), 2);

        assert_eq!(display.writes.len(), 2);
        assert_eq!(display.writes[0], (b"HELLO \xff".to_vec(), true));
        assert_eq!(display.writes[1], (Vec::new(), true));
    }
}
