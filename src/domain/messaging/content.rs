//! Inbound message envelopes and text extraction.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EngineMessageId, Timestamp};

use super::address::{bare_address, STATUS_BROADCAST};

/// Payload of an inbound message as typed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    Text { text: String },
    ExtendedText { text: String },
    Image { caption: Option<String> },
    Video { caption: Option<String> },
    Document { caption: Option<String> },
    /// Stickers, reactions, protocol messages and anything else.
    Other { kind: String },
}

impl MessagePayload {
    /// Text carried by the payload, if any.
    pub fn text(&self) -> Option<&str> {
        let text = match self {
            MessagePayload::Text { text } | MessagePayload::ExtendedText { text } => Some(text.as_str()),
            MessagePayload::Image { caption }
            | MessagePayload::Video { caption }
            | MessagePayload::Document { caption } => caption.as_deref(),
            MessagePayload::Other { .. } => None,
        };
        text.filter(|t| !t.trim().is_empty())
    }
}

/// One message delivered by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub engine_message_id: EngineMessageId,
    pub remote_jid: String,
    pub from_me: bool,
    pub push_name: Option<String>,
    pub timestamp: Timestamp,
    pub payload: MessagePayload,
}

impl InboundMessage {
    pub fn is_status_broadcast(&self) -> bool {
        self.remote_jid == STATUS_BROADCAST
    }

    /// Sender address without server or device suffix.
    pub fn sender(&self) -> &str {
        bare_address(&self.remote_jid)
    }

    /// Text worth persisting, or `None` when the message should be dropped.
    pub fn extract_text(&self) -> Option<&str> {
        if self.from_me || self.is_status_broadcast() {
            return None;
        }
        self.payload.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(payload: MessagePayload) -> InboundMessage {
        InboundMessage {
            engine_message_id: EngineMessageId::new("ABC123"),
            remote_jid: "15551234567@s.whatsapp.net".into(),
            from_me: false,
            push_name: Some("Ana".into()),
            timestamp: Timestamp::from_unix_secs(1_700_000_000),
            payload,
        }
    }

    #[test]
    fn extracts_plain_and_extended_text() {
        assert_eq!(
            message(MessagePayload::Text { text: "hi".into() }).extract_text(),
            Some("hi")
        );
        assert_eq!(
            message(MessagePayload::ExtendedText { text: "bold".into() }).extract_text(),
            Some("bold")
        );
    }

    #[test]
    fn extracts_media_captions() {
        for payload in [
            MessagePayload::Image { caption: Some("look".into()) },
            MessagePayload::Video { caption: Some("look".into()) },
            MessagePayload::Document { caption: Some("look".into()) },
        ] {
            assert_eq!(message(payload).extract_text(), Some("look"));
        }
    }

    #[test]
    fn media_without_caption_has_no_content() {
        assert_eq!(message(MessagePayload::Image { caption: None }).extract_text(), None);
    }

    #[test]
    fn other_payloads_and_blank_text_are_dropped() {
        assert_eq!(
            message(MessagePayload::Other { kind: "sticker".into() }).extract_text(),
            None
        );
        assert_eq!(message(MessagePayload::Text { text: "  ".into() }).extract_text(), None);
    }

    #[test]
    fn own_and_status_messages_are_skipped() {
        let mut own = message(MessagePayload::Text { text: "hi".into() });
        own.from_me = true;
        assert_eq!(own.extract_text(), None);

        let mut status = message(MessagePayload::Text { text: "hi".into() });
        status.remote_jid = STATUS_BROADCAST.into();
        assert_eq!(status.extract_text(), None);
    }

    #[test]
    fn every_payload_survives_json() {
        let payloads = [
            MessagePayload::Text { text: "hi".into() },
            MessagePayload::ExtendedText { text: "bold".into() },
            MessagePayload::Image { caption: Some("look".into()) },
            MessagePayload::Video { caption: None },
            MessagePayload::Document { caption: Some("invoice".into()) },
            MessagePayload::Other { kind: "sticker".into() },
        ];
        for payload in payloads {
            let json = serde_json::to_value(&payload).unwrap();
            assert!(json["type"].is_string());
            let back: MessagePayload = serde_json::from_value(json).unwrap();
            assert_eq!(back, payload);
        }
    }

    #[test]
    fn other_payload_keeps_its_kind_next_to_the_tag() {
        let json = serde_json::to_value(MessagePayload::Other { kind: "reaction".into() }).unwrap();
        assert_eq!(json["type"], "other");
        assert_eq!(json["kind"], "reaction");
    }

    #[test]
    fn sender_is_bare_address() {
        let mut msg = message(MessagePayload::Text { text: "hi".into() });
        msg.remote_jid = "15551234567:3@s.whatsapp.net".into();
        assert_eq!(msg.sender(), "15551234567");
    }
}
