use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// Frames the client may send over the live channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    ChatMessage { match_id: Uuid, content: String },
}

/// Frames pushed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    ChatMessage { message: Message },
    Error { code: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parses_chat_message_frame() {
        let raw = r#"{
            "type": "chat_message",
            "match_id": "7f2c0f6e-8a10-4f4e-9f4f-1d2b3c4d5e6f",
            "content": "hey!"
        }"#;

        let ClientFrame::ChatMessage { match_id, content } =
            serde_json::from_str::<ClientFrame>(raw).unwrap();

        assert_eq!(
            match_id,
            Uuid::parse_str("7f2c0f6e-8a10-4f4e-9f4f-1d2b3c4d5e6f").unwrap()
        );
        assert_eq!(content, "hey!");
    }

    #[test]
    fn rejects_unknown_and_incomplete_frames() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"typing"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"chat_message"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>("not json at all").is_err());
    }

    #[test]
    fn outbound_chat_frame_is_tagged() {
        let frame = ServerFrame::ChatMessage {
            message: Message {
                id: Uuid::new_v4(),
                match_id: Uuid::new_v4(),
                sender_id: Uuid::new_v4(),
                content: "hello".into(),
                created_at: Utc::now(),
            },
        };

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(json["type"], "chat_message");
        assert_eq!(json["message"]["content"], "hello");
    }
}
