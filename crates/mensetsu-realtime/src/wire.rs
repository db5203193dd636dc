//! Outbound wire protocol for the live realtime endpoint.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionUpdate },
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,
    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear,
    #[serde(rename = "response.create")]
    ResponseCreate,
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

/// Session parameters sent once after the socket opens. Turn detection
/// is serialized as an explicit null: the orchestrator owns turn-taking,
/// so server-side voice activity detection stays off.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub modalities: Vec<String>,
    pub instructions: String,
    pub voice: String,
    pub input_audio_transcription: Option<TranscriptionConfig>,
    pub turn_detection: Option<serde_json::Value>,
}

impl SessionUpdate {
    pub fn new(instructions: &str, voice: &str) -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: instructions.to_string(),
            voice: voice.to_string(),
            input_audio_transcription: Some(TranscriptionConfig {
                model: "whisper-1".to_string(),
            }),
            turn_detection: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionConfig {
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub content: Vec<ContentPart>,
}

impl ConversationItem {
    /// A user-role text message injected as conversational context.
    pub fn user_text(text: &str) -> Self {
        Self {
            kind: "message".to_string(),
            role: "user".to_string(),
            content: vec![ContentPart {
                kind: "input_text".to_string(),
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_dotted_type_tags() {
        let json = serde_json::to_value(OutboundEvent::ResponseCreate).unwrap();
        assert_eq!(json["type"], "response.create");

        let json = serde_json::to_value(OutboundEvent::InputAudioBufferAppend {
            audio: "AAAA".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "input_audio_buffer.append");
        assert_eq!(json["audio"], "AAAA");
    }

    #[test]
    fn session_update_disables_server_turn_detection() {
        let json = serde_json::to_value(OutboundEvent::SessionUpdate {
            session: SessionUpdate::new("Be terse.", "alloy"),
        })
        .unwrap();
        assert_eq!(json["type"], "session.update");
        assert_eq!(json["session"]["voice"], "alloy");
        assert!(json["session"]["turn_detection"].is_null());
        assert_eq!(
            json["session"]["input_audio_transcription"]["model"],
            "whisper-1"
        );
    }

    #[test]
    fn context_item_is_a_user_text_message() {
        let json = serde_json::to_value(OutboundEvent::ConversationItemCreate {
            item: ConversationItem::user_text("Interviewer said: welcome."),
        })
        .unwrap();
        assert_eq!(json["item"]["type"], "message");
        assert_eq!(json["item"]["role"], "user");
        assert_eq!(json["item"]["content"][0]["type"], "input_text");
    }
}
