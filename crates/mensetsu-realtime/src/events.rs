//! Normalizes the open-ended set of upstream event types into a closed
//! union the orchestrator can match exhaustively.

use serde_json::Value;

/// Canonical upstream event set.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedEvent {
    /// The remote session is usable.
    SessionReady,
    /// A chunk of generated speech, base64-encoded.
    AudioDelta { audio: String },
    /// Generated speech for the current response is fully available.
    AudioDone,
    /// A fragment of the agent's outbound transcript.
    TranscriptDelta { delta: String },
    /// The agent's finished utterance for the current response.
    TranscriptDone { transcript: String },
    /// Response generation finished, successfully or not.
    ResponseDone {
        status: String,
        error_code: Option<String>,
        error_message: Option<String>,
    },
    /// A fragment of the transcription of input audio.
    InputTranscriptDelta { delta: String },
    /// The finished transcription of committed input audio.
    InputTranscriptDone { transcript: String },
    /// An upstream error notice.
    Error { message: String },
    /// Anything this system does not consume.
    Unknown,
}

impl NormalizedEvent {
    /// A response that did not complete cleanly.
    pub fn is_failed_response(&self) -> bool {
        matches!(self, NormalizedEvent::ResponseDone { status, .. } if status != "completed")
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Maps one inbound upstream message to the canonical set. Total: any
/// unrecognized type string becomes [`NormalizedEvent::Unknown`].
pub fn normalize(raw: &Value) -> NormalizedEvent {
    match str_field(raw, "type") {
        "session.created" | "session.updated" => NormalizedEvent::SessionReady,
        "response.audio.delta" => NormalizedEvent::AudioDelta {
            audio: str_field(raw, "delta").to_string(),
        },
        "response.audio.done" => NormalizedEvent::AudioDone,
        "response.audio_transcript.delta" | "response.text.delta" => {
            NormalizedEvent::TranscriptDelta {
                delta: str_field(raw, "delta").to_string(),
            }
        }
        "response.audio_transcript.done" => NormalizedEvent::TranscriptDone {
            transcript: str_field(raw, "transcript").to_string(),
        },
        "response.text.done" => NormalizedEvent::TranscriptDone {
            transcript: str_field(raw, "text").to_string(),
        },
        "response.done" => {
            let response = raw.get("response").cloned().unwrap_or(Value::Null);
            let error = response.get("status_details").and_then(|d| d.get("error"));
            NormalizedEvent::ResponseDone {
                status: str_field(&response, "status").to_string(),
                error_code: error
                    .and_then(|e| e.get("code"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                error_message: error
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        }
        "conversation.item.input_audio_transcription.delta" => {
            NormalizedEvent::InputTranscriptDelta {
                delta: str_field(raw, "delta").to_string(),
            }
        }
        "conversation.item.input_audio_transcription.completed" => {
            NormalizedEvent::InputTranscriptDone {
                transcript: str_field(raw, "transcript").to_string(),
            }
        }
        "error" => NormalizedEvent::Error {
            message: raw
                .get("error")
                .map(|e| str_field(e, "message"))
                .unwrap_or("")
                .to_string(),
        },
        _ => NormalizedEvent::Unknown,
    }
}

/// Filters high-frequency, low-information event types out of the
/// operational logs. Pure predicate, no side effects.
pub fn should_log(event_type: &str) -> bool {
    !matches!(
        event_type,
        "response.audio.delta"
            | "rate_limits.updated"
            | "input_audio_buffer.speech_started"
            | "input_audio_buffer.speech_stopped"
    )
}
