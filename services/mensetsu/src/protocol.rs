//! Client-facing session protocol: JSON messages tagged by `type` over
//! the WebSocket. The legacy variants are accepted permanently and route
//! onto the same internal handling paths as their modern counterparts.

use chrono::{DateTime, Utc};
use mensetsu_core::scoring::EvaluationResult;
use mensetsu_core::{AgentRole, InterviewPattern, Phase, Proficiency, Speaker, TurnMode};
use serde::{Deserialize, Serialize};

/// Which agent(s) a human text or audio submission is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Interviewer,
    Candidate,
    Both,
}

impl Target {
    pub fn roles(self) -> &'static [AgentRole] {
        match self {
            Target::Interviewer => &[AgentRole::Interviewer],
            Target::Candidate => &[AgentRole::Candidate],
            Target::Both => &[AgentRole::Interviewer, AgentRole::Candidate],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StartSession {
        #[serde(default)]
        mode: TurnMode,
        #[serde(default)]
        pattern: InterviewPattern,
        #[serde(default)]
        proficiency: Proficiency,
        #[serde(default)]
        interviewer_persona: Option<String>,
        #[serde(default)]
        candidate_persona: Option<String>,
    },
    SetMode {
        mode: TurnMode,
    },
    NextTurn,
    SubmitText {
        target: Target,
        text: String,
    },
    AppendAudio {
        target: Target,
        audio: String,
    },
    CommitAudio {
        target: Target,
    },
    EndSession,

    // Legacy message kinds, kept for older clients.
    /// Bare start with session defaults.
    Start,
    /// Raw human audio blob, appended and committed in one message.
    Audio {
        data: String,
    },
    /// The client finished playing an agent's speech.
    PlaybackFinished {
        #[serde(default)]
        speaker: Option<AgentRole>,
    },
    /// Advance without a moderator comment.
    Proceed,
    SpeechStart,
    SpeechDone,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionReady {
        pattern: InterviewPattern,
        participants: Vec<AgentRole>,
    },
    TurnState {
        phase: Phase,
        speaker: Option<Speaker>,
        waiting_for_next: bool,
        mode: TurnMode,
        turn_count: u32,
    },
    TranscriptDelta {
        speaker: Speaker,
        delta: String,
    },
    TranscriptCommitted {
        speaker: Speaker,
        display_name: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
    AudioDelta {
        speaker: Speaker,
        audio: String,
    },
    AudioDone {
        speaker: Speaker,
    },
    Evaluation {
        result: EvaluationResult,
    },
    Error {
        message: String,
    },
    /// Legacy mirror of [`ServerMessage::TurnState`] for older clients.
    PhaseChange {
        phase: Phase,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modern_messages_parse() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{
                "type": "start_session",
                "mode": "auto",
                "pattern": "full",
                "proficiency": "advanced",
                "candidate_persona": "Aiko"
            }"#,
        )
        .unwrap();
        match msg {
            ClientMessage::StartSession {
                mode,
                pattern,
                proficiency,
                candidate_persona,
                ..
            } => {
                assert_eq!(mode, TurnMode::Auto);
                assert_eq!(pattern, InterviewPattern::Full);
                assert_eq!(proficiency, Proficiency::Advanced);
                assert_eq!(candidate_persona.as_deref(), Some("Aiko"));
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let msg: ClientMessage = serde_json::from_str(
            r#"{ "type": "submit_text", "target": "both", "text": "Please continue." }"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::SubmitText {
                target: Target::Both,
                ..
            }
        ));
    }

    #[test]
    fn start_session_defaults_apply() {
        let msg: ClientMessage = serde_json::from_str(r#"{ "type": "start_session" }"#).unwrap();
        match msg {
            ClientMessage::StartSession {
                mode,
                pattern,
                proficiency,
                interviewer_persona,
                candidate_persona,
            } => {
                assert_eq!(mode, TurnMode::Step);
                assert_eq!(pattern, InterviewPattern::Full);
                assert_eq!(proficiency, Proficiency::Intermediate);
                assert!(interviewer_persona.is_none());
                assert!(candidate_persona.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn legacy_messages_parse() {
        for (raw, expect_start) in [
            (r#"{ "type": "start" }"#, true),
            (r#"{ "type": "proceed" }"#, false),
            (r#"{ "type": "speech_start" }"#, false),
            (r#"{ "type": "speech_done" }"#, false),
        ] {
            let msg: ClientMessage = serde_json::from_str(raw).unwrap();
            assert_eq!(matches!(msg, ClientMessage::Start), expect_start, "{raw}");
        }

        let msg: ClientMessage =
            serde_json::from_str(r#"{ "type": "playback_finished", "speaker": "candidate" }"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::PlaybackFinished {
                speaker: Some(AgentRole::Candidate)
            }
        ));

        // Speaker is optional on the legacy notice.
        let msg: ClientMessage =
            serde_json::from_str(r#"{ "type": "playback_finished" }"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::PlaybackFinished { speaker: None }
        ));

        let msg: ClientMessage =
            serde_json::from_str(r#"{ "type": "audio", "data": "QUFB" }"#).unwrap();
        assert!(matches!(msg, ClientMessage::Audio { .. }));
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{ "type": "made_up" }"#).is_err());
    }

    #[test]
    fn server_messages_serialize_with_snake_case_tags() {
        let json = serde_json::to_value(ServerMessage::TurnState {
            phase: Phase::UserChoice,
            speaker: None,
            waiting_for_next: true,
            mode: TurnMode::Step,
            turn_count: 3,
        })
        .unwrap();
        assert_eq!(json["type"], "turn_state");
        assert_eq!(json["phase"], "user_choice");
        assert_eq!(json["waiting_for_next"], true);

        let json = serde_json::to_value(ServerMessage::PhaseChange {
            phase: Phase::Ended,
        })
        .unwrap();
        assert_eq!(json["type"], "phase_change");
        assert_eq!(json["phase"], "ended");
    }
}
