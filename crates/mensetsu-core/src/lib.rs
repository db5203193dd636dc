pub mod pattern;
pub mod scoring;
pub mod transcript;
pub mod turn;

pub use pattern::{
    ABORT_MARKER, AgentRole, END_MARKER, InterviewPattern, PatternConfig, Proficiency, Speaker,
    Termination,
};
pub use scoring::{EvaluationResult, Grade, ScoringEngine};
pub use transcript::{TranscriptEntry, TranscriptLog};
pub use turn::{Phase, TurnEngine, TurnMode, TurnSnapshot};
