//! Session pattern configuration: which agent roles participate in an
//! interview, who opens it, and the in-band tokens that terminate it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// In-band token an agent emits when the interview wraps up normally.
pub const END_MARKER: &str = "[INTERVIEW_END]";
/// In-band token an agent emits to cut the interview short.
pub const ABORT_MARKER: &str = "[INTERVIEW_ABORT]";

/// An agent-driven participant. The human moderator is a [`Speaker`] but
/// never an `AgentRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Interviewer,
    Candidate,
}

impl AgentRole {
    pub fn other(self) -> AgentRole {
        match self {
            AgentRole::Interviewer => AgentRole::Candidate,
            AgentRole::Candidate => AgentRole::Interviewer,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AgentRole::Interviewer => "Interviewer",
            AgentRole::Candidate => "Candidate",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Interviewer => write!(f, "interviewer"),
            AgentRole::Candidate => write!(f, "candidate"),
        }
    }
}

/// Anyone who can own a transcript entry or hold the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Interviewer,
    Candidate,
    Human,
}

impl Speaker {
    pub fn as_agent(self) -> Option<AgentRole> {
        match self {
            Speaker::Interviewer => Some(AgentRole::Interviewer),
            Speaker::Candidate => Some(AgentRole::Candidate),
            Speaker::Human => None,
        }
    }
}

impl From<AgentRole> for Speaker {
    fn from(role: AgentRole) -> Self {
        match role {
            AgentRole::Interviewer => Speaker::Interviewer,
            AgentRole::Candidate => Speaker::Candidate,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Interviewer => write!(f, "interviewer"),
            Speaker::Candidate => write!(f, "candidate"),
            Speaker::Human => write!(f, "human"),
        }
    }
}

/// Which agent roles a session variant runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPattern {
    /// The human plays the candidate against an AI interviewer.
    InterviewerOnly,
    /// The human plays the interviewer against an AI candidate.
    CandidateOnly,
    /// Two agents interview each other, moderated by the human.
    #[default]
    Full,
}

impl InterviewPattern {
    pub fn participants(self) -> &'static [AgentRole] {
        match self {
            InterviewPattern::InterviewerOnly => &[AgentRole::Interviewer],
            InterviewPattern::CandidateOnly => &[AgentRole::Candidate],
            InterviewPattern::Full => &[AgentRole::Interviewer, AgentRole::Candidate],
        }
    }

    pub fn includes(self, role: AgentRole) -> bool {
        self.participants().contains(&role)
    }

    /// The role that opens the session.
    pub fn first_speaker(self) -> AgentRole {
        match self {
            InterviewPattern::CandidateOnly => AgentRole::Candidate,
            _ => AgentRole::Interviewer,
        }
    }
}

/// Target language proficiency of the simulated candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

/// Fixed-for-the-session configuration chosen by the client at start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternConfig {
    pub pattern: InterviewPattern,
    #[serde(default)]
    pub proficiency: Proficiency,
    #[serde(default)]
    pub interviewer_persona: Option<String>,
    #[serde(default)]
    pub candidate_persona: Option<String>,
}

impl PatternConfig {
    pub fn persona(&self, role: AgentRole) -> Option<&str> {
        match role {
            AgentRole::Interviewer => self.interviewer_persona.as_deref(),
            AgentRole::Candidate => self.candidate_persona.as_deref(),
        }
    }
}

/// How a detected marker ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Completed,
    Aborted,
}

/// Scans committed agent text for a termination marker. Abort wins when
/// both appear in one utterance.
pub fn scan_markers(text: &str) -> Option<Termination> {
    if text.contains(ABORT_MARKER) {
        Some(Termination::Aborted)
    } else if text.contains(END_MARKER) {
        Some(Termination::Completed)
    } else {
        None
    }
}
