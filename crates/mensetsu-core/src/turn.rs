//! Conversational turn state machine.
//!
//! Owns who holds the floor and what the session is waiting on. Every
//! transition is total: calling one that does not apply in the current
//! phase is a safe no-op, because duplicate or racy messages from the
//! client and the upstream connections cannot be fully prevented.

use crate::pattern::{AgentRole, Speaker};
use serde::{Deserialize, Serialize};

/// Session-wide conversational phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Interviewer,
    Candidate,
    UserChoice,
    UserSpeaking,
    Ended,
}

impl Phase {
    fn for_agent(role: AgentRole) -> Phase {
        match role {
            AgentRole::Interviewer => Phase::Interviewer,
            AgentRole::Candidate => Phase::Candidate,
        }
    }
}

/// Turn-advance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    /// Pause for a human decision after every agent turn.
    #[default]
    Step,
    /// Chain interviewer -> candidate automatically; still pause after a
    /// candidate turn so the moderator can intervene.
    Auto,
}

/// Read-only view of the machine, pushed to the client after every
/// transition.
#[derive(Debug, Clone, Serialize)]
pub struct TurnSnapshot {
    pub phase: Phase,
    pub speaker: Option<Speaker>,
    pub waiting_for_next: bool,
    pub mode: TurnMode,
    pub turn_count: u32,
}

#[derive(Debug)]
pub struct TurnEngine {
    phase: Phase,
    current_speaker: Option<Speaker>,
    waiting_for_next: bool,
    mode: TurnMode,
    turn_count: u32,
    interviewer_turns: u32,
    candidate_turns: u32,
    human_turns: u32,
    last_agent: Option<AgentRole>,
}

impl TurnEngine {
    pub fn new(mode: TurnMode) -> Self {
        Self {
            phase: Phase::Waiting,
            current_speaker: None,
            waiting_for_next: false,
            mode,
            turn_count: 0,
            interviewer_turns: 0,
            candidate_turns: 0,
            human_turns: 0,
            last_agent: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_speaker(&self) -> Option<Speaker> {
        self.current_speaker
    }

    pub fn waiting_for_next(&self) -> bool {
        self.waiting_for_next
    }

    pub fn mode(&self) -> TurnMode {
        self.mode
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn turns_for(&self, speaker: Speaker) -> u32 {
        match speaker {
            Speaker::Interviewer => self.interviewer_turns,
            Speaker::Candidate => self.candidate_turns,
            Speaker::Human => self.human_turns,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot {
            phase: self.phase,
            speaker: self.current_speaker,
            waiting_for_next: self.waiting_for_next,
            mode: self.mode,
            turn_count: self.turn_count,
        }
    }

    pub fn set_mode(&mut self, mode: TurnMode) {
        self.mode = mode;
    }

    /// Opens the session with the given first speaker (interviewer when
    /// unspecified). Only valid from the initial waiting state.
    pub fn start(&mut self, first_speaker: Option<AgentRole>) {
        if self.phase != Phase::Waiting {
            tracing::debug!(phase = ?self.phase, "start ignored: session already running");
            return;
        }
        let role = first_speaker.unwrap_or(AgentRole::Interviewer);
        self.phase = Phase::for_agent(role);
        self.current_speaker = Some(role.into());
        self.waiting_for_next = false;
        self.turn_count = 1;
    }

    /// An agent finished its turn. Ignored unless that agent currently
    /// holds the floor, which makes the duplicated advance triggers
    /// (upstream audio-done and the client playback notice) idempotent.
    pub fn on_agent_speaking_done(&mut self, who: AgentRole) {
        if self.phase == Phase::Ended {
            return;
        }
        if self.current_speaker != Some(who.into()) {
            tracing::debug!(%who, speaker = ?self.current_speaker, "speaking-done ignored: not the current speaker");
            return;
        }
        match who {
            AgentRole::Interviewer => self.interviewer_turns += 1,
            AgentRole::Candidate => self.candidate_turns += 1,
        }
        self.turn_count += 1;
        self.last_agent = Some(who);
        match (self.mode, who) {
            (TurnMode::Step, _) => self.pause_for_choice(),
            (TurnMode::Auto, AgentRole::Interviewer) => {
                self.phase = Phase::Candidate;
                self.current_speaker = Some(Speaker::Candidate);
                self.waiting_for_next = false;
            }
            (TurnMode::Auto, AgentRole::Candidate) => self.pause_for_choice(),
        }
    }

    /// The human asked to advance. Only acted on while paused at the
    /// user-choice checkpoint; duplicate requests are no-ops.
    pub fn on_next_turn(&mut self) {
        if !self.waiting_for_next {
            tracing::debug!(phase = ?self.phase, "next-turn ignored: not waiting");
            return;
        }
        let next = match self.last_agent {
            Some(AgentRole::Interviewer) => AgentRole::Candidate,
            _ => AgentRole::Interviewer,
        };
        self.set_speaker(next);
    }

    pub fn on_human_speak_start(&mut self) {
        if self.phase == Phase::Ended {
            return;
        }
        self.phase = Phase::UserSpeaking;
        self.current_speaker = Some(Speaker::Human);
        self.waiting_for_next = false;
    }

    pub fn on_human_speak_done(&mut self) {
        if self.phase == Phase::Ended {
            return;
        }
        self.human_turns += 1;
        self.turn_count += 1;
        match self.mode {
            TurnMode::Step => self.pause_for_choice(),
            TurnMode::Auto => {
                self.phase = Phase::Interviewer;
                self.current_speaker = Some(Speaker::Interviewer);
                self.waiting_for_next = false;
            }
        }
    }

    /// Direct override for pattern-specific speaker selection.
    pub fn set_speaker(&mut self, role: AgentRole) {
        if self.phase == Phase::Ended {
            return;
        }
        self.phase = Phase::for_agent(role);
        self.current_speaker = Some(role.into());
        self.waiting_for_next = false;
    }

    /// Parks the session at the human-decision checkpoint.
    pub fn pause_for_choice(&mut self) {
        if self.phase == Phase::Ended {
            return;
        }
        self.phase = Phase::UserChoice;
        self.current_speaker = None;
        self.waiting_for_next = true;
    }

    /// Terminal and absorbing.
    pub fn end(&mut self) {
        self.phase = Phase::Ended;
        self.current_speaker = None;
        self.waiting_for_next = false;
    }

    /// Back to the initial waiting state with all counters zeroed. The
    /// configured mode survives a reset.
    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }
}
