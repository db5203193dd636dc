//! Persona instructions for agent sessions. Text here is configuration
//! data; keeping it in one place keeps the orchestrator free of prose.

use mensetsu_core::{ABORT_MARKER, AgentRole, END_MARKER, PatternConfig, Proficiency};

pub fn build_instructions(role: AgentRole, config: &PatternConfig) -> String {
    let persona = config.persona(role).unwrap_or(role.display_name());
    let proficiency = proficiency_hint(config.proficiency);
    match role {
        AgentRole::Interviewer => format!(
            "You are {persona}, conducting a professional job interview. \
             Ask one question at a time and keep each turn short. \
             React to what the candidate and the moderator say. \
             When the interview has run its course, thank the candidate and \
             end your final utterance with the token {END_MARKER}. If the \
             moderator asks you to stop early, end your utterance with \
             {ABORT_MARKER} instead."
        ),
        AgentRole::Candidate => format!(
            "You are {persona}, a job candidate in an interview. \
             Answer the interviewer's questions in the first person and keep \
             each answer to a few sentences. {proficiency}"
        ),
    }
}

fn proficiency_hint(proficiency: Proficiency) -> &'static str {
    match proficiency {
        Proficiency::Beginner => {
            "Speak in short, simple sentences with basic vocabulary, like a \
             beginner speaker of the language."
        }
        Proficiency::Intermediate => {
            "Speak in clear everyday language with occasional hesitation, \
             like an intermediate speaker."
        }
        Proficiency::Advanced => {
            "Speak fluently and precisely, like a native-level speaker."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interviewer_instructions_carry_the_end_markers() {
        let config = PatternConfig::default();
        let text = build_instructions(AgentRole::Interviewer, &config);
        assert!(text.contains(END_MARKER));
        assert!(text.contains(ABORT_MARKER));
    }

    #[test]
    fn persona_and_proficiency_are_woven_in() {
        let config = PatternConfig {
            candidate_persona: Some("Aiko Tanaka".to_string()),
            proficiency: Proficiency::Beginner,
            ..PatternConfig::default()
        };
        let text = build_instructions(AgentRole::Candidate, &config);
        assert!(text.contains("Aiko Tanaka"));
        assert!(text.contains("beginner"));
    }
}
