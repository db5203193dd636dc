//! Append-only transcript of committed utterances plus one in-flight
//! partial per speaker.

use crate::pattern::Speaker;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// A finalized utterance. Never mutated or reordered once committed;
/// insertion order is chronological order.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub display_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct TranscriptLog {
    entries: Vec<TranscriptEntry>,
    pending: HashMap<Speaker, String>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates a streamed fragment into the speaker's pending buffer.
    pub fn add_delta(&mut self, speaker: Speaker, chunk: &str) {
        self.pending.entry(speaker).or_default().push_str(chunk);
    }

    /// The speaker's in-flight partial, empty when nothing is pending.
    pub fn pending_delta(&self, speaker: Speaker) -> &str {
        self.pending.get(&speaker).map(String::as_str).unwrap_or("")
    }

    /// Clears the speaker's pending buffer and appends an immutable entry
    /// carrying the full finalized text.
    pub fn commit(
        &mut self,
        speaker: Speaker,
        display_name: &str,
        full_text: &str,
    ) -> TranscriptEntry {
        self.pending.remove(&speaker);
        let entry = TranscriptEntry {
            speaker,
            display_name: display_name.to_string(),
            text: full_text.to_string(),
            timestamp: Utc::now(),
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Defensive copy of all committed entries. Pending deltas never
    /// appear here.
    pub fn get_all(&self) -> Vec<TranscriptEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_recent(&self, n: usize) -> Vec<TranscriptEntry> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].to_vec()
    }

    pub fn get_by_speaker(&self, speaker: Speaker) -> Vec<TranscriptEntry> {
        self.entries
            .iter()
            .filter(|e| e.speaker == speaker)
            .cloned()
            .collect()
    }

    pub fn get_last_by_speaker(&self, speaker: Speaker) -> Option<&TranscriptEntry> {
        self.entries.iter().rev().find(|e| e.speaker == speaker)
    }

    pub fn count_by_speaker(&self, speaker: Speaker) -> usize {
        self.entries.iter().filter(|e| e.speaker == speaker).count()
    }

    /// Empties the log and every pending buffer.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_clears_pending_and_appends() {
        let mut log = TranscriptLog::new();
        log.add_delta(Speaker::Interviewer, "Tell me ");
        log.add_delta(Speaker::Interviewer, "about yourself.");
        assert_eq!(
            log.pending_delta(Speaker::Interviewer),
            "Tell me about yourself."
        );

        let entry = log.commit(Speaker::Interviewer, "Interviewer", "Tell me about yourself.");
        assert_eq!(entry.text, "Tell me about yourself.");
        assert_eq!(log.pending_delta(Speaker::Interviewer), "");

        let all = log.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "Tell me about yourself.");
    }

    #[test]
    fn commit_only_clears_that_speakers_buffer() {
        let mut log = TranscriptLog::new();
        log.add_delta(Speaker::Interviewer, "first");
        log.add_delta(Speaker::Candidate, "second");
        log.commit(Speaker::Interviewer, "Interviewer", "first");
        assert_eq!(log.pending_delta(Speaker::Interviewer), "");
        assert_eq!(log.pending_delta(Speaker::Candidate), "second");
    }

    #[test]
    fn projections() {
        let mut log = TranscriptLog::new();
        log.commit(Speaker::Interviewer, "Interviewer", "one");
        log.commit(Speaker::Human, "Moderator", "two");
        log.commit(Speaker::Interviewer, "Interviewer", "three");

        assert_eq!(log.len(), 3);
        assert_eq!(log.count_by_speaker(Speaker::Interviewer), 2);
        assert_eq!(log.get_by_speaker(Speaker::Human).len(), 1);
        assert_eq!(
            log.get_last_by_speaker(Speaker::Interviewer)
                .map(|e| e.text.as_str()),
            Some("three")
        );

        let recent = log.get_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "two");
        assert_eq!(recent[1].text, "three");

        // Asking for more than exists returns everything.
        assert_eq!(log.get_recent(10).len(), 3);
    }

    #[test]
    fn clear_empties_log_and_buffers() {
        let mut log = TranscriptLog::new();
        log.add_delta(Speaker::Candidate, "partial");
        log.commit(Speaker::Human, "Moderator", "done");
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.pending_delta(Speaker::Candidate), "");
    }
}
