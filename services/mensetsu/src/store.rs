//! Persistence collaborator. Called fire-and-forget: failures are
//! logged, never allowed to block the conversational path.

use anyhow::Result;
use async_trait::async_trait;
use mensetsu_core::scoring::EvaluationResult;
use mensetsu_core::{PatternConfig, TranscriptEntry};
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

#[async_trait]
#[cfg_attr(test, automock)]
pub trait SessionStore: Send + Sync {
    async fn start_session(&self, session_id: Uuid, pattern: &PatternConfig) -> Result<()>;

    async fn add_transcript(&self, session_id: Uuid, entry: &TranscriptEntry) -> Result<()>;

    async fn end_session(&self, session_id: Uuid, reason: &str) -> Result<()>;

    async fn save_evaluation(&self, session_id: Uuid, result: &EvaluationResult) -> Result<()>;
}

/// Default store: records nothing, logs everything at debug.
pub struct LoggingStore;

#[async_trait]
impl SessionStore for LoggingStore {
    async fn start_session(&self, session_id: Uuid, pattern: &PatternConfig) -> Result<()> {
        tracing::debug!(%session_id, ?pattern, "session started");
        Ok(())
    }

    async fn add_transcript(&self, session_id: Uuid, entry: &TranscriptEntry) -> Result<()> {
        tracing::debug!(%session_id, speaker = %entry.speaker, "transcript entry");
        Ok(())
    }

    async fn end_session(&self, session_id: Uuid, reason: &str) -> Result<()> {
        tracing::debug!(%session_id, reason, "session ended");
        Ok(())
    }

    async fn save_evaluation(&self, session_id: Uuid, result: &EvaluationResult) -> Result<()> {
        tracing::debug!(%session_id, grade = %result.grade, "evaluation saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_store_tracks_calls() {
        let mut store = MockSessionStore::new();
        store
            .expect_end_session()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        store
            .end_session(Uuid::new_v4(), "completed")
            .await
            .unwrap();
        // The expectation is verified when the mock drops.
    }
}
