//! Uniform interface to a streaming conversational endpoint, with two
//! interchangeable variants: a live OpenAI Realtime WebSocket connection
//! and a deterministic scripted double for tests and offline runs.

pub mod config;
pub mod events;
mod openai;
mod scripted;
pub mod wire;

pub use config::ConnectionConfig;
pub use events::{NormalizedEvent, normalize, should_log};
pub use openai::OpenAiConnection;
pub use scripted::{ExhaustionPolicy, ScriptedConfig, ScriptedConnection};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Receiver for a connection's normalized event stream.
pub type EventRx = mpsc::Receiver<NormalizedEvent>;

/// Capability contract for one upstream agent connection.
///
/// Event ordering guarantees: [`NormalizedEvent::SessionReady`] arrives
/// exactly once after `connect`. Each `request_response` produces
/// `TranscriptDelta`* then exactly one `TranscriptDone`, then
/// `AudioDelta`* then `AudioDone`, then exactly one `ResponseDone`.
/// Deltas for a response are always observed before its done events.
/// The stream closing (receiver yields `None`) is the close signal.
#[async_trait]
pub trait AgentConnection: Send + Sync {
    /// Begins session setup with the remote endpoint.
    async fn connect(&mut self) -> Result<()>;

    /// Yields the event stream. Valid once, after `connect`.
    fn take_events(&mut self) -> Result<EventRx>;

    /// Injects a contextual text message into the conversation.
    async fn add_text_message(&mut self, text: &str) -> Result<()>;

    /// Streams a base64 audio chunk into the input buffer.
    async fn append_audio(&mut self, audio: &str) -> Result<()>;

    /// Finalizes the input audio buffer, triggering transcription.
    async fn commit_audio(&mut self) -> Result<()>;

    /// Discards any buffered input audio.
    async fn clear_audio(&mut self) -> Result<()>;

    /// Asks the agent to produce its next turn.
    async fn request_response(&mut self) -> Result<()>;

    /// Aborts in-flight generation.
    async fn cancel_response(&mut self) -> Result<()>;

    /// Tears the connection down; the event stream closes afterwards.
    async fn close(&mut self) -> Result<()>;
}
