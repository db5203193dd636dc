//! Deterministic scripted connection: replays a pre-scripted list of
//! lines, honoring the same event-sequence contract as the live variant
//! but without any network I/O. Each line is chunked into fixed-size
//! pieces emitted at a fixed interval to simulate streaming.

use crate::events::NormalizedEvent;
use crate::{AgentConnection, EventRx};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What happens when the script runs out of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Wrap back to the first entry.
    #[default]
    Loop,
    /// Report a failed response instead of replaying anything.
    Fail,
}

#[derive(Debug, Clone)]
pub struct ScriptedConfig {
    /// Characters per streamed transcript chunk.
    pub chunk_chars: usize,
    /// Pause between chunks. Zero keeps tests fast and ordering intact.
    pub interval: Duration,
    pub capacity: usize,
    pub exhaustion: ExhaustionPolicy,
}

impl Default for ScriptedConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 24,
            interval: Duration::from_millis(10),
            capacity: 256,
            exhaustion: ExhaustionPolicy::default(),
        }
    }
}

pub struct ScriptedConnection {
    script: Vec<String>,
    config: ScriptedConfig,
    cursor: usize,
    event_tx: Option<mpsc::Sender<NormalizedEvent>>,
    event_rx: Option<EventRx>,
    pending_audio: Vec<u8>,
    response_handle: Option<JoinHandle<()>>,
    context: Vec<String>,
}

impl ScriptedConnection {
    pub fn new(script: Vec<String>) -> Self {
        Self::with_config(script, ScriptedConfig::default())
    }

    pub fn with_config(script: Vec<String>, config: ScriptedConfig) -> Self {
        Self {
            script,
            config,
            cursor: 0,
            event_tx: None,
            event_rx: None,
            pending_audio: Vec::new(),
            response_handle: None,
            context: Vec::new(),
        }
    }

    /// Context messages received so far, in order.
    pub fn context_messages(&self) -> &[String] {
        &self.context
    }

    fn sender(&self) -> Result<mpsc::Sender<NormalizedEvent>> {
        self.event_tx.clone().context("not connected yet")
    }

    fn next_line(&mut self) -> Option<String> {
        if self.script.is_empty() {
            return None;
        }
        if self.cursor >= self.script.len() {
            match self.config.exhaustion {
                ExhaustionPolicy::Loop => self.cursor = 0,
                ExhaustionPolicy::Fail => return None,
            }
        }
        let line = self.script[self.cursor].clone();
        self.cursor += 1;
        Some(line)
    }
}

fn chunk_line(line: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

#[async_trait]
impl AgentConnection for ScriptedConnection {
    async fn connect(&mut self) -> Result<()> {
        if self.event_tx.is_some() {
            bail!("already connected");
        }
        let (tx, rx) = mpsc::channel(self.config.capacity);
        tx.send(NormalizedEvent::SessionReady)
            .await
            .map_err(|_| anyhow::anyhow!("event channel closed during connect"))?;
        self.event_tx = Some(tx);
        self.event_rx = Some(rx);
        Ok(())
    }

    fn take_events(&mut self) -> Result<EventRx> {
        self.event_rx
            .take()
            .context("event stream not available: not connected or already taken")
    }

    async fn add_text_message(&mut self, text: &str) -> Result<()> {
        if self.event_tx.is_none() {
            bail!("not connected yet");
        }
        self.context.push(text.to_string());
        Ok(())
    }

    async fn append_audio(&mut self, audio: &str) -> Result<()> {
        let bytes = BASE64.decode(audio).context("invalid base64 audio chunk")?;
        self.pending_audio.extend(bytes);
        Ok(())
    }

    /// "Transcribes" the committed audio by decoding it back to text, so
    /// the human audio path is exercisable end-to-end without a speech
    /// backend.
    async fn commit_audio(&mut self) -> Result<()> {
        let tx = self.sender()?;
        let bytes = std::mem::take(&mut self.pending_audio);
        let transcript = String::from_utf8_lossy(&bytes).to_string();
        tx.send(NormalizedEvent::InputTranscriptDelta {
            delta: transcript.clone(),
        })
        .await
        .map_err(|_| anyhow::anyhow!("event channel closed"))?;
        tx.send(NormalizedEvent::InputTranscriptDone { transcript })
            .await
            .map_err(|_| anyhow::anyhow!("event channel closed"))?;
        Ok(())
    }

    async fn clear_audio(&mut self) -> Result<()> {
        self.pending_audio.clear();
        Ok(())
    }

    async fn request_response(&mut self) -> Result<()> {
        let tx = self.sender()?;
        let Some(line) = self.next_line() else {
            tx.send(NormalizedEvent::ResponseDone {
                status: "failed".to_string(),
                error_code: Some("script_exhausted".to_string()),
                error_message: Some("no scripted line available".to_string()),
            })
            .await
            .map_err(|_| anyhow::anyhow!("event channel closed"))?;
            return Ok(());
        };

        let chunks = chunk_line(&line, self.config.chunk_chars);
        let interval = self.config.interval;
        let handle = tokio::spawn(async move {
            for chunk in &chunks {
                if tx
                    .send(NormalizedEvent::TranscriptDelta {
                        delta: chunk.clone(),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
            if tx
                .send(NormalizedEvent::TranscriptDone {
                    transcript: line.clone(),
                })
                .await
                .is_err()
            {
                return;
            }
            for chunk in &chunks {
                if tx
                    .send(NormalizedEvent::AudioDelta {
                        audio: BASE64.encode(chunk.as_bytes()),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
            if tx.send(NormalizedEvent::AudioDone).await.is_err() {
                return;
            }
            let _ = tx
                .send(NormalizedEvent::ResponseDone {
                    status: "completed".to_string(),
                    error_code: None,
                    error_message: None,
                })
                .await;
        });
        self.response_handle = Some(handle);
        Ok(())
    }

    async fn cancel_response(&mut self) -> Result<()> {
        if let Some(handle) = self.response_handle.take() {
            handle.abort();
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.response_handle.take() {
            handle.abort();
        }
        // Dropping the sender closes the event stream.
        self.event_tx = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(exhaustion: ExhaustionPolicy) -> ScriptedConfig {
        ScriptedConfig {
            chunk_chars: 8,
            interval: Duration::ZERO,
            capacity: 256,
            exhaustion,
        }
    }

    async fn connect(script: Vec<&str>, exhaustion: ExhaustionPolicy) -> (ScriptedConnection, EventRx) {
        let mut conn = ScriptedConnection::with_config(
            script.into_iter().map(str::to_string).collect(),
            fast_config(exhaustion),
        );
        conn.connect().await.unwrap();
        let mut rx = conn.take_events().unwrap();
        assert_eq!(rx.recv().await, Some(NormalizedEvent::SessionReady));
        (conn, rx)
    }

    async fn drain_response(rx: &mut EventRx) -> Vec<NormalizedEvent> {
        let mut events = Vec::new();
        loop {
            let event = rx.recv().await.expect("stream closed mid-response");
            let done = matches!(event, NormalizedEvent::ResponseDone { .. });
            events.push(event);
            if done {
                return events;
            }
        }
    }

    #[tokio::test]
    async fn response_follows_the_event_sequence_contract() {
        let line = "Tell me about a project you are proud of.";
        let (mut conn, mut rx) = connect(vec![line], ExhaustionPolicy::Loop).await;

        conn.request_response().await.unwrap();
        let events = drain_response(&mut rx).await;

        let mut transcript = String::new();
        let mut audio = Vec::new();
        let mut transcript_done = 0;
        let mut audio_done_seen = false;
        let mut phase = 0; // 0: transcript deltas, 1: audio deltas, 2: done
        for event in &events {
            match event {
                NormalizedEvent::TranscriptDelta { delta } => {
                    assert_eq!(phase, 0, "transcript delta after transcript done");
                    transcript.push_str(delta);
                }
                NormalizedEvent::TranscriptDone { transcript: full } => {
                    assert_eq!(phase, 0);
                    phase = 1;
                    transcript_done += 1;
                    assert_eq!(full, line);
                }
                NormalizedEvent::AudioDelta { audio: chunk } => {
                    assert_eq!(phase, 1, "audio delta outside the audio phase");
                    audio.extend(BASE64.decode(chunk).unwrap());
                }
                NormalizedEvent::AudioDone => {
                    assert_eq!(phase, 1);
                    phase = 2;
                    audio_done_seen = true;
                }
                NormalizedEvent::ResponseDone { status, .. } => {
                    assert_eq!(phase, 2);
                    assert_eq!(status, "completed");
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(transcript_done, 1);
        assert!(audio_done_seen);
        assert_eq!(transcript, line);
        assert_eq!(String::from_utf8(audio).unwrap(), line);
    }

    #[tokio::test]
    async fn exhausted_script_wraps_under_loop_policy() {
        let (mut conn, mut rx) = connect(vec!["only line"], ExhaustionPolicy::Loop).await;

        for _ in 0..2 {
            conn.request_response().await.unwrap();
            let events = drain_response(&mut rx).await;
            assert!(events.iter().any(|e| matches!(
                e,
                NormalizedEvent::TranscriptDone { transcript } if transcript == "only line"
            )));
        }
    }

    #[tokio::test]
    async fn exhausted_script_fails_under_fail_policy() {
        let (mut conn, mut rx) = connect(vec!["only line"], ExhaustionPolicy::Fail).await;

        conn.request_response().await.unwrap();
        drain_response(&mut rx).await;

        conn.request_response().await.unwrap();
        let events = drain_response(&mut rx).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            NormalizedEvent::ResponseDone {
                status, error_code, ..
            } => {
                assert_eq!(status, "failed");
                assert_eq!(error_code.as_deref(), Some("script_exhausted"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn committed_audio_is_echoed_as_input_transcript() {
        let (mut conn, mut rx) = connect(vec![], ExhaustionPolicy::Loop).await;

        conn.append_audio(&BASE64.encode("I led the ")).await.unwrap();
        conn.append_audio(&BASE64.encode("platform team."))
            .await
            .unwrap();
        conn.commit_audio().await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(NormalizedEvent::InputTranscriptDelta {
                delta: "I led the platform team.".to_string()
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(NormalizedEvent::InputTranscriptDone {
                transcript: "I led the platform team.".to_string()
            })
        );
    }

    #[tokio::test]
    async fn cleared_audio_is_dropped() {
        let (mut conn, mut rx) = connect(vec![], ExhaustionPolicy::Loop).await;

        conn.append_audio(&BASE64.encode("discard me")).await.unwrap();
        conn.clear_audio().await.unwrap();
        conn.commit_audio().await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(NormalizedEvent::InputTranscriptDelta {
                delta: String::new()
            })
        );
    }

    #[tokio::test]
    async fn context_messages_are_recorded() {
        let (mut conn, _rx) = connect(vec![], ExhaustionPolicy::Loop).await;
        conn.add_text_message("Interviewer said: welcome.")
            .await
            .unwrap();
        assert_eq!(conn.context_messages(), ["Interviewer said: welcome."]);
    }

    #[tokio::test]
    async fn cancel_stops_an_in_flight_response() {
        let mut conn = ScriptedConnection::with_config(
            vec!["a very long line that streams slowly".to_string()],
            ScriptedConfig {
                chunk_chars: 4,
                interval: Duration::from_secs(5),
                capacity: 256,
                exhaustion: ExhaustionPolicy::Loop,
            },
        );
        conn.connect().await.unwrap();
        let mut rx = conn.take_events().unwrap();
        assert_eq!(rx.recv().await, Some(NormalizedEvent::SessionReady));

        conn.request_response().await.unwrap();
        // The first chunk arrives before the long inter-chunk pause.
        assert!(matches!(
            rx.recv().await,
            Some(NormalizedEvent::TranscriptDelta { .. })
        ));
        conn.cancel_response().await.unwrap();

        // Nothing further: the response task is gone.
        let next = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(next.is_err(), "no events after cancel, got {next:?}");
    }

    #[tokio::test]
    async fn close_ends_the_event_stream() {
        let (mut conn, mut rx) = connect(vec!["line"], ExhaustionPolicy::Loop).await;
        conn.close().await.unwrap();
        assert_eq!(rx.recv().await, None);
    }
}
