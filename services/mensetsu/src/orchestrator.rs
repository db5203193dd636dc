//! Session orchestrator: the single owner of conversational state.
//!
//! One orchestrator task runs per client connection. It processes two
//! event sources serially — client messages and the merged event streams
//! of up to two agent connections — so the turn machine and transcript
//! are never mutated concurrently. Failures on any one stream surface as
//! non-fatal error notices and never corrupt the others.

use crate::backend::ConnectionFactory;
use crate::protocol::{ClientMessage, ServerMessage, Target};
use crate::store::SessionStore;
use anyhow::{Context, Result};
use mensetsu_core::pattern::scan_markers;
use mensetsu_core::scoring::{ScoringEngine, default_rule_set};
use mensetsu_core::{
    AgentRole, PatternConfig, Phase, Speaker, Termination, TranscriptEntry, TranscriptLog,
    TurnEngine, TurnMode,
};
use mensetsu_realtime::{AgentConnection, NormalizedEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const HUMAN_DISPLAY_NAME: &str = "Moderator";

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Completed,
    Aborted,
    ClientRequest,
    Disconnected,
}

impl EndReason {
    fn as_str(self) -> &'static str {
        match self {
            EndReason::Completed => "completed",
            EndReason::Aborted => "aborted",
            EndReason::ClientRequest => "client_request",
            EndReason::Disconnected => "disconnected",
        }
    }
}

/// One event from a role's connection. `event: None` means the stream
/// closed.
#[derive(Debug)]
pub struct AgentSignal {
    pub role: AgentRole,
    pub event: Option<NormalizedEvent>,
}

pub struct SessionOrchestrator {
    session_id: Uuid,
    factory: Arc<dyn ConnectionFactory>,
    store: Arc<dyn SessionStore>,
    client_tx: mpsc::Sender<ServerMessage>,
    agent_tx: mpsc::Sender<AgentSignal>,

    turn: TurnEngine,
    transcript: TranscriptLog,
    pattern: PatternConfig,
    connections: HashMap<AgentRole, Box<dyn AgentConnection>>,
    ready: HashMap<AgentRole, bool>,
    scoring: ScoringEngine,

    start_pending: bool,
    started: bool,
    ended: bool,
    end_reason: Option<EndReason>,
    evaluated: bool,
}

impl SessionOrchestrator {
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        store: Arc<dyn SessionStore>,
        client_tx: mpsc::Sender<ServerMessage>,
    ) -> Result<(Self, mpsc::Receiver<AgentSignal>)> {
        let scoring =
            ScoringEngine::new(default_rule_set()).context("failed to compile scoring rules")?;
        let (agent_tx, agent_rx) = mpsc::channel(256);
        let orchestrator = Self {
            session_id: Uuid::new_v4(),
            factory,
            store,
            client_tx,
            agent_tx,
            turn: TurnEngine::new(TurnMode::Step),
            transcript: TranscriptLog::new(),
            pattern: PatternConfig::default(),
            connections: HashMap::new(),
            ready: HashMap::new(),
            scoring,
            start_pending: false,
            started: false,
            ended: false,
            end_reason: None,
            evaluated: false,
        };
        Ok((orchestrator, agent_rx))
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Drives the session until the client goes away.
    pub async fn run(
        mut self,
        mut client_rx: mpsc::Receiver<ClientMessage>,
        mut agent_rx: mpsc::Receiver<AgentSignal>,
    ) {
        loop {
            tokio::select! {
                msg = client_rx.recv() => match msg {
                    Some(msg) => {
                        if let Err(e) = self.handle_client(msg).await {
                            tracing::error!("client message handling failed: {:#}", e);
                            self.send_error("internal error while handling your request").await;
                        }
                    }
                    None => {
                        self.on_client_disconnected().await;
                        return;
                    }
                },
                signal = agent_rx.recv() => {
                    if let Some(signal) = signal {
                        if let Err(e) = self.handle_agent(signal).await {
                            tracing::error!("agent event handling failed: {:#}", e);
                            self.send_error("internal error while handling an agent event").await;
                        }
                    }
                },
            }
        }
    }

    async fn handle_client(&mut self, msg: ClientMessage) -> Result<()> {
        match msg {
            ClientMessage::StartSession {
                mode,
                pattern,
                proficiency,
                interviewer_persona,
                candidate_persona,
            } => {
                self.handle_start(
                    mode,
                    PatternConfig {
                        pattern,
                        proficiency,
                        interviewer_persona,
                        candidate_persona,
                    },
                )
                .await
            }
            ClientMessage::Start => {
                self.handle_start(TurnMode::Step, PatternConfig::default())
                    .await
            }
            ClientMessage::SetMode { mode } => {
                self.turn.set_mode(mode);
                self.push_turn_state().await;
                Ok(())
            }
            ClientMessage::NextTurn | ClientMessage::Proceed => self.handle_next_turn().await,
            ClientMessage::SubmitText { target, text } => {
                self.handle_human_text(target, &text).await
            }
            ClientMessage::AppendAudio { target, audio } => {
                self.forward_audio(target, Some(&audio), false).await
            }
            ClientMessage::CommitAudio { target } => self.forward_audio(target, None, true).await,
            ClientMessage::Audio { data } => {
                let target = self.default_target();
                self.forward_audio(target, Some(&data), true).await
            }
            ClientMessage::PlaybackFinished { speaker } => {
                // The client reporting playback completion is the same
                // advance trigger as upstream audio-done; the guard in
                // `advance_after_agent` keeps the pair idempotent.
                let role = speaker
                    .or_else(|| self.turn.current_speaker().and_then(Speaker::as_agent));
                if let Some(role) = role {
                    self.advance_after_agent(role).await;
                }
                Ok(())
            }
            ClientMessage::SpeechStart => {
                if self.started && !self.ended {
                    self.turn.on_human_speak_start();
                    self.push_turn_state().await;
                }
                Ok(())
            }
            ClientMessage::SpeechDone => self.finish_human_turn().await,
            ClientMessage::EndSession => self.terminate(EndReason::ClientRequest).await,
        }
    }

    async fn handle_agent(&mut self, signal: AgentSignal) -> Result<()> {
        let role = signal.role;
        let Some(event) = signal.event else {
            // One connection closing is reported independently and never
            // touches the other connection's state.
            self.ready.insert(role, false);
            if !self.ended {
                self.send_error(&format!("{role} connection closed")).await;
            }
            return Ok(());
        };
        if self.ended {
            tracing::debug!(%role, "agent event after session end ignored");
            return Ok(());
        }
        match event {
            NormalizedEvent::SessionReady => {
                if !self.ready.get(&role).copied().unwrap_or(false) {
                    self.ready.insert(role, true);
                    tracing::info!(%role, "agent connection ready");
                    self.try_begin().await?;
                }
            }
            NormalizedEvent::TranscriptDelta { delta } => {
                self.transcript.add_delta(role.into(), &delta);
                self.send(ServerMessage::TranscriptDelta {
                    speaker: role.into(),
                    delta,
                })
                .await;
            }
            NormalizedEvent::TranscriptDone { transcript } => {
                self.commit_agent_utterance(role, &transcript).await?;
            }
            NormalizedEvent::AudioDelta { audio } => {
                self.send(ServerMessage::AudioDelta {
                    speaker: role.into(),
                    audio,
                })
                .await;
            }
            NormalizedEvent::AudioDone => {
                self.send(ServerMessage::AudioDone {
                    speaker: role.into(),
                })
                .await;
                // Generated speech is fully available: the authoritative
                // advance trigger.
                self.advance_after_agent(role).await;
            }
            NormalizedEvent::ResponseDone {
                status,
                error_code,
                error_message,
            } => {
                if status == "completed" {
                    tracing::debug!(%role, "response completed");
                } else {
                    // Failed generation: surface it, skip the advance for
                    // this attempt, keep the session alive.
                    let detail = error_message
                        .or(error_code)
                        .unwrap_or_else(|| "unknown error".to_string());
                    tracing::warn!(%role, %status, "response did not complete: {}", detail);
                    self.send_error(&format!("{role} response {status}: {detail}"))
                        .await;
                }
            }
            NormalizedEvent::InputTranscriptDelta { delta } => {
                self.transcript.add_delta(Speaker::Human, &delta);
                self.send(ServerMessage::TranscriptDelta {
                    speaker: Speaker::Human,
                    delta,
                })
                .await;
            }
            NormalizedEvent::InputTranscriptDone { transcript } => {
                self.commit_human_utterance(role, &transcript).await;
            }
            NormalizedEvent::Error { message } => {
                self.send_error(&format!("{role} error: {message}")).await;
            }
            NormalizedEvent::Unknown => {}
        }
        Ok(())
    }

    async fn handle_start(&mut self, mode: TurnMode, config: PatternConfig) -> Result<()> {
        if self.started || self.start_pending {
            tracing::debug!("duplicate start request ignored");
            return Ok(());
        }
        self.pattern = config;
        self.turn.set_mode(mode);
        self.start_pending = true;
        self.open_connections().await;
        self.try_begin().await
    }

    async fn open_connections(&mut self) {
        for role in self.pattern.pattern.participants() {
            let role = *role;
            let mut conn = match self.factory.create(role, &self.pattern) {
                Ok(conn) => conn,
                Err(e) => {
                    self.send_error(&format!("failed to create {role} connection: {e}"))
                        .await;
                    continue;
                }
            };
            if let Err(e) = conn.connect().await {
                self.send_error(&format!("failed to connect {role}: {e}"))
                    .await;
                continue;
            }
            let mut events = match conn.take_events() {
                Ok(events) => events,
                Err(e) => {
                    self.send_error(&format!("failed to subscribe to {role} events: {e}"))
                        .await;
                    continue;
                }
            };
            let agent_tx = self.agent_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    if agent_tx
                        .send(AgentSignal {
                            role,
                            event: Some(event),
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                let _ = agent_tx.send(AgentSignal { role, event: None }).await;
            });
            self.ready.insert(role, false);
            self.connections.insert(role, conn);
        }
    }

    /// Fires the deferred start logic once every required connection has
    /// reported ready. Idempotent: runs at most once per session.
    async fn try_begin(&mut self) -> Result<()> {
        if self.started || !self.start_pending {
            return Ok(());
        }
        let all_ready = self
            .pattern
            .pattern
            .participants()
            .iter()
            .all(|role| self.ready.get(role).copied().unwrap_or(false));
        if !all_ready {
            return Ok(());
        }
        self.started = true;
        self.start_pending = false;
        self.send(ServerMessage::SessionReady {
            pattern: self.pattern.pattern,
            participants: self.pattern.pattern.participants().to_vec(),
        })
        .await;
        let first = self.pattern.pattern.first_speaker();
        self.turn.start(Some(first));
        self.push_turn_state().await;
        self.persist_start();
        self.request_response(first).await;
        Ok(())
    }

    async fn handle_next_turn(&mut self) -> Result<()> {
        if !self.started || self.ended {
            return Ok(());
        }
        if !self.turn.waiting_for_next() {
            tracing::debug!("next-turn request ignored: not waiting");
            return Ok(());
        }
        let participants = self.pattern.pattern.participants();
        if participants.len() == 1 {
            self.turn.set_speaker(participants[0]);
        } else {
            self.turn.on_next_turn();
        }
        self.push_turn_state().await;
        if let Some(next) = self.turn.current_speaker().and_then(Speaker::as_agent) {
            self.request_response(next).await;
        }
        Ok(())
    }

    async fn handle_human_text(&mut self, target: Target, text: &str) -> Result<()> {
        if !self.started || self.ended {
            self.send_error("session is not active").await;
            return Ok(());
        }
        self.turn.on_human_speak_start();
        let entry = self
            .transcript
            .commit(Speaker::Human, HUMAN_DISPLAY_NAME, text);
        self.send(ServerMessage::TranscriptCommitted {
            speaker: entry.speaker,
            display_name: entry.display_name.clone(),
            text: entry.text.clone(),
            timestamp: entry.timestamp,
        })
        .await;
        self.persist_entry(entry);
        for role in target.roles() {
            if self.pattern.pattern.includes(*role) {
                self.cross_post(*role, text).await;
            }
        }
        self.finish_human_turn().await
    }

    /// Settles the turn machine after a human turn and, in auto mode,
    /// immediately requests the pattern-appropriate next agent response.
    async fn finish_human_turn(&mut self) -> Result<()> {
        if !self.started || self.ended {
            return Ok(());
        }
        self.turn.on_human_speak_done();
        if self.turn.phase() == Phase::Interviewer
            && !self.pattern.pattern.includes(AgentRole::Interviewer)
        {
            self.turn.set_speaker(AgentRole::Candidate);
        }
        self.push_turn_state().await;
        if self.turn.mode() == TurnMode::Auto {
            if let Some(next) = self.turn.current_speaker().and_then(Speaker::as_agent) {
                self.request_response(next).await;
            }
        }
        Ok(())
    }

    async fn commit_agent_utterance(&mut self, role: AgentRole, text: &str) -> Result<()> {
        let display_name = self
            .pattern
            .persona(role)
            .unwrap_or(role.display_name())
            .to_string();
        let entry = self.transcript.commit(role.into(), &display_name, text);
        self.send(ServerMessage::TranscriptCommitted {
            speaker: entry.speaker,
            display_name: entry.display_name.clone(),
            text: entry.text.clone(),
            timestamp: entry.timestamp,
        })
        .await;
        self.persist_entry(entry);
        self.cross_post(role.other(), &format!("{display_name} said: {text}"))
            .await;
        match scan_markers(text) {
            Some(Termination::Completed) => self.terminate(EndReason::Completed).await,
            Some(Termination::Aborted) => self.terminate(EndReason::Aborted).await,
            None => Ok(()),
        }
    }

    async fn commit_human_utterance(&mut self, source: AgentRole, text: &str) {
        let entry = self
            .transcript
            .commit(Speaker::Human, HUMAN_DISPLAY_NAME, text);
        self.send(ServerMessage::TranscriptCommitted {
            speaker: entry.speaker,
            display_name: entry.display_name.clone(),
            text: entry.text.clone(),
            timestamp: entry.timestamp,
        })
        .await;
        self.persist_entry(entry);
        // The source connection already has the audio; only the other
        // participant needs the text as context.
        self.cross_post(source.other(), &format!("Moderator said: {text}"))
            .await;
    }

    /// Advances the turn machine after an agent's speech is done playing.
    /// Ignored unless that agent currently holds the floor, so the two
    /// advance triggers cannot double-count a turn.
    async fn advance_after_agent(&mut self, role: AgentRole) {
        if !self.started || self.ended {
            return;
        }
        if self.turn.current_speaker() != Some(role.into()) {
            tracing::debug!(%role, "turn advance ignored: not the current speaker");
            return;
        }
        self.turn.on_agent_speaking_done(role);
        if self.turn.phase() == Phase::Candidate
            && !self.pattern.pattern.includes(AgentRole::Candidate)
        {
            self.turn.pause_for_choice();
        }
        self.push_turn_state().await;
        if self.turn.mode() == TurnMode::Auto {
            if let Some(next) = self.turn.current_speaker().and_then(Speaker::as_agent) {
                self.request_response(next).await;
            }
        }
    }

    async fn request_response(&mut self, role: AgentRole) {
        let result = match self.connections.get_mut(&role) {
            Some(conn) => conn.request_response().await,
            None => Err(anyhow::anyhow!("no connection for {role}")),
        };
        if let Err(e) = result {
            tracing::warn!(%role, "failed to request response: {:#}", e);
            self.send_error(&format!("failed to request {role} response: {e}"))
                .await;
        }
    }

    async fn forward_audio(&mut self, target: Target, chunk: Option<&str>, commit: bool) -> Result<()> {
        if !self.started || self.ended {
            return Ok(());
        }
        let mut failures = Vec::new();
        for role in target.roles() {
            let Some(conn) = self.connections.get_mut(role) else {
                continue;
            };
            if let Some(chunk) = chunk {
                if let Err(e) = conn.append_audio(chunk).await {
                    failures.push(format!("failed to forward audio to {role}: {e}"));
                    continue;
                }
            }
            if commit {
                if let Err(e) = conn.commit_audio().await {
                    failures.push(format!("failed to commit audio to {role}: {e}"));
                }
            }
        }
        for failure in failures {
            self.send_error(&failure).await;
        }
        Ok(())
    }

    async fn cross_post(&mut self, role: AgentRole, text: &str) {
        let error = match self.connections.get_mut(&role) {
            Some(conn) => conn.add_text_message(text).await.err(),
            None => None,
        };
        if let Some(e) = error {
            self.send_error(&format!("failed to forward context to {role}: {e}"))
                .await;
        }
    }

    async fn terminate(&mut self, reason: EndReason) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        self.end_reason = Some(reason);
        self.turn.end();
        self.push_turn_state().await;
        self.persist_end(reason);

        if !self.evaluated {
            self.evaluated = true;
            let result = self.scoring.evaluate(&self.transcript.get_all());
            tracing::info!(
                session_id = %self.session_id,
                grade = %result.grade,
                percentage = result.percentage,
                reason = reason.as_str(),
                "session evaluated"
            );
            self.persist_evaluation(result.clone());
            self.send(ServerMessage::Evaluation { result }).await;
        }
        self.close_connections().await;
        Ok(())
    }

    async fn on_client_disconnected(&mut self) {
        tracing::info!(session_id = %self.session_id, "client disconnected, tearing down session");
        if !self.ended {
            self.ended = true;
            self.end_reason = Some(EndReason::Disconnected);
            self.turn.end();
            self.persist_end(EndReason::Disconnected);
        }
        self.close_connections().await;
    }

    async fn close_connections(&mut self) {
        for (role, conn) in self.connections.iter_mut() {
            if let Err(e) = conn.close().await {
                tracing::warn!(%role, "failed to close connection: {:#}", e);
            }
        }
    }

    fn default_target(&self) -> Target {
        if self.pattern.pattern.includes(AgentRole::Interviewer) {
            Target::Interviewer
        } else {
            Target::Candidate
        }
    }

    async fn push_turn_state(&mut self) {
        let snapshot = self.turn.snapshot();
        let phase = snapshot.phase;
        self.send(ServerMessage::TurnState {
            phase: snapshot.phase,
            speaker: snapshot.speaker,
            waiting_for_next: snapshot.waiting_for_next,
            mode: snapshot.mode,
            turn_count: snapshot.turn_count,
        })
        .await;
        // Older clients only understand the phase notice.
        self.send(ServerMessage::PhaseChange { phase }).await;
    }

    async fn send(&self, msg: ServerMessage) {
        if self.client_tx.send(msg).await.is_err() {
            tracing::debug!("client channel closed, message dropped");
        }
    }

    async fn send_error(&self, message: &str) {
        tracing::warn!(session_id = %self.session_id, "session error: {}", message);
        self.send(ServerMessage::Error {
            message: message.to_string(),
        })
        .await;
    }

    fn persist_start(&self) {
        let store = self.store.clone();
        let id = self.session_id;
        let pattern = self.pattern.clone();
        tokio::spawn(async move {
            if let Err(e) = store.start_session(id, &pattern).await {
                tracing::warn!("failed to persist session start: {:#}", e);
            }
        });
    }

    fn persist_entry(&self, entry: TranscriptEntry) {
        let store = self.store.clone();
        let id = self.session_id;
        tokio::spawn(async move {
            if let Err(e) = store.add_transcript(id, &entry).await {
                tracing::warn!("failed to persist transcript entry: {:#}", e);
            }
        });
    }

    fn persist_end(&self, reason: EndReason) {
        let store = self.store.clone();
        let id = self.session_id;
        tokio::spawn(async move {
            if let Err(e) = store.end_session(id, reason.as_str()).await {
                tracing::warn!("failed to persist session end: {:#}", e);
            }
        });
    }

    fn persist_evaluation(&self, result: mensetsu_core::scoring::EvaluationResult) {
        let store = self.store.clone();
        let id = self.session_id;
        tokio::spawn(async move {
            if let Err(e) = store.save_evaluation(id, &result).await {
                tracing::warn!("failed to persist evaluation: {:#}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedFactory;
    use crate::store::LoggingStore;
    use mensetsu_core::InterviewPattern;
    use mensetsu_realtime::{ExhaustionPolicy, ScriptedConfig};
    use std::time::Duration;
    use tokio::time::timeout;

    fn fast_scripts(interviewer: Vec<&str>, candidate: Vec<&str>) -> Arc<ScriptedFactory> {
        Arc::new(
            ScriptedFactory::new(
                interviewer.into_iter().map(str::to_string).collect(),
                candidate.into_iter().map(str::to_string).collect(),
            )
            .with_config(ScriptedConfig {
                chunk_chars: 16,
                interval: Duration::ZERO,
                capacity: 256,
                exhaustion: ExhaustionPolicy::Fail,
            }),
        )
    }

    async fn spawn_session(
        factory: Arc<ScriptedFactory>,
    ) -> (mpsc::Sender<ClientMessage>, mpsc::Receiver<ServerMessage>) {
        let (server_tx, server_rx) = mpsc::channel(256);
        let (client_tx, client_rx) = mpsc::channel(64);
        let (orchestrator, agent_rx) =
            SessionOrchestrator::new(factory, Arc::new(LoggingStore), server_tx).unwrap();
        tokio::spawn(orchestrator.run(client_rx, agent_rx));
        (client_tx, server_rx)
    }

    async fn recv(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for server message")
            .expect("server channel closed")
    }

    fn start_message(mode: TurnMode, pattern: InterviewPattern) -> ClientMessage {
        ClientMessage::StartSession {
            mode,
            pattern,
            proficiency: Default::default(),
            interviewer_persona: None,
            candidate_persona: None,
        }
    }

    #[tokio::test]
    async fn duplicate_start_yields_one_session_ready() {
        let factory = fast_scripts(vec!["Hello."], vec![]);
        let (client_tx, mut server_rx) = spawn_session(factory).await;

        let start = start_message(TurnMode::Step, InterviewPattern::InterviewerOnly);
        client_tx.send(start.clone()).await.unwrap();
        client_tx.send(start).await.unwrap();

        let mut ready_count = 0;
        // Drain until the first agent turn finishes streaming.
        loop {
            match recv(&mut server_rx).await {
                ServerMessage::SessionReady { .. } => ready_count += 1,
                ServerMessage::TurnState {
                    phase: Phase::UserChoice,
                    ..
                } => break,
                _ => {}
            }
        }
        assert_eq!(ready_count, 1);
    }

    #[tokio::test]
    async fn failed_response_surfaces_error_and_skips_advance() {
        // Empty script + Fail policy: the very first request fails.
        let factory = fast_scripts(vec![], vec![]);
        let (client_tx, mut server_rx) = spawn_session(factory).await;

        client_tx
            .send(start_message(TurnMode::Step, InterviewPattern::InterviewerOnly))
            .await
            .unwrap();

        let mut saw_error = false;
        let mut last_phase = None;
        for _ in 0..10 {
            match timeout(Duration::from_millis(300), server_rx.recv()).await {
                Ok(Some(ServerMessage::Error { message })) => {
                    saw_error = true;
                    assert!(message.contains("failed"), "unexpected error: {message}");
                    break;
                }
                Ok(Some(ServerMessage::TurnState { phase, .. })) => last_phase = Some(phase),
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
        assert!(saw_error);
        // The failed attempt never advanced the turn machine.
        assert_eq!(last_phase, Some(Phase::Interviewer));
    }

    #[tokio::test]
    async fn end_session_request_evaluates_once() {
        let factory = fast_scripts(vec!["Hello."], vec![]);
        let (client_tx, mut server_rx) = spawn_session(factory).await;

        client_tx
            .send(start_message(TurnMode::Step, InterviewPattern::InterviewerOnly))
            .await
            .unwrap();
        // Wait for the first turn to finish, then end.
        loop {
            if let ServerMessage::TurnState {
                phase: Phase::UserChoice,
                ..
            } = recv(&mut server_rx).await
            {
                break;
            }
        }
        client_tx.send(ClientMessage::EndSession).await.unwrap();
        client_tx.send(ClientMessage::EndSession).await.unwrap();

        let mut evaluations = 0;
        let mut ended = false;
        loop {
            match timeout(Duration::from_millis(300), server_rx.recv()).await {
                Ok(Some(ServerMessage::Evaluation { .. })) => evaluations += 1,
                Ok(Some(ServerMessage::TurnState {
                    phase: Phase::Ended,
                    ..
                })) => ended = true,
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
        assert!(ended);
        assert_eq!(evaluations, 1);
    }
}
