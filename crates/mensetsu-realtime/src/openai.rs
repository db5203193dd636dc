//! Live connection to the OpenAI Realtime API over WebSocket.

use crate::config::ConnectionConfig;
use crate::events::{NormalizedEvent, normalize, should_log};
use crate::wire::{ConversationItem, OutboundEvent, SessionUpdate};
use crate::{AgentConnection, EventRx};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;

pub struct OpenAiConnection {
    config: ConnectionConfig,
    out_tx: Option<mpsc::Sender<OutboundEvent>>,
    event_rx: Option<EventRx>,
    send_handle: Option<JoinHandle<()>>,
    recv_handle: Option<JoinHandle<()>>,
}

impl OpenAiConnection {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            out_tx: None,
            event_rx: None,
            send_handle: None,
            recv_handle: None,
        }
    }

    fn build_request(&self) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request> {
        let url = format!("{}?model={}", self.config.url, self.config.model);
        let mut request = url
            .into_client_request()
            .context("invalid realtime endpoint url")?;
        let auth: HeaderValue = format!("Bearer {}", self.config.api_key.expose_secret())
            .parse()
            .context("api key is not a valid header value")?;
        request.headers_mut().insert("Authorization", auth);
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));
        Ok(request)
    }

    async fn send(&self, event: OutboundEvent) -> Result<()> {
        match &self.out_tx {
            Some(tx) => tx
                .send(event)
                .await
                .map_err(|_| anyhow::anyhow!("outbound channel closed")),
            None => bail!("not connected yet"),
        }
    }
}

#[async_trait]
impl AgentConnection for OpenAiConnection {
    async fn connect(&mut self) -> Result<()> {
        if self.out_tx.is_some() {
            bail!("already connected");
        }

        let request = self.build_request()?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .context("failed to connect to realtime endpoint")?;
        let (mut write, mut read) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<OutboundEvent>(self.config.capacity);
        let (event_tx, event_rx) = mpsc::channel::<NormalizedEvent>(self.config.capacity);

        let send_handle = tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
            if let Err(e) = write.close().await {
                tracing::debug!("websocket close: {}", e);
            }
        });

        let recv_handle = tokio::spawn(async move {
            // The upstream emits session readiness for both creation and
            // every later session update; only the first one counts.
            let mut ready_sent = false;
            while let Some(message) = read.next().await {
                let message = match message {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        break;
                    }
                };
                match message {
                    Message::Text(text) => {
                        let raw = match serde_json::from_str::<serde_json::Value>(&text) {
                            Ok(raw) => raw,
                            Err(e) => {
                                tracing::warn!("unparseable upstream frame: {}", e);
                                continue;
                            }
                        };
                        let event_type = raw.get("type").and_then(|v| v.as_str()).unwrap_or("");
                        if should_log(event_type) {
                            tracing::debug!("upstream event: {}", event_type);
                        }
                        let event = match normalize(&raw) {
                            NormalizedEvent::Unknown => continue,
                            NormalizedEvent::SessionReady if ready_sent => continue,
                            NormalizedEvent::SessionReady => {
                                ready_sent = true;
                                NormalizedEvent::SessionReady
                            }
                            event => event,
                        };
                        if event_tx.send(event).await.is_err() {
                            tracing::warn!("event receiver dropped, stopping recv task");
                            break;
                        }
                    }
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("upstream connection closed: {:?}", reason);
                        break;
                    }
                    _ => {}
                }
            }
        });

        self.out_tx = Some(out_tx);
        self.event_rx = Some(event_rx);
        self.send_handle = Some(send_handle);
        self.recv_handle = Some(recv_handle);

        // Configure the session; readiness is reported back as an event.
        self.send(OutboundEvent::SessionUpdate {
            session: SessionUpdate::new(&self.config.instructions, &self.config.voice),
        })
        .await
    }

    fn take_events(&mut self) -> Result<EventRx> {
        self.event_rx
            .take()
            .context("event stream not available: not connected or already taken")
    }

    async fn add_text_message(&mut self, text: &str) -> Result<()> {
        self.send(OutboundEvent::ConversationItemCreate {
            item: ConversationItem::user_text(text),
        })
        .await
    }

    async fn append_audio(&mut self, audio: &str) -> Result<()> {
        self.send(OutboundEvent::InputAudioBufferAppend {
            audio: audio.to_string(),
        })
        .await
    }

    async fn commit_audio(&mut self) -> Result<()> {
        self.send(OutboundEvent::InputAudioBufferCommit).await
    }

    async fn clear_audio(&mut self) -> Result<()> {
        self.send(OutboundEvent::InputAudioBufferClear).await
    }

    async fn request_response(&mut self) -> Result<()> {
        self.send(OutboundEvent::ResponseCreate).await
    }

    async fn cancel_response(&mut self) -> Result<()> {
        self.send(OutboundEvent::ResponseCancel).await
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the outbound sender lets the send task drain and close
        // the socket; the recv task ends with it and the event stream
        // closes once its sender is gone.
        self.out_tx = None;
        if let Some(handle) = self.send_handle.take() {
            if let Err(e) = handle.await {
                tracing::debug!("send task ended: {}", e);
            }
        }
        if let Some(handle) = self.recv_handle.take() {
            handle.abort();
        }
        Ok(())
    }
}
