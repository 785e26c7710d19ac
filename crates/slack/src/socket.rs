use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::client::{SlackClient, SlackWebClient};
use crate::interaction::{parse_socket_frame, EnvelopeError, SlackEnvelope, SocketFrame};
use crate::router::{HandlerContext, HandlerResult, InteractionRouter, RouteKey};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// One frame that Slack expects to be acknowledged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Envelope(SlackEnvelope),
    Malformed { envelope_id: String, error: EnvelopeError },
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` ends the session; the runner reconnects.
    async fn next_envelope(&self) -> Result<Option<Delivery>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket Mode over a real WebSocket. Each `connect` asks Slack for a fresh
/// url with the app token.
pub struct WebSocketTransport {
    client: SlackWebClient,
    sink: Mutex<Option<SplitSink<WsStream, WsMessage>>>,
    source: Mutex<Option<SplitStream<WsStream>>>,
}

impl WebSocketTransport {
    pub fn new(client: SlackWebClient) -> Self {
        Self { client, sink: Mutex::new(None), source: Mutex::new(None) }
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .client
            .open_socket_url()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (sink, source) = stream.split();

        *self.sink.lock().await = Some(sink);
        *self.source.lock().await = Some(source);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<Delivery>, TransportError> {
        let mut guard = self.source.lock().await;
        let Some(source) = guard.as_mut() else {
            return Err(TransportError::Receive("not connected".to_owned()));
        };

        loop {
            let Some(message) = source.next().await else {
                return Ok(None);
            };
            let message = message.map_err(|error| TransportError::Receive(error.to_string()))?;

            let raw = match message {
                WsMessage::Text(text) => text.as_str().to_owned(),
                WsMessage::Binary(bytes) => String::from_utf8(bytes.to_vec())
                    .map_err(|error| TransportError::Receive(error.to_string()))?,
                WsMessage::Close(_) => return Ok(None),
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            };

            match parse_socket_frame(&raw) {
                Ok(SocketFrame::Envelope(envelope)) => {
                    return Ok(Some(Delivery::Envelope(envelope)));
                }
                Ok(SocketFrame::Rejected { envelope_id, error }) => {
                    return Ok(Some(Delivery::Malformed { envelope_id, error }));
                }
                Ok(SocketFrame::Hello) => debug!("socket mode hello received"),
                Ok(SocketFrame::Disconnect { reason }) => {
                    info!(reason = %reason, "slack requested socket mode disconnect");
                    return Ok(None);
                }
                Err(error) => {
                    warn!(
                        event_name = "ingress.slack.envelope_rejected",
                        error = %error,
                        "dropping socket mode frame without an envelope id"
                    );
                }
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Err(TransportError::Acknowledge("not connected".to_owned()));
        };
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        sink.send(WsMessage::Text(ack.into()))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.source.lock().await.take();
        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            sink.close().await.map_err(|error| TransportError::Disconnect(error.to_string()))?;
        }
        Ok(())
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    router: Arc<InteractionRouter>,
    client: Arc<dyn SlackClient>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        router: Arc<InteractionRouter>,
        client: Arc<dyn SlackClient>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, router, client, reconnect_policy }
    }

    /// Runs sessions until `max_retries` consecutive connection failures,
    /// then returns an error. A session that ends cleanly resets the count.
    pub async fn start(&self) -> Result<()> {
        let mut failures = 0_u32;
        loop {
            match self.connect_and_pump(failures).await {
                Ok(()) => {
                    failures = 0;
                    let delay = self.reconnect_policy.backoff(0);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(transport_error) => {
                    warn!(
                        attempt = failures,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if failures >= self.reconnect_policy.max_retries {
                        bail!(
                            "socket mode retries exhausted after {} attempts: {transport_error}",
                            failures + 1
                        );
                    }

                    let delay = self.reconnect_policy.backoff(failures);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    failures += 1;
                }
            }
        }
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode transport connected");

        let mut in_flight = JoinSet::new();
        let outcome = self.pump(&mut in_flight).await;
        while in_flight.join_next().await.is_some() {}
        outcome
    }

    async fn pump(&self, in_flight: &mut JoinSet<()>) -> Result<(), TransportError> {
        loop {
            let Some(delivery) = self.transport.next_envelope().await? else {
                info!("socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let envelope = match delivery {
                Delivery::Envelope(envelope) => envelope,
                Delivery::Malformed { envelope_id, error } => {
                    self.acknowledge(&envelope_id).await;
                    warn!(
                        event_name = "ingress.slack.envelope_rejected",
                        envelope_id = %envelope_id,
                        correlation_id = %envelope_id,
                        error = %error,
                        "acknowledged malformed slack envelope without dispatch"
                    );
                    continue;
                }
            };
            let route = route_label(&envelope);

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                interaction = envelope.interaction.kind(),
                route = %route,
                correlation_id = %envelope.envelope_id,
                "received slack envelope"
            );

            self.acknowledge(&envelope.envelope_id).await;

            let router = Arc::clone(&self.router);
            let client = Arc::clone(&self.client);
            in_flight.spawn(async move {
                dispatch_envelope(&router, client, envelope).await;
            });

            while in_flight.try_join_next().is_some() {}
        }
    }

    async fn acknowledge(&self, envelope_id: &str) {
        if let Err(error) = self.transport.acknowledge(envelope_id).await {
            warn!(
                event_name = "ingress.slack.ack_sent",
                envelope_id = %envelope_id,
                correlation_id = %envelope_id,
                error = %error,
                "failed to acknowledge slack envelope"
            );
        } else {
            debug!(
                event_name = "ingress.slack.ack_sent",
                envelope_id = %envelope_id,
                correlation_id = %envelope_id,
                "acknowledged slack envelope"
            );
        }
    }
}

/// Dispatches one acknowledged envelope and logs the outcome. Shared by the
/// Socket Mode runner and the HTTP receiver.
pub async fn dispatch_envelope(
    router: &InteractionRouter,
    client: Arc<dyn SlackClient>,
    envelope: SlackEnvelope,
) -> Option<HandlerResult> {
    let route = route_label(&envelope);
    let ctx = HandlerContext::new(envelope.envelope_id.clone(), client);

    match router.dispatch(&envelope.interaction, &ctx).await {
        Ok(HandlerResult::Ignored) => {
            debug!(
                event_name = "slack.dispatch.ignored",
                correlation_id = %ctx.correlation_id,
                route = %route,
                "no handler for interaction"
            );
            Some(HandlerResult::Ignored)
        }
        Ok(result) => {
            debug!(
                event_name = "slack.dispatch.completed",
                correlation_id = %ctx.correlation_id,
                route = %route,
                "interaction handled"
            );
            Some(result)
        }
        Err(error) => {
            warn!(
                event_name = "slack.dispatch.failed",
                correlation_id = %ctx.correlation_id,
                route = %route,
                user_id = envelope.interaction.user_id().unwrap_or("unknown"),
                error = %error,
                "event dispatch failed; continuing"
            );
            None
        }
    }
}

fn route_label(envelope: &SlackEnvelope) -> String {
    RouteKey::for_interaction(&envelope.interaction)
        .map(|key| key.to_string())
        .unwrap_or_else(|| format!("unsupported:{}", envelope.interaction.kind()))
}
