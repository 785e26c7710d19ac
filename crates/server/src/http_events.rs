//! HTTP Events API receiver: `POST /slack/events`.
//!
//! Bodies are signature-checked, parsed into the same [`SlackEnvelope`] the
//! Socket Mode path produces, acknowledged with an empty 200 and dispatched
//! on a spawned task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use datadada_slack::client::SlackClient;
use datadada_slack::interaction::{
    event_from_json, interactive_from_json, slash_command_from_fields, EnvelopeError,
    SlackEnvelope,
};
use datadada_slack::router::InteractionRouter;
use datadada_slack::signature::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use datadada_slack::socket::dispatch_envelope;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const EVENTS_PATH: &str = "/slack/events";

#[derive(Clone)]
pub struct EventsState {
    pub signing_secret: SecretString,
    pub interactions: Arc<InteractionRouter>,
    pub client: Arc<dyn SlackClient>,
    sequence: Arc<AtomicU64>,
}

impl EventsState {
    pub fn new(
        signing_secret: SecretString,
        interactions: Arc<InteractionRouter>,
        client: Arc<dyn SlackClient>,
    ) -> Self {
        Self { signing_secret, interactions, client, sequence: Arc::new(AtomicU64::new(0)) }
    }

    fn next_correlation_id(&self, hint: Option<&str>) -> String {
        match hint {
            Some(hint) => hint.to_owned(),
            None => format!("http-{}", self.sequence.fetch_add(1, Ordering::Relaxed) + 1),
        }
    }
}

pub fn router(state: EventsState) -> Router {
    Router::new().route(EVENTS_PATH, post(receive)).with_state(state)
}

/// What an inbound body turned out to be.
#[derive(Debug)]
enum Inbound {
    Challenge(String),
    Interaction { correlation_hint: Option<String>, envelope: SlackEnvelope },
    Ignored(String),
}

async fn receive(State(state): State<EventsState>, headers: HeaderMap, body: Bytes) -> Response {
    let verified = signature::verify(
        state.signing_secret.expose_secret(),
        header_str(&headers, TIMESTAMP_HEADER),
        header_str(&headers, SIGNATURE_HEADER),
        &body,
        Utc::now().timestamp(),
    );
    if let Err(error) = verified {
        warn!(
            event_name = "slack.http.signature_rejected",
            correlation_id = "http",
            error = %error,
            "rejecting unsigned or stale request"
        );
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let is_form = header_str(&headers, header::CONTENT_TYPE.as_str())
        .is_some_and(|content_type| content_type.starts_with("application/x-www-form-urlencoded"));

    let inbound = if is_form { parse_form_body(&body) } else { parse_json_body(&body) };
    match inbound {
        Ok(Inbound::Challenge(challenge)) => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(Inbound::Interaction { correlation_hint, mut envelope }) => {
            envelope.envelope_id = state.next_correlation_id(correlation_hint.as_deref());
            debug!(
                event_name = "slack.http.received",
                correlation_id = %envelope.envelope_id,
                kind = envelope.interaction.kind(),
                "interaction received over http"
            );
            let interactions = state.interactions.clone();
            let client = state.client.clone();
            tokio::spawn(async move {
                dispatch_envelope(&interactions, client, envelope).await;
            });
            StatusCode::OK.into_response()
        }
        Ok(Inbound::Ignored(kind)) => {
            debug!(
                event_name = "slack.http.ignored",
                correlation_id = "http",
                kind = %kind,
                "ignoring callback"
            );
            StatusCode::OK.into_response()
        }
        Err(error) => {
            warn!(
                event_name = "slack.http.malformed",
                correlation_id = "http",
                error = %error,
                "could not parse slack request body"
            );
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

/// Slash commands post their fields directly; interactive payloads post a
/// single `payload` field holding JSON.
fn parse_form_body(body: &[u8]) -> Result<Inbound, EnvelopeError> {
    let fields: HashMap<String, String> = form_urlencoded::parse(body).into_owned().collect();

    let interaction = match fields.get("payload") {
        Some(payload) => {
            let payload: Value = serde_json::from_str(payload)
                .map_err(|error| EnvelopeError::Json(error.to_string()))?;
            interactive_from_json(&payload)?
        }
        None => slash_command_from_fields(&fields)?,
    };

    Ok(Inbound::Interaction {
        correlation_hint: None,
        envelope: SlackEnvelope { envelope_id: String::new(), interaction },
    })
}

fn parse_json_body(body: &[u8]) -> Result<Inbound, EnvelopeError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|error| EnvelopeError::Json(error.to_string()))?;
    let kind = payload.get("type").and_then(Value::as_str).unwrap_or_default();

    match kind {
        "url_verification" => {
            let challenge = payload
                .get("challenge")
                .and_then(Value::as_str)
                .ok_or(EnvelopeError::MissingField("challenge"))?;
            Ok(Inbound::Challenge(challenge.to_owned()))
        }
        "event_callback" => Ok(Inbound::Interaction {
            correlation_hint: payload.get("event_id").and_then(Value::as_str).map(str::to_owned),
            envelope: SlackEnvelope {
                envelope_id: String::new(),
                interaction: event_from_json(&payload)?,
            },
        }),
        other => Ok(Inbound::Ignored(other.to_owned())),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
