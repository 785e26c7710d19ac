use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::blocks::{MessageTemplate, ModalView};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("slack {method} request failed: {message}")]
    Transport { method: &'static str, message: String },
    #[error("slack {method} returned status {status}: {body}")]
    Status { method: &'static str, status: u16, body: String },
    #[error("slack {method} failed: {error}")]
    Api { method: &'static str, error: String },
    #[error("slack {method} response could not be decoded: {message}")]
    Decode { method: &'static str, message: String },
}

/// Outbound Slack capability handed to handlers.
#[async_trait]
pub trait SlackClient: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError>;

    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), SlackApiError>;
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Clone)]
pub struct SlackWebClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
    app_token: SecretString,
}

impl SlackWebClient {
    pub fn new(
        api_base: &str,
        bot_token: SecretString,
        app_token: SecretString,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().user_agent("datadada-slack").build()?;
        Ok(Self { http, api_base: api_base.trim_end_matches('/').to_owned(), bot_token, app_token })
    }

    /// `apps.connections.open`: a fresh Socket Mode WebSocket url.
    pub async fn open_socket_url(&self) -> Result<String, SlackApiError> {
        const METHOD: &str = "apps.connections.open";
        let response = self.call(METHOD, &self.app_token, None).await?;
        response
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or(SlackApiError::Decode { method: METHOD, message: "missing url".to_owned() })
    }

    async fn call(
        &self,
        method: &'static str,
        token: &SecretString,
        body: Option<Value>,
    ) -> Result<SlackResponse, SlackApiError> {
        let mut request = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(token.expose_secret());
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|error| SlackApiError::Transport { method, message: error.to_string() })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlackApiError::Status { method, status: status.as_u16(), body });
        }

        let parsed = response
            .json::<SlackResponse>()
            .await
            .map_err(|error| SlackApiError::Decode { method, message: error.to_string() })?;
        if !parsed.ok {
            return Err(SlackApiError::Api {
                method,
                error: parsed.error.unwrap_or_else(|| "unknown_error".to_owned()),
            });
        }

        debug!(event_name = "slack.api.ok", method, "slack api call succeeded");
        Ok(parsed)
    }
}

#[async_trait]
impl SlackClient for SlackWebClient {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        let body = json!({
            "channel": channel,
            "text": message.fallback_text,
            "blocks": message.blocks,
        });
        self.call("chat.postMessage", &self.bot_token, Some(body)).await.map(|_| ())
    }

    async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), SlackApiError> {
        let body = json!({ "trigger_id": trigger_id, "view": view });
        self.call("views.open", &self.bot_token, Some(body)).await.map(|_| ())
    }
}
