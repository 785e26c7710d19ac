use std::sync::Arc;

use datadada_core::catalog::{CatalogSource, HttpCatalogSource};
use datadada_core::config::AppConfig;
use datadada_slack::client::{SlackClient, SlackWebClient};
use datadada_slack::handlers::{build_router, HandlerDeps};
use datadada_slack::router::{InteractionRouter, RouterError};
use datadada_slack::socket::{ReconnectPolicy, SocketModeRunner, WebSocketTransport};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub slack_web: SlackWebClient,
    pub slack_client: Arc<dyn SlackClient>,
    pub interactions: Arc<InteractionRouter>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("http client construction failed: {0}")]
    HttpClient(String),
    #[error("route registration failed: {0}")]
    Routes(#[from] RouterError),
}

/// Wires catalog, Slack client and routes for an already validated config.
/// Nothing here touches the network.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        transport_mode = ?config.slack.mode,
        "starting application bootstrap"
    );
    let catalog: Arc<dyn CatalogSource> = Arc::new(
        HttpCatalogSource::new(config.catalog.clone())
            .map_err(|error| BootstrapError::HttpClient(error.to_string()))?,
    );

    let slack_web = SlackWebClient::new(
        &config.slack.api_base_url,
        config.slack.bot_token.clone(),
        config.slack.app_token.clone(),
    )
    .map_err(|error| BootstrapError::HttpClient(error.to_string()))?;
    let slack_client: Arc<dyn SlackClient> = Arc::new(slack_web.clone());

    let interactions = Arc::new(build_router(HandlerDeps {
        catalog,
        request_channel_id: config.requests.channel_id.clone(),
        data_sources_url: config.links.data_sources_url.clone(),
        faqs_url: config.links.faqs_url.clone(),
    })?);
    info!(
        event_name = "system.bootstrap.routes_registered",
        correlation_id = "bootstrap",
        route_count = interactions.route_count(),
        "interaction routes registered"
    );

    Ok(Application { config, slack_web, slack_client, interactions })
}

impl Application {
    pub fn socket_runner(&self) -> SocketModeRunner {
        SocketModeRunner::new(
            Arc::new(WebSocketTransport::new(self.slack_web.clone())),
            self.interactions.clone(),
            self.slack_client.clone(),
            ReconnectPolicy::default(),
        )
    }
}
