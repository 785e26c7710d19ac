mod bootstrap;
mod health;
mod http_events;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use datadada_core::config::{AppConfig, LoadOptions, SlackMode};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::bootstrap::Application;

fn init_logging(config: &AppConfig) {
    use datadada_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // An invalid config exits here, before any Slack connection is attempted.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let mode = app.config.slack.mode;

    let (stop_http, http_stopped) = oneshot::channel::<()>();
    let http_server = spawn_http(&app, http_stopped).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        transport_mode = transport_label(mode),
        port = app.config.server.port,
        "datadada-server started"
    );

    // A socket runner that gives up ends the process with a non-zero exit.
    let outcome = match mode {
        SlackMode::Socket => {
            let runner = app.socket_runner();
            tokio::select! {
                outcome = runner.start() => outcome.inspect_err(|error| {
                    tracing::error!(
                        event_name = "system.server.socket_failed",
                        correlation_id = "socket",
                        error = %error,
                        "socket mode runner stopped"
                    );
                }),
                signal = wait_for_shutdown() => signal,
            }
        }
        SlackMode::Http => wait_for_shutdown().await,
    };

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "datadada-server stopping"
    );
    let _ = stop_http.send(());
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(grace, http_server).await.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "http listener did not drain in time"
        );
    }

    outcome
}

/// Serves `/health` always and `/slack/events` in HTTP mode.
async fn spawn_http(app: &Application, stopped: oneshot::Receiver<()>) -> Result<JoinHandle<()>> {
    let mut routes = health::router(health::HealthState {
        transport_mode: transport_label(app.config.slack.mode),
        route_count: app.interactions.route_count(),
    });
    if app.config.slack.mode == SlackMode::Http {
        let events = http_events::EventsState::new(
            app.config.slack.signing_secret.clone(),
            app.interactions.clone(),
            app.slack_client.clone(),
        );
        routes = routes.merge(http_events::router(events));
    }

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.http.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "http listener started"
    );

    Ok(tokio::spawn(serve(listener, routes, stopped)))
}

async fn serve(listener: tokio::net::TcpListener, routes: Router, stopped: oneshot::Receiver<()>) {
    let shutdown = async move {
        let _ = stopped.await;
    };
    if let Err(error) = axum::serve(listener, routes).with_graceful_shutdown(shutdown).await {
        tracing::error!(
            event_name = "system.http.error",
            correlation_id = "bootstrap",
            error = %error,
            "http listener terminated unexpectedly"
        );
    }
}

fn transport_label(mode: SlackMode) -> &'static str {
    match mode {
        SlackMode::Socket => "socket",
        SlackMode::Http => "http",
    }
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
