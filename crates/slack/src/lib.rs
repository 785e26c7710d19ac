//! Slack interface for Data Dada.
//!
//! - **Block Kit** (`blocks`) - message and modal builders
//! - **Interactions** (`interaction`) - typed slash commands, actions, view submissions, events
//! - **Routing** (`router`, `handlers`) - route table and the bot's handlers
//! - **Web API** (`client`) - `chat.postMessage`, `views.open`, `apps.connections.open`
//! - **Socket Mode** (`socket`) - WebSocket loop with ack-before-dispatch and reconnects
//! - **Request signing** (`signature`) - verification for the HTTP Events API
//!
//! ```text
//! Socket Mode / HTTP → Interaction → InteractionRouter → handler → SlackClient
//!                                                   ↘ CatalogSource
//! ```

pub mod blocks;
pub mod client;
pub mod handlers;
pub mod interaction;
pub mod router;
pub mod signature;
pub mod socket;

#[cfg(test)]
mod testing;

pub use client::{SlackApiError, SlackClient, SlackWebClient};
pub use handlers::{build_router, HandlerDeps};
pub use interaction::{Interaction, SlackEnvelope};
pub use router::{InteractionRouter, RouteKey, RouterError};
pub use socket::{
    dispatch_envelope, Delivery, ReconnectPolicy, SocketModeRunner, WebSocketTransport,
};
