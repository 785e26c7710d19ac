use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::MessageTemplate;
use crate::client::SlackClient;
use crate::interaction::Interaction;

/// What an interaction is dispatched on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RouteKey {
    Command(String),
    Action(String),
    View(String),
    Event(String),
}

impl RouteKey {
    pub fn command(name: &str) -> Self {
        Self::Command(name.to_owned())
    }

    pub fn action(action_id: &str) -> Self {
        Self::Action(action_id.to_owned())
    }

    pub fn view(callback_id: &str) -> Self {
        Self::View(callback_id.to_owned())
    }

    pub fn event(event_type: &str) -> Self {
        Self::Event(event_type.to_owned())
    }

    pub fn for_interaction(interaction: &Interaction) -> Option<Self> {
        match interaction {
            Interaction::SlashCommand(command) => Some(Self::command(&command.command)),
            Interaction::BlockAction(action) => Some(Self::action(&action.action_id)),
            Interaction::ViewSubmission(submission) => Some(Self::view(&submission.callback_id)),
            Interaction::Message(_) => Some(Self::event("message")),
            Interaction::AppHomeOpened { .. } => Some(Self::event("app_home_opened")),
            Interaction::Unsupported { .. } => None,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(name) => write!(f, "command:{name}"),
            Self::Action(action_id) => write!(f, "action:{action_id}"),
            Self::View(callback_id) => write!(f, "view:{callback_id}"),
            Self::Event(event_type) => write!(f, "event:{event_type}"),
        }
    }
}

pub struct HandlerContext {
    pub correlation_id: String,
    pub client: Arc<dyn SlackClient>,
}

impl HandlerContext {
    pub fn new(correlation_id: impl Into<String>, client: Arc<dyn SlackClient>) -> Self {
        Self { correlation_id: correlation_id.into(), client }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// A message was posted to `channel`.
    Replied { channel: String, message: MessageTemplate },
    ViewOpened,
    Processed,
    Ignored,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("interaction is missing {0}")]
    MissingContext(&'static str),
    #[error("route {route} received an unexpected {received} interaction")]
    UnexpectedInteraction { route: String, received: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("route {0} is already registered")]
    DuplicateRoute(RouteKey),
}

#[async_trait]
pub trait InteractionHandler: Send + Sync {
    async fn handle(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError>;
}

/// Route table built once at startup and shared read-only afterwards.
#[derive(Default)]
pub struct InteractionRouter {
    routes: HashMap<RouteKey, Arc<dyn InteractionHandler>>,
}

impl InteractionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, key: RouteKey, handler: H) -> Result<(), RouterError>
    where
        H: InteractionHandler + 'static,
    {
        self.register_shared(key, Arc::new(handler))
    }

    /// Same handler under several keys (command aliases).
    pub fn register_shared(
        &mut self,
        key: RouteKey,
        handler: Arc<dyn InteractionHandler>,
    ) -> Result<(), RouterError> {
        if self.routes.contains_key(&key) {
            return Err(RouterError::DuplicateRoute(key));
        }
        self.routes.insert(key, handler);
        Ok(())
    }

    pub async fn dispatch(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError> {
        let Some(handler) =
            RouteKey::for_interaction(interaction).and_then(|key| self.routes.get(&key))
        else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(interaction, ctx).await
    }

    pub fn contains(&self, key: &RouteKey) -> bool {
        self.routes.contains_key(key)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{
        HandlerContext, HandlerError, HandlerResult, InteractionHandler, InteractionRouter,
        RouteKey, RouterError,
    };
    use crate::interaction::{Interaction, SlashCommand};
    use crate::testing::RecordingClient;

    struct Processed;

    #[async_trait]
    impl InteractionHandler for Processed {
        async fn handle(
            &self,
            _interaction: &Interaction,
            _ctx: &HandlerContext,
        ) -> Result<HandlerResult, HandlerError> {
            Ok(HandlerResult::Processed)
        }
    }

    fn command(name: &str) -> Interaction {
        Interaction::SlashCommand(SlashCommand {
            command: name.to_owned(),
            text: String::new(),
            user_id: "U1".to_owned(),
            channel_id: "C1".to_owned(),
            trigger_id: None,
        })
    }

    fn context() -> HandlerContext {
        HandlerContext::new("corr-1", Arc::new(RecordingClient::default()))
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut router = InteractionRouter::new();
        router.register(RouteKey::command("/hi"), Processed).expect("first registration");

        assert_eq!(
            router.register(RouteKey::command("/hi"), Processed),
            Err(RouterError::DuplicateRoute(RouteKey::command("/hi")))
        );
        assert_eq!(router.route_count(), 1);
    }

    #[test]
    fn same_name_in_different_namespaces_is_allowed() {
        let mut router = InteractionRouter::new();
        router.register(RouteKey::command("help"), Processed).expect("command");
        router.register(RouteKey::action("help"), Processed).expect("action");
        assert_eq!(router.route_count(), 2);
    }

    #[tokio::test]
    async fn dispatches_to_registered_handler() {
        let mut router = InteractionRouter::new();
        router.register(RouteKey::command("/hi"), Processed).expect("register");

        let result = router.dispatch(&command("/hi"), &context()).await.expect("dispatch");
        assert_eq!(result, HandlerResult::Processed);
    }

    #[tokio::test]
    async fn unknown_routes_are_ignored() {
        let router = InteractionRouter::new();

        let result = router.dispatch(&command("/nope"), &context()).await.expect("dispatch");
        assert_eq!(result, HandlerResult::Ignored);

        let unsupported = Interaction::Unsupported { kind: "shortcut".to_owned() };
        let result = router.dispatch(&unsupported, &context()).await.expect("dispatch");
        assert_eq!(result, HandlerResult::Ignored);
    }

    #[test]
    fn route_keys_render_with_namespace() {
        assert_eq!(
            RouteKey::view("data_platform_request_form").to_string(),
            "view:data_platform_request_form"
        );
        assert_eq!(RouteKey::event("message").to_string(), "event:message");
    }
}
