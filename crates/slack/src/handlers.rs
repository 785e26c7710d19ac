//! Route handlers for the Data Dada bot.
//!
//! Every handler performs at most one catalog fetch or one form open/parse
//! and sends one message. Slack API failures are logged here and do not
//! propagate; the envelope was acknowledged before dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use datadada_core::catalog::{CatalogKind, CatalogSource};
use datadada_core::errors::ApplicationError;
use datadada_core::request_form::{data_platform_request_form, DataPlatformRequest, CALLBACK_ID};
use tracing::{info, warn};

use crate::blocks::{
    self, apology_message, catalog_listing, dashboard_follow_up_message, echo_message,
    greeting_message, request_form_modal, request_summary_message, MessageTemplate,
};
use crate::interaction::Interaction;
use crate::router::{
    HandlerContext, HandlerError, HandlerResult, InteractionHandler, InteractionRouter, RouteKey,
    RouterError,
};

/// Collaborators and links the handlers need.
#[derive(Clone)]
pub struct HandlerDeps {
    pub catalog: Arc<dyn CatalogSource>,
    pub request_channel_id: String,
    pub data_sources_url: String,
    pub faqs_url: String,
}

/// Registers every route. A duplicate key is a startup error.
pub fn build_router(deps: HandlerDeps) -> Result<InteractionRouter, RouterError> {
    let mut router = InteractionRouter::new();

    let greeting: Arc<dyn InteractionHandler> =
        Arc::new(GreetingHandler { data_sources_url: deps.data_sources_url.clone() });
    router.register_shared(RouteKey::command("/hi"), greeting.clone())?;
    router.register_shared(RouteKey::command("/hello"), greeting)?;

    let dashboards: Arc<dyn InteractionHandler> = Arc::new(CatalogLookupHandler {
        catalog: deps.catalog.clone(),
        kind: CatalogKind::Dashboards,
        ask_if_found: false,
    });
    router.register_shared(RouteKey::command("/dashboards"), dashboards.clone())?;
    router.register_shared(RouteKey::command("/dashboard"), dashboards)?;
    router.register(
        RouteKey::command("/data_sources"),
        CatalogLookupHandler {
            catalog: deps.catalog.clone(),
            kind: CatalogKind::DataSources,
            ask_if_found: false,
        },
    )?;
    router.register(
        RouteKey::action(blocks::FIND_DASHBOARD_ACTION),
        CatalogLookupHandler {
            catalog: deps.catalog,
            kind: CatalogKind::Dashboards,
            ask_if_found: true,
        },
    )?;

    router.register(RouteKey::command("/help"), HelpCommandHandler)?;
    router.register(RouteKey::action(blocks::HELP_BUTTON_ACTION), OpenRequestFormHandler)?;

    router.register(
        RouteKey::action(blocks::NEED_HELP_DASHBOARD_ACTION),
        StaticReplyHandler::new(blocks::faq_pointer_message(&deps.faqs_url)),
    )?;
    router.register(
        RouteKey::action(blocks::FOUND_DASHBOARD_ACTION),
        StaticReplyHandler::new(blocks::found_dashboard_message()),
    )?;
    router.register(
        RouteKey::action(blocks::GOT_IT_ACTION),
        StaticReplyHandler::new(blocks::got_it_message()),
    )?;
    router.register(
        RouteKey::action(blocks::GO_TO_FAQS_ACTION),
        StaticReplyHandler::new(blocks::faq_link_message(&deps.faqs_url)),
    )?;

    router.register(
        RouteKey::view(CALLBACK_ID),
        RequestSubmissionHandler { channel_id: deps.request_channel_id },
    )?;
    router.register(RouteKey::event("message"), MessageEchoHandler)?;
    router.register(RouteKey::event("app_home_opened"), AppHomeHandler)?;

    Ok(router)
}

/// User and channel a reply to a command or button click should go to.
fn reply_target(interaction: &Interaction) -> Option<(&str, &str)> {
    match interaction {
        Interaction::SlashCommand(command) => {
            Some((command.user_id.as_str(), command.channel_id.as_str()))
        }
        Interaction::BlockAction(action) => Some((action.user_id.as_str(), action.reply_channel())),
        _ => None,
    }
}

fn trigger_id(interaction: &Interaction) -> Option<&str> {
    match interaction {
        Interaction::SlashCommand(command) => command.trigger_id.as_deref(),
        Interaction::BlockAction(action) => action.trigger_id.as_deref(),
        _ => None,
    }
}

fn unexpected(route: &str, interaction: &Interaction) -> HandlerError {
    HandlerError::UnexpectedInteraction {
        route: route.to_owned(),
        received: interaction.kind().to_owned(),
    }
}

async fn reply(
    ctx: &HandlerContext,
    route: &'static str,
    channel: &str,
    message: MessageTemplate,
) -> HandlerResult {
    match ctx.client.post_message(channel, &message).await {
        Ok(()) => HandlerResult::Replied { channel: channel.to_owned(), message },
        Err(error) => {
            warn!(
                event_name = "slack.reply.failed",
                correlation_id = %ctx.correlation_id,
                route,
                channel,
                error = %error,
                "failed to post reply"
            );
            HandlerResult::Processed
        }
    }
}

async fn open_request_form(ctx: &HandlerContext, route: &'static str, trigger_id: &str) -> bool {
    let modal = request_form_modal(data_platform_request_form());
    match ctx.client.open_view(trigger_id, &modal).await {
        Ok(()) => true,
        Err(error) => {
            warn!(
                event_name = "slack.modal.open_failed",
                correlation_id = %ctx.correlation_id,
                route,
                error = %error,
                "failed to open request form"
            );
            false
        }
    }
}

pub struct GreetingHandler {
    data_sources_url: String,
}

#[async_trait]
impl InteractionHandler for GreetingHandler {
    async fn handle(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError> {
        let (user_id, channel) =
            reply_target(interaction).ok_or_else(|| unexpected("greeting", interaction))?;
        let message = greeting_message(user_id, &self.data_sources_url);
        Ok(reply(ctx, "greeting", channel, message).await)
    }
}

/// Fetches one catalog and replies with the numbered list, or the catalog's
/// apology when the fetch fails.
pub struct CatalogLookupHandler {
    catalog: Arc<dyn CatalogSource>,
    kind: CatalogKind,
    ask_if_found: bool,
}

#[async_trait]
impl InteractionHandler for CatalogLookupHandler {
    async fn handle(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError> {
        let (user_id, channel) =
            reply_target(interaction).ok_or_else(|| unexpected("catalog_lookup", interaction))?;

        let message = match self.catalog.fetch_records(self.kind).await {
            Ok(records) => {
                info!(
                    event_name = "catalog.lookup.completed",
                    correlation_id = %ctx.correlation_id,
                    catalog = self.kind.field_name(),
                    record_count = records.len(),
                    "catalog lookup completed"
                );
                let mut message = catalog_listing(self.kind, user_id, &records);
                if self.ask_if_found {
                    message.blocks.extend(dashboard_follow_up_message().blocks);
                }
                message
            }
            Err(error) => {
                let error = ApplicationError::from(error);
                warn!(
                    event_name = "catalog.lookup.failed",
                    correlation_id = %ctx.correlation_id,
                    catalog = self.kind.field_name(),
                    error_class = error.error_class(),
                    error = %error,
                    "catalog lookup failed"
                );
                apology_message(error.user_message())
            }
        };

        Ok(reply(ctx, "catalog_lookup", channel, message).await)
    }
}

/// `/help`: prompt in the channel, then open the request form.
pub struct HelpCommandHandler;

#[async_trait]
impl InteractionHandler for HelpCommandHandler {
    async fn handle(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError> {
        let (user_id, channel) =
            reply_target(interaction).ok_or_else(|| unexpected("help_command", interaction))?;
        let trigger_id = trigger_id(interaction).ok_or(HandlerError::MissingContext("trigger_id"))?;

        let prompt = blocks::request_form_prompt(user_id);
        let result = reply(ctx, "help_command", channel, prompt).await;
        open_request_form(ctx, "help_command", trigger_id).await;
        Ok(result)
    }
}

/// `help_button`: open the request form from the clicked button.
pub struct OpenRequestFormHandler;

#[async_trait]
impl InteractionHandler for OpenRequestFormHandler {
    async fn handle(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError> {
        let trigger_id = trigger_id(interaction).ok_or(HandlerError::MissingContext("trigger_id"))?;

        if open_request_form(ctx, "help_button", trigger_id).await {
            Ok(HandlerResult::ViewOpened)
        } else {
            Ok(HandlerResult::Processed)
        }
    }
}

pub struct StaticReplyHandler {
    message: MessageTemplate,
}

impl StaticReplyHandler {
    pub fn new(message: MessageTemplate) -> Self {
        Self { message }
    }
}

#[async_trait]
impl InteractionHandler for StaticReplyHandler {
    async fn handle(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError> {
        let (_, channel) =
            reply_target(interaction).ok_or_else(|| unexpected("static_reply", interaction))?;
        Ok(reply(ctx, "static_reply", channel, self.message.clone()).await)
    }
}

/// Posts a validated form submission to the request channel.
pub struct RequestSubmissionHandler {
    channel_id: String,
}

#[async_trait]
impl InteractionHandler for RequestSubmissionHandler {
    async fn handle(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError> {
        let Interaction::ViewSubmission(submission) = interaction else {
            return Err(unexpected("request_submission", interaction));
        };

        let request = match DataPlatformRequest::from_submission(&submission.values) {
            Ok(request) => request,
            Err(error) => {
                let interface =
                    ApplicationError::from(error).into_interface(ctx.correlation_id.clone());
                warn!(
                    event_name = "request_form.rejected",
                    correlation_id = %ctx.correlation_id,
                    user_id = %submission.user_id,
                    error = %interface,
                    "request form submission rejected"
                );
                let notice = apology_message(interface.user_message());
                return Ok(reply(ctx, "request_submission", &submission.user_id, notice).await);
            }
        };

        info!(
            event_name = "request_form.submitted",
            correlation_id = %ctx.correlation_id,
            user_id = %submission.user_id,
            request_type = request.request_type.as_value(),
            geo_specific = %request.geo_specific,
            priority = %request.priority,
            completion_date = %request.completion_date,
            "data platform request submitted"
        );

        let message = request_summary_message(&request.summary(&submission.user_id));
        Ok(reply(ctx, "request_submission", &self.channel_id, message).await)
    }
}

pub struct MessageEchoHandler;

#[async_trait]
impl InteractionHandler for MessageEchoHandler {
    async fn handle(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError> {
        let Interaction::Message(message) = interaction else {
            return Err(unexpected("message_echo", interaction));
        };
        Ok(reply(ctx, "message_echo", &message.channel_id, echo_message(&message.text)).await)
    }
}

pub struct AppHomeHandler;

#[async_trait]
impl InteractionHandler for AppHomeHandler {
    async fn handle(
        &self,
        interaction: &Interaction,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, HandlerError> {
        let Interaction::AppHomeOpened { user_id } = interaction else {
            return Err(unexpected("app_home_opened", interaction));
        };
        info!(
            event_name = "slack.app_home_opened",
            correlation_id = %ctx.correlation_id,
            user_id = %user_id,
            "app home opened"
        );
        Ok(HandlerResult::Processed)
    }
}
