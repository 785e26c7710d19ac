//! Typed interactions parsed from Slack payloads.
//!
//! Socket Mode envelopes and HTTP Events API requests carry the same payload
//! shapes, so both transports funnel into [`Interaction`]. Required fields are
//! checked here; handlers never dig through raw JSON.

use std::collections::HashMap;

use datadada_core::request_form::SubmittedForm;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("payload is not valid JSON: {0}")]
    Json(String),
    #[error("payload is missing `{0}`")]
    MissingField(&'static str),
    #[error("payload field `{field}` is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub interaction: Interaction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
    SlashCommand(SlashCommand),
    BlockAction(BlockAction),
    ViewSubmission(ViewSubmission),
    Message(MessageEvent),
    AppHomeOpened { user_id: String },
    Unsupported { kind: String },
}

impl Interaction {
    pub fn kind(&self) -> &str {
        match self {
            Self::SlashCommand(_) => "slash_command",
            Self::BlockAction(_) => "block_action",
            Self::ViewSubmission(_) => "view_submission",
            Self::Message(_) => "message",
            Self::AppHomeOpened { .. } => "app_home_opened",
            Self::Unsupported { kind } => kind,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::SlashCommand(command) => Some(&command.user_id),
            Self::BlockAction(action) => Some(&action.user_id),
            Self::ViewSubmission(submission) => Some(&submission.user_id),
            Self::Message(message) => Some(&message.user_id),
            Self::AppHomeOpened { user_id } => Some(user_id),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommand {
    pub command: String,
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    pub trigger_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockAction {
    pub action_id: String,
    pub value: Option<String>,
    pub user_id: String,
    pub channel_id: Option<String>,
    pub trigger_id: Option<String>,
}

impl BlockAction {
    /// Where replies go: the originating channel, or the user's DM when the
    /// action came from a surface without one.
    pub fn reply_channel(&self) -> &str {
        self.channel_id.as_deref().unwrap_or(&self.user_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewSubmission {
    pub callback_id: String,
    pub user_id: String,
    pub values: SubmittedForm,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub user_id: String,
    pub channel_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct RawSlashCommand {
    command: String,
    #[serde(default)]
    text: String,
    user_id: String,
    channel_id: String,
    #[serde(default)]
    trigger_id: Option<String>,
}

/// Slash command from its field map (form body or Socket Mode payload).
pub fn slash_command_from_fields(
    fields: &HashMap<String, String>,
) -> Result<Interaction, EnvelopeError> {
    let required = |key: &'static str| {
        fields
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .ok_or(EnvelopeError::MissingField(key))
    };

    Ok(Interaction::SlashCommand(SlashCommand {
        command: required("command")?,
        text: fields.get("text").cloned().unwrap_or_default(),
        user_id: required("user_id")?,
        channel_id: required("channel_id")?,
        trigger_id: fields.get("trigger_id").filter(|value| !value.is_empty()).cloned(),
    }))
}

pub fn slash_command_from_json(payload: &Value) -> Result<Interaction, EnvelopeError> {
    let raw = RawSlashCommand::deserialize(payload).map_err(|error| {
        EnvelopeError::Malformed { field: "slash_command", reason: error.to_string() }
    })?;
    if raw.command.trim().is_empty() {
        return Err(EnvelopeError::MissingField("command"));
    }

    Ok(Interaction::SlashCommand(SlashCommand {
        command: raw.command.trim().to_owned(),
        text: raw.text,
        user_id: raw.user_id,
        channel_id: raw.channel_id,
        trigger_id: raw.trigger_id.filter(|value| !value.is_empty()),
    }))
}

/// `block_actions` and `view_submission` payloads. Other interactive types
/// come back as [`Interaction::Unsupported`].
pub fn interactive_from_json(payload: &Value) -> Result<Interaction, EnvelopeError> {
    let kind = str_at(payload, &["type"]).ok_or(EnvelopeError::MissingField("type"))?;

    match kind {
        "block_actions" => {
            let user_id = required_str(payload, &["user", "id"], "user.id")?;
            let action = payload
                .get("actions")
                .and_then(Value::as_array)
                .and_then(|actions| actions.first())
                .ok_or(EnvelopeError::MissingField("actions"))?;
            let action_id = required_str(action, &["action_id"], "actions[0].action_id")?;
            let value = str_at(action, &["value"])
                .or_else(|| str_at(action, &["selected_option", "value"]))
                .map(str::to_owned);

            Ok(Interaction::BlockAction(BlockAction {
                action_id,
                value,
                user_id,
                channel_id: str_at(payload, &["channel", "id"]).map(str::to_owned),
                trigger_id: str_at(payload, &["trigger_id"]).map(str::to_owned),
            }))
        }
        "view_submission" => {
            let user_id = required_str(payload, &["user", "id"], "user.id")?;
            let callback_id = required_str(payload, &["view", "callback_id"], "view.callback_id")?;
            let values = payload
                .get("view")
                .and_then(|view| view.get("state"))
                .and_then(|state| state.get("values"))
                .ok_or(EnvelopeError::MissingField("view.state.values"))?;

            Ok(Interaction::ViewSubmission(ViewSubmission {
                callback_id,
                user_id,
                values: submitted_values(values)?,
            }))
        }
        other => Ok(Interaction::Unsupported { kind: other.to_owned() }),
    }
}

/// Flattens `view.state.values` (block id → action id → element state) into
/// a map keyed by action id. Unset elements are left out.
pub fn submitted_values(values: &Value) -> Result<SubmittedForm, EnvelopeError> {
    let blocks = values.as_object().ok_or_else(|| EnvelopeError::Malformed {
        field: "view.state.values",
        reason: "expected an object".to_owned(),
    })?;

    let mut form = SubmittedForm::new();
    for elements in blocks.values() {
        let Some(elements) = elements.as_object() else {
            continue;
        };
        for (action_id, state) in elements {
            let value = str_at(state, &["value"])
                .or_else(|| str_at(state, &["selected_option", "value"]))
                .or_else(|| str_at(state, &["selected_date"]));
            if let Some(value) = value {
                form.insert(action_id.clone(), value);
            }
        }
    }
    Ok(form)
}

/// `event_callback` bodies: the inner `event` decides the interaction.
pub fn event_from_json(payload: &Value) -> Result<Interaction, EnvelopeError> {
    let event = payload.get("event").ok_or(EnvelopeError::MissingField("event"))?;
    let kind = str_at(event, &["type"]).ok_or(EnvelopeError::MissingField("event.type"))?;

    match kind {
        "message" => {
            let from_bot = event.get("bot_id").is_some() || event.get("subtype").is_some();
            let user_id = str_at(event, &["user"]);
            match (from_bot, user_id) {
                (false, Some(user_id)) => Ok(Interaction::Message(MessageEvent {
                    user_id: user_id.to_owned(),
                    channel_id: required_str(event, &["channel"], "event.channel")?,
                    text: str_at(event, &["text"]).unwrap_or_default().to_owned(),
                })),
                _ => Ok(Interaction::Unsupported { kind: "message.bot_or_subtype".to_owned() }),
            }
        }
        "app_home_opened" => Ok(Interaction::AppHomeOpened {
            user_id: required_str(event, &["user"], "event.user")?,
        }),
        other => Ok(Interaction::Unsupported { kind: other.to_owned() }),
    }
}

/// One decoded Socket Mode frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketFrame {
    Hello,
    /// Slack is about to close the connection; reconnect with a fresh url.
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
    /// Carries an envelope id but its payload could not be decoded. Slack
    /// still expects an ack for it.
    Rejected { envelope_id: String, error: EnvelopeError },
}

pub fn parse_socket_frame(raw: &str) -> Result<SocketFrame, EnvelopeError> {
    let frame: Value =
        serde_json::from_str(raw).map_err(|error| EnvelopeError::Json(error.to_string()))?;
    let frame_type = str_at(&frame, &["type"]).ok_or(EnvelopeError::MissingField("type"))?;

    match frame_type {
        "hello" => return Ok(SocketFrame::Hello),
        "disconnect" => {
            let reason = str_at(&frame, &["reason"]).unwrap_or("unspecified").to_owned();
            return Ok(SocketFrame::Disconnect { reason });
        }
        _ => {}
    }

    let envelope_id = required_str(&frame, &["envelope_id"], "envelope_id")?;
    let payload = frame.get("payload").unwrap_or(&Value::Null);

    let parsed = match frame_type {
        "slash_commands" => slash_command_from_json(payload),
        "interactive" => interactive_from_json(payload),
        "events_api" => event_from_json(payload),
        other => Ok(Interaction::Unsupported { kind: other.to_owned() }),
    };

    Ok(match parsed {
        Ok(interaction) => SocketFrame::Envelope(SlackEnvelope { envelope_id, interaction }),
        Err(error) => SocketFrame::Rejected { envelope_id, error },
    })
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter().try_fold(value, |current, key| current.get(key))?.as_str()
}

fn required_str(value: &Value, path: &[&str], name: &'static str) -> Result<String, EnvelopeError> {
    str_at(value, path)
        .filter(|found| !found.trim().is_empty())
        .map(str::to_owned)
        .ok_or(EnvelopeError::MissingField(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::{
        event_from_json, interactive_from_json, parse_socket_frame, slash_command_from_fields,
        EnvelopeError, Interaction, SocketFrame,
    };

    #[test]
    fn parses_socket_slash_command() {
        let raw = json!({
            "envelope_id": "env-1",
            "type": "slash_commands",
            "payload": {
                "command": "/dashboards",
                "text": "",
                "user_id": "U1",
                "channel_id": "C1",
                "trigger_id": "trig-1"
            }
        })
        .to_string();

        let SocketFrame::Envelope(envelope) = parse_socket_frame(&raw).expect("parse") else {
            panic!("expected envelope frame");
        };
        assert_eq!(envelope.envelope_id, "env-1");
        let Interaction::SlashCommand(command) = envelope.interaction else {
            panic!("expected slash command");
        };
        assert_eq!(command.command, "/dashboards");
        assert_eq!(command.trigger_id.as_deref(), Some("trig-1"));
    }

    #[test]
    fn control_frames_carry_no_envelope() {
        let raw = json!({"type": "hello", "num_connections": 1}).to_string();
        assert_eq!(parse_socket_frame(&raw), Ok(SocketFrame::Hello));

        let raw = json!({"type": "disconnect", "reason": "refresh_requested"}).to_string();
        assert_eq!(
            parse_socket_frame(&raw),
            Ok(SocketFrame::Disconnect { reason: "refresh_requested".to_owned() })
        );
    }

    #[test]
    fn garbage_frames_fail_fast() {
        assert!(matches!(parse_socket_frame("not json"), Err(EnvelopeError::Json(_))));
        let raw = json!({"type": "slash_commands", "payload": {}}).to_string();
        assert_eq!(parse_socket_frame(&raw), Err(EnvelopeError::MissingField("envelope_id")));
    }

    #[test]
    fn undecodable_payloads_keep_their_envelope_id() {
        let raw = json!({
            "envelope_id": "env-bad",
            "type": "slash_commands",
            "payload": {"command": " ", "user_id": "U1", "channel_id": "C1"}
        })
        .to_string();

        assert_eq!(
            parse_socket_frame(&raw),
            Ok(SocketFrame::Rejected {
                envelope_id: "env-bad".to_owned(),
                error: EnvelopeError::MissingField("command"),
            })
        );
    }

    #[test]
    fn block_action_reads_first_action_and_channel() {
        let interaction = interactive_from_json(&json!({
            "type": "block_actions",
            "user": {"id": "U7"},
            "channel": {"id": "C9"},
            "trigger_id": "trig-9",
            "actions": [{"action_id": "find_dashboard", "value": "go"}]
        }))
        .expect("parse");

        let Interaction::BlockAction(action) = interaction else {
            panic!("expected block action");
        };
        assert_eq!(action.action_id, "find_dashboard");
        assert_eq!(action.reply_channel(), "C9");
        assert_eq!(action.trigger_id.as_deref(), Some("trig-9"));
    }

    #[test]
    fn block_action_without_channel_replies_to_user() {
        let interaction = interactive_from_json(&json!({
            "type": "block_actions",
            "user": {"id": "U7"},
            "actions": [{"action_id": "got_it"}]
        }))
        .expect("parse");

        let Interaction::BlockAction(action) = interaction else {
            panic!("expected block action");
        };
        assert_eq!(action.reply_channel(), "U7");
    }

    #[test]
    fn block_action_without_actions_is_rejected() {
        let error = interactive_from_json(&json!({
            "type": "block_actions",
            "user": {"id": "U7"},
            "actions": []
        }))
        .expect_err("empty actions");
        assert_eq!(error, EnvelopeError::MissingField("actions"));
    }

    #[test]
    fn view_submission_flattens_state_values() {
        let interaction = interactive_from_json(&json!({
            "type": "view_submission",
            "user": {"id": "U3"},
            "view": {
                "callback_id": "data_platform_request_form",
                "state": {"values": {
                    "name_input": {"name": {"type": "plain_text_input", "value": "Ada"}},
                    "priority_input": {"priority": {
                        "type": "static_select",
                        "selected_option": {"value": "high", "text": {"type": "plain_text", "text": "High"}}
                    }},
                    "completion_date_input": {"completion_date": {
                        "type": "datepicker", "selected_date": "2024-07-01"
                    }},
                    "other_description_input": {"other_description": {
                        "type": "plain_text_input", "value": null
                    }}
                }}
            }
        }))
        .expect("parse");

        let Interaction::ViewSubmission(submission) = interaction else {
            panic!("expected view submission");
        };
        assert_eq!(submission.callback_id, "data_platform_request_form");
        assert_eq!(submission.values.get("name"), Some("Ada"));
        assert_eq!(submission.values.get("priority"), Some("high"));
        assert_eq!(submission.values.get("completion_date"), Some("2024-07-01"));
        assert_eq!(submission.values.get("other_description"), None);
        assert_eq!(submission.values.len(), 3);
    }

    #[test]
    fn slash_command_form_fields_require_user_and_channel() {
        let mut fields = HashMap::new();
        fields.insert("command".to_owned(), "/hi".to_owned());
        fields.insert("user_id".to_owned(), "U1".to_owned());

        assert_eq!(
            slash_command_from_fields(&fields),
            Err(EnvelopeError::MissingField("channel_id"))
        );

        fields.insert("channel_id".to_owned(), "C1".to_owned());
        assert!(matches!(
            slash_command_from_fields(&fields),
            Ok(Interaction::SlashCommand(command))
                if command.command == "/hi" && command.trigger_id.is_none()
        ));
    }

    #[test]
    fn bot_messages_are_not_echoed() {
        let interaction = event_from_json(&json!({
            "type": "event_callback",
            "event": {"type": "message", "bot_id": "B1", "text": "You said: hi", "channel": "C1"}
        }))
        .expect("parse");
        assert!(matches!(interaction, Interaction::Unsupported { .. }));

        let interaction = event_from_json(&json!({
            "type": "event_callback",
            "event": {"type": "message", "user": "U1", "text": "hello", "channel": "D1"}
        }))
        .expect("parse");
        assert!(matches!(
            interaction,
            Interaction::Message(ref message) if message.text == "hello"
        ));
    }

    #[test]
    fn app_home_opened_carries_user() {
        let interaction = event_from_json(&json!({
            "event": {"type": "app_home_opened", "user": "U5", "tab": "home"}
        }))
        .expect("parse");
        assert_eq!(interaction, Interaction::AppHomeOpened { user_id: "U5".to_owned() });
        assert_eq!(interaction.user_id(), Some("U5"));
    }
}
