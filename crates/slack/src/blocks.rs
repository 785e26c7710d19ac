use datadada_core::catalog::{format_records, CatalogKind, ListRecord};
use datadada_core::request_form::{FieldKind, FormField, FormSchema, RequestSummary};
use serde::Serialize;

/// Slack rejects section text longer than this.
pub const SECTION_TEXT_LIMIT: usize = 3000;

pub const FIND_DASHBOARD_ACTION: &str = "find_dashboard";
pub const FIND_DATA_SOURCE_ACTION: &str = "find_data_source";
pub const NEED_HELP_DASHBOARD_ACTION: &str = "need_help_dashboard";
pub const FOUND_DASHBOARD_ACTION: &str = "found_dashboard";
pub const GOT_IT_ACTION: &str = "got_it";
pub const HELP_BUTTON_ACTION: &str = "help_button";
pub const GO_TO_FAQS_ACTION: &str = "go_to_faqs";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "button")]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            url: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Link buttons open the url in the browser and still emit an action.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionObject {
    pub text: TextObject,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    PlainTextInput {
        action_id: String,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
    StaticSelect {
        action_id: String,
        options: Vec<OptionObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
    Datepicker {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Divider { block_id: String },
    Input { block_id: String, label: TextObject, element: InputElement, optional: bool },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn divider(mut self, block_id: impl Into<String>) -> Self {
        self.blocks.push(Block::Divider { block_id: block_id.into() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "modal")]
pub struct ModalView {
    pub callback_id: String,
    pub title: TextObject,
    pub submit: TextObject,
    pub blocks: Vec<Block>,
}

/// Packs lines into chunks that each fit in one section block. A line longer
/// than `limit` is split at char boundaries and its pieces start new chunks.
pub fn chunk_lines(lines: &[String], limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in lines {
        for (index, piece) in split_at_limit(line, limit).into_iter().enumerate() {
            let needed =
                if current.is_empty() { piece.len() } else { current.len() + 1 + piece.len() };
            if !current.is_empty() && (index > 0 || needed > limit) {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(piece);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_at_limit(value: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = value;

    while rest.len() > limit {
        let mut end = limit;
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(end);
        pieces.push(head);
        rest = tail;
    }
    pieces.push(rest);
    pieces
}

pub fn greeting_message(user_id: &str, data_sources_url: &str) -> MessageTemplate {
    let intro = format!(
        "Hi, <@{user_id}>, welcome to the Data Support, I am Data Dada. \
         Are you trying to do any of the following?"
    );

    MessageBuilder::new(intro.clone())
        .section("greeting.intro.v1", |section| {
            section.mrkdwn(intro);
        })
        .actions("greeting.actions.v1", |actions| {
            actions
                .button(ButtonElement::new(FIND_DASHBOARD_ACTION, "Find a Dashboard"))
                .button(
                    ButtonElement::new(FIND_DATA_SOURCE_ACTION, "Find a Data Source")
                        .url(data_sources_url),
                )
                .button(
                    ButtonElement::new(HELP_BUTTON_ACTION, "Request Help")
                        .style(ButtonStyle::Primary),
                );
        })
        .divider("greeting.divider.v1")
        .build()
}

/// The numbered list reply for a catalog lookup.
pub fn catalog_listing(
    kind: CatalogKind,
    user_id: &str,
    records: &[ListRecord],
) -> MessageTemplate {
    let header = format!("Here <@{user_id}> is the list of currently available {}:", kind.noun());
    let lines = format_records(records);

    if lines.is_empty() {
        let empty = format!("There are no {} available right now.", kind.noun());
        return MessageBuilder::new(empty.clone())
            .section("catalog.empty.v1", |section| {
                section.mrkdwn(empty);
            })
            .build();
    }

    let mut all_lines = Vec::with_capacity(lines.len() + 1);
    all_lines.push(header.clone());
    all_lines.extend(lines);

    let mut builder = MessageBuilder::new(header);
    for (index, chunk) in chunk_lines(&all_lines, SECTION_TEXT_LIMIT).into_iter().enumerate() {
        builder = builder.section(format!("catalog.list.{}.v1", index + 1), |section| {
            section.mrkdwn(chunk);
        });
    }
    builder.build()
}

pub fn dashboard_follow_up_message() -> MessageTemplate {
    MessageBuilder::new("Did you find the dashboard you were looking for?")
        .section("dashboard.follow_up.prompt.v1", |section| {
            section.mrkdwn("Did you find the dashboard you were looking for?");
        })
        .actions("dashboard.follow_up.actions.v1", |actions| {
            actions
                .button(
                    ButtonElement::new(FOUND_DASHBOARD_ACTION, "Yes, found it")
                        .style(ButtonStyle::Primary),
                )
                .button(ButtonElement::new(NEED_HELP_DASHBOARD_ACTION, "No, I need help"));
        })
        .build()
}

pub fn faq_pointer_message(faqs_url: &str) -> MessageTemplate {
    let text = format!(
        "It seems you didn't find what you were looking for. Please check our FAQs here: {faqs_url}"
    );

    MessageBuilder::new(text.clone())
        .section("faq.pointer.v1", |section| {
            section.mrkdwn(text);
        })
        .actions("faq.pointer.actions.v1", |actions| {
            actions
                .button(ButtonElement::new(GO_TO_FAQS_ACTION, "Go to FAQs").url(faqs_url))
                .button(ButtonElement::new(HELP_BUTTON_ACTION, "Request Help"))
                .button(ButtonElement::new(GOT_IT_ACTION, "Got it"));
        })
        .build()
}

pub fn faq_link_message(faqs_url: &str) -> MessageTemplate {
    plain_reply("faq.link.v1", format!("Here are our FAQs: <{faqs_url}|Data Support FAQs>"))
}

pub fn found_dashboard_message() -> MessageTemplate {
    plain_reply("dashboard.found.v1", "Great to hear! Let me know if you need anything else.")
}

pub fn got_it_message() -> MessageTemplate {
    plain_reply("ack.got_it.v1", "Glad I could help! Reach out any time with /hi.")
}

pub fn request_form_prompt(user_id: &str) -> MessageTemplate {
    plain_reply(
        "request.prompt.v1",
        format!(
            "Hi <@{user_id}>! Please fill out the form below to help us understand your data \
             request."
        ),
    )
}

/// Descriptions may be as long as a whole section, so the summary spans as
/// many sections as it needs.
pub fn request_summary_message(summary: &RequestSummary) -> MessageTemplate {
    let lines: Vec<String> = summary.mrkdwn.lines().map(str::to_owned).collect();

    let mut builder = MessageBuilder::new(summary.plain_text.clone());
    for (index, chunk) in chunk_lines(&lines, SECTION_TEXT_LIMIT).into_iter().enumerate() {
        builder = builder.section(format!("request.summary.{}.v1", index + 1), |section| {
            section.mrkdwn(chunk);
        });
    }
    builder.build()
}

pub fn echo_message(text: &str) -> MessageTemplate {
    let reply = format!("You said: {text}");
    MessageBuilder::new(reply.clone())
        .section("echo.v1", |section| {
            section.plain(reply);
        })
        .build()
}

pub fn apology_message(text: &str) -> MessageTemplate {
    plain_reply("error.apology.v1", text)
}

fn plain_reply(block_id: &str, text: impl Into<String>) -> MessageTemplate {
    let text = text.into();
    MessageBuilder::new(text.clone())
        .section(block_id, |section| {
            section.mrkdwn(text);
        })
        .build()
}

/// Renders the form schema as a Slack modal.
pub fn request_form_modal(schema: &FormSchema) -> ModalView {
    ModalView {
        callback_id: schema.callback_id.to_owned(),
        title: TextObject::plain(schema.title),
        submit: TextObject::plain(schema.submit_label),
        blocks: schema.fields.iter().map(input_block).collect(),
    }
}

fn input_block(field: &FormField) -> Block {
    let placeholder = field.placeholder.map(TextObject::plain);
    let action_id = field.id.to_owned();

    let element = match field.kind {
        FieldKind::Text => {
            InputElement::PlainTextInput { action_id, multiline: false, placeholder }
        }
        FieldKind::MultilineText => {
            InputElement::PlainTextInput { action_id, multiline: true, placeholder }
        }
        FieldKind::SingleSelect => InputElement::StaticSelect {
            action_id,
            options: field
                .options
                .iter()
                .map(|option| OptionObject {
                    text: TextObject::plain(option.label),
                    value: option.value.to_owned(),
                })
                .collect(),
            placeholder,
        },
        FieldKind::Date => InputElement::Datepicker { action_id, placeholder },
    };

    Block::Input {
        block_id: field.block_id.to_owned(),
        label: TextObject::plain(field.label),
        element,
        optional: !field.required,
    }
}
