//! The data platform request form.
//!
//! The schema is a static, ordered list of labeled inputs. Rendering it as a
//! modal belongs to the Slack crate; this module owns the field definitions
//! and the mapping from a submitted field-value set back to a typed request.

pub mod submission;

pub use submission::{DataPlatformRequest, FormError, RequestSummary, RequestType, SubmittedForm};

pub const CALLBACK_ID: &str = "data_platform_request_form";

/// Field ids, shared by the schema and the submission parser.
pub mod field {
    pub const NAME: &str = "name";
    pub const ROLE: &str = "role";
    pub const REQUEST_TYPE: &str = "request_type";
    pub const GEO_SPECIFIC: &str = "geo_specific";
    pub const DESCRIPTION: &str = "description";
    pub const PRIORITY: &str = "priority";
    pub const COMPLETION_DATE: &str = "completion_date";
    pub const DASHBOARD_OR_DATASOURCE: &str = "dashboard_or_datasource";
    pub const OTHER_DESCRIPTION: &str = "other_description";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    MultilineText,
    SingleSelect,
    Date,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormField {
    pub id: &'static str,
    pub block_id: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub options: &'static [SelectOption],
    pub placeholder: Option<&'static str>,
    pub required: bool,
}

impl FormField {
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormSchema {
    pub callback_id: &'static str,
    pub title: &'static str,
    pub submit_label: &'static str,
    pub fields: &'static [FormField],
}

impl FormSchema {
    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.id)
    }
}

const REQUEST_TYPE_OPTIONS: &[SelectOption] = &[
    SelectOption { value: "one_off", label: "Dashboard (One-Off)" },
    SelectOption { value: "required_regularly", label: "Data Source (Required Regularly)" },
    SelectOption { value: "existing_info", label: "Other" },
];

const GEO_OPTIONS: &[SelectOption] = &[
    SelectOption { value: "india", label: "India" },
    SelectOption { value: "south_africa", label: "South Africa" },
    SelectOption { value: "kenya", label: "Kenya" },
    SelectOption { value: "tanzania", label: "Tanzania" },
    SelectOption { value: "nigeria", label: "Nigeria" },
    SelectOption { value: "ethiopia", label: "Ethiopia" },
    SelectOption { value: "global", label: "Global" },
];

const PRIORITY_OPTIONS: &[SelectOption] = &[
    SelectOption { value: "high", label: "High" },
    SelectOption { value: "medium", label: "Medium" },
    SelectOption { value: "low", label: "Low" },
];

const LINKAGE_OPTIONS: &[SelectOption] = &[
    SelectOption { value: "existing_dashboard", label: "Linked to existing dashboard" },
    SelectOption { value: "new_dashboard", label: "New dashboard" },
    SelectOption { value: "existing_datasource", label: "Linked to existing data source" },
    SelectOption { value: "new_datasource", label: "New data source" },
];

const fn input(
    id: &'static str,
    block_id: &'static str,
    label: &'static str,
    kind: FieldKind,
) -> FormField {
    FormField { id, block_id, label, kind, options: &[], placeholder: None, required: true }
}

const fn select(
    id: &'static str,
    block_id: &'static str,
    label: &'static str,
    options: &'static [SelectOption],
) -> FormField {
    FormField {
        id,
        block_id,
        label,
        kind: FieldKind::SingleSelect,
        options,
        placeholder: None,
        required: true,
    }
}

const FIELDS: &[FormField] = &[
    input(field::NAME, "name_input", "Name", FieldKind::Text),
    input(field::ROLE, "role_input", "Role", FieldKind::Text),
    select(field::REQUEST_TYPE, "request_type_input", "Request Type", REQUEST_TYPE_OPTIONS),
    select(field::GEO_SPECIFIC, "geo_specific_input", "Is this geo-specific?", GEO_OPTIONS),
    input(
        field::DESCRIPTION,
        "description_input",
        "Description (Required)",
        FieldKind::MultilineText,
    ),
    select(field::PRIORITY, "priority_input", "Priority Level", PRIORITY_OPTIONS),
    FormField {
        placeholder: Some("Select a date"),
        ..input(
            field::COMPLETION_DATE,
            "completion_date_input",
            "Desired Completion Date",
            FieldKind::Date,
        )
    },
    select(
        field::DASHBOARD_OR_DATASOURCE,
        "dashboard_or_datasource_input",
        "Is this request linked to an existing or new dashboard/data source?",
        LINKAGE_OPTIONS,
    ),
    FormField {
        placeholder: Some("Please explain what this request is for."),
        required: false,
        ..input(
            field::OTHER_DESCRIPTION,
            "other_description_input",
            "If it is other (Please explain)",
            FieldKind::MultilineText,
        )
    },
];

pub const DATA_PLATFORM_REQUEST_FORM: FormSchema = FormSchema {
    callback_id: CALLBACK_ID,
    title: "Data Platform Request",
    submit_label: "Submit",
    fields: FIELDS,
};

pub fn data_platform_request_form() -> &'static FormSchema {
    &DATA_PLATFORM_REQUEST_FORM
}
