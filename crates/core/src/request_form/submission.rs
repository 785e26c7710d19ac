use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{data_platform_request_form, field, FieldKind};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NO_EXPLANATION: &str = "(none provided)";

/// Submitted values keyed by field id, as read from the modal state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedForm {
    values: BTreeMap<String, String>,
}

impl SubmittedForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field_id: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field_id.into(), value.into());
    }

    pub fn with(mut self, field_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field_id, value);
        self
    }

    /// Trimmed value, `None` when absent or blank.
    pub fn get(&self, field_id: &str) -> Option<&str> {
        self.values.get(field_id).map(|value| value.trim()).filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SubmittedForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("required field `{field}` is missing")]
    MissingField { field: &'static str },
    #[error("field `{field}` does not accept option `{value}`")]
    UnknownOption { field: &'static str, value: String },
    #[error("field `{field}` is not a YYYY-MM-DD date: `{value}`")]
    InvalidDate { field: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    #[serde(rename = "one_off")]
    OneOff,
    #[serde(rename = "required_regularly")]
    RequiredRegularly,
    #[serde(rename = "existing_info")]
    Other,
}

impl RequestType {
    pub fn as_value(self) -> &'static str {
        match self {
            Self::OneOff => "one_off",
            Self::RequiredRegularly => "required_regularly",
            Self::Other => "existing_info",
        }
    }

    fn from_value(value: &str) -> Option<Self> {
        match value {
            "one_off" => Some(Self::OneOff),
            "required_regularly" => Some(Self::RequiredRegularly),
            "existing_info" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPlatformRequest {
    pub name: String,
    pub role: String,
    pub request_type: RequestType,
    pub geo_specific: String,
    pub description: String,
    pub priority: String,
    pub completion_date: NaiveDate,
    pub linkage: String,
    pub explanation: Option<String>,
}

/// Rendered confirmation: plain-text fallback plus the mrkdwn block text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSummary {
    pub plain_text: String,
    pub mrkdwn: String,
}

impl DataPlatformRequest {
    /// Validates every schema field, then builds the typed request.
    pub fn from_submission(form: &SubmittedForm) -> Result<Self, FormError> {
        let schema = data_platform_request_form();
        let mut accepted: BTreeMap<&'static str, String> = BTreeMap::new();

        for form_field in schema.fields {
            let Some(value) = form.get(form_field.id) else {
                if form_field.required {
                    return Err(FormError::MissingField { field: form_field.id });
                }
                continue;
            };

            match form_field.kind {
                FieldKind::SingleSelect if !form_field.has_option(value) => {
                    return Err(FormError::UnknownOption {
                        field: form_field.id,
                        value: value.to_owned(),
                    });
                }
                FieldKind::Date if NaiveDate::parse_from_str(value, DATE_FORMAT).is_err() => {
                    return Err(FormError::InvalidDate {
                        field: form_field.id,
                        value: value.to_owned(),
                    });
                }
                _ => {}
            }
            accepted.insert(form_field.id, value.to_owned());
        }

        let mut take = |id: &'static str| -> Result<String, FormError> {
            accepted.remove(id).ok_or(FormError::MissingField { field: id })
        };

        let request_type_value = take(field::REQUEST_TYPE)?;
        let request_type = RequestType::from_value(&request_type_value).ok_or(
            FormError::UnknownOption { field: field::REQUEST_TYPE, value: request_type_value },
        )?;
        let date_value = take(field::COMPLETION_DATE)?;
        let completion_date =
            NaiveDate::parse_from_str(&date_value, DATE_FORMAT).map_err(|_| {
                FormError::InvalidDate { field: field::COMPLETION_DATE, value: date_value }
            })?;

        Ok(Self {
            name: take(field::NAME)?,
            role: take(field::ROLE)?,
            request_type,
            geo_specific: take(field::GEO_SPECIFIC)?,
            description: take(field::DESCRIPTION)?,
            priority: take(field::PRIORITY)?,
            completion_date,
            linkage: take(field::DASHBOARD_OR_DATASOURCE)?,
            explanation: take(field::OTHER_DESCRIPTION).ok(),
        })
    }

    /// The request-type specific line of the summary.
    pub fn details_line(&self) -> String {
        match self.request_type {
            RequestType::OneOff => {
                format!("Request is linked to an existing dashboard: {}", self.linkage)
            }
            RequestType::RequiredRegularly => {
                format!("Request is linked to an existing data source: {}", self.linkage)
            }
            RequestType::Other => format!(
                "Additional explanation: {}",
                self.explanation.as_deref().unwrap_or(NO_EXPLANATION)
            ),
        }
    }

    pub fn summary(&self, user_id: &str) -> RequestSummary {
        let details = self.details_line();
        let date = self.completion_date.format(DATE_FORMAT);
        let request_type = self.request_type.as_value();

        let plain_text = format!(
            "Your request details are as follows:\n\
             Name: {name}\n\
             Role: {role}\n\
             Request Type: {request_type}\n\
             Request Details: {details}\n\
             Geo-Specific: {geo}\n\
             Description: {description}\n\
             Priority: {priority}\n\
             Desired Completion Date: {date}\n\n\
             Thank you, @{user_id}, someone from the Data team will be in touch shortly to follow up on your request.",
            name = self.name,
            role = self.role,
            geo = self.geo_specific,
            description = self.description,
            priority = self.priority,
        );

        let mrkdwn = format!(
            "Your request details are as follows:\n\n\
             *Name:* {name}\n\
             *Role:* {role}\n\
             *Request Type:* {request_type}\n\
             {details}\n\
             *Geo-Specific:* {geo}\n\
             *Description:* {description}\n\
             *Priority:* {priority}\n\
             *Desired Completion Date:* {date}\n\n\
             _Thank you, <@{user_id}>, someone from the Data team will be in touch shortly to follow up on your request._",
            name = self.name,
            role = self.role,
            geo = self.geo_specific,
            description = self.description,
            priority = self.priority,
        );

        RequestSummary { plain_text, mrkdwn }
    }
}
