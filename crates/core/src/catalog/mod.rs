//! Remote catalog lists (dashboards and data sources).
//!
//! A catalog is a JSON document holding one top-level array of records. The
//! bot fetches it on every lookup and renders one line per record; nothing is
//! cached between invocations.

pub mod source;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use source::{extract_records, CatalogSource, HttpCatalogSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Dashboards,
    DataSources,
}

impl CatalogKind {
    /// Top-level JSON field that must hold the record array.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Dashboards => "dashboards",
            Self::DataSources => "data_sources",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            Self::Dashboards => "dashboards",
            Self::DataSources => "data sources",
        }
    }

    pub fn apology(self) -> &'static str {
        match self {
            Self::Dashboards => {
                "Sorry, I could not fetch the dashboards at the moment. Please try again later."
            }
            Self::DataSources => {
                "Sorry, I could not fetch the data sources at the moment. Please try again later."
            }
        }
    }
}

impl std::str::FromStr for CatalogKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dashboards" | "dashboard" => Ok(Self::Dashboards),
            "data_sources" | "data-sources" | "datasources" => Ok(Self::DataSources),
            other => Err(format!("unknown catalog `{other}` (expected dashboards|data-sources)")),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("fetching {} failed: {message}", .kind.field_name())]
    Fetch { kind: CatalogKind, message: String },
    #[error("{} response did not match the expected shape: {reason}", .kind.field_name())]
    Schema { kind: CatalogKind, reason: String },
}

impl CatalogError {
    pub fn kind(&self) -> CatalogKind {
        match self {
            Self::Fetch { kind, .. } | Self::Schema { kind, .. } => *kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRecord {
    pub title: String,
    pub url: Option<String>,
    pub description: String,
}

impl ListRecord {
    /// Lenient conversion: missing or non-string fields render empty.
    pub fn from_value(value: &Value) -> Self {
        let url = string_field(value, "url").trim();

        Self {
            title: string_field(value, "title").to_owned(),
            url: (!url.is_empty()).then(|| url.to_owned()),
            description: string_field(value, "description").to_owned(),
        }
    }
}

fn string_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub fn format_record(index: usize, record: &ListRecord) -> String {
    let title = match &record.url {
        Some(url) => format!("<{url}|{}>", record.title),
        None => record.title.clone(),
    };
    format!("{index}. {title} {}", record.description)
}

/// One line per record, numbered from 1 in input order.
pub fn format_records(records: &[ListRecord]) -> Vec<String> {
    records.iter().enumerate().map(|(offset, record)| format_record(offset + 1, record)).collect()
}
