pub mod catalog;
pub mod config;
pub mod errors;
pub mod request_form;

pub use catalog::{
    format_record, format_records, CatalogError, CatalogKind, CatalogSource, HttpCatalogSource,
    ListRecord,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, SlackMode};
pub use errors::{ApplicationError, InterfaceError};
pub use request_form::{
    data_platform_request_form, DataPlatformRequest, FormError, FormSchema, RequestSummary,
    SubmittedForm,
};
