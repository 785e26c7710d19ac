use thiserror::Error;

use crate::catalog::CatalogError;
use crate::request_form::FormError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Form(#[from] FormError),
}

impl ApplicationError {
    /// Stable label for log fields.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Catalog(CatalogError::Fetch { .. }) => "catalog_fetch",
            Self::Catalog(CatalogError::Schema { .. }) => "catalog_schema",
            Self::Form(_) => "form",
        }
    }

    /// Text that is safe to show in Slack. Catalog failures use the static
    /// apology of the list that was requested.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Catalog(error) => error.kind().apology(),
            other => InterfaceError::from(other.clone()).user_message(),
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "Some of the request details could not be read. Please check the form and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "Data Dada cannot reach a service right now. Please try again shortly."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Form(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Catalog(error) => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
        }
    }
}
