use datadada_core::catalog::{format_records, CatalogKind, CatalogSource, HttpCatalogSource};
use datadada_core::config::{AppConfig, LoadOptions};
use datadada_core::errors::ApplicationError;

use crate::commands::{CommandResult, EXIT_CATALOG, EXIT_CONFIG, EXIT_RUNTIME};

const COMMAND: &str = "lookup";

/// Fetches one list the way the bot does and prints the same numbered lines.
pub fn run(kind: CatalogKind) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        }
    };
    let source = match HttpCatalogSource::new(config.catalog) {
        Ok(source) => source,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "http_client",
                format!("failed to build http client: {error}"),
                EXIT_RUNTIME,
            )
        }
    };

    match runtime.block_on(source.fetch_records(kind)) {
        Ok(records) => CommandResult::listing(
            COMMAND,
            format_records(&records),
            format!("{} {}", records.len(), kind.noun()),
        ),
        Err(error) => {
            let error = ApplicationError::from(error);
            CommandResult::failure(COMMAND, error.error_class(), error.to_string(), EXIT_CATALOG)
        }
    }
}
