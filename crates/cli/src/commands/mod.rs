pub mod config;
pub mod doctor;
pub mod lookup;

use serde::Serialize;

pub const EXIT_RUNTIME: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_CATALOG: u8 = 3;

/// Text printed to stdout plus the process exit code. Machine-readable
/// outcomes are one JSON object on the last line.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    message: String,
}

impl CommandResult {
    /// Human lines first, then the outcome with the number of lines listed.
    pub fn listing(command: &str, lines: Vec<String>, message: impl Into<String>) -> Self {
        let outcome = CommandOutcome {
            command,
            status: "ok",
            error_class: None,
            count: Some(lines.len()),
            message: message.into(),
        };
        let mut output = lines;
        output.push(outcome.to_json());
        Self { exit_code: 0, output: output.join("\n") }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let outcome = CommandOutcome {
            command,
            status: "error",
            error_class: Some(error_class),
            count: None,
            message: message.into(),
        };
        Self { exit_code, output: outcome.to_json() }
    }
}

impl CommandOutcome<'_> {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|error| {
            format!(
                "{{\"command\":\"{}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
                escape_json(self.command),
                escape_json(&error.to_string())
            )
        })
    }
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
