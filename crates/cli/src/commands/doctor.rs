use datadada_core::catalog::{CatalogKind, CatalogSource, HttpCatalogSource};
use datadada_core::config::{AppConfig, LoadOptions, SlackMode};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

const CATALOG_CHECKS: [(&str, CatalogKind); 2] = [
    ("dashboards_catalog", CatalogKind::Dashboards),
    ("data_sources_catalog", CatalogKind::DataSources),
];

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_transport(&config));
            checks.extend(check_catalogs(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("slack_transport"));
            for (name, _) in CATALOG_CHECKS {
                checks.push(skipped(name));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn check_slack_transport(config: &AppConfig) -> DoctorCheck {
    let details = match config.slack.mode {
        SlackMode::Socket => "socket mode; bot and app tokens validated by config contract",
        SlackMode::Http => "http events mode; requests verified with the signing secret",
    };
    DoctorCheck { name: "slack_transport", status: CheckStatus::Pass, details: details.to_string() }
}

/// Fetches each list once, the same way a slash command would.
fn check_catalogs(config: &AppConfig) -> Vec<DoctorCheck> {
    let fail_all = |details: String| -> Vec<DoctorCheck> {
        CATALOG_CHECKS
            .into_iter()
            .map(|(name, _)| DoctorCheck {
                name,
                status: CheckStatus::Fail,
                details: details.clone(),
            })
            .collect()
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return fail_all(format!("failed to initialize async runtime: {error}")),
    };
    let source = match HttpCatalogSource::new(config.catalog.clone()) {
        Ok(source) => source,
        Err(error) => return fail_all(format!("failed to build http client: {error}")),
    };

    runtime.block_on(async {
        let mut checks = Vec::with_capacity(CATALOG_CHECKS.len());
        for (name, kind) in CATALOG_CHECKS {
            let check = match source.fetch_records(kind).await {
                Ok(records) => DoctorCheck {
                    name,
                    status: CheckStatus::Pass,
                    details: format!("{} {} available", records.len(), kind.noun()),
                },
                Err(error) => {
                    DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() }
                }
            };
            checks.push(check);
        }
        checks
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
