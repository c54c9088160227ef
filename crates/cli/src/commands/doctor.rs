use cotation_core::config::{AppConfig, LoadOptions};
use cotation_core::rates::RateTables;
use serde::Serialize;

use crate::commands::CommandResult;

const EXIT_FAILED: u8 = 1;

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

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_FAILED };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let tables = check_rate_tables(&config);
            checks.push(tables.0);
            checks.push(check_age_ranges(tables.1.as_ref()));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("rate_tables"));
            checks.push(skipped("age_ranges"));
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

fn check_rate_tables(config: &AppConfig) -> (DoctorCheck, Option<RateTables>) {
    match RateTables::load_dir(&config.tables.dir) {
        Ok(tables) => {
            let check = DoctorCheck {
                name: "rate_tables",
                status: CheckStatus::Pass,
                details: format!("rate tables loaded from `{}`", config.tables.dir.display()),
            };
            (check, Some(tables))
        }
        Err(error) => {
            let check = DoctorCheck {
                name: "rate_tables",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
            (check, None)
        }
    }
}

fn check_age_ranges(tables: Option<&RateTables>) -> DoctorCheck {
    let Some(tables) = tables else {
        return DoctorCheck {
            name: "age_ranges",
            status: CheckStatus::Skipped,
            details: "skipped because rate tables did not load".to_string(),
        };
    };

    let mut ranges = Vec::new();
    for summary in tables.summary() {
        match (summary.product.is_age_rated(), summary.age_range) {
            (true, Some(range)) => {
                ranges.push(format!("{} {}..={}", summary.product, range.min, range.max));
            }
            (true, None) => {
                return DoctorCheck {
                    name: "age_ranges",
                    status: CheckStatus::Fail,
                    details: format!("no age range could be derived for {}", summary.product),
                };
            }
            (false, _) => {}
        }
    }

    DoctorCheck { name: "age_ranges", status: CheckStatus::Pass, details: ranges.join(", ") }
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
