use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use cotation_core::rates::{RateTables, TableSummary};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    tables: Vec<TableSummary>,
    current_year: i32,
    export_format: &'static str,
}

impl HealthState {
    pub fn new(tables: &RateTables, current_year: i32, produces_pdf: bool) -> Self {
        Self {
            tables: tables.summary(),
            current_year,
            export_format: if produces_pdf { "pdf" } else { "html" },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub rate_tables: HealthCheck,
    pub tables: Vec<TableSummary>,
    pub current_year: i32,
    pub export_format: &'static str,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let empty: Vec<&str> = state
        .tables
        .iter()
        .filter(|summary| summary.keys == 0)
        .map(|summary| summary.product.id())
        .collect();
    let ready = empty.is_empty();

    let rate_tables = if ready {
        HealthCheck {
            status: "ready",
            detail: format!("{} rate tables loaded", state.tables.len()),
        }
    } else {
        HealthCheck {
            status: "degraded",
            detail: format!("empty rate tables: {}", empty.join(", ")),
        }
    };

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "cotation-server runtime initialized".to_string(),
        },
        rate_tables,
        tables: state.tables,
        current_year: state.current_year,
        export_format: state.export_format,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
