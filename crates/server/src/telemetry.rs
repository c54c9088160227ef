use cotation_core::audit::{AuditRecord, AuditSink};
use cotation_core::config::{AppConfig, LogFormat};
use tracing::Level;

pub fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

/// Forwards audit records to `tracing`, failures at warn level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        let details = serde_json::to_string(&record.event).unwrap_or_default();
        if record.event.is_failure() {
            tracing::warn!(
                event_name = record.event.name(),
                correlation_id = %record.correlation_id,
                session_id = %record.session_id,
                record_id = %record.record_id,
                occurred_at = %record.occurred_at,
                details = %details,
                "audit record"
            );
        } else {
            tracing::info!(
                event_name = record.event.name(),
                correlation_id = %record.correlation_id,
                session_id = %record.session_id,
                record_id = %record.record_id,
                occurred_at = %record.occurred_at,
                details = %details,
                "audit record"
            );
        }
    }
}
