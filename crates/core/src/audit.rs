//! Conversation audit trail.
//!
//! The engine and the transports describe what happened to a session with a
//! typed [`AuditRecord`]; a sink decides where records go (tracing in the
//! server, memory in tests).

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::product::Product;
use crate::flows::engine::TurnTransition;
use crate::flows::states::StepKind;

/// Identity shared by every record produced while handling one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditContext {
    pub session_id: String,
    pub correlation_id: String,
}

impl AuditContext {
    pub fn new(session_id: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), correlation_id: correlation_id.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    MessageReceived { chars: usize },
    TurnHandled { turn: u64, from: StepKind, to: StepKind, transition: TurnTransition },
    QuoteComputed { product: Product },
    ExportRequested { product: Product },
    ExportRendered { product: Product, export_id: String, content_type: String },
    ExportFailed { product: Product, error: String },
}

impl AuditEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageReceived { .. } => "ingress.message_received",
            Self::TurnHandled { .. } => "conversation.turn_handled",
            Self::QuoteComputed { .. } => "pricing.quote_computed",
            Self::ExportRequested { .. } => "export.requested",
            Self::ExportRendered { .. } => "export.rendered",
            Self::ExportFailed { .. } => "export.render_failed",
        }
    }

    /// Terminated flows and failed renders; everything else is routine.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::TurnHandled { transition: TurnTransition::Terminated { .. }, .. }
                | Self::ExportFailed { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub record_id: Uuid,
    pub session_id: String,
    pub correlation_id: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditRecord {
    pub fn new(context: &AuditContext, event: AuditEvent) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            session_id: context.session_id.clone(),
            correlation_id: context.correlation_id.clone(),
            occurred_at: Utc::now(),
            event,
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.records().iter().map(|record| record.event.name()).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}
