//! HTTP chat transport.
//!
//! - `POST /v1/sessions/{session_id}/messages` runs one conversation turn
//! - `GET  /v1/exports/{export_id}` downloads a rendered recap, once

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cotation_core::audit::{AuditContext, AuditEvent, AuditRecord, AuditSink};
use cotation_core::flows::messages;
use cotation_core::flows::sessions::lock;
use cotation_core::recap::{RecapRenderer, RenderedDocument};
use cotation_core::{ApplicationError, DomainError, InterfaceError, QuoteEngine, SessionStore};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

const MAX_SESSION_ID_LEN: usize = 128;
const HOUSEKEEPING_PERIOD: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ChatState {
    pub engine: QuoteEngine,
    pub sessions: Arc<SessionStore>,
    pub exports: Arc<ExportStore>,
    pub renderer: Arc<dyn RecapRenderer>,
    pub audit: Arc<dyn AuditSink>,
}

struct PendingExport {
    document: RenderedDocument,
    created_at: Instant,
}

/// Rendered recaps waiting to be downloaded. Each document is handed out once,
/// expires after the retention period, and the oldest is dropped when the
/// store is full.
pub struct ExportStore {
    documents: Mutex<HashMap<String, PendingExport>>,
    retention: Duration,
    capacity: usize,
}

impl ExportStore {
    pub fn new(retention: Duration, capacity: usize) -> Self {
        Self { documents: Mutex::new(HashMap::new()), retention, capacity: capacity.max(1) }
    }

    pub fn insert(&self, document: RenderedDocument) -> String {
        self.insert_at(document, Instant::now())
    }

    fn insert_at(&self, document: RenderedDocument, now: Instant) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let mut documents = lock(&self.documents);
        documents.retain(|_, pending| !self.is_expired(pending, now));
        while documents.len() >= self.capacity {
            let oldest = documents
                .iter()
                .min_by_key(|(_, pending)| pending.created_at)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(oldest) => documents.remove(&oldest),
                None => break,
            };
        }
        documents.insert(id.clone(), PendingExport { document, created_at: now });
        id
    }

    pub fn take(&self, id: &str) -> Option<RenderedDocument> {
        let now = Instant::now();
        let pending = lock(&self.documents).remove(id)?;
        (!self.is_expired(&pending, now)).then_some(pending.document)
    }

    /// Drops expired exports. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut documents = lock(&self.documents);
        let before = documents.len();
        documents.retain(|_, pending| !self.is_expired(pending, now));
        before - documents.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.documents).len()
    }

    fn is_expired(&self, pending: &PendingExport, now: Instant) -> bool {
        now.saturating_duration_since(pending.created_at) >= self.retention
    }
}

/// Periodically evicts idle sessions and expired exports.
pub fn spawn_housekeeping(
    sessions: Arc<SessionStore>,
    exports: Arc<ExportStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HOUSEKEEPING_PERIOD);
        loop {
            ticker.tick().await;
            let now = Instant::now();
            let sessions_evicted = sessions.evict_idle(now);
            let exports_expired = exports.sweep(now);
            if sessions_evicted > 0 || exports_expired > 0 {
                info!(
                    event_name = "system.housekeeping",
                    correlation_id = "housekeeping",
                    sessions_evicted,
                    exports_expired,
                    "evicted idle state"
                );
            }
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub session_id: String,
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportLink>,
}

#[derive(Debug, Serialize)]
pub struct ExportLink {
    pub id: String,
    pub download_url: String,
    pub content_type: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message().to_owned(),
            correlation_id: self.0.correlation_id().to_owned(),
        };
        (status, Json(body)).into_response()
    }
}

fn reject(error: impl Into<ApplicationError>, correlation_id: &str) -> ApiError {
    ApiError(error.into().into_interface(correlation_id))
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/v1/sessions/{session_id}/messages", post(post_message))
        .route("/v1/exports/{export_id}", get(download_export))
        .with_state(state)
}

fn validate_session_id(session_id: &str) -> Result<(), DomainError> {
    let valid_chars = session_id
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.'));
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN || !valid_chars {
        return Err(DomainError::InvalidSessionId(session_id.to_owned()));
    }
    Ok(())
}

async fn post_message(
    Path(session_id): Path<String>,
    State(state): State<ChatState>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    validate_session_id(&session_id).map_err(|error| reject(error, &correlation_id))?;
    if body.text.trim().is_empty() {
        return Err(reject(DomainError::EmptyMessage, &correlation_id));
    }

    let audit = AuditContext::new(session_id.clone(), correlation_id.clone());
    state.audit.record(AuditRecord::new(
        &audit,
        AuditEvent::MessageReceived { chars: body.text.chars().count() },
    ));

    let output = {
        let session = state.sessions.session(&session_id);
        let mut session = lock(&session);
        state.engine.handle_turn_with_audit(&mut session, &body.text, state.audit.as_ref(), &audit)
    };

    let mut replies = output.messages;
    let mut export = None;
    if let Some(recap) = output.export {
        match state.renderer.render(&recap).await {
            Ok(document) => {
                let content_type = document.content_type.clone();
                let file_name = document.file_name.clone();
                let id = state.exports.insert(document);
                state.audit.record(AuditRecord::new(
                    &audit,
                    AuditEvent::ExportRendered {
                        product: recap.product,
                        export_id: id.clone(),
                        content_type: content_type.clone(),
                    },
                ));
                export = Some(ExportLink {
                    download_url: format!("/v1/exports/{id}"),
                    id,
                    content_type,
                    file_name,
                });
            }
            Err(render_error) => {
                error!(
                    event_name = "export.render_failed",
                    correlation_id = %correlation_id,
                    session_id = %session_id,
                    error = %render_error,
                    "recap rendering failed"
                );
                state.audit.record(AuditRecord::new(
                    &audit,
                    AuditEvent::ExportFailed {
                        product: recap.product,
                        error: render_error.to_string(),
                    },
                ));
                let session = state.sessions.session(&session_id);
                let rearmed = lock(&session).rearm_export(recap);
                drop(session);
                if !rearmed {
                    state.sessions.release(&session_id);
                    return Err(reject(render_error, &correlation_id));
                }
                replies = vec![messages::EXPORT_FAILED.to_owned()];
            }
        }
    }

    state.sessions.release(&session_id);
    Ok(Json(MessageResponse { session_id, messages: replies, export }))
}

async fn download_export(
    Path(export_id): Path<String>,
    State(state): State<ChatState>,
) -> Result<Response, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let document = state.exports.take(&export_id).ok_or_else(|| {
        reject(ApplicationError::NotFound(format!("export {export_id}")), &correlation_id)
    })?;

    info!(
        event_name = "export.downloaded",
        correlation_id = %correlation_id,
        export_id = %export_id,
        size = document.bytes.len(),
        "recap export downloaded"
    );

    let disposition = format!("attachment; filename=\"{}\"", document.file_name);
    let headers =
        [(header::CONTENT_TYPE, document.content_type), (header::CONTENT_DISPOSITION, disposition)];
    Ok((headers, document.bytes).into_response())
}
