//! Admin audit log read handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::audit::{AuditPage, AuditQuery};
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Handle `GET /v1/admin/audit`.
pub async fn list_audit(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditPage>, ApiError> {
    let page = state.audit.query(&query).await?;
    Ok(Json(page))
}

/// Handle `GET /v1/admin/audit/export`.
///
/// Streams nothing fancy: the whole filtered set as NDJSON in one body,
/// sized for a single operator's order volume.
pub async fn export_audit(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Query(query): Query<AuditQuery>,
) -> Result<Response, ApiError> {
    let body = state.audit.export(&query).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        body,
    )
        .into_response())
}
