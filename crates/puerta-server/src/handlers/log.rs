//! `GET /api/log`: recent entry attempts, for admins.

use axum::Json;
use axum::extract::{Query, State};
use puerta_storage::{AuditLog, AuditLogRepository};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::AdminUser;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
    /// Only entries of this handle.
    pub user: Option<String>,
}

impl LogQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

pub async fn audit_log(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<AuditLog>>, ApiError> {
    let entries = match &query.user {
        Some(handle) => state.audit.find_by_user(handle, query.limit()).await?,
        None => state.audit.find_recent(query.limit()).await?,
    };
    Ok(Json(entries))
}
