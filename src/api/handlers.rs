//! JSON request handlers
//!
//! Handlers only translate between HTTP and [`HistoryStore`] calls.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::AppState;
use crate::api::error::ApiError;
use crate::message::{MessageId, MessageRecord, MessageSummary};
use crate::store::Stats;

pub const DEFAULT_OFFSET: usize = 0;
pub const DEFAULT_LIMIT: usize = 50;

/// Raw pagination parameters.
///
/// Kept as strings so that malformed values fall back to defaults instead of
/// failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    pub fn offset(&self) -> usize {
        non_negative(self.offset.as_deref(), DEFAULT_OFFSET)
    }

    pub fn limit(&self) -> usize {
        non_negative(self.limit.as_deref(), DEFAULT_LIMIT)
    }
}

/// Parse an integer, clamping negatives to zero
fn non_negative(value: Option<&str>, default: usize) -> usize {
    match value.map(|v| v.trim().parse::<i64>()) {
        Some(Ok(n)) => usize::try_from(n.max(0)).unwrap_or(usize::MAX),
        _ => default,
    }
}

#[derive(Serialize)]
pub struct ListResponse {
    pub emails: Vec<Arc<MessageRecord>>,
    pub total: usize,
    pub stats: Stats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_emails: usize,
    pub stats: Stats,
    pub recent_emails: Vec<MessageSummary>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    /// Seconds since the server started
    pub uptime: f64,
    pub stats: Stats,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.service.to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        stats: state.store.stats(),
    })
}

pub async fn list_emails(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<ListResponse> {
    let page = state.store.list(params.offset(), params.limit());
    Json(ListResponse {
        emails: page.messages,
        total: page.total,
        stats: page.stats,
    })
}

pub async fn get_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Arc<MessageRecord>>, ApiError> {
    let id: MessageId = id.parse().map_err(|_| ApiError::NotFound)?;
    Ok(Json(state.store.get(&id)?))
}

pub async fn delete_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id: MessageId = id.parse().map_err(|_| ApiError::NotFound)?;
    state.store.delete(&id)?;
    Ok(Json(json!({ "message": "Email deleted successfully" })))
}

pub async fn clear_emails(State(state): State<AppState>) -> Json<Value> {
    state.store.clear();
    Json(json!({ "message": "All emails cleared" }))
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.store.stats();
    Json(StatsResponse {
        total_emails: stats.current_count,
        recent_emails: stats.recent.clone(),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(offset: Option<&str>, limit: Option<&str>) -> ListParams {
        ListParams {
            offset: offset.map(str::to_owned),
            limit: limit.map(str::to_owned),
        }
    }

    #[test]
    fn test_defaults() {
        let p = ListParams::default();
        assert_eq!(p.offset(), DEFAULT_OFFSET);
        assert_eq!(p.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_negative_values_clamp_to_zero() {
        let p = params(Some("-5"), Some("-1"));
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 0);
    }

    #[test]
    fn test_malformed_values_use_defaults() {
        let p = params(Some("abc"), Some("1.5"));
        assert_eq!(p.offset(), DEFAULT_OFFSET);
        assert_eq!(p.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_valid_values() {
        let p = params(Some(" 20 "), Some("5"));
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 5);
    }
}
