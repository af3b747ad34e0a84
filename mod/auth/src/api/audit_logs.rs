use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use bt_core::ServiceError;

use crate::api::middleware::require_admin;
use crate::api::AppState;

pub fn routes(svc: AppState) -> Router<AppState> {
    Router::new()
        .route("/audit-logs", get(list_audit_logs))
        .route_layer(axum::middleware::from_fn_with_state(svc, require_admin))
}

async fn list_audit_logs(
    State(svc): State<AppState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let items = svc.list_audit_logs(100)?;
    Ok(Json(json!({ "items": items, "total": items.len() })))
}
