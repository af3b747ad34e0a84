use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;

use bt_core::ServiceError;

use crate::api::middleware::require_admin;
use crate::api::AppState;
use crate::model::{CreatePermission, Permission, PermissionQuery, RequestContext};

pub fn routes(svc: AppState) -> Router<AppState> {
    let reads = Router::new()
        .route("/permissions", get(list_permissions))
        .route("/permissions/{id}", get(get_permission));

    let admin = Router::new()
        .route("/permissions", post(create_permission))
        .route(
            "/permissions/{id}",
            axum::routing::put(update_permission).delete(delete_permission),
        )
        .route_layer(axum::middleware::from_fn_with_state(svc, require_admin));

    reads.merge(admin)
}

async fn list_permissions(
    State(svc): State<AppState>,
    Query(query): Query<PermissionQuery>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let (items, total) = svc.list_permissions(&query)?;
    Ok(Json(json!({ "items": items, "total": total })))
}

async fn get_permission(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Permission>, ServiceError> {
    Ok(Json(svc.get_permission(&id)?))
}

async fn create_permission(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<CreatePermission>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let perm = svc.create_permission(&ctx, &input)?;
    Ok((StatusCode::CREATED, Json(json!(perm))))
}

#[derive(Debug, Deserialize)]
struct UpdatePermission {
    #[serde(default)]
    description: Option<String>,
}

async fn update_permission(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(patch): Json<UpdatePermission>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let perm = svc.update_permission(&ctx, &id, patch.description)?;
    Ok(Json(json!(perm)))
}

async fn delete_permission(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_permission(&ctx, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
