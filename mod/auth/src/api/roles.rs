use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;

use bt_core::{ListParams, ServiceError};

use crate::api::middleware::require_admin;
use crate::api::AppState;
use crate::model::{CreateRole, RequestContext, RoleDetail, SetRolePermissions, UpdateRole};

pub fn routes(svc: AppState) -> Router<AppState> {
    let reads = Router::new()
        .route("/roles", get(list_roles))
        .route("/roles/{id}", get(get_role));

    let admin = Router::new()
        .route("/roles", post(create_role))
        .route(
            "/roles/{id}",
            axum::routing::put(update_role).delete(delete_role),
        )
        .route("/roles/{id}/permissions", post(set_role_permissions))
        .route_layer(axum::middleware::from_fn_with_state(svc, require_admin));

    reads.merge(admin)
}

async fn list_roles(
    State(svc): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let (items, total) = svc.list_roles(&params)?;
    Ok(Json(json!({ "items": items, "total": total })))
}

async fn get_role(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RoleDetail>, ServiceError> {
    Ok(Json(svc.get_role_detail(&id)?))
}

async fn create_role(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<CreateRole>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let role = svc.create_role(&ctx, &input)?;
    Ok((StatusCode::CREATED, Json(json!(role))))
}

async fn update_role(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(patch): Json<UpdateRole>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let role = svc.update_role(&ctx, &id, &patch)?;
    Ok(Json(json!(role)))
}

async fn delete_role(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_role(&ctx, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_role_permissions(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(input): Json<SetRolePermissions>,
) -> Result<Json<RoleDetail>, ServiceError> {
    Ok(Json(svc.set_role_permissions(&ctx, &id, &input.permissions)?))
}
