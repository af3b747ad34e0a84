use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;

use bt_core::{ListParams, ServiceError};

use crate::api::middleware::require_admin;
use crate::api::AppState;
use crate::model::{CreateUser, RequestContext, SetUserRoles, UpdateUser, UserWithRoles};

/// User administration. User reads require authentication; mutations
/// and role-assignment access are restricted to the admin role via a
/// guard layer on the admin router.
pub fn routes(svc: AppState) -> Router<AppState> {
    let reads = Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user));

    let admin = Router::new()
        .route("/users", post(create_user))
        .route(
            "/users/{id}",
            axum::routing::put(update_user).delete(delete_user),
        )
        .route("/users/{id}/roles", get(get_user_roles).post(set_user_roles))
        .route("/users/{id}/roles/{role_id}", axum::routing::delete(remove_user_role))
        .route_layer(axum::middleware::from_fn_with_state(svc, require_admin));

    reads.merge(admin)
}

async fn list_users(
    State(svc): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let (items, total) = svc.list_users(&params)?;
    Ok(Json(json!({ "items": items, "total": total })))
}

async fn get_user(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserWithRoles>, ServiceError> {
    Ok(Json(svc.get_user_with_roles(&id)?))
}

async fn create_user(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let user = svc.create_user(&ctx, &input)?;
    Ok((StatusCode::CREATED, Json(json!(user.to_public()))))
}

async fn update_user(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(patch): Json<UpdateUser>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = svc.update_user(&ctx, &id, &patch)?;
    Ok(Json(json!(user.to_public())))
}

async fn delete_user(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_user(&ctx, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_user_roles(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    // 404 for an unknown user, not an empty list.
    svc.get_user(&id)?;
    let roles = svc.get_user_roles(&id)?;
    Ok(Json(json!({ "items": roles, "total": roles.len() })))
}

async fn set_user_roles(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(input): Json<SetUserRoles>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let roles = svc.set_user_roles(&ctx, &id, &input.roles)?;
    Ok(Json(json!({ "items": roles, "total": roles.len() })))
}

async fn remove_user_role(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, role_id)): Path<(String, String)>,
) -> Result<StatusCode, ServiceError> {
    svc.remove_user_role(&ctx, &id, &role_id)?;
    Ok(StatusCode::NO_CONTENT)
}
