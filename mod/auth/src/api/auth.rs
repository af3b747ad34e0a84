use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde_json::json;

use bt_core::ServiceError;

use crate::api::AppState;
use crate::model::{CredentialsRequest, RefreshRequest, RequestContext, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/auth/refresh", post(refresh))
}

async fn login(
    State(svc): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = svc.verify_credentials(&req.email, &req.password)?;
    let (session, roles, permissions) = session_payload(&svc, &user)?;

    let (token, expires_in) = svc.issue_access_token(&user, &roles)?;
    let (refresh_token, refresh_max_age) = svc.issue_refresh_token(&user)?;

    Ok(Json(json!({
        "token": token,
        "expiresIn": expires_in,
        "user": session,
        "roles": roles,
        "permissions": permissions,
        "refreshToken": refresh_token,
        "refreshMaxAge": refresh_max_age,
    })))
}

async fn register(
    State(svc): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let user = svc.register(&ctx, &req)?;
    let (session, roles, permissions) = session_payload(&svc, &user)?;

    let (token, expires_in) = svc.issue_access_token(&user, &roles)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "expiresIn": expires_in,
            "user": session,
            "roles": roles,
            "permissions": permissions,
        })),
    ))
}

async fn refresh(
    State(svc): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let (access_token, expires_in) = svc.refresh_access_token(&req.refresh_token)?;
    Ok(Json(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": expires_in,
    })))
}

/// Public user plus current role names and permission slugs.
fn session_payload(
    svc: &AppState,
    user: &User,
) -> Result<(crate::model::PublicUser, Vec<String>, Vec<String>), ServiceError> {
    let roles: Vec<String> = svc
        .get_user_roles(&user.id)?
        .into_iter()
        .map(|r| r.name)
        .collect();
    let permissions: Vec<String> = svc
        .resolve_effective_permissions(&user.id)?
        .into_iter()
        .collect();
    Ok((user.to_public(), roles, permissions))
}
