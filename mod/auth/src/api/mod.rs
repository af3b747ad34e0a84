mod audit_logs;
mod auth;
mod me;
mod menu;
pub mod middleware;
mod permissions;
mod roles;
mod users;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::service::AuthService;

/// Shared application state.
pub type AppState = Arc<AuthService>;

/// Build the complete HTTP router.
///
/// Resource routes live under `/api/v1`; `/health` sits at the root.
/// The authentication middleware wraps everything and skips only the
/// public paths (health, login, register, refresh).
pub fn build_router(svc: Arc<AuthService>) -> Router {
    let api = Router::new()
        .merge(auth::routes())
        .merge(me::routes())
        .merge(users::routes(svc.clone()))
        .merge(roles::routes(svc.clone()))
        .merge(permissions::routes(svc.clone()))
        .merge(audit_logs::routes(svc.clone()));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn_with_state(
            svc.clone(),
            middleware::auth_middleware,
        ))
        .with_state(svc)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
