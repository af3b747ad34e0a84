use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;

use bt_core::ServiceError;

use crate::api::menu::MENU;
use crate::api::AppState;
use crate::model::Claims;
use crate::service::AuthError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/me/menu", get(me_menu))
}

async fn me(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    // A valid token for a since-deleted user is still not a session.
    let user = match svc.get_user(&claims.sub) {
        Ok(user) => user,
        Err(AuthError::NotFound(_)) => {
            return Err(ServiceError::Unauthorized("invalid token".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let roles: Vec<String> = svc
        .get_user_roles(&user.id)?
        .into_iter()
        .map(|r| r.name)
        .collect();
    let permissions: Vec<String> = svc
        .resolve_effective_permissions(&user.id)?
        .into_iter()
        .collect();

    Ok(Json(json!({
        "user": user.to_public(),
        "roles": roles,
        "permissions": permissions,
    })))
}

async fn me_menu(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let granted = svc.resolve_effective_permissions(&claims.sub)?;

    let items: Vec<_> = MENU
        .iter()
        .filter(|item| granted.contains(item.permission))
        .collect();

    Ok(Json(json!({ "items": items })))
}
