use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use bt_core::ServiceError;

use crate::api::AppState;
use crate::model::{Claims, RequestContext};

/// Full request paths that skip authentication.
const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/api/v1/login",
    "/api/v1/register",
    "/api/v1/auth/refresh",
];

/// JWT authentication middleware.
///
/// Every request gets a [`RequestContext`] extension carrying the
/// client IP; authenticated requests additionally get the decoded
/// [`Claims`] and the actor id in the context. Public paths pass
/// through without a token.
pub async fn auth_middleware(
    State(svc): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let ip = client_ip(req.headers());

    if PUBLIC_PATHS.contains(&path.as_str()) {
        req.extensions_mut().insert(RequestContext {
            user_id: None,
            ip,
        });
        return next.run(req).await;
    }

    let Some(token) = extract_bearer(req.headers()) else {
        return ServiceError::Unauthorized("authentication required".to_string())
            .into_response();
    };
    let token = token.to_string();

    match svc.verify_access_token(&token) {
        Ok(claims) => {
            req.extensions_mut().insert(RequestContext {
                user_id: Some(claims.sub.clone()),
                ip,
            });
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Guard layer for admin-only routes. Checks the role against the
/// store, not the token claims, so a revocation takes effect on the
/// next request rather than at token expiry.
pub async fn require_admin(State(svc): State<AppState>, req: Request, next: Next) -> Response {
    enforce_role_inner(&svc, "admin", req, next).await
}

/// Guard layer requiring a specific role.
pub async fn enforce_role(
    State((svc, role)): State<(AppState, &'static str)>,
    req: Request,
    next: Next,
) -> Response {
    enforce_role_inner(&svc, role, req, next).await
}

async fn enforce_role_inner(
    svc: &AppState,
    role: &str,
    req: Request,
    next: Next,
) -> Response {
    let Some(claims) = req.extensions().get::<Claims>() else {
        return ServiceError::Unauthorized("authentication required".to_string())
            .into_response();
    };

    match svc.user_has_role(&claims.sub, role) {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            ServiceError::PermissionDenied(format!("{role} role required")).into_response()
        }
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Guard layer requiring a `"resource:action"` permission.
pub async fn enforce_permission(
    State((svc, slug)): State<(AppState, &'static str)>,
    req: Request,
    next: Next,
) -> Response {
    let Some(claims) = req.extensions().get::<Claims>() else {
        return ServiceError::Unauthorized("authentication required".to_string())
            .into_response();
    };

    match svc.authorize(&claims.sub, slug) {
        Ok(()) => next.run(req).await,
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Extract the Bearer token from the Authorization header.
fn extract_bearer(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Best-effort client IP: first forwarded hop, then the proxy header.
fn client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}
