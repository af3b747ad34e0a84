//! Auth module — RBAC authorization core with JWT sessions and auditing.
//!
//! # Resources
//!
//! - **User** — identity with email login and bcrypt password hash
//! - **Role** — named authorization group (e.g. "admin", "viewer")
//! - **Permission** — atomic capability keyed by (resource, action)
//! - **UserRole / RolePermission** — many-to-many grant relations
//! - **AuditLog** — append-only record of every mutating operation
//!
//! Tokens come in two kinds: short-lived access tokens carrying email
//! and role names, and long-lived refresh tokens carrying only the
//! subject. A refresh recomputes roles from the store, so grants and
//! revocations take effect without waiting for token expiry.
//!
//! # Usage
//!
//! ```ignore
//! use auth::{AuthModule, service::AuthConfig};
//!
//! let module = AuthModule::new(sql, AuthConfig::default())?;
//! let router = module.routes(); // serves /api/v1/* and /health
//! ```

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use bt_core::Module;

use crate::service::{AuthConfig, AuthService};

/// Auth module implementing the Module trait.
///
/// Holds the AuthService and provides HTTP routes for all auth endpoints.
pub struct AuthModule {
    service: Arc<AuthService>,
}

impl AuthModule {
    /// Create a new AuthModule.
    pub fn new(
        sql: Arc<dyn bt_sql::SQLStore>,
        config: AuthConfig,
    ) -> Result<Self, bt_core::ServiceError> {
        let service = AuthService::new(sql, config).map_err(bt_core::ServiceError::from)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying AuthService.
    pub fn service(&self) -> &Arc<AuthService> {
        &self.service
    }
}

impl Module for AuthModule {
    fn name(&self) -> &str {
        "auth"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
