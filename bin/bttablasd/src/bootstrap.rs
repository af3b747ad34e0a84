//! Bootstrap — config verification and idempotent RBAC seeding.
//!
//! When bt-tablasd starts:
//! 1. Verify the config carries a JWT secret and a data directory.
//! 2. Ensure the seed permissions and the "viewer"/"admin" roles exist.
//! 3. Optionally create the bootstrap admin account from config.

use std::sync::Arc;

use tracing::{info, warn};

use auth::model::{
    CreatePermission, CreateRole, CreateUser, PermissionRef, RequestContext, RoleRef,
};
use auth::service::AuthService;

use crate::config::{ServerConfig, parse_duration};

/// Menu permissions every deployment starts with.
const SEED_PERMISSIONS: &[(&str, &str)] = &[
    ("menu", "dashboard"),
    ("menu", "inscripciones"),
    ("menu", "administracion"),
    ("menu", "matriculas"),
    ("menu", "asistencia"),
    ("menu", "configuracion"),
    ("menu", "usuarios"),
    ("menu", "roles"),
    ("menu", "permisos"),
    ("menu", "reportes"),
    ("menu", "estadisticas"),
];

/// Grants given to the "viewer" role at creation.
const VIEWER_GRANTS: &[&str] = &["menu:dashboard", "menu:inscripciones", "menu:reportes"];

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }

    let access = parse_duration(&config.jwt.access_expires)?;
    let refresh = parse_duration(&config.jwt.refresh_expires)?;
    if refresh <= access {
        warn!(
            access = %config.jwt.access_expires,
            refresh = %config.jwt.refresh_expires,
            "refresh token lifetime does not exceed access lifetime; refreshing is pointless"
        );
    }

    Ok(())
}

/// Seed permissions, roles, and the optional admin account. Safe to
/// run on every start: existing records are left untouched, so grant
/// changes made by operators survive restarts.
pub fn seed(svc: &Arc<AuthService>, config: &ServerConfig) -> anyhow::Result<()> {
    let ctx = RequestContext::default();

    for (resource, action) in SEED_PERMISSIONS {
        if svc.find_permission_by_pair(resource, action)?.is_none() {
            svc.create_permission(
                &ctx,
                &CreatePermission {
                    resource: resource.to_string(),
                    action: action.to_string(),
                    description: None,
                },
            )?;
        }
    }

    ensure_role(svc, &ctx, "viewer", "Read-only access", VIEWER_GRANTS)?;

    let all_slugs: Vec<String> = SEED_PERMISSIONS
        .iter()
        .map(|(r, a)| format!("{r}:{a}"))
        .collect();
    let all_refs: Vec<&str> = all_slugs.iter().map(|s| s.as_str()).collect();
    ensure_role(svc, &ctx, "admin", "Full access", &all_refs)?;

    if let Some(admin) = &config.admin {
        if svc.find_user_by_email(&admin.email)?.is_none() {
            let user = svc.create_user(
                &ctx,
                &CreateUser {
                    email: admin.email.clone(),
                    name: Some("Administrator".to_string()),
                    password: admin.password.clone(),
                    active: true,
                },
            )?;
            svc.set_user_roles(&ctx, &user.id, &[RoleRef::Name("admin".to_string())])?;
            info!(email = %admin.email, "created bootstrap admin account");
        }
    }

    Ok(())
}

/// Create a role with its initial grants if it does not exist yet.
fn ensure_role(
    svc: &Arc<AuthService>,
    ctx: &RequestContext,
    name: &str,
    description: &str,
    grants: &[&str],
) -> anyhow::Result<()> {
    if svc.find_role_by_name(name)?.is_some() {
        return Ok(());
    }

    let role = svc.create_role(
        ctx,
        &CreateRole {
            name: name.to_string(),
            description: Some(description.to_string()),
        },
    )?;

    let refs: Vec<PermissionRef> = grants
        .iter()
        .map(|s| PermissionRef::Slug(s.to_string()))
        .collect();
    svc.set_role_permissions(ctx, &role.id, &refs)?;

    info!(role = name, grants = grants.len(), "created seed role");
    Ok(())
}
