use std::collections::BTreeSet;

use bt_sql::{SQLStore, Value};

use crate::model::{Permission, PermissionSummary};

use super::{AuthError, AuthService};

impl AuthService {
    /// The set of `"resource:action"` slugs a user holds through its
    /// roles. Deduplicated and sorted; a user with no roles gets an
    /// empty set, not an error.
    pub fn resolve_effective_permissions(
        &self,
        user_id: &str,
    ) -> Result<BTreeSet<String>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT DISTINCT p.resource, p.action FROM permissions p \
                 JOIN role_permissions rp ON rp.permission_id = p.id \
                 JOIN user_roles ur ON ur.role_id = rp.role_id \
                 WHERE ur.user_id = ?1",
                &[Value::Text(user_id.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let mut slugs = BTreeSet::new();
        for row in &rows {
            let resource = row
                .get_str("resource")
                .ok_or_else(|| AuthError::Internal("missing resource column".into()))?;
            let action = row
                .get_str("action")
                .ok_or_else(|| AuthError::Internal("missing action column".into()))?;
            slugs.insert(format!("{resource}:{action}"));
        }
        Ok(slugs)
    }

    /// Effective permissions with full records, for admin views.
    pub fn effective_permissions_detailed(
        &self,
        user_id: &str,
    ) -> Result<Vec<PermissionSummary>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT DISTINCT p.data FROM permissions p \
                 JOIN role_permissions rp ON rp.permission_id = p.id \
                 JOIN user_roles ur ON ur.role_id = rp.role_id \
                 WHERE ur.user_id = ?1",
                &[Value::Text(user_id.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let mut permissions = Vec::with_capacity(rows.len());
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| AuthError::Internal("missing data column".into()))?;
            let perm: Permission =
                serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))?;
            permissions.push(perm.summary());
        }
        permissions.sort_by(|a, b| (&a.resource, &a.action).cmp(&(&b.resource, &b.action)));
        Ok(permissions)
    }

    /// Whether the user holds a role with the given name.
    pub fn user_has_role(&self, user_id: &str, role_name: &str) -> Result<bool, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT 1 AS hit FROM user_roles ur \
                 JOIN roles r ON r.id = ur.role_id \
                 WHERE ur.user_id = ?1 AND r.name = ?2 \
                 LIMIT 1",
                &[
                    Value::Text(user_id.to_string()),
                    Value::Text(role_name.to_string()),
                ],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        Ok(!rows.is_empty())
    }

    /// Whether the user holds the permission `"resource:action"`.
    pub fn user_has_permission(&self, user_id: &str, slug: &str) -> Result<bool, AuthError> {
        let Some((resource, action)) = slug.split_once(':') else {
            return Err(AuthError::Validation(format!(
                "malformed permission slug: {slug:?}"
            )));
        };

        let rows = self
            .sql
            .query(
                "SELECT 1 AS hit FROM permissions p \
                 JOIN role_permissions rp ON rp.permission_id = p.id \
                 JOIN user_roles ur ON ur.role_id = rp.role_id \
                 WHERE ur.user_id = ?1 AND p.resource = ?2 AND p.action = ?3 \
                 LIMIT 1",
                &[
                    Value::Text(user_id.to_string()),
                    Value::Text(resource.to_string()),
                    Value::Text(action.to_string()),
                ],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        Ok(!rows.is_empty())
    }

    /// Require a permission, failing with Forbidden when absent.
    pub fn authorize(&self, user_id: &str, slug: &str) -> Result<(), AuthError> {
        if self.user_has_permission(user_id, slug)? {
            Ok(())
        } else {
            Err(AuthError::Forbidden(format!(
                "missing permission {slug}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::model::{
        CreatePermission, CreateRole, CreateUser, PermissionRef, RequestContext, RoleRef,
    };
    use crate::service::test_support::test_service;
    use crate::service::{AuthError, AuthService};

    /// Two roles sharing one permission, one user holding both.
    fn setup() -> (Arc<AuthService>, String) {
        let svc = test_service();
        let ctx = RequestContext::default();

        for (resource, action) in [
            ("menu", "dashboard"),
            ("menu", "reportes"),
            ("menu", "usuarios"),
        ] {
            svc.create_permission(
                &ctx,
                &CreatePermission {
                    resource: resource.to_string(),
                    action: action.to_string(),
                    description: None,
                },
            )
            .unwrap();
        }

        let viewer = svc
            .create_role(&ctx, &CreateRole { name: "viewer".to_string(), description: None })
            .unwrap();
        let admin = svc
            .create_role(&ctx, &CreateRole { name: "admin".to_string(), description: None })
            .unwrap();

        svc.set_role_permissions(
            &ctx,
            &viewer.id,
            &[
                PermissionRef::Slug("menu:dashboard".to_string()),
                PermissionRef::Slug("menu:reportes".to_string()),
            ],
        )
        .unwrap();
        svc.set_role_permissions(
            &ctx,
            &admin.id,
            &[
                PermissionRef::Slug("menu:dashboard".to_string()),
                PermissionRef::Slug("menu:usuarios".to_string()),
            ],
        )
        .unwrap();

        let user = svc
            .create_user(
                &ctx,
                &CreateUser {
                    email: "a@x.com".to_string(),
                    name: None,
                    password: "hunter22".to_string(),
                    active: true,
                },
            )
            .unwrap();
        svc.set_user_roles(
            &ctx,
            &user.id,
            &[
                RoleRef::Name("viewer".to_string()),
                RoleRef::Name("admin".to_string()),
            ],
        )
        .unwrap();

        (svc, user.id)
    }

    #[test]
    fn test_union_is_deduplicated_and_sorted() {
        let (svc, user_id) = setup();

        let slugs = svc.resolve_effective_permissions(&user_id).unwrap();
        let slugs: Vec<&str> = slugs.iter().map(|s| s.as_str()).collect();
        // "menu:dashboard" is granted by both roles but appears once.
        assert_eq!(slugs, ["menu:dashboard", "menu:reportes", "menu:usuarios"]);

        let detailed = svc.effective_permissions_detailed(&user_id).unwrap();
        assert_eq!(detailed.len(), 3);
    }

    #[test]
    fn test_no_roles_means_empty_set() {
        let svc = test_service();
        let ctx = RequestContext::default();
        let user = svc
            .create_user(
                &ctx,
                &CreateUser {
                    email: "a@x.com".to_string(),
                    name: None,
                    password: "hunter22".to_string(),
                    active: true,
                },
            )
            .unwrap();

        assert!(svc.resolve_effective_permissions(&user.id).unwrap().is_empty());
        assert!(!svc.user_has_permission(&user.id, "menu:dashboard").unwrap());
    }

    #[test]
    fn test_point_checks() {
        let (svc, user_id) = setup();

        assert!(svc.user_has_role(&user_id, "admin").unwrap());
        assert!(!svc.user_has_role(&user_id, "ghost").unwrap());

        assert!(svc.user_has_permission(&user_id, "menu:usuarios").unwrap());
        assert!(!svc.user_has_permission(&user_id, "menu:nope").unwrap());

        svc.authorize(&user_id, "menu:usuarios").unwrap();
        let err = svc.authorize(&user_id, "menu:nope");
        assert!(matches!(err, Err(AuthError::Forbidden(_))));
    }

    #[test]
    fn test_malformed_slug_is_validation_not_denial() {
        let (svc, user_id) = setup();

        let err = svc.user_has_permission(&user_id, "malformed");
        assert!(matches!(err, Err(AuthError::Validation(_))));

        let err = svc.authorize(&user_id, "malformed");
        assert!(matches!(err, Err(AuthError::Validation(_))));
    }
}
