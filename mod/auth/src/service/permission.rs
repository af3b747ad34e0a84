use std::sync::Arc;

use bt_core::{new_id, now_rfc3339};
use bt_sql::{SQLStore, Value};
use serde_json::json;

use crate::model::{CreatePermission, Permission, PermissionQuery, PermissionRef, RequestContext};

use super::{AuthError, AuthService};

impl AuthService {
    pub fn create_permission(
        self: &Arc<Self>,
        ctx: &RequestContext,
        req: &CreatePermission,
    ) -> Result<Permission, AuthError> {
        let resource = req.resource.trim().to_string();
        let action = req.action.trim().to_string();
        if resource.is_empty() || action.is_empty() {
            return Err(AuthError::Validation(
                "resource and action are required".to_string(),
            ));
        }

        let now = now_rfc3339();
        let perm = Permission {
            id: new_id(),
            resource: resource.clone(),
            action: action.clone(),
            description: req.description.clone(),
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        self.insert_record(
            "permissions",
            &perm.id,
            &perm,
            &[
                ("resource", Value::Text(resource)),
                ("action", Value::Text(action)),
                ("created_at", Value::Text(now)),
            ],
        )
        .map_err(|e| match e {
            AuthError::Conflict(_) => {
                AuthError::Conflict(format!("permission {} already exists", perm.slug()))
            }
            other => other,
        })?;

        self.record_audit(
            ctx,
            "permission.create",
            "permission",
            Some(&perm.id),
            json!({ "slug": perm.slug() }),
        );

        Ok(perm)
    }

    pub fn get_permission(&self, id: &str) -> Result<Permission, AuthError> {
        self.get_record("permissions", id).map_err(|e| match e {
            AuthError::NotFound(_) => AuthError::NotFound("permission not found".to_string()),
            other => other,
        })
    }

    pub fn find_permission_by_pair(
        &self,
        resource: &str,
        action: &str,
    ) -> Result<Option<Permission>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM permissions WHERE resource = ?1 AND action = ?2",
                &[
                    Value::Text(resource.to_string()),
                    Value::Text(action.to_string()),
                ],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        match rows.first() {
            None => Ok(None),
            Some(row) => {
                let data = row
                    .get_str("data")
                    .ok_or_else(|| AuthError::Internal("missing data column".into()))?;
                let perm =
                    serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))?;
                Ok(Some(perm))
            }
        }
    }

    /// List permissions ordered by (resource, action) with optional
    /// substring filters.
    pub fn list_permissions(
        &self,
        query: &PermissionQuery,
    ) -> Result<(Vec<Permission>, usize), AuthError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
            let n = params.len() + 1;
            clauses.push(format!(
                "(resource LIKE ?{n} OR action LIKE ?{n} OR data LIKE ?{n})"
            ));
            params.push(Value::Text(format!("%{}%", q)));
        }
        if let Some(resource) = query.resource.as_deref().filter(|r| !r.is_empty()) {
            clauses.push(format!("resource LIKE ?{}", params.len() + 1));
            params.push(Value::Text(format!("%{}%", resource)));
        }
        if let Some(action) = query.action.as_deref().filter(|a| !a.is_empty()) {
            clauses.push(format!("action LIKE ?{}", params.len() + 1));
            params.push(Value::Text(format!("%{}%", action)));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        self.list_records(
            "permissions",
            &where_sql,
            &params,
            "resource ASC, action ASC",
            query.limit.min(100),
            query.offset,
        )
    }

    pub fn update_permission(
        self: &Arc<Self>,
        ctx: &RequestContext,
        id: &str,
        description: Option<String>,
    ) -> Result<Permission, AuthError> {
        let mut perm = self.get_permission(id)?;
        perm.description = description;
        perm.updated_at = now_rfc3339();

        self.update_record("permissions", id, &perm, &[])?;

        self.record_audit(
            ctx,
            "permission.update",
            "permission",
            Some(id),
            json!({ "slug": perm.slug() }),
        );

        Ok(perm)
    }

    /// Delete a permission and every grant that references it.
    pub fn delete_permission(
        self: &Arc<Self>,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<(), AuthError> {
        let perm = self.get_permission(id)?;

        self.sql
            .exec_tx(&[
                (
                    "DELETE FROM role_permissions WHERE permission_id = ?1".to_string(),
                    vec![Value::Text(id.to_string())],
                ),
                (
                    "DELETE FROM permissions WHERE id = ?1".to_string(),
                    vec![Value::Text(id.to_string())],
                ),
            ])
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        self.record_audit(
            ctx,
            "permission.delete",
            "permission",
            Some(id),
            json!({ "slug": perm.slug() }),
        );

        Ok(())
    }

    /// Resolve any accepted permission reference shape to the stored
    /// record. An unresolvable reference is a validation error.
    pub fn resolve_permission_ref(&self, r: &PermissionRef) -> Result<Permission, AuthError> {
        let found = match r {
            PermissionRef::Id { id } => match self.get_permission(id) {
                Ok(p) => Some(p),
                Err(AuthError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            PermissionRef::Pair { resource, action } => {
                self.find_permission_by_pair(resource, action)?
            }
            PermissionRef::Slug(slug) => match slug.split_once(':') {
                Some((resource, action)) => self.find_permission_by_pair(resource, action)?,
                None => {
                    return Err(AuthError::Validation(format!(
                        "malformed permission reference: {slug:?}"
                    )));
                }
            },
        };

        found.ok_or_else(|| AuthError::Validation("unknown permission reference".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{CreatePermission, PermissionQuery, PermissionRef, RequestContext};
    use crate::service::AuthError;
    use crate::service::test_support::test_service;

    fn perm(resource: &str, action: &str) -> CreatePermission {
        CreatePermission {
            resource: resource.to_string(),
            action: action.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_create_and_duplicate_pair() {
        let svc = test_service();
        let ctx = RequestContext::default();

        let p = svc.create_permission(&ctx, &perm("menu", "usuarios")).unwrap();
        assert_eq!(p.slug(), "menu:usuarios");

        let err = svc.create_permission(&ctx, &perm("menu", "usuarios"));
        assert!(matches!(err, Err(AuthError::Conflict(_))));

        // Same action under a different resource is fine.
        svc.create_permission(&ctx, &perm("report", "usuarios")).unwrap();
    }

    #[test]
    fn test_list_filters() {
        let svc = test_service();
        let ctx = RequestContext::default();
        svc.create_permission(&ctx, &perm("menu", "usuarios")).unwrap();
        svc.create_permission(&ctx, &perm("menu", "roles")).unwrap();
        svc.create_permission(&ctx, &perm("report", "usuarios")).unwrap();

        let (items, total) = svc
            .list_permissions(&PermissionQuery {
                resource: Some("menu".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 2);
        assert!(items.iter().all(|p| p.resource == "menu"));

        let (_, total) = svc
            .list_permissions(&PermissionQuery {
                q: Some("usuarios".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_resolve_ref_shapes() {
        let svc = test_service();
        let ctx = RequestContext::default();
        let p = svc.create_permission(&ctx, &perm("menu", "usuarios")).unwrap();

        for r in [
            PermissionRef::Slug("menu:usuarios".to_string()),
            PermissionRef::Id { id: p.id.clone() },
            PermissionRef::Pair {
                resource: "menu".to_string(),
                action: "usuarios".to_string(),
            },
        ] {
            let resolved = svc.resolve_permission_ref(&r).unwrap();
            assert_eq!(resolved.id, p.id);
        }

        let err = svc.resolve_permission_ref(&PermissionRef::Slug("no-colon".to_string()));
        assert!(matches!(err, Err(AuthError::Validation(_))));
        let err = svc.resolve_permission_ref(&PermissionRef::Slug("menu:nope".to_string()));
        assert!(matches!(err, Err(AuthError::Validation(_))));
    }
}
