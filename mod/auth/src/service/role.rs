use std::sync::Arc;

use bt_core::{ListParams, new_id, now_rfc3339};
use bt_sql::{SQLStore, Value};
use serde_json::json;

use crate::model::{
    CreateRole, PermissionRef, PermissionSummary, RequestContext, Role, RoleDetail, UpdateRole,
};

use super::{AuthError, AuthService};

impl AuthService {
    pub fn create_role(
        self: &Arc<Self>,
        ctx: &RequestContext,
        req: &CreateRole,
    ) -> Result<Role, AuthError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AuthError::Validation("role name is required".to_string()));
        }

        let now = now_rfc3339();
        let role = Role {
            id: new_id(),
            name: name.clone(),
            description: req.description.clone(),
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        self.insert_record(
            "roles",
            &role.id,
            &role,
            &[
                ("name", Value::Text(name.clone())),
                ("created_at", Value::Text(now)),
            ],
        )
        .map_err(|e| match e {
            AuthError::Conflict(_) => AuthError::Conflict("role name already exists".to_string()),
            other => other,
        })?;

        self.record_audit(
            ctx,
            "role.create",
            "role",
            Some(&role.id),
            json!({ "name": name }),
        );

        Ok(role)
    }

    pub fn get_role(&self, id: &str) -> Result<Role, AuthError> {
        self.get_record("roles", id).map_err(|e| match e {
            AuthError::NotFound(_) => AuthError::NotFound("role not found".to_string()),
            other => other,
        })
    }

    pub fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM roles WHERE name = ?1",
                &[Value::Text(name.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        match rows.first() {
            None => Ok(None),
            Some(row) => {
                let data = row
                    .get_str("data")
                    .ok_or_else(|| AuthError::Internal("missing data column".into()))?;
                let role =
                    serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))?;
                Ok(Some(role))
            }
        }
    }

    /// A role with its granted permissions expanded.
    pub fn get_role_detail(&self, id: &str) -> Result<RoleDetail, AuthError> {
        let role = self.get_role(id)?;
        let permissions = self.get_role_permissions(id)?;
        Ok(RoleDetail {
            id: role.id,
            name: role.name,
            description: role.description,
            permissions,
        })
    }

    /// List roles ordered by name, optionally filtered by a substring
    /// match on the name.
    pub fn list_roles(&self, params: &ListParams) -> Result<(Vec<Role>, usize), AuthError> {
        let (where_sql, where_params) = match &params.q {
            Some(q) if !q.is_empty() => (
                " WHERE name LIKE ?1".to_string(),
                vec![Value::Text(format!("%{}%", q))],
            ),
            _ => (String::new(), Vec::new()),
        };

        self.list_records(
            "roles",
            &where_sql,
            &where_params,
            "name ASC",
            params.capped_limit(),
            params.offset,
        )
    }

    pub fn update_role(
        self: &Arc<Self>,
        ctx: &RequestContext,
        id: &str,
        req: &UpdateRole,
    ) -> Result<Role, AuthError> {
        let mut role = self.get_role(id)?;

        if let Some(name) = &req.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AuthError::Validation("role name is required".to_string()));
            }
            role.name = name.to_string();
        }
        if let Some(description) = &req.description {
            role.description = Some(description.clone());
        }
        role.updated_at = now_rfc3339();

        self.update_record(
            "roles",
            id,
            &role,
            &[("name", Value::Text(role.name.clone()))],
        )
        .map_err(|e| match e {
            AuthError::Conflict(_) => AuthError::Conflict("role name already exists".to_string()),
            other => other,
        })?;

        self.record_audit(
            ctx,
            "role.update",
            "role",
            Some(id),
            json!({ "name": role.name }),
        );

        Ok(role)
    }

    /// Delete a role together with its grants and assignments.
    pub fn delete_role(
        self: &Arc<Self>,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<(), AuthError> {
        let role = self.get_role(id)?;

        self.sql
            .exec_tx(&[
                (
                    "DELETE FROM role_permissions WHERE role_id = ?1".to_string(),
                    vec![Value::Text(id.to_string())],
                ),
                (
                    "DELETE FROM user_roles WHERE role_id = ?1".to_string(),
                    vec![Value::Text(id.to_string())],
                ),
                (
                    "DELETE FROM roles WHERE id = ?1".to_string(),
                    vec![Value::Text(id.to_string())],
                ),
            ])
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        self.record_audit(
            ctx,
            "role.delete",
            "role",
            Some(id),
            json!({ "name": role.name }),
        );

        Ok(())
    }

    /// The permissions currently granted to a role, ordered by slug.
    pub fn get_role_permissions(&self, role_id: &str) -> Result<Vec<PermissionSummary>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT p.data FROM permissions p \
                 JOIN role_permissions rp ON rp.permission_id = p.id \
                 WHERE rp.role_id = ?1 \
                 ORDER BY p.resource, p.action",
                &[Value::Text(role_id.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let mut permissions = Vec::with_capacity(rows.len());
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| AuthError::Internal("missing data column".into()))?;
            let perm: crate::model::Permission =
                serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))?;
            permissions.push(perm.summary());
        }
        Ok(permissions)
    }

    /// Replace the full grant set of a role.
    ///
    /// Every reference is resolved before anything is written; one bad
    /// reference fails the whole request and nothing changes. The
    /// delete-all plus re-insert runs in one transaction, so readers
    /// never observe a half-replaced grant set.
    pub fn set_role_permissions(
        self: &Arc<Self>,
        ctx: &RequestContext,
        role_id: &str,
        refs: &[PermissionRef],
    ) -> Result<RoleDetail, AuthError> {
        self.get_role(role_id)?;

        let mut permission_ids = Vec::with_capacity(refs.len());
        for r in refs {
            let perm = self.resolve_permission_ref(r)?;
            if !permission_ids.contains(&perm.id) {
                permission_ids.push(perm.id);
            }
        }

        let now = now_rfc3339();
        let mut stmts = vec![(
            "DELETE FROM role_permissions WHERE role_id = ?1".to_string(),
            vec![Value::Text(role_id.to_string())],
        )];
        for pid in &permission_ids {
            stmts.push((
                "INSERT INTO role_permissions (role_id, permission_id, created_at) \
                 VALUES (?1, ?2, ?3)"
                    .to_string(),
                vec![
                    Value::Text(role_id.to_string()),
                    Value::Text(pid.clone()),
                    Value::Text(now.clone()),
                ],
            ));
        }

        self.sql
            .exec_tx(&stmts)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        self.record_audit(
            ctx,
            "role.set_permissions",
            "role",
            Some(role_id),
            json!({ "count": permission_ids.len() }),
        );

        self.get_role_detail(role_id)
    }
}
