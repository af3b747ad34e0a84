use std::sync::Arc;

use bt_core::now_rfc3339;
use bt_sql::{SQLStore, Value};
use serde_json::json;

use crate::model::{RequestContext, Role, RoleRef, RoleSummary};

use super::{AuthError, AuthService};

impl AuthService {
    /// The roles currently assigned to a user, ordered by name.
    pub fn get_user_roles(&self, user_id: &str) -> Result<Vec<RoleSummary>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT r.data FROM roles r \
                 JOIN user_roles ur ON ur.role_id = r.id \
                 WHERE ur.user_id = ?1 \
                 ORDER BY r.name",
                &[Value::Text(user_id.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let mut roles = Vec::with_capacity(rows.len());
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| AuthError::Internal("missing data column".into()))?;
            let role: Role =
                serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))?;
            roles.push(role.summary());
        }
        Ok(roles)
    }

    /// Replace the full role set of a user.
    ///
    /// All references resolve up front; one bad reference fails the
    /// request before anything is written. Delete-all plus re-insert
    /// runs in one transaction.
    pub fn set_user_roles(
        self: &Arc<Self>,
        ctx: &RequestContext,
        user_id: &str,
        refs: &[RoleRef],
    ) -> Result<Vec<RoleSummary>, AuthError> {
        self.get_user(user_id)?;

        let mut role_ids = Vec::with_capacity(refs.len());
        for r in refs {
            let role = self.resolve_role_ref(r)?;
            if !role_ids.contains(&role.id) {
                role_ids.push(role.id);
            }
        }

        let now = now_rfc3339();
        let mut stmts = vec![(
            "DELETE FROM user_roles WHERE user_id = ?1".to_string(),
            vec![Value::Text(user_id.to_string())],
        )];
        for rid in &role_ids {
            stmts.push((
                "INSERT INTO user_roles (user_id, role_id, created_at) \
                 VALUES (?1, ?2, ?3)"
                    .to_string(),
                vec![
                    Value::Text(user_id.to_string()),
                    Value::Text(rid.clone()),
                    Value::Text(now.clone()),
                ],
            ));
        }

        self.sql
            .exec_tx(&stmts)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        self.record_audit(
            ctx,
            "user.set_roles",
            "user",
            Some(user_id),
            json!({ "count": role_ids.len() }),
        );

        self.get_user_roles(user_id)
    }

    /// Remove a single role assignment. Missing assignment is a 404.
    pub fn remove_user_role(
        self: &Arc<Self>,
        ctx: &RequestContext,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), AuthError> {
        let affected = self
            .sql
            .exec(
                "DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2",
                &[
                    Value::Text(user_id.to_string()),
                    Value::Text(role_id.to_string()),
                ],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(AuthError::NotFound("role assignment not found".to_string()));
        }

        self.record_audit(
            ctx,
            "user.remove_role",
            "user",
            Some(user_id),
            json!({ "role_id": role_id }),
        );

        Ok(())
    }

    /// Resolve a role reference (name or id) to the stored record.
    pub fn resolve_role_ref(&self, r: &RoleRef) -> Result<Role, AuthError> {
        let found = match r {
            RoleRef::Id { id } => match self.get_role(id) {
                Ok(role) => Some(role),
                Err(AuthError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            RoleRef::Name(name) => self.find_role_by_name(name)?,
        };

        found.ok_or_else(|| AuthError::Validation("unknown role reference".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{CreateRole, CreateUser, RequestContext, RoleRef};
    use crate::service::AuthError;
    use crate::service::test_support::test_service;

    fn setup() -> (
        std::sync::Arc<crate::service::AuthService>,
        RequestContext,
        String,
    ) {
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
        for name in ["admin", "viewer"] {
            svc.create_role(
                &ctx,
                &CreateRole {
                    name: name.to_string(),
                    description: None,
                },
            )
            .unwrap();
        }
        (svc, ctx, user.id)
    }

    #[test]
    fn test_set_roles_full_replace() {
        let (svc, ctx, user_id) = setup();

        let roles = svc
            .set_user_roles(
                &ctx,
                &user_id,
                &[
                    RoleRef::Name("admin".to_string()),
                    RoleRef::Name("viewer".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(roles.len(), 2);

        let roles = svc
            .set_user_roles(&ctx, &user_id, &[RoleRef::Name("viewer".to_string())])
            .unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "viewer");
    }

    #[test]
    fn test_set_roles_rejects_unknown() {
        let (svc, ctx, user_id) = setup();
        svc.set_user_roles(&ctx, &user_id, &[RoleRef::Name("admin".to_string())])
            .unwrap();

        let err = svc.set_user_roles(&ctx, &user_id, &[RoleRef::Name("ghost".to_string())]);
        assert!(matches!(err, Err(AuthError::Validation(_))));

        // Failed replace leaves the assignment untouched.
        let roles = svc.get_user_roles(&user_id).unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "admin");
    }

    #[test]
    fn test_remove_single_role() {
        let (svc, ctx, user_id) = setup();
        let roles = svc
            .set_user_roles(&ctx, &user_id, &[RoleRef::Name("admin".to_string())])
            .unwrap();
        let role_id = roles[0].id.clone();

        svc.remove_user_role(&ctx, &user_id, &role_id).unwrap();
        assert!(svc.get_user_roles(&user_id).unwrap().is_empty());

        let err = svc.remove_user_role(&ctx, &user_id, &role_id);
        assert!(matches!(err, Err(AuthError::NotFound(_))));
    }
}
