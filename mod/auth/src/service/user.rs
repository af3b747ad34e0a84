use std::sync::Arc;

use bt_core::{ListParams, new_id, now_rfc3339};
use bt_sql::{SQLStore, Value};
use serde_json::json;

use crate::model::{CreateUser, RequestContext, UpdateUser, User, UserWithRoles};
use crate::service::credential::{normalize_email, validate_password};

use super::{AuthError, AuthService};

impl AuthService {
    /// Create a user from the admin surface. No default role is assigned.
    pub fn create_user(
        self: &Arc<Self>,
        ctx: &RequestContext,
        req: &CreateUser,
    ) -> Result<User, AuthError> {
        let email = normalize_email(&req.email)?;
        validate_password(&req.password)?;

        let hash = bcrypt::hash(&req.password, self.config.bcrypt_cost)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            email: email.clone(),
            username: Some(email.clone()),
            name: req.name.clone(),
            password: Some(hash),
            active: req.active,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        self.insert_record(
            "users",
            &user.id,
            &user,
            &[
                ("email", Value::Text(email.clone())),
                ("active", Value::Integer(user.active as i64)),
                ("created_at", Value::Text(now)),
            ],
        )
        .map_err(|e| match e {
            AuthError::Conflict(_) => {
                AuthError::Conflict("email already registered".to_string())
            }
            other => other,
        })?;

        self.record_audit(
            ctx,
            "user.create",
            "user",
            Some(&user.id),
            json!({ "email": email }),
        );

        Ok(user)
    }

    /// Fetch the full user record (includes the hash; never serve directly).
    pub fn get_user(&self, id: &str) -> Result<User, AuthError> {
        self.get_record("users", id)
            .map_err(|e| match e {
                AuthError::NotFound(_) => AuthError::NotFound("user not found".to_string()),
                other => other,
            })
    }

    /// A user together with its assigned roles, for admin views.
    pub fn get_user_with_roles(&self, id: &str) -> Result<UserWithRoles, AuthError> {
        let user = self.get_user(id)?;
        let roles = self.get_user_roles(id)?;
        Ok(UserWithRoles {
            user: user.to_public(),
            roles,
        })
    }

    /// List users with their roles, filtered by an optional substring
    /// match on email, ordered by email.
    pub fn list_users(
        &self,
        params: &ListParams,
    ) -> Result<(Vec<UserWithRoles>, usize), AuthError> {
        let (where_sql, where_params) = match &params.q {
            Some(q) if !q.is_empty() => (
                " WHERE email LIKE ?1".to_string(),
                vec![Value::Text(format!("%{}%", q.to_lowercase()))],
            ),
            _ => (String::new(), Vec::new()),
        };

        let (users, total): (Vec<User>, usize) = self.list_records(
            "users",
            &where_sql,
            &where_params,
            "email ASC",
            params.capped_limit(),
            params.offset,
        )?;

        let mut items = Vec::with_capacity(users.len());
        for user in users {
            let roles = self.get_user_roles(&user.id)?;
            items.push(UserWithRoles {
                user: user.to_public(),
                roles,
            });
        }

        Ok((items, total))
    }

    /// Apply a partial update. A present password is re-hashed.
    pub fn update_user(
        self: &Arc<Self>,
        ctx: &RequestContext,
        id: &str,
        req: &UpdateUser,
    ) -> Result<User, AuthError> {
        let mut user = self.get_user(id)?;
        let mut changed: Vec<&str> = Vec::new();

        if let Some(email) = &req.email {
            user.email = normalize_email(email)?;
            changed.push("email");
        }
        if let Some(name) = &req.name {
            user.name = Some(name.clone());
            changed.push("name");
        }
        if let Some(active) = req.active {
            user.active = active;
            changed.push("active");
        }
        if let Some(password) = &req.password {
            validate_password(password)?;
            let hash = bcrypt::hash(password, self.config.bcrypt_cost)
                .map_err(|e| AuthError::Internal(e.to_string()))?;
            user.password = Some(hash);
            changed.push("password");
        }

        user.updated_at = now_rfc3339();

        self.update_record(
            "users",
            id,
            &user,
            &[
                ("email", Value::Text(user.email.clone())),
                ("active", Value::Integer(user.active as i64)),
            ],
        )
        .map_err(|e| match e {
            AuthError::Conflict(_) => {
                AuthError::Conflict("email already registered".to_string())
            }
            other => other,
        })?;

        self.record_audit(
            ctx,
            "user.update",
            "user",
            Some(id),
            json!({ "fields": changed }),
        );

        Ok(user)
    }

    /// Delete a user and its role assignments atomically.
    pub fn delete_user(
        self: &Arc<Self>,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<(), AuthError> {
        // Existence check up front so a missing user is a 404, not a no-op.
        let user = self.get_user(id)?;

        self.sql
            .exec_tx(&[
                (
                    "DELETE FROM user_roles WHERE user_id = ?1".to_string(),
                    vec![Value::Text(id.to_string())],
                ),
                (
                    "DELETE FROM users WHERE id = ?1".to_string(),
                    vec![Value::Text(id.to_string())],
                ),
            ])
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        self.record_audit(
            ctx,
            "user.delete",
            "user",
            Some(id),
            json!({ "email": user.email }),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bt_core::ListParams;

    use crate::model::{CreateUser, RequestContext, UpdateUser};
    use crate::service::AuthError;
    use crate::service::test_support::test_service;

    fn create(email: &str) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            name: None,
            password: "hunter22".to_string(),
            active: true,
        }
    }

    #[test]
    fn test_create_get_list() {
        let svc = test_service();
        let ctx = RequestContext::default();

        let u1 = svc.create_user(&ctx, &create("b@x.com")).unwrap();
        svc.create_user(&ctx, &create("a@x.com")).unwrap();

        let got = svc.get_user_with_roles(&u1.id).unwrap();
        assert_eq!(got.user.email, "b@x.com");
        assert!(got.roles.is_empty());

        let (items, total) = svc.list_users(&ListParams::default()).unwrap();
        assert_eq!(total, 2);
        assert_eq!(items[0].user.email, "a@x.com");
    }

    #[test]
    fn test_list_filters_by_email() {
        let svc = test_service();
        let ctx = RequestContext::default();
        svc.create_user(&ctx, &create("alice@x.com")).unwrap();
        svc.create_user(&ctx, &create("bob@x.com")).unwrap();

        let params = ListParams {
            q: Some("alice".to_string()),
            ..Default::default()
        };
        let (items, total) = svc.list_users(&params).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].user.email, "alice@x.com");
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let svc = test_service();
        let ctx = RequestContext::default();
        svc.create_user(&ctx, &create("a@x.com")).unwrap();

        let err = svc.create_user(&ctx, &create("A@x.com"));
        assert!(matches!(err, Err(AuthError::Conflict(_))));
    }

    #[test]
    fn test_update_rehashes_password() {
        let svc = test_service();
        let ctx = RequestContext::default();
        let user = svc.create_user(&ctx, &create("a@x.com")).unwrap();

        svc.update_user(
            &ctx,
            &user.id,
            &UpdateUser {
                password: Some("newpass99".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(svc.verify_credentials("a@x.com", "newpass99").is_ok());
        assert!(svc.verify_credentials("a@x.com", "hunter22").is_err());
    }

    #[test]
    fn test_delete_removes_user_and_assignments() {
        let svc = test_service();
        let ctx = RequestContext::default();
        let user = svc.create_user(&ctx, &create("a@x.com")).unwrap();

        svc.delete_user(&ctx, &user.id).unwrap();
        let err = svc.get_user(&user.id);
        assert!(matches!(err, Err(AuthError::NotFound(_))));

        let err = svc.delete_user(&ctx, &user.id);
        assert!(matches!(err, Err(AuthError::NotFound(_))));
    }
}
