use std::sync::Arc;

use bt_core::{new_id, now_rfc3339};
use bt_sql::{SQLStore, Value};
use serde_json::json;

use crate::model::{CredentialsRequest, RequestContext, User};

use super::{AuthError, AuthService};

/// Role auto-assigned to every self-registered user.
pub const DEFAULT_ROLE: &str = "viewer";

impl AuthService {
    /// Verify an email/password pair against the stored hash.
    ///
    /// Every failure mode (unknown email, wrong password, inactive
    /// account) returns the same error so the response does not reveal
    /// which part was wrong.
    pub fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let invalid = || AuthError::Unauthorized("invalid credentials".to_string());

        let user = self
            .find_user_by_email(email)?
            .ok_or_else(invalid)?;
        if !user.active {
            return Err(invalid());
        }
        let hash = user.password.as_deref().ok_or_else(invalid)?;
        let ok = bcrypt::verify(password, hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !ok {
            return Err(invalid());
        }
        Ok(user)
    }

    /// Self-service registration. Creates the user and assigns the
    /// default role atomically.
    pub fn register(
        self: &Arc<Self>,
        ctx: &RequestContext,
        req: &CredentialsRequest,
    ) -> Result<User, AuthError> {
        let email = normalize_email(&req.email)?;
        validate_password(&req.password)?;

        let hash = bcrypt::hash(&req.password, self.config.bcrypt_cost)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let now = now_rfc3339();
        // Default display name is the local part of the email.
        let name = email.split('@').next().map(|s| s.to_string());
        let user = User {
            id: new_id(),
            email: email.clone(),
            username: Some(email.clone()),
            name,
            password: Some(hash),
            active: true,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let data = serde_json::to_string(&user)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let mut stmts = vec![(
            "INSERT INTO users (id, data, email, active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)"
                .to_string(),
            vec![
                Value::Text(user.id.clone()),
                Value::Text(data),
                Value::Text(email.clone()),
                Value::Integer(1),
                Value::Text(now.clone()),
            ],
        )];

        // The default role is seeded at startup; registration still
        // works if it is missing, the user simply starts with no roles.
        if let Some(role) = self.find_role_by_name(DEFAULT_ROLE)? {
            stmts.push((
                "INSERT INTO user_roles (user_id, role_id, created_at) \
                 VALUES (?1, ?2, ?3)"
                    .to_string(),
                vec![
                    Value::Text(user.id.clone()),
                    Value::Text(role.id),
                    Value::Text(now),
                ],
            ));
        }

        self.sql.exec_tx(&stmts).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE constraint") {
                AuthError::Validation("email already registered".to_string())
            } else {
                AuthError::Storage(msg)
            }
        })?;

        self.record_audit(
            ctx,
            "user.register",
            "user",
            Some(&user.id),
            json!({ "email": email }),
        );

        Ok(user)
    }

    /// Look up a user by (lowercased) email.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM users WHERE email = ?1",
                &[Value::Text(email.trim().to_lowercase())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        match rows.first() {
            None => Ok(None),
            Some(row) => {
                let data = row
                    .get_str("data")
                    .ok_or_else(|| AuthError::Internal("missing data column".into()))?;
                let user =
                    serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))?;
                Ok(Some(user))
            }
        }
    }
}

/// Lowercase and minimally validate an email address.
pub(crate) fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation("invalid email".to_string()));
    }
    Ok(email)
}

pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 6 {
        return Err(AuthError::Validation(
            "password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}
