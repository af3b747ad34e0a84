use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::model::{Claims, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH, User};

use super::{AuthError, AuthService};

impl AuthService {
    /// Sign a short-lived access token carrying email and role names.
    /// Returns the token and its lifetime in seconds.
    pub fn issue_access_token(
        &self,
        user: &User,
        roles: &[String],
    ) -> Result<(String, i64), AuthError> {
        let now = Utc::now().timestamp();
        let ttl = self.config.access_token_ttl;
        let claims = Claims {
            sub: user.id.clone(),
            email: Some(user.email.clone()),
            roles: roles.to_vec(),
            typ: TOKEN_TYPE_ACCESS.to_string(),
            iat: now,
            exp: now + ttl,
        };
        let token = self.sign(&claims)?;
        Ok((token, ttl))
    }

    /// Sign a long-lived refresh token carrying only the subject.
    /// Returns the token and its lifetime in seconds.
    pub fn issue_refresh_token(&self, user: &User) -> Result<(String, i64), AuthError> {
        let now = Utc::now().timestamp();
        let ttl = self.config.refresh_token_ttl;
        let claims = Claims {
            sub: user.id.clone(),
            email: None,
            roles: Vec::new(),
            typ: TOKEN_TYPE_REFRESH.to_string(),
            iat: now,
            exp: now + ttl,
        };
        let token = self.sign(&claims)?;
        Ok((token, ttl))
    }

    /// Verify an access token: signature, expiry, and token kind.
    ///
    /// Every failure mode maps to the same error message so responses
    /// do not reveal whether a token was malformed, expired, or of the
    /// wrong kind.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.verify(token)?;
        if claims.typ != TOKEN_TYPE_ACCESS {
            return Err(invalid_token());
        }
        Ok(claims)
    }

    /// Verify a refresh token and mint a fresh access token for its
    /// subject, with roles recomputed from current assignments.
    /// Returns the token and its lifetime in seconds.
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<(String, i64), AuthError> {
        let claims = self.verify(refresh_token)?;
        if claims.typ != TOKEN_TYPE_REFRESH {
            return Err(invalid_token());
        }

        // A user deleted or deactivated since issuance cannot refresh.
        let user = match self.get_user(&claims.sub) {
            Ok(user) => user,
            Err(AuthError::NotFound(_)) => return Err(invalid_token()),
            Err(e) => return Err(e),
        };
        if !user.active {
            return Err(invalid_token());
        }

        let roles: Vec<String> = self
            .get_user_roles(&user.id)?
            .into_iter()
            .map(|r| r.name)
            .collect();

        self.issue_access_token(&user, &roles)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock skew allowance: an expired token is expired.
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| invalid_token())
    }
}

fn invalid_token() -> AuthError {
    AuthError::Unauthorized("invalid token".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::model::{CreateUser, RequestContext, User};
    use crate::service::test_support::{test_service, test_service_with};
    use crate::service::{AuthConfig, AuthError, AuthService};

    fn make_user(svc: &Arc<AuthService>) -> User {
        svc.create_user(
            &RequestContext::default(),
            &CreateUser {
                email: "a@x.com".to_string(),
                name: None,
                password: "hunter22".to_string(),
                active: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let svc = test_service();
        let user = make_user(&svc);

        let (token, ttl) = svc
            .issue_access_token(&user, &["viewer".to_string()])
            .unwrap();
        assert_eq!(ttl, 900);

        let claims = svc.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
        assert_eq!(claims.roles, ["viewer"]);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_refresh_token_not_accepted_as_access() {
        let svc = test_service();
        let user = make_user(&svc);

        let (refresh, ttl) = svc.issue_refresh_token(&user).unwrap();
        assert_eq!(ttl, 604_800);

        let err = svc.verify_access_token(&refresh);
        assert!(matches!(err, Err(AuthError::Unauthorized(m)) if m == "invalid token"));
    }

    #[test]
    fn test_access_token_not_accepted_for_refresh() {
        let svc = test_service();
        let user = make_user(&svc);

        let (access, _) = svc.issue_access_token(&user, &[]).unwrap();
        let err = svc.refresh_access_token(&access);
        assert!(matches!(err, Err(AuthError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = test_service_with(AuthConfig {
            access_token_ttl: -10,
            ..Default::default()
        });
        let user = make_user(&svc);

        let (token, _) = svc.issue_access_token(&user, &[]).unwrap();
        let err = svc.verify_access_token(&token);
        assert!(matches!(err, Err(AuthError::Unauthorized(m)) if m == "invalid token"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let svc = test_service();
        let other = test_service_with(AuthConfig {
            jwt_secret: "a-different-secret".to_string(),
            ..Default::default()
        });
        let user = make_user(&svc);

        let (token, _) = svc.issue_access_token(&user, &[]).unwrap();
        assert!(other.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_refresh_recomputes_roles() {
        let svc = test_service();
        let ctx = RequestContext::default();
        let user = make_user(&svc);
        svc.create_role(
            &ctx,
            &crate::model::CreateRole {
                name: "admin".to_string(),
                description: None,
            },
        )
        .unwrap();

        let (refresh, _) = svc.issue_refresh_token(&user).unwrap();

        // Role granted after the refresh token was issued.
        svc.set_user_roles(
            &ctx,
            &user.id,
            &[crate::model::RoleRef::Name("admin".to_string())],
        )
        .unwrap();

        let (access, _) = svc.refresh_access_token(&refresh).unwrap();
        let claims = svc.verify_access_token(&access).unwrap();
        assert_eq!(claims.roles, ["admin"]);
    }

    #[test]
    fn test_refresh_rejected_for_inactive_user() {
        let svc = test_service();
        let ctx = RequestContext::default();
        let user = make_user(&svc);

        let (refresh, _) = svc.issue_refresh_token(&user).unwrap();
        svc.update_user(
            &ctx,
            &user.id,
            &crate::model::UpdateUser {
                active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        let err = svc.refresh_access_token(&refresh);
        assert!(matches!(err, Err(AuthError::Unauthorized(_))));
    }
}
