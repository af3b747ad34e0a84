use serde::{Deserialize, Serialize};

/// Claim set value for access tokens.
pub const TOKEN_TYPE_ACCESS: &str = "access";
/// Claim set value for refresh tokens.
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// JWT claims payload.
///
/// Access tokens carry the email and current role names; refresh tokens
/// carry only the subject. The `typ` tag keeps the two verification
/// paths from accepting each other's tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id.
    pub sub: String,

    /// Email (access tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role names at issuance (access tokens only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Token kind: "access" or "refresh".
    pub typ: String,

    /// Issued at (unix timestamp).
    pub iat: i64,

    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// Body of `POST /login` and `POST /register`.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}
