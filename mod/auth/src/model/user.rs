use serde::{Deserialize, Serialize};

use crate::model::RoleSummary;

/// A user identity with password-based login.
///
/// The full record (including the bcrypt hash) only ever lives in the
/// `data` column; API responses go through [`PublicUser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Email address, lowercased, unique.
    pub email: String,

    /// Login name shown in the UI (defaults to the email).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Bcrypt hash of the password. Absent for accounts that cannot
    /// log in with credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Whether the user account is active.
    #[serde(default = "default_true")]
    pub active: bool,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

impl User {
    /// Projection safe to return from the API (never carries the hash).
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            name: self.name.clone(),
            active: self.active,
        }
    }
}

/// User fields exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub active: bool,
}

/// A user row in admin listings, with its assigned roles.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithRoles {
    #[serde(flatten)]
    pub user: PublicUser,
    pub roles: Vec<RoleSummary>,
}

/// Input for creating a new user (admin surface).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub password: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Input for updating a user. Absent fields are left unchanged;
/// a present `password` rewrites the stored hash.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_true() -> bool {
    true
}
