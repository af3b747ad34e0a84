use serde::{Deserialize, Serialize};

use crate::model::PermissionSummary;

/// A named authorization group, e.g. "admin" or "viewer".
///
/// Permissions are granted through `role_permissions` join rows, not
/// stored on the role itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Globally unique role name.
    pub name: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

impl Role {
    pub fn summary(&self) -> RoleSummary {
        RoleSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Role fields used when a role appears inside another payload.
#[derive(Debug, Clone, Serialize)]
pub struct RoleSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// A role with its granted permissions expanded.
#[derive(Debug, Clone, Serialize)]
pub struct RoleDetail {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<PermissionSummary>,
}

/// Input for creating a new role.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Input for updating a role. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRole {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
