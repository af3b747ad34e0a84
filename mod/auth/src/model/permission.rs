use serde::{Deserialize, Serialize};

/// An atomic capability, uniquely identified by (resource, action).
///
/// Rendered in APIs as the slug `"resource:action"`, e.g. "menu:usuarios".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Resource part of the key, e.g. "menu".
    pub resource: String,

    /// Action part of the key, e.g. "usuarios".
    pub action: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

impl Permission {
    /// The `"resource:action"` rendering used in APIs and config.
    pub fn slug(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }

    pub fn summary(&self) -> PermissionSummary {
        PermissionSummary {
            id: self.id.clone(),
            resource: self.resource.clone(),
            action: self.action.clone(),
            description: self.description.clone(),
        }
    }
}

/// Permission fields used when a permission appears inside another payload.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionSummary {
    pub id: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

/// Input for creating a new permission.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePermission {
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Query parameters for listing permissions.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionQuery {
    /// Substring match against resource, action, or description.
    #[serde(default)]
    pub q: Option<String>,

    /// Substring match against the resource only.
    #[serde(default)]
    pub resource: Option<String>,

    /// Substring match against the action only.
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub offset: usize,
}

impl Default for PermissionQuery {
    fn default() -> Self {
        Self {
            q: None,
            resource: None,
            action: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> usize {
    50
}
