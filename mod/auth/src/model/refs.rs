use serde::Deserialize;

/// A reference to a permission as accepted by the replace endpoints.
///
/// Clients may send the slug string `"resource:action"`, an explicit
/// `{"id": ...}`, or the pair `{"resource": ..., "action": ...}`.
/// Resolution to a stored permission id happens in one place
/// (`AuthService::resolve_permission_ref`); an unresolvable reference
/// is a validation error, never a silent skip.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PermissionRef {
    /// `"resource:action"` slug.
    Slug(String),
    /// Reference by stored id.
    Id { id: String },
    /// Reference by the unique (resource, action) pair.
    Pair { resource: String, action: String },
}

/// A reference to a role: its unique name or an explicit id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoleRef {
    /// Role name, e.g. "admin".
    Name(String),
    /// Reference by stored id.
    Id { id: String },
}

/// Body of `POST /roles/{id}/permissions`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRolePermissions {
    pub permissions: Vec<PermissionRef>,
}

/// Body of `POST /users/{userId}/roles`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetUserRoles {
    pub roles: Vec<RoleRef>,
}
