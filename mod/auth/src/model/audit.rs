use serde::{Deserialize, Serialize};

/// An append-only audit record of a mutating operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Actor user id; None for anonymous operations (e.g. registration).
    pub user_id: Option<String>,

    /// Dotted action name, `"<entity>.<operation>"`, e.g. "role.delete".
    pub action: String,

    /// Entity name, e.g. "role".
    pub entity: String,

    /// Id of the affected entity, when there is a single one.
    pub entity_id: Option<String>,

    /// Free-form JSON context.
    pub metadata: serde_json::Value,

    /// Client IP at the time of the request.
    pub ip: Option<String>,

    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Per-request identity and origin, threaded explicitly from the
/// middleware into every mutating service call for audit attribution.
/// Never stored in shared process state.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authenticated user id, when the request carried a valid token.
    pub user_id: Option<String>,

    /// Client IP, when derivable from the request.
    pub ip: Option<String>,
}
