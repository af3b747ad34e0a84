use std::sync::Arc;

use bt_core::{new_id, now_rfc3339};
use bt_sql::{SQLStore, Value};
use tracing::warn;

use crate::model::{AuditLog, RequestContext};

use super::{AuthError, AuthService};

impl AuthService {
    /// Record a mutating operation in the audit log.
    ///
    /// Auditing must never fail the operation it describes: write
    /// errors are logged and swallowed. Inside a tokio runtime the
    /// write is pushed to the blocking pool; in plain synchronous
    /// callers (tests, CLI seeding) it runs inline so the entry is
    /// visible as soon as this returns.
    pub fn record_audit(
        self: &Arc<Self>,
        ctx: &RequestContext,
        action: &str,
        entity: &str,
        entity_id: Option<&str>,
        metadata: serde_json::Value,
    ) {
        let entry = AuditLog {
            id: new_id(),
            user_id: ctx.user_id.clone(),
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id: entity_id.map(|s| s.to_string()),
            metadata,
            ip: ctx.ip.clone(),
            created_at: now_rfc3339(),
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let svc = Arc::clone(self);
                handle.spawn_blocking(move || {
                    if let Err(e) = svc.insert_audit_entry(&entry) {
                        warn!(action = %entry.action, error = %e, "audit write failed");
                    }
                });
            }
            Err(_) => {
                if let Err(e) = self.insert_audit_entry(&entry) {
                    warn!(action = %entry.action, error = %e, "audit write failed");
                }
            }
        }
    }

    fn insert_audit_entry(&self, entry: &AuditLog) -> Result<(), AuthError> {
        let metadata = serde_json::to_string(&entry.metadata)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        self.sql
            .exec(
                "INSERT INTO audit_logs \
                 (id, user_id, action, entity, entity_id, metadata, ip, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                &[
                    Value::Text(entry.id.clone()),
                    opt_text(&entry.user_id),
                    Value::Text(entry.action.clone()),
                    Value::Text(entry.entity.clone()),
                    opt_text(&entry.entity_id),
                    Value::Text(metadata),
                    opt_text(&entry.ip),
                    Value::Text(entry.created_at.clone()),
                ],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Most recent audit entries, newest first.
    pub fn list_audit_logs(&self, limit: usize) -> Result<Vec<AuditLog>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT id, user_id, action, entity, entity_id, metadata, ip, created_at \
                 FROM audit_logs ORDER BY created_at DESC, id DESC LIMIT ?1",
                &[Value::Integer(limit as i64)],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let metadata = row
                .get_str("metadata")
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| AuthError::Internal(e.to_string()))?
                .unwrap_or(serde_json::Value::Null);

            entries.push(AuditLog {
                id: row
                    .get_str("id")
                    .ok_or_else(|| AuthError::Internal("missing id column".into()))?
                    .to_string(),
                user_id: row.get_str("user_id").map(|s| s.to_string()),
                action: row
                    .get_str("action")
                    .ok_or_else(|| AuthError::Internal("missing action column".into()))?
                    .to_string(),
                entity: row
                    .get_str("entity")
                    .ok_or_else(|| AuthError::Internal("missing entity column".into()))?
                    .to_string(),
                entity_id: row.get_str("entity_id").map(|s| s.to_string()),
                metadata,
                ip: row.get_str("ip").map(|s| s.to_string()),
                created_at: row
                    .get_str("created_at")
                    .ok_or_else(|| AuthError::Internal("missing created_at column".into()))?
                    .to_string(),
            });
        }
        Ok(entries)
    }
}

fn opt_text(v: &Option<String>) -> Value {
    match v {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::model::{CreateRole, RequestContext};
    use crate::service::test_support::test_service;

    #[test]
    fn test_mutations_are_audited_with_context() {
        let svc = test_service();
        let ctx = RequestContext {
            user_id: Some("admin-1".to_string()),
            ip: Some("10.0.0.7".to_string()),
        };

        let role = svc
            .create_role(
                &ctx,
                &CreateRole {
                    name: "viewer".to_string(),
                    description: None,
                },
            )
            .unwrap();
        svc.delete_role(&ctx, &role.id).unwrap();

        let entries = svc.list_audit_logs(10).unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert_eq!(entries[0].action, "role.delete");
        assert_eq!(entries[1].action, "role.create");
        assert_eq!(entries[0].user_id.as_deref(), Some("admin-1"));
        assert_eq!(entries[0].ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(entries[0].entity_id.as_deref(), Some(role.id.as_str()));
    }

    #[test]
    fn test_anonymous_context_recorded_as_null() {
        let svc = test_service();
        svc.record_audit(
            &RequestContext::default(),
            "user.register",
            "user",
            None,
            json!({}),
        );

        let entries = svc.list_audit_logs(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].user_id.is_none());
        assert!(entries[0].ip.is_none());
    }
}
