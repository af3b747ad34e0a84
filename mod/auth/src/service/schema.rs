use bt_sql::SQLStore;

use super::AuthError;

/// Create the auth tables if they do not exist.
///
/// Entity tables keep the full record in a JSON `data` column with the
/// lookup keys broken out as indexed columns. Join tables and the audit
/// log are plain relational tables.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), AuthError> {
    const STMTS: &[&str] = &[
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS roles (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS permissions (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            resource TEXT NOT NULL,
            action TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (resource, action)
        )",
        "CREATE TABLE IF NOT EXISTS user_roles (
            user_id TEXT NOT NULL,
            role_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, role_id)
        )",
        "CREATE TABLE IF NOT EXISTS role_permissions (
            role_id TEXT NOT NULL,
            permission_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (role_id, permission_id)
        )",
        "CREATE TABLE IF NOT EXISTS audit_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            action TEXT NOT NULL,
            entity TEXT NOT NULL,
            entity_id TEXT,
            metadata TEXT NOT NULL,
            ip TEXT,
            created_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_user_roles_role ON user_roles (role_id)",
        "CREATE INDEX IF NOT EXISTS idx_role_permissions_perm ON role_permissions (permission_id)",
        "CREATE INDEX IF NOT EXISTS idx_audit_logs_created ON audit_logs (created_at)",
    ];

    for stmt in STMTS {
        sql.exec(stmt, &[])
            .map_err(|e| AuthError::Storage(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use bt_sql::SQLStore;
    use bt_sql::sqlite::SqliteStore;

    use super::init_schema;

    #[test]
    fn test_init_schema_idempotent() {
        let sql = SqliteStore::open_in_memory().unwrap();
        init_schema(&sql).unwrap();
        init_schema(&sql).unwrap();

        let rows = sql
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                &[],
            )
            .unwrap();
        let names: Vec<&str> = rows.iter().filter_map(|r| r.get_str("name")).collect();
        for expected in [
            "audit_logs",
            "permissions",
            "role_permissions",
            "roles",
            "user_roles",
            "users",
        ] {
            assert!(names.contains(&expected), "missing table {expected}");
        }
    }
}
