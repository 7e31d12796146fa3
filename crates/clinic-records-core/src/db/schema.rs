//! SQLite schema definition.

/// Complete database schema for the clinic record store.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    date TEXT NOT NULL CHECK (length(trim(date)) > 0),
    complaint TEXT,
    diagnosis TEXT,
    treatment TEXT,
    next_visit TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_required_columns_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        // Missing date
        let result = conn.execute("INSERT INTO patients (name) VALUES ('Ali')", []);
        assert!(result.is_err());

        // Blank name
        let result = conn.execute(
            "INSERT INTO patients (name, date) VALUES ('   ', '2025-03-23')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO patients (name, date) VALUES ('Ali', '2025-03-23')",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute("INSERT INTO patients (name, date) VALUES ('A', 'd')", [])
            .unwrap();
        conn.execute("INSERT INTO patients (name, date) VALUES ('B', 'd')", [])
            .unwrap();
        conn.execute("DELETE FROM patients WHERE id = 2", []).unwrap();
        conn.execute("INSERT INTO patients (name, date) VALUES ('C', 'd')", [])
            .unwrap();

        let max_id: i64 = conn
            .query_row("SELECT MAX(id) FROM patients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(max_id, 3);
    }
}
