//! Database schema definitions
//!
//! Every record is stored as one row per field, keyed by `(key, field)`.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per record field
CREATE TABLE IF NOT EXISTS records (
    key TEXT NOT NULL,
    field TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, field)
);

CREATE INDEX IF NOT EXISTS idx_records_key ON records(key);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
