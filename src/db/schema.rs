//! SQL DDL for the local journal store.
//!
//! Fixed tables are created here. Each collection additionally gets its own
//! vec0 virtual table, created on demand by [`create_vector_table`] because its
//! dimension is only known at `ensure_collection` time.

use rusqlite::{Connection, OptionalExtension};

const SCHEMA_SQL: &str = r#"
-- One row per collection created through ensure_collection
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    dimension INTEGER NOT NULL CHECK(dimension > 0),
    metric TEXT NOT NULL CHECK(metric IN ('cosine')),
    created_at TEXT NOT NULL
);

-- Entry text, stored alongside the vector under the same key
CREATE TABLE IF NOT EXISTS entries (
    collection TEXT NOT NULL REFERENCES collections(name),
    id TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

pub const SCHEMA_VERSION: u32 = 1;

/// Initialize the fixed tables. Idempotent.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Name of the vec0 table holding a collection's vectors.
///
/// Collection names are validated to `[a-z0-9-]`, so the result is a safe identifier.
pub fn vector_table(collection: &str) -> String {
    format!("vec_{}", collection.replace('-', "_"))
}

/// Create the vec0 table for a collection. Idempotent.
pub fn create_vector_table(
    conn: &Connection,
    collection: &str,
    dimension: usize,
) -> rusqlite::Result<()> {
    let sql = format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING vec0(\
            id TEXT PRIMARY KEY, \
            embedding FLOAT[{dimension}] distance_metric=cosine\
        )",
        vector_table(collection)
    );
    conn.execute_batch(&sql)
}

/// Get the stored embedding model identifier, if any.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

/// Set the stored embedding model identifier.
pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('embedding_model', ?1)",
        [model],
    )?;
    Ok(())
}
