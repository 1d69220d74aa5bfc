//! SQL DDL for initializing the database schema.

/// SQLite schema includes:
/// - `documents` table (one JSON body per (collection, id))
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Documents (collection-scoped JSON bodies)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL, -- JSON object
    updated_at TEXT NOT NULL, -- RFC3339
    PRIMARY KEY (collection, id)
);
"#;
