//! Database schema
//!
//! Tables are created with `IF NOT EXISTS` and the layout version is stamped
//! into `PRAGMA user_version`.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS episodes (
    id               INTEGER PRIMARY KEY,
    show             TEXT NOT NULL,
    season           INTEGER NOT NULL,
    number           INTEGER NOT NULL,
    title            TEXT,

    UNIQUE(show, season, number)
);

CREATE TABLE IF NOT EXISTS characters (
    id               INTEGER PRIMARY KEY,
    name             TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS lines (
    id               INTEGER PRIMARY KEY,
    episode_id       INTEGER NOT NULL REFERENCES episodes(id),
    character_id     INTEGER NOT NULL REFERENCES characters(id),
    line             TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lines_episode ON lines(episode_id);
CREATE INDEX IF NOT EXISTS idx_lines_character ON lines(character_id);
"#;

/// Create any missing tables
pub fn create_schema(conn: &Connection) -> crate::error::Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Ensuring database schema"
    );

    conn.execute_batch(SCHEMA)?;

    if current_version < SCHEMA_VERSION {
        conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        tracing::info!(version = SCHEMA_VERSION, "Schema created");
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
