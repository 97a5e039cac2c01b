//! Database repository layer
//!
//! Provides lookup, insert and query operations for episodes, characters and
//! lines.

use crate::error::{Error, Result};
use crate::ingest::ScriptSink;
use crate::types::*;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

impl ToSql for Show {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Show {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

/// Row counts for each table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalCounts {
    pub episodes: i64,
    pub characters: i64,
    pub lines: i64,
}

/// Database handle over a single SQLite connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self { conn })
    }

    /// Create any missing tables
    pub fn init_schema(&self) -> Result<()> {
        super::schema::create_schema(&self.conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ============================================
    // Batches
    // ============================================

    /// Open a transaction unless one is already open
    pub fn begin_batch(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    /// Commit the open transaction, if any
    pub fn commit_batch(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    // ============================================
    // Episode operations
    // ============================================

    /// Id of the episode with this natural key
    pub fn find_episode_id(&self, key: &EpisodeKey) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM episodes WHERE show = ?1 AND season = ?2 AND number = ?3",
                params![key.show, key.season, key.number],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::from)
    }

    /// Insert an episode unless its key is already stored
    pub fn find_or_create_episode(&self, key: &EpisodeKey, title: Option<&str>) -> Result<i64> {
        if let Some(id) = self.find_episode_id(key)? {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO episodes (show, season, number, title) VALUES (?1, ?2, ?3, ?4)",
            params![key.show, key.season, key.number, title],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, episode = %key, title = title.unwrap_or(""), "Episode created");
        Ok(id)
    }

    pub fn get_episode(&self, key: &EpisodeKey) -> Result<Option<Episode>> {
        self.conn
            .query_row(
                "SELECT * FROM episodes WHERE show = ?1 AND season = ?2 AND number = ?3",
                params![key.show, key.season, key.number],
                Self::row_to_episode,
            )
            .optional()
            .map_err(Error::from)
    }

    /// Episodes ordered by show, season and number
    pub fn list_episodes(&self, show: Option<Show>) -> Result<Vec<Episode>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM episodes
             WHERE ?1 IS NULL OR show = ?1
             ORDER BY show, season, number",
        )?;
        let episodes = stmt
            .query_map([show], Self::row_to_episode)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(episodes)
    }

    fn row_to_episode(row: &Row) -> rusqlite::Result<Episode> {
        Ok(Episode {
            id: row.get("id")?,
            key: EpisodeKey {
                show: row.get("show")?,
                season: row.get("season")?,
                number: row.get("number")?,
            },
            title: row.get("title")?,
        })
    }

    // ============================================
    // Character operations
    // ============================================

    /// Id of the character with this normalised name
    pub fn find_character_id(&self, name: &str) -> Result<Option<i64>> {
        self.conn
            .query_row("SELECT id FROM characters WHERE name = ?", [name], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Error::from)
    }

    /// Insert a character unless the name is already stored
    pub fn find_or_create_character(&self, name: &str) -> Result<i64> {
        if let Some(id) = self.find_character_id(name)? {
            return Ok(id);
        }

        self.conn
            .execute("INSERT INTO characters (name) VALUES (?)", [name])?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, name, "Character created");
        Ok(id)
    }

    pub fn get_character(&self, name: &str) -> Result<Option<Character>> {
        self.conn
            .query_row(
                "SELECT id, name FROM characters WHERE name = ?",
                [name],
                |row| {
                    Ok(Character {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(Error::from)
    }

    /// Characters with the most lines, most frequent first
    pub fn top_characters(&self, limit: usize) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.name, COUNT(l.id) AS line_count
             FROM characters c
             JOIN lines l ON l.character_id = c.id
             GROUP BY c.id
             ORDER BY line_count DESC, c.name
             LIMIT ?",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ============================================
    // Line operations
    // ============================================

    /// Store one utterance
    pub fn record_line(&self, episode_id: i64, character_id: i64, text: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO lines (episode_id, character_id, line) VALUES (?1, ?2, ?3)",
            params![episode_id, character_id, text],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_episode_lines(&self, episode_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM lines WHERE episode_id = ?",
            [episode_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Lines of an episode in insertion order, with speaker names
    pub fn episode_lines(&self, episode_id: i64) -> Result<Vec<LineRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.episode_id, l.character_id, c.name, l.line
             FROM lines l
             JOIN characters c ON c.id = l.character_id
             WHERE l.episode_id = ?
             ORDER BY l.id",
        )?;
        let lines = stmt
            .query_map([episode_id], |row| {
                Ok(LineRecord {
                    id: row.get(0)?,
                    episode_id: row.get(1)?,
                    character_id: row.get(2)?,
                    character: row.get(3)?,
                    text: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lines)
    }

    pub fn count_empty_lines(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM lines WHERE line = ''", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    // ============================================
    // Stats
    // ============================================

    pub fn get_total_counts(&self) -> Result<TotalCounts> {
        let counts = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM episodes),
                (SELECT COUNT(*) FROM characters),
                (SELECT COUNT(*) FROM lines)",
            [],
            |row| {
                Ok(TotalCounts {
                    episodes: row.get(0)?,
                    characters: row.get(1)?,
                    lines: row.get(2)?,
                })
            },
        )?;
        Ok(counts)
    }
}

impl ScriptSink for Database {
    fn find_or_create_episode(&mut self, key: &EpisodeKey, title: Option<&str>) -> Result<i64> {
        Database::find_or_create_episode(self, key, title)
    }

    fn find_or_create_character(&mut self, name: &str) -> Result<i64> {
        Database::find_or_create_character(self, name)
    }

    fn record_line(&mut self, episode_id: i64, character_id: i64, text: &str) -> Result<i64> {
        Database::record_line(self, episode_id, character_id, text)
    }

    fn count_episode_lines(&mut self, episode_id: i64) -> Result<i64> {
        Database::count_episode_lines(self, episode_id)
    }

    fn begin_batch(&mut self) -> Result<()> {
        Database::begin_batch(self)
    }

    fn commit_batch(&mut self) -> Result<()> {
        Database::commit_batch(self)
    }
}
