//! Sink trait abstraction
//!
//! Extracted records are handed to a [`ScriptSink`]. The SQLite
//! [`Database`](crate::db::Database) is the production sink; tests may supply
//! their own.
//!
//! ## Contract
//!
//! 1. **Natural keys**: episodes are unique by `(show, season, number)` and
//!    characters by normalised name. The `find_or_create_*` calls must return
//!    the existing id when the key is already stored.
//! 2. **Referential integrity**: `record_line` is only called with ids
//!    previously returned by this sink.
//! 3. **Batches**: `begin_batch` / `commit_batch` bracket one collection.
//!    They are a performance hint; sinks may ignore them.

use crate::error::Result;
use crate::types::EpisodeKey;

/// Destination for extracted episodes, characters and lines.
pub trait ScriptSink {
    /// Id of the episode with this key, inserting it with `title` if absent.
    ///
    /// An existing episode keeps its stored title.
    fn find_or_create_episode(&mut self, key: &EpisodeKey, title: Option<&str>) -> Result<i64>;

    /// Id of the character with this normalised name, inserting it if absent.
    fn find_or_create_character(&mut self, name: &str) -> Result<i64>;

    /// Store one utterance and return its id.
    fn record_line(&mut self, episode_id: i64, character_id: i64, text: &str) -> Result<i64>;

    /// Number of lines already stored for an episode.
    fn count_episode_lines(&mut self, episode_id: i64) -> Result<i64>;

    /// Start a batch of writes.
    fn begin_batch(&mut self) -> Result<()> {
        Ok(())
    }

    /// Make the current batch durable.
    fn commit_batch(&mut self) -> Result<()> {
        Ok(())
    }
}
