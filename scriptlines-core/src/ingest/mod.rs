//! Ingestion layer for script collections
//!
//! This module turns folders of raw scripts into stored episodes, characters
//! and lines.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Script folder  │ ──► │ IngestCoordinator│ ──► │   ScriptSink    │
//! │ (./scripts/tng) │     │                  │     │   (Database)    │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//!                               │
//!                               ▼
//!                    ┌──────────────────────┐
//!                    │  ScriptParser        │
//!                    │  └─ PatternSet       │
//!                    │     (line classifier)│
//!                    └──────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scriptlines_core::ingest::{Collection, IngestCoordinator, PatternSet};
//! use scriptlines_core::{Database, Show};
//!
//! let mut db = Database::open(&path)?;
//! db.init_schema()?;
//!
//! let coordinator = IngestCoordinator::new(PatternSet::new()?);
//! let collection = Collection::new(Show::Tng, "./scripts/tng");
//! let result = coordinator.ingest_collection(&mut db, &collection)?;
//! println!("{} lines, {} empty", result.lines_recorded, result.empty_lines());
//! ```

mod classifier;
mod script;
mod sink;
mod source;

pub use classifier::{LineKind, PatternConfig, PatternSet};
pub use script::{parse_lines, parse_script, Block, ParserState, ScriptParser};
pub use sink::ScriptSink;
pub use source::{discover, episode_numbers, read_script, ScriptFile};

use crate::config::{CollectionConfig, Config};
use crate::error::{Error, Result};
use crate::types::{EpisodeKey, Show};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A folder of scripts belonging to one show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub show: Show,
    pub folder: PathBuf,
    /// Glob pattern for script files within the folder
    pub pattern: String,
}

impl Collection {
    pub fn new(show: Show, folder: impl Into<PathBuf>) -> Self {
        Self {
            show,
            folder: folder.into(),
            pattern: "*".to_string(),
        }
    }

    /// Collection whose show is derived from the folder name.
    pub fn from_folder(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = folder.into();
        let show = Show::from_folder(&folder)?;
        Ok(Self::new(show, folder))
    }

    pub fn from_config(config: &CollectionConfig) -> Result<Self> {
        let show = match config.show {
            Some(show) => show,
            None => Show::from_folder(&config.path)?,
        };
        Ok(Self::new(show, config.path.clone()).with_pattern(config.pattern.clone()))
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }
}

impl std::str::FromStr for Collection {
    type Err = Error;

    /// Parses `SHOW=DIR`, or a bare `DIR` named after its show.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((show, folder)) => Ok(Self::new(show.parse()?, folder)),
            None => Self::from_folder(s),
        }
    }
}

/// Reason a file was not ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// File name lacks season and episode digit runs
    InvalidFilename,
    /// Episode already has stored lines and reingest is off
    AlreadyIngested { episode_id: i64, existing_lines: i64 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidFilename => write!(f, "no season/episode numbers in file name"),
            SkipReason::AlreadyIngested {
                episode_id,
                existing_lines,
            } => write!(
                f,
                "episode {} already has {} lines",
                episode_id, existing_lines
            ),
        }
    }
}

/// Result of ingesting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileIngestResult {
    pub path: PathBuf,
    /// Episode key, when the file name carried one
    pub episode: Option<EpisodeKey>,
    pub episode_id: Option<i64>,
    pub title: Option<String>,
    pub lines_recorded: usize,
    /// Ids of stored lines whose text is empty
    pub empty_line_ids: Vec<i64>,
    pub skip_reason: Option<SkipReason>,
}

impl FileIngestResult {
    fn skipped(path: &Path, reason: SkipReason) -> Self {
        Self {
            path: path.to_path_buf(),
            episode: None,
            episode_id: None,
            title: None,
            lines_recorded: 0,
            empty_line_ids: Vec::new(),
            skip_reason: Some(reason),
        }
    }
}

/// Result of ingesting one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResult {
    pub show: Show,
    pub folder: PathBuf,
    /// Number of files whose lines were stored
    pub files_processed: usize,
    /// Files passed over, with the reason
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub lines_recorded: usize,
    /// Ids of stored lines whose text is empty
    pub empty_line_ids: Vec<i64>,
    pub elapsed: Duration,
}

impl CollectionResult {
    fn new(collection: &Collection) -> Self {
        Self {
            show: collection.show,
            folder: collection.folder.clone(),
            files_processed: 0,
            skipped: Vec::new(),
            lines_recorded: 0,
            empty_line_ids: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Empty-text lines produced by this collection
    pub fn empty_lines(&self) -> usize {
        self.empty_line_ids.len()
    }

    fn update(&mut self, file_result: FileIngestResult) {
        match file_result.skip_reason {
            Some(reason) => {
                tracing::debug!(
                    path = %file_result.path.display(),
                    reason = %reason,
                    "File skipped"
                );
                self.skipped.push((file_result.path, reason));
            }
            None => {
                self.files_processed += 1;
                self.lines_recorded += file_result.lines_recorded;
                self.empty_line_ids.extend(file_result.empty_line_ids);
            }
        }
    }
}

/// Result of a run across several collections.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub collections: Vec<CollectionResult>,
}

impl IngestReport {
    pub fn files_processed(&self) -> usize {
        self.collections.iter().map(|c| c.files_processed).sum()
    }

    pub fn lines_recorded(&self) -> usize {
        self.collections.iter().map(|c| c.lines_recorded).sum()
    }

    pub fn empty_lines(&self) -> usize {
        self.collections.iter().map(|c| c.empty_lines()).sum()
    }
}

/// Coordinates parsing and storage of script collections.
///
/// The coordinator is responsible for:
/// - Discovering script files in lexicographic order
/// - Deriving episode keys from file names
/// - Running the script parser over each file
/// - Handing records to the sink, one batch per collection
pub struct IngestCoordinator {
    patterns: PatternSet,
    reingest: bool,
}

impl IngestCoordinator {
    /// Create a coordinator with the given patterns.
    pub fn new(patterns: PatternSet) -> Self {
        Self {
            patterns,
            reingest: false,
        }
    }

    /// Create a coordinator from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let patterns = PatternSet::compile(&config.patterns)?;
        Ok(Self::new(patterns).with_reingest(config.ingest.reingest))
    }

    /// Store lines again for episodes that already have some.
    pub fn with_reingest(mut self, reingest: bool) -> Self {
        self.reingest = reingest;
        self
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Ingest every collection in order.
    ///
    /// Stops at the first sink or I/O error; earlier collections stay committed.
    pub fn ingest_all<S>(&self, sink: &mut S, collections: &[Collection]) -> Result<IngestReport>
    where
        S: ScriptSink + ?Sized,
    {
        let mut report = IngestReport::default();
        for collection in collections {
            report
                .collections
                .push(self.ingest_collection(sink, collection)?);
        }
        Ok(report)
    }

    pub fn ingest_collection<S>(
        &self,
        sink: &mut S,
        collection: &Collection,
    ) -> Result<CollectionResult>
    where
        S: ScriptSink + ?Sized,
    {
        self.ingest_collection_with_progress(sink, collection, |_, _, _| {})
    }

    /// Ingest one collection with progress callback.
    ///
    /// The callback receives `(current_file_index, total_files, file_path)` before
    /// each file is processed.
    pub fn ingest_collection_with_progress<S, F>(
        &self,
        sink: &mut S,
        collection: &Collection,
        mut on_progress: F,
    ) -> Result<CollectionResult>
    where
        S: ScriptSink + ?Sized,
        F: FnMut(usize, usize, &Path),
    {
        let started = Instant::now();

        if !collection.folder.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("collection folder not found: {}", collection.folder.display()),
            )));
        }

        let files = discover(&collection.folder, &collection.pattern)?;
        let total = files.len();
        let mut result = CollectionResult::new(collection);

        tracing::info!(
            show = %collection.show,
            folder = %collection.folder.display(),
            count = total,
            "Discovered script files"
        );

        sink.begin_batch()?;
        for (i, path) in files.iter().enumerate() {
            on_progress(i, total, path);
            let file_result = self.ingest_file(sink, collection.show, path)?;
            result.update(file_result);
        }
        sink.commit_batch()?;

        result.elapsed = started.elapsed();

        tracing::info!(
            show = %collection.show,
            files_processed = result.files_processed,
            files_skipped = result.skipped.len(),
            lines_recorded = result.lines_recorded,
            empty_lines = result.empty_lines(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Collection ingested"
        );

        Ok(result)
    }

    /// Parse one script file and store its records.
    pub fn ingest_file<S>(&self, sink: &mut S, show: Show, path: &Path) -> Result<FileIngestResult>
    where
        S: ScriptSink + ?Sized,
    {
        let Some(file) = ScriptFile::from_path(path) else {
            tracing::warn!(path = %path.display(), "No season/episode numbers in file name");
            return Ok(FileIngestResult::skipped(path, SkipReason::InvalidFilename));
        };

        let key = EpisodeKey::new(show, file.season, file.number);
        let text = read_script(path)?;
        let parsed = parse_script(&self.patterns, &text);

        let episode_id = sink.find_or_create_episode(&key, parsed.title.as_deref())?;

        if !self.reingest {
            let existing_lines = sink.count_episode_lines(episode_id)?;
            if existing_lines > 0 {
                let mut skipped = FileIngestResult::skipped(
                    path,
                    SkipReason::AlreadyIngested {
                        episode_id,
                        existing_lines,
                    },
                );
                skipped.episode = Some(key);
                skipped.episode_id = Some(episode_id);
                skipped.title = parsed.title;
                return Ok(skipped);
            }
        }

        let mut empty_line_ids = Vec::new();
        for utterance in &parsed.utterances {
            let character_id = sink.find_or_create_character(&utterance.character)?;
            let line_id = sink.record_line(episode_id, character_id, &utterance.text)?;
            if utterance.is_empty() {
                tracing::info!(
                    line_id,
                    episode = %key,
                    character = %utterance.character,
                    "Empty line recorded"
                );
                empty_line_ids.push(line_id);
            }
        }

        tracing::debug!(
            episode = %key,
            title = parsed.title.as_deref().unwrap_or(""),
            lines = parsed.utterances.len(),
            "Script ingested"
        );

        Ok(FileIngestResult {
            path: path.to_path_buf(),
            episode: Some(key),
            episode_id: Some(episode_id),
            title: parsed.title,
            lines_recorded: parsed.utterances.len(),
            empty_line_ids,
            skip_reason: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// In-memory sink keyed like the database.
    #[derive(Default)]
    struct MemorySink {
        episodes: HashMap<EpisodeKey, (i64, Option<String>)>,
        characters: HashMap<String, i64>,
        lines: Vec<(i64, i64, String)>,
        batches: usize,
    }

    impl ScriptSink for MemorySink {
        fn find_or_create_episode(&mut self, key: &EpisodeKey, title: Option<&str>) -> Result<i64> {
            let next = self.episodes.len() as i64 + 1;
            Ok(self
                .episodes
                .entry(*key)
                .or_insert_with(|| (next, title.map(str::to_string)))
                .0)
        }

        fn find_or_create_character(&mut self, name: &str) -> Result<i64> {
            let next = self.characters.len() as i64 + 1;
            Ok(*self.characters.entry(name.to_string()).or_insert(next))
        }

        fn record_line(&mut self, episode_id: i64, character_id: i64, text: &str) -> Result<i64> {
            self.lines.push((episode_id, character_id, text.to_string()));
            Ok(self.lines.len() as i64)
        }

        fn count_episode_lines(&mut self, episode_id: i64) -> Result<i64> {
            Ok(self.lines.iter().filter(|l| l.0 == episode_id).count() as i64)
        }

        fn commit_batch(&mut self) -> Result<()> {
            self.batches += 1;
            Ok(())
        }
    }

    const SCRIPT: &str = "\t\t\"Encounter at Farpoint\"\n\
        \n\
        \t\t\t\t\tPICARD\n\
        \n\
        \t\t\tMake it so.\n\
        \n\
        \t\t\t\t\tDATA (V.O.)\n\
        \n\
        \n\
        \t\t\t\t\tPICARD'S VOICE\n\
        \t\t\tEngage.\n";

    fn write_collection(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("tng");
        fs::create_dir(&folder).unwrap();
        for name in names {
            fs::write(folder.join(name), SCRIPT).unwrap();
        }
        dir
    }

    #[test]
    fn test_collection_from_str() {
        let c: Collection = "DS9=/data/deep".parse().unwrap();
        assert_eq!(c.show, Show::Ds9);
        assert_eq!(c.folder, PathBuf::from("/data/deep"));

        let c: Collection = "./scripts/dsn".parse().unwrap();
        assert_eq!(c.show, Show::Ds9);
        assert_eq!(c.pattern, "*");

        assert!("XYZ=/tmp".parse::<Collection>().is_err());
    }

    #[test]
    fn test_ingest_file_records_lines() {
        let dir = write_collection(&["tng_s01e01.txt"]);
        let path = dir.path().join("tng/tng_s01e01.txt");
        let coordinator = IngestCoordinator::new(PatternSet::new().unwrap());
        let mut sink = MemorySink::default();

        let result = coordinator.ingest_file(&mut sink, Show::Tng, &path).unwrap();

        assert_eq!(result.episode, Some(EpisodeKey::new(Show::Tng, 1, 1)));
        assert_eq!(result.title.as_deref(), Some("Encounter at Farpoint"));
        assert_eq!(result.lines_recorded, 3);
        assert_eq!(result.empty_line_ids, vec![2]);

        assert_eq!(sink.characters.len(), 2);
        let texts: Vec<_> = sink.lines.iter().map(|l| l.2.as_str()).collect();
        assert_eq!(texts, ["Make it so.", "", "Engage."]);
    }

    #[test]
    fn test_invalid_filename_skipped() {
        let dir = write_collection(&["README.txt", "tng_s01e02.txt"]);
        let coordinator = IngestCoordinator::new(PatternSet::new().unwrap());
        let mut sink = MemorySink::default();
        let collection = Collection::new(Show::Tng, dir.path().join("tng"));

        let result = coordinator.ingest_collection(&mut sink, &collection).unwrap();

        assert_eq!(result.files_processed, 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].1, SkipReason::InvalidFilename);
        assert_eq!(sink.batches, 1);
    }

    #[test]
    fn test_rerun_skips_ingested_episodes() {
        let dir = write_collection(&["tng_s01e01.txt", "tng_s01e02.txt"]);
        let coordinator = IngestCoordinator::new(PatternSet::new().unwrap());
        let mut sink = MemorySink::default();
        let collection = Collection::new(Show::Tng, dir.path().join("tng"));

        let first = coordinator.ingest_collection(&mut sink, &collection).unwrap();
        let second = coordinator.ingest_collection(&mut sink, &collection).unwrap();

        assert_eq!(first.lines_recorded, 6);
        assert_eq!(first.empty_lines(), 2);
        assert_eq!(second.files_processed, 0);
        assert_eq!(second.skipped.len(), 2);
        assert_eq!(sink.episodes.len(), 2);
        assert_eq!(sink.characters.len(), 2);
        assert_eq!(sink.lines.len(), 6);
    }

    #[test]
    fn test_reingest_records_again_without_duplicate_keys() {
        let dir = write_collection(&["tng_s01e01.txt"]);
        let coordinator = IngestCoordinator::new(PatternSet::new().unwrap()).with_reingest(true);
        let mut sink = MemorySink::default();
        let collection = Collection::new(Show::Tng, dir.path().join("tng"));

        coordinator.ingest_collection(&mut sink, &collection).unwrap();
        let second = coordinator.ingest_collection(&mut sink, &collection).unwrap();

        assert_eq!(second.files_processed, 1);
        assert_eq!(sink.episodes.len(), 1);
        assert_eq!(sink.characters.len(), 2);
        assert_eq!(sink.lines.len(), 6);
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let coordinator = IngestCoordinator::new(PatternSet::new().unwrap());
        let mut sink = MemorySink::default();
        let collection = Collection::new(Show::Ds9, "/nonexistent/scripts/dsn");

        let err = coordinator
            .ingest_collection(&mut sink, &collection)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_progress_reports_every_file() {
        let dir = write_collection(&["tng_s01e02.txt", "tng_s01e01.txt"]);
        let coordinator = IngestCoordinator::new(PatternSet::new().unwrap());
        let mut sink = MemorySink::default();
        let collection = Collection::new(Show::Tng, dir.path().join("tng"));

        let mut seen = Vec::new();
        coordinator
            .ingest_collection_with_progress(&mut sink, &collection, |i, total, path| {
                seen.push((i, total, path.file_name().unwrap().to_owned()));
            })
            .unwrap();

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, 0);
        assert_eq!(seen[0].1, 2);
        assert_eq!(seen[0].2, "tng_s01e01.txt");
    }
}
