//! # scriptlines-core
//!
//! Core library for scriptlines - extracting speakers and dialogue from
//! plain-text television scripts.
//!
//! This library provides:
//! - Domain types for shows, episodes, characters and lines
//! - A structural line classifier and the script parser state machine
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three stages:
//! - **Classify:** each raw line is tagged by its tab indentation (cue, dialogue, parenthetical)
//! - **Parse:** a state machine accumulates dialogue per cue into utterances
//! - **Store:** utterances are handed to a [`ScriptSink`](ingest::ScriptSink), deduplicating
//!   episodes and characters by natural key
//!
//! ## Example
//!
//! ```rust,no_run
//! use scriptlines_core::ingest::{parse_script, PatternSet};
//!
//! let patterns = PatternSet::new().expect("patterns compile");
//! let script = parse_script(&patterns, "\t\t\t\t\tPICARD\n\n\t\t\tMake it so.\n\n");
//! assert_eq!(script.utterances[0].character, "PICARD");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use ingest::{Collection, IngestCoordinator, IngestReport};
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod types;
