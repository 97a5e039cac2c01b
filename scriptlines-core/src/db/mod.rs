//! Database layer for scriptlines
//!
//! This module provides the storage layer using SQLite with:
//! - Schema creation
//! - Repository pattern for queries
//! - The [`ScriptSink`](crate::ingest::ScriptSink) implementation used by ingestion

pub mod repo;
pub mod schema;

pub use repo::{Database, TotalCounts};
