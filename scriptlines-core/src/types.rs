//! Core domain types for scriptlines
//!
//! These types describe what is recovered from a script collection and what
//! ends up in the database.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Show** | A series whose scripts form one collection (TNG, DS9, ...) |
//! | **Episode** | One script file, identified by show, season and number |
//! | **Character** | A speaker, identified by normalised upper-case name |
//! | **Cue** | The line introducing a character's turn to speak |
//! | **Utterance** | The joined dialogue of one character block |
//! | **Line** | A stored utterance, linked to its episode and character |

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================
// Show
// ============================================

/// Series a script collection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Show {
    Tos,
    Tas,
    Tng,
    Ds9,
    Voy,
    Ent,
}

impl Show {
    /// All known shows, in broadcast order
    pub const ALL: [Show; 6] = [
        Show::Tos,
        Show::Tas,
        Show::Tng,
        Show::Ds9,
        Show::Voy,
        Show::Ent,
    ];

    /// Returns the code used in database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Show::Tos => "TOS",
            Show::Tas => "TAS",
            Show::Tng => "TNG",
            Show::Ds9 => "DS9",
            Show::Voy => "VOY",
            Show::Ent => "ENT",
        }
    }

    /// Returns the full series title
    pub fn display_name(&self) -> &'static str {
        match self {
            Show::Tos => "The Original Series",
            Show::Tas => "The Animated Series",
            Show::Tng => "The Next Generation",
            Show::Ds9 => "Deep Space Nine",
            Show::Voy => "Voyager",
            Show::Ent => "Enterprise",
        }
    }

    /// Derive the show from the folder holding its scripts.
    ///
    /// Uses the last path component, so `./scripts/tng` maps to TNG. Script
    /// archives abbreviate Deep Space Nine as `dsn`, which is accepted too.
    pub fn from_folder(folder: &Path) -> Result<Self, Error> {
        let name = folder
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::UnknownShow(folder.display().to_string()))?;

        match name.to_ascii_lowercase().as_str() {
            "dsn" => Ok(Show::Ds9),
            other => other.parse(),
        }
    }
}

impl std::fmt::Display for Show {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Show {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Show::ALL
            .into_iter()
            .find(|show| show.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownShow(s.to_string()))
    }
}

// ============================================
// Episode / Character / Line
// ============================================

/// Natural key of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub show: Show,
    /// Season, taken from the first digit run of the file name
    pub season: u32,
    /// Episode within the season, from the second digit run
    pub number: u32,
}

impl EpisodeKey {
    pub fn new(show: Show, season: u32, number: u32) -> Self {
        Self {
            show,
            season,
            number,
        }
    }
}

impl std::fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} s{:02}e{:02}", self.show, self.season, self.number)
    }
}

/// A stored episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Episode {
    pub id: i64,
    pub key: EpisodeKey,
    /// Quoted title found in the script, if any
    pub title: Option<String>,
}

/// A stored speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
}

/// A stored line with its speaker's name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRecord {
    pub id: i64,
    pub episode_id: i64,
    pub character_id: i64,
    pub character: String,
    pub text: String,
}

// ============================================
// Parser output
// ============================================

/// One character block recovered from a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utterance {
    /// Normalised character name
    pub character: String,
    /// Dialogue fragments joined with single spaces; may be empty
    pub text: String,
}

impl Utterance {
    pub fn new(character: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            text: text.into(),
        }
    }

    /// True when the block carried no dialogue at all
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Everything extracted from one script file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedScript {
    pub title: Option<String>,
    /// Utterances in source order
    pub utterances: Vec<Utterance>,
}

impl ParsedScript {
    /// Number of utterances whose text is empty
    pub fn empty_count(&self) -> usize {
        self.utterances.iter().filter(|u| u.is_empty()).count()
    }
}
