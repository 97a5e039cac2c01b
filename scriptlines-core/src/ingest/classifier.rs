//! Structural line classifier
//!
//! Script archives carry no markup; a line's role is encoded only in how many
//! tabs precede it:
//!
//! | Indent | Role |
//! |--------|------|
//! | 5 tabs | character cue (`PICARD`, `DATA (V.O.)`) |
//! | 4 tabs | parenthetical stage direction (`(stands)`) |
//! | 3 tabs, optionally after one space | dialogue |
//! | nothing | blank separator |
//!
//! [`PatternSet::classify`] is a pure function from one raw line to a
//! [`LineKind`]; all state lives in the [script parser](super::script).

use crate::error::{Error, Result};
use regex::Regex;
use serde::Deserialize;

/// Pattern sources, overridable per deployment from `[patterns]` in the config.
///
/// Each pattern is matched against a line with its terminator removed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PatternConfig {
    /// Character cue; capture group 1 is the raw name
    #[serde(default = "default_cue")]
    pub cue: String,

    /// Dialogue; capture group 1 is the spoken text
    #[serde(default = "default_dialogue")]
    pub dialogue: String,

    /// Parenthetical stage direction
    #[serde(default = "default_parenthetical")]
    pub parenthetical: String,

    /// Voice-over and alternate-name annotations removed from cue names
    #[serde(default = "default_annotation")]
    pub annotation: String,

    /// Episode title; capture group 1 is the title without quotes
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            cue: default_cue(),
            dialogue: default_dialogue(),
            parenthetical: default_parenthetical(),
            annotation: default_annotation(),
            title: default_title(),
        }
    }
}

fn default_cue() -> String {
    r"^\t{5}([^\t()\n]+)".to_string()
}

fn default_dialogue() -> String {
    r"^ ?\t{3}([^\t\n]+)".to_string()
}

fn default_parenthetical() -> String {
    r"^\t{4}[^\t\n]".to_string()
}

fn default_annotation() -> String {
    r"(?i)(\s+V\.\s?O\.)|('S?\s.+)|(\s+\(.+\))".to_string()
}

fn default_title() -> String {
    r#""([^"]+)""#.to_string()
}

/// Classification of a single raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Five-tab cue; the name is raw, not yet normalised
    CharacterCue(&'a str),
    /// Three-tab dialogue fragment, untrimmed
    Dialogue(&'a str),
    /// Four-tab stage direction; content is discarded
    Parenthetical,
    /// Nothing but the line terminator
    Blank,
    /// Anything else (scene headings, action, page numbers)
    Other,
}

/// Compiled line patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    cue: Regex,
    dialogue: Regex,
    parenthetical: Regex,
    annotation: Regex,
    title: Regex,
}

impl PatternSet {
    /// Compile the reference patterns.
    pub fn new() -> Result<Self> {
        Self::compile(&PatternConfig::default())
    }

    /// Compile patterns from configuration.
    pub fn compile(config: &PatternConfig) -> Result<Self> {
        Ok(Self {
            cue: compile("cue", &config.cue)?,
            dialogue: compile("dialogue", &config.dialogue)?,
            parenthetical: compile("parenthetical", &config.parenthetical)?,
            annotation: compile("annotation", &config.annotation)?,
            title: compile("title", &config.title)?,
        })
    }

    /// Classify one raw line.
    ///
    /// The line may still carry its `\n` or `\r\n` terminator. Cue indentation
    /// is tested first; the indent depths are disjoint, so at most one of the
    /// remaining patterns can match.
    pub fn classify<'a>(&self, raw_line: &'a str) -> LineKind<'a> {
        let line = strip_terminator(raw_line);

        if line.is_empty() {
            return LineKind::Blank;
        }
        if let Some(name) = capture(&self.cue, line) {
            return LineKind::CharacterCue(name);
        }
        if let Some(text) = capture(&self.dialogue, line) {
            return LineKind::Dialogue(text);
        }
        if self.parenthetical.is_match(line) {
            return LineKind::Parenthetical;
        }
        LineKind::Other
    }

    /// Normalise a raw cue name into a character key.
    ///
    /// Strips voice-over marks, apostrophe suffixes (`PICARD'S VOICE`) and
    /// parenthesised qualifiers, trims, upper-cases and drops trailing periods.
    /// Removing one annotation can expose another, so the steps repeat until
    /// the name stops changing; the result is a fixed point.
    pub fn normalize_name(&self, raw: &str) -> String {
        let mut name = self.normalize_once(raw);
        loop {
            let next = self.normalize_once(&name);
            if next == name {
                return name;
            }
            name = next;
        }
    }

    fn normalize_once(&self, raw: &str) -> String {
        let stripped = self.annotation.replace_all(raw, "");
        stripped
            .trim()
            .to_uppercase()
            .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
            .to_string()
    }

    /// Normalised name for a cue, or `None` when the cue is a false positive.
    ///
    /// Stage directions are often indented like cues (`COMPUTER VOICE:`); a
    /// name ending in `:` or normalising to nothing does not open a block.
    pub fn cue_name(&self, raw: &str) -> Option<String> {
        let name = self.normalize_name(raw);
        if name.is_empty() || name.ends_with(':') {
            None
        } else {
            Some(name)
        }
    }

    /// The first quoted run on a line, without its quotes.
    pub fn find_title<'a>(&self, line: &'a str) -> Option<&'a str> {
        capture(&self.title, line)
    }
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| Error::Pattern { name, source })
}

/// Group 1 if present, otherwise the whole match.
fn capture<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    let caps = re.captures(line)?;
    caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str())
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
