//! Script parser state machine
//!
//! Walks a script line by line and recovers `(character, utterance)` pairs
//! from the classifications produced by [`PatternSet::classify`].
//!
//! ```text
//!              cue (valid name)
//!   ┌───────────┐ ───────────────► ┌───────────┐ ◄─┐ dialogue: append
//!   │ Searching │                  │  InBlock  │ ──┘ parenthetical: skip next blank
//!   └───────────┘ ◄─────────────── └───────────┘     cue: emit, open new block
//!     ▲      │      blank / EOF:
//!     └──────┘      emit utterance
//!   anything else
//! ```
//!
//! Two source quirks are absorbed by a one-shot `skip_blank` flag: some
//! archives put an extra blank line directly after a cue, and many put one
//! after a parenthetical. While the flag is set, the next line never closes
//! the block, even when blank.

use super::classifier::{LineKind, PatternSet};
use crate::types::{ParsedScript, Utterance};

/// Where the parser is within the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserState {
    /// Outside any block, scanning for the next cue
    Searching,
    /// Accumulating dialogue for one character
    InBlock(Block),
}

/// A character block being accumulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub character: String,
    /// Trimmed dialogue fragments in source order
    pub fragments: Vec<String>,
    /// One-shot: the next line cannot end the block
    pub skip_blank: bool,
}

impl Block {
    fn open(character: String) -> Self {
        Self {
            character,
            fragments: Vec::new(),
            skip_blank: true,
        }
    }

    fn into_utterance(self) -> Utterance {
        Utterance {
            character: self.character,
            text: self.fragments.join(" "),
        }
    }
}

/// Incremental script parser.
///
/// Feed raw lines with [`feed`](Self::feed); each closed block comes back as
/// an [`Utterance`]. Call [`finish`](Self::finish) at end of input to flush a
/// block that runs to the last line.
#[derive(Debug)]
pub struct ScriptParser<'p> {
    patterns: &'p PatternSet,
    state: ParserState,
    title: Option<String>,
}

impl<'p> ScriptParser<'p> {
    pub fn new(patterns: &'p PatternSet) -> Self {
        Self {
            patterns,
            state: ParserState::Searching,
            title: None,
        }
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Title from the first line holding a quoted run, once seen.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Process one raw line, returning an utterance if it closed a block.
    ///
    /// A valid cue always opens a new block, even on the line right after
    /// another cue, so a turn missing its trailing blank line is not merged
    /// into the next speaker's.
    pub fn feed(&mut self, line: &str) -> Option<Utterance> {
        if self.title.is_none() {
            self.title = self.patterns.find_title(line).map(str::to_string);
        }

        let kind = self.patterns.classify(line);

        // A cue is checked first in every state
        if let LineKind::CharacterCue(raw) = kind {
            return match self.patterns.cue_name(raw) {
                Some(name) => {
                    let previous =
                        std::mem::replace(&mut self.state, ParserState::InBlock(Block::open(name)));
                    match previous {
                        ParserState::InBlock(block) => {
                            tracing::trace!(
                                character = %block.character,
                                "Cue without separating blank line; closing block"
                            );
                            Some(block.into_utterance())
                        }
                        ParserState::Searching => None,
                    }
                }
                None => {
                    tracing::trace!(cue = raw, "Skipping cue-indented stage direction");
                    if let ParserState::InBlock(block) = &mut self.state {
                        block.skip_blank = false;
                    }
                    None
                }
            };
        }

        let ParserState::InBlock(block) = &mut self.state else {
            return None;
        };

        if block.skip_blank {
            block.skip_blank = false;
        } else if kind == LineKind::Blank {
            return self.close_block();
        }

        match kind {
            LineKind::Dialogue(text) => block.fragments.push(text.trim().to_string()),
            LineKind::Parenthetical => block.skip_blank = true,
            _ => {}
        }
        None
    }

    /// Flush the pending block at end of input.
    pub fn finish(mut self) -> Option<Utterance> {
        self.close_block()
    }

    fn close_block(&mut self) -> Option<Utterance> {
        match std::mem::replace(&mut self.state, ParserState::Searching) {
            ParserState::InBlock(block) => Some(block.into_utterance()),
            ParserState::Searching => None,
        }
    }
}

/// Parse a sequence of raw lines.
pub fn parse_lines<'a, I>(patterns: &PatternSet, lines: I) -> ParsedScript
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parser = ScriptParser::new(patterns);
    let mut utterances = Vec::new();

    for line in lines {
        utterances.extend(parser.feed(line));
    }

    let title = parser.title().map(str::to_string);
    utterances.extend(parser.finish());

    ParsedScript { title, utterances }
}

/// Parse a whole script.
pub fn parse_script(patterns: &PatternSet, text: &str) -> ParsedScript {
    parse_lines(patterns, text.split_inclusive('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str]) -> ParsedScript {
        let patterns = PatternSet::new().unwrap();
        parse_lines(&patterns, lines.iter().copied())
    }

    #[test]
    fn test_simple_block() {
        let script = parse(&["\t\t\t\t\tPICARD\n", "\n", "\t\t\tMake it so.\n", "\n"]);
        assert_eq!(script.utterances, vec![Utterance::new("PICARD", "Make it so.")]);
    }

    #[test]
    fn test_parenthetical_discarded() {
        let script = parse(&[
            "\t\t\t\t\tSISKO\n",
            "\t\t\t\t(stands)\n",
            "\t\t\tEngage.\n",
            "\n",
        ]);
        assert_eq!(script.utterances, vec![Utterance::new("SISKO", "Engage.")]);
    }

    #[test]
    fn test_blank_after_parenthetical_absorbed() {
        let script = parse(&[
            "\t\t\t\t\tKIRA\n",
            "\t\t\tWait.\n",
            "\t\t\t\t(turning)\n",
            "\n",
            "\t\t\tSomething's wrong.\n",
            "\n",
        ]);
        assert_eq!(
            script.utterances,
            vec![Utterance::new("KIRA", "Wait. Something's wrong.")]
        );
    }

    #[test]
    fn test_multi_fragment_join() {
        let script = parse(&[
            "\t\t\t\t\tDATA (V.O.)\n",
            "\t\t\tCaptain's log,  \n",
            " \t\t\tstardate 41153.7.\n",
            "\n",
        ]);
        assert_eq!(
            script.utterances,
            vec![Utterance::new("DATA", "Captain's log, stardate 41153.7.")]
        );
    }

    #[test]
    fn test_colon_cue_is_not_a_block() {
        let script = parse(&[
            "\t\t\t\t\tCOMPUTER VOICE:\n",
            "\t\t\tThis line is orphaned.\n",
            "\n",
        ]);
        assert!(script.utterances.is_empty());
    }

    #[test]
    fn test_colon_cue_inside_block_ignored() {
        let script = parse(&[
            "\t\t\t\t\tWORF\n",
            "\t\t\tShields up.\n",
            "\t\t\t\t\tANGLE ON:\n",
            "\t\t\tNow.\n",
            "\n",
        ]);
        assert_eq!(script.utterances, vec![Utterance::new("WORF", "Shields up. Now.")]);
    }

    #[test]
    fn test_colon_cue_after_cue_consumes_skip() {
        let script = parse(&[
            "\t\t\t\t\tWORF\n",
            "\t\t\t\t\tANGLE ON:\n",
            "\n",
            "\t\t\tStray action text.\n",
            "\n",
        ]);
        assert_eq!(script.utterances, vec![Utterance::new("WORF", "")]);
    }

    #[test]
    fn test_colon_cue_after_parenthetical_consumes_skip() {
        let script = parse(&[
            "\t\t\t\t\tKIRA\n",
            "\t\t\tWait.\n",
            "\t\t\t\t(turns)\n",
            "\t\t\t\t\tCLOSE ON:\n",
            "\n",
            "\t\t\tLater text.\n",
            "\n",
        ]);
        assert_eq!(script.utterances, vec![Utterance::new("KIRA", "Wait.")]);
    }

    #[test]
    fn test_empty_utterance_emitted() {
        let script = parse(&["\t\t\t\t\tRIKER\n", "\n", "\n", "\t\t\t\t\tTROI\n"]);
        assert_eq!(
            script.utterances,
            vec![Utterance::new("RIKER", ""), Utterance::new("TROI", "")]
        );
        assert_eq!(script.empty_count(), 2);
    }

    #[test]
    fn test_eof_flushes_pending_block() {
        let script = parse(&["\t\t\t\t\tQUARK\n", "\t\t\tNo credit.\n"]);
        assert_eq!(script.utterances, vec![Utterance::new("QUARK", "No credit.")]);
    }

    #[test]
    fn test_cue_closes_block_without_blank() {
        let script = parse(&[
            "\t\t\t\t\tODO\n",
            "\t\t\tChangeling.\n",
            "\t\t\t\t\tQUARK\n",
            "\t\t\tGreed.\n",
            "\n",
        ]);
        assert_eq!(
            script.utterances,
            vec![
                Utterance::new("ODO", "Changeling."),
                Utterance::new("QUARK", "Greed."),
            ]
        );
    }

    #[test]
    fn test_other_lines_ignored() {
        let script = parse(&[
            "INT. TEN FORWARD\n",
            "\t\tGuinan pours a drink.\n",
            "\t\t\t\t\tGUINAN\n",
            "\t\t\tListen.\n",
            "\t\tsome stray action\n",
            "\n",
            "\t\t\tnot in a block\n",
        ]);
        assert_eq!(script.utterances, vec![Utterance::new("GUINAN", "Listen.")]);
    }

    #[test]
    fn test_title_from_first_quoted_line() {
        let patterns = PatternSet::new().unwrap();
        let text = "STAR TREK\n\t\"The Best of Both Worlds\"\n\t\"Part II\"\n";
        let script = parse_script(&patterns, text);
        assert_eq!(script.title.as_deref(), Some("The Best of Both Worlds"));
    }

    #[test]
    fn test_title_absent() {
        let patterns = PatternSet::new().unwrap();
        let script = parse_script(&patterns, "no title here\n");
        assert_eq!(script.title, None);
    }

    #[test]
    fn test_parse_script_handles_crlf() {
        let patterns = PatternSet::new().unwrap();
        let text = "\t\t\t\t\tBASHIR\r\n\r\n\t\t\tFascinating.\r\n\r\n";
        let script = parse_script(&patterns, text);
        assert_eq!(script.utterances, vec![Utterance::new("BASHIR", "Fascinating.")]);
    }

    #[test]
    fn test_state_transitions() {
        let patterns = PatternSet::new().unwrap();
        let mut parser = ScriptParser::new(&patterns);
        assert_eq!(parser.state(), &ParserState::Searching);

        assert_eq!(parser.feed("\t\t\t\t\tDAX\n"), None);
        assert!(matches!(parser.state(), ParserState::InBlock(b) if b.skip_blank));

        assert_eq!(parser.feed("\t\t\tJulian.\n"), None);
        assert!(matches!(parser.state(), ParserState::InBlock(b) if !b.skip_blank));

        assert_eq!(
            parser.feed("\n"),
            Some(Utterance::new("DAX", "Julian."))
        );
        assert_eq!(parser.state(), &ParserState::Searching);
        assert_eq!(parser.finish(), None);
    }
}
