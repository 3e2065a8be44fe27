//! Splits manifest text into physical lines and classifies each one.
//!
//! The lexer knows nothing about individual directives; it only decides whether a
//! line is a directive, a comment, a URI or blank. Line numbers count every physical
//! line, blanks included, so diagnostics point back at the original manifest.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till};
use nom::combinator::{map, opt};
use nom::sequence::pair;
use nom::IResult;

/// Prefix shared by every directive line.
pub const DIRECTIVE_MARKER: &str = "#EXT";
/// Prefix of comment lines (and of directives).
pub const COMMENT_MARKER: char = '#';

const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Tag,
    Uri,
    Comment,
    Blank,
}

/// One physical line of a manifest, trailing whitespace removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    pub kind: LineKind,
    /// 1-based.
    pub number: usize,
    pub text: &'a str,
}

impl<'a> RawLine<'a> {
    fn classify(number: usize, line: &'a str) -> RawLine<'a> {
        let text = line.trim_end();
        let kind = if text.trim_start().is_empty() {
            LineKind::Blank
        } else if text.starts_with(DIRECTIVE_MARKER) {
            LineKind::Tag
        } else if text.starts_with(COMMENT_MARKER) {
            LineKind::Comment
        } else {
            LineKind::Uri
        };

        RawLine { kind, number, text }
    }
}

/// Lazy iterator over the lines of a manifest. A clone walks the remaining input
/// independently, so cloning the result of [`lex`] gives a fresh pass from the start.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    rest: &'a str,
    number: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = RawLine<'a>;

    fn next(&mut self) -> Option<RawLine<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        let (rest, line) = physical_line(self.rest).ok()?;
        self.rest = rest;
        self.number += 1;
        Some(RawLine::classify(self.number, line))
    }
}

/// Lex `input` into classified lines.
pub fn lex(input: &str) -> Lines<'_> {
    Lines {
        rest: input.strip_prefix(BYTE_ORDER_MARK).unwrap_or(input),
        number: 0,
    }
}

fn physical_line(i: &str) -> IResult<&str, &str> {
    map(
        pair(take_till(|c: char| c == '\r' || c == '\n'), opt(line_ending)),
        |(line, _)| line,
    )(i)
}

// Accepts a lone `\r` as well, which `nom::character::complete::line_ending` rejects.
fn line_ending(i: &str) -> IResult<&str, &str> {
    alt((tag("\r\n"), tag("\n"), tag("\r")))(i)
}
