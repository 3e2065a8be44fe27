//! Failures that abort a parse, and the non-fatal diagnostics collected alongside a
//! successfully assembled playlist.

use std::io;
use thiserror::Error;

/// A failure that prevents a playlist from being produced at all.
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest could not be read, or was not valid UTF-8.
    #[error("failed to read playlist: {0}")]
    StreamRead(#[from] io::Error),

    /// No assembler exists for the explicitly requested version.
    #[error("unsupported playlist version: {0}")]
    UnsupportedVersion(u32),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A single directive's attribute text could not be parsed under its grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} at offset {offset}")]
pub struct MalformedAttribute {
    pub reason: String,
    /// Byte offset into the directive's raw attribute text (`Tag::rest`) where parsing stopped.
    pub offset: usize,
}

impl MalformedAttribute {
    pub(crate) fn new(reason: impl Into<String>, offset: usize) -> MalformedAttribute {
        MalformedAttribute {
            reason: reason.into(),
            offset,
        }
    }
}

/// Non-fatal conditions noticed while parsing. The playlist is still produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("line {line}: malformed attributes on #{tag}: {error}")]
    MalformedAttribute {
        line: usize,
        tag: String,
        error: MalformedAttribute,
    },

    #[error(
        "stream variant on line {variant_line} and media directive on line {media_line}; treating as master playlist"
    )]
    AmbiguousShape {
        variant_line: usize,
        media_line: usize,
    },

    #[error("playlist declares version {declared} but the assembler supports up to {supported}")]
    VersionMismatch { declared: u32, supported: u32 },

    #[error("line {line}: repeated #EXT-X-VERSION ignored")]
    DuplicateVersion { line: usize },

    #[error("playlist does not start with #EXTM3U")]
    MissingHeader,
}

/// Logs `diagnostic` at warn level and keeps it.
pub(crate) fn record(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    log::warn!("{}", diagnostic);
    diagnostics.push(diagnostic);
}
