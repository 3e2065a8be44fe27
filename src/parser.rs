use crate::attributes::{parse_attributes, AttributeGrammar};
use crate::error::{record, Diagnostic, Error, MalformedAttribute, Result};
use crate::lexer::{lex, LineKind, RawLine};
use crate::playlist::{Assembler, Playlist, PlaylistShape, PlaylistVersion, SUPPORTED_ASSEMBLERS};
use crate::tags::{lookup, Entry, ShapeRole, Tag, EXTM3U};

use nom::bytes::complete::take_till1;
use nom::character::complete::char;
use nom::combinator::{opt, rest};
use nom::sequence::{pair, preceded};
use nom::IResult;
use std::io;
use std::io::Read;
use std::str;

/// Parse an m3u8 playlist with the assembler selected by `version`.
///
/// # Examples
///
/// ```
/// use hls_playlist::{Playlist, PlaylistVersion};
///
/// let input = b"#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:9.9,\nfirst.ts\n#EXT-X-ENDLIST\n";
///
/// match hls_playlist::parse_playlist(input, PlaylistVersion::Default) {
///     Ok(Playlist::MasterPlaylist(pl)) => println!("Master playlist:\n{}", pl),
///     Ok(Playlist::MediaPlaylist(pl)) => println!("Media playlist:\n{}", pl),
///     Err(e) => panic!("Parsing error: \n{}", e),
/// }
/// ```
pub fn parse_playlist(input: &[u8], version: PlaylistVersion) -> Result<Playlist> {
    let assembler = resolve_assembler(version)?;
    let text = str::from_utf8(input).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(build(assembler, text))
}

/// Parse an m3u8 playlist that is already a string.
pub fn parse_playlist_str(input: &str, version: PlaylistVersion) -> Result<Playlist> {
    let assembler = resolve_assembler(version)?;
    Ok(build(assembler, input))
}

/// Read `reader` to the end, then parse it.
///
/// The version is resolved first, so an unsupported request never touches the reader.
///
/// ```no_run
/// use hls_playlist::PlaylistVersion;
///
/// let file = std::fs::File::open("playlist.m3u8").unwrap();
/// let playlist = hls_playlist::parse_playlist_from_reader(file, PlaylistVersion::V12).unwrap();
/// println!("{}", playlist);
/// ```
pub fn parse_playlist_from_reader<R: Read>(
    mut reader: R,
    version: PlaylistVersion,
) -> Result<Playlist> {
    let assembler = resolve_assembler(version)?;
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(build(assembler, &text))
}

/// Picks the assembler for a requested version. `Default` resolves to the newest one.
pub fn resolve_assembler(version: PlaylistVersion) -> Result<Assembler> {
    match version {
        PlaylistVersion::Default => Ok(Assembler::LATEST),
        PlaylistVersion::Explicit(n) => SUPPORTED_ASSEMBLERS
            .iter()
            .find(|(supported, _)| *supported == n)
            .map(|(_, assembler)| *assembler)
            .ok_or(Error::UnsupportedVersion(n)),
    }
}

fn build(assembler: Assembler, text: &str) -> Playlist {
    let (entries, mut diagnostics) = parse_tags(text);

    let evidence = ShapeEvidence::scan(&entries);
    if let Some(ambiguity) = evidence.ambiguity() {
        record(&mut diagnostics, ambiguity);
    }
    let shape = evidence.shape();

    log::debug!(
        "assembling {:?} playlist from {} entries with {:?}",
        shape,
        entries.len(),
        assembler
    );
    assembler.assemble(shape, entries, diagnostics)
}

/// Lex `input` and turn every directive and URI line into an [`Entry`].
///
/// Comments and blank lines are dropped. Directives whose attributes cannot be parsed
/// are kept with their raw text and reported in the returned diagnostics.
pub fn parse_tags(input: &str) -> (Vec<Entry>, Vec<Diagnostic>) {
    let mut entries = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen_content = false;

    for line in lex(input) {
        match line.kind {
            LineKind::Tag => {
                let (tag, error) = parse_tag(&line);
                if !seen_content && tag.name != EXTM3U {
                    record(&mut diagnostics, Diagnostic::MissingHeader);
                }
                if let Some(error) = error {
                    record(
                        &mut diagnostics,
                        Diagnostic::MalformedAttribute {
                            line: line.number,
                            tag: tag.name.clone(),
                            error,
                        },
                    );
                }
                entries.push(Entry::Tag(tag));
            }
            LineKind::Uri => {
                if !seen_content {
                    record(&mut diagnostics, Diagnostic::MissingHeader);
                }
                entries.push(Entry::Uri {
                    uri: line.text.to_string(),
                    line: line.number,
                });
            }
            LineKind::Comment => {
                if !seen_content {
                    record(&mut diagnostics, Diagnostic::MissingHeader);
                }
            }
            LineKind::Blank => continue,
        }
        seen_content = true;
    }

    (entries, diagnostics)
}

/// Splits a directive line into its name and attribute text, then parses the
/// attributes under the grammar registered for the name.
fn parse_tag(line: &RawLine) -> (Tag, Option<MalformedAttribute>) {
    let (name, text) = match directive(line.text) {
        Ok((_, (name, text))) => (name.trim_end(), text),
        Err(_) => (line.text.trim_start_matches('#'), None),
    };

    let grammar = lookup(name).map_or(AttributeGrammar::Opaque, |d| d.grammar);
    let (attributes, error) = match parse_attributes(grammar, text) {
        Ok(attributes) => (attributes, None),
        Err(error) => (Vec::new(), Some(error)),
    };

    let tag = Tag {
        name: name.to_string(),
        rest: text.map(String::from),
        line: line.number,
        attributes,
    };
    (tag, error)
}

fn directive(i: &str) -> IResult<&str, (&str, Option<&str>)> {
    preceded(
        char('#'),
        pair(take_till1(|c: char| c == ':'), opt(preceded(char(':'), rest))),
    )(i)
}

// -----------------------------------------------------------------------------------------------
// Classification
// -----------------------------------------------------------------------------------------------

/// Master if any stream-variant directive is present, otherwise media.
pub fn classify(entries: &[Entry]) -> PlaylistShape {
    let has_variant = entries
        .iter()
        .filter_map(Entry::as_tag)
        .any(|tag| tag.role() == ShapeRole::Variant);

    if has_variant {
        PlaylistShape::Master
    } else {
        PlaylistShape::Media
    }
}

/// The first stream-variant and the first media-only directive of a playlist.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShapeEvidence<'a> {
    pub variant: Option<&'a Tag>,
    pub media: Option<&'a Tag>,
}

impl<'a> ShapeEvidence<'a> {
    pub fn scan(entries: &'a [Entry]) -> ShapeEvidence<'a> {
        let mut evidence = ShapeEvidence::default();

        for tag in entries.iter().filter_map(Entry::as_tag) {
            match tag.role() {
                ShapeRole::Variant if evidence.variant.is_none() => evidence.variant = Some(tag),
                ShapeRole::Media if evidence.media.is_none() => evidence.media = Some(tag),
                _ => (),
            }
            if evidence.variant.is_some() && evidence.media.is_some() {
                break;
            }
        }

        evidence
    }

    /// Stream-variant directives take precedence over media directives.
    pub fn shape(&self) -> PlaylistShape {
        match self.variant {
            Some(_) => PlaylistShape::Master,
            None => PlaylistShape::Media,
        }
    }

    pub fn ambiguity(&self) -> Option<Diagnostic> {
        match (self.variant, self.media) {
            (Some(variant), Some(media)) => Some(Diagnostic::AmbiguousShape {
                variant_line: variant.line,
                media_line: media.line,
            }),
            _ => None,
        }
    }
}

/// When a stream-variant tag is found, this returns true. Media tags, unknown tags
/// and invalid UTF-8 all count as "not a master playlist".
pub fn is_master_playlist(input: &[u8]) -> bool {
    let text = match str::from_utf8(input) {
        Ok(text) => text,
        Err(_) => return false,
    };

    lex(text)
        .filter(|line| line.kind == LineKind::Tag)
        .filter_map(|line| directive(line.text).ok().map(|(_, (name, _))| name.trim_end()))
        .any(|name| lookup(name).map_or(false, |d| d.role == ShapeRole::Variant))
}
