//! Contains all the structs produced by parsing.
//!
//! The main type here is the `Playlist` enum.
//! Which is either a `MasterPlaylist` or a `MediaPlaylist`.

use crate::attributes::AttributeValue;
use crate::error::{record, Diagnostic, MalformedAttribute};
use crate::tags::{
    Entry, Tag, Version, EXTINF, EXT_X_ENDLIST, EXT_X_I_FRAME_STREAM_INF, EXT_X_MEDIA_SEQUENCE,
    EXT_X_PLAYLIST_TYPE, EXT_X_STREAM_INF, EXT_X_TARGETDURATION, EXT_X_VERSION,
};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// [Playlist](https://tools.ietf.org/html/rfc8216#section-4.1),
/// can either be a `MasterPlaylist` or a `MediaPlaylist`.
///
/// A Playlist is a Media Playlist if all URI lines in the Playlist
/// identify Media Segments.  A Playlist is a Master Playlist if all URI
/// lines in the Playlist identify Media Playlists.  A Playlist MUST be
/// either a Media Playlist or a Master Playlist; all other Playlists are invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    MasterPlaylist(MasterPlaylist),
    MediaPlaylist(MediaPlaylist),
}

/// The two shapes a playlist can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistShape {
    Master,
    Media,
}

impl Playlist {
    fn contents(&self) -> &Contents {
        match self {
            Playlist::MasterPlaylist(pl) => &pl.contents,
            Playlist::MediaPlaylist(pl) => &pl.contents,
        }
    }

    /// The declared `#EXT-X-VERSION`, or the implied version 1.
    pub fn version(&self) -> Version {
        self.contents().version()
    }

    pub fn declared_version(&self) -> Option<Version> {
        self.contents().version
    }

    pub fn is_master_playlist(&self) -> bool {
        matches!(self, Playlist::MasterPlaylist(_))
    }

    pub fn shape(&self) -> PlaylistShape {
        match self {
            Playlist::MasterPlaylist(_) => PlaylistShape::Master,
            Playlist::MediaPlaylist(_) => PlaylistShape::Media,
        }
    }

    /// Every directive and URI line, in manifest order.
    pub fn tags(&self) -> &[Entry] {
        &self.contents().entries
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.contents().diagnostics
    }

    /// The assembler that produced this playlist.
    pub fn assembler(&self) -> Assembler {
        self.contents().assembler
    }

    /// Writes the entries back out, one per line. Directive text is written verbatim.
    pub fn write_to<T: Write>(&self, w: &mut T) -> std::io::Result<()> {
        for entry in self.tags() {
            writeln!(w, "{}", entry)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Contents {
    version: Option<Version>,
    entries: Vec<Entry>,
    diagnostics: Vec<Diagnostic>,
    assembler: Assembler,
}

impl Contents {
    fn version(&self) -> Version {
        self.version.unwrap_or_default()
    }

    fn find(&self, name: &str) -> Option<&Tag> {
        self.entries
            .iter()
            .filter_map(Entry::as_tag)
            .find(|tag| tag.name == name)
    }
}

// -----------------------------------------------------------------------------------------------
// Version selection
// -----------------------------------------------------------------------------------------------

/// Which assembler to run. `Default` always means the newest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistVersion {
    Default,
    Explicit(u32),
}

impl PlaylistVersion {
    pub const V12: PlaylistVersion = PlaylistVersion::Explicit(12);
}

impl Default for PlaylistVersion {
    fn default() -> PlaylistVersion {
        PlaylistVersion::Default
    }
}

impl FromStr for PlaylistVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<PlaylistVersion, String> {
        if s.eq_ignore_ascii_case("default") {
            return Ok(PlaylistVersion::Default);
        }
        s.trim_start_matches(|c: char| c == 'v' || c == 'V')
            .parse()
            .map(PlaylistVersion::Explicit)
            .map_err(|_| format!("Unable to create PlaylistVersion from {:?}", s))
    }
}

impl fmt::Display for PlaylistVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlaylistVersion::Default => write!(f, "default"),
            PlaylistVersion::Explicit(n) => write!(f, "{}", n),
        }
    }
}

/// Assemblers that can be requested by explicit version number, oldest first.
pub(crate) const SUPPORTED_ASSEMBLERS: &[(u32, Assembler)] = &[(12, Assembler::V12)];

/// A version-specific way of turning parsed entries into a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembler {
    V12,
}

impl Assembler {
    /// The last entry of the supported table.
    pub const LATEST: Assembler = SUPPORTED_ASSEMBLERS[SUPPORTED_ASSEMBLERS.len() - 1].1;

    /// Highest protocol version this assembler understands.
    pub fn protocol_version(self) -> u32 {
        match self {
            Assembler::V12 => 12,
        }
    }

    pub fn assemble(
        self,
        shape: PlaylistShape,
        entries: Vec<Entry>,
        diagnostics: Vec<Diagnostic>,
    ) -> Playlist {
        match self {
            Assembler::V12 => assemble_v12(shape, entries, diagnostics),
        }
    }
}

fn assemble_v12(
    shape: PlaylistShape,
    entries: Vec<Entry>,
    mut diagnostics: Vec<Diagnostic>,
) -> Playlist {
    let version = declared_version(&entries, &mut diagnostics);

    if let Some(declared) = version {
        let supported = Assembler::V12.protocol_version();
        if declared.0 > supported {
            record(
                &mut diagnostics,
                Diagnostic::VersionMismatch {
                    declared: declared.0,
                    supported,
                },
            );
        }
    }

    let contents = Contents {
        version,
        entries,
        diagnostics,
        assembler: Assembler::V12,
    };

    match shape {
        PlaylistShape::Master => Playlist::MasterPlaylist(MasterPlaylist { contents }),
        PlaylistShape::Media => Playlist::MediaPlaylist(MediaPlaylist { contents }),
    }
}

/// First well-formed `#EXT-X-VERSION` wins; later ones are reported.
///
/// A version that parsed as an integer but does not fit a `u32` is reported as
/// malformed. Tags without attributes were already reported by the parser.
fn declared_version(entries: &[Entry], diagnostics: &mut Vec<Diagnostic>) -> Option<Version> {
    let mut version = None;

    for tag in entries.iter().filter_map(Entry::as_tag) {
        if tag.name != EXT_X_VERSION {
            continue;
        }
        match (version, Version::from_tag(tag)) {
            (None, Some(v)) => version = Some(v),
            (Some(_), Some(_)) => record(diagnostics, Diagnostic::DuplicateVersion { line: tag.line }),
            (_, None) if !tag.attributes.is_empty() => record(
                diagnostics,
                Diagnostic::MalformedAttribute {
                    line: tag.line,
                    tag: tag.name.clone(),
                    error: MalformedAttribute::new("version out of range", 0),
                },
            ),
            _ => (),
        }
    }

    version
}

// -----------------------------------------------------------------------------------------------
// Master Playlist
// -----------------------------------------------------------------------------------------------

/// A [Master Playlist](https://tools.ietf.org/html/rfc8216#section-4.3.4)
/// provides a set of Variant Streams, each of which
/// describes a different version of the same content.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterPlaylist {
    contents: Contents,
}

impl MasterPlaylist {
    pub fn version(&self) -> Version {
        self.contents.version()
    }

    pub fn tags(&self) -> &[Entry] {
        &self.contents.entries
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.contents.diagnostics
    }

    /// Every `#EXT-X-STREAM-INF` paired with the URI line after it, and every
    /// `#EXT-X-I-FRAME-STREAM-INF` paired with its `URI` attribute.
    pub fn variants(&self) -> Vec<VariantStream<'_>> {
        let mut variants: Vec<VariantStream> = Vec::new();
        let mut pending = None;

        for entry in &self.contents.entries {
            match entry {
                Entry::Tag(tag) if tag.name == EXT_X_STREAM_INF => {
                    pending = Some(variants.len());
                    variants.push(VariantStream {
                        tag,
                        uri: None,
                        is_i_frame: false,
                    });
                }
                Entry::Tag(tag) if tag.name == EXT_X_I_FRAME_STREAM_INF => {
                    variants.push(VariantStream {
                        tag,
                        uri: tag.attribute("URI").and_then(AttributeValue::as_str),
                        is_i_frame: true,
                    });
                }
                Entry::Uri { uri, .. } => {
                    if let Some(index) = pending.take() {
                        variants[index].uri = Some(uri.as_str());
                    }
                }
                _ => (),
            }
        }

        variants
    }
}

/// [`#EXT-X-STREAM-INF:<attribute-list>`](https://tools.ietf.org/html/rfc8216#section-4.3.4.2)
/// [`#EXT-X-I-FRAME-STREAM-INF:<attribute-list>`](https://tools.ietf.org/html/rfc8216#section-4.3.4.3)
///
/// A view over the directive; nothing is copied out of the playlist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantStream<'a> {
    pub tag: &'a Tag,
    pub uri: Option<&'a str>,
    pub is_i_frame: bool,
}

impl<'a> VariantStream<'a> {
    pub fn bandwidth(&self) -> Option<u64> {
        self.tag.attribute("BANDWIDTH").and_then(AttributeValue::as_u64)
    }

    pub fn codecs(&self) -> Option<&'a str> {
        self.tag.attribute("CODECS").and_then(AttributeValue::as_str)
    }

    pub fn resolution(&self) -> Option<(u64, u64)> {
        match self.tag.attribute("RESOLUTION") {
            Some(AttributeValue::Resolution { width, height }) => Some((*width, *height)),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------------------------
// Media Playlist
// -----------------------------------------------------------------------------------------------

/// A [Media Playlist](https://tools.ietf.org/html/rfc8216#section-4.3.3)
/// contains a list of Media Segments, which when played
/// sequentially will play the multimedia presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    contents: Contents,
}

impl MediaPlaylist {
    pub fn version(&self) -> Version {
        self.contents.version()
    }

    pub fn tags(&self) -> &[Entry] {
        &self.contents.entries
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.contents.diagnostics
    }

    /// `#EXT-X-TARGETDURATION:<s>`
    pub fn target_duration(&self) -> Option<f64> {
        self.contents
            .find(EXT_X_TARGETDURATION)
            .and_then(|tag| tag.positional(0))
            .and_then(AttributeValue::as_f64)
    }

    /// `#EXT-X-MEDIA-SEQUENCE:<number>`, 0 when absent.
    pub fn media_sequence(&self) -> u64 {
        self.contents
            .find(EXT_X_MEDIA_SEQUENCE)
            .and_then(|tag| tag.positional(0))
            .and_then(AttributeValue::as_u64)
            .unwrap_or(0)
    }

    /// `#EXT-X-ENDLIST`
    pub fn end_list(&self) -> bool {
        self.contents.find(EXT_X_ENDLIST).is_some()
    }

    /// `#EXT-X-PLAYLIST-TYPE`
    pub fn playlist_type(&self) -> Option<MediaPlaylistType> {
        self.contents
            .find(EXT_X_PLAYLIST_TYPE)
            .and_then(|tag| tag.positional(0))
            .and_then(AttributeValue::as_str)
            .and_then(|s| MediaPlaylistType::from_str(s).ok())
    }

    /// Each URI line together with the directives between it and the previous URI.
    pub fn segments(&self) -> Vec<MediaSegment<'_>> {
        let mut segments = Vec::new();
        let mut tags = Vec::new();

        for entry in &self.contents.entries {
            match entry {
                Entry::Tag(tag) => tags.push(tag),
                Entry::Uri { uri, line } => segments.push(MediaSegment {
                    uri: uri.as_str(),
                    line: *line,
                    tags: std::mem::take(&mut tags),
                }),
            }
        }

        segments
    }
}

/// [`#EXT-X-PLAYLIST-TYPE:<EVENT|VOD>`](https://tools.ietf.org/html/rfc8216#section-4.3.3.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPlaylistType {
    Event,
    Vod,
}

impl FromStr for MediaPlaylistType {
    type Err = String;

    fn from_str(s: &str) -> Result<MediaPlaylistType, String> {
        match s {
            "EVENT" => Ok(MediaPlaylistType::Event),
            "VOD" => Ok(MediaPlaylistType::Vod),
            _ => Err(format!("Unable to create MediaPlaylistType from {:?}", s)),
        }
    }
}

impl fmt::Display for MediaPlaylistType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MediaPlaylistType::Event => write!(f, "EVENT"),
            MediaPlaylistType::Vod => write!(f, "VOD"),
        }
    }
}

/// A [Media Segment](https://tools.ietf.org/html/rfc8216#section-3): a URI line and
/// the directives that apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment<'a> {
    pub uri: &'a str,
    pub line: usize,
    pub tags: Vec<&'a Tag>,
}

impl<'a> MediaSegment<'a> {
    fn extinf(&self) -> Option<&'a Tag> {
        self.tags.iter().rev().copied().find(|tag| tag.name == EXTINF)
    }

    /// `#EXTINF:<duration>,[<title>]`
    pub fn duration(&self) -> Option<f64> {
        self.extinf()
            .and_then(|tag| tag.positional(0))
            .and_then(AttributeValue::as_f64)
    }

    /// `#EXTINF:<duration>,[<title>]`
    pub fn title(&self) -> Option<&'a str> {
        self.extinf()
            .and_then(|tag| tag.positional(1))
            .and_then(AttributeValue::as_str)
    }
}

// -----------------------------------------------------------------------------------------------
// Display
// -----------------------------------------------------------------------------------------------

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Playlist::MasterPlaylist(p) => write!(f, "{}", p),
            Playlist::MediaPlaylist(p) => write!(f, "{}", p),
        }
    }
}

impl fmt::Display for MasterPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let variants = self.variants();
        writeln!(
            f,
            "[Master Playlist, version: {} | {} Streams]",
            self.version(),
            variants.len()
        )?;

        for (i, stream) in variants.iter().enumerate() {
            write!(f, " {} -> ", i + 1)?;
            if stream.is_i_frame {
                write!(f, "[VariantIFrame |")?;
            } else {
                write!(f, "[Variant |")?;
            }
            write!(f, " uri: {:?}", stream.uri)?;
            if let Some(bandwidth) = stream.bandwidth() {
                write!(f, " ~ bandwidth: {}", bandwidth)?;
            }
            writeln!(f, "]")?;
        }

        Ok(())
    }
}

impl fmt::Display for MediaPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let segments = self.segments();
        writeln!(
            f,
            "[Media Playlist, version: {} | duration: {:?} ~ seq: {} ~ type: {:?} ~ segments: {}]",
            self.version(),
            self.target_duration(),
            self.media_sequence(),
            self.playlist_type(),
            segments.len(),
        )?;

        for (i, segment) in segments.iter().enumerate() {
            write!(f, " {} -> [Segment |", i + 1)?;
            if let Some(title) = segment.title() {
                write!(f, " title: {:?} ~", title)?;
            }
            writeln!(f, " duration: {:?} ~ uri: {:?}]", segment.duration(), segment.uri)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attribute;

    fn tag(name: &str, line: usize, attributes: Vec<Attribute>) -> Entry {
        Entry::Tag(Tag {
            name: name.into(),
            rest: None,
            line,
            attributes,
        })
    }

    fn version(n: u64, line: usize) -> Entry {
        tag(
            EXT_X_VERSION,
            line,
            vec![Attribute::positional(AttributeValue::Integer(n))],
        )
    }

    #[test]
    fn playlist_version_from_str() {
        assert_eq!("default".parse::<PlaylistVersion>(), Ok(PlaylistVersion::Default));
        assert_eq!("12".parse::<PlaylistVersion>(), Ok(PlaylistVersion::V12));
        assert_eq!("v7".parse::<PlaylistVersion>(), Ok(PlaylistVersion::Explicit(7)));
        assert!("twelve".parse::<PlaylistVersion>().is_err());
    }

    #[test]
    fn missing_version_is_implied() {
        let pl = Assembler::V12.assemble(PlaylistShape::Media, vec![], vec![]);
        assert_eq!(pl.version(), Version::IMPLIED);
        assert_eq!(pl.declared_version(), None);
        assert_eq!(pl.assembler(), Assembler::V12);
    }

    #[test]
    fn first_version_wins() {
        let pl = Assembler::V12.assemble(
            PlaylistShape::Master,
            vec![version(3, 2), version(4, 3)],
            vec![],
        );
        assert_eq!(pl.version(), Version(3));
        assert_eq!(pl.diagnostics(), &[Diagnostic::DuplicateVersion { line: 3 }][..]);
    }

    #[test]
    fn oversized_version_is_reported() {
        let pl = Assembler::V12.assemble(
            PlaylistShape::Media,
            vec![version(4294967296, 2), version(5, 3)],
            vec![],
        );
        assert_eq!(pl.version(), Version(5));
        assert_eq!(
            pl.diagnostics(),
            &[Diagnostic::MalformedAttribute {
                line: 2,
                tag: EXT_X_VERSION.into(),
                error: MalformedAttribute::new("version out of range", 0),
            }][..]
        );
    }

    #[test]
    fn latest_assembler_is_last_supported() {
        assert_eq!(Some(&(12, Assembler::LATEST)), SUPPORTED_ASSEMBLERS.last());
        assert_eq!(
            Assembler::LATEST.protocol_version(),
            SUPPORTED_ASSEMBLERS[SUPPORTED_ASSEMBLERS.len() - 1].0
        );
    }

    #[test]
    fn newer_declared_version_is_reported() {
        let pl = Assembler::V12.assemble(PlaylistShape::Media, vec![version(13, 2)], vec![]);
        assert_eq!(pl.version(), Version(13));
        assert_eq!(
            pl.diagnostics(),
            &[Diagnostic::VersionMismatch {
                declared: 13,
                supported: 12
            }][..]
        );
    }

    #[test]
    fn shape_is_kept() {
        let master = Assembler::V12.assemble(PlaylistShape::Master, vec![], vec![]);
        assert!(master.is_master_playlist());
        assert_eq!(master.shape(), PlaylistShape::Master);
        let media = Assembler::V12.assemble(PlaylistShape::Media, vec![], vec![]);
        assert!(!media.is_master_playlist());
    }

    #[test]
    fn segments_collect_preceding_tags() {
        let entries = vec![
            tag("EXTM3U", 1, vec![]),
            tag(
                EXTINF,
                2,
                vec![
                    Attribute::positional(AttributeValue::Decimal(9.9)),
                    Attribute::positional(AttributeValue::Token("intro".into())),
                ],
            ),
            Entry::Uri {
                uri: "a.ts".into(),
                line: 3,
            },
            tag(
                EXTINF,
                4,
                vec![Attribute::positional(AttributeValue::Decimal(5.0))],
            ),
            Entry::Uri {
                uri: "b.ts".into(),
                line: 5,
            },
        ];
        let pl = match Assembler::V12.assemble(PlaylistShape::Media, entries, vec![]) {
            Playlist::MediaPlaylist(pl) => pl,
            other => panic!("expected media playlist, got {:?}", other),
        };

        let segments = pl.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].tags.len(), 2);
        assert_eq!(segments[0].duration(), Some(9.9));
        assert_eq!(segments[0].title(), Some("intro"));
        assert_eq!(segments[1].uri, "b.ts");
        assert_eq!(segments[1].title(), None);
    }
}
