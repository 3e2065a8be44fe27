//! The directive model: [`Tag`], the ordered [`Entry`] sequence a playlist is made of,
//! the promoted [`Version`], and the registry of known directive names.

use self::ShapeRole as R;
use crate::attributes::AttributeGrammar as G;
use crate::attributes::{Attribute, AttributeGrammar, AttributeValue};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;
use std::sync::OnceLock;

pub const EXTM3U: &str = "EXTM3U";
pub const EXT_X_VERSION: &str = "EXT-X-VERSION";
pub const EXT_X_STREAM_INF: &str = "EXT-X-STREAM-INF";
pub const EXT_X_I_FRAME_STREAM_INF: &str = "EXT-X-I-FRAME-STREAM-INF";
pub const EXTINF: &str = "EXTINF";
pub const EXT_X_TARGETDURATION: &str = "EXT-X-TARGETDURATION";
pub const EXT_X_MEDIA_SEQUENCE: &str = "EXT-X-MEDIA-SEQUENCE";
pub const EXT_X_PLAYLIST_TYPE: &str = "EXT-X-PLAYLIST-TYPE";
pub const EXT_X_ENDLIST: &str = "EXT-X-ENDLIST";

/// What a directive says about the shape of the playlist it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRole {
    /// Says nothing about the shape, including master-only directives that do not
    /// reference a playlist, such as `EXT-X-MEDIA`.
    Neutral,
    /// Points at another playlist: only found in master playlists.
    Variant,
    /// Only found in media playlists.
    Media,
}

/// A registered directive: its name, attribute grammar and shape role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagDescriptor {
    pub name: &'static str,
    pub grammar: AttributeGrammar,
    pub role: ShapeRole,
}

const fn descriptor(name: &'static str, grammar: AttributeGrammar, role: ShapeRole) -> TagDescriptor {
    TagDescriptor {
        name,
        grammar,
        role,
    }
}

static KNOWN_TAGS: &[TagDescriptor] = &[
    // Basic
    descriptor(EXTM3U, G::None, R::Neutral),
    descriptor(EXT_X_VERSION, G::Integer, R::Neutral),
    // Media or master
    descriptor("EXT-X-INDEPENDENT-SEGMENTS", G::None, R::Neutral),
    descriptor("EXT-X-START", G::AttributeList, R::Neutral),
    descriptor("EXT-X-DEFINE", G::AttributeList, R::Neutral),
    // Master playlist
    descriptor(EXT_X_STREAM_INF, G::AttributeList, R::Variant),
    descriptor(EXT_X_I_FRAME_STREAM_INF, G::AttributeList, R::Variant),
    descriptor("EXT-X-MEDIA", G::AttributeList, R::Neutral),
    descriptor("EXT-X-SESSION-DATA", G::AttributeList, R::Neutral),
    descriptor("EXT-X-SESSION-KEY", G::AttributeList, R::Neutral),
    descriptor("EXT-X-CONTENT-STEERING", G::AttributeList, R::Neutral),
    // Media playlist
    descriptor(EXT_X_TARGETDURATION, G::Number, R::Media),
    descriptor(EXT_X_MEDIA_SEQUENCE, G::Integer, R::Media),
    descriptor("EXT-X-DISCONTINUITY-SEQUENCE", G::Integer, R::Media),
    descriptor(EXT_X_ENDLIST, G::None, R::Media),
    descriptor(EXT_X_PLAYLIST_TYPE, G::Enumerated, R::Media),
    descriptor("EXT-X-I-FRAMES-ONLY", G::None, R::Media),
    descriptor("EXT-X-ALLOW-CACHE", G::Enumerated, R::Media),
    descriptor("EXT-X-PART-INF", G::AttributeList, R::Media),
    descriptor("EXT-X-SERVER-CONTROL", G::AttributeList, R::Media),
    // Media segment
    descriptor(EXTINF, G::DurationTitle, R::Media),
    descriptor("EXT-X-BYTERANGE", G::ByteRange, R::Media),
    descriptor("EXT-X-DISCONTINUITY", G::None, R::Media),
    descriptor("EXT-X-KEY", G::AttributeList, R::Media),
    descriptor("EXT-X-MAP", G::AttributeList, R::Media),
    descriptor("EXT-X-PROGRAM-DATE-TIME", G::DateTime, R::Media),
    descriptor("EXT-X-DATERANGE", G::AttributeList, R::Media),
    descriptor("EXT-X-GAP", G::None, R::Media),
    descriptor("EXT-X-BITRATE", G::Integer, R::Media),
    descriptor("EXT-X-PART", G::AttributeList, R::Media),
    descriptor("EXT-X-SKIP", G::AttributeList, R::Media),
    descriptor("EXT-X-PRELOAD-HINT", G::AttributeList, R::Media),
    descriptor("EXT-X-RENDITION-REPORT", G::AttributeList, R::Media),
];

fn registry() -> &'static HashMap<&'static str, &'static TagDescriptor> {
    static REGISTRY: OnceLock<HashMap<&'static str, &'static TagDescriptor>> = OnceLock::new();
    REGISTRY.get_or_init(|| KNOWN_TAGS.iter().map(|d| (d.name, d)).collect())
}

/// Looks up a directive by its exact (case-sensitive) name, without the leading `#`.
pub fn lookup(name: &str) -> Option<&'static TagDescriptor> {
    registry().get(name).copied()
}

// -----------------------------------------------------------------------------------------------
// Tag
// -----------------------------------------------------------------------------------------------

/// A single `#EXT...` directive line.
///
/// `rest` is the attribute text exactly as it appeared after the first `:`. When the
/// text could not be parsed, or the directive is unknown, `attributes` is empty and
/// `rest` is the only record of the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Directive name without the leading `#`, e.g. `EXT-X-STREAM-INF`.
    pub name: String,
    pub rest: Option<String>,
    pub line: usize,
    pub attributes: Vec<Attribute>,
}

impl Tag {
    pub fn descriptor(&self) -> Option<&'static TagDescriptor> {
        lookup(&self.name)
    }

    pub fn is_known(&self) -> bool {
        self.descriptor().is_some()
    }

    /// Unknown directives are neutral.
    pub fn role(&self) -> ShapeRole {
        self.descriptor().map_or(ShapeRole::Neutral, |d| d.role)
    }

    /// Value of a `KEY=VALUE` attribute, compared case-insensitively.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.key.as_deref().map_or(false, |k| k.eq_ignore_ascii_case(key)))
            .map(|a| &a.value)
    }

    /// The `index`th positional value.
    pub fn positional(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .filter(|a| a.key.is_none())
            .nth(index)
            .map(|a| &a.value)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.name)?;
        if let Some(rest) = &self.rest {
            write!(f, ":{}", rest)?;
        }
        Ok(())
    }
}

/// One element of a playlist, in manifest order.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Tag(Tag),
    Uri { uri: String, line: usize },
}

impl Entry {
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Entry::Tag(tag) => Some(tag),
            Entry::Uri { .. } => None,
        }
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Entry::Uri { uri, .. } => Some(uri.as_str()),
            Entry::Tag(_) => None,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Entry::Tag(tag) => tag.line,
            Entry::Uri { line, .. } => *line,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Entry::Tag(tag) => write!(f, "{}", tag),
            Entry::Uri { uri, .. } => write!(f, "{}", uri),
        }
    }
}

// -----------------------------------------------------------------------------------------------
// Version
// -----------------------------------------------------------------------------------------------

/// [`#EXT-X-VERSION:<n>`](https://tools.ietf.org/html/rfc8216#section-4.3.1.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub u32);

impl Version {
    /// A playlist without `#EXT-X-VERSION` is protocol version 1.
    pub const IMPLIED: Version = Version(1);

    /// Reads the version out of a parsed `#EXT-X-VERSION` tag.
    pub fn from_tag(tag: &Tag) -> Option<Version> {
        if tag.name != EXT_X_VERSION {
            return None;
        }
        tag.positional(0)
            .and_then(AttributeValue::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .map(Version)
    }
}

impl Default for Version {
    fn default() -> Version {
        Version::IMPLIED
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, attributes: Vec<Attribute>) -> Tag {
        Tag {
            name: name.into(),
            rest: None,
            line: 1,
            attributes,
        }
    }

    #[test]
    fn registry_knows_standard_directives() {
        assert_eq!(lookup("EXT-X-STREAM-INF").map(|d| d.role), Some(ShapeRole::Variant));
        assert_eq!(lookup("EXTINF").map(|d| d.grammar), Some(AttributeGrammar::DurationTitle));
        assert!(lookup("EXT-X-CUE-OUT").is_none());
    }

    #[test]
    fn registry_is_case_sensitive() {
        assert!(lookup("ext-x-version").is_none());
    }

    #[test]
    fn registry_names_are_unique() {
        assert_eq!(registry().len(), KNOWN_TAGS.len());
    }

    #[test]
    fn attribute_lookup_ignores_case() {
        let t = tag(
            EXT_X_STREAM_INF,
            vec![Attribute::named("BANDWIDTH", AttributeValue::Integer(5))],
        );
        assert_eq!(t.attribute("bandwidth"), Some(&AttributeValue::Integer(5)));
        assert_eq!(t.attribute("CODECS"), None);
    }

    #[test]
    fn version_from_tag() {
        let t = tag(
            EXT_X_VERSION,
            vec![Attribute::positional(AttributeValue::Integer(7))],
        );
        assert_eq!(Version::from_tag(&t), Some(Version(7)));
        assert_eq!(Version::from_tag(&tag(EXTINF, vec![])), None);
        assert_eq!(Version::default(), Version(1));
    }

    #[test]
    fn master_only_directives_do_not_decide_shape() {
        assert_eq!(lookup("EXT-X-MEDIA").map(|d| d.role), Some(ShapeRole::Neutral));
        assert_eq!(lookup("EXT-X-SESSION-KEY").map(|d| d.role), Some(ShapeRole::Neutral));
    }

    #[test]
    fn unknown_tag_is_neutral() {
        let t = tag("EXT-X-CUE-IN", vec![]);
        assert!(!t.is_known());
        assert_eq!(t.role(), ShapeRole::Neutral);
    }

    #[test]
    fn display_writes_raw_text() {
        let mut t = tag("EXT-X-CUE-OUT", vec![]);
        assert_eq!(t.to_string(), "#EXT-X-CUE-OUT");
        t.rest = Some("DURATION=30".into());
        assert_eq!(t.to_string(), "#EXT-X-CUE-OUT:DURATION=30");
    }
}
