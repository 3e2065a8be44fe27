//! A library to lex and classify m3u8 playlists (HTTP Live Streaming)
//! [link](https://tools.ietf.org/html/rfc8216).
//!
//! Parsing keeps every directive, known or not, in manifest order together with its
//! raw attribute text. Directives the library recognizes also get their attributes
//! parsed. The playlist is then classified as a master or media playlist and built by
//! the assembler for the requested protocol version.
//!
//! # Examples
//!
//! Parsing a playlist and let the parser figure out if it's a media or master playlist.
//!
//! ```
//! use hls_playlist::{Playlist, PlaylistVersion};
//!
//! let input = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-STREAM-INF:BANDWIDTH=100000\nlow/index.m3u8\n";
//!
//! match hls_playlist::parse_playlist_str(input, PlaylistVersion::Default) {
//!     Ok(Playlist::MasterPlaylist(pl)) => println!("Master playlist:\n{}", pl),
//!     Ok(Playlist::MediaPlaylist(pl)) => println!("Media playlist:\n{}", pl),
//!     Err(e) => panic!("Parsing error: \n{}", e),
//! }
//! ```
//!
//! Inspecting the directives and any problems found along the way
//!
//! ```
//! use hls_playlist::{Entry, PlaylistVersion};
//!
//! let input = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1,CODECS=\"avc1\nlow.m3u8\n";
//! let playlist = hls_playlist::parse_playlist_str(input, PlaylistVersion::V12).unwrap();
//!
//! for entry in playlist.tags() {
//!     match entry {
//!         Entry::Tag(tag) => println!("#{} {:?}", tag.name, tag.attributes),
//!         Entry::Uri { uri, .. } => println!("-> {}", uri),
//!     }
//! }
//! for diagnostic in playlist.diagnostics() {
//!     println!("warning: {}", diagnostic);
//! }
//! ```
//!
//! Writing a playlist back to a vec/file
//!
//! ```
//! use hls_playlist::PlaylistVersion;
//!
//! let input = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:9.9,\nfirst.ts\n#EXT-X-ENDLIST\n";
//! let playlist = hls_playlist::parse_playlist_str(input, PlaylistVersion::Default).unwrap();
//!
//! let mut v: Vec<u8> = Vec::new();
//! playlist.write_to(&mut v).unwrap();
//! assert_eq!(std::str::from_utf8(&v).unwrap(), input);
//! ```

pub mod attributes;
pub mod error;
pub mod lexer;
mod parser;
pub mod playlist;
pub mod tags;

pub use crate::attributes::{Attribute, AttributeGrammar, AttributeValue};
pub use crate::error::{Diagnostic, Error, MalformedAttribute};
pub use crate::parser::*;
pub use crate::playlist::*;
pub use crate::tags::{Entry, ShapeRole, Tag, TagDescriptor, Version};
