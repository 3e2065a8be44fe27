//! Attribute values and the per-directive grammars used to parse them.
//!
//! Every directive carries its attribute text verbatim; the parsers here turn that
//! text into [`Attribute`]s according to the directive's [`AttributeGrammar`]:
//!
//! - positional grammars (`#EXTINF:<duration>,[<title>]`, `#EXT-X-BYTERANGE:<n>[@<o>]`,
//!   single integers, enumerated strings, date-times)
//! - the `KEY=VALUE,...` attribute list, where a double-quoted value may contain commas.

use crate::error::MalformedAttribute;
use nom::branch::alt;
use nom::bytes::complete::{take_till, take_till1};
use nom::character::complete::{char, digit0, digit1, space0};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, rest};
use nom::sequence::{delimited, pair, preceded, separated_pair, tuple};
use nom::IResult;
use std::fmt;
use std::str::FromStr;

/// How a directive's attribute text is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeGrammar {
    /// The directive takes no value; any text after it is kept raw.
    None,
    /// `<decimal-integer>`
    Integer,
    /// Integer or decimal floating point.
    Number,
    /// `<duration>,[<title>]`
    DurationTitle,
    /// `<n>[@<o>]`
    ByteRange,
    /// A single bare token such as `VOD`.
    Enumerated,
    /// An ISO-8601 date-time.
    DateTime,
    /// `KEY=VALUE,...`
    AttributeList,
    /// Unknown directive: kept raw, never interpreted.
    Opaque,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    QuotedString(String),
    Token(String),
    Integer(u64),
    Decimal(f64),
    Resolution { width: u64, height: u64 },
    ByteRange { length: u64, offset: Option<u64> },
    #[cfg(feature = "chrono")]
    DateTime(chrono::DateTime<chrono::FixedOffset>),
}

impl AttributeValue {
    /// The text of a quoted string or bare token.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::QuotedString(s) | AttributeValue::Token(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AttributeValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(n) => Some(*n as f64),
            AttributeValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttributeValue::QuotedString(s) => write!(f, "\"{}\"", s),
            AttributeValue::Token(s) => write!(f, "{}", s),
            AttributeValue::Integer(n) => write!(f, "{}", n),
            AttributeValue::Decimal(d) => write!(f, "{}", d),
            AttributeValue::Resolution { width, height } => write!(f, "{}x{}", width, height),
            AttributeValue::ByteRange { length, offset } => match offset {
                Some(o) => write!(f, "{}@{}", length, o),
                None => write!(f, "{}", length),
            },
            #[cfg(feature = "chrono")]
            AttributeValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// One parsed value of a directive. Positional values have no key.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Upper-cased attribute name.
    pub key: Option<String>,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn positional(value: AttributeValue) -> Attribute {
        Attribute { key: None, value }
    }

    pub fn named(key: &str, value: AttributeValue) -> Attribute {
        Attribute {
            key: Some(key.to_ascii_uppercase()),
            value,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}={}", key, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Parse the text after a directive's `:` under `grammar`.
///
/// `text` is `None` when the directive had no `:` at all.
pub fn parse_attributes(
    grammar: AttributeGrammar,
    text: Option<&str>,
) -> Result<Vec<Attribute>, MalformedAttribute> {
    let raw = match grammar {
        AttributeGrammar::None | AttributeGrammar::Opaque => return Ok(Vec::new()),
        _ => match text {
            Some(text) => text,
            None if grammar == AttributeGrammar::AttributeList => return Ok(Vec::new()),
            None => return Err(MalformedAttribute::new("missing value", 0)),
        },
    };

    // Offsets are reported against the untrimmed text.
    let leading = raw.len() - raw.trim_start().len();
    parse_trimmed(grammar, raw.trim()).map_err(|mut e| {
        e.offset += leading;
        e
    })
}

fn parse_trimmed(grammar: AttributeGrammar, text: &str) -> Result<Vec<Attribute>, MalformedAttribute> {
    match grammar {
        AttributeGrammar::Integer => whole(text, number, "expected a decimal integer")
            .map(|n| vec![Attribute::positional(AttributeValue::Integer(n))]),
        AttributeGrammar::Number => {
            whole(text, numeric, "expected a number").map(|v| vec![Attribute::positional(v)])
        }
        AttributeGrammar::DurationTitle => duration_title(text),
        AttributeGrammar::ByteRange => whole(text, byte_range_val, "expected <n>[@<o>]")
            .map(|v| vec![Attribute::positional(v)]),
        AttributeGrammar::Enumerated => whole(text, enumerated, "expected an enumerated string")
            .map(|s| vec![Attribute::positional(AttributeValue::Token(s.to_string()))]),
        AttributeGrammar::DateTime => date_time(text).map(|v| vec![Attribute::positional(v)]),
        AttributeGrammar::AttributeList => attribute_list(text),
        AttributeGrammar::None | AttributeGrammar::Opaque => Ok(Vec::new()),
    }
}

fn whole<'a, O, F>(text: &'a str, parser: F, reason: &str) -> Result<O, MalformedAttribute>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    all_consuming(parser)(text)
        .map(|(_, o)| o)
        .map_err(|_| MalformedAttribute::new(reason, 0))
}

// -----------------------------------------------------------------------------------------------
// Positional grammars
// -----------------------------------------------------------------------------------------------

fn duration_title(text: &str) -> Result<Vec<Attribute>, MalformedAttribute> {
    let parsed: IResult<&str, (&str, Option<&str>)> = all_consuming(pair(
        signed_decimal,
        opt(preceded(char(','), rest)),
    ))(text);

    let (duration, title) = parsed
        .map(|(_, o)| o)
        .map_err(|_| MalformedAttribute::new("expected <duration>,[<title>]", 0))?;
    let duration = duration
        .parse::<f64>()
        .map_err(|e| MalformedAttribute::new(e.to_string(), 0))?;

    let mut attributes = vec![Attribute::positional(AttributeValue::Decimal(duration))];
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        attributes.push(Attribute::positional(AttributeValue::Token(title.to_string())));
    }
    Ok(attributes)
}

#[cfg(feature = "chrono")]
fn date_time(text: &str) -> Result<AttributeValue, MalformedAttribute> {
    chrono::DateTime::parse_from_rfc3339(text)
        .map(AttributeValue::DateTime)
        .map_err(|e| MalformedAttribute::new(format!("invalid date-time: {}", e), 0))
}

#[cfg(not(feature = "chrono"))]
fn date_time(text: &str) -> Result<AttributeValue, MalformedAttribute> {
    if text.is_empty() {
        return Err(MalformedAttribute::new("expected a date-time", 0));
    }
    Ok(AttributeValue::Token(text.to_string()))
}

fn enumerated(i: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == ',' || c == '"' || c.is_whitespace())(i)
}

// -----------------------------------------------------------------------------------------------
// Attribute lists
// -----------------------------------------------------------------------------------------------

/// Parses `KEY=VALUE,...`. A later duplicate key replaces the earlier value in place.
fn attribute_list(text: &str) -> Result<Vec<Attribute>, MalformedAttribute> {
    let mut attributes: Vec<Attribute> = Vec::new();
    if text.is_empty() {
        return Ok(attributes);
    }

    let offset = |remaining: &str| text.len() - remaining.len();
    let mut remaining = text;

    loop {
        let (r, _) = space0::<_, nom::error::Error<&str>>(remaining).unwrap_or((remaining, ""));

        // Only reachable after a separator: the trailing comma case.
        if r.is_empty() {
            insert(&mut attributes, Attribute::named("", AttributeValue::Token(String::new())));
            break;
        }

        let (r, key) = attribute_name(r);
        let key = key.trim_end();
        let r = match r.strip_prefix('=') {
            Some(r) => r,
            None => {
                return Err(MalformedAttribute::new(
                    "expected '=' after attribute name",
                    offset(r),
                ))
            }
        };
        if key.is_empty() {
            return Err(MalformedAttribute::new("empty attribute name", offset(r) - 1));
        }

        let (r, value) = if r.starts_with('"') {
            match quoted(r) {
                Ok((r, s)) => (r, AttributeValue::QuotedString(s.to_string())),
                Err(_) => {
                    return Err(MalformedAttribute::new(
                        "unterminated quoted string",
                        offset(r),
                    ))
                }
            }
        } else {
            let (r, token) = unquoted(r);
            (r, promote(token.trim_end()))
        };
        insert(&mut attributes, Attribute::named(key, value));

        let (r, _) = space0::<_, nom::error::Error<&str>>(r).unwrap_or((r, ""));
        if r.is_empty() {
            break;
        }
        remaining = match r.strip_prefix(',') {
            Some(r) => r,
            None => {
                return Err(MalformedAttribute::new(
                    "expected ',' between attributes",
                    offset(r),
                ))
            }
        };
    }

    Ok(attributes)
}

fn insert(attributes: &mut Vec<Attribute>, attribute: Attribute) {
    match attributes.iter_mut().find(|a| a.key == attribute.key) {
        Some(existing) => existing.value = attribute.value,
        None => attributes.push(attribute),
    }
}

fn attribute_name(i: &str) -> (&str, &str) {
    let parsed: IResult<&str, &str> = take_till(|c: char| c == '=' || c == ',')(i);
    parsed.unwrap_or((i, ""))
}

fn quoted(i: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c: char| c == '"'), char('"'))(i)
}

fn unquoted(i: &str) -> (&str, &str) {
    let parsed: IResult<&str, &str> = take_till(|c: char| c == ',')(i);
    parsed.unwrap_or((i, ""))
}

/// Promotes a bare token to the most specific value it spells.
fn promote(token: &str) -> AttributeValue {
    if let Ok((_, n)) = all_consuming(number)(token) {
        return AttributeValue::Integer(n);
    }
    if let Ok((_, (width, height))) = all_consuming(resolution)(token) {
        return AttributeValue::Resolution { width, height };
    }
    if let Ok((_, d)) = all_consuming(map_res(signed_decimal, f64::from_str))(token) {
        return AttributeValue::Decimal(d);
    }
    AttributeValue::Token(token.to_string())
}

// -----------------------------------------------------------------------------------------------
// Util
// -----------------------------------------------------------------------------------------------

fn number(i: &str) -> IResult<&str, u64> {
    map_res(digit1, u64::from_str)(i)
}

fn signed_decimal(i: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit0)),
    )))(i)
}

fn numeric(i: &str) -> IResult<&str, AttributeValue> {
    alt((
        map(all_consuming(number), AttributeValue::Integer),
        map(map_res(signed_decimal, f64::from_str), AttributeValue::Decimal),
    ))(i)
}

fn resolution(i: &str) -> IResult<&str, (u64, u64)> {
    separated_pair(number, alt((char('x'), char('X'))), number)(i)
}

fn byte_range_val(i: &str) -> IResult<&str, AttributeValue> {
    map(pair(number, opt(preceded(char('@'), number))), |(length, offset)| {
        AttributeValue::ByteRange { length, offset }
    })(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list(text: &str) -> Result<Vec<Attribute>, MalformedAttribute> {
        parse_attributes(AttributeGrammar::AttributeList, Some(text))
    }

    fn named(key: &str, value: AttributeValue) -> Attribute {
        Attribute::named(key, value)
    }

    fn quoted_value(s: &str) -> AttributeValue {
        AttributeValue::QuotedString(s.to_string())
    }

    #[test]
    fn comma_inside_quotes_does_not_split() {
        assert_eq!(
            list("BANDWIDTH=1280000,CODECS=\"mp4a.40.2,avc1.64001f\""),
            Ok(vec![
                named("BANDWIDTH", AttributeValue::Integer(1280000)),
                named("CODECS", quoted_value("mp4a.40.2,avc1.64001f")),
            ])
        );
    }

    #[test]
    fn key_value_pairs_multiple_quoted_values() {
        assert_eq!(
            list("BANDWIDTH=86000,URI=\"low/iframe.m3u8\",PROGRAM-ID=1,RESOLUTION=\"1x1\",VIDEO=1"),
            Ok(vec![
                named("BANDWIDTH", AttributeValue::Integer(86000)),
                named("URI", quoted_value("low/iframe.m3u8")),
                named("PROGRAM-ID", AttributeValue::Integer(1)),
                named("RESOLUTION", quoted_value("1x1")),
                named("VIDEO", AttributeValue::Integer(1)),
            ])
        );
    }

    #[test]
    fn bare_tokens_are_promoted() {
        assert_eq!(
            list("RESOLUTION=1920x1080,FRAME-RATE=29.970,TIME-OFFSET=-10.5,METHOD=AES-128,IV=0x1f"),
            Ok(vec![
                named(
                    "RESOLUTION",
                    AttributeValue::Resolution {
                        width: 1920,
                        height: 1080
                    }
                ),
                named("FRAME-RATE", AttributeValue::Decimal(29.97)),
                named("TIME-OFFSET", AttributeValue::Decimal(-10.5)),
                named("METHOD", AttributeValue::Token("AES-128".into())),
                named("IV", AttributeValue::Token("0x1f".into())),
            ])
        );
    }

    #[test]
    fn keys_are_case_insensitive() {
        assert_eq!(
            list("bandwidth=1"),
            Ok(vec![named("BANDWIDTH", AttributeValue::Integer(1))])
        );
    }

    #[test]
    fn duplicate_key_last_occurrence_wins() {
        assert_eq!(
            list("BANDWIDTH=1,CODECS=\"a\",bandwidth=2"),
            Ok(vec![
                named("BANDWIDTH", AttributeValue::Integer(2)),
                named("CODECS", quoted_value("a")),
            ])
        );
    }

    #[test]
    fn trailing_comma_yields_empty_attribute() {
        assert_eq!(
            list("BANDWIDTH=1,"),
            Ok(vec![
                named("BANDWIDTH", AttributeValue::Integer(1)),
                named("", AttributeValue::Token(String::new())),
            ])
        );
    }

    #[test]
    fn spaces_between_pairs_are_skipped() {
        assert_eq!(
            list("A=1, B=\"two\""),
            Ok(vec![
                named("A", AttributeValue::Integer(1)),
                named("B", quoted_value("two")),
            ])
        );
    }

    #[test]
    fn empty_quoted_value() {
        assert_eq!(list("NAME=\"\""), Ok(vec![named("NAME", quoted_value(""))]));
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        let err = list("BANDWIDTH=1,CODECS=\"avc1.64001f").unwrap_err();
        assert_eq!(err.reason, "unterminated quoted string");
        assert_eq!(err.offset, 19);
    }

    #[test]
    fn offset_counts_leading_whitespace() {
        let err = list("   CODECS=\"a").unwrap_err();
        assert_eq!(err.reason, "unterminated quoted string");
        assert_eq!(err.offset, 10);
    }

    #[test]
    fn missing_equals_is_malformed() {
        let err = list("BANDWIDTH").unwrap_err();
        assert_eq!(err.reason, "expected '=' after attribute name");
    }

    #[test]
    fn garbage_after_quoted_value_is_malformed() {
        let err = list("URI=\"a\"b").unwrap_err();
        assert_eq!(err.reason, "expected ',' between attributes");
        assert_eq!(err.offset, 7);
    }

    #[test]
    fn empty_list() {
        assert_eq!(list(""), Ok(vec![]));
        assert_eq!(parse_attributes(AttributeGrammar::AttributeList, None), Ok(vec![]));
    }

    #[test]
    fn duration_and_title() {
        assert_eq!(
            parse_attributes(AttributeGrammar::DurationTitle, Some("2.002,title, with comma")),
            Ok(vec![
                Attribute::positional(AttributeValue::Decimal(2.002)),
                Attribute::positional(AttributeValue::Token("title, with comma".into())),
            ])
        );
    }

    #[test]
    fn duration_without_title() {
        assert_eq!(
            parse_attributes(AttributeGrammar::DurationTitle, Some("9.9,")),
            Ok(vec![Attribute::positional(AttributeValue::Decimal(9.9))])
        );
        assert_eq!(
            parse_attributes(AttributeGrammar::DurationTitle, Some("10")),
            Ok(vec![Attribute::positional(AttributeValue::Decimal(10.0))])
        );
    }

    #[test]
    fn duration_with_bare_decimal_point() {
        assert_eq!(
            parse_attributes(AttributeGrammar::DurationTitle, Some("10.,")),
            Ok(vec![Attribute::positional(AttributeValue::Decimal(10.0))])
        );
        assert_eq!(list("FRAME-RATE=30."), Ok(vec![named("FRAME-RATE", AttributeValue::Decimal(30.0))]));
    }

    #[test]
    fn duration_must_be_numeric() {
        assert!(parse_attributes(AttributeGrammar::DurationTitle, Some("abc,")).is_err());
        assert!(parse_attributes(AttributeGrammar::DurationTitle, None).is_err());
    }

    #[test]
    fn byte_range() {
        assert_eq!(
            parse_attributes(AttributeGrammar::ByteRange, Some("137116@4559")),
            Ok(vec![Attribute::positional(AttributeValue::ByteRange {
                length: 137116,
                offset: Some(4559)
            })])
        );
        assert_eq!(
            parse_attributes(AttributeGrammar::ByteRange, Some("1000")),
            Ok(vec![Attribute::positional(AttributeValue::ByteRange {
                length: 1000,
                offset: None
            })])
        );
    }

    #[test]
    fn integer_and_number() {
        assert_eq!(
            parse_attributes(AttributeGrammar::Integer, Some("338559")),
            Ok(vec![Attribute::positional(AttributeValue::Integer(338559))])
        );
        assert!(parse_attributes(AttributeGrammar::Integer, Some("3.5")).is_err());
        assert_eq!(
            parse_attributes(AttributeGrammar::Number, Some("10.5")),
            Ok(vec![Attribute::positional(AttributeValue::Decimal(10.5))])
        );
        assert_eq!(
            parse_attributes(AttributeGrammar::Number, Some("10")),
            Ok(vec![Attribute::positional(AttributeValue::Integer(10))])
        );
    }

    #[test]
    fn enumerated() {
        assert_eq!(
            parse_attributes(AttributeGrammar::Enumerated, Some("VOD")),
            Ok(vec![Attribute::positional(AttributeValue::Token("VOD".into()))])
        );
        assert!(parse_attributes(AttributeGrammar::Enumerated, Some("VOD,EVENT")).is_err());
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn program_date_time() {
        let attributes =
            parse_attributes(AttributeGrammar::DateTime, Some("2010-02-19T14:54:23.031+08:00"))
                .unwrap();
        match &attributes[0].value {
            AttributeValue::DateTime(dt) => {
                assert_eq!(dt.to_rfc3339(), "2010-02-19T14:54:23.031+08:00")
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert!(parse_attributes(AttributeGrammar::DateTime, Some("yesterday")).is_err());
    }

    #[test]
    fn opaque_keeps_nothing() {
        assert_eq!(
            parse_attributes(AttributeGrammar::Opaque, Some("DURATION=30")),
            Ok(vec![])
        );
    }

    #[test]
    fn display_requotes_strings() {
        let attribute = named("CODECS", quoted_value("a,b"));
        assert_eq!(attribute.to_string(), "CODECS=\"a,b\"");
    }
}
