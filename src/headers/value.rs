//! Typed header field values. Every value keeps the raw string it was
//! parsed from next to a typed view; well-known fields attach a validator
//! that rejects vocabulary we do not support with `Error::NotImplemented`.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{bad_message, not_implemented, Result};
use crate::message::Version;
use crate::scanner::{Params, Scanner};
use crate::uri::Uri;

pub const CONNECTION_CLOSE: &str = "close";
pub const CONNECTION_KEEP_ALIVE: &str = "keep-alive";
pub const CONNECTION_UPGRADE: &str = "upgrade";

pub const CODING_CHUNKED: &str = "chunked";

const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A lowercase token name with optional `;name=value` parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Token {
    pub name: String,
    pub params: Params,
}

impl Token {
    pub fn new(name: impl Into<String>) -> Self {
        Token {
            name: name.into(),
            params: Params::new(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        write_params(f, &self.params)
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &Params) -> fmt::Result {
    for (name, value) in params {
        write!(f, ";{name}")?;
        if !value.is_empty() {
            write!(f, "={value}")?;
        }
    }
    Ok(())
}

/// Host name with an optional port, as the `Host` header carries it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: Option<u16>,
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// `type/subtype` with optional parameters, for `Content-Type`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaType {
    pub kind: String,
    pub subtype: String,
    pub params: Params,
}

impl MediaType {
    pub fn new(kind: impl Into<String>, subtype: impl Into<String>) -> Self {
        MediaType {
            kind: kind.into(),
            subtype: subtype.into(),
            params: Params::new(),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        write_params(f, &self.params)
    }
}

/// One hop of a `Via` chain: received-protocol, the intermediary it was
/// received by, and an optional comment (parentheses kept).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Via {
    pub version: Version,
    pub received_by: Uri,
    pub comment: Option<String>,
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)?;
        if self.received_by.host().is_present() {
            write!(f, " {}", self.received_by.host().get())?;
            if let Some(port) = self.received_by.port().number() {
                write!(f, ":{port}")?;
            }
        }
        if let Some(comment) = &self.comment {
            write!(f, " {comment}")?;
        }
        Ok(())
    }
}

pub fn parse_number(raw: &str) -> Result<u64> {
    if raw.is_empty() || !raw.bytes().all(|c| c.is_ascii_digit()) {
        return Err(bad_message(format!("incorrect number ({raw}) specified")));
    }
    raw.parse()
        .map_err(|_| bad_message(format!("incorrect number ({raw}) specified")))
}

/// Comma-separated list of tokens (lowercased).
pub fn parse_string_list(raw: &str) -> Result<Vec<String>> {
    let mut items = Vec::new();
    if raw.is_empty() {
        return Ok(items);
    }

    let mut scn = Scanner::new(raw);
    loop {
        let item = scn
            .read_token(true)
            .ok_or_else(|| bad_message(format!("no token found in ({raw})")))?;
        items.push(item);

        scn.read_opt_space();
        if !scn.read_special(b',') {
            break;
        }
        scn.read_opt_space();
    }

    Ok(items)
}

/// Comma-separated list of tokens with optional parameters.
pub fn parse_token_list(raw: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    if raw.is_empty() {
        return Ok(tokens);
    }

    let mut scn = Scanner::new(raw);
    loop {
        let name = scn
            .read_token(true)
            .ok_or_else(|| bad_message(format!("no token found in ({raw})")))?;

        scn.read_opt_space();

        let params = if scn.read_special(b';') {
            scn.read_opt_space();
            scn.read_parameters()?
        } else {
            Params::new()
        };

        tokens.push(Token { name, params });

        scn.read_opt_space();
        if !scn.read_special(b',') {
            break;
        }
        scn.read_opt_space();
    }

    Ok(tokens)
}

/// `host[:port]`, parsed by borrowing the URI authority grammar.
pub fn parse_host_port(raw: &str) -> Result<HostPort> {
    let uri: Uri = format!("http://{raw}").parse()?;

    if !uri.host().is_present() {
        return Err(bad_message(format!("invalid host string specified: {raw}")));
    }

    Ok(HostPort {
        host: uri.host().get().to_string(),
        port: uri.port().number(),
    })
}

/// `type "/" subtype [";" parameters]`
pub fn parse_media_type(raw: &str) -> Result<MediaType> {
    let mut scn = Scanner::new(raw);

    let kind = scn
        .read_token(true)
        .ok_or_else(|| bad_message("no media type found"))?;

    if !scn.read_special(b'/') {
        return Err(bad_message("media type is not followed by '/'"));
    }

    let subtype = scn
        .read_token(true)
        .ok_or_else(|| bad_message("no media subtype found"))?;

    scn.read_opt_space();

    let params = if scn.read_special(b';') {
        scn.read_opt_space();
        scn.read_parameters()?
    } else {
        Params::new()
    };

    Ok(MediaType {
        kind,
        subtype,
        params,
    })
}

/// Comma-separated `[protocol/]version received-by [comment]` entries.
pub fn parse_via_list(raw: &str) -> Result<Vec<Via>> {
    let mut entries = Vec::new();
    if raw.is_empty() {
        return Ok(entries);
    }

    let mut scn = Scanner::new(raw);
    loop {
        scn.read_opt_space();

        let first = scn
            .read_token(false)
            .ok_or_else(|| bad_message("no protocol/version found"))?;

        let version = if scn.read_special(b'/') {
            let number = scn
                .read_token(true)
                .ok_or_else(|| bad_message("no version found"))?;
            let mut version = Version::parse(&number, true)?;
            version.protocol = first;
            version
        } else {
            Version::parse(&first, true)?
        };

        if !scn.read_space() {
            return Err(bad_message(format!("no space after ({version})")));
        }

        // a URI run, but stopped at the list comma
        let received_by = scn.read_while(|c| {
            c != b',' && (crate::uri::is_reserved(c) || crate::uri::is_unreserved(c) || c == b'%')
        });
        if received_by.is_empty() {
            return Err(bad_message("no URI found"));
        }
        let received_by: Uri = format!("http://{received_by}").parse()?;

        scn.read_space();
        let comment = scn.read_comment()?;

        entries.push(Via {
            version,
            received_by,
            comment,
        });

        scn.read_opt_space();
        if !scn.read_special(b',') {
            break;
        }
        scn.read_opt_space();
    }

    Ok(entries)
}

pub fn parse_imf_date(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, IMF_FIXDATE)
        .map(|naive| naive.and_utc())
        .map_err(|err| bad_message(format!("invalid date ({raw}): {err}")))
}

pub fn format_imf_date(date: &DateTime<Utc>) -> String {
    date.format(IMF_FIXDATE).to_string()
}

pub fn valid_connection(option: &str) -> Result<()> {
    match option {
        CONNECTION_CLOSE | CONNECTION_KEEP_ALIVE | CONNECTION_UPGRADE => Ok(()),
        _ => Err(not_implemented(format!(
            "connection option {option} is not implemented"
        ))),
    }
}

pub fn valid_media_type(mt: &MediaType) -> Result<()> {
    match (mt.kind.as_str(), mt.subtype.as_str()) {
        ("text", "plain") | ("application", "json") => Ok(()),
        ("text", other) | ("application", other) => Err(not_implemented(format!(
            "subtype {other} is not implemented for type {}",
            mt.kind
        ))),
        (kind, _) => Err(not_implemented(format!("type {kind} is not implemented"))),
    }
}

pub fn valid_encoding(coding: &str) -> Result<()> {
    match coding {
        "compress" | "x-compress" | "gzip" | "x-gzip" | "deflate" => Ok(()),
        _ => Err(not_implemented(format!(
            "content-encoding {coding} is not implemented"
        ))),
    }
}

/// The typed view of a header value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Number(u64),
    Str(String),
    StrList(Vec<String>),
    TokenList(Vec<Token>),
    HostPort(HostPort),
    MediaType(MediaType),
    Uri(Uri),
    Date(DateTime<Utc>),
    ViaList(Vec<Via>),
}

impl FieldValue {
    pub fn is_seq(&self) -> bool {
        matches!(
            self,
            FieldValue::StrList(_) | FieldValue::TokenList(_) | FieldValue::ViaList(_)
        )
    }

    pub fn render(&self) -> String {
        fn join<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(T::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        }

        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Str(s) => s.clone(),
            FieldValue::StrList(items) => join(items),
            FieldValue::TokenList(items) => join(items),
            FieldValue::HostPort(hp) => hp.to_string(),
            FieldValue::MediaType(mt) => mt.to_string(),
            FieldValue::Uri(uri) => uri.to_string(),
            FieldValue::Date(dt) => format_imf_date(dt),
            FieldValue::ViaList(items) => join(items),
        }
    }
}

/// A header value: the raw wire string plus its typed view. Constructed
/// through [`HeaderValue::parse`] (which selects parser and validator by
/// field name) or [`HeaderValue::from_typed`].
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderValue {
    raw: String,
    value: FieldValue,
}

impl HeaderValue {
    /// Parses and validates `raw` according to the (canonical, lowercase)
    /// field name. Unrecognized fields keep the raw string as-is.
    pub fn parse(name: &str, raw: &str) -> Result<HeaderValue> {
        let value = match name {
            "content-length" => FieldValue::Number(parse_number(raw)?),
            "transfer-encoding" => {
                let codings = parse_token_list(raw)?;
                chunked_must_be_final(&codings)?;
                FieldValue::TokenList(codings)
            }
            "te" => FieldValue::TokenList(parse_token_list(raw)?),
            "trailers" => FieldValue::StrList(parse_string_list(raw)?),
            "host" => FieldValue::HostPort(parse_host_port(raw)?),
            "via" => FieldValue::ViaList(parse_via_list(raw)?),
            "connection" => {
                let options = parse_string_list(raw)?;
                for option in &options {
                    valid_connection(option)?;
                }
                FieldValue::StrList(options)
            }
            "content-type" => {
                let mt = parse_media_type(raw)?;
                valid_media_type(&mt)?;
                FieldValue::MediaType(mt)
            }
            "content-encoding" => {
                let codings = parse_string_list(raw)?;
                for coding in &codings {
                    valid_encoding(coding)?;
                }
                FieldValue::StrList(codings)
            }
            "content-language" => FieldValue::StrList(parse_string_list(raw)?),
            "content-location" => FieldValue::Uri(raw.parse()?),
            "date" => FieldValue::Date(parse_imf_date(raw)?),
            _ => FieldValue::Str(raw.to_string()),
        };

        Ok(HeaderValue {
            raw: raw.to_string(),
            value,
        })
    }

    /// Wraps an already-typed value, deriving the raw form from it.
    pub fn from_typed(value: FieldValue) -> HeaderValue {
        HeaderValue {
            raw: value.render(),
            value,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn is_seq(&self) -> bool {
        self.value.is_seq()
    }

    pub fn render(&self) -> String {
        self.value.render()
    }

    /// Appends another value of the same list shape; raw forms join with
    /// `", "`.
    pub fn concat(&mut self, other: HeaderValue) -> Result<()> {
        match (&mut self.value, other.value) {
            (FieldValue::StrList(mine), FieldValue::StrList(theirs)) => mine.extend(theirs),
            (FieldValue::TokenList(mine), FieldValue::TokenList(theirs)) => mine.extend(theirs),
            (FieldValue::ViaList(mine), FieldValue::ViaList(theirs)) => mine.extend(theirs),
            _ => {
                return Err(crate::error::bad_message(
                    "cannot concatenate non-list header values",
                ))
            }
        }
        if !self.raw.is_empty() {
            self.raw.push_str(", ");
        }
        self.raw.push_str(&other.raw);
        Ok(())
    }
}

fn chunked_must_be_final(codings: &[Token]) -> Result<()> {
    let misplaced = codings
        .iter()
        .position(|t| t.name == CODING_CHUNKED)
        .map(|i| i + 1 < codings.len())
        .unwrap_or(false);
    if misplaced {
        Err(bad_message("chunked must be the final transfer coding"))
    } else {
        Ok(())
    }
}
