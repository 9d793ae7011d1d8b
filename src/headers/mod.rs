//! Ordered, case-insensitive header map with typed values for the fields
//! the engine itself consumes.

pub mod value;

use std::fmt;

use chrono::{DateTime, Utc};

use crate::body::Body;
use crate::charset::{is_commented, is_escaped, is_quoted, is_tchar, is_vchar, is_whitespace};
use crate::error::{bad_message, Result};
use crate::uri::Uri;

use self::value::{FieldValue, HeaderValue, HostPort, MediaType, Token, Via, CODING_CHUNKED};

pub const CONTENT_LENGTH: &str = "content-length";
pub const TRANSFER_ENCODING: &str = "transfer-encoding";
pub const TE: &str = "te";
pub const TRAILERS: &str = "trailers";
pub const HOST: &str = "host";
pub const VIA: &str = "via";
pub const CONNECTION: &str = "connection";
pub const CONTENT_TYPE: &str = "content-type";
pub const CONTENT_ENCODING: &str = "content-encoding";
pub const CONTENT_LANGUAGE: &str = "content-language";
pub const CONTENT_LOCATION: &str = "content-location";
pub const DATE: &str = "date";

/// HTTP headers, kept in insertion order as `(canonical-name, value)`
/// pairs. Lookup lowercases the name; output title-cases each
/// dash-separated word.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

pub fn canonical_name(name: &str) -> String {
    name.to_ascii_lowercase()
}

pub fn title_case_name(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl Headers {
    pub fn new() -> Self {
        Headers::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(name, v)| (name.as_str(), v))
    }

    fn find(&self, name: &str) -> Option<usize> {
        let canonical = canonical_name(name);
        self.entries.iter().position(|(n, _)| *n == canonical)
    }

    /// Adds a field. List-shaped values concatenate onto an existing
    /// record; singular values replace it.
    pub fn add(&mut self, name: &str, raw: &str) -> Result<()> {
        let canonical = canonical_name(name);
        let parsed = HeaderValue::parse(&canonical, raw.trim())?;

        match self.find(&canonical) {
            Some(i) if parsed.is_seq() => self.entries[i].1.concat(parsed)?,
            Some(i) => self.entries[i].1 = parsed,
            None => self.entries.push((canonical, parsed)),
        }
        Ok(())
    }

    /// Parses a raw header line, `name ":" OWS field-value OWS [CRLF]`.
    /// The value grammar is liberal: vchar and whitespace, with quoted
    /// strings, comments and `\<escaped>` sequences tracked so their
    /// delimiters nest correctly.
    pub fn add_line(&mut self, line: &str) -> Result<()> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let bytes = line.as_bytes();

        let mut i = 0;
        while i < bytes.len() && is_tchar(bytes[i]) {
            i += 1;
        }
        let name = &line[..i];

        if name.is_empty() {
            return Err(bad_message("no header field name"));
        }
        if i >= bytes.len() {
            return Err(bad_message(format!(
                "no header field value for field name ({name})"
            )));
        }
        if bytes[i] != b':' {
            return Err(bad_message(format!(
                "header field name ({name}) does not terminate with ':'"
            )));
        }
        i += 1;

        while i < bytes.len() && is_whitespace(bytes[i]) {
            i += 1;
        }

        let value_start = i;
        let mut dquoted = false;
        let mut commented = false;
        let mut escaped = false;

        while i < bytes.len() {
            let c = bytes[i];
            if escaped {
                if !is_escaped(c) {
                    break;
                }
                escaped = false;
            } else if dquoted {
                if c == b'"' {
                    dquoted = false;
                } else if c == b'\\' {
                    escaped = true;
                } else if !is_quoted(c) {
                    break;
                }
            } else if commented {
                if c == b')' {
                    commented = false;
                } else if c == b'\\' {
                    escaped = true;
                } else if !is_commented(c) {
                    break;
                }
            } else if c == b'"' {
                dquoted = true;
            } else if c == b'(' {
                commented = true;
            } else if c == b'\\' {
                break;
            } else if !is_vchar(c) && !is_whitespace(c) {
                break;
            }
            i += 1;
        }

        if i != bytes.len() || dquoted || commented || escaped {
            return Err(bad_message(format!("invalid header field value ({name})")));
        }

        self.add(name, line[value_start..].trim_end())
    }

    /// Replaces (or inserts) a field from its raw string form.
    pub fn update(&mut self, name: &str, raw: &str) -> Result<()> {
        let canonical = canonical_name(name);
        let parsed = HeaderValue::parse(&canonical, raw.trim())?;
        self.update_value(canonical, parsed);
        Ok(())
    }

    /// Replaces (or inserts) a field from a typed value.
    pub fn update_typed(&mut self, name: &str, value: FieldValue) {
        self.update_value(canonical_name(name), HeaderValue::from_typed(value));
    }

    fn update_value(&mut self, canonical: String, value: HeaderValue) {
        match self.find(&canonical) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((canonical, value)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        let canonical = canonical_name(name);
        self.entries.retain(|(n, _)| *n != canonical);
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.find(name).map(|i| &self.entries[i].1)
    }

    pub fn content_length(&self) -> Option<u64> {
        match self.get(CONTENT_LENGTH).map(HeaderValue::value) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn set_content_length(&mut self, length: u64) {
        self.update_typed(CONTENT_LENGTH, FieldValue::Number(length));
    }

    fn token_list(&self, name: &str) -> &[Token] {
        match self.get(name).map(HeaderValue::value) {
            Some(FieldValue::TokenList(tokens)) => tokens,
            _ => &[],
        }
    }

    fn string_list(&self, name: &str) -> &[String] {
        match self.get(name).map(HeaderValue::value) {
            Some(FieldValue::StrList(items)) => items,
            _ => &[],
        }
    }

    pub fn transfer_encoding(&self) -> &[Token] {
        self.token_list(TRANSFER_ENCODING)
    }

    pub fn set_transfer_encoding(&mut self, codings: Vec<Token>) {
        self.update_typed(TRANSFER_ENCODING, FieldValue::TokenList(codings));
    }

    /// Whether the message body uses the chunked transfer coding.
    pub fn is_chunked(&self) -> bool {
        self.transfer_encoding()
            .iter()
            .any(|t| t.name == CODING_CHUNKED)
    }

    pub fn te(&self) -> &[Token] {
        self.token_list(TE)
    }

    /// `TE: trailers` means the peer accepts trailer fields.
    pub fn accepts_trailers(&self) -> bool {
        self.te().iter().any(|t| t.name == "trailers")
    }

    pub fn trailers(&self) -> &[String] {
        self.string_list(TRAILERS)
    }

    pub fn host(&self) -> Option<&HostPort> {
        match self.get(HOST).map(HeaderValue::value) {
            Some(FieldValue::HostPort(hp)) => Some(hp),
            _ => None,
        }
    }

    pub fn set_host(&mut self, host: HostPort) {
        self.update_typed(HOST, FieldValue::HostPort(host));
    }

    pub fn via(&self) -> &[Via] {
        match self.get(VIA).map(HeaderValue::value) {
            Some(FieldValue::ViaList(entries)) => entries,
            _ => &[],
        }
    }

    pub fn connection(&self) -> &[String] {
        self.string_list(CONNECTION)
    }

    /// `Connection: close` was requested by the peer.
    pub fn close_requested(&self) -> bool {
        self.connection().iter().any(|o| o == value::CONNECTION_CLOSE)
    }

    pub fn set_connection(&mut self, options: Vec<String>) {
        self.update_typed(CONNECTION, FieldValue::StrList(options));
    }

    pub fn content_type(&self) -> Option<&MediaType> {
        match self.get(CONTENT_TYPE).map(HeaderValue::value) {
            Some(FieldValue::MediaType(mt)) => Some(mt),
            _ => None,
        }
    }

    pub fn set_content_type(&mut self, mt: MediaType) {
        self.update_typed(CONTENT_TYPE, FieldValue::MediaType(mt));
    }

    pub fn content_encoding(&self) -> &[String] {
        self.string_list(CONTENT_ENCODING)
    }

    pub fn content_language(&self) -> &[String] {
        self.string_list(CONTENT_LANGUAGE)
    }

    pub fn content_location(&self) -> Option<&Uri> {
        match self.get(CONTENT_LOCATION).map(HeaderValue::value) {
            Some(FieldValue::Uri(uri)) => Some(uri),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        match self.get(DATE).map(HeaderValue::value) {
            Some(FieldValue::Date(dt)) => Some(*dt),
            _ => None,
        }
    }

    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.update_typed(DATE, FieldValue::Date(date));
    }

    /// Reconciles the framing headers with the attached body before a
    /// message goes on the wire: chunked bodies get `Transfer-Encoding:
    /// chunked` and lose `Content-Length`; sized bodies get an exact
    /// `Content-Length` and lose the `chunked` coding.
    pub fn normalize_framing(&mut self, body: &Body) {
        if body.chunked() {
            self.remove(CONTENT_LENGTH);
            if !self.is_chunked() {
                let mut codings = self.transfer_encoding().to_vec();
                codings.push(Token::new(CODING_CHUNKED));
                self.set_transfer_encoding(codings);
            }
        } else {
            if self.is_set(TRANSFER_ENCODING) {
                let codings: Vec<Token> = self
                    .transfer_encoding()
                    .iter()
                    .filter(|t| t.name != CODING_CHUNKED)
                    .cloned()
                    .collect();
                if codings.is_empty() {
                    self.remove(TRANSFER_ENCODING);
                } else {
                    self.set_transfer_encoding(codings);
                }
            }
            self.set_content_length(body.len().unwrap_or(0));
        }
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{}: {}\r\n", title_case_name(name), value.raw())?;
        }
        Ok(())
    }
}
