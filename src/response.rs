use std::fmt;

use crate::body::Body;
use crate::error::{bad_message, Error, Result};
use crate::headers::Headers;
use crate::message::{Status, Version};
use crate::request::{parse_message_version, trim_crlf};
use crate::scanner::Scanner;

/// An HTTP response. Immutable once built.
#[derive(Debug)]
pub struct Response {
    version: Version,
    status: Status,
    reason: String,
    headers: Headers,
    body: Option<Body>,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> Option<&mut Body> {
        self.body.as_mut()
    }

    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    pub(crate) fn attach_body(&mut self, body: Body) {
        self.body = Some(body);
    }
}

impl fmt::Display for Response {
    /// Status line and headers, up to and including the empty line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}\r\n{}\r\n",
            self.version.start_line_form(),
            self.status,
            self.reason,
            self.headers
        )
    }
}

#[derive(Debug, Default)]
pub struct ResponseBuilder {
    version: Version,
    status: Option<Status>,
    reason: String,
    headers: Headers,
    body: Option<Body>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        ResponseBuilder::default()
    }

    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.version = Version::new(major, minor);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Parses `HTTP/M.N SP status-code SP reason-phrase [CRLF]`. Non-HTTP
    /// protocols are rejected, versions other than 1.1 raise 505, and
    /// unknown status numbers are carried verbatim.
    pub fn response_line(mut self, line: &str) -> Result<Self> {
        let line = trim_crlf(line);
        let mut scn = Scanner::new(line);

        let vstr = scn
            .read_version()
            .ok_or_else(|| bad_message("HTTP version not found"))?;

        if !scn.read_space() {
            return Err(bad_message(format!("no space after ({vstr})")));
        }

        let sstr = scn
            .read_status()
            .ok_or_else(|| bad_message("HTTP status not found"))?;

        if !scn.read_space() {
            return Err(bad_message(format!("no space after ({vstr} {sstr})")));
        }

        let reason = scn
            .read_reason()
            .ok_or_else(|| bad_message("HTTP reason phrase not found"))?;

        scn.read_opt_space();

        if !scn.read_crlf() {
            return Err(bad_message(format!(
                "message ({vstr} {sstr} {reason}) not terminated with CRLF"
            )));
        }

        self.version = parse_message_version(&vstr)?;
        let code = sstr
            .parse()
            .map_err(|_| bad_message(format!("invalid status ({sstr})")))?;
        self.status = Some(Status(code));
        self.reason = reason;
        Ok(self)
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        self.headers.add(name, value)?;
        Ok(self)
    }

    pub fn header_line(mut self, line: &str) -> Result<Self> {
        self.headers.add_line(line)?;
        Ok(self)
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Finalizes the response: fills a default reason phrase, rejects
    /// bodies on statuses that must not carry one, and reconciles the
    /// framing headers with the body.
    pub fn build(mut self) -> Result<Response> {
        let status = self.status.unwrap_or(Status::OK);

        if self.reason.is_empty() {
            self.reason = status.reason_phrase().to_string();
        }

        if status.forbids_body() && self.body.is_some() {
            return Err(Error::InvalidArgument(format!(
                "a {status} response must not carry a body"
            )));
        }

        if let Some(body) = &self.body {
            self.headers.normalize_framing(body);
        }

        Ok(Response {
            version: self.version,
            status,
            reason: self.reason,
            headers: self.headers,
            body: self.body,
        })
    }
}
