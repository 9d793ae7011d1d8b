use std::collections::HashMap;
use std::fmt;

use crate::body::Body;
use crate::error::{bad_message, Error, Result};
use crate::headers::Headers;
use crate::message::{Method, Version};
use crate::uri::Uri;

/// An HTTP request. Immutable once built; the body is consumed in place
/// by whoever handles the message.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: Headers,
    body: Option<Body>,
    path_params: HashMap<String, String>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> &Version {
        &self.version
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

    /// A path segment captured by a parameterized route, by name.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub(crate) fn set_path_param(&mut self, name: String, value: String) {
        self.path_params.insert(name, value);
    }

    /// The request-target written on the wire. An empty path serializes
    /// as `/`.
    pub fn target(&self) -> String {
        let target = self.uri.to_string();
        if target.is_empty() {
            "/".to_string()
        } else {
            target
        }
    }
}

impl fmt::Display for Request {
    /// Start line and headers, up to and including the empty line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}\r\n{}\r\n",
            self.method,
            self.target(),
            self.version.start_line_form(),
            self.headers
        )
    }
}

#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    version: Version,
    headers: Headers,
    body: Option<Body>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        RequestBuilder::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    pub fn uri(mut self, uri: &str) -> Result<Self> {
        self.uri = uri.parse()?;
        Ok(self)
    }

    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.version = Version::new(major, minor);
        self
    }

    /// Parses `METHOD SP request-target SP HTTP/M.N [CRLF]`. Extra
    /// whitespace, empty components, unknown methods and non-1.1 versions
    /// are rejected.
    pub fn request_line(mut self, line: &str) -> Result<Self> {
        let line = trim_crlf(line);

        let (mstr, rest) = match line.split_once(' ') {
            Some(split) => split,
            None if line.is_empty() => return Err(bad_message("empty method")),
            None => {
                return Err(bad_message(format!("no uri after method ({line})")));
            }
        };
        if mstr.is_empty() {
            return Err(bad_message("empty method"));
        }

        let (ustr, vstr) = rest
            .split_once(' ')
            .ok_or_else(|| bad_message(format!("no version after {mstr} {rest}")))?;
        if ustr.is_empty() {
            return Err(bad_message("empty URI"));
        }
        if vstr.is_empty() {
            return Err(bad_message(format!("empty version after {mstr} {ustr}")));
        }
        if vstr.contains([' ', '\t']) {
            return Err(bad_message(format!(
                "unexpected space found after {mstr} {ustr} {vstr}"
            )));
        }

        self.method = mstr.parse()?;
        self.uri = ustr.parse()?;
        self.version = parse_message_version(vstr)?;
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

    /// Finalizes the request, reconciling the framing headers with the
    /// attached body.
    pub fn build(mut self) -> Result<Request> {
        if let Some(body) = &self.body {
            self.headers.normalize_framing(body);
        }

        Ok(Request {
            method: self.method,
            uri: self.uri,
            version: self.version,
            headers: self.headers,
            body: self.body,
            path_params: HashMap::new(),
        })
    }
}

pub(crate) fn trim_crlf(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Version validation shared by both start-line parsers: the protocol
/// must be `HTTP` and the only supported version is 1.1.
pub(crate) fn parse_message_version(vstr: &str) -> Result<Version> {
    let version: Version = vstr.parse()?;
    if !version.is_http() {
        return Err(bad_message(format!(
            "invalid protocol {}",
            version.protocol
        )));
    }
    if !version.is_supported() {
        return Err(Error::VersionNotSupported(format!(
            "HTTP version {}.{} is not supported",
            version.major, version.minor
        )));
    }
    Ok(version)
}
