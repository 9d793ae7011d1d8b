use std::fmt;
use std::str::FromStr;

use crate::error::{bad_message, Error, Result};

pub const HTTP_PROTOCOL: &str = "HTTP";

/// Protocol name plus major/minor version. The protocol defaults to
/// `HTTP`; an empty protocol means a bare `M.N` form, which only the
/// `Via` header grammar produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    pub protocol: String,
    pub major: u8,
    pub minor: u8,
}

impl Default for Version {
    fn default() -> Self {
        Version::HTTP_1_1
    }
}

impl Version {
    pub const HTTP_1_1: Version = Version {
        protocol: String::new(),
        major: 1,
        minor: 1,
    };

    pub fn new(major: u8, minor: u8) -> Self {
        Version {
            protocol: String::new(),
            major,
            minor,
        }
    }

    fn protocol_or_default(&self) -> &str {
        if self.protocol.is_empty() {
            HTTP_PROTOCOL
        } else {
            &self.protocol
        }
    }

    pub fn is_http(&self) -> bool {
        self.protocol_or_default() == HTTP_PROTOCOL
    }

    /// The `PROTO/M.N` form used on start lines, defaulting the protocol
    /// to `HTTP` when none was given.
    pub fn start_line_form(&self) -> String {
        format!(
            "{}/{}.{}",
            self.protocol_or_default(),
            self.major,
            self.minor
        )
    }

    pub fn is_supported(&self) -> bool {
        self.is_http() && self.major == 1 && self.minor == 1
    }

    /// Parses `proto/M.N`, or a bare `M.N` when `allow_bare` is set (the
    /// form the `Via` header uses).
    pub fn parse(input: &str, allow_bare: bool) -> Result<Version> {
        let invalid = || bad_message(format!("invalid version ({input})"));

        let (protocol, number) = match input.rfind('/') {
            Some(slash) => (&input[..slash], &input[slash + 1..]),
            None if allow_bare => ("", input),
            None => return Err(invalid()),
        };

        if protocol.is_empty() && !allow_bare {
            return Err(invalid());
        }

        let bytes = number.as_bytes();
        if bytes.len() != 3 || bytes[1] != b'.' {
            return Err(invalid());
        }
        if !bytes[0].is_ascii_digit() || !bytes[2].is_ascii_digit() {
            return Err(invalid());
        }

        Ok(Version {
            protocol: protocol.to_string(),
            major: bytes[0] - b'0',
            minor: bytes[2] - b'0',
        })
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(input: &str) -> Result<Version> {
        Version::parse(input, false)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.protocol.is_empty() {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}/{}.{}", self.protocol, self.major, self.minor)
        }
    }
}

/// The request methods of RFC 7231. Matching is exact-case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(input: &str) -> Result<Method> {
        match input {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "CONNECT" => Ok(Method::Connect),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            _ => Err(bad_message(format!("invalid method ({input})"))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP status code. Known codes get their standard reason phrase;
/// codes read off the wire that we do not know are carried verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Status(pub u16);

impl Status {
    pub const CONTINUE: Status = Status(100);
    pub const SWITCHING_PROTOCOLS: Status = Status(101);
    pub const OK: Status = Status(200);
    pub const CREATED: Status = Status(201);
    pub const ACCEPTED: Status = Status(202);
    pub const NON_AUTHORITATIVE_INFORMATION: Status = Status(203);
    pub const NO_CONTENT: Status = Status(204);
    pub const RESET_CONTENT: Status = Status(205);
    pub const PARTIAL_CONTENT: Status = Status(206);
    pub const MULTIPLE_CHOICES: Status = Status(300);
    pub const MOVED_PERMANENTLY: Status = Status(301);
    pub const FOUND: Status = Status(302);
    pub const SEE_OTHER: Status = Status(303);
    pub const NOT_MODIFIED: Status = Status(304);
    pub const USE_PROXY: Status = Status(305);
    pub const TEMPORARY_REDIRECT: Status = Status(307);
    pub const BAD_REQUEST: Status = Status(400);
    pub const UNAUTHORIZED: Status = Status(401);
    pub const PAYMENT_REQUIRED: Status = Status(402);
    pub const FORBIDDEN: Status = Status(403);
    pub const NOT_FOUND: Status = Status(404);
    pub const METHOD_NOT_ALLOWED: Status = Status(405);
    pub const NOT_ACCEPTABLE: Status = Status(406);
    pub const PROXY_AUTHENTICATION_REQUIRED: Status = Status(407);
    pub const REQUEST_TIMEOUT: Status = Status(408);
    pub const CONFLICT: Status = Status(409);
    pub const GONE: Status = Status(410);
    pub const LENGTH_REQUIRED: Status = Status(411);
    pub const PRECONDITION_FAILED: Status = Status(412);
    pub const PAYLOAD_TOO_LARGE: Status = Status(413);
    pub const URI_TOO_LONG: Status = Status(414);
    pub const UNSUPPORTED_MEDIA_TYPE: Status = Status(415);
    pub const RANGE_NOT_SATISFIABLE: Status = Status(416);
    pub const EXPECTATION_FAILED: Status = Status(417);
    pub const UPGRADE_REQUIRED: Status = Status(426);
    pub const INTERNAL_SERVER_ERROR: Status = Status(500);
    pub const NOT_IMPLEMENTED: Status = Status(501);
    pub const BAD_GATEWAY: Status = Status(502);
    pub const SERVICE_UNAVAILABLE: Status = Status(503);
    pub const GATEWAY_TIMEOUT: Status = Status(504);
    pub const HTTP_VERSION_NOT_SUPPORTED: Status = Status(505);

    pub fn code(&self) -> u16 {
        self.0
    }

    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.0)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    pub fn is_error(&self) -> bool {
        self.0 >= 400
    }

    /// 1xx, 204 and 304 responses never carry a message body.
    pub fn forbids_body(&self) -> bool {
        self.is_informational() || *self == Status::NO_CONTENT || *self == Status::NOT_MODIFIED
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            305 => "Use Proxy",
            307 => "Temporary Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            407 => "Proxy Authentication Required",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Payload Too Large",
            414 => "URI Too Long",
            415 => "Unsupported Media Type",
            416 => "Range Not Satisfiable",
            417 => "Expectation Failed",
            426 => "Upgrade Required",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "HTTP Version Not Supported",
            _ => "",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses_http_form() {
        let v: Version = "HTTP/1.1".parse().unwrap();
        assert_eq!(v.protocol, "HTTP");
        assert_eq!((v.major, v.minor), (1, 1));
        assert!(v.is_supported());
        assert_eq!(v.to_string(), "HTTP/1.1");
    }

    #[test]
    fn version_rejects_malformed_numbers() {
        assert!("HTTP/1".parse::<Version>().is_err());
        assert!("HTTP/11".parse::<Version>().is_err());
        assert!("HTTP/a.b".parse::<Version>().is_err());
        assert!("1.1".parse::<Version>().is_err());
        assert!("HTTP/1.1.1".parse::<Version>().is_err());
    }

    #[test]
    fn start_line_form_always_carries_protocol() {
        assert_eq!(Version::new(1, 1).start_line_form(), "HTTP/1.1");
        assert_eq!(
            "HTTP/1.1".parse::<Version>().unwrap().start_line_form(),
            "HTTP/1.1"
        );
    }

    #[test]
    fn bare_version_only_where_allowed() {
        let v = Version::parse("1.1", true).unwrap();
        assert!(v.protocol.is_empty());
        assert_eq!(v.to_string(), "1.1");
        assert!(v.is_supported());

        let v = Version::parse("HTTP/2.0", true).unwrap();
        assert!(!v.is_supported());
    }

    #[test]
    fn method_is_exact_case() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert!("get".parse::<Method>().is_err());
        assert!("PATCH".parse::<Method>().is_err());
    }

    #[test]
    fn status_classification() {
        assert!(Status::CONTINUE.is_informational());
        assert!(Status::OK.is_success());
        assert!(Status::BAD_REQUEST.is_error());
        assert!(Status::NO_CONTENT.forbids_body());
        assert!(Status::NOT_MODIFIED.forbids_body());
        assert!(!Status::OK.forbids_body());
        assert_eq!(Status::NOT_FOUND.reason_phrase(), "Not Found");
        assert_eq!(Status(299).reason_phrase(), "");
    }
}
