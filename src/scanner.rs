use crate::charset::{is_commented, is_escaped, is_opaque, is_quoted, is_tchar, is_vchar, is_whitespace};
use crate::error::{bad_message, Result};
use crate::uri::{is_unreserved, is_reserved, Uri};

/// `name=value` pairs as they appear in header parameters and chunk
/// extensions.
pub type Params = Vec<(String, String)>;

/// Character-level reader over an in-memory string, exposing the HTTP
/// lexical grammar. Every operation restores the cursor when it fails, so
/// callers can probe alternatives.
pub struct Scanner<'a> {
    bytes: &'a [u8],
    cur: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Scanner {
            bytes: input.as_bytes(),
            cur: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.cur).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.cur += 1;
        }
        c
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> Vec<u8> {
        let start = self.cur;
        while self.peek().map(&pred).unwrap_or(false) {
            self.cur += 1;
        }
        self.bytes[start..self.cur].to_vec()
    }

    pub fn at_end(&self) -> bool {
        self.cur >= self.bytes.len()
    }

    /// Reads a run of one or more whitespace characters.
    pub fn read_space(&mut self) -> bool {
        !self.take_while(is_whitespace).is_empty()
    }

    /// Skips any whitespace. Always succeeds.
    pub fn read_opt_space(&mut self) {
        self.take_while(is_whitespace);
    }

    /// Reads a single literal character.
    pub fn read_special(&mut self, special: u8) -> bool {
        if self.peek() == Some(special) {
            self.cur += 1;
            true
        } else {
            false
        }
    }

    /// Reads a line terminator: CRLF, a bare LF, or end of input.
    pub fn read_crlf(&mut self) -> bool {
        match self.peek() {
            None => true,
            Some(b'\n') => {
                self.cur += 1;
                true
            }
            Some(b'\r') => {
                self.cur += 1;
                if self.peek() == Some(b'\n') {
                    self.cur += 1;
                }
                true
            }
            Some(_) => false,
        }
    }

    /// Reads one or more `tchar`, optionally lowercased.
    pub fn read_token(&mut self, lower: bool) -> Option<String> {
        let mut raw = self.take_while(is_tchar);
        if raw.is_empty() {
            return None;
        }
        if lower {
            raw.make_ascii_lowercase();
        }
        Some(to_string(raw))
    }

    /// Reads the longest run of URI characters and validates it as a URI.
    /// Returns the validated raw text; the caller re-parses components as
    /// needed.
    pub fn read_uri(&mut self) -> Result<Option<String>> {
        let raw = self.take_while(|c| is_reserved(c) || is_unreserved(c) || c == b'%');
        if raw.is_empty() {
            return Ok(None);
        }
        let s = to_string(raw);
        s.parse::<Uri>()?;
        Ok(Some(s))
    }

    /// Reads the longest run matching `pred`, without validation. Used by
    /// list grammars that need to stop a URI run at a delimiter.
    pub(crate) fn read_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        to_string(self.take_while(pred))
    }

    /// Reads a protocol version: `tchar` and `/`.
    pub fn read_version(&mut self) -> Option<String> {
        let raw = self.take_while(|c| is_tchar(c) || c == b'/');
        if raw.is_empty() {
            None
        } else {
            Some(to_string(raw))
        }
    }

    /// Reads a status code: exactly three digits.
    pub fn read_status(&mut self) -> Option<String> {
        let start = self.cur;
        let raw = self.take_while(|c| c.is_ascii_digit());
        if raw.len() == 3 {
            Some(to_string(raw))
        } else {
            self.cur = start;
            None
        }
    }

    /// Reads a reason phrase (whitespace, vchar, opaque), trimmed.
    pub fn read_reason(&mut self) -> Option<String> {
        let start = self.cur;
        let raw = self.take_while(|c| is_whitespace(c) || is_vchar(c) || is_opaque(c));
        let phrase = to_string(raw).trim().to_string();
        if phrase.is_empty() {
            self.cur = start;
            None
        } else {
            Some(phrase)
        }
    }

    /// Reads a quoted string, `\<escaped>` honored. The surrounding quotes
    /// are kept in the returned text. An invalid character inside the
    /// string is a hard error.
    pub fn read_qstring(&mut self) -> Result<Option<String>> {
        self.read_delimited(b'"', b'"', is_quoted)
    }

    /// Reads a `( ... )` comment, `\<escaped>` honored.
    pub fn read_comment(&mut self) -> Result<Option<String>> {
        self.read_delimited(b'(', b')', is_commented)
    }

    fn read_delimited(
        &mut self,
        open: u8,
        close: u8,
        allowed: impl Fn(u8) -> bool,
    ) -> Result<Option<String>> {
        if !self.read_special(open) {
            return Ok(None);
        }

        let mut out = vec![open];
        loop {
            let c = self.bump();
            match c {
                Some(c) if c == close => {
                    out.push(c);
                    return Ok(Some(to_string(out)));
                }
                Some(b'\\') => {
                    out.push(b'\\');
                    match self.bump() {
                        Some(e) if is_escaped(e) => out.push(e),
                        other => return Err(invalid_char(other, &out)),
                    }
                }
                Some(c) if allowed(c) => out.push(c),
                other => return Err(invalid_char(other, &out)),
            }
        }
    }

    /// Reads a `name=value[;name=value...]` parameter list. Parameter names
    /// are lowercased; values are either tokens (case preserved) or quoted
    /// strings.
    pub fn read_parameters(&mut self) -> Result<Params> {
        let mut params = Params::new();

        loop {
            let name = self
                .read_token(true)
                .ok_or_else(|| bad_message("no parameter name"))?;

            self.read_opt_space();

            if !self.read_special(b'=') {
                return Err(bad_message(format!(
                    "no '=' after parameter name ({name})"
                )));
            }

            self.read_opt_space();

            let value = match self.peek() {
                Some(b'"') => self.read_qstring()?,
                Some(c) if is_tchar(c) => self.read_token(false),
                _ => None,
            };
            let value =
                value.ok_or_else(|| bad_message(format!("no parameter value for ({name})")))?;

            params.push((name, value));

            self.read_opt_space();
            if !self.read_special(b';') {
                break;
            }
        }

        Ok(params)
    }

    /// Reads everything up to (not including) CR, LF or end of input,
    /// trimmed.
    pub fn read_line_rest(&mut self) -> String {
        let raw = self.take_while(|c| c != b'\r' && c != b'\n');
        to_string(raw).trim().to_string()
    }

    /// Reads a lowercase hexadecimal run as a chunk size.
    pub fn read_chunk_size(&mut self) -> Option<u64> {
        let start = self.cur;
        let raw = self.take_while(|c| c.is_ascii_digit() || (b'a'..=b'f').contains(&c));
        if raw.is_empty() {
            return None;
        }
        match u64::from_str_radix(&to_string(raw), 16) {
            Ok(n) => Some(n),
            Err(_) => {
                self.cur = start;
                None
            }
        }
    }
}

fn to_string(raw: Vec<u8>) -> String {
    String::from_utf8_lossy(&raw).into_owned()
}

fn invalid_char(c: Option<u8>, sofar: &[u8]) -> crate::Error {
    match c {
        Some(c) => bad_message(format!(
            "invalid character '{}' after \"{}\"",
            c as char,
            String::from_utf8_lossy(sofar)
        )),
        None => bad_message(format!(
            "unterminated \"{}\"",
            String::from_utf8_lossy(sofar)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_and_special() {
        let mut scn = Scanner::new("  \t x");
        assert!(scn.read_space());
        assert!(scn.read_special(b'x'));
        assert!(!scn.read_special(b'y'));
        assert!(scn.at_end());
    }

    #[test]
    fn space_fails_without_consuming() {
        let mut scn = Scanner::new("abc");
        assert!(!scn.read_space());
        assert_eq!(scn.read_token(true).as_deref(), Some("abc"));
    }

    #[test]
    fn crlf_tolerates_bare_lf_and_eof() {
        assert!(Scanner::new("\r\n").read_crlf());
        assert!(Scanner::new("\n").read_crlf());
        assert!(Scanner::new("").read_crlf());
        assert!(!Scanner::new("x").read_crlf());
    }

    #[test]
    fn token_lowercases_on_request() {
        let mut scn = Scanner::new("Transfer-Encoding:");
        assert_eq!(scn.read_token(true).as_deref(), Some("transfer-encoding"));
        assert!(scn.read_special(b':'));

        let mut scn = Scanner::new("GZip");
        assert_eq!(scn.read_token(false).as_deref(), Some("GZip"));
    }

    #[test]
    fn status_needs_exactly_three_digits() {
        assert_eq!(Scanner::new("200 OK").read_status().as_deref(), Some("200"));
        assert!(Scanner::new("20 OK").read_status().is_none());
        assert!(Scanner::new("2000").read_status().is_none());

        // failure leaves the cursor untouched
        let mut scn = Scanner::new("20");
        assert!(scn.read_status().is_none());
        assert_eq!(scn.read_line_rest(), "20");
    }

    #[test]
    fn reason_is_trimmed() {
        let mut scn = Scanner::new("Not Found  \r\n");
        assert_eq!(scn.read_reason().as_deref(), Some("Not Found"));
    }

    #[test]
    fn qstring_keeps_quotes_and_escapes() {
        let mut scn = Scanner::new(r#""a \"b\" c" rest"#);
        assert_eq!(
            scn.read_qstring().unwrap().as_deref(),
            Some(r#""a \"b\" c""#)
        );
        assert!(scn.read_space());
    }

    #[test]
    fn qstring_rejects_stray_quote_char() {
        let mut scn = Scanner::new("\"ab\\");
        assert!(scn.read_qstring().is_err());
    }

    #[test]
    fn comment_reads_to_closing_paren() {
        let mut scn = Scanner::new("(a comment), next");
        assert_eq!(
            scn.read_comment().unwrap().as_deref(),
            Some("(a comment)")
        );
        assert!(scn.read_special(b','));
    }

    #[test]
    fn parameters_accept_tokens_and_quoted_strings() {
        let mut scn = Scanner::new("charset=utf-8; q=\"0.5\"");
        let params = scn.read_parameters().unwrap();
        assert_eq!(
            params,
            vec![
                ("charset".to_string(), "utf-8".to_string()),
                ("q".to_string(), "\"0.5\"".to_string()),
            ]
        );
    }

    #[test]
    fn parameters_report_missing_value() {
        let mut scn = Scanner::new("charset=");
        assert!(scn.read_parameters().is_err());

        let mut scn = Scanner::new("charset utf-8");
        assert!(scn.read_parameters().is_err());
    }

    #[test]
    fn version_reads_protocol_and_number() {
        let mut scn = Scanner::new("HTTP/1.1 200");
        assert_eq!(scn.read_version().as_deref(), Some("HTTP/1.1"));
    }

    #[test]
    fn uri_text_is_validated() {
        let mut scn = Scanner::new("/hello.txt HTTP/1.1");
        assert_eq!(scn.read_uri().unwrap().as_deref(), Some("/hello.txt"));
        assert!(scn.read_space());
    }

    #[test]
    fn chunk_size_is_lowercase_hex() {
        assert_eq!(Scanner::new("1a2f").read_chunk_size(), Some(0x1a2f));
        assert_eq!(Scanner::new("0").read_chunk_size(), Some(0));
        assert!(Scanner::new("xyz").read_chunk_size().is_none());

        // uppercase hex is not part of the chunk grammar we accept
        let mut scn = Scanner::new("A0");
        assert!(scn.read_chunk_size().is_none());
    }
}
