//! Incremental multipart parser.
//!
//! [`MultipartParser`] is a push-style state machine: the caller feeds it
//! chunks as they arrive from the network and pulls [`ParserEvent`]s until it
//! reports that it needs more input. It never performs I/O itself and never
//! holds more than one header line, or one delimiter's worth of body bytes,
//! beyond what it has already handed out.
//!
//! Both CRLF and bare LF line endings are accepted. The preamble before the
//! first boundary and the epilogue after the closing boundary are ignored.

use bytes::{Buf, Bytes, BytesMut};

use formdata_rs_core::{FormDataError, FormDataResult};

/// Longest run of bytes tolerated between a boundary and its line ending.
const MAX_BOUNDARY_PADDING: usize = 256;

/// Headers of one part that matter for decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    /// The `name` parameter of `Content-Disposition`.
    pub name: Option<String>,
    /// The `filename` parameter of `Content-Disposition`, if any.
    ///
    /// Presence (even when empty) marks the part as a file.
    pub filename: Option<String>,
    /// The part's own `Content-Type`, if given.
    pub content_type: Option<String>,
}

impl PartHeaders {
    /// Returns `true` if this part carries a file.
    pub const fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Applies one raw `Name: value` header line.
    fn apply_line(&mut self, line: &str) {
        let Some((key, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();

        if key.trim().eq_ignore_ascii_case("content-disposition") {
            let params = header_params(value);
            let mut extended_filename = None;
            for (param, param_value) in params {
                match param.as_str() {
                    "name" => self.name = Some(param_value),
                    "filename" => self.filename = Some(param_value),
                    "filename*" => extended_filename = Some(decode_ext_value(&param_value)),
                    _ => {}
                }
            }
            if let Some(filename) = extended_filename {
                self.filename = Some(filename);
            }
        } else if key.trim().eq_ignore_ascii_case("content-type") && !value.is_empty() {
            self.content_type = Some(value.to_string());
        }
    }
}

/// Something the parser recognised in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserEvent {
    /// A new part begins.
    PartStart(PartHeaders),
    /// A chunk of the current part's body.
    Data(Bytes),
    /// The current part's body is complete.
    PartEnd,
    /// The closing boundary was seen. No further events follow.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    AfterBoundary,
    Headers,
    Body,
    Finished,
}

/// Push-style multipart state machine.
///
/// # Examples
///
/// ```
/// use formdata_rs_http::parser::{MultipartParser, ParserEvent};
///
/// let mut parser = MultipartParser::new("xyz", 1024);
/// parser.feed(b"--xyz\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--xyz--\r\n");
///
/// let mut events = Vec::new();
/// while let Some(event) = parser.next_event().unwrap() {
///     events.push(event);
/// }
/// assert!(matches!(events[0], ParserEvent::PartStart(_)));
/// assert_eq!(events.last(), Some(&ParserEvent::Finished));
/// ```
#[derive(Debug)]
pub struct MultipartParser {
    /// `\n--boundary`; the optional `\r` before it is handled separately.
    delimiter: Vec<u8>,
    buffer: BytesMut,
    state: State,
    headers: PartHeaders,
    header_bytes: usize,
    max_header_size: usize,
}

impl MultipartParser {
    /// Creates a parser for the given boundary.
    ///
    /// `max_header_size` bounds the header block of each part.
    pub fn new(boundary: &str, max_header_size: usize) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 3);
        delimiter.extend_from_slice(b"\n--");
        delimiter.extend_from_slice(boundary.as_bytes());

        // A virtual line break lets the very first boundary match the same
        // delimiter as every later one.
        let mut buffer = BytesMut::with_capacity(8192);
        buffer.extend_from_slice(b"\r\n");

        Self {
            delimiter,
            buffer,
            state: State::Preamble,
            headers: PartHeaders::default(),
            header_bytes: 0,
            max_header_size,
        }
    }

    /// Appends a chunk of input. Input after the closing boundary is dropped.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.state != State::Finished {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Returns `true` once the closing boundary has been seen.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Checks that the input ended at a valid point.
    ///
    /// Call this when the underlying stream is exhausted.
    pub fn finish(&self) -> FormDataResult<()> {
        match self.state {
            State::Finished => Ok(()),
            State::Preamble => Err(FormDataError::Parse(
                "unexpected end of form: no multipart boundary found".to_string(),
            )),
            State::AfterBoundary | State::Headers | State::Body => Err(FormDataError::Parse(
                "unexpected end of form: missing closing boundary".to_string(),
            )),
        }
    }

    /// Returns the next event, or `Ok(None)` when more input is needed.
    pub fn next_event(&mut self) -> FormDataResult<Option<ParserEvent>> {
        loop {
            match self.state {
                State::Preamble => {
                    if let Some(pos) = find(&self.buffer, &self.delimiter) {
                        self.buffer.advance(pos + self.delimiter.len());
                        self.state = State::AfterBoundary;
                    } else {
                        let keep = self.delimiter.len() - 1;
                        if self.buffer.len() > keep {
                            let discard = self.buffer.len() - keep;
                            self.buffer.advance(discard);
                        }
                        return Ok(None);
                    }
                }
                State::AfterBoundary => {
                    if self.buffer.len() < 2 {
                        return Ok(None);
                    }
                    if self.buffer.starts_with(b"--") {
                        self.state = State::Finished;
                        self.buffer.clear();
                        return Ok(Some(ParserEvent::Finished));
                    }
                    let Some(pos) = find(&self.buffer, b"\n") else {
                        if self.buffer.len() > MAX_BOUNDARY_PADDING {
                            return Err(malformed_boundary());
                        }
                        return Ok(None);
                    };
                    let line = trim_cr(&self.buffer[..pos]);
                    if !line.iter().all(|b| matches!(b, b' ' | b'\t')) {
                        return Err(malformed_boundary());
                    }
                    self.buffer.advance(pos + 1);
                    self.headers = PartHeaders::default();
                    self.header_bytes = 0;
                    self.state = State::Headers;
                }
                State::Headers => {
                    let Some(pos) = find(&self.buffer, b"\n") else {
                        if self.header_bytes + self.buffer.len() > self.max_header_size {
                            return Err(header_too_large(self.max_header_size));
                        }
                        return Ok(None);
                    };
                    self.header_bytes += pos + 1;
                    if self.header_bytes > self.max_header_size {
                        return Err(header_too_large(self.max_header_size));
                    }

                    let line = self.buffer.split_to(pos + 1);
                    let line = trim_cr(&line[..pos]);
                    if line.is_empty() {
                        self.state = State::Body;
                        let headers = std::mem::take(&mut self.headers);
                        return Ok(Some(ParserEvent::PartStart(headers)));
                    }
                    self.headers.apply_line(&String::from_utf8_lossy(line));
                }
                State::Body => {
                    if let Some(pos) = find(&self.buffer, &self.delimiter) {
                        let end = if pos > 0 && self.buffer[pos - 1] == b'\r' {
                            pos - 1
                        } else {
                            pos
                        };
                        if end > 0 {
                            let data = self.buffer.split_to(end).freeze();
                            return Ok(Some(ParserEvent::Data(data)));
                        }
                        self.buffer.advance(pos + self.delimiter.len());
                        self.state = State::AfterBoundary;
                        return Ok(Some(ParserEvent::PartEnd));
                    }

                    // Hold back enough bytes to catch a delimiter (and its
                    // `\r`) that straddles the next chunk.
                    let keep = self.delimiter.len();
                    if self.buffer.len() > keep {
                        let data = self.buffer.split_to(self.buffer.len() - keep).freeze();
                        return Ok(Some(ParserEvent::Data(data)));
                    }
                    return Ok(None);
                }
                State::Finished => return Ok(None),
            }
        }
    }
}

fn malformed_boundary() -> FormDataError {
    FormDataError::Parse("malformed multipart boundary line".to_string())
}

fn header_too_large(limit: usize) -> FormDataError {
    FormDataError::Parse(format!("part header block exceeds {limit} bytes"))
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Finds the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Splits a parameterized header value (`Content-Disposition`,
/// `Content-Type`) into lower-cased parameter names and unquoted values.
///
/// For example, `form-data; name="field1"; filename="a;b.txt"` yields
/// `[("name", "field1"), ("filename", "a;b.txt")]`.
pub(crate) fn header_params(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = value.chars().peekable();

    // Skip the leading type.
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    loop {
        let mut key = String::new();
        let mut has_value = false;
        for c in chars.by_ref() {
            if c == '=' {
                has_value = true;
                break;
            }
            if c == ';' {
                break;
            }
            key.push(c);
        }
        let key = key.trim().to_ascii_lowercase();
        if !has_value {
            if chars.peek().is_none() {
                break;
            }
            continue;
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut param_value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            param_value.push(escaped);
                        }
                    }
                    _ => param_value.push(c),
                }
            }
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
            }
        } else {
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
                param_value.push(c);
            }
            param_value = param_value.trim().to_string();
        }

        if !key.is_empty() {
            params.push((key, param_value));
        }
        if chars.peek().is_none() {
            break;
        }
    }

    params
}

/// Decodes an RFC 5987 `ext-value` such as `UTF-8''na%C3%AFve.txt`.
///
/// ISO-8859-1 is decoded byte by byte and other charsets as lossy UTF-8. A
/// value without the charset prefix is returned as is.
fn decode_ext_value(value: &str) -> String {
    let mut pieces = value.splitn(3, '\'');
    let (Some(charset), Some(_language), Some(encoded)) =
        (pieces.next(), pieces.next(), pieces.next())
    else {
        return value.to_string();
    };

    let decoded = percent_decode(encoded.as_bytes());
    if charset.eq_ignore_ascii_case("iso-8859-1") || charset.eq_ignore_ascii_case("latin1") {
        decoded.iter().map(|&b| char::from(b)).collect()
    } else {
        String::from_utf8_lossy(&decoded).into_owned()
    }
}

/// Decodes `%XX` escapes; malformed escapes are kept literally.
fn percent_decode(bytes: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'%' && i + 2 < bytes.len())
            .then(|| std::str::from_utf8(&bytes[i + 1..i + 3]).ok())
            .flatten()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        if let Some(byte) = escaped {
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    decoded
}
