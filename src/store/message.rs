//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Mboxd.
//
// Mboxd is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mboxd is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mboxd. If not, see <http://www.gnu.org/licenses/>.

//! A single stored email message.
//!
//! The message is kept close to its on-disk form: an ordered list of raw
//! header fields and the unparsed body. Header bytes are only decoded for
//! lookups, so 8-bit headers survive being written back. Nothing here decodes MIME beyond
//! what is needed to find the parts of a multipart message.

use std::borrow::Cow;

use chrono::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BOUNDARY: Regex =
        Regex::new(r#"(?i);\s*boundary\s*=\s*(?:"([^"]*)"|([^;\s]+))"#)
            .unwrap();
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Header {
    name: Vec<u8>,
    /// The value after the colon and any following whitespace. Folded
    /// continuation lines are kept, joined with bare LF.
    raw: Vec<u8>,
}

impl Header {
    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.as_bytes())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    from_line: Option<Vec<u8>>,
    headers: Vec<Header>,
    body: Vec<u8>,
}

impl Message {
    /// Parse a message from its raw bytes.
    ///
    /// `from_line` is the mbox envelope line without its terminator, if the
    /// message came out of an mbox file.
    pub fn parse(from_line: Option<Vec<u8>>, data: &[u8]) -> Self {
        let mut headers = Vec::<Header>::new();
        let mut pos = 0;

        while pos < data.len() {
            let (line, next) = next_line(data, pos);
            if line.is_empty() {
                pos = next;
                break;
            }

            if line[0] == b' ' || line[0] == b'\t' {
                if let Some(last) = headers.last_mut() {
                    last.raw.push(b'\n');
                    last.raw.extend_from_slice(line);
                    pos = next;
                    continue;
                }
            }

            match memchr::memchr(b':', line) {
                Some(colon) if colon > 0 => {
                    headers.push(Header {
                        name: trim_trailing_space(&line[..colon]).to_vec(),
                        raw: trim_leading_space(&line[colon + 1..]).to_vec(),
                    });
                    pos = next;
                },
                // Not a header line, so the body starts here
                _ => break,
            }
        }

        Message {
            from_line,
            headers,
            body: data[pos..].to_vec(),
        }
    }

    pub fn from_line(&self) -> Option<&[u8]> {
        self.from_line.as_deref()
    }

    /// The first value of the named header, with folding removed.
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers
            .iter()
            .find(|h| h.is(name))
            .map(|h| unfold(&h.raw))
    }

    /// Set the named header, replacing every existing occurrence. An empty
    /// value removes the header.
    pub fn set_header(&mut self, name: &str, value: &str) {
        let first = self
            .headers
            .iter()
            .position(|h| h.is(name));
        self.headers.retain(|h| !h.is(name));

        if value.is_empty() {
            return;
        }

        let header = Header {
            name: name.as_bytes().to_vec(),
            raw: value.as_bytes().to_vec(),
        };
        match first {
            Some(ix) => self.headers.insert(ix, header),
            None => self.headers.push(header),
        }
    }

    /// The mbox flag characters of this message, from the `Status` and
    /// `X-Status` headers.
    pub fn flags(&self) -> String {
        let mut flags = String::new();
        for name in &["Status", "X-Status"] {
            if let Some(value) = self.header(name) {
                flags.push_str(value.trim());
            }
        }
        flags
    }

    /// Store flag characters, splitting them between `Status` (`R`, `O`) and
    /// `X-Status` (`D`, `F`, `A`).
    pub fn set_flags(&mut self, flags: &str) {
        let status: String = flags.chars().filter(|c| "RO".contains(*c)).collect();
        let xstatus: String =
            flags.chars().filter(|c| "DFA".contains(*c)).collect();
        self.set_header("Status", &status);
        self.set_header("X-Status", &xstatus);
    }

    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.header("Date")
            .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
    }

    /// Render the header block with CRLF line endings, including the blank
    /// line that terminates it.
    ///
    /// Only headers for which `include` returns true are written.
    pub fn header_block(&self, include: impl Fn(&str) -> bool) -> Vec<u8> {
        let mut out = Vec::new();
        for header in self
            .headers
            .iter()
            .filter(|h| include(&String::from_utf8_lossy(&h.name)))
        {
            out.extend_from_slice(&header.name);
            out.extend_from_slice(b": ");
            crlf(&header.raw, &mut out);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }

    /// The body with CRLF line endings.
    pub fn text(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len());
        crlf(&self.body, &mut out);
        out
    }

    /// The full message with CRLF line endings.
    pub fn to_crlf_bytes(&self) -> Vec<u8> {
        let mut out = self.header_block(|_| true);
        crlf(&self.body, &mut out);
        out
    }

    /// Split a multipart message into its parts.
    ///
    /// Returns an empty list if this is not a multipart message.
    pub fn parts(&self) -> Vec<Message> {
        let boundary = match self.boundary() {
            Some(b) => b,
            None => return Vec::new(),
        };
        let delimiter = format!("--{}", boundary);
        let close_delimiter = format!("--{}--", boundary);

        let mut parts = Vec::new();
        let mut current: Option<Vec<&[u8]>> = None;
        let mut pos = 0;
        while pos < self.body.len() {
            let (line, next) = next_line(&self.body, pos);
            pos = next;

            let trimmed = trim_trailing_space(line);
            if trimmed == close_delimiter.as_bytes() {
                break;
            }

            if trimmed == delimiter.as_bytes() {
                if let Some(lines) = current.take() {
                    parts.push(Message::parse(None, &lines.join(&b'\n')));
                }
                current = Some(Vec::new());
            } else if let Some(ref mut lines) = current {
                lines.push(line);
            }
        }

        if let Some(lines) = current {
            parts.push(Message::parse(None, &lines.join(&b'\n')));
        }

        parts
    }

    fn boundary(&self) -> Option<String> {
        let content_type = self.header("Content-Type")?;
        if !content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("multipart/")
        {
            return None;
        }

        BOUNDARY.captures(&content_type).and_then(|cap| {
            cap.get(1)
                .or_else(|| cap.get(2))
                .map(|m| m.as_str().to_owned())
        })
    }

    /// Render the message in mbox form: envelope line, headers, then the
    /// body with `From ` lines quoted. The result always ends with a line
    /// feed.
    pub fn to_mbox_bytes(&self, default_from_line: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(
            self.from_line
                .as_deref()
                .unwrap_or_else(|| default_from_line.as_bytes()),
        );
        out.push(b'\n');

        for header in &self.headers {
            out.extend_from_slice(&header.name);
            out.extend_from_slice(b": ");
            out.extend_from_slice(&header.raw);
            out.push(b'\n');
        }
        out.push(b'\n');

        let mut pos = 0;
        while pos < self.body.len() {
            let (line, next) = next_line(&self.body, pos);
            if line.starts_with(b"From ") {
                out.push(b'>');
            }
            out.extend_from_slice(&self.body[pos..next]);
            pos = next;
        }

        if !out.ends_with(b"\n") {
            out.push(b'\n');
        }

        out
    }
}

/// Returns the line starting at `pos` without its terminator (LF or CRLF),
/// and the position just past the terminator.
fn next_line(data: &[u8], pos: usize) -> (&[u8], usize) {
    let (end, next) = match memchr::memchr(b'\n', &data[pos..]) {
        Some(ix) => (pos + ix, pos + ix + 1),
        None => (data.len(), data.len()),
    };
    let line = &data[pos..end];
    let line = if line.ends_with(b"\r") {
        &line[..line.len() - 1]
    } else {
        line
    };
    (line, next)
}

fn trim_trailing_space(mut line: &[u8]) -> &[u8] {
    while let Some((&last, rest)) = line.split_last() {
        if last != b' ' && last != b'\t' {
            break;
        }
        line = rest;
    }
    line
}

fn trim_leading_space(mut line: &[u8]) -> &[u8] {
    while let Some((&first, rest)) = line.split_first() {
        if first != b' ' && first != b'\t' {
            break;
        }
        line = rest;
    }
    line
}

fn unfold(raw: &[u8]) -> Cow<'_, str> {
    if raw.contains(&b'\n') {
        let joined: Vec<u8> =
            raw.iter().copied().filter(|&b| b != b'\n').collect();
        Cow::Owned(String::from_utf8_lossy(&joined).into_owned())
    } else {
        String::from_utf8_lossy(raw)
    }
}

/// Append `data` to `out`, converting bare LF into CRLF.
fn crlf(data: &[u8], out: &mut Vec<u8>) {
    let mut start = 0;
    for lf in memchr::memchr_iter(b'\n', data) {
        if lf > 0 && data[lf - 1] == b'\r' {
            continue;
        }
        out.extend_from_slice(&data[start..lf]);
        out.extend_from_slice(b"\r\n");
        start = lf + 1;
    }
    out.extend_from_slice(&data[start..]);
}
