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

//! A line-level IMAP client for the integration tests.
//!
//! Commands are written as raw text and responses are returned as raw lines,
//! with any literals folded into the line that announced them. The tests
//! make their assertions on the text, which is exactly what a real client
//! would see.

use std::io::{self, BufRead, Read, Write};
use std::str;

use lazy_static::lazy_static;
use regex::bytes::Regex;
use thiserror::Error;

lazy_static! {
    static ref LITERAL_AT_EOL: Regex =
        Regex::new(r#"\{([0-9]+)\}\r\n$"#).unwrap();
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub struct Client<R, W> {
    read: R,
    write: W,
    trace_stderr: Option<&'static str>,
    next_tag: u64,
}

impl<R: BufRead, W: Write> Client<R, W> {
    pub fn new(read: R, write: W, trace_stderr: Option<&'static str>) -> Self {
        Client {
            read,
            write,
            trace_stderr,
            next_tag: 0,
        }
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.trace(">>[raw]", bytes);
        self.write.write_all(bytes)?;
        Ok(())
    }

    pub fn read_line_raw(&mut self, dst: &mut Vec<u8>) -> Result<usize, Error> {
        let start = dst.len();
        let nread = self.read.read_until(b'\n', dst)?;
        self.trace("<<[eol]", &dst[start..]);
        Ok(nread)
    }

    pub fn read_data_raw(
        &mut self,
        dst: &mut Vec<u8>,
        n: u32,
    ) -> Result<usize, Error> {
        let start = dst.len();
        let nread = self.read.by_ref().take(n.into()).read_to_end(dst)?;
        self.trace("<<[lit]", &dst[start..]);
        if n > nread as u32 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Hit EOF before end of literal",
            )));
        }

        Ok(nread)
    }

    /// Read one response line, including the content of any literals it
    /// contains, and without the final CRLF.
    pub fn read_logical_line(&mut self) -> Result<String, Error> {
        let mut dst = Vec::new();
        loop {
            let nread = self.read_line_raw(&mut dst)?;
            if !dst.ends_with(b"\r\n") {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Line didn't end with CRLF",
                )));
            }

            let literal_len = LITERAL_AT_EOL
                .captures(&dst[dst.len() - nread..])
                .and_then(|cap| cap.get(1))
                .and_then(|m| str::from_utf8(m.as_bytes()).ok())
                .and_then(|s| s.parse::<u32>().ok());

            match literal_len {
                Some(literal_len) => {
                    self.read_data_raw(&mut dst, literal_len)?;
                },
                None => break,
            }
        }

        dst.truncate(dst.len() - 2);
        Ok(String::from_utf8_lossy(&dst).into_owned())
    }

    /// Read lines until one which is not untagged, returning all of them.
    ///
    /// This also stops at a continuation request, which the caller must
    /// answer.
    pub fn read_until_tagged(&mut self) -> Result<Vec<String>, Error> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_logical_line()?;
            let done = !line.starts_with("* ");
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Send `command` under a fresh tag and collect the responses up to and
    /// including the tagged one.
    ///
    /// Returns the tag used and the responses.
    pub fn command(
        &mut self,
        command: &str,
    ) -> Result<(String, Vec<String>), Error> {
        let tag = format!("t{}", self.next_tag);
        self.next_tag += 1;

        let line = format!("{} {}\r\n", tag, command);
        self.trace(">>[cmd]", line.as_bytes());
        self.write.write_all(line.as_bytes())?;
        let responses = self.read_until_tagged()?;
        Ok((tag, responses))
    }

    fn trace(&self, what: &str, data: &[u8]) {
        if let Some(prefix) = self.trace_stderr {
            if data.is_empty() {
                eprintln!("{} WIRE {}<empty>", prefix, what);
                return;
            }

            let mut vis = String::new();
            for &byte in data {
                match byte {
                    b' '..=b'~' => vis.push(byte as char),
                    b'\n' => vis.push_str("\\n"),
                    b'\r' => vis.push_str("\\r"),
                    b => vis.push_str(&format!("\\x{:02X}", b)),
                }
            }

            eprintln!("{} WIRE {} {}", prefix, what, vis);
        }
    }
}
