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

use std::borrow::Cow;
use std::io::{self, BufRead, Read, Write};

use log::{debug, warn};

use super::command_processor::CommandProcessor;
use super::lex::LexWriter;
use super::syntax as s;
use crate::support::error::Error;

const MAX_CMDLINE: usize = 65536;

/// Drives one IMAP session over a pair of byte streams.
///
/// The server reads one line at a time, hands it to the `CommandProcessor`,
/// and writes back whatever that produces. It knows nothing about sockets, so
/// the same code serves TCP connections, stdio, and the tests.
pub struct Server {
    read: Box<dyn BufRead + Send>,
    write: Box<dyn Write + Send>,
    processor: CommandProcessor,
    sent_bye: bool,
}

impl Server {
    pub fn new<R: BufRead + Send + 'static, W: Write + Send + 'static>(
        read: R,
        write: W,
        processor: CommandProcessor,
    ) -> Self {
        Server {
            read: Box::new(read),
            write: Box::new(write),
            processor,
            sent_bye: false,
        }
    }

    /// Run the server.
    ///
    /// Blocks until an error occurs, a BYE response has been sent, or the
    /// client logs out.
    pub fn run(&mut self) -> Result<(), Error> {
        self.send_response(self.processor.greet())?;

        let mut cmdline = Vec::<u8>::new();

        while !self.sent_bye && !self.processor.logged_out() {
            cmdline.clear();
            if !self.buffer_next_line(&mut cmdline)? {
                continue;
            }

            let line = String::from_utf8_lossy(&cmdline).into_owned();
            match s::parse_command_line(&line) {
                Ok(command_line) => self.handle_command_line(command_line)?,
                Err(e) => self.syntax_error(&line, e)?,
            }
        }

        Ok(())
    }

    fn handle_command_line(
        &mut self,
        command_line: s::CommandLine,
    ) -> Result<(), Error> {
        let tag = command_line.tag.clone();

        // Once an untagged write fails, the rest are dropped and the error
        // ends the session.
        let mut write_error: Option<io::Error> = None;
        let response = {
            let write = &mut self.write;
            let write_error = &mut write_error;
            self.processor.handle_command(command_line, &mut |r| {
                if write_error.is_none() {
                    if let Err(e) = write_line(&mut **write, None, r) {
                        *write_error = Some(e);
                    }
                }
            })
        };

        if let Some(e) = write_error {
            return Err(e.into());
        }

        let continuation =
            matches!(response.response, s::Response::Continuation(_));
        self.send_response(response)?;

        if continuation {
            self.finish_authenticate(tag)?;
        }

        Ok(())
    }

    /// Read the client's answer to an AUTHENTICATE continuation request and
    /// complete the exchange.
    fn finish_authenticate(&mut self, tag: String) -> Result<(), Error> {
        let mut buffer = Vec::new();
        self.read
            .by_ref()
            .take(MAX_CMDLINE as u64)
            .read_until(b'\n', &mut buffer)?;

        if buffer.is_empty() {
            return Err(unexpected_eof());
        }

        if !buffer.ends_with(b"\n") {
            self.send_response(s::ResponseLine {
                tag: None,
                response: s::Response::Cond(s::CondResponse {
                    cond: s::RespCondType::Bye,
                    code: None,
                    quip: Some(Cow::Borrowed(
                        "AUTHENTICATE data too long or read truncated",
                    )),
                }),
            })?;
            return Ok(());
        }

        strip_line_ending(&mut buffer);
        let response = self.processor.authenticate_finish(tag, &buffer);
        self.send_response(response)
    }

    /// Report a line that could not be parsed.
    ///
    /// If the tag can be recovered, only the command fails. Otherwise there
    /// is nothing to reply to and the session is ended.
    fn syntax_error(
        &mut self,
        line: &str,
        error: s::ParseError,
    ) -> Result<(), Error> {
        debug!(
            "{} Rejected command line: {}",
            self.processor.log_prefix(),
            error
        );

        let response = match s::recover_tag(line) {
            Some(tag) => s::ResponseLine {
                tag: Some(tag.to_owned()),
                response: s::Response::Cond(s::CondResponse {
                    cond: s::RespCondType::Bad,
                    code: None,
                    quip: Some(Cow::Owned(format!("syntax error: {}", error))),
                }),
            },
            None => s::ResponseLine {
                tag: None,
                response: s::Response::Cond(s::CondResponse {
                    cond: s::RespCondType::Bye,
                    code: None,
                    quip: Some(Cow::Owned(format!("syntax error: {}", error))),
                }),
            },
        };
        self.send_response(response)
    }

    /// Read the next line into `cmdline`, without its line ending.
    ///
    /// Both DOS newlines and bare LF are accepted.
    ///
    /// If EOF is reached before the full line is read, returns an
    /// `UnexpectedEof` IO error.
    ///
    /// If the maximum command line length is exceeded, sends an appropriate
    /// response to the client, swallows the rest of the line, and returns
    /// `false`.
    fn buffer_next_line(
        &mut self,
        cmdline: &mut Vec<u8>,
    ) -> Result<bool, Error> {
        let nread = self
            .read
            .by_ref()
            .take(MAX_CMDLINE as u64)
            .read_until(b'\n', cmdline)?;

        if 0 == nread {
            return Err(unexpected_eof());
        }

        if !cmdline.ends_with(b"\n") {
            self.command_line_too_long(cmdline)?;
            return Ok(false);
        }

        strip_line_ending(cmdline);
        Ok(true)
    }

    /// Handle command rejection due to the command line limit being exceeded.
    fn command_line_too_long(
        &mut self,
        cmdline: &mut Vec<u8>,
    ) -> Result<(), Error> {
        warn!(
            "{} Command line exceeded {} bytes",
            self.processor.log_prefix(),
            MAX_CMDLINE
        );

        let tag = s::recover_tag(&String::from_utf8_lossy(cmdline))
            .map(str::to_owned);
        match tag {
            Some(tag) => {
                self.send_response(s::ResponseLine {
                    tag: Some(tag),
                    response: s::Response::Cond(s::CondResponse {
                        cond: s::RespCondType::No,
                        code: None,
                        quip: Some(Cow::Borrowed("Command line too long")),
                    }),
                })?;
                self.discard_line()?;
            },
            None => {
                // The RFC 3501 grammar doesn't allow tagged BYE, so if we're
                // going to send BYE, we need to ensure it is untagged.
                self.send_response(s::ResponseLine {
                    tag: None,
                    response: s::Response::Cond(s::CondResponse {
                        cond: s::RespCondType::Bye,
                        code: None,
                        quip: Some(Cow::Borrowed(
                            "That doesn't look anything like \
                             an IMAP command!",
                        )),
                    }),
                })?;
            },
        }

        cmdline.clear();
        Ok(())
    }

    /// Discard input up to and including the next line feed.
    fn discard_line(&mut self) -> Result<(), Error> {
        let mut chunk = Vec::new();
        loop {
            chunk.clear();
            let nread = self
                .read
                .by_ref()
                .take(MAX_CMDLINE as u64)
                .read_until(b'\n', &mut chunk)?;
            if 0 == nread {
                return Err(unexpected_eof());
            }
            if chunk.ends_with(b"\n") {
                return Ok(());
            }
        }
    }

    fn send_response(&mut self, r: s::ResponseLine) -> Result<(), Error> {
        self.sent_bye |= matches!(
            r, s::ResponseLine { response: s::Response::Cond(s::CondResponse {
                cond: s::RespCondType::Bye,
                ..
            }), .. });

        write_line(&mut *self.write, r.tag, r.response)?;
        self.write.flush()?;
        Ok(())
    }
}

fn write_line(
    w: &mut dyn Write,
    tag: Option<String>,
    response: s::Response,
) -> io::Result<()> {
    let mut lex = LexWriter::new(w);
    s::ResponseLine { tag, response }.write_to(&mut lex)?;
    lex.verbatim_bytes(b"\r\n")
}

fn strip_line_ending(line: &mut Vec<u8>) {
    if line.ends_with(b"\n") {
        line.pop();
    }
    if line.ends_with(b"\r") {
        line.pop();
    }
}

fn unexpected_eof() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "EOF reached before reading full line",
    ))
}
