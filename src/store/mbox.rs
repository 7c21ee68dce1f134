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

//! Mailboxes stored as classic Unix mbox files.
//!
//! The whole file is read into memory on open. Changes are applied to the
//! in-memory copy and written back by `sync`, which replaces the file
//! atomically.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::prelude::*;
use log::debug;

use super::{MailStore, Mailbox, Message};
use crate::support::error::Error;

#[derive(Clone, Copy, Debug, Default)]
pub struct MboxStore;

impl MailStore for MboxStore {
    fn open(&self, path: &Path) -> Result<Box<dyn Mailbox>, Error> {
        Ok(Box::new(MboxMailbox::open(path)?))
    }

    fn mtime(&self, path: &Path) -> Result<u32, Error> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0))
    }
}

pub struct MboxMailbox {
    path: PathBuf,
    messages: Vec<Message>,
    dirty: bool,
}

impl MboxMailbox {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let data = fs::read(path)?;
        let messages = split_mbox(&data)?;
        debug!("Loaded {} messages from {}", messages.len(), path.display());
        Ok(MboxMailbox {
            path: path.to_owned(),
            messages,
            dirty: false,
        })
    }

    fn index(&self, seqnum: u32) -> Result<usize, Error> {
        if seqnum < 1 || seqnum as usize > self.messages.len() {
            return Err(Error::MessageOutOfRange);
        }

        Ok(seqnum as usize - 1)
    }
}

impl Mailbox for MboxMailbox {
    fn count(&self) -> u32 {
        self.messages.len() as u32
    }

    fn get(&self, seqnum: u32) -> Result<&Message, Error> {
        let ix = self.index(seqnum)?;
        Ok(&self.messages[ix])
    }

    fn update(&mut self, seqnum: u32, message: Message) -> Result<(), Error> {
        let ix = self.index(seqnum)?;
        if self.messages[ix] != message {
            self.messages[ix] = message;
            self.dirty = true;
        }
        Ok(())
    }

    fn delete(&mut self, seqnum: u32) -> Result<(), Error> {
        let ix = self.index(seqnum)?;
        self.messages.remove(ix);
        self.dirty = true;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), Error> {
        if !self.dirty {
            return Ok(());
        }

        let default_from_line = format!(
            "From MAILER-DAEMON {}",
            Utc::now().format("%a %b %e %H:%M:%S %Y")
        );
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        for message in &self.messages {
            tmp.write_all(&message.to_mbox_bytes(&default_from_line))?;
            tmp.write_all(b"\n")?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(
            "Wrote {} messages to {}",
            self.messages.len(),
            self.path.display()
        );
        self.dirty = false;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), Error> {
        self.sync()
    }
}

/// Split the content of an mbox file into messages.
///
/// Every line starting with `From ` begins a new message. One blank line
/// before each `From ` line is the separator and is not part of the
/// preceding message.
fn split_mbox(data: &[u8]) -> Result<Vec<Message>, Error> {
    let mut starts = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        if data[pos..].starts_with(b"From ") {
            starts.push(pos);
        } else if starts.is_empty()
            && !data[pos..]
                .iter()
                .take_while(|&&b| b != b'\n')
                .all(u8::is_ascii_whitespace)
        {
            return Err(Error::MalformedMbox(
                "data before first From line".to_owned(),
            ));
        }

        pos = match memchr::memchr(b'\n', &data[pos..]) {
            Some(ix) => pos + ix + 1,
            None => data.len(),
        };
    }

    let mut messages = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or_else(|| data.len());
        let chunk = &data[start..end];

        let (from_line, rest) = match memchr::memchr(b'\n', chunk) {
            Some(ix) => (&chunk[..ix], &chunk[ix + 1..]),
            None => (chunk, &[] as &[u8]),
        };
        let from_line = from_line
            .strip_suffix(b"\r")
            .unwrap_or(from_line)
            .to_vec();

        let rest = if rest.ends_with(b"\r\n\r\n") {
            &rest[..rest.len() - 2]
        } else if rest.ends_with(b"\n\n") {
            &rest[..rest.len() - 1]
        } else {
            rest
        };

        messages.push(Message::parse(Some(from_line), rest));
    }

    Ok(messages)
}
