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

//! The mailbox storage the IMAP layer serves messages from.
//!
//! The IMAP code only sees the `MailStore` and `Mailbox` traits, plus the
//! `SubscriptionLookup` which maps IMAP mailbox names onto backing files. The
//! only real implementation is `mbox::MboxStore`.

pub mod flags;
pub mod mbox;
pub mod message;

pub use self::flags::MailFlags;
pub use self::message::Message;

use std::path::{Path, PathBuf};

use crate::support::error::Error;

/// Opens mailboxes by path.
pub trait MailStore: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn Mailbox>, Error>;

    /// The modification time of the backing file in seconds since the
    /// epoch, used as the UIDVALIDITY of the mailbox.
    fn mtime(&self, path: &Path) -> Result<u32, Error>;
}

/// An open mailbox.
///
/// Messages are addressed by 1-based sequence number. Deleting a message
/// renumbers every message after it.
pub trait Mailbox: Send {
    fn count(&self) -> u32;
    fn get(&self, seqnum: u32) -> Result<&Message, Error>;
    fn update(&mut self, seqnum: u32, message: Message) -> Result<(), Error>;
    fn delete(&mut self, seqnum: u32) -> Result<(), Error>;
    /// Write any pending changes back to the backing file.
    fn sync(&mut self) -> Result<(), Error>;
    /// Sync and release the mailbox.
    fn close(self: Box<Self>) -> Result<(), Error>;
}

/// Resolves IMAP mailbox names to backing files.
pub trait SubscriptionLookup: Send + Sync {
    fn resolve_mailbox(&self, name: &str) -> Option<PathBuf>;
    fn list_known_mailboxes(&self) -> Vec<String>;
}
