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
use std::convert::TryFrom;

use log::debug;

use super::defs::*;
use crate::imap::sequence;
use crate::store::{MailFlags, Message};
use crate::support::error::Error;

impl CommandProcessor {
    /// FETCH and UID FETCH.
    ///
    /// Message positions double as UIDs, so both forms address messages the
    /// same way. The parser has already put `UID` at the front of the
    /// attribute list of UID FETCH.
    pub(super) fn cmd_fetch(
        &mut self,
        cmd: s::Command,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let fetch = command_args!(
            &cmd,
            s::Command::Fetch(c) | s::Command::Uid(s::UidCommand::Fetch(c)) => c
        );

        let selected = selected!(self)?;
        let mailbox = &selected.mailbox;
        for seqnum in sequence::resolve(&fetch.messages, mailbox.count()) {
            let message = match mailbox.get(seqnum) {
                Ok(message) => message,
                Err(Error::MessageOutOfRange) => {
                    debug!(
                        "{} FETCH skipping nonexistent message {}",
                        self.log_prefix, seqnum
                    );
                    continue;
                },
                Err(e) => {
                    return Err(catch_all_error_handling(&self.log_prefix, e))
                },
            };

            sender(s::Response::Fetch(s::FetchResponse {
                seqnum,
                items: fetch_items(seqnum, message, &fetch.atts),
            }));
        }

        completed(&cmd)
    }
}

/// Build the items of one FETCH response.
///
/// Each response name appears at most once; the first attribute producing it
/// wins. Attributes we cannot represent are left out.
fn fetch_items(
    seqnum: u32,
    message: &Message,
    atts: &[s::FetchAtt],
) -> Vec<s::FetchItem> {
    let mut items: Vec<s::FetchItem> = Vec::with_capacity(atts.len());
    for att in atts {
        if let Some(item) = fetch_att(seqnum, message, att) {
            if !items.iter().any(|i| i.name == item.name) {
                items.push(item);
            }
        }
    }
    items
}

fn fetch_att(
    seqnum: u32,
    message: &Message,
    att: &s::FetchAtt,
) -> Option<s::FetchItem> {
    let (name, value) = match *att {
        s::FetchAtt::Uid => ("UID", s::FetchValue::Number(seqnum.into())),
        s::FetchAtt::Flags => (
            "FLAGS",
            s::FetchValue::Flags(
                MailFlags::decode(&message.flags()).names().collect(),
            ),
        ),
        s::FetchAtt::InternalDate => {
            ("INTERNALDATE", s::FetchValue::DateTime(message.date()?))
        },
        s::FetchAtt::Rfc822Size => (
            "RFC822.SIZE",
            s::FetchValue::Number(message.to_crlf_bytes().len() as u64),
        ),
        s::FetchAtt::Rfc822Header => (
            "RFC822.HEADER",
            s::FetchValue::Data(message.header_block(|_| true)),
        ),
        s::FetchAtt::Rfc822Text => {
            ("RFC822.TEXT", s::FetchValue::Data(message.text()))
        },
        s::FetchAtt::BodySection(ref section) => {
            return Some(body_section(message, section))
        },
        s::FetchAtt::BodyStructure
        | s::FetchAtt::Envelope
        | s::FetchAtt::Body => return None,
    };

    Some(s::FetchItem {
        name: Cow::Borrowed(name),
        value,
    })
}

fn body_section(message: &Message, section: &s::BodySection) -> s::FetchItem {
    let listed = |names: &[String], header: &str| {
        names.iter().any(|n| n.eq_ignore_ascii_case(header))
    };

    // All the header variants answer as BODY[HEADER], so only the first of
    // them in a request is honoured.
    let (name, data): (Cow<'static, str>, Vec<u8>) = match section.section {
        s::Section::Full => ("BODY[]".into(), message.to_crlf_bytes()),
        s::Section::Header => {
            ("BODY[HEADER]".into(), message.header_block(|_| true))
        },
        s::Section::HeaderFields(ref names) => (
            "BODY[HEADER]".into(),
            message.header_block(|h| listed(names, h)),
        ),
        s::Section::HeaderFieldsNot(ref names) => (
            "BODY[HEADER]".into(),
            message.header_block(|h| !listed(names, h)),
        ),
        s::Section::Text => ("BODY[TEXT]".into(), message.text()),
        s::Section::Mime => {
            ("BODY[MIME]".into(), message.header_block(|_| true))
        },
        s::Section::Part(n) => (format!("BODY[{}]", n).into(), part(message, n)),
    };

    match section.partial {
        None => s::FetchItem {
            name,
            value: s::FetchValue::Data(data),
        },
        Some(partial) => s::FetchItem {
            name: format!("{}<{}>", name, partial.offset).into(),
            value: s::FetchValue::Data(slice(&data, partial).to_vec()),
        },
    }
}

/// The body of part `n` (1-based). A message which is not multipart has
/// exactly one part, its own body.
fn part(message: &Message, n: u32) -> Vec<u8> {
    let parts = message.parts();
    if parts.is_empty() {
        return if 1 == n { message.text() } else { Vec::new() };
    }

    n.checked_sub(1)
        .and_then(|ix| parts.get(ix as usize))
        .map(Message::text)
        .unwrap_or_default()
}

fn slice(data: &[u8], partial: s::Partial) -> &[u8] {
    let start = usize::try_from(partial.offset)
        .unwrap_or(usize::MAX)
        .min(data.len());
    let end = match partial.length {
        None => data.len(),
        Some(length) => start
            .saturating_add(usize::try_from(length).unwrap_or(usize::MAX))
            .min(data.len()),
    };
    &data[start..end]
}
