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

use log::debug;

use super::defs::*;
use crate::imap::sequence;
use crate::store::MailFlags;
use crate::support::error::Error;

impl CommandProcessor {
    /// STORE and UID STORE.
    pub(super) fn cmd_store(
        &mut self,
        cmd: s::Command,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let store = command_args!(
            &cmd,
            s::Command::Store(c) | s::Command::Uid(s::UidCommand::Store(c)) => c
        );

        let mut requested = MailFlags::empty();
        for name in &store.args.flags {
            match MailFlags::from_name(name) {
                Some(flag) => requested |= flag,
                None => debug!(
                    "{} STORE ignoring unsupported flag {}",
                    self.log_prefix, name
                ),
            }
        }

        let selected = selected!(self)?;
        for seqnum in
            sequence::resolve(&store.messages, selected.mailbox.count())
        {
            let mut message = match selected.mailbox.get(seqnum) {
                Ok(message) => message.clone(),
                Err(Error::MessageOutOfRange) => {
                    debug!(
                        "{} STORE skipping nonexistent message {}",
                        self.log_prefix, seqnum
                    );
                    continue;
                },
                Err(e) => {
                    return Err(catch_all_error_handling(&self.log_prefix, e))
                },
            };

            let flags = apply_store(
                store.args.op,
                MailFlags::decode(&message.flags()),
                requested,
            );

            if flags.contains(MailFlags::DELETED) {
                self.pending_delete.insert(seqnum);
            } else {
                self.pending_delete.remove(&seqnum);
            }

            message.set_flags(&flags.encode());
            selected
                .mailbox
                .update(seqnum, message)
                .map_err(map_error!(self))?;

            if !store.args.silent {
                sender(s::Response::Store(s::StoreResponse {
                    seqnum,
                    uid: seqnum,
                    flags: flags.names().collect(),
                }));
            }
        }

        completed(&cmd)
    }
}

/// Compute the new flags of a message.
///
/// `\Recent` belongs to the server, so a client can neither set nor clear it.
fn apply_store(
    op: s::StoreOp,
    old: MailFlags,
    requested: MailFlags,
) -> MailFlags {
    let requested = requested - MailFlags::RECENT;
    match op {
        s::StoreOp::Replace => requested | (old & MailFlags::RECENT),
        s::StoreOp::Add => old | requested,
        s::StoreOp::Remove => old - requested,
    }
}
