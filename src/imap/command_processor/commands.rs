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

use log::info;

use super::defs::*;

impl CommandProcessor {
    pub(super) fn cmd_capability(
        &mut self,
        cmd: s::Command,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let mut caps = vec![Cow::Borrowed("IMAP4rev1")];
        if !self.authenticated && self.system_config.credentials().is_some() {
            caps.push(Cow::Borrowed("AUTH=CRAM-MD5"));
            caps.push(Cow::Borrowed("AUTH=PLAIN"));
        }

        sender(s::Response::Capability(caps));
        completed(&cmd)
    }

    pub(super) fn cmd_noop(
        &mut self,
        cmd: s::Command,
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        completed(&cmd)
    }

    pub(super) fn cmd_check(
        &mut self,
        cmd: s::Command,
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        selected!(self)?
            .mailbox
            .sync()
            .map_err(map_error!(self))?;
        completed(&cmd)
    }

    /// CLOSE deselects without an implicit EXPUNGE; messages marked
    /// `\Deleted` stay in the mailbox.
    pub(super) fn cmd_close(
        &mut self,
        cmd: s::Command,
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        self.unselect();
        completed(&cmd)
    }

    pub(super) fn cmd_log_out(
        &mut self,
        cmd: s::Command,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        info!("{} Logging out", self.log_prefix);
        self.unselect();
        self.logged_out = true;
        sender(s::Response::Cond(s::CondResponse {
            cond: s::RespCondType::Bye,
            code: None,
            quip: Some(Cow::Borrowed("IMAP4rev1 Server logging out")),
        }));
        completed(&cmd)
    }

    /// CREATE, DELETE, RENAME, and COPY. The mailbox set is fixed by the
    /// configuration and the mailboxes never gain messages, so these always
    /// fail.
    pub(super) fn cmd_always_fail(
        &mut self,
        cmd: s::Command,
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        Err(no(format!("{} failed", cmd.name())))
    }
}
