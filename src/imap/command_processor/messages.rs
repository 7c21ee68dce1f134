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

use log::info;

use super::defs::*;

impl CommandProcessor {
    /// Remove every message this session has seen marked `\Deleted`.
    ///
    /// No untagged EXPUNGE responses are sent.
    pub(super) fn cmd_expunge(
        &mut self,
        cmd: s::Command,
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let selected = selected!(self)?;

        // Highest first so that deleting one does not renumber the rest
        for &seqnum in self.pending_delete.iter().rev() {
            selected
                .mailbox
                .delete(seqnum)
                .map_err(map_error!(self))?;
        }
        selected.mailbox.sync().map_err(map_error!(self))?;

        info!(
            "{} Expunged {} messages from {}",
            self.log_prefix,
            self.pending_delete.len(),
            selected.name
        );
        self.pending_delete.clear();

        completed(&cmd)
    }
}
