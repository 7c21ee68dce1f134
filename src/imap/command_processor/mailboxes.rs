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

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::defs::*;
use crate::store::{MailFlags, MailStore, Mailbox};
use crate::support::error::Error;
use crate::support::mailbox_paths::mailbox_name_matcher;

/// The numbers reported by SELECT, EXAMINE and STATUS.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct MailboxStats {
    messages: u32,
    recent: u32,
    uid_next: u32,
    uid_validity: u32,
}

impl MailboxStats {
    fn gather(
        store: &dyn MailStore,
        path: &Path,
        mailbox: &dyn Mailbox,
    ) -> Result<Self, Error> {
        let messages = mailbox.count();
        let mut recent = 0;
        for seqnum in 1..=messages {
            if MailFlags::decode(&mailbox.get(seqnum)?.flags())
                .contains(MailFlags::RECENT)
            {
                recent += 1;
            }
        }

        Ok(MailboxStats {
            messages,
            recent,
            uid_next: messages + 1,
            uid_validity: store.mtime(path)?,
        })
    }
}

impl CommandProcessor {
    /// SELECT and EXAMINE. Both open the mailbox read-write.
    pub(super) fn cmd_select(
        &mut self,
        cmd: s::Command,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let name = command_args!(
            &cmd,
            s::Command::Select(name) | s::Command::Examine(name) => name.clone()
        );

        let path = self.resolve(&cmd, &name)?;
        self.unselect();
        let mailbox = self.open(&name, &path)?;
        let stats = MailboxStats::gather(&*self.store, &path, &*mailbox)
            .map_err(map_error!(self))?;

        let all_flags = MailFlags::all().names().collect::<Vec<_>>();
        sender(s::Response::Flags(all_flags.clone()));
        sender(s::Response::Cond(s::CondResponse {
            cond: s::RespCondType::Ok,
            code: Some(s::RespTextCode::PermanentFlags(all_flags)),
            quip: Some("Limited".into()),
        }));
        sender(s::Response::Cond(s::CondResponse {
            cond: s::RespCondType::Ok,
            code: Some(s::RespTextCode::UidValidity(stats.uid_validity)),
            quip: Some("UIDs valid".into()),
        }));
        sender(s::Response::Cond(s::CondResponse {
            cond: s::RespCondType::Ok,
            code: Some(s::RespTextCode::UidNext(stats.uid_next)),
            quip: Some("Predicted next UID".into()),
        }));
        sender(s::Response::Exists(stats.messages));
        sender(s::Response::Recent(stats.recent));

        info!(
            "{} Selected {} ({} messages)",
            self.log_prefix, name, stats.messages
        );
        self.selected = Some(Selected { name, mailbox });
        self.pending_delete.clear();

        Ok(s::Response::Cond(s::CondResponse {
            cond: s::RespCondType::Ok,
            code: Some(s::RespTextCode::ReadWrite),
            quip: Some(format!("{} completed", cmd.name()).into()),
        }))
    }

    pub(super) fn cmd_status(
        &mut self,
        cmd: s::Command,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let status = command_args!(&cmd, s::Command::Status(c) => c);

        let path = self.resolve(&cmd, &status.mailbox)?;
        let mailbox = self.open(&status.mailbox, &path)?;
        let stats = MailboxStats::gather(&*self.store, &path, &*mailbox);
        if let Err(e) = mailbox.close() {
            warn!(
                "{} Failed to close {}: {}",
                self.log_prefix, status.mailbox, e
            );
        }
        let stats = stats.map_err(map_error!(self))?;

        let atts = status
            .atts
            .iter()
            .map(|&att| {
                let value = match att {
                    // UNSEEN is reported as the total message count
                    s::StatusAtt::Messages | s::StatusAtt::Unseen => {
                        stats.messages
                    },
                    s::StatusAtt::Recent => stats.recent,
                    s::StatusAtt::UidNext => stats.uid_next,
                    s::StatusAtt::UidValidity => stats.uid_validity,
                };
                (att, value)
            })
            .collect();

        sender(s::Response::Status(s::StatusResponse {
            mailbox: status.mailbox.clone(),
            atts,
        }));
        completed(&cmd)
    }

    pub(super) fn cmd_list(
        &mut self,
        cmd: s::Command,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let names = self.lookup.list_known_mailboxes();
        list_matching(&cmd, names, sender)
    }

    pub(super) fn cmd_lsub(
        &mut self,
        cmd: s::Command,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let names = self.subscribed.iter().cloned().collect();
        list_matching(&cmd, names, sender)
    }

    pub(super) fn cmd_subscribe(
        &mut self,
        cmd: s::Command,
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let name = command_args!(&cmd, s::Command::Subscribe(name) => name);
        self.subscribed.insert(name.clone());
        completed(&cmd)
    }

    pub(super) fn cmd_unsubscribe(
        &mut self,
        cmd: s::Command,
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let name = command_args!(&cmd, s::Command::Unsubscribe(name) => name);
        self.subscribed.remove(name);
        completed(&cmd)
    }

    fn resolve(&self, cmd: &s::Command, name: &str) -> PartialResult<PathBuf> {
        self.lookup
            .resolve_mailbox(name)
            .ok_or_else(|| no(format!("{} no such mailbox", cmd.name())))
    }

    fn open(
        &self,
        name: &str,
        path: &Path,
    ) -> PartialResult<Box<dyn Mailbox>> {
        self.store.open(path).map_err(|e| {
            warn!(
                "{} Unable to open {} at {}: {}",
                self.log_prefix,
                name,
                path.display(),
                e
            );
            no(format!("unable to open mailbox: {}", e))
        })
    }
}

/// Send a LIST or LSUB line for every name in `names` matching the pattern
/// of `cmd`.
///
/// An empty pattern matches everything. If the pattern would match the empty
/// name, the hierarchy root is reported as well.
fn list_matching(
    cmd: &s::Command,
    names: Vec<String>,
    sender: SendResponse<'_>,
) -> CmdResult {
    let (list, lsub) = command_args!(
        cmd,
        s::Command::List(list) => (list, false),
        s::Command::Lsub(list) => (list, true),
    );
    let wrap = |ml: s::MailboxList| {
        if lsub {
            s::Response::Lsub(ml)
        } else {
            s::Response::List(ml)
        }
    };

    let matcher: Box<dyn Fn(&str) -> bool> = if list.pattern.is_empty() {
        Box::new(|_: &str| true)
    } else {
        Box::new(mailbox_name_matcher(&list.pattern))
    };

    let mut found = false;
    if matcher("") {
        sender(wrap(s::MailboxList {
            flags: vec!["Noselect", "HasChildren"],
            name: String::new(),
        }));
        found = true;
    }

    for name in names {
        if matcher(&name) {
            sender(wrap(s::MailboxList {
                flags: vec!["Marked", "HasNoChildren"],
                name,
            }));
            found = true;
        }
    }

    if found {
        completed(cmd)
    } else {
        Err(no(format!("{} nothing found", cmd.name())))
    }
}
