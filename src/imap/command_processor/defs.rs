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
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use lazy_static::lazy_static;
use log::{error, warn};

use crate::store::{MailStore, Mailbox, SubscriptionLookup};
use crate::support::{
    error::Error, log_prefix::LogPrefix, system_config::SystemConfig,
};

pub(super) use crate::imap::syntax as s;

pub(super) static GREETING: &str = "IMAP4rev1 Service Ready";

/// Receives commands in the AST defined in the `syntax` module, and emits
/// responses in that same model.
///
/// One `CommandProcessor` exists per connection and owns all of that
/// session's state. Nothing in it is shared with other sessions.
pub struct CommandProcessor {
    pub(super) log_prefix: LogPrefix,
    pub(super) system_config: Arc<SystemConfig>,
    pub(super) lookup: Arc<dyn SubscriptionLookup>,
    pub(super) store: Arc<dyn MailStore>,

    pub(super) authenticated: bool,
    pub(super) selected: Option<Selected>,
    pub(super) subscribed: BTreeSet<String>,
    /// Positions in the selected mailbox currently carrying `\Deleted`, as
    /// far as this session has seen. EXPUNGE removes exactly these.
    pub(super) pending_delete: BTreeSet<u32>,
    pub(super) pending_auth: Option<PendingAuth>,

    pub(super) logged_out: bool,
}

pub(super) struct Selected {
    pub(super) name: String,
    pub(super) mailbox: Box<dyn Mailbox>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum AuthMechanism {
    CramMd5,
    Plain,
}

impl AuthMechanism {
    pub(super) fn name(self) -> &'static str {
        match self {
            AuthMechanism::CramMd5 => "CRAM-MD5",
            AuthMechanism::Plain => "PLAIN",
        }
    }
}

/// An AUTHENTICATE exchange waiting for the client's reply to the
/// continuation request.
pub(super) struct PendingAuth {
    pub(super) mechanism: AuthMechanism,
    /// The challenge sent to the client, before base64 encoding.
    pub(super) challenge: String,
}

/// Used just for the convenient `?` operator. We mostly don't distinguish `Ok`
/// from `Err` --- the contained value is sent down the wire.
pub(super) type CmdResult = Result<s::Response, s::Response>;

/// Return value from an operation that can either succeed with a value, or
/// fail with an IMAP response.
pub(super) type PartialResult<T> = Result<T, s::Response>;

/// Function pointer used to send additional non-tagged responses.
pub(super) type SendResponse<'a> = &'a mut dyn FnMut(s::Response);

type Handler =
    fn(&mut CommandProcessor, s::Command, SendResponse<'_>) -> CmdResult;

/// How a command is dispatched.
pub(super) struct CommandDescriptor {
    pub(super) handler: Handler,
    pub(super) needs_auth: bool,
    pub(super) needs_mailbox: bool,
}

macro_rules! command_table {
    ($($name:expr => ($handler:ident, $needs_auth:expr, $needs_mailbox:expr),)*) => {{
        let mut table = HashMap::<&'static str, CommandDescriptor>::new();
        $(table.insert($name, CommandDescriptor {
            handler: CommandProcessor::$handler,
            needs_auth: $needs_auth,
            needs_mailbox: $needs_mailbox,
        });)*
        table
    }};
}

lazy_static! {
    pub(super) static ref COMMANDS: HashMap<&'static str, CommandDescriptor> = command_table! {
        "AUTHENTICATE" => (cmd_authenticate, false, false),
        "CAPABILITY" => (cmd_capability, false, false),
        // Selection implies login, so CHECK only checks for a mailbox
        "CHECK" => (cmd_check, false, true),
        "CLOSE" => (cmd_close, true, true),
        "COPY" => (cmd_always_fail, true, true),
        "CREATE" => (cmd_always_fail, true, false),
        "DELETE" => (cmd_always_fail, true, false),
        "EXAMINE" => (cmd_select, true, false),
        "EXPUNGE" => (cmd_expunge, true, true),
        "FETCH" => (cmd_fetch, true, true),
        "LIST" => (cmd_list, true, false),
        "LOGIN" => (cmd_log_in, false, false),
        "LOGOUT" => (cmd_log_out, false, false),
        "LSUB" => (cmd_lsub, true, false),
        "NOOP" => (cmd_noop, false, false),
        "RENAME" => (cmd_always_fail, true, false),
        "SELECT" => (cmd_select, true, false),
        "STATUS" => (cmd_status, true, false),
        "STORE" => (cmd_store, true, true),
        "SUBSCRIBE" => (cmd_subscribe, true, false),
        "UID FETCH" => (cmd_fetch, true, true),
        "UID STORE" => (cmd_store, true, true),
        "UNSUBSCRIBE" => (cmd_unsubscribe, true, false),
    };
}

impl CommandProcessor {
    pub fn new(
        log_prefix: LogPrefix,
        system_config: Arc<SystemConfig>,
        store: Arc<dyn MailStore>,
    ) -> Self {
        let authenticated = system_config.credentials().is_none();
        CommandProcessor {
            log_prefix,
            lookup: Arc::clone(&system_config) as Arc<dyn SubscriptionLookup>,
            system_config,
            store,

            authenticated,
            selected: None,
            subscribed: BTreeSet::new(),
            pending_delete: BTreeSet::new(),
            pending_auth: None,

            logged_out: false,
        }
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        &self.log_prefix
    }

    pub fn logged_out(&self) -> bool {
        self.logged_out
    }

    /// Return the greeting line to send to the client.
    pub fn greet(&self) -> s::ResponseLine {
        s::ResponseLine {
            tag: None,
            response: ok(GREETING),
        }
    }

    /// Handles a regular command.
    ///
    /// `sender` can be called with untagged responses as needed; they are
    /// written before the returned tagged response.
    ///
    /// If the returned response is a continuation request, the server must
    /// read one line from the client and pass it to `authenticate_finish`.
    pub fn handle_command(
        &mut self,
        command_line: s::CommandLine,
        sender: SendResponse<'_>,
    ) -> s::ResponseLine {
        let s::CommandLine { tag, cmd } = command_line;

        let res = match COMMANDS.get(cmd.name()) {
            None => Ok(ok("command not recognized")),
            Some(desc) if desc.needs_auth && !self.authenticated => Err(no(
                format!("{} Authentication required", cmd.name()),
            )),
            Some(desc) if desc.needs_mailbox && self.selected.is_none() => {
                Err(no("mailbox not selected"))
            },
            Some(desc) => (desc.handler)(self, cmd, sender),
        };

        let response = match res {
            Ok(res) => res,
            Err(res) => res,
        };

        s::ResponseLine {
            tag: Some(tag),
            response,
        }
    }

    /// Close the selected mailbox, if any, writing back pending changes.
    pub(super) fn unselect(&mut self) {
        if let Some(selected) = self.selected.take() {
            if let Err(e) = selected.mailbox.close() {
                warn!(
                    "{} Failed to close {}: {}",
                    self.log_prefix, selected.name, e
                );
            }
        }
        self.pending_delete.clear();
    }
}

impl Drop for CommandProcessor {
    fn drop(&mut self) {
        self.unselect();
    }
}

pub(super) fn ok(quip: impl Into<Cow<'static, str>>) -> s::Response {
    cond(s::RespCondType::Ok, quip)
}

pub(super) fn no(quip: impl Into<Cow<'static, str>>) -> s::Response {
    cond(s::RespCondType::No, quip)
}

pub(super) fn bad(quip: impl Into<Cow<'static, str>>) -> s::Response {
    cond(s::RespCondType::Bad, quip)
}

fn cond(
    cond: s::RespCondType,
    quip: impl Into<Cow<'static, str>>,
) -> s::Response {
    s::Response::Cond(s::CondResponse {
        cond,
        code: None,
        quip: Some(quip.into()),
    })
}

/// The usual `<NAME> completed` success response.
pub(super) fn completed(cmd: &s::Command) -> CmdResult {
    Ok(ok(format!("{} completed", cmd.name())))
}

pub(super) fn catch_all_error_handling(
    log_prefix: &LogPrefix,
    e: Error,
) -> s::Response {
    error!("{} Unhandled internal error: {}", log_prefix, e);
    no(format!("internal error: {}", e))
}
