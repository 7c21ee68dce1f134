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

//! Implements the IMAP session: authentication state, the selected mailbox,
//! and every command handler.
//!
//! Nothing here knows about the wire format beyond the AST in `syntax`. The
//! module is split into several submodules for manageability, but is best
//! thought of as one single module.

macro_rules! map_error {
    ($this:expr) => {{
        let log_prefix = &$this.log_prefix;
        move |e| catch_all_error_handling(log_prefix, e)
    }};
}

// selected! is a macro instead of a method on CommandProcessor since there is
// no way to express that it borrows only one field --- as a method, the
// returned value is considered to borrow the whole `CommandProcessor`.
macro_rules! selected {
    ($this:expr) => {
        $this
            .selected
            .as_mut()
            .ok_or_else(|| no("mailbox not selected"))
    };
}

/// Extract the arguments of the command variant(s) a handler is registered
/// for.
macro_rules! command_args {
    ($cmd:expr, $($variant:pat => $out:expr),+ $(,)?) => {
        match $cmd {
            $($variant => $out,)+
            cmd => {
                return Err(s::Response::Cond(s::CondResponse {
                    cond: s::RespCondType::Bad,
                    code: None,
                    quip: Some(::std::borrow::Cow::Owned(format!(
                        "{} dispatched to the wrong handler",
                        cmd.name()
                    ))),
                }))
            },
        }
    };
}

mod auth;
mod commands;
mod defs;
mod fetch;
mod flags;
mod mailboxes;
mod messages;

pub use self::defs::CommandProcessor;
