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

use std::process;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};
use openssl::{hash::MessageDigest, memcmp, pkey::PKey, sign::Signer};

use super::defs::*;
use crate::support::error::Error;

impl CommandProcessor {
    pub(super) fn cmd_log_in(
        &mut self,
        cmd: s::Command,
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let cmd = command_args!(cmd, s::Command::LogIn(c) => c);

        self.authenticated = false;
        self.log_prefix.clear_user();

        let accepted = match self.system_config.credentials() {
            None => true,
            Some((user, password)) => {
                secure_eq(user, &cmd.userid)
                    && secure_eq(password, &cmd.password)
            },
        };

        if !accepted {
            warn!(
                "{} Rejected login for user '{}'",
                self.log_prefix, cmd.userid
            );
            return Err(no("LOGIN user name or password rejected"));
        }

        self.logged_in(cmd.userid, "LOGIN");
        Ok(ok("LOGIN authentication successful"))
    }

    /// Start an AUTHENTICATE exchange.
    ///
    /// On success, this returns a continuation request. The client's reply
    /// must then be fed to `authenticate_finish`.
    pub(super) fn cmd_authenticate(
        &mut self,
        cmd: s::Command,
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let mechanism = command_args!(cmd, s::Command::Authenticate(m) => m);

        self.authenticated = false;
        self.log_prefix.clear_user();
        self.pending_auth = None;

        if self.system_config.credentials().is_none() {
            return Err(no("authentication is not configured"));
        }

        let (mechanism, challenge) =
            if mechanism.eq_ignore_ascii_case("CRAM-MD5") {
                (AuthMechanism::CramMd5, cram_md5_challenge())
            } else if mechanism.eq_ignore_ascii_case("PLAIN") {
                (AuthMechanism::Plain, String::new())
            } else {
                return Err(no("unsupported authentication mechanism"));
            };

        let encoded = base64::encode(challenge.as_bytes());
        self.pending_auth = Some(PendingAuth {
            mechanism,
            challenge,
        });
        Ok(s::Response::Continuation(encoded))
    }

    /// Complete an AUTHENTICATE exchange with the line the client sent in
    /// reply to the continuation request, minus its line ending.
    pub fn authenticate_finish(
        &mut self,
        tag: String,
        data: &[u8],
    ) -> s::ResponseLine {
        let response = match self.check_auth_response(data) {
            Ok(r) => r,
            Err(r) => r,
        };

        s::ResponseLine {
            tag: Some(tag),
            response,
        }
    }

    fn check_auth_response(&mut self, data: &[u8]) -> CmdResult {
        let pending = self
            .pending_auth
            .take()
            .ok_or_else(|| bad("no AUTHENTICATE in progress"))?;

        if b"*" == data {
            return Err(bad("AUTHENTICATE aborted"));
        }

        let config = Arc::clone(&self.system_config);
        let (user, password) = config
            .credentials()
            .ok_or_else(|| no("authentication is not configured"))?;

        let decoded = base64::decode(data)
            .ok()
            .and_then(|decoded| String::from_utf8(decoded).ok())
            .ok_or_else(|| no("couldn't decode your credentials"))?;

        let accepted = match pending.mechanism {
            AuthMechanism::CramMd5 => {
                let fields = decoded.split(' ').collect::<Vec<_>>();
                if 2 != fields.len() {
                    return Err(no("wrong number of fields in the token"));
                }

                let expected = hmac_md5_hex(password, &pending.challenge)
                    .map_err(map_error!(self))?;
                secure_eq(user, fields[0]) && secure_eq(&expected, fields[1])
            },

            // RFC 4616: <authorise-id>NUL<authenticate-id>NUL<password>
            AuthMechanism::Plain => {
                let fields = decoded.split('\x00').collect::<Vec<_>>();
                if 3 != fields.len() {
                    return Err(no("wrong number of fields in the token"));
                }

                (fields[0].is_empty() || fields[0] == fields[1])
                    && secure_eq(user, fields[1])
                    && secure_eq(password, fields[2])
            },
        };

        if !accepted {
            warn!(
                "{} Rejected {} authentication",
                self.log_prefix,
                pending.mechanism.name()
            );
            return Err(no("authenticate failure"));
        }

        self.logged_in(user.to_owned(), pending.mechanism.name());
        Ok(ok(format!(
            "{} authentication successful",
            pending.mechanism.name()
        )))
    }

    fn logged_in(&mut self, user: String, how: &str) {
        self.log_prefix.set_user(user);
        self.authenticated = true;
        info!("{} Login successful via {}", self.log_prefix, how);
    }
}

fn cram_md5_challenge() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!(
        "<{}.{}.{}@{}>",
        process::id(),
        nanos,
        rand::random::<u32>(),
        env!("CARGO_PKG_NAME")
    )
}

/// The lowercase hex HMAC-MD5 of `challenge` keyed by `password`, as a
/// CRAM-MD5 client computes it.
fn hmac_md5_hex(
    password: &str,
    challenge: &str,
) -> Result<String, Error> {
    let key = PKey::hmac(password.as_bytes())?;
    let mut signer = Signer::new(MessageDigest::md5(), &key)?;
    signer.update(challenge.as_bytes())?;
    let digest = signer.sign_to_vec()?;
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

fn secure_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && memcmp::eq(a.as_bytes(), b.as_bytes())
}
