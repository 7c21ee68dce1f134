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

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::SubscriptionLookup;
use crate::support::error::Error;

/// The configuration for Mboxd.
///
/// This is stored in a TOML file, by default `~/.config/mboxd/mboxd.toml` or
/// `/etc/mboxd/mboxd.toml`.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Options for the IMAP listener.
    #[serde(default)]
    pub imap: ImapConfig,

    /// The mailboxes to serve, keyed by IMAP mailbox name.
    ///
    /// Written as `[sub.INBOX]` tables in the file.
    #[serde(default)]
    pub sub: BTreeMap<String, SubConfig>,

    /// The directory relative paths in `sub` are resolved against. This is
    /// the directory containing the configuration file.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ImapConfig {
    /// The address to listen on.
    pub listen: String,
    /// The TCP port to listen on.
    pub port: u16,
    /// The user name clients must log in with.
    ///
    /// Authentication is only required if both this and `password` are set.
    /// Otherwise every connection starts out authenticated.
    pub user: Option<String>,
    /// The password matching `user`.
    pub password: Option<String>,
    /// If set, a connection which sends nothing for this many seconds is
    /// dropped.
    pub read_timeout_secs: Option<u64>,
}

impl Default for ImapConfig {
    fn default() -> Self {
        ImapConfig {
            listen: "127.0.0.1".to_owned(),
            port: 10143,
            user: None,
            password: None,
            read_timeout_secs: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SubConfig {
    /// Path to the mbox file backing this mailbox.
    pub mbox: PathBuf,
}

impl SystemConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        let mut config: SystemConfig = toml::from_str(&text)?;
        config.root = path
            .parent()
            .map(Path::to_owned)
            .unwrap_or_else(PathBuf::new);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.imap.user.is_some() != self.imap.password.is_some() {
            return Err(Error::Config(
                "imap.user and imap.password must be set together".to_owned(),
            ));
        }

        if let Some(name) = self.sub.keys().find(|name| name.is_empty()) {
            return Err(Error::Config(format!(
                "invalid mailbox name {:?}",
                name
            )));
        }

        Ok(())
    }

    /// Returns the configured user name and password, if both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.imap.user, &self.imap.password) {
            (&Some(ref user), &Some(ref password)) => {
                Some((user.as_str(), password.as_str()))
            },
            _ => None,
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.imap
            .read_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

impl SubscriptionLookup for SystemConfig {
    fn resolve_mailbox(&self, name: &str) -> Option<PathBuf> {
        self.sub.get(name).map(|sub| self.root.join(&sub.mbox))
    }

    fn list_known_mailboxes(&self) -> Vec<String> {
        self.sub.keys().cloned().collect()
    }
}
