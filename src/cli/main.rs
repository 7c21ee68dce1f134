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

use std::env;
use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Listen for IMAP connections over TCP.
    ///
    /// Every connection is served on its own thread with its own session
    /// state. Nothing is shared between sessions except the configuration.
    Serve(ServeSubcommand),
    /// Serve a single IMAP session over standard IO.
    ///
    /// This is intended to be used with inetd, xinetd, etc.
    ServeStdio(CommonOptions),
}

#[derive(StructOpt)]
struct CommonOptions {
    /// The configuration file
    /// [default: ~/.config/mboxd/mboxd.toml or /etc/mboxd/mboxd.toml]
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
}

#[derive(StructOpt)]
struct ServeSubcommand {
    #[structopt(flatten)]
    common: CommonOptions,

    /// Listen on this address instead of the configured one.
    #[structopt(long)]
    listen: Option<String>,

    /// Listen on this port instead of the configured one.
    #[structopt(long)]
    port: Option<u16>,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        },
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        },
    });

    match cmd {
        Command::Serve(cmd) => {
            let mut system_config = load_config(cmd.common.config);
            if let Some(listen) = cmd.listen {
                system_config.imap.listen = listen;
            }
            if let Some(port) = cmd.port {
                system_config.imap.port = port;
            }

            init_logging(&system_config.root);
            super::serve::tcp(system_config);
        },
        Command::ServeStdio(common) => {
            let system_config = load_config(common.config);
            init_logging(&system_config.root);
            super::serve::stdio(system_config);
        },
    }
}

fn load_config(explicit: Option<PathBuf>) -> SystemConfig {
    let path = explicit.unwrap_or_else(find_config);
    match SystemConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error in config file at '{}': {}", path.display(), e);
            EX_CONFIG.exit()
        },
    }
}

fn find_config() -> PathBuf {
    let mut candidates = Vec::new();
    if let Some(home) = env::var_os("HOME") {
        candidates.push(PathBuf::from(home).join(".config/mboxd/mboxd.toml"));
    }
    candidates.push(PathBuf::from("/etc/mboxd/mboxd.toml"));

    match candidates.iter().find(|path| path.is_file()) {
        Some(path) => path.clone(),
        None => {
            eprintln!(
                "Neither ~/.config/mboxd/mboxd.toml nor /etc/mboxd/mboxd.toml\n\
                 exists; use --config=/path/to/mboxd.toml if your\n\
                 configuration is elsewhere."
            );
            EX_CONFIG.exit()
        },
    }
}

fn init_logging(root: &Path) {
    if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        crate::init_simple_log();
        return;
    }

    // If anything goes wrong, we don't really have a way to recover since
    // inetd sends even stderr back to the client.
    let log_config_file = root.join("logging.toml");
    if log_config_file.is_file() {
        log4rs::init_file(
            log_config_file,
            log4rs::file::Deserializers::new(),
        )
        .expect("Failed to initialise logging");
    } else {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_MAIL,
            hostname: None,
            process: env!("CARGO_PKG_NAME").to_owned(),
            pid: nix::unistd::getpid().as_raw(),
        };

        let logger =
            syslog::unix(formatter).expect("Failed to connect to syslog");
        log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
            .map(|_| log::set_max_level(log::LevelFilter::Info))
            .expect("Failed to initialise logging");
    }
}
