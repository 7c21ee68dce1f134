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

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, warn};
use nix::sys::time::TimeValLike;

use crate::imap::command_processor::CommandProcessor;
use crate::imap::server::Server;
use crate::store::mbox::MboxStore;
use crate::store::MailStore;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::SystemConfig;

const STDIN: RawFd = 0;
const STDOUT: RawFd = 1;

// Errors go through the logger so they reach syslog when not on a terminal
macro_rules! fatal {
    ($ex:ident, $($stuff:tt)*) => {{
        error!($($stuff)*);
        crate::support::sysexits::$ex.exit()
    }}
}

/// Accept TCP connections forever, serving each on its own thread.
pub fn tcp(system_config: SystemConfig) {
    let system_config = Arc::new(system_config);
    let store: Arc<dyn MailStore> = Arc::new(MboxStore);

    let listen = system_config.imap.listen.as_str();
    let port = system_config.imap.port;
    let listener = match TcpListener::bind((listen, port)) {
        Ok(listener) => listener,
        Err(e) => {
            fatal!(EX_OSERR, "Unable to listen on {}:{}: {}", listen, port, e)
        },
    };

    info!("Listening for IMAP connections on {}:{}", listen, port);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            },
        };

        let system_config = Arc::clone(&system_config);
        let store = Arc::clone(&store);
        if let Err(e) = thread::Builder::new()
            .name("imap-session".to_owned())
            .spawn(move || tcp_session(stream, system_config, store))
        {
            error!("Unable to start session thread: {}", e);
        }
    }
}

fn tcp_session(
    stream: TcpStream,
    system_config: Arc<SystemConfig>,
    store: Arc<dyn MailStore>,
) {
    let peer_name = match stream.peer_addr() {
        Ok(addr) => addr.to_string(),
        Err(e) => {
            warn!("Unable to determine peer name: {}", e);
            "unknown-socket".to_owned()
        },
    };
    let log_prefix = LogPrefix::new("imap", peer_name);

    if let Err(e) = stream.set_read_timeout(system_config.read_timeout()) {
        warn!("{} Unable to configure timeouts: {}", log_prefix, e);
    }
    let _ = stream.set_nodelay(true);

    let read_half = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!("{} Unable to split connection: {}", log_prefix, e);
            return;
        },
    };

    info!("{} Connection established", log_prefix);

    let processor =
        CommandProcessor::new(log_prefix.clone(), system_config, store);
    let mut server = Server::new(
        io::BufReader::new(read_half),
        io::BufWriter::new(stream),
        processor,
    );

    log_outcome(&log_prefix, server.run());
}

/// Serve one session over stdin and stdout.
pub fn stdio(system_config: SystemConfig) {
    match (nix::unistd::isatty(STDIN), nix::unistd::isatty(STDOUT)) {
        (Ok(true), _) | (_, Ok(true)) => {
            fatal!(EX_USAGE, "stdin and stdout must not be a terminal")
        },
        _ => (),
    }

    let mut peer_name = match nix::sys::socket::getpeername(STDIN) {
        Ok(addr) => addr.to_string(),
        Err(e) => {
            warn!("Unable to determine peer name: {}", e);
            "unknown-socket".to_owned()
        },
    };

    // On FreeBSD, getpeername() on a UNIX socket returns "@\0", which breaks
    // syslog if we log that.
    if peer_name.contains('\0') {
        peer_name = "unknown-socket".to_owned();
    }

    let log_prefix = LogPrefix::new("imap", peer_name);

    if let Some(timeout) = system_config.read_timeout() {
        if let Err(e) = nix::sys::socket::setsockopt(
            STDIN,
            nix::sys::socket::sockopt::ReceiveTimeout,
            &nix::sys::time::TimeVal::seconds(timeout.as_secs() as i64),
        ) {
            warn!("{} Unable to configure timeouts: {}", log_prefix, e);
        }
    }

    // It is not unusual for stdio to be UNIX sockets instead of TCP, so don't
    // complain if setting TCP_NODELAY fails.
    let _ = nix::sys::socket::setsockopt(
        STDOUT,
        nix::sys::socket::sockopt::TcpNoDelay,
        &true,
    );

    info!("{} Connection established", log_prefix);

    let processor = CommandProcessor::new(
        log_prefix.clone(),
        Arc::new(system_config),
        Arc::new(MboxStore),
    );
    let mut server = Server::new(
        io::BufReader::new(Stdio),
        io::BufWriter::new(Stdio),
        processor,
    );

    log_outcome(&log_prefix, server.run());
}

fn log_outcome(log_prefix: &LogPrefix, result: Result<(), Error>) {
    match result {
        Ok(()) => info!("{} Normal client disconnect", log_prefix),
        Err(e) if e.is_disconnect() => {
            debug!("{} Connection lost: {}", log_prefix, e)
        },
        Err(e) if e.is_timeout() => {
            info!("{} Connection timed out", log_prefix)
        },
        Err(e) => warn!("{} Abnormal client disconnect: {}", log_prefix, e),
    }
}

// Read and write to the stdio FDs without buffering
#[derive(Debug)]
struct Stdio;

impl Read for Stdio {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        nix::unistd::read(STDIN, buf).map_err(nix_to_io)
    }
}

impl Write for Stdio {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        nix::unistd::write(STDOUT, buf).map_err(nix_to_io)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn nix_to_io(e: nix::Error) -> io::Error {
    match e.as_errno() {
        Some(errno) => io::Error::from_raw_os_error(errno as i32),
        None => io::Error::new(io::ErrorKind::Other, e),
    }
}
