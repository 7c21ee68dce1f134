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

use super::super::defs::*;

#[test]
fn greeting_goodbye() {
    let setup = set_up();
    let mut client = setup.connect("3501fcgg");

    receive_line_like(&mut client, r#"^\* OK IMAP4rev1 Service Ready$"#);

    let responses = command_ok(&mut client, "LOGOUT", "OK LOGOUT completed");
    assert_eq!(vec!["* BYE IMAP4rev1 Server logging out"], responses);

    // The server hangs up after LOGOUT
    let mut buf = Vec::new();
    assert_eq!(0, client.read_line_raw(&mut buf).unwrap());
}

#[test]
fn request_capabilities() {
    let setup = set_up();
    let mut client = setup.connect("3501fcrc");
    skip_greeting(&mut client);

    let responses =
        command_ok(&mut client, "CAPABILITY", "OK CAPABILITY completed");
    assert_eq!(
        vec!["* CAPABILITY IMAP4rev1 AUTH=CRAM-MD5 AUTH=PLAIN"],
        responses
    );

    command_ok(
        &mut client,
        "LOGIN \"bob\" \"secret\"",
        "OK LOGIN authentication successful",
    );
    let responses =
        command_ok(&mut client, "CAPABILITY", "OK CAPABILITY completed");
    assert_eq!(vec!["* CAPABILITY IMAP4rev1"], responses);
}

#[test]
fn capabilities_without_credentials() {
    let setup = set_up_open();
    let mut client = setup.connect("3501fccc");
    skip_greeting(&mut client);

    let responses =
        command_ok(&mut client, "CAPABILITY", "OK CAPABILITY completed");
    assert_eq!(vec!["* CAPABILITY IMAP4rev1"], responses);
}

#[test]
fn noop_and_unknown_commands() {
    let setup = set_up();
    let mut client = setup.connect("3501fcnu");
    skip_greeting(&mut client);

    assert!(command_ok(&mut client, "NOOP", "OK NOOP completed").is_empty());
    assert!(command_ok(&mut client, "noop", "OK NOOP completed").is_empty());
    assert!(
        command_ok(&mut client, "XYZZY plugh", "OK command not recognized")
            .is_empty()
    );
}

#[test]
fn commands_gated_on_state() {
    let setup = set_up();
    let mut client = setup.connect("3501fcgs");
    skip_greeting(&mut client);

    command_ok(
        &mut client,
        "SELECT \"INBOX\"",
        "NO SELECT Authentication required",
    );
    command_ok(
        &mut client,
        "LIST \"\" \"*\"",
        "NO LIST Authentication required",
    );
    command_ok(
        &mut client,
        "FETCH 1 (FLAGS)",
        "NO FETCH Authentication required",
    );

    command_ok(
        &mut client,
        "LOGIN \"bob\" \"secret\"",
        "OK LOGIN authentication successful",
    );

    command_ok(&mut client, "FETCH 1:3 (FLAGS)", "NO mailbox not selected");
    command_ok(&mut client, "STORE 1 +FLAGS (\\Seen)", "NO mailbox not selected");
    command_ok(&mut client, "EXPUNGE", "NO mailbox not selected");
    command_ok(&mut client, "CHECK", "NO mailbox not selected");
    command_ok(&mut client, "CLOSE", "NO mailbox not selected");
}

#[test]
fn unsupported_mailbox_operations_fail() {
    let setup = set_up_open();
    let mut client = setup.connect("3501fcuo");
    skip_greeting(&mut client);

    command_ok(&mut client, "CREATE \"foo\"", "NO CREATE failed");
    command_ok(&mut client, "DELETE \"INBOX\"", "NO DELETE failed");
    command_ok(&mut client, "RENAME \"INBOX\" \"foo\"", "NO RENAME failed");

    quick_select(&mut client, "INBOX");
    command_ok(&mut client, "COPY 1:2 \"Empty\"", "NO COPY failed");
}
