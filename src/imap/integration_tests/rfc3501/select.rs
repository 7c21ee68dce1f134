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
fn select_reports_mailbox_state() {
    let setup = set_up();
    let mut client = setup.connect("3501sesr");
    quick_log_in(&mut client);

    let responses = command_ok(
        &mut client,
        "SELECT \"INBOX\"",
        "OK [READ-WRITE] SELECT completed",
    );
    assert_eq!(6, responses.len());
    assert_eq!(
        "* FLAGS (\\Seen \\Deleted \\Flagged \\Answered \\Recent)",
        responses[0]
    );
    assert_eq!(
        "* OK [PERMANENTFLAGS (\\Seen \\Deleted \\Flagged \\Answered \
         \\Recent)] Limited",
        responses[1]
    );
    assert_like(r#"^\* OK \[UIDVALIDITY [0-9]+\] UIDs valid$"#, &responses[2]);
    assert_eq!("* OK [UIDNEXT 4] Predicted next UID", responses[3]);
    assert_eq!("* 3 EXISTS", responses[4]);
    assert_eq!("* 0 RECENT", responses[5]);
}

#[test]
fn examine_counts_recent() {
    let setup = set_up();
    let mut client = setup.connect("3501seer");
    quick_log_in(&mut client);

    let responses = command_ok(
        &mut client,
        "EXAMINE \"jira/tickets\"",
        "OK [READ-WRITE] EXAMINE completed",
    );
    assert_eq!("* OK [UIDNEXT 3] Predicted next UID", responses[3]);
    assert_eq!("* 2 EXISTS", responses[4]);
    assert_eq!("* 2 RECENT", responses[5]);

    let responses = command_ok(
        &mut client,
        "SELECT Empty",
        "OK [READ-WRITE] SELECT completed",
    );
    assert_eq!("* OK [UIDNEXT 1] Predicted next UID", responses[3]);
    assert_eq!("* 0 EXISTS", responses[4]);
    assert_eq!("* 0 RECENT", responses[5]);
}

#[test]
fn select_failures() {
    let setup = set_up();
    let mut client = setup.connect("3501sesf");
    quick_log_in(&mut client);

    command_ok(
        &mut client,
        "SELECT \"Nonexistent\"",
        "NO SELECT no such mailbox",
    );

    let (tag, responses) = client.command("SELECT \"Missing\"").unwrap();
    assert_eq!(1, responses.len());
    assert_like(
        &format!("^{} NO unable to open mailbox: ", tag),
        &responses[0],
    );

    // A failed SELECT leaves no mailbox selected
    quick_select(&mut client, "INBOX");
    client.command("SELECT \"Missing\"").unwrap();
    command_ok(&mut client, "FETCH 1 (UID)", "NO mailbox not selected");
}

#[test]
fn close_and_check() {
    let setup = set_up();
    let mut client = setup.connect("3501secc");
    quick_log_in(&mut client);

    quick_select(&mut client, "INBOX");
    assert!(command_ok(&mut client, "CHECK", "OK CHECK completed").is_empty());
    assert!(command_ok(&mut client, "CLOSE", "OK CLOSE completed").is_empty());
    command_ok(&mut client, "FETCH 1 (UID)", "NO mailbox not selected");
}
