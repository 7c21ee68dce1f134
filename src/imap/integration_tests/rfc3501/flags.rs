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
fn store_reports_new_flags() {
    let setup = set_up();
    let mut client = setup.connect("3501flsr");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses = command_ok(
        &mut client,
        "STORE 1 +FLAGS (\\Flagged)",
        "OK STORE completed",
    );
    assert_eq!(
        vec!["* 1 STORE (UID 1 FLAGS (\\Seen \\Flagged))"],
        responses
    );

    let responses = command_ok(
        &mut client,
        "STORE 1:2 -FLAGS (\\Flagged)",
        "OK STORE completed",
    );
    assert_eq!(
        vec![
            "* 1 STORE (UID 1 FLAGS (\\Seen))",
            "* 2 STORE (UID 2 FLAGS ())",
        ],
        responses
    );

    let responses = command_ok(
        &mut client,
        "UID STORE 3 FLAGS (\\Deleted \\Recent)",
        "OK UID STORE completed",
    );
    assert_eq!(vec!["* 3 STORE (UID 3 FLAGS (\\Deleted))"], responses);

    let responses =
        command_ok(&mut client, "FETCH 1:3 (FLAGS)", "OK FETCH completed");
    assert_eq!(
        vec![
            "* 1 FETCH (FLAGS (\\Seen))",
            "* 2 FETCH (FLAGS ())",
            "* 3 FETCH (FLAGS (\\Deleted))",
        ],
        responses
    );
}

#[test]
fn silent_store_sends_nothing() {
    let setup = set_up();
    let mut client = setup.connect("3501flss");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses = command_ok(
        &mut client,
        "STORE 1:3 +FLAGS.SILENT (\\Answered)",
        "OK STORE completed",
    );
    assert!(responses.is_empty());

    let responses =
        command_ok(&mut client, "FETCH 1:3 (FLAGS)", "OK FETCH completed");
    assert_eq!(
        vec![
            "* 1 FETCH (FLAGS (\\Seen \\Answered))",
            "* 2 FETCH (FLAGS (\\Flagged \\Answered))",
            "* 3 FETCH (FLAGS (\\Seen \\Answered))",
        ],
        responses
    );
}

#[test]
fn store_preserves_recent() {
    let setup = set_up();
    let mut client = setup.connect("3501flpr");
    quick_log_in(&mut client);
    quick_select(&mut client, "jira/tickets");

    let responses = command_ok(
        &mut client,
        "STORE 1 FLAGS (\\Seen)",
        "OK STORE completed",
    );
    assert_eq!(
        vec!["* 1 STORE (UID 1 FLAGS (\\Seen \\Recent))"],
        responses
    );
}

#[test]
fn store_then_expunge_removes_one_message() {
    let setup = set_up();
    let mut client = setup.connect("3501flse");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    command_ok(
        &mut client,
        "STORE 2 +FLAGS (\\Deleted)",
        "OK STORE completed",
    );
    let responses = command_ok(&mut client, "EXPUNGE", "OK EXPUNGE completed");
    assert!(responses.is_empty());

    let responses = command_ok(
        &mut client,
        "FETCH 1:* (BODY.PEEK[HEADER.FIELDS (SUBJECT)])",
        "OK FETCH completed",
    );
    assert_eq!(
        vec![
            "* 1 FETCH (BODY[HEADER] {18}\r\nSubject: First\r\n\r\n)",
            "* 2 FETCH (BODY[HEADER] {18}\r\nSubject: Third\r\n\r\n)",
        ],
        responses
    );

    let content = setup.mbox_content("inbox.mbox");
    assert!(content.contains("Subject: First"));
    assert!(!content.contains("Subject: Second"));
    assert!(content.contains("Subject: Third"));

    // A fresh session sees the expunged mailbox
    let mut client2 = setup.connect("3501flse2");
    quick_log_in(&mut client2);
    let responses = command_ok(
        &mut client2,
        "SELECT \"INBOX\"",
        "OK [READ-WRITE] SELECT completed",
    );
    assert_eq!("* 2 EXISTS", responses[4]);
}

#[test]
fn undeleted_messages_are_not_expunged() {
    let setup = set_up();
    let mut client = setup.connect("3501flud");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    command_ok(
        &mut client,
        "STORE 1,3 +FLAGS.SILENT (\\Deleted)",
        "OK STORE completed",
    );
    command_ok(
        &mut client,
        "STORE 3 -FLAGS.SILENT (\\Deleted)",
        "OK STORE completed",
    );
    command_ok(&mut client, "EXPUNGE", "OK EXPUNGE completed");

    let responses =
        command_ok(&mut client, "FETCH 1:* (UID)", "OK FETCH completed");
    assert_eq!(
        vec!["* 1 FETCH (UID 1)", "* 2 FETCH (UID 2)"],
        responses
    );

    let content = setup.mbox_content("inbox.mbox");
    assert!(!content.contains("Subject: First"));
    assert!(content.contains("Subject: Second"));
    assert!(content.contains("Subject: Third"));
}

#[test]
fn flags_persist_on_close() {
    let setup = set_up();
    let mut client = setup.connect("3501flpc");
    quick_log_in(&mut client);
    quick_select(&mut client, "jira/tickets");

    command_ok(
        &mut client,
        "STORE 2 +FLAGS.SILENT (\\Seen \\Flagged)",
        "OK STORE completed",
    );
    command_ok(&mut client, "CLOSE", "OK CLOSE completed");

    quick_select(&mut client, "jira/tickets");
    let responses =
        command_ok(&mut client, "FETCH 2 (FLAGS)", "OK FETCH completed");
    assert_eq!(
        vec!["* 2 FETCH (FLAGS (\\Seen \\Flagged \\Recent))"],
        responses
    );
}
