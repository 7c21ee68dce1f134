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

static ROOT: &str = "* LIST (\\Noselect \\HasChildren) \"/\" \"\"";

fn list_entry(name: &str) -> String {
    format!("* LIST (\\Marked \\HasNoChildren) \"/\" \"{}\"", name)
}

#[test]
fn list_wildcards() {
    let setup = set_up();
    let mut client = setup.connect("3501mblw");
    quick_log_in(&mut client);

    let responses =
        command_ok(&mut client, "LIST \"\" \"*\"", "OK LIST completed");
    assert_eq!(
        vec![
            ROOT.to_owned(),
            list_entry("Empty"),
            list_entry("INBOX"),
            list_entry("Missing"),
            list_entry("jira/tickets"),
        ],
        responses
    );

    let responses =
        command_ok(&mut client, "LIST \"\" \"jira/%\"", "OK LIST completed");
    assert_eq!(vec![list_entry("jira/tickets")], responses);

    let responses =
        command_ok(&mut client, "LIST \"\" \"inbox\"", "OK LIST completed");
    assert_eq!(vec![list_entry("INBOX")], responses);

    let responses =
        command_ok(&mut client, "LIST \"\" \"*s\"", "OK LIST completed");
    assert_eq!(
        vec![list_entry("Missing"), list_entry("jira/tickets")],
        responses
    );

    // `%` cannot reach past the delimiter to the "s" of "tickets"
    let responses =
        command_ok(&mut client, "LIST \"\" \"%s\"", "OK LIST completed");
    assert_eq!(vec![list_entry("Missing")], responses);

    // An empty pattern lists everything
    let responses =
        command_ok(&mut client, "LIST \"\" \"\"", "OK LIST completed");
    assert_eq!(5, responses.len());

    command_ok(&mut client, "LIST \"\" \"Nothing*\"", "NO LIST nothing found");
}

#[test]
fn list_patterns_match_prefixes() {
    let setup = set_up();
    let mut client = setup.connect("3501mblp");
    quick_log_in(&mut client);

    let responses =
        command_ok(&mut client, "LIST \"\" jira", "OK LIST completed");
    assert_eq!(vec![list_entry("jira/tickets")], responses);

    let responses =
        command_ok(&mut client, "LIST \"\" \"I\"", "OK LIST completed");
    assert_eq!(vec![list_entry("INBOX")], responses);

    // The root matches `%` as well, and so does every name
    let responses =
        command_ok(&mut client, "LIST \"\" \"%\"", "OK LIST completed");
    assert_eq!(
        vec![
            ROOT.to_owned(),
            list_entry("Empty"),
            list_entry("INBOX"),
            list_entry("Missing"),
            list_entry("jira/tickets"),
        ],
        responses
    );

    command_ok(&mut client, "LIST \"\" \"tickets\"", "NO LIST nothing found");
}

#[test]
fn subscriptions() {
    let setup = set_up();
    let mut client = setup.connect("3501mbsu");
    quick_log_in(&mut client);

    command_ok(&mut client, "LSUB \"\" \"I*\"", "NO LSUB nothing found");

    command_ok(&mut client, "SUBSCRIBE \"INBOX\"", "OK SUBSCRIBE completed");
    command_ok(
        &mut client,
        "SUBSCRIBE \"jira/tickets\"",
        "OK SUBSCRIBE completed",
    );

    let responses =
        command_ok(&mut client, "LSUB \"\" \"*\"", "OK LSUB completed");
    assert_eq!(
        vec![
            "* LSUB (\\Noselect \\HasChildren) \"/\" \"\"",
            "* LSUB (\\Marked \\HasNoChildren) \"/\" \"INBOX\"",
            "* LSUB (\\Marked \\HasNoChildren) \"/\" \"jira/tickets\"",
        ],
        responses
    );

    command_ok(
        &mut client,
        "UNSUBSCRIBE \"INBOX\"",
        "OK UNSUBSCRIBE completed",
    );
    command_ok(&mut client, "LSUB \"\" \"I*\"", "NO LSUB nothing found");
    let responses =
        command_ok(&mut client, "LSUB \"\" \"j*\"", "OK LSUB completed");
    assert_eq!(
        vec!["* LSUB (\\Marked \\HasNoChildren) \"/\" \"jira/tickets\""],
        responses
    );

    // Subscriptions belong to the session
    let mut client2 = setup.connect("3501mbsu2");
    quick_log_in(&mut client2);
    command_ok(&mut client2, "LSUB \"\" \"j*\"", "NO LSUB nothing found");
}

#[test]
fn status_reports_counts() {
    let setup = set_up();
    let mut client = setup.connect("3501mbst");
    quick_log_in(&mut client);

    let responses = command_ok(
        &mut client,
        "STATUS \"jira/tickets\" (MESSAGES RECENT UIDNEXT UIDVALIDITY UNSEEN)",
        "OK STATUS completed",
    );
    assert_eq!(1, responses.len());
    assert_like(
        r#"^\* STATUS "jira/tickets" \(MESSAGES 2 RECENT 2 UIDNEXT 3 UIDVALIDITY [0-9]+ UNSEEN 2\)$"#,
        &responses[0],
    );

    // UNSEEN is the total message count, whatever the flags
    let responses = command_ok(
        &mut client,
        "STATUS INBOX (UNSEEN BOGUS MESSAGES)",
        "OK STATUS completed",
    );
    assert_eq!(vec!["* STATUS \"INBOX\" (UNSEEN 3 MESSAGES 3)"], responses);

    command_ok(
        &mut client,
        "STATUS \"Nope\" (MESSAGES)",
        "NO STATUS no such mailbox",
    );
}

#[test]
fn status_does_not_disturb_selection() {
    let setup = set_up();
    let mut client = setup.connect("3501mbsd");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    command_ok(
        &mut client,
        "STATUS \"jira/tickets\" (MESSAGES)",
        "OK STATUS completed",
    );
    let responses =
        command_ok(&mut client, "FETCH 3 (UID)", "OK FETCH completed");
    assert_eq!(vec!["* 3 FETCH (UID 3)"], responses);
}
