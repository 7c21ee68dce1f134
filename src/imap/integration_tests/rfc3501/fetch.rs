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

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use super::super::defs::*;

#[test]
fn fetch_flags_end_to_end() {
    let setup = set_up();
    let mut client = setup.connect("3501fefe");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses =
        command_ok(&mut client, "FETCH 1:3 (FLAGS)", "OK FETCH completed");
    assert_eq!(
        vec![
            "* 1 FETCH (FLAGS (\\Seen))",
            "* 2 FETCH (FLAGS (\\Flagged))",
            "* 3 FETCH (FLAGS (\\Seen \\Answered))",
        ],
        responses
    );
}

#[test]
fn fetch_sequence_forms() {
    let setup = set_up();
    let mut client = setup.connect("3501fesf");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses =
        command_ok(&mut client, "FETCH 2:* UID", "OK FETCH completed");
    assert_eq!(
        vec!["* 2 FETCH (UID 2)", "* 3 FETCH (UID 3)"],
        responses
    );

    let responses =
        command_ok(&mut client, "FETCH 3:2 (UID)", "OK FETCH completed");
    assert_eq!(
        vec!["* 2 FETCH (UID 2)", "* 3 FETCH (UID 3)"],
        responses
    );

    let responses =
        command_ok(&mut client, "FETCH 1,3 (UID)", "OK FETCH completed");
    assert_eq!(
        vec!["* 1 FETCH (UID 1)", "* 3 FETCH (UID 3)"],
        responses
    );

    // Positions past the end are skipped
    let responses =
        command_ok(&mut client, "FETCH 3:5 (UID)", "OK FETCH completed");
    assert_eq!(vec!["* 3 FETCH (UID 3)"], responses);

    let responses = command_ok(
        &mut client,
        "FETCH 2:4000000000 (UID)",
        "OK FETCH completed",
    );
    assert_eq!(
        vec!["* 2 FETCH (UID 2)", "* 3 FETCH (UID 3)"],
        responses
    );

    let responses = command_ok(
        &mut client,
        "UID STORE 4000000000:3 +FLAGS.SILENT (\\Flagged)",
        "OK UID STORE completed",
    );
    assert!(responses.is_empty());
}

#[test]
fn uid_fetch_always_includes_uid() {
    let setup = set_up();
    let mut client = setup.connect("3501feuf");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses = command_ok(
        &mut client,
        "UID FETCH 1:2 (FLAGS)",
        "OK UID FETCH completed",
    );
    assert_eq!(
        vec![
            "* 1 FETCH (UID 1 FLAGS (\\Seen))",
            "* 2 FETCH (UID 2 FLAGS (\\Flagged))",
        ],
        responses
    );

    let responses = command_ok(
        &mut client,
        "UID FETCH 1 (FLAGS UID)",
        "OK UID FETCH completed",
    );
    assert_eq!(vec!["* 1 FETCH (UID 1 FLAGS (\\Seen))"], responses);
}

#[test]
fn fetch_attributes_once_each() {
    let setup = set_up();
    let mut client = setup.connect("3501feao");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses = command_ok(
        &mut client,
        "FETCH 1 (RFC822.SIZE UID RFC822.SIZE UID)",
        "OK FETCH completed",
    );
    assert_eq!(1, responses.len());
    assert_like(
        r#"^\* 1 FETCH \(RFC822\.SIZE [0-9]+ UID 1\)$"#,
        &responses[0],
    );
}

#[test]
fn fetch_headers_and_text() {
    let setup = set_up();
    let mut client = setup.connect("3501feht");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses = command_ok(
        &mut client,
        "FETCH 1 (BODY.PEEK[HEADER.FIELDS (SUBJECT)])",
        "OK FETCH completed",
    );
    assert_eq!(
        vec!["* 1 FETCH (BODY[HEADER] {18}\r\nSubject: First\r\n\r\n)"],
        responses
    );

    let responses = command_ok(
        &mut client,
        "FETCH 2 (BODY[TEXT])",
        "OK FETCH completed",
    );
    assert_eq!(
        vec!["* 2 FETCH (BODY[TEXT] {14}\r\nSecond body.\r\n)"],
        responses
    );

    let responses = command_ok(
        &mut client,
        "FETCH 2 (BODY[TEXT]<7.4>)",
        "OK FETCH completed",
    );
    assert_eq!(vec!["* 2 FETCH (BODY[TEXT]<7> \"body\")"], responses);

    let responses = command_ok(
        &mut client,
        "FETCH 3 (BODY.PEEK[HEADER.FIELDS.NOT (STATUS X-STATUS TO DATE)])",
        "OK FETCH completed",
    );
    assert_eq!(
        vec![
            "* 3 FETCH (BODY[HEADER] {42}\r\n\
             From: dave@example.com\r\nSubject: Third\r\n\r\n)"
        ],
        responses
    );
}

#[test]
fn fetch_whole_message() {
    let setup = set_up();
    let mut client = setup.connect("3501fewm");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses = command_ok(
        &mut client,
        "FETCH 2 (RFC822.SIZE BODY[])",
        "OK FETCH completed",
    );
    let expected = "From: carol@example.com\r\n\
                    To: bob@example.com\r\n\
                    Subject: Second\r\n\
                    Status: O\r\n\
                    X-Status: F\r\n\
                    \r\n\
                    Second body.\r\n";
    assert_eq!(
        vec![format!(
            "* 2 FETCH (RFC822.SIZE {} BODY[] {{{}}}\r\n{})",
            expected.len(),
            expected.len(),
            expected
        )],
        responses
    );
}

#[test]
fn fetch_internal_date_from_date_header() {
    let setup = set_up();
    let mut client = setup.connect("3501feid");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses = command_ok(
        &mut client,
        "FETCH 1:2 (INTERNALDATE)",
        "OK FETCH completed",
    );
    assert_eq!(
        vec![
            "* 1 FETCH (INTERNALDATE \"01-Jul-2003 10:52:37 +0200\")",
            // No Date header
            "* 2 FETCH ()",
        ],
        responses
    );
}

#[test]
fn fetch_macros() {
    let setup = set_up();
    let mut client = setup.connect("3501fefm");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let responses =
        command_ok(&mut client, "FETCH 1 FAST", "OK FETCH completed");
    assert_eq!(1, responses.len());
    assert_like(
        r#"^\* 1 FETCH \(FLAGS \(\\Seen\) INTERNALDATE "01-Jul-2003 10:52:37 \+0200" RFC822\.SIZE [0-9]+\)$"#,
        &responses[0],
    );

    // ENVELOPE and BODY are not supported and are left out
    let responses =
        command_ok(&mut client, "FETCH 1 FULL", "OK FETCH completed");
    assert_eq!(1, responses.len());
    assert_like(
        r#"^\* 1 FETCH \(FLAGS \(\\Seen\) INTERNALDATE "[^"]+" RFC822\.SIZE [0-9]+\)$"#,
        &responses[0],
    );
}

/// Accepts output until a FETCH response starts, then fails every write as
/// if the client had gone away.
#[derive(Clone, Default)]
struct HangUpOnFetch {
    written: Arc<Mutex<Vec<u8>>>,
    failed_writes: Arc<Mutex<usize>>,
}

impl Write for HangUpOnFetch {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = self.written.lock().unwrap();
        if written.windows(5).any(|w| w == b"FETCH") {
            *self.failed_writes.lock().unwrap() += 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "hung up"));
        }

        written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn lost_connection_ends_fetch() {
    let setup = set_up();
    let output = HangUpOnFetch::default();

    let result = setup.run_script(
        "3501felc",
        "a1 LOGIN \"bob\" \"secret\"\r\n\
         a2 SELECT INBOX\r\n\
         a3 FETCH 1:* (FLAGS RFC822)\r\n\
         a4 NOOP\r\n",
        output.clone(),
    );

    match result {
        Err(e) => assert!(e.is_disconnect(), "Unexpected error: {}", e),
        Ok(()) => panic!("Session survived a lost connection"),
    }

    // The first failed write ends the session
    assert_eq!(1, *output.failed_writes.lock().unwrap());
    let written =
        String::from_utf8(output.written.lock().unwrap().clone()).unwrap();
    assert!(written.contains("a2 OK"));
    assert!(!written.contains("* 2 FETCH"));
}
