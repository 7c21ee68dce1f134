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

/// Creates a predicate which identifies which mailbox names match `pattern`,
/// with wildcards as per RFC 3501.
///
/// `*` matches anything, including the `/` hierarchy delimiter, while `%`
/// stops at a delimiter. Everything else matches literally, but without
/// regard to case. The pattern only needs to match a prefix of the name, so
/// `jira` also selects `jira/tickets`.
///
/// Mailbox names come from configuration rather than a directory tree, so any
/// `LIST` simply filters the full set of names through this.
pub fn mailbox_name_matcher(pattern: &str) -> impl Fn(&str) -> bool {
    let mut rx = "(?i)^".to_owned();

    let mut start = 0;
    for end in pattern
        .match_indices(|c| '%' == c || '*' == c)
        .map(|(ix, _)| ix)
        .chain(pattern.len()..=pattern.len())
    {
        let chunk = &pattern[start..end];
        start = (end + 1).min(pattern.len());

        rx.push_str(&regex::escape(chunk));
        match pattern.get(end..end + 1) {
            Some("*") => rx.push_str(".*"),
            Some("%") => rx.push_str("[^/]*"),
            _ => (),
        }
    }

    let rx = regex::Regex::new(&rx).expect("Built invalid regex?");
    move |s| rx.is_match(s)
}
