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

use bitflags::bitflags;

bitflags! {
    /// The system flags a stored message can carry.
    ///
    /// On disk these are encoded in the mbox `Status`/`X-Status` style: `R`
    /// for seen, `D` deleted, `F` flagged, `A` answered, and `O` ("old") for
    /// the *absence* of recent.
    pub struct MailFlags: u8 {
        const SEEN = 1 << 0;
        const DELETED = 1 << 1;
        const FLAGGED = 1 << 2;
        const ANSWERED = 1 << 3;
        const RECENT = 1 << 4;
    }
}

/// Every supported flag in canonical order, with its IMAP name minus the
/// leading backslash.
pub static SUPPORTED: &[(MailFlags, &str)] = &[
    (MailFlags::SEEN, "Seen"),
    (MailFlags::DELETED, "Deleted"),
    (MailFlags::FLAGGED, "Flagged"),
    (MailFlags::ANSWERED, "Answered"),
    (MailFlags::RECENT, "Recent"),
];

impl MailFlags {
    /// Decode a flag-character string.
    ///
    /// Anything not mentioning `O` is recent; unknown characters are
    /// ignored.
    pub fn decode(data: &str) -> Self {
        let mut flags = MailFlags::RECENT;
        for ch in data.chars() {
            match ch.to_ascii_uppercase() {
                'R' => flags |= MailFlags::SEEN,
                'D' => flags |= MailFlags::DELETED,
                'F' => flags |= MailFlags::FLAGGED,
                'A' => flags |= MailFlags::ANSWERED,
                'O' => flags -= MailFlags::RECENT,
                _ => (),
            }
        }
        flags
    }

    pub fn encode(self) -> String {
        let mut s = String::new();
        if self.contains(MailFlags::SEEN) {
            s.push('R');
        }
        if self.contains(MailFlags::DELETED) {
            s.push('D');
        }
        if self.contains(MailFlags::FLAGGED) {
            s.push('F');
        }
        if self.contains(MailFlags::ANSWERED) {
            s.push('A');
        }
        if !self.contains(MailFlags::RECENT) {
            s.push('O');
        }
        s
    }

    /// Look a flag up by its IMAP name (without backslash), ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        SUPPORTED
            .iter()
            .find(|&&(_, n)| n.eq_ignore_ascii_case(name))
            .map(|&(flag, _)| flag)
    }

    /// The names of the flags in this set, in canonical order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        SUPPORTED
            .iter()
            .filter(move |&&(flag, _)| self.contains(flag))
            .map(|&(_, name)| name)
    }
}
