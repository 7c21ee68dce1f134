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

//! Sequence sets, such as `1:3,7,10:*`.
//!
//! A sequence set is kept symbolic until a command runs against a mailbox,
//! since `*` means "the largest message number" at that moment.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqBound {
    Number(u32),
    /// `*`
    Largest,
}

impl SeqBound {
    fn resolve(self, count: u32) -> u32 {
        match self {
            SeqBound::Number(n) => n,
            SeqBound::Largest => count,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeqRange {
    pub begin: SeqBound,
    pub end: SeqBound,
}

impl SeqRange {
    pub fn single(bound: SeqBound) -> Self {
        SeqRange {
            begin: bound,
            end: bound,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeqSet(pub Vec<SeqRange>);

/// Expand `seq` into message positions against a mailbox of `count`
/// messages.
///
/// Each range covers the inclusive span between its bounds, in ascending
/// order whichever bound is larger, clipped to `1..=count`. Ranges are
/// concatenated in the order given, so a position named twice comes out
/// twice.
pub fn resolve(seq: &SeqSet, count: u32) -> Vec<u32> {
    let mut out = Vec::new();
    for range in &seq.0 {
        let begin = range.begin.resolve(count);
        let end = range.end.resolve(count);
        let (low, high) = if begin <= end {
            (begin, end)
        } else {
            (end, begin)
        };

        let low = low.max(1);
        let high = high.min(count);
        if low <= high {
            out.extend(low..=high);
        }
    }
    out
}
