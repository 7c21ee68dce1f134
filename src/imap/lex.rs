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

//! IMAP's lexical rules, in both directions.
//!
//! Reading: `Lexer` splits one client command line into `Token`s. What a run
//! of characters means depends on where it is. At the top level, a word
//! spelling a command name is that command's keyword. Inside parentheses,
//! brackets, or a partial-range `<...>`, the same word is just a `WORD`.
//! Opening punctuation pushes a `LexState`, and the matching closer pops it.
//!
//! Writing: `LexWriter` decides how server data goes on the wire. Strings
//! that fit on one line are quoted. Anything containing a line break is sent
//! as a literal.

use std::fmt;
use std::io::{self, Write};

use chrono::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref STRICT_ATOM: Regex =
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9_.-]*[A-Za-z0-9])?$").unwrap();
}

macro_rules! keywords {
    ($($variant:ident = $name:expr,)*) => {
        /// The command names the lexer recognises at the top level.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant,)*
        }

        static KEYWORDS: &[(&str, Keyword)] = &[
            $(($name, Keyword::$variant),)*
        ];

        impl Keyword {
            pub fn name(self) -> &'static str {
                match self {
                    $(Keyword::$variant => $name,)*
                }
            }
        }
    };
}

keywords! {
    Authenticate = "AUTHENTICATE",
    Capability = "CAPABILITY",
    Check = "CHECK",
    Close = "CLOSE",
    Copy = "COPY",
    Create = "CREATE",
    Delete = "DELETE",
    Examine = "EXAMINE",
    Expunge = "EXPUNGE",
    Fetch = "FETCH",
    List = "LIST",
    Login = "LOGIN",
    Logout = "LOGOUT",
    Lsub = "LSUB",
    Noop = "NOOP",
    Rename = "RENAME",
    Select = "SELECT",
    Status = "STATUS",
    Store = "STORE",
    Subscribe = "SUBSCRIBE",
    Uid = "UID",
    Unsubscribe = "UNSUBSCRIBE",
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name.eq_ignore_ascii_case(word))
            .map(|&(_, kw)| kw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Sp,
    Eol,
    Number,
    Word,
    Mailbox,
    Quoted,
    Colon,
    Comma,
    Dot,
    Star,
    Plus,
    Minus,
    Bslash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LtSign,
    GtSign,
    Keyword(Keyword),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TokenKind::Sp => write!(f, "SP"),
            TokenKind::Eol => write!(f, "EOL"),
            TokenKind::Number => write!(f, "NUMBER"),
            TokenKind::Word => write!(f, "WORD"),
            TokenKind::Mailbox => write!(f, "MAILBOX"),
            TokenKind::Quoted => write!(f, "QUOTED"),
            TokenKind::Colon => write!(f, "COLON"),
            TokenKind::Comma => write!(f, "COMMA"),
            TokenKind::Dot => write!(f, "DOT"),
            TokenKind::Star => write!(f, "STAR"),
            TokenKind::Plus => write!(f, "PLUS"),
            TokenKind::Minus => write!(f, "MINUS"),
            TokenKind::Bslash => write!(f, "BSLASH"),
            TokenKind::LParen => write!(f, "LPAREN"),
            TokenKind::RParen => write!(f, "RPAREN"),
            TokenKind::LBracket => write!(f, "LSBRACKET"),
            TokenKind::RBracket => write!(f, "RSBRACKET"),
            TokenKind::LtSign => write!(f, "LTSIGN"),
            TokenKind::GtSign => write!(f, "GTSIGN"),
            TokenKind::Keyword(kw) => write!(f, "{}", kw.name()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// The exact input text of the token. For `QUOTED`, this includes the
    /// quotes.
    pub literal: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexState {
    Paren,
    Bracket,
    Sign,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    #[error("illegal character '{0}'")]
    IllegalChar(char),
    #[error("unterminated group at end of line")]
    Unterminated,
}

/// Splits one command line into tokens.
///
/// The line may or may not include its line ending. The last token produced
/// on success is always `Eol`.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    stack: Vec<LexState>,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            stack: Vec::new(),
            done: false,
        }
    }

    fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        let rest = &self.input[self.pos..];

        if rest.chars().all(char::is_whitespace) {
            if !self.stack.is_empty() {
                return Err(LexError::Unterminated);
            }

            self.pos = self.input.len();
            self.done = true;
            return Ok(Token {
                kind: TokenKind::Eol,
                literal: rest,
            });
        }

        let ch = match rest.chars().next() {
            Some(ch) => ch,
            None => return Err(LexError::Unterminated),
        };

        if Some(&LexState::Sign) == self.stack.last() {
            return self.next_sign_token(rest, ch);
        }

        let kind = match ch {
            ' ' => TokenKind::Sp,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            // A leading '-' is the STORE "remove" marker, never part of an
            // atom
            '-' => TokenKind::Minus,
            '\\' => TokenKind::Bslash,
            '(' => {
                self.stack.push(LexState::Paren);
                TokenKind::LParen
            },
            '[' => {
                self.stack.push(LexState::Bracket);
                TokenKind::LBracket
            },
            '<' => {
                self.stack.push(LexState::Sign);
                TokenKind::LtSign
            },
            ')' => {
                self.pop(LexState::Paren, ch)?;
                TokenKind::RParen
            },
            ']' => {
                self.pop(LexState::Bracket, ch)?;
                TokenKind::RBracket
            },
            '"' => return self.quoted(rest),
            c if is_atom_char(c) => return Ok(self.atom(rest)),
            c => return Err(LexError::IllegalChar(c)),
        };

        Ok(self.take(rest, 1, kind))
    }

    fn next_sign_token(
        &mut self,
        rest: &'a str,
        ch: char,
    ) -> Result<Token<'a>, LexError> {
        match ch {
            '0'..='9' => {
                let len = rest
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or_else(|| rest.len());
                Ok(self.take(rest, len, TokenKind::Number))
            },
            '.' => Ok(self.take(rest, 1, TokenKind::Dot)),
            '>' => {
                self.pop(LexState::Sign, ch)?;
                Ok(self.take(rest, 1, TokenKind::GtSign))
            },
            c => Err(LexError::IllegalChar(c)),
        }
    }

    fn quoted(&mut self, rest: &'a str) -> Result<Token<'a>, LexError> {
        match rest[1..].find('"') {
            Some(end) => Ok(self.take(rest, end + 2, TokenKind::Quoted)),
            None => Err(LexError::IllegalChar('"')),
        }
    }

    fn atom(&mut self, rest: &'a str) -> Token<'a> {
        let len = rest
            .find(|c: char| !is_atom_char(c))
            .unwrap_or_else(|| rest.len());
        let word = &rest[..len];

        let kind = if "*" == word {
            TokenKind::Star
        } else if word.bytes().all(|b| b.is_ascii_digit()) {
            TokenKind::Number
        } else if STRICT_ATOM.is_match(word) {
            match Keyword::from_word(word) {
                Some(kw) if self.stack.is_empty() => TokenKind::Keyword(kw),
                _ => TokenKind::Word,
            }
        } else {
            TokenKind::Mailbox
        };

        self.take(rest, len, kind)
    }

    fn pop(&mut self, expected: LexState, ch: char) -> Result<(), LexError> {
        if Some(&expected) == self.stack.last() {
            self.stack.pop();
            Ok(())
        } else {
            Err(LexError::IllegalChar(ch))
        }
    }

    fn take(&mut self, rest: &'a str, len: usize, kind: TokenKind) -> Token<'a> {
        self.pos += len;
        Token {
            kind,
            literal: &rest[..len],
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.next_token();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

/// Tokenise a whole line, ending with `Eol`.
pub fn tokenize(line: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(line).collect()
}

fn is_atom_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "?#%~_.*-".contains(c)
}

/// Writes server responses under IMAP's lexical rules.
#[derive(Clone, Copy, Debug)]
pub struct LexWriter<W> {
    writer: W,
}

impl<W: Write> LexWriter<W> {
    pub fn new(writer: W) -> Self {
        LexWriter { writer }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn verbatim(&mut self, s: &str) -> io::Result<()> {
        self.writer.write_all(s.as_bytes())
    }

    pub fn verbatim_bytes(&mut self, s: &[u8]) -> io::Result<()> {
        self.writer.write_all(s)
    }

    pub fn num_u32(&mut self, value: &u32) -> io::Result<()> {
        write!(self.writer, "{}", *value)
    }

    pub fn num_u64(&mut self, value: &u64) -> io::Result<()> {
        write!(self.writer, "{}", *value)
    }

    /// Write `data` as a quoted string, or as a literal if it contains a line
    /// break or NUL.
    pub fn string(&mut self, data: &[u8]) -> io::Result<()> {
        if is_quotable(data) {
            self.quoted(data)
        } else {
            self.literal(data)
        }
    }

    /// Write `data` as a literal regardless of content.
    pub fn literal(&mut self, data: &[u8]) -> io::Result<()> {
        write!(self.writer, "{{{}}}\r\n", data.len())?;
        self.writer.write_all(data)
    }

    pub fn mailbox(&mut self, name: &str) -> io::Result<()> {
        self.string(name.as_bytes())
    }

    pub fn flag(&mut self, name: &str) -> io::Result<()> {
        write!(self.writer, "\\{}", name)
    }

    pub fn datetime(
        &mut self,
        datetime: &DateTime<FixedOffset>,
    ) -> io::Result<()> {
        write!(
            self.writer,
            "\"{}\"",
            datetime.format("%d-%b-%Y %H:%M:%S %z")
        )
    }

    fn quoted(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(b"\"")?;
        for &b in data {
            if b'\\' == b || b'"' == b {
                self.writer.write_all(b"\\")?;
            }
            self.writer.write_all(&[b])?;
        }
        self.writer.write_all(b"\"")
    }
}

fn is_quotable(data: &[u8]) -> bool {
    !data.iter().any(|&b| b'\n' == b || b'\r' == b || 0 == b)
}
