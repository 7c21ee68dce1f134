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

//! The IMAP syntax model.
//!
//! The first half of this file is the command side: a typed AST for every
//! command the server understands, and a recursive-descent `Parser` that
//! builds it from the token stream produced by `lex::Lexer`. The second half
//! is the response side, where each response type knows how to write itself
//! through a `LexWriter`.
//!
//! The grammar is deliberately forgiving in a few places that real clients
//! rely on:
//!
//! - An unrecognised command word is not a syntax error. It parses as
//!   `Command::Unknown` and the rest of the line is ignored.
//!
//! - Mailbox arguments may be any atom-like token, including things that
//!   happen to spell a command name.
//!
//! - FETCH accepts a bare attribute list without parentheses, in addition to
//!   the `FAST`, `ALL`, and `FULL` macros.
//!
//! `UID FETCH` always has a `UID` attribute injected at the front of its
//! attribute list, whether or not the client asked for it.

use std::borrow::Cow;
use std::io::{self, Write};

use chrono::prelude::*;
use thiserror::Error;

use super::lex::{tokenize, Keyword, LexError, LexWriter, Token, TokenKind};
use super::sequence::{SeqBound, SeqRange, SeqSet};

macro_rules! simple_enum {
    (enum $name:ident {
         $($case_name:ident($case_repr:expr),)+
    }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($case_name,)+
        }

        impl $name {
            /// Case-insensitively match `word` against the known names.
            pub fn parse(word: &str) -> Option<$name> {
                $(if word.eq_ignore_ascii_case($case_repr) {
                    return Some($name::$case_name);
                })+
                None
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$case_name => $case_repr,)+
                }
            }

            pub fn write_to(&self, lex: &mut LexWriter<impl Write>)
                            -> io::Result<()> {
                lex.verbatim(self.name())
            }
        }
    }
}

simple_enum! {
    enum SimpleCommand {
        Capability("CAPABILITY"),
        Check("CHECK"),
        Close("CLOSE"),
        Expunge("EXPUNGE"),
        LogOut("LOGOUT"),
        Noop("NOOP"),
    }
}

simple_enum! {
    enum StatusAtt {
        Messages("MESSAGES"),
        Recent("RECENT"),
        UidNext("UIDNEXT"),
        UidValidity("UIDVALIDITY"),
        Unseen("UNSEEN"),
    }
}

simple_enum! {
    enum RespCondType {
        Ok("OK"),
        No("NO"),
        Bad("BAD"),
        Bye("BYE"),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    pub tag: String,
    pub cmd: Command,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Simple(SimpleCommand),
    Authenticate(String),
    LogIn(LogInCommand),
    Create(String),
    Delete(String),
    Examine(String),
    Select(String),
    Subscribe(String),
    Unsubscribe(String),
    List(ListCommand),
    Lsub(ListCommand),
    Rename(RenameCommand),
    Copy(CopyCommand),
    Status(StatusCommand),
    Fetch(FetchCommand),
    Store(StoreCommand),
    Uid(UidCommand),
    /// A command word the server does not know, upper-cased.
    Unknown(String),
}

impl Command {
    /// The canonical name of the command, as used in response text and for
    /// dispatch.
    pub fn name(&self) -> &str {
        match *self {
            Command::Simple(c) => c.name(),
            Command::Authenticate(_) => "AUTHENTICATE",
            Command::LogIn(_) => "LOGIN",
            Command::Create(_) => "CREATE",
            Command::Delete(_) => "DELETE",
            Command::Examine(_) => "EXAMINE",
            Command::Select(_) => "SELECT",
            Command::Subscribe(_) => "SUBSCRIBE",
            Command::Unsubscribe(_) => "UNSUBSCRIBE",
            Command::List(_) => "LIST",
            Command::Lsub(_) => "LSUB",
            Command::Rename(_) => "RENAME",
            Command::Copy(_) => "COPY",
            Command::Status(_) => "STATUS",
            Command::Fetch(_) => "FETCH",
            Command::Store(_) => "STORE",
            Command::Uid(UidCommand::Fetch(_)) => "UID FETCH",
            Command::Uid(UidCommand::Store(_)) => "UID STORE",
            Command::Unknown(ref name) => name.as_str(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UidCommand {
    Fetch(FetchCommand),
    Store(StoreCommand),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogInCommand {
    pub userid: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListCommand {
    pub reference: String,
    pub pattern: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameCommand {
    pub src: String,
    pub dst: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyCommand {
    pub messages: SeqSet,
    pub dst: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusCommand {
    pub mailbox: String,
    /// The recognised items, in request order. Unknown items are dropped.
    pub atts: Vec<StatusAtt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchCommand {
    pub messages: SeqSet,
    pub atts: Vec<FetchAtt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchAtt {
    BodyStructure,
    Envelope,
    Flags,
    InternalDate,
    Rfc822Header,
    Rfc822Size,
    Rfc822Text,
    Uid,
    /// Bare `BODY`. Only reachable through the `FULL` macro.
    Body,
    BodySection(BodySection),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodySection {
    pub peek: bool,
    pub section: Section,
    pub partial: Option<Partial>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Section {
    /// `BODY[]`
    Full,
    Header,
    HeaderFields(Vec<String>),
    HeaderFieldsNot(Vec<String>),
    Text,
    Mime,
    /// `BODY[n]`, the n-th part of a multipart message.
    Part(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partial {
    pub offset: u64,
    /// `None` if the client gave no length, meaning "to the end".
    pub length: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreCommand {
    pub messages: SeqSet,
    pub args: StoreArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    Replace,
    Add,
    Remove,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreArgs {
    pub op: StoreOp,
    /// `FLAGS.SILENT` rather than `FLAGS`.
    pub silent: bool,
    /// Flag names, without any leading backslash.
    pub flags: Vec<String>,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected {found} '{literal}', expected {expected}")]
    Unexpected {
        expected: &'static str,
        found: TokenKind,
        literal: String,
    },
    #[error("{what} not allowed: {literal}")]
    NotAllowed { what: &'static str, literal: String },
    #[error("unexpected end of input")]
    UnexpectedEnd,
}

/// Parse one complete command line.
///
/// The line ending may or may not be present.
pub fn parse_command_line(line: &str) -> Result<CommandLine, ParseError> {
    let tokens = tokenize(line)?;
    Parser::new(tokens).command_line()
}

/// Find the tag of a command line that could not be parsed, so that the
/// error can be reported against it.
///
/// The tag must be followed by a space for this to succeed.
pub fn recover_tag(line: &str) -> Option<&str> {
    let end = line.find(' ')?;
    let tag = &line[..end];
    if !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-".contains(c))
    {
        Some(tag)
    } else {
        None
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token<'a>>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn command_line(&mut self) -> Result<CommandLine, ParseError> {
        let tag = self.next()?;
        let tag = match tag.kind {
            TokenKind::Word | TokenKind::Number => tag.literal.to_owned(),
            _ => return Err(unexpected(tag, "tag")),
        };
        self.expect(TokenKind::Sp, "SP")?;

        let cmd = self.command()?;
        if !matches!(cmd, Command::Unknown(_)) {
            self.expect(TokenKind::Eol, "end of line")?;
        }

        Ok(CommandLine { tag, cmd })
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        let token = self.next()?;
        let kw = match token.kind {
            TokenKind::Keyword(kw) => kw,
            TokenKind::Word => {
                return Ok(Command::Unknown(token.literal.to_ascii_uppercase()))
            },
            _ => return Err(unexpected(token, "command")),
        };

        let simple = |c| -> Result<Command, ParseError> {
            Ok(Command::Simple(c))
        };
        match kw {
            Keyword::Capability => simple(SimpleCommand::Capability),
            Keyword::Check => simple(SimpleCommand::Check),
            Keyword::Close => simple(SimpleCommand::Close),
            Keyword::Expunge => simple(SimpleCommand::Expunge),
            Keyword::Logout => simple(SimpleCommand::LogOut),
            Keyword::Noop => simple(SimpleCommand::Noop),

            Keyword::Authenticate => {
                self.sp()?;
                let mechanism = self.expect(TokenKind::Word, "mechanism")?;
                Ok(Command::Authenticate(mechanism.literal.to_owned()))
            },

            Keyword::Login => {
                self.sp()?;
                let userid = self.login_string()?;
                self.sp()?;
                let password = self.login_string()?;
                Ok(Command::LogIn(LogInCommand { userid, password }))
            },

            Keyword::Create => Ok(Command::Create(self.sp_mailbox()?)),
            Keyword::Delete => Ok(Command::Delete(self.sp_mailbox()?)),
            Keyword::Examine => Ok(Command::Examine(self.sp_mailbox()?)),
            Keyword::Select => Ok(Command::Select(self.sp_mailbox()?)),
            Keyword::Subscribe => Ok(Command::Subscribe(self.sp_mailbox()?)),
            Keyword::Unsubscribe => {
                Ok(Command::Unsubscribe(self.sp_mailbox()?))
            },

            Keyword::List => Ok(Command::List(self.list_args()?)),
            Keyword::Lsub => Ok(Command::Lsub(self.list_args()?)),

            Keyword::Rename => {
                let src = self.sp_mailbox()?;
                let dst = self.sp_mailbox()?;
                Ok(Command::Rename(RenameCommand { src, dst }))
            },

            Keyword::Copy => {
                self.sp()?;
                let messages = self.seq_set()?;
                let dst = self.sp_mailbox()?;
                Ok(Command::Copy(CopyCommand { messages, dst }))
            },

            Keyword::Status => {
                let mailbox = self.sp_mailbox()?;
                self.sp()?;
                Ok(Command::Status(StatusCommand {
                    mailbox,
                    atts: self.status_atts()?,
                }))
            },

            Keyword::Fetch => {
                self.sp()?;
                Ok(Command::Fetch(self.fetch_args(false)?))
            },

            Keyword::Store => {
                self.sp()?;
                Ok(Command::Store(self.store_args()?))
            },

            Keyword::Uid => {
                self.sp()?;
                let sub = self.next()?;
                match sub.kind {
                    TokenKind::Keyword(Keyword::Fetch) => {
                        self.sp()?;
                        Ok(Command::Uid(UidCommand::Fetch(
                            self.fetch_args(true)?,
                        )))
                    },
                    TokenKind::Keyword(Keyword::Store) => {
                        self.sp()?;
                        Ok(Command::Uid(UidCommand::Store(self.store_args()?)))
                    },
                    _ => Err(unexpected(sub, "FETCH or STORE")),
                }
            },
        }
    }

    fn list_args(&mut self) -> Result<ListCommand, ParseError> {
        let reference = self.sp_mailbox()?;
        let pattern = self.sp_mailbox()?;
        Ok(ListCommand { reference, pattern })
    }

    fn login_string(&mut self) -> Result<String, ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Quoted => Ok(unquote(token.literal).to_owned()),
            TokenKind::Word | TokenKind::Number => Ok(token.literal.to_owned()),
            _ => Err(unexpected(token, "string")),
        }
    }

    fn sp_mailbox(&mut self) -> Result<String, ParseError> {
        self.sp()?;
        let token = self.next()?;
        match token.kind {
            TokenKind::Quoted => Ok(unquote(token.literal).to_owned()),
            TokenKind::Mailbox
            | TokenKind::Word
            | TokenKind::Number
            | TokenKind::Star
            | TokenKind::Keyword(_) => Ok(token.literal.to_owned()),
            _ => Err(unexpected(token, "mailbox")),
        }
    }

    fn status_atts(&mut self) -> Result<Vec<StatusAtt>, ParseError> {
        self.expect(TokenKind::LParen, "LPAREN")?;
        let mut atts = Vec::new();
        loop {
            let word = self.expect(TokenKind::Word, "status item")?;
            if let Some(att) = StatusAtt::parse(word.literal) {
                atts.push(att);
            }

            if self.accept(TokenKind::RParen).is_some() {
                break;
            }
            self.sp()?;
        }

        Ok(atts)
    }

    fn seq_set(&mut self) -> Result<SeqSet, ParseError> {
        let mut ranges = vec![self.seq_range()?];
        while self.accept(TokenKind::Comma).is_some() {
            ranges.push(self.seq_range()?);
        }
        Ok(SeqSet(ranges))
    }

    fn seq_range(&mut self) -> Result<SeqRange, ParseError> {
        let begin = self.seq_bound()?;
        if self.accept(TokenKind::Colon).is_some() {
            let end = self.seq_bound()?;
            Ok(SeqRange { begin, end })
        } else {
            Ok(SeqRange::single(begin))
        }
    }

    fn seq_bound(&mut self) -> Result<SeqBound, ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Star => Ok(SeqBound::Largest),
            TokenKind::Number => Ok(SeqBound::Number(number(token)?)),
            _ => Err(unexpected(token, "sequence number")),
        }
    }

    fn fetch_args(&mut self, uid: bool) -> Result<FetchCommand, ParseError> {
        let messages = self.seq_set()?;
        self.sp()?;

        let mut atts = if self.accept(TokenKind::LParen).is_some() {
            let atts = self.fetch_att_list()?;
            self.expect(TokenKind::RParen, "RPAREN")?;
            atts
        } else if let Some(atts) = self.fetch_macro() {
            atts
        } else {
            self.fetch_att_list()?
        };

        if uid {
            atts.insert(0, FetchAtt::Uid);
        }

        Ok(FetchCommand { messages, atts })
    }

    /// Consume `FAST`, `ALL`, or `FULL` if it is the last thing on the line,
    /// returning its expansion.
    fn fetch_macro(&mut self) -> Option<Vec<FetchAtt>> {
        let word = self.peek().filter(|t| TokenKind::Word == t.kind)?;
        if Some(TokenKind::Eol) != self.peek_at(1).map(|t| t.kind) {
            return None;
        }

        let mut atts = vec![
            FetchAtt::Flags,
            FetchAtt::InternalDate,
            FetchAtt::Rfc822Size,
        ];
        if word.literal.eq_ignore_ascii_case("FAST") {
            // Base set only
        } else if word.literal.eq_ignore_ascii_case("ALL") {
            atts.push(FetchAtt::Envelope);
        } else if word.literal.eq_ignore_ascii_case("FULL") {
            atts.push(FetchAtt::Envelope);
            atts.push(FetchAtt::Body);
        } else {
            return None;
        }

        self.pos += 1;
        Some(atts)
    }

    fn fetch_att_list(&mut self) -> Result<Vec<FetchAtt>, ParseError> {
        let mut atts = vec![self.fetch_att()?];
        while self.accept(TokenKind::Sp).is_some() {
            atts.push(self.fetch_att()?);
        }
        Ok(atts)
    }

    fn fetch_att(&mut self) -> Result<FetchAtt, ParseError> {
        let token = self.next()?;
        let name = match token.kind {
            TokenKind::Keyword(Keyword::Uid) => return Ok(FetchAtt::Uid),
            TokenKind::Word => token.literal.to_ascii_uppercase(),
            _ => return Err(unexpected(token, "fetch attribute")),
        };

        if Some(TokenKind::LBracket) == self.peek().map(|t| t.kind) {
            let peek = match name.as_str() {
                "BODY" => false,
                "BODY.PEEK" => true,
                _ => return Err(not_allowed("attribute", token)),
            };

            self.pos += 1;
            let section = self.section()?;
            self.expect(TokenKind::RBracket, "RSBRACKET")?;
            let partial = if Some(TokenKind::LtSign)
                == self.peek().map(|t| t.kind)
            {
                Some(self.partial()?)
            } else {
                None
            };

            return Ok(FetchAtt::BodySection(BodySection {
                peek,
                section,
                partial,
            }));
        }

        match name.as_str() {
            "BODYSTRUCTURE" => Ok(FetchAtt::BodyStructure),
            "ENVELOPE" => Ok(FetchAtt::Envelope),
            "FLAGS" => Ok(FetchAtt::Flags),
            "INTERNALDATE" => Ok(FetchAtt::InternalDate),
            "RFC822.HEADER" => Ok(FetchAtt::Rfc822Header),
            "RFC822.SIZE" => Ok(FetchAtt::Rfc822Size),
            "RFC822.TEXT" => Ok(FetchAtt::Rfc822Text),
            "UID" => Ok(FetchAtt::Uid),
            _ => Err(not_allowed("attribute", token)),
        }
    }

    fn section(&mut self) -> Result<Section, ParseError> {
        let token = match self.peek() {
            Some(&t) => t,
            None => return Err(ParseError::UnexpectedEnd),
        };

        match token.kind {
            TokenKind::RBracket => return Ok(Section::Full),
            TokenKind::Number => {
                self.pos += 1;
                return Ok(Section::Part(number(token)?));
            },
            TokenKind::Word => self.pos += 1,
            _ => return Err(unexpected(token, "section")),
        }

        // Every named section may carry a header list, but only the
        // HEADER.FIELDS forms do anything with it.
        let headers = if self.accept(TokenKind::Sp).is_some() {
            self.header_list()?
        } else {
            Vec::new()
        };

        match token.literal.to_ascii_uppercase().as_str() {
            "HEADER" => Ok(Section::Header),
            "HEADER.FIELDS" => Ok(Section::HeaderFields(headers)),
            "HEADER.FIELDS.NOT" => Ok(Section::HeaderFieldsNot(headers)),
            "TEXT" => Ok(Section::Text),
            "MIME" => Ok(Section::Mime),
            _ => Err(not_allowed("section", token)),
        }
    }

    fn header_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::LParen, "LPAREN")?;
        let mut headers = Vec::new();
        loop {
            let name = self.expect(TokenKind::Word, "header name")?;
            headers.push(name.literal.to_ascii_uppercase());

            if self.accept(TokenKind::RParen).is_some() {
                break;
            }
            self.sp()?;
        }

        Ok(headers)
    }

    fn partial(&mut self) -> Result<Partial, ParseError> {
        self.expect(TokenKind::LtSign, "LTSIGN")?;
        let offset = number(self.expect(TokenKind::Number, "offset")?)?;
        let length = if self.accept(TokenKind::Dot).is_some() {
            Some(number(self.expect(TokenKind::Number, "length")?)?)
        } else {
            None
        };
        self.expect(TokenKind::GtSign, "GTSIGN")?;

        Ok(Partial { offset, length })
    }

    fn store_args(&mut self) -> Result<StoreCommand, ParseError> {
        let messages = self.seq_set()?;
        self.sp()?;

        let op = if self.accept(TokenKind::Plus).is_some() {
            StoreOp::Add
        } else if self.accept(TokenKind::Minus).is_some() {
            StoreOp::Remove
        } else {
            StoreOp::Replace
        };

        let item = self.expect(TokenKind::Word, "FLAGS")?;
        let silent = if item.literal.eq_ignore_ascii_case("FLAGS") {
            false
        } else if item.literal.eq_ignore_ascii_case("FLAGS.SILENT") {
            true
        } else {
            return Err(not_allowed("store item", item));
        };

        self.sp()?;
        self.expect(TokenKind::LParen, "LPAREN")?;
        let mut flags = Vec::new();
        if self.accept(TokenKind::RParen).is_none() {
            loop {
                self.accept(TokenKind::Bslash);
                let flag = self.expect(TokenKind::Word, "flag")?;
                flags.push(flag.literal.to_owned());

                if self.accept(TokenKind::RParen).is_some() {
                    break;
                }
                self.sp()?;
            }
        }

        Ok(StoreCommand {
            messages,
            args: StoreArgs { op, silent, flags },
        })
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + ahead)
    }

    fn next(&mut self) -> Result<Token<'a>, ParseError> {
        let token = *self.peek().ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn accept(&mut self, kind: TokenKind) -> Option<Token<'a>> {
        match self.peek() {
            Some(&t) if t.kind == kind => {
                self.pos += 1;
                Some(t)
            },
            _ => None,
        }
    }

    fn expect(
        &mut self,
        kind: TokenKind,
        expected: &'static str,
    ) -> Result<Token<'a>, ParseError> {
        let token = self.next()?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(unexpected(token, expected))
        }
    }

    fn sp(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Sp, "SP").map(|_| ())
    }
}

fn unexpected(token: Token<'_>, expected: &'static str) -> ParseError {
    ParseError::Unexpected {
        expected,
        found: token.kind,
        literal: token.literal.to_owned(),
    }
}

fn not_allowed(what: &'static str, token: Token<'_>) -> ParseError {
    ParseError::NotAllowed {
        what,
        literal: token.literal.to_owned(),
    }
}

fn number<T: std::str::FromStr>(token: Token<'_>) -> Result<T, ParseError> {
    token
        .literal
        .parse()
        .map_err(|_| not_allowed("number", token))
}

fn unquote(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseLine {
    /// The command tag, or `None` for an untagged (`*`) response.
    /// Ignored for continuation requests.
    pub tag: Option<String>,
    pub response: Response,
}

impl ResponseLine {
    /// Write the line, without its terminating CRLF.
    pub fn write_to(&self, lex: &mut LexWriter<impl Write>) -> io::Result<()> {
        if let Response::Continuation(ref data) = self.response {
            lex.verbatim("+ ")?;
            return lex.verbatim(data);
        }

        match self.tag {
            Some(ref tag) => lex.verbatim(tag)?,
            None => lex.verbatim("*")?,
        }
        lex.verbatim(" ")?;
        self.response.write_to(lex)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Cond(CondResponse),
    Capability(Vec<Cow<'static, str>>),
    Flags(Vec<&'static str>),
    Exists(u32),
    Recent(u32),
    List(MailboxList),
    Lsub(MailboxList),
    Status(StatusResponse),
    Fetch(FetchResponse),
    Store(StoreResponse),
    /// A `+` continuation request carrying the given (already encoded) data.
    Continuation(String),
}

impl Response {
    pub fn write_to(&self, lex: &mut LexWriter<impl Write>) -> io::Result<()> {
        match *self {
            Response::Cond(ref cr) => cr.write_to(lex),
            Response::Capability(ref caps) => {
                lex.verbatim("CAPABILITY")?;
                for cap in caps {
                    lex.verbatim(" ")?;
                    lex.verbatim(cap)?;
                }
                Ok(())
            },
            Response::Flags(ref flags) => {
                lex.verbatim("FLAGS ")?;
                write_flag_list(lex, flags)
            },
            Response::Exists(n) => {
                lex.num_u32(&n)?;
                lex.verbatim(" EXISTS")
            },
            Response::Recent(n) => {
                lex.num_u32(&n)?;
                lex.verbatim(" RECENT")
            },
            Response::List(ref ml) => {
                lex.verbatim("LIST ")?;
                ml.write_to(lex)
            },
            Response::Lsub(ref ml) => {
                lex.verbatim("LSUB ")?;
                ml.write_to(lex)
            },
            Response::Status(ref sr) => sr.write_to(lex),
            Response::Fetch(ref fr) => fr.write_to(lex),
            Response::Store(ref sr) => sr.write_to(lex),
            Response::Continuation(ref data) => {
                lex.verbatim("+ ")?;
                lex.verbatim(data)
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CondResponse {
    pub cond: RespCondType,
    pub code: Option<RespTextCode>,
    pub quip: Option<Cow<'static, str>>,
}

impl CondResponse {
    pub fn write_to(&self, lex: &mut LexWriter<impl Write>) -> io::Result<()> {
        self.cond.write_to(lex)?;
        if let Some(ref code) = self.code {
            lex.verbatim(" [")?;
            code.write_to(lex)?;
            lex.verbatim("]")?;
        }
        if let Some(ref quip) = self.quip {
            lex.verbatim(" ")?;
            lex.verbatim(quip)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RespTextCode {
    PermanentFlags(Vec<&'static str>),
    UidValidity(u32),
    UidNext(u32),
    ReadWrite,
}

impl RespTextCode {
    pub fn write_to(&self, lex: &mut LexWriter<impl Write>) -> io::Result<()> {
        match *self {
            RespTextCode::PermanentFlags(ref flags) => {
                lex.verbatim("PERMANENTFLAGS ")?;
                write_flag_list(lex, flags)
            },
            RespTextCode::UidValidity(n) => {
                lex.verbatim("UIDVALIDITY ")?;
                lex.num_u32(&n)
            },
            RespTextCode::UidNext(n) => {
                lex.verbatim("UIDNEXT ")?;
                lex.num_u32(&n)
            },
            RespTextCode::ReadWrite => lex.verbatim("READ-WRITE"),
        }
    }
}

/// One entry of a LIST or LSUB response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailboxList {
    /// Attribute names, without the leading backslash.
    pub flags: Vec<&'static str>,
    pub name: String,
}

impl MailboxList {
    fn write_to(&self, lex: &mut LexWriter<impl Write>) -> io::Result<()> {
        write_flag_list(lex, &self.flags)?;
        lex.verbatim(" \"/\" ")?;
        lex.mailbox(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusResponse {
    pub mailbox: String,
    pub atts: Vec<(StatusAtt, u32)>,
}

impl StatusResponse {
    fn write_to(&self, lex: &mut LexWriter<impl Write>) -> io::Result<()> {
        lex.verbatim("STATUS ")?;
        lex.mailbox(&self.mailbox)?;
        lex.verbatim(" (")?;
        for (ix, &(att, value)) in self.atts.iter().enumerate() {
            if ix > 0 {
                lex.verbatim(" ")?;
            }
            att.write_to(lex)?;
            lex.verbatim(" ")?;
            lex.num_u32(&value)?;
        }
        lex.verbatim(")")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub seqnum: u32,
    pub items: Vec<FetchItem>,
}

impl FetchResponse {
    fn write_to(&self, lex: &mut LexWriter<impl Write>) -> io::Result<()> {
        lex.num_u32(&self.seqnum)?;
        lex.verbatim(" FETCH (")?;
        for (ix, item) in self.items.iter().enumerate() {
            if ix > 0 {
                lex.verbatim(" ")?;
            }
            lex.verbatim(&item.name)?;
            lex.verbatim(" ")?;
            item.value.write_to(lex)?;
        }
        lex.verbatim(")")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchItem {
    /// The attribute name as it appears in the response, such as `FLAGS` or
    /// `BODY[HEADER]<0>`.
    pub name: Cow<'static, str>,
    pub value: FetchValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchValue {
    Number(u64),
    Flags(Vec<&'static str>),
    DateTime(DateTime<FixedOffset>),
    Data(Vec<u8>),
}

impl FetchValue {
    fn write_to(&self, lex: &mut LexWriter<impl Write>) -> io::Result<()> {
        match *self {
            FetchValue::Number(n) => lex.num_u64(&n),
            FetchValue::Flags(ref flags) => write_flag_list(lex, flags),
            FetchValue::DateTime(ref dt) => lex.datetime(dt),
            FetchValue::Data(ref data) => lex.string(data),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreResponse {
    pub seqnum: u32,
    pub uid: u32,
    pub flags: Vec<&'static str>,
}

impl StoreResponse {
    fn write_to(&self, lex: &mut LexWriter<impl Write>) -> io::Result<()> {
        lex.num_u32(&self.seqnum)?;
        lex.verbatim(" STORE (UID ")?;
        lex.num_u32(&self.uid)?;
        lex.verbatim(" FLAGS ")?;
        write_flag_list(lex, &self.flags)?;
        lex.verbatim(")")
    }
}

fn write_flag_list(
    lex: &mut LexWriter<impl Write>,
    flags: &[&str],
) -> io::Result<()> {
    lex.verbatim("(")?;
    for (ix, flag) in flags.iter().enumerate() {
        if ix > 0 {
            lex.verbatim(" ")?;
        }
        lex.flag(flag)?;
    }
    lex.verbatim(")")
}
