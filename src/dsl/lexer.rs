//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Mapx.
//! The Mapx project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! Ruleset tokenizer with line/column positions.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::{MxError, MxLocation, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum MxTokenKind {
    /// Bare word: identifiers, short identifiers, numbers, `*`, `~`.
    Word(String),
    /// IRI written between angle brackets.
    Iri(String),
    /// Quoted string, escapes already resolved.
    Str(String),
    EqEq,
    Gt,
    Ge,
    Lt,
    Le,
    AndAnd,
    OrOr,
    Bang,
    Arrow,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Slash,
    Equals,
    Eof,
}

impl fmt::Display for MxTokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MxTokenKind::Word(w) => write!(f, "{}", w),
            MxTokenKind::Iri(i) => write!(f, "<{}>", i),
            MxTokenKind::Str(s) => write!(f, "\"{}\"", s),
            MxTokenKind::EqEq => write!(f, "=="),
            MxTokenKind::Gt => write!(f, ">"),
            MxTokenKind::Ge => write!(f, ">="),
            MxTokenKind::Lt => write!(f, "<"),
            MxTokenKind::Le => write!(f, "<="),
            MxTokenKind::AndAnd => write!(f, "&&"),
            MxTokenKind::OrOr => write!(f, "||"),
            MxTokenKind::Bang => write!(f, "!"),
            MxTokenKind::Arrow => write!(f, "->"),
            MxTokenKind::LParen => write!(f, "("),
            MxTokenKind::RParen => write!(f, ")"),
            MxTokenKind::LBrace => write!(f, "{{"),
            MxTokenKind::RBrace => write!(f, "}}"),
            MxTokenKind::LBracket => write!(f, "["),
            MxTokenKind::RBracket => write!(f, "]"),
            MxTokenKind::Comma => write!(f, ","),
            MxTokenKind::Semicolon => write!(f, ";"),
            MxTokenKind::Slash => write!(f, "/"),
            MxTokenKind::Equals => write!(f, "="),
            MxTokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MxToken {
    pub kind: MxTokenKind,
    pub location: MxLocation,
    /// Byte offsets of the token in the source.
    pub start: usize,
    pub end: usize,
}

pub struct MxLexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> MxLexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenizes the whole input; the last token is always `Eof`.
    pub fn tokenize(input: &str) -> Result<Vec<MxToken>> {
        let mut lexer = MxLexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == MxTokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<MxToken> {
        self.skip_whitespace_and_comments();

        let location = MxLocation::new(self.line, self.column);
        let start = self.offset();
        let Some(c) = self.peek_char() else {
            return Ok(self.token(MxTokenKind::Eof, location, start));
        };

        let kind = match c {
            '(' => self.single(MxTokenKind::LParen),
            ')' => self.single(MxTokenKind::RParen),
            '{' => self.single(MxTokenKind::LBrace),
            '}' => self.single(MxTokenKind::RBrace),
            '[' => self.single(MxTokenKind::LBracket),
            ']' => self.single(MxTokenKind::RBracket),
            ',' => self.single(MxTokenKind::Comma),
            ';' => self.single(MxTokenKind::Semicolon),
            '/' => self.single(MxTokenKind::Slash),
            '"' | '\'' => self.read_string(c, location)?,
            '=' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    MxTokenKind::EqEq
                } else {
                    MxTokenKind::Equals
                }
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    MxTokenKind::Ge
                } else {
                    MxTokenKind::Gt
                }
            }
            '<' => self.read_angle()?,
            '&' => self.read_double('&', MxTokenKind::AndAnd, location)?,
            '|' => self.read_double('|', MxTokenKind::OrOr, location)?,
            '!' => self.single(MxTokenKind::Bang),
            '-' if self.input[start..].starts_with("->") => {
                self.advance();
                self.advance();
                MxTokenKind::Arrow
            }
            c if is_word_char(c) => self.read_word(),
            other => {
                return Err(MxError::syntax_at(location, format!("unexpected character '{}'", other)));
            }
        };

        Ok(self.token(kind, location, start))
    }

    fn token(&mut self, kind: MxTokenKind, location: MxLocation, start: usize) -> MxToken {
        MxToken {
            kind,
            location,
            start,
            end: self.offset(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while let Some(c) = self.peek_char() {
                if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            // '#' comments run to the end of the line
            if self.peek_char() == Some('#') {
                while let Some(c) = self.advance() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn single(&mut self, kind: MxTokenKind) -> MxTokenKind {
        self.advance();
        kind
    }

    fn read_double(&mut self, c: char, kind: MxTokenKind, location: MxLocation) -> Result<MxTokenKind> {
        self.advance();
        if self.peek_char() == Some(c) {
            self.advance();
            Ok(kind)
        } else {
            Err(MxError::syntax_at(location, format!("expected '{}{}'", c, c)))
        }
    }

    fn read_word(&mut self) -> MxTokenKind {
        let start = self.offset();
        while let Some(c) = self.peek_char() {
            if !is_word_char(c) {
                break;
            }
            let pos = self.offset();
            if c == '-' && self.input[pos..].starts_with("->") {
                break;
            }
            self.advance();
        }
        let end = self.offset();
        MxTokenKind::Word(self.input[start..end].to_string())
    }

    /// `<` starts an IRI when a run of non-blank characters closed by `>`
    /// follows; otherwise it is a comparison operator.
    fn read_angle(&mut self) -> Result<MxTokenKind> {
        let start = self.offset();
        let input = self.input;
        let rest = &input[start + 1..];
        let run_end = rest
            .find(|c: char| c.is_whitespace() || c == '<')
            .unwrap_or(rest.len());
        if let Some(close) = rest[..run_end].find('>') {
            let candidate = &rest[..close];
            // a '-' before '>' is the arrow of `F<N->action()`
            let is_iri = close > 0
                && !candidate.ends_with('-')
                && !candidate.contains(|c: char| matches!(c, ';' | '(' | ')' | '{' | '}' | '|' | '&' | '"' | '\''));
            if is_iri {
                let iri = rest[..close].to_string();
                // '<', the IRI itself, '>'
                for _ in 0..iri.chars().count() + 2 {
                    self.advance();
                }
                return Ok(MxTokenKind::Iri(iri));
            }
        }
        self.advance();
        if self.peek_char() == Some('=') {
            self.advance();
            Ok(MxTokenKind::Le)
        } else {
            Ok(MxTokenKind::Lt)
        }
    }

    fn read_string(&mut self, quote: char, location: MxLocation) -> Result<MxTokenKind> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(MxError::syntax_at(location, "unterminated string")),
                Some('\\') => match self.advance() {
                    Some(c @ ('"' | '\'' | '\\')) => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err(MxError::syntax_at(location, "unterminated string")),
                },
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
            }
        }
        Ok(MxTokenKind::Str(value))
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map(|(i, _)| *i).unwrap_or(self.input.len())
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '*' | '~' | '+')
}
