//! Recursive descent over the token stream.
//!
//! ```text
//! document := property* EOF
//! property := 'static'? IDENT value* (',' | '{' body '}' ','?)?
//! body     := (property | NUMBER ':' value | value)* separated by ','
//! value    := NUMBER | STRING | IDENT | '{' (NUMBER ','?)* '}'
//! ```
//!
//! A `{` directly followed by a number opens a vector literal; any other `{`
//! opens a body.

use super::lexer::{Token, TokenKind};
use super::tree::{Entry, Pos, Property, Value};
use crate::util::{Error, Result};

pub struct BlockParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl BlockParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the whole input as a list of top-level blocks.
    pub fn document(&mut self) -> Result<Vec<Property>> {
        let mut blocks = Vec::new();
        loop {
            match self.kind() {
                TokenKind::Eof => return Ok(blocks),
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::Ident(_) => blocks.push(self.property(false)?),
                other => return Err(self.error(format!("expected a block keyword, found {}", describe(other)))),
            }
        }
    }

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn kind_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn here(&self) -> Pos {
        let t = self.current();
        Pos { line: t.line, column: t.column }
    }

    fn advance(&mut self) -> Token {
        let t = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn error(&self, msg: impl Into<String>) -> Error {
        self.here().error(msg)
    }

    fn skip_comma(&mut self) {
        if matches!(self.kind(), TokenKind::Comma) {
            self.advance();
        }
    }

    fn opens_vector(&self) -> bool {
        matches!(self.kind(), TokenKind::LBrace) && matches!(self.kind_at(1), Some(TokenKind::Number(_)))
    }

    fn property(&mut self, is_static: bool) -> Result<Property> {
        let pos = self.here();
        let key = match self.advance().kind {
            TokenKind::Ident(key) => key,
            other => return Err(pos.error(format!("expected a keyword, found {}", describe(&other)))),
        };
        let mut prop = Property { key, is_static, values: Vec::new(), body: None, pos };

        loop {
            match self.kind() {
                TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::Ident(_) => {
                    let value = self.value()?;
                    prop.values.push(value);
                }
                TokenKind::LBrace if self.opens_vector() => {
                    let value = self.value()?;
                    prop.values.push(value);
                }
                TokenKind::LBrace => {
                    self.advance();
                    prop.body = Some(self.body()?);
                    self.skip_comma();
                    return Ok(prop);
                }
                TokenKind::Comma => {
                    self.advance();
                    return Ok(prop);
                }
                TokenKind::RBrace | TokenKind::Eof => return Ok(prop),
                TokenKind::Colon => return Err(self.error(format!("unexpected ':' after {}", prop.key))),
            }
        }
    }

    /// Entries up to and including the closing brace.
    fn body(&mut self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        loop {
            let pos = self.here();
            match self.kind() {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(entries);
                }
                TokenKind::Eof => return Err(self.error("unclosed '{'")),
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::Ident(word)
                    if word == "static" && matches!(self.kind_at(1), Some(TokenKind::Ident(_))) =>
                {
                    self.advance();
                    entries.push(Entry::Property(self.property(true)?));
                }
                TokenKind::Ident(_) => entries.push(Entry::Property(self.property(false)?)),
                TokenKind::Number(frame) if matches!(self.kind_at(1), Some(TokenKind::Colon)) => {
                    let frame = frame.clone();
                    self.advance();
                    self.advance();
                    let value = self.value()?;
                    entries.push(Entry::Key { frame, value, pos });
                    self.skip_comma();
                }
                TokenKind::Colon => return Err(self.error("unexpected ':'")),
                TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::LBrace => {
                    let value = self.value()?;
                    entries.push(Entry::Value(value, pos));
                    self.skip_comma();
                }
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        let pos = self.here();
        match self.advance().kind {
            TokenKind::Number(s) => Ok(Value::Number(s)),
            TokenKind::Str(s) => Ok(Value::Str(s)),
            TokenKind::Ident(s) => Ok(Value::Ident(s)),
            TokenKind::LBrace => self.vector().map(Value::Vector),
            other => Err(pos.error(format!("expected a value, found {}", describe(&other)))),
        }
    }

    /// Numbers of a vector literal; the opening brace is already consumed.
    fn vector(&mut self) -> Result<Vec<String>> {
        let mut items = Vec::new();
        loop {
            match self.advance().kind {
                TokenKind::RBrace => return Ok(items),
                TokenKind::Number(s) => {
                    items.push(s);
                    match self.kind() {
                        TokenKind::Comma => {
                            self.advance();
                        }
                        TokenKind::RBrace => {}
                        other => return Err(self.error(format!("expected ',' or '}}', found {}", describe(other)))),
                    }
                }
                other => {
                    return Err(self.error(format!("expected a number in vector, found {}", describe(&other))))
                }
            }
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(s) => format!("'{}'", s),
        TokenKind::Number(s) => format!("number {}", s),
        TokenKind::Str(s) => format!("string {:?}", s),
        TokenKind::LBrace => "'{'".into(),
        TokenKind::RBrace => "'}'".into(),
        TokenKind::Comma => "','".into(),
        TokenKind::Colon => "':'".into(),
        TokenKind::Eof => "end of input".into(),
    }
}
