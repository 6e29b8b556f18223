//! Tokenizer for the text form.
//!
//! Literal rules are small winnow parsers over `&str`; the driver loop in
//! [`tokenize`] strips whitespace and `//` comments between tokens and tags
//! each token with its line and column.

use winnow::ascii::{digit0, digit1, multispace1, till_line_ending};
use winnow::combinator::{alt, delimited, not, opt, repeat, terminated};
use winnow::token::{one_of, take_till, take_while};
use winnow::{ModalResult, Parser};

use crate::util::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// Numeric literal, kept as written so integers and reals parse exactly.
    Number(String),
    Str(String),
    LBrace,
    RBrace,
    Comma,
    Colon,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Whitespace and line comments.
fn trivia(input: &mut &str) -> ModalResult<()> {
    repeat(0.., alt((multispace1.void(), ("//", till_line_ending).void()))).parse_next(input)
}

/// `-1`, `0.5`, `.5`, `1e-05`.
fn number<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (
        opt(one_of(['-', '+'])),
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['-', '+'])), digit1)),
    )
        .take()
        .parse_next(input)
}

/// `NaN`, `inf` and `-inf`, as floats display when they are not finite.
fn non_finite<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    terminated(
        (opt(one_of(['-', '+'])), alt(("NaN", "inf"))).take(),
        not(one_of(|c: char| c.is_ascii_alphanumeric() || c == '_')),
    )
    .parse_next(input)
}

fn ident<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Double-quoted string; there are no escapes.
fn string<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

fn token(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        string.map(|s: &str| TokenKind::Str(s.to_owned())),
        number.map(|s: &str| TokenKind::Number(s.to_owned())),
        non_finite.map(|s: &str| TokenKind::Number(s.to_owned())),
        ident.map(|s: &str| TokenKind::Ident(s.to_owned())),
        '{'.value(TokenKind::LBrace),
        '}'.value(TokenKind::RBrace),
        ','.value(TokenKind::Comma),
        ':'.value(TokenKind::Colon),
    ))
    .parse_next(input)
}

/// Maps byte offsets to 1-based line and column.
struct LineIndex<'s> {
    source: &'s str,
    starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    fn new(source: &'s str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset).max(1);
        let start = self.starts[line - 1];
        let column = self.source.get(start..offset).map_or(1, |s| s.chars().count() + 1);
        (line, column)
    }
}

/// Split text into tokens. The last token is always [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let lines = LineIndex::new(source);
    let mut input = source;
    let mut tokens = Vec::new();
    loop {
        let offset = source.len() - input.len();
        if trivia(&mut input).is_err() {
            let (line, column) = lines.position(offset);
            return Err(Error::grammar(line, column, "malformed whitespace"));
        }
        let offset = source.len() - input.len();
        let (line, column) = lines.position(offset);
        if input.is_empty() {
            tokens.push(Token { kind: TokenKind::Eof, line, column });
            return Ok(tokens);
        }
        match token(&mut input) {
            Ok(kind) => tokens.push(Token { kind, line, column }),
            Err(_) => {
                let message = match input.chars().next() {
                    Some('"') => "unterminated string".to_string(),
                    Some(c) => format!("unexpected character {:?}", c),
                    None => "unexpected end of input".to_string(),
                };
                return Err(Error::grammar(line, column, message));
            }
        }
    }
}
