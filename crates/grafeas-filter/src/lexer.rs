//! On-demand tokenizer for filter expressions.
//!
//! The parser pulls one token at a time, so an error is always reported at
//! the first offending position rather than after tokenizing the whole input.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
  Ident(String),
  Str(String),
  Dot,
  EqEq,
  NotEq,
  AndAnd,
  OrOr,
}

impl Token {
  /// Human-readable form used in error messages.
  pub(crate) fn describe(&self) -> String {
    match self {
      Token::Ident(s) => format!("identifier {s:?}"),
      Token::Str(s) => format!("string {s:?}"),
      Token::Dot => "'.'".into(),
      Token::EqEq => "'=='".into(),
      Token::NotEq => "'!='".into(),
      Token::AndAnd => "'&&'".into(),
      Token::OrOr => "'||'".into(),
    }
  }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spanned {
  pub token:  Token,
  pub offset: usize,
}

pub(crate) struct Lexer<'a> {
  input:  &'a str,
  pos:    usize,
  peeked: Option<Option<Spanned>>,
}

impl<'a> Lexer<'a> {
  pub(crate) fn new(input: &'a str) -> Self { Self { input, pos: 0, peeked: None } }

  /// Offset one past the last byte of input.
  pub(crate) fn end(&self) -> usize { self.input.len() }

  pub(crate) fn peek(&mut self) -> Result<Option<&Spanned>> {
    if self.peeked.is_none() {
      let next = self.scan()?;
      self.peeked = Some(next);
    }
    Ok(self.peeked.as_ref().and_then(Option::as_ref))
  }

  pub(crate) fn next_token(&mut self) -> Result<Option<Spanned>> {
    match self.peeked.take() {
      Some(tok) => Ok(tok),
      None => self.scan(),
    }
  }

  fn rest(&self) -> &'a str { &self.input[self.pos..] }

  fn skip_whitespace(&mut self) {
    let trimmed = self.rest().trim_start();
    self.pos = self.input.len() - trimmed.len();
  }

  fn scan(&mut self) -> Result<Option<Spanned>> {
    self.skip_whitespace();
    let offset = self.pos;
    let mut chars = self.rest().chars();
    let Some(c) = chars.next() else {
      return Ok(None);
    };

    let two = |expected: char, token: Token, lexer: &mut Self| -> Result<Token> {
      match lexer.rest()[c.len_utf8()..].chars().next() {
        Some(n) if n == expected => {
          lexer.pos += c.len_utf8() + n.len_utf8();
          Ok(token)
        }
        _ => Err(Error::UnexpectedChar { ch: c, offset }),
      }
    };

    let token = match c {
      '.' => {
        self.pos += 1;
        Token::Dot
      }
      '=' => two('=', Token::EqEq, self)?,
      '!' => two('=', Token::NotEq, self)?,
      '&' => two('&', Token::AndAnd, self)?,
      '|' => two('|', Token::OrOr, self)?,
      '"' => Token::Str(self.scan_string(offset)?),
      c if c.is_ascii_alphabetic() || c == '_' => {
        let len = self
          .rest()
          .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
          .unwrap_or(self.rest().len());
        let ident = self.rest()[..len].to_owned();
        self.pos += len;
        Token::Ident(ident)
      }
      other => return Err(Error::UnexpectedChar { ch: other, offset }),
    };

    Ok(Some(Spanned { token, offset }))
  }

  /// Scan a double-quoted string whose opening quote is at `start`.
  fn scan_string(&mut self, start: usize) -> Result<String> {
    let mut value = String::new();
    let mut iter = self.input[start + 1..].char_indices();

    while let Some((i, c)) = iter.next() {
      match c {
        '"' => {
          self.pos = start + 1 + i + 1;
          return Ok(value);
        }
        '\\' => match iter.next() {
          Some((_, esc @ ('"' | '\\'))) => value.push(esc),
          Some((_, other)) => {
            return Err(Error::InvalidEscape { ch: other, offset: start + 1 + i });
          }
          None => break,
        },
        c => value.push(c),
      }
    }

    Err(Error::UnterminatedString { offset: start })
  }
}
