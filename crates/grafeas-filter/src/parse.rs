//! Recursive-descent parser.
//!
//! ```text
//! expr  := or
//! or    := and ( "||" and )*
//! and   := cmp ( "&&" cmp )*
//! cmp   := field op value
//! field := identifier ( "." identifier )*
//! op    := "==" | "!="
//! value := dquoted_string
//! ```

use grafeas_core::ResourceKind;

use crate::{
  ast::Expr,
  error::{Error, Result},
  fields::is_queryable,
  lexer::{Lexer, Spanned, Token},
};

pub(crate) struct Parser<'a> {
  lexer: Lexer<'a>,
  kind:  ResourceKind,
}

impl<'a> Parser<'a> {
  pub(crate) fn new(input: &'a str, kind: ResourceKind) -> Self {
    Self { lexer: Lexer::new(input), kind }
  }

  /// Parse the whole input; anything left after the expression is an error.
  pub(crate) fn parse(mut self) -> Result<Expr> {
    let expr = self.parse_or()?;
    if let Some(Spanned { token, offset }) = self.lexer.next_token()? {
      return Err(Error::Expected {
        expected: "'&&', '||' or end of filter",
        found: token.describe(),
        offset,
      });
    }
    Ok(expr)
  }

  fn eat(&mut self, wanted: &Token) -> Result<bool> {
    let found = matches!(self.lexer.peek()?, Some(s) if &s.token == wanted);
    if found {
      self.lexer.next_token()?;
    }
    Ok(found)
  }

  fn parse_or(&mut self) -> Result<Expr> {
    let mut lhs = self.parse_and()?;
    while self.eat(&Token::OrOr)? {
      let rhs = self.parse_and()?;
      lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
  }

  fn parse_and(&mut self) -> Result<Expr> {
    let mut lhs = self.parse_cmp()?;
    while self.eat(&Token::AndAnd)? {
      let rhs = self.parse_cmp()?;
      lhs = Expr::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
  }

  fn parse_cmp(&mut self) -> Result<Expr> {
    let (field, field_offset) = self.parse_field()?;
    if !is_queryable(self.kind, &field) {
      return Err(Error::UnknownField { field, kind: self.kind, offset: field_offset });
    }

    let negated = match self.lexer.next_token()? {
      Some(Spanned { token: Token::EqEq, .. }) => false,
      Some(Spanned { token: Token::NotEq, .. }) => true,
      Some(Spanned { token, offset }) => {
        return Err(Error::Expected {
          expected: "'==' or '!='",
          found: token.describe(),
          offset,
        });
      }
      None => {
        return Err(Error::UnexpectedEnd { expected: "'==' or '!='", offset: self.lexer.end() });
      }
    };

    let value = match self.lexer.next_token()? {
      Some(Spanned { token: Token::Str(value), .. }) => value,
      Some(Spanned { token, offset }) => {
        return Err(Error::Expected {
          expected: "a double-quoted value",
          found: token.describe(),
          offset,
        });
      }
      None => {
        return Err(Error::UnexpectedEnd {
          expected: "a double-quoted value",
          offset:   self.lexer.end(),
        });
      }
    };

    Ok(if negated { Expr::Neq { field, value } } else { Expr::Eq { field, value } })
  }

  fn parse_field(&mut self) -> Result<(String, usize)> {
    let (mut field, start) = self.expect_ident()?;
    while self.eat(&Token::Dot)? {
      let (part, _) = self.expect_ident()?;
      field.push('.');
      field.push_str(&part);
    }
    Ok((field, start))
  }

  fn expect_ident(&mut self) -> Result<(String, usize)> {
    match self.lexer.next_token()? {
      Some(Spanned { token: Token::Ident(name), offset }) => Ok((name, offset)),
      Some(Spanned { token, offset }) => Err(Error::Expected {
        expected: "a field name",
        found: token.describe(),
        offset,
      }),
      None => Err(Error::UnexpectedEnd { expected: "a field name", offset: self.lexer.end() }),
    }
  }
}
