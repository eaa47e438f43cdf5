//! Filter translator for Grafeas list operations.
//!
//! Compiles the host's textual filter expressions into backend query trees.
//! Pure and synchronous; no I/O.
//!
//! # Quick start
//!
//! ```
//! use grafeas_core::ResourceKind;
//!
//! let query = grafeas_filter::compile(
//!   ResourceKind::Project,
//!   r#"name=="projects/foo" || name=="projects/bar""#,
//! )
//! .unwrap();
//! println!("{}", query.to_json());
//! ```

pub mod ast;
pub mod error;
pub mod fields;
mod lexer;
mod parse;
pub mod query;

pub use ast::Expr;
pub use error::{Error, Result};
use grafeas_core::ResourceKind;
pub use query::{BoolQuery, Query};

/// Parse `input` against the whitelist for `kind`.
///
/// Returns `None` for an empty (or whitespace-only) filter, which matches
/// every document.
pub fn parse(kind: ResourceKind, input: &str) -> Result<Option<Expr>> {
  if input.trim().is_empty() {
    return Ok(None);
  }
  parse::Parser::new(input, kind).parse().map(Some)
}

/// Parse and lower `input` to a backend query.
pub fn compile(kind: ResourceKind, input: &str) -> Result<Query> {
  Ok(parse(kind, input)?.map_or(Query::MatchAll, |expr| expr.to_query()))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn eq(field: &str, value: &str) -> Expr {
    Expr::Eq { field: field.into(), value: value.into() }
  }

  #[test]
  fn empty_filter_matches_everything() {
    assert_eq!(parse(ResourceKind::Project, "").unwrap(), None);
    assert_eq!(compile(ResourceKind::Project, "   ").unwrap(), Query::MatchAll);
  }

  #[test]
  fn or_of_names() {
    let expr = parse(ResourceKind::Project, r#"name=="projects/foo"||name=="projects/bar""#)
      .unwrap()
      .unwrap();
    assert_eq!(
      expr,
      Expr::Or(Box::new(eq("name", "projects/foo")), Box::new(eq("name", "projects/bar")))
    );
  }

  #[test]
  fn and_binds_tighter_than_or() {
    let expr = parse(
      ResourceKind::Occurrence,
      r#"kind == "BUILD" || kind == "IMAGE" && noteName != "projects/p/notes/n""#,
    )
    .unwrap()
    .unwrap();

    let Expr::Or(lhs, rhs) = expr else {
      panic!("expected Or at the root");
    };
    assert_eq!(*lhs, eq("kind", "BUILD"));
    assert!(matches!(*rhs, Expr::And(_, _)));
  }

  #[test]
  fn chains_are_left_associative() {
    let expr = parse(ResourceKind::Project, r#"name=="a" || name=="b" || name=="c""#)
      .unwrap()
      .unwrap();
    let Expr::Or(lhs, rhs) = expr else { panic!("expected Or") };
    assert!(matches!(*lhs, Expr::Or(_, _)));
    assert_eq!(*rhs, eq("name", "c"));
  }

  #[test]
  fn dotted_fields() {
    let query = compile(ResourceKind::Occurrence, r#"resource.uri != "docker://x""#).unwrap();
    assert_eq!(
      query.to_json(),
      json!({ "bool": { "must_not": [ { "term": { "resource.uri": "docker://x" } } ] } })
    );
  }

  #[test]
  fn unquoted_value_is_rejected_at_its_offset() {
    let err = parse(ResourceKind::Project, "name==projects/no-quotes").unwrap_err();
    assert_eq!(err, Error::Expected {
      expected: "a double-quoted value",
      found:    "identifier \"projects\"".into(),
      offset:   6,
    });
    let core: grafeas_core::Error = err.into();
    assert!(matches!(core, grafeas_core::Error::InvalidArgument(_)));
  }

  #[test]
  fn unknown_field_is_rejected() {
    let err = parse(ResourceKind::Project, r#"noteName == "x""#).unwrap_err();
    assert!(matches!(err, Error::UnknownField { ref field, offset: 0, .. } if field == "noteName"));
    // Valid for occurrences.
    assert!(parse(ResourceKind::Occurrence, r#"noteName == "x""#).is_ok());
  }

  #[test]
  fn trailing_garbage_is_rejected() {
    let err = parse(ResourceKind::Project, r#"name == "a" name == "b""#).unwrap_err();
    assert!(matches!(err, Error::Expected { offset: 12, .. }));
  }

  #[test]
  fn dangling_operator_is_rejected() {
    let err = parse(ResourceKind::Project, r#"name == "a" &&"#).unwrap_err();
    assert_eq!(err, Error::UnexpectedEnd { expected: "a field name", offset: 14 });
  }

  #[test]
  fn truncated_comparison_reports_end_offset() {
    let err = parse(ResourceKind::Note, "kind").unwrap_err();
    assert_eq!(err, Error::UnexpectedEnd { expected: "'==' or '!='", offset: 4 });
    assert_eq!(err.to_string(), "unexpected end of filter at offset 4, expected '==' or '!='");

    let err = parse(ResourceKind::Note, "kind != ").unwrap_err();
    assert_eq!(err, Error::UnexpectedEnd { expected: "a double-quoted value", offset: 8 });
  }

  #[test]
  fn parentheses_are_not_supported() {
    let err = parse(ResourceKind::Project, r#"(name == "a")"#).unwrap_err();
    assert_eq!(err, Error::UnexpectedChar { ch: '(', offset: 0 });
  }

  #[test]
  fn whitespace_is_insignificant_outside_strings() {
    let a = compile(ResourceKind::Note, "kind==\"BUILD\"&&name!=\"x y\"").unwrap();
    let b = compile(ResourceKind::Note, "  kind ==  \"BUILD\"\n&&\tname != \"x y\" ").unwrap();
    assert_eq!(a, b);
  }
}
