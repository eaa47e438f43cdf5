//! Backend query tree.
//!
//! A small, typed subset of the index query DSL. [`Query::to_json`] renders
//! the wire form sent in a search request body.

use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
  MatchAll,
  /// Exact match of `value` against the keyword at `field`.
  Term { field: String, value: String },
  /// Keyword at `field` starts with `value`.
  Prefix { field: String, value: String },
  Bool(BoolQuery),
}

/// Conjunction of `must`, at least one of `should` (when non-empty), and
/// none of `must_not`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoolQuery {
  pub must:     Vec<Query>,
  pub should:   Vec<Query>,
  pub must_not: Vec<Query>,
}

impl Query {
  pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
    Query::Term { field: field.into(), value: value.into() }
  }

  pub fn prefix(field: impl Into<String>, value: impl Into<String>) -> Self {
    Query::Prefix { field: field.into(), value: value.into() }
  }

  /// Conjoin two queries; `MatchAll` is the identity.
  pub fn and(self, other: Query) -> Query {
    match (self, other) {
      (Query::MatchAll, q) | (q, Query::MatchAll) => q,
      (a, b) => Query::Bool(BoolQuery { must: vec![a, b], ..BoolQuery::default() }),
    }
  }

  pub fn or(self, other: Query) -> Query {
    Query::Bool(BoolQuery { should: vec![self, other], ..BoolQuery::default() })
  }

  pub fn negate(self) -> Query {
    Query::Bool(BoolQuery { must_not: vec![self], ..BoolQuery::default() })
  }

  pub fn to_json(&self) -> Value {
    match self {
      Query::MatchAll => json!({ "match_all": {} }),
      Query::Term { field, value } => json!({ "term": { field: value } }),
      Query::Prefix { field, value } => json!({ "prefix": { field: value } }),
      Query::Bool(b) => {
        let mut body = serde_json::Map::new();
        let render = |qs: &[Query]| Value::Array(qs.iter().map(Query::to_json).collect());
        if !b.must.is_empty() {
          body.insert("must".into(), render(&b.must));
        }
        if !b.should.is_empty() {
          body.insert("should".into(), render(&b.should));
          body.insert("minimum_should_match".into(), json!(1));
        }
        if !b.must_not.is_empty() {
          body.insert("must_not".into(), render(&b.must_not));
        }
        json!({ "bool": body })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn match_all_is_identity_for_and() {
    let t = Query::term("name", "projects/a");
    assert_eq!(Query::MatchAll.and(t.clone()), t);
    assert_eq!(t.clone().and(Query::MatchAll), t);
  }

  #[test]
  fn renders_bool_tree() {
    let q = Query::prefix("name", "projects/p/notes/")
      .and(Query::term("kind", "BUILD").or(Query::term("kind", "IMAGE").negate()));

    assert_eq!(
      q.to_json(),
      json!({ "bool": { "must": [
        { "prefix": { "name": "projects/p/notes/" } },
        { "bool": {
            "should": [
              { "term": { "kind": "BUILD" } },
              { "bool": { "must_not": [ { "term": { "kind": "IMAGE" } } ] } }
            ],
            "minimum_should_match": 1
        } }
      ] } })
    );
  }
}
