//! Filter syntax tree.

use crate::query::Query;

/// A parsed filter: binary `&&`/`||` nodes over field comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
  And(Box<Expr>, Box<Expr>),
  Or(Box<Expr>, Box<Expr>),
  Eq { field: String, value: String },
  Neq { field: String, value: String },
}

impl Expr {
  /// Lower the tree to a backend query in one walk.
  pub fn to_query(&self) -> Query {
    match self {
      Expr::And(l, r) => l.to_query().and(r.to_query()),
      Expr::Or(l, r) => l.to_query().or(r.to_query()),
      Expr::Eq { field, value } => Query::term(field, value),
      Expr::Neq { field, value } => Query::term(field, value).negate(),
    }
  }
}
