use std::fmt;

use crate::error::SqlChainError;
use crate::placeholders::count_placeholders;
use crate::types::{RowValues, StatementKind};

mod clauses;

pub use clauses::Clauses;

/// Connector keyword that opens or continues a predicate chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connector {
    Where,
    And,
    Or,
}

impl Connector {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Connector::Where => "WHERE",
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Accumulates SQL fragments and their bound parameters across chained clause calls.
///
/// The builder never touches a connection. Fragments are joined with single spaces, and every
/// clause pushes exactly one parameter per `?` it emits, in left-to-right order. Table and
/// column names are written verbatim and must come from trusted code; only values are bound.
///
/// ```rust
/// use sql_chain::prelude::*;
///
/// let mut qb = StatementBuilder::new();
/// qb.update("users", [("firstName", "Jane")])
///     .where_("userID", "=", 7);
/// assert_eq!(qb.sql(), "UPDATE users SET firstName = ? WHERE userID = ?");
/// assert_eq!(qb.params(), &[RowValues::from("Jane"), RowValues::Int(7)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatementBuilder {
    fragments: Vec<String>,
    params: Vec<RowValues>,
    kind: Option<StatementKind>,
    problem: Option<String>,
}

impl StatementBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current statement text. Diagnostic only; has no side effects.
    #[must_use]
    pub fn sql(&self) -> String {
        self.fragments.join(" ")
    }

    /// Parameters bound so far, in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[RowValues] {
        &self.params
    }

    /// Kind fixed by the first leading clause, if any.
    #[must_use]
    pub fn kind(&self) -> Option<StatementKind> {
        self.kind
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.params.is_empty()
    }

    /// Drain the accumulated statement, leaving the builder empty and reusable.
    pub fn take(&mut self) -> Statement {
        let taken = std::mem::take(self);
        Statement {
            text: taken.fragments.join(" "),
            params: taken.params,
            kind: taken.kind,
            problem: taken.problem,
        }
    }

    /// Discard everything accumulated so far.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn push_clause<I>(&mut self, fragment: String, kind: Option<StatementKind>, values: I)
    where
        I: IntoIterator<Item = RowValues>,
    {
        if self.kind.is_none() {
            self.kind = kind;
        }
        self.fragments.push(fragment);
        self.params.extend(values);
    }

    /// Remember the first malformed clause; it is reported when the statement executes.
    pub(crate) fn reject(&mut self, reason: impl Into<String>) {
        if self.problem.is_none() {
            self.problem = Some(reason.into());
        }
    }
}

/// A drained statement: text, parameters and the kind that decides result classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<RowValues>,
    pub kind: Option<StatementKind>,
    problem: Option<String>,
}

impl Statement {
    /// Check the statement before it is sent.
    ///
    /// # Errors
    /// Returns `SqlChainError::ValidationError` when a clause was malformed, the statement is
    /// empty or has no leading SELECT/INSERT/UPDATE/CALL clause, or the number of `?`
    /// placeholders differs from the number of bound parameters.
    pub fn validate(&self) -> Result<StatementKind, SqlChainError> {
        if let Some(problem) = &self.problem {
            return Err(SqlChainError::ValidationError(problem.clone()));
        }
        if self.text.trim().is_empty() {
            return Err(SqlChainError::ValidationError("empty statement".into()));
        }
        let Some(kind) = self.kind else {
            return Err(SqlChainError::ValidationError(format!(
                "statement `{}` has no SELECT, INSERT, UPDATE or CALL clause",
                self.text
            )));
        };
        let placeholders = count_placeholders(&self.text);
        if placeholders != self.params.len() {
            return Err(SqlChainError::ValidationError(format!(
                "statement `{}` has {placeholders} placeholders but {} bound parameters",
                self.text,
                self.params.len()
            )));
        }
        Ok(kind)
    }
}
