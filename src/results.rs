mod row;
mod row_set;

pub use row::Row;
pub use row_set::RowSet;

use crate::error::SqlChainError;
use crate::types::StatementKind;

/// What a driver reports after running a non-SELECT statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawMutation {
    pub affected_rows: u64,
    /// Last generated row id on the connection, when the backend exposes one.
    pub last_insert_id: Option<i64>,
}

/// Outcome of an INSERT, UPDATE or CALL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationResult {
    pub affected_rows: u64,
    /// Generated id of the inserted row; only set for INSERT statements.
    pub insert_id: Option<i64>,
    /// Rows changed by an UPDATE; zero for other statements.
    pub changed_rows: u64,
}

impl MutationResult {
    pub(crate) fn classify(kind: StatementKind, raw: RawMutation) -> Self {
        match kind {
            StatementKind::Insert => MutationResult {
                affected_rows: raw.affected_rows,
                insert_id: raw.last_insert_id,
                changed_rows: 0,
            },
            StatementKind::Update => MutationResult {
                affected_rows: raw.affected_rows,
                insert_id: None,
                changed_rows: raw.affected_rows,
            },
            StatementKind::Call | StatementKind::Select => MutationResult {
                affected_rows: raw.affected_rows,
                insert_id: None,
                changed_rows: 0,
            },
        }
    }
}

/// Typed result of [`Executor::execute`](crate::executor::Executor::execute).
///
/// The variant follows the statement's leading clause: `Rows` for SELECT, `Mutation` for
/// INSERT/UPDATE/CALL.
#[derive(Debug, Clone)]
pub enum QueryResult {
    Mutation(MutationResult),
    Rows(RowSet),
}

impl QueryResult {
    #[must_use]
    pub fn as_mutation(&self) -> Option<&MutationResult> {
        match self {
            QueryResult::Mutation(m) => Some(m),
            QueryResult::Rows(_) => None,
        }
    }

    #[must_use]
    pub fn as_rows(&self) -> Option<&RowSet> {
        match self {
            QueryResult::Rows(rows) => Some(rows),
            QueryResult::Mutation(_) => None,
        }
    }

    /// # Errors
    /// Returns `SqlChainError::ValidationError` if the statement was a SELECT.
    pub fn into_mutation(self) -> Result<MutationResult, SqlChainError> {
        match self {
            QueryResult::Mutation(m) => Ok(m),
            QueryResult::Rows(_) => Err(SqlChainError::ValidationError(
                "expected a mutation result, statement returned rows".into(),
            )),
        }
    }

    /// # Errors
    /// Returns `SqlChainError::ValidationError` if the statement was not a SELECT.
    pub fn into_rows(self) -> Result<RowSet, SqlChainError> {
        match self {
            QueryResult::Rows(rows) => Ok(rows),
            QueryResult::Mutation(_) => Err(SqlChainError::ValidationError(
                "expected rows, statement returned a mutation result".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    #[test]
    fn insert_id_only_surfaces_for_inserts() {
        let raw = RawMutation {
            affected_rows: 1,
            last_insert_id: Some(9),
        };
        assert_eq!(
            MutationResult::classify(StatementKind::Insert, raw).insert_id,
            Some(9)
        );
        let update = MutationResult::classify(StatementKind::Update, raw);
        assert_eq!(update.insert_id, None);
        assert_eq!(update.changed_rows, 1);
        assert_eq!(MutationResult::classify(StatementKind::Call, raw).changed_rows, 0);
    }

    #[test]
    fn duplicate_column_names_resolve_to_the_first() {
        let mut set = RowSet::with_columns(vec!["userID".into(), "userID".into()], 1);
        set.push_values(vec![RowValues::Int(7), RowValues::Null]);

        let row = &set.rows()[0];
        assert_eq!(row.get_column_index("userID"), Some(0));
        assert_eq!(row.get("userID"), Some(&RowValues::Int(7)));
        assert!(row.get_by_index(1).is_some_and(RowValues::is_null));
    }

    #[test]
    fn rows_share_column_lookup() {
        let mut set = RowSet::with_columns(vec!["userID".into(), "email".into()], 2);
        set.push_values(vec![RowValues::Int(1), RowValues::Text("a@b.com".into())]);
        set.push_values(vec![RowValues::Int(2), RowValues::Null]);

        assert_eq!(set.len(), 2);
        let second = &set.rows()[1];
        assert_eq!(second.get("userID"), Some(&RowValues::Int(2)));
        assert!(second.get("email").is_some_and(RowValues::is_null));
        assert_eq!(second.get("missing"), None);
        assert_eq!(
            set.first().map(Row::to_json),
            Some(serde_json::json!({"userID": 1, "email": "a@b.com"}))
        );
    }

    #[test]
    fn kind_mismatch_is_a_validation_error() {
        let result = QueryResult::Mutation(MutationResult::default());
        assert!(matches!(
            result.into_rows(),
            Err(SqlChainError::ValidationError(_))
        ));
    }
}
