use super::{Connector, StatementBuilder};
use crate::types::{JoinKind, RowValues, StatementKind};

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Fluent SQL clauses.
///
/// Every method appends one fragment to the underlying [`StatementBuilder`] and returns the
/// same instance, so calls chain. Implemented by [`StatementBuilder`] itself and by
/// [`Executor`](crate::executor::Executor), which lets a chain end in `.execute().await`.
pub trait Clauses {
    fn statement_mut(&mut self) -> &mut StatementBuilder;

    /// `SELECT <f1, f2, ...> FROM <table>`
    fn select<I, S>(&mut self, table: &str, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<String> = fields
            .into_iter()
            .map(|f| f.as_ref().to_owned())
            .collect();
        let stmt = self.statement_mut();
        if fields.is_empty() {
            stmt.reject(format!("SELECT from `{table}` lists no fields"));
        }
        stmt.push_clause(
            format!("SELECT {} FROM {table}", fields.join(", ")),
            Some(StatementKind::Select),
            [],
        );
        self
    }

    /// `WHERE <field> <op> ?`
    fn where_<V: Into<RowValues>>(&mut self, field: &str, op: &str, value: V) -> &mut Self {
        self.statement_mut().push_clause(
            format!("WHERE {field} {op} ?"),
            None,
            [value.into()],
        );
        self
    }

    /// `AND <field> <op> ?`
    fn and<V: Into<RowValues>>(&mut self, field: &str, op: &str, value: V) -> &mut Self {
        self.statement_mut()
            .push_clause(format!("AND {field} {op} ?"), None, [value.into()]);
        self
    }

    /// `OR <field> <op> ?`
    fn or<V: Into<RowValues>>(&mut self, field: &str, op: &str, value: V) -> &mut Self {
        self.statement_mut()
            .push_clause(format!("OR {field} {op} ?"), None, [value.into()]);
        self
    }

    /// `<connector> <field> LIKE ?`
    fn like<V: Into<RowValues>>(&mut self, field: &str, connector: Connector, value: V) -> &mut Self {
        self.statement_mut().push_clause(
            format!("{connector} {field} LIKE ?"),
            None,
            [value.into()],
        );
        self
    }

    /// `<connector> <field> IN(?,?,...)`, one placeholder per value.
    fn in_<I, V>(&mut self, field: &str, values: I, connector: Connector) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        let values: Vec<RowValues> = values.into_iter().map(Into::into).collect();
        let stmt = self.statement_mut();
        if values.is_empty() {
            stmt.reject(format!("IN list for `{field}` is empty"));
        }
        stmt.push_clause(
            format!("{connector} {field} IN({})", placeholders(values.len())),
            None,
            values,
        );
        self
    }

    /// `<connector> <field> BETWEEN ? AND ?`, binding `low` then `high`.
    fn between<L, H>(&mut self, field: &str, range: (L, H), connector: Connector) -> &mut Self
    where
        L: Into<RowValues>,
        H: Into<RowValues>,
    {
        let (low, high) = range;
        self.statement_mut().push_clause(
            format!("{connector} {field} BETWEEN ? AND ?"),
            None,
            [low.into(), high.into()],
        );
        self
    }

    /// `INSERT INTO <table> (<k1,k2,...>) VALUES(?,?,...)`
    ///
    /// Columns, placeholders and bound values all come from one pass over `fields_values`.
    fn insert<I, K, V>(&mut self, table: &str, fields_values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RowValues>,
    {
        let (columns, values): (Vec<String>, Vec<RowValues>) = fields_values
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_owned(), v.into()))
            .unzip();
        let stmt = self.statement_mut();
        if columns.is_empty() {
            stmt.reject(format!("INSERT into `{table}` has no columns"));
        }
        stmt.push_clause(
            format!(
                "INSERT INTO {table} ({}) VALUES({})",
                columns.join(","),
                placeholders(columns.len())
            ),
            Some(StatementKind::Insert),
            values,
        );
        self
    }

    /// `UPDATE <table> SET <k1> = ?, <k2> = ?`; chain `where_`/`and` for the predicate.
    fn update<I, K, V>(&mut self, table: &str, fields_values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RowValues>,
    {
        let (assignments, values): (Vec<String>, Vec<RowValues>) = fields_values
            .into_iter()
            .map(|(k, v)| (format!("{} = ?", k.as_ref()), v.into()))
            .unzip();
        let stmt = self.statement_mut();
        if assignments.is_empty() {
            stmt.reject(format!("UPDATE of `{table}` sets no columns"));
        }
        stmt.push_clause(
            format!("UPDATE {table} SET {}", assignments.join(", ")),
            Some(StatementKind::Update),
            values,
        );
        self
    }

    /// `<KIND JOIN> <table> ON <left> = <right>`
    fn join(&mut self, kind: JoinKind, table: &str, on: (&str, &str)) -> &mut Self {
        let (left, right) = on;
        self.statement_mut()
            .push_clause(format!("{kind} {table} ON {left} = {right}"), None, []);
        self
    }

    fn inner_join(&mut self, table: &str, on: (&str, &str)) -> &mut Self {
        self.join(JoinKind::Inner, table, on)
    }

    fn left_join(&mut self, table: &str, on: (&str, &str)) -> &mut Self {
        self.join(JoinKind::Left, table, on)
    }

    fn right_join(&mut self, table: &str, on: (&str, &str)) -> &mut Self {
        self.join(JoinKind::Right, table, on)
    }

    /// `CALL <name>(?,...)`
    fn call_procedure<I, V>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        let values: Vec<RowValues> = values.into_iter().map(Into::into).collect();
        self.statement_mut().push_clause(
            format!("CALL {name}({})", placeholders(values.len())),
            Some(StatementKind::Call),
            values,
        );
        self
    }
}

impl Clauses for StatementBuilder {
    fn statement_mut(&mut self) -> &mut StatementBuilder {
        self
    }
}
