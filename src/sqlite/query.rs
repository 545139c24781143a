use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::error::DriverError;
use crate::results::{RawMutation, RowSet};
use crate::types::RowValues;

fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, DriverError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run a row-returning statement and collect every row.
pub(crate) fn build_row_set(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<RowSet, DriverError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut row_set = RowSet::with_columns(column_names, 10);
    while let Some(row) = rows.next()? {
        let values = (0..col_count)
            .map(|i| extract_value(row, i))
            .collect::<Result<Vec<_>, _>>()?;
        row_set.push_values(values);
    }
    Ok(row_set)
}

/// Run a data-changing statement; reports the change count and the connection's last rowid.
pub(crate) fn execute_mutation(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<RawMutation, DriverError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let affected = stmt.execute(params_from_iter(params.iter()))?;
    Ok(RawMutation {
        affected_rows: u64::try_from(affected).unwrap_or(u64::MAX),
        last_insert_id: Some(conn.last_insert_rowid()),
    })
}
