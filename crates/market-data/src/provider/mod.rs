//! Provider adapters for the upstream market data sources.

pub mod headers;
mod msn;
mod tcbs;
mod traits;
mod vci;

pub use msn::MsnAdapter;
pub use tcbs::TcbsAdapter;
pub use traits::ProviderAdapter;
pub use vci::VciAdapter;

use serde_json::Value;

use crate::errors::FetchError;
use crate::models::{Cell, DataTable, SourceId};

/// Convert a JSON array of row objects into a column-ordered table.
///
/// Columns appear in first-seen order; rows missing a column are padded
/// with nulls so every column stays row-aligned.
pub(crate) fn table_from_objects(
    source: SourceId,
    rows: &[Value],
) -> Result<DataTable, FetchError> {
    let mut order: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<Cell>> = Vec::new();

    for (row_index, row) in rows.iter().enumerate() {
        let Some(object) = row.as_object() else {
            return Err(FetchError::MalformedPayload {
                source,
                message: format!("row {row_index} is not a JSON object"),
            });
        };

        for (key, value) in object {
            let index = match order.iter().position(|name| name == key) {
                Some(index) => index,
                None => {
                    order.push(key.clone());
                    columns.push(vec![Cell::Null; row_index]);
                    order.len() - 1
                }
            };
            columns[index].push(cell_from_value(value));
        }

        for values in &mut columns {
            if values.len() <= row_index {
                values.push(Cell::Null);
            }
        }
    }

    let mut table = DataTable::new();
    for (name, values) in order.into_iter().zip(columns) {
        table.push_column(name, values);
    }
    Ok(table)
}

fn cell_from_value(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Cell::Integer(v)
            } else {
                n.as_f64()
                    .and_then(rust_decimal::Decimal::from_f64_retain)
                    .map_or(Cell::Null, Cell::Decimal)
            }
        }
        Value::String(s) => Cell::Text(s.clone()),
        Value::Bool(b) => Cell::Text(b.to_string()),
        // Nested structures are kept as their JSON rendering.
        other => Cell::Text(other.to_string()),
    }
}
