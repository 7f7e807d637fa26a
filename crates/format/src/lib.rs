//! Vngate Response Formatter
//!
//! Shapes a [`DataTable`] into the payloads the gateway returns: a JSON
//! column mapping or CSV text, with optional column shaping (drop empty
//! columns, flatten hierarchical names) and multi-symbol merging.
//!
//! CSV output round-trips losslessly through [`from_csv`] for any table
//! whose cells contain no embedded newlines.

use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use thiserror::Error;

use vngate_market_data::{Cell, DataTable};

/// Errors that can occur while shaping output.
#[derive(Error, Debug)]
pub enum FormatError {
    /// CSV encoding or parsing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the CSV writer failed
    #[error("CSV write error: {0}")]
    CsvWrite(String),

    /// Writing CSV produced bytes that are not UTF-8
    #[error("CSV output is not valid UTF-8")]
    InvalidUtf8,
}

/// Shaping options applied when rendering a table.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Remove columns whose values are null in every row.
    pub dropna: bool,
    /// Collapse hierarchical column names into a single level.
    pub flatten_columns: bool,
    /// Separator used when flattening.
    pub separator: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            dropna: false,
            flatten_columns: false,
            separator: "_".to_string(),
        }
    }
}

impl FormatOptions {
    pub fn dropna(mut self, dropna: bool) -> Self {
        self.dropna = dropna;
        self
    }

    pub fn flatten(mut self, flatten: bool, separator: impl Into<String>) -> Self {
        self.flatten_columns = flatten;
        self.separator = separator.into();
        self
    }
}

/// Render a table as a JSON mapping of column name to row-ordered values.
pub fn to_json(table: &DataTable, options: &FormatOptions) -> Value {
    let mut mapping = Map::new();
    for column in table.columns() {
        if options.dropna && column.values.iter().all(Cell::is_null) {
            continue;
        }
        let name = if options.flatten_columns {
            column.flat_name(&options.separator)
        } else {
            column.name.clone()
        };
        let values = column.values.iter().map(cell_to_value).collect();
        mapping.insert(name, Value::Array(values));
    }
    Value::Object(mapping)
}

/// Serialize a table to CSV text with a header line.
///
/// Grouped column names are flattened with `_`; fields containing the
/// delimiter or quotes are escaped per standard CSV quoting.
pub fn to_csv(table: &DataTable) -> Result<String, FormatError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header: Vec<String> = table.columns().iter().map(|c| c.flat_name("_")).collect();
    writer.write_record(&header)?;

    for row in 0..table.row_count() {
        let record: Vec<String> = (0..table.columns().len())
            .map(|col| table.cell(row, col).to_field())
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| FormatError::CsvWrite(err.to_string()))?;
    String::from_utf8(bytes).map_err(|_| FormatError::InvalidUtf8)
}

/// Parse CSV text produced by [`to_csv`] back into a table.
pub fn from_csv(text: &str) -> Result<DataTable, FormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let header = reader.headers()?.clone();
    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); header.len()];

    for record in reader.records() {
        let record = record?;
        for (index, values) in columns.iter_mut().enumerate() {
            values.push(Cell::parse_field(record.get(index).unwrap_or_default()));
        }
    }

    let mut table = DataTable::new();
    for (name, values) in header.iter().zip(columns) {
        table.push_column(name, values);
    }
    Ok(table)
}

/// Merge per-symbol tables into one, tagging every row with a `ticker`
/// column so the origin of each row stays distinguishable.
///
/// Columns are the first-seen union across inputs; rows from tables missing
/// a column get nulls there. The merged row count is the sum of the inputs'.
pub fn combine(entries: &[(String, DataTable)]) -> DataTable {
    let mut order: Vec<(String, Option<String>)> = Vec::new();
    for (_, table) in entries {
        for column in table.columns() {
            let key = (column.name.clone(), column.group.clone());
            if !order.contains(&key) {
                order.push(key);
            }
        }
    }

    let mut ticker = Vec::new();
    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); order.len()];

    for (symbol, table) in entries {
        for row in 0..table.row_count() {
            ticker.push(Cell::Text(symbol.clone()));
            for (slot, (name, group)) in columns.iter_mut().zip(&order) {
                let cell = table
                    .columns()
                    .iter()
                    .find(|c| &c.name == name && &c.group == group)
                    .and_then(|c| c.values.get(row))
                    .cloned()
                    .unwrap_or(Cell::Null);
                slot.push(cell);
            }
        }
    }

    let mut merged = DataTable::new();
    merged.push_column("ticker", ticker);
    for ((name, group), values) in order.into_iter().zip(columns) {
        match group {
            Some(group) => merged.push_grouped_column(group, name, values),
            None => merged.push_column(name, values),
        }
    }
    merged
}

fn cell_to_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Integer(v) => Value::from(*v),
        Cell::Decimal(v) => v.to_f64().map_or(Value::Null, Value::from),
        Cell::Text(v) => Value::from(v.clone()),
    }
}
