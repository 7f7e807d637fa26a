//! Column-ordered tabular result produced by provider adapters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single table cell.
///
/// Upstream payloads mix numbers, text and gaps, so the cell type is
/// deliberately loose. Serializes untagged: `Null` becomes JSON `null`,
/// numbers stay numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Decimal(Decimal),
    Text(String),
}

impl Cell {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render for a CSV field. `Null` is the empty field.
    pub fn to_field(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(v) => v.to_string(),
            Self::Decimal(v) => v.to_string(),
            Self::Text(v) => v.clone(),
        }
    }

    /// Parse a CSV field back into a cell.
    ///
    /// Only canonical numeric renderings become numbers, so text that merely
    /// looks numeric ("007", "1e3") survives a round trip as text.
    pub fn parse_field(field: &str) -> Self {
        if field.is_empty() {
            return Self::Null;
        }
        if let Ok(v) = field.parse::<i64>() {
            if v.to_string() == field {
                return Self::Integer(v);
            }
        }
        if let Ok(v) = field.parse::<Decimal>() {
            if v.to_string() == field {
                return Self::Decimal(v);
            }
        }
        Self::Text(field.to_string())
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<Decimal> for Cell {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A named column with row-aligned values.
///
/// `group` is the optional upper naming level used by hierarchical report
/// layouts (e.g. the statement section a financial ratio belongs to).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            group: None,
            values,
        }
    }

    pub fn grouped(
        group: impl Into<String>,
        name: impl Into<String>,
        values: Vec<Cell>,
    ) -> Self {
        Self {
            name: name.into(),
            group: Some(group.into()),
            values,
        }
    }

    /// Single-level name, joining the group level with `separator` when present.
    pub fn flat_name(&self, separator: &str) -> String {
        match &self.group {
            Some(group) => format!("{group}{separator}{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Ordered sequence of named columns with row-aligned values.
///
/// Produced by exactly one adapter call and consumed by exactly one
/// formatter call; never shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    columns: Vec<Column>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Cell>) {
        self.columns.push(Column::new(name, values));
    }

    pub fn push_grouped_column(
        &mut self,
        group: impl Into<String>,
        name: impl Into<String>,
        values: Vec<Cell>,
    ) {
        self.columns.push(Column::grouped(group, name, values));
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of rows, taken from the longest column.
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Cell at (row, column index), `Null` past a short column's end.
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.columns
            .get(col)
            .and_then(|c| c.values.get(row))
            .cloned()
            .unwrap_or(Cell::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_row_count_from_longest_column() {
        let mut table = DataTable::new();
        table.push_column("a", vec![Cell::from(1), Cell::from(2)]);
        table.push_column("b", vec![Cell::from("x")]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 1), Cell::Null);
    }

    #[test]
    fn test_field_round_trip() {
        let cells = vec![
            Cell::Null,
            Cell::Integer(42),
            Cell::Decimal(dec!(99850.5)),
            Cell::Text("Ngân hàng TMCP Ngoại thương".to_string()),
        ];
        for cell in cells {
            assert_eq!(Cell::parse_field(&cell.to_field()), cell);
        }
    }

    #[test]
    fn test_non_canonical_numbers_stay_text() {
        assert_eq!(Cell::parse_field("007"), Cell::Text("007".to_string()));
        assert_eq!(Cell::parse_field("1e3"), Cell::Text("1e3".to_string()));
    }

    #[test]
    fn test_cell_serializes_untagged() {
        assert_eq!(serde_json::to_string(&Cell::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Cell::Integer(7)).unwrap(), "7");
        assert_eq!(
            serde_json::to_string(&Cell::Text("VCB".to_string())).unwrap(),
            "\"VCB\""
        );
    }

    #[test]
    fn test_flat_name_joins_group() {
        let col = Column::grouped("liquidity", "current_ratio", vec![]);
        assert_eq!(col.flat_name("_"), "liquidity_current_ratio");
        let plain = Column::new("close", vec![]);
        assert_eq!(plain.flat_name("_"), "close");
    }
}
