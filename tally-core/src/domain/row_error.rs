//! Row-level validation failures

use std::fmt;

use serde::Serialize;

use super::field::CanonicalField;
use super::upload::RawRow;

/// Why a single row was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    MissingRequiredField,
    TypeCoercionFailure,
    NegativeValue,
    ColumnCountMismatch,
}

impl RowErrorKind {
    fn describe(&self) -> &'static str {
        match self {
            RowErrorKind::MissingRequiredField => "required value is blank",
            RowErrorKind::TypeCoercionFailure => "value could not be read",
            RowErrorKind::NegativeValue => "value must not be negative",
            RowErrorKind::ColumnCountMismatch => "row has more cells than the header",
        }
    }
}

/// A rejected row. Always reported, never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: u64,
    /// `None` for errors about the row shape rather than one cell
    pub field: Option<CanonicalField>,
    pub kind: RowErrorKind,
    pub raw_value: String,
    /// Every cell of the offending row, as read
    pub cells: Vec<String>,
}

impl RowError {
    pub fn for_field(
        row: &RawRow,
        field: CanonicalField,
        kind: RowErrorKind,
        raw_value: impl Into<String>,
    ) -> Self {
        Self {
            line: row.line,
            field: Some(field),
            kind,
            raw_value: raw_value.into(),
            cells: row.cells.clone(),
        }
    }

    pub fn column_count(row: &RawRow, expected: usize) -> Self {
        Self {
            line: row.line,
            field: None,
            kind: RowErrorKind::ColumnCountMismatch,
            raw_value: format!("{} cells, header has {}", row.cells.len(), expected),
            cells: row.cells.clone(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(
                f,
                "line {}: {}: {} ('{}')",
                self.line,
                field,
                self.kind.describe(),
                self.raw_value
            ),
            None => write!(f, "line {}: {} ({})", self.line, self.kind.describe(), self.raw_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_field_and_line() {
        let row = RawRow::new(7, vec!["x".into(), "-1".into()]);
        let err = RowError::for_field(&row, CanonicalField::Quantity, RowErrorKind::NegativeValue, "-1");
        assert_eq!(err.to_string(), "line 7: quantity: value must not be negative ('-1')");
        assert_eq!(err.cells.len(), 2);
    }

    #[test]
    fn test_column_count_has_no_field() {
        let row = RawRow::new(3, vec!["a".into(), "b".into(), "c".into()]);
        let err = RowError::column_count(&row, 2);
        assert_eq!(err.field, None);
        assert_eq!(err.kind, RowErrorKind::ColumnCountMismatch);
        assert_eq!(err.raw_value, "3 cells, header has 2");
    }
}
