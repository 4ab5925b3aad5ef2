//! Value normalization and row-to-document conversion.
//!
//! The passes run in a fixed order: date columns are stringified first (a
//! missing date becomes `"NaT"`), then the literal sentinels are blanked, then
//! whatever is still missing is blanked. Swapping the first two passes would let
//! missing dates through as `"NaT"`.

use crate::dataset::{CellValue, Dataset};
use chrono::Timelike;
use mongodb::bson::{Bson, Document};

/// Literal markers that count as "no value". Matching is exact and case-sensitive.
pub const MISSING_MARKERS: [&str; 3] = ["NaT", "NaN", "nan"];

/// Marker written for a missing cell in a date column.
const NOT_A_TIME: &str = "NaT";

/// Value of one field in a stored document.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl FieldValue {
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }
}

impl From<FieldValue> for Bson {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => Bson::String(s),
            FieldValue::Int(i) => Bson::Int64(i),
            FieldValue::Float(f) => Bson::Double(f),
        }
    }
}

/// One spreadsheet row with column order preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl NormalizedRecord {
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn into_document(self) -> Document {
        let mut document = Document::new();
        for (name, value) in self.fields {
            document.insert(name, Bson::from(value));
        }
        document
    }
}

/// A column is date-typed when it has at least one date and every non-missing
/// cell is a date.
fn is_date_column(dataset: &Dataset, index: usize) -> bool {
    let mut saw_date = false;
    for cell in dataset.column(index) {
        match cell {
            CellValue::DateTime(_) => saw_date = true,
            cell if cell.is_missing() => {}
            _ => return false,
        }
    }
    saw_date
}

/// Replace every value of each date column with its string form.
///
/// A column whose values all fall on midnight renders as `YYYY-MM-DD`, otherwise
/// as `YYYY-MM-DD HH:MM:SS`. Missing cells become `"NaT"`.
pub fn stringify_date_columns(dataset: &mut Dataset) {
    let view: &Dataset = dataset;
    let date_columns: Vec<usize> = (0..view.columns().len())
        .filter(|&index| is_date_column(view, index))
        .collect();

    for index in date_columns {
        let date_only = dataset.column(index).all(|cell| match cell {
            CellValue::DateTime(dt) => {
                dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0
            }
            _ => true,
        });
        let format = if date_only {
            "%Y-%m-%d"
        } else {
            "%Y-%m-%d %H:%M:%S"
        };

        tracing::debug!(column = %dataset.columns()[index], "Stringifying date column");

        for cell in dataset.column_mut(index) {
            *cell = match &*cell {
                CellValue::DateTime(dt) => CellValue::Text(dt.format(format).to_string()),
                _ => CellValue::Text(NOT_A_TIME.to_string()),
            };
        }
    }
}

/// Blank every text value exactly equal to one of [`MISSING_MARKERS`].
pub fn blank_missing_markers(dataset: &mut Dataset) {
    for cell in dataset.cells_mut() {
        if let CellValue::Text(s) = cell {
            if MISSING_MARKERS.contains(&s.as_str()) {
                s.clear();
            }
        }
    }
}

/// Blank every remaining missing value.
pub fn fill_missing(dataset: &mut Dataset) {
    for cell in dataset.cells_mut() {
        if cell.is_missing() {
            *cell = CellValue::Text(String::new());
        }
    }
}

/// Run all normalization passes in order and convert rows to records.
pub fn normalize(mut dataset: Dataset) -> Vec<NormalizedRecord> {
    stringify_date_columns(&mut dataset);
    blank_missing_markers(&mut dataset);
    fill_missing(&mut dataset);
    into_records(dataset)
}

/// One record per row, column name to value.
///
/// Booleans are stored as `"true"`/`"false"` so every field is text or number.
pub fn into_records(dataset: Dataset) -> Vec<NormalizedRecord> {
    let (columns, rows) = dataset.into_parts();
    rows.into_iter()
        .map(|row| NormalizedRecord {
            fields: columns
                .iter()
                .cloned()
                .zip(row.into_iter().map(field_value))
                .collect(),
        })
        .collect()
}

fn field_value(cell: CellValue) -> FieldValue {
    match cell {
        CellValue::Text(s) => FieldValue::Text(s),
        CellValue::Int(i) => FieldValue::Int(i),
        CellValue::Float(f) if f.is_nan() => FieldValue::empty(),
        CellValue::Float(f) => FieldValue::Float(f),
        CellValue::Bool(b) => FieldValue::Text(b.to_string()),
        CellValue::DateTime(dt) => FieldValue::Text(dt.to_string()),
        CellValue::Empty => FieldValue::empty(),
    }
}
