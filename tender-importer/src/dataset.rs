//! In-memory tabular view of a spreadsheet.
//!
//! The first row of the sheet is the header. Every data row is padded or cut to
//! the header width so each cell lines up with a column name.

use crate::error::ImportError;
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::path::PathBuf;

/// A single spreadsheet cell after loading.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Missing cells: blanks, error cells (loaded as blanks) and NaN floats.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => whole_number(*f)
                .map(CellValue::Int)
                .unwrap_or(CellValue::Float(*f)),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
                Some(ndt) => CellValue::DateTime(ndt),
                None => CellValue::Float(dt.as_f64()),
            },
            Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
            Data::DateTimeIso(s) => parse_iso_datetime(s)
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Text(s.clone())),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

/// Spreadsheets store every number as a double; whole values come back as integers.
fn whole_number(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Named columns and ordered rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Build a dataset from already-named columns. Rows are padded with
    /// [`CellValue::Empty`] or truncated to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a dataset from a worksheet range, using its first row as header.
    /// Rows with no non-empty cell are dropped.
    pub fn from_range(range: &Range<Data>) -> Self {
        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Self::new(Vec::new(), Vec::new());
        };

        let columns = column_names(header);
        let rows = rows
            .map(|row| row.iter().map(CellValue::from).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|cell| !cell.is_missing()))
            .collect();

        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate over the cells of one column.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Mutable access to the cells of one column.
    pub fn column_mut(&mut self, index: usize) -> impl Iterator<Item = &mut CellValue> {
        self.rows.iter_mut().map(move |row| &mut row[index])
    }

    /// Mutable access to every cell.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut CellValue> {
        self.rows.iter_mut().flat_map(|row| row.iter_mut())
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }
}

/// Header names: blank headers become `Unnamed: <index>`, repeats get `.1`, `.2`, ...
fn column_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(header.len());

    for (index, cell) in header.iter().enumerate() {
        let base = match CellValue::from(cell) {
            CellValue::Empty => format!("Unnamed: {}", index),
            CellValue::Text(s) if s.trim().is_empty() => format!("Unnamed: {}", index),
            CellValue::Text(s) => s,
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(dt) => dt.to_string(),
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }

    names
}

/// Where the spreadsheet lives and which sheet to read.
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    pub path: PathBuf,
    /// Sheet name; the first sheet when unset.
    pub sheet: Option<String>,
}

/// Load a whole worksheet into memory.
///
/// The format (xlsx, xlsm, xlsb, xls, ods) is chosen from the file extension.
pub fn load_spreadsheet(source: &SpreadsheetSource) -> Result<Dataset, ImportError> {
    let path = source.path.as_path();
    let spreadsheet_error = |source: calamine::Error| ImportError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    tracing::info!(path = %path.display(), sheet = ?source.sheet, "Loading spreadsheet");

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;

    let range = match &source.sheet {
        Some(name) => workbook.worksheet_range(name).map_err(spreadsheet_error)?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::NoWorksheet(path.to_path_buf()))?
            .map_err(spreadsheet_error)?,
    };

    let dataset = Dataset::from_range(&range);
    tracing::info!(
        columns = dataset.columns().len(),
        rows = dataset.row_count(),
        "Spreadsheet loaded"
    );
    Ok(dataset)
}
