//! The import run: connect, load, normalize, write, report.

use crate::dataset::{load_spreadsheet, SpreadsheetSource};
use crate::error::ImportError;
use crate::normalize::normalize;
use crate::store::{DocumentSink, InsertOutcome, UpsertOutcome};
use mongodb::bson::{Bson, Document};
use std::fmt;

/// How new rows meet the documents already in the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportMode {
    /// Insert every row; existing documents are kept, so re-runs duplicate rows.
    Append,
    /// Delete every existing document, then insert every row.
    Replace,
    /// Replace documents matching on the natural key column, insert the rest.
    Upsert { key: String },
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Append => write!(f, "append"),
            ImportMode::Replace => write!(f, "replace"),
            ImportMode::Upsert { key } => write!(f, "upsert on '{}'", key),
        }
    }
}

/// What an import run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub mode: ImportMode,
    pub rows: usize,
    /// Documents deleted before inserting; only set in replace mode.
    pub cleared: Option<u64>,
    pub inserted: usize,
    pub updated: usize,
    /// Upsert rows whose key cell was empty.
    pub skipped: usize,
    pub dry_run: bool,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            return write!(
                f,
                "Dry run: {} records ready for import ({}), nothing written.",
                self.rows, self.mode
            );
        }
        match self.mode {
            ImportMode::Upsert { .. } => write!(
                f,
                "Upserted records into MongoDB: {} inserted, {} updated, {} skipped.",
                self.inserted, self.updated, self.skipped
            ),
            _ => write!(f, "Inserted {} records into MongoDB.", self.inserted),
        }
    }
}

/// Load the spreadsheet and turn each row into a document.
pub fn prepare_documents(source: &SpreadsheetSource) -> Result<Vec<Document>, ImportError> {
    let dataset = load_spreadsheet(source)?;
    Ok(normalize(dataset)
        .into_iter()
        .map(|record| record.into_document())
        .collect())
}

/// Load and normalize without touching any store.
pub fn dry_run(source: &SpreadsheetSource, mode: &ImportMode) -> Result<ImportReport, ImportError> {
    let documents = prepare_documents(source)?;
    if let ImportMode::Upsert { key } = mode {
        ensure_key_column(&documents, key)?;
    }
    Ok(ImportReport {
        mode: mode.clone(),
        rows: documents.len(),
        cleared: None,
        inserted: 0,
        updated: 0,
        skipped: 0,
        dry_run: true,
    })
}

/// Run a full import into `sink`.
///
/// The store is checked before the spreadsheet is read, so an unreachable store
/// aborts the run before anything is deleted or written.
pub async fn run_import<S>(
    sink: &S,
    source: &SpreadsheetSource,
    mode: &ImportMode,
) -> Result<ImportReport, ImportError>
where
    S: DocumentSink + ?Sized,
{
    sink.ping().await?;
    let documents = prepare_documents(source)?;
    write_documents(sink, documents, mode).await
}

/// Write already-prepared documents according to `mode`.
pub async fn write_documents<S>(
    sink: &S,
    documents: Vec<Document>,
    mode: &ImportMode,
) -> Result<ImportReport, ImportError>
where
    S: DocumentSink + ?Sized,
{
    let mut report = ImportReport {
        mode: mode.clone(),
        rows: documents.len(),
        cleared: None,
        inserted: 0,
        updated: 0,
        skipped: 0,
        dry_run: false,
    };

    match mode {
        ImportMode::Append => {
            report.inserted = insert_all(sink, documents).await?;
        }
        ImportMode::Replace => {
            let deleted = sink.clear().await?;
            tracing::warn!(deleted, "Cleared existing documents before import");
            report.cleared = Some(deleted);
            report.inserted = insert_all(sink, documents).await?;
        }
        ImportMode::Upsert { key } => {
            ensure_key_column(&documents, key)?;
            for document in documents {
                if !has_key_value(&document, key) {
                    report.skipped += 1;
                    continue;
                }
                match sink.upsert(key, document).await? {
                    UpsertOutcome::Inserted => report.inserted += 1,
                    UpsertOutcome::Updated => report.updated += 1,
                }
            }
            if report.skipped > 0 {
                tracing::warn!(skipped = report.skipped, key = %key, "Rows without a key value were skipped");
            }
        }
    }

    tracing::info!(
        mode = %report.mode,
        rows = report.rows,
        inserted = report.inserted,
        updated = report.updated,
        "Import finished"
    );
    Ok(report)
}

/// Reject an upsert key that names no column of the sheet, so a misspelt key
/// fails instead of skipping every row.
fn ensure_key_column(documents: &[Document], key: &str) -> Result<(), ImportError> {
    if documents.is_empty() || documents.iter().any(|document| document.contains_key(key)) {
        return Ok(());
    }
    Err(ImportError::Config(format!(
        "upsert key column '{}' is not in the spreadsheet",
        key
    )))
}

fn has_key_value(document: &Document, key: &str) -> bool {
    match document.get(key) {
        Some(Bson::String(s)) => !s.is_empty(),
        Some(_) => true,
        None => false,
    }
}

/// Bulk insert, turning rejected documents into an error that says whether
/// anything made it in.
async fn insert_all<S>(sink: &S, documents: Vec<Document>) -> Result<usize, ImportError>
where
    S: DocumentSink + ?Sized,
{
    let attempted = documents.len();
    if attempted == 0 {
        tracing::info!("Spreadsheet has no data rows; nothing to insert");
        return Ok(0);
    }

    let InsertOutcome { inserted, failures } = sink.insert_many(documents).await?;

    let Some(first) = failures.first() else {
        return Ok(inserted);
    };

    let first_error = format!("row {}: {}", first.index, first.message);
    tracing::error!(
        attempted,
        inserted,
        failed = failures.len(),
        first_error = %first_error,
        "Bulk insert rejected documents"
    );

    if inserted == 0 {
        Err(ImportError::InsertFailed {
            attempted,
            first_error,
        })
    } else {
        Err(ImportError::PartialInsert {
            attempted,
            inserted,
            failed: failures.len(),
            first_error,
        })
    }
}
