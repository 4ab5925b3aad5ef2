use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read spreadsheet {path}: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Spreadsheet {0} contains no worksheets")]
    NoWorksheet(PathBuf),

    #[error("Failed to connect to MongoDB: {0:#}")]
    Connection(anyhow::Error),

    #[error("MongoDB operation failed: {0:#}")]
    Store(anyhow::Error),

    #[error("Insert failed: none of {attempted} documents were inserted (first error: {first_error})")]
    InsertFailed {
        attempted: usize,
        first_error: String,
    },

    #[error(
        "Partial insert: {inserted} of {attempted} documents inserted, {failed} failed (first error: {first_error})"
    )]
    PartialInsert {
        attempted: usize,
        inserted: usize,
        failed: usize,
        first_error: String,
    },
}

impl ImportError {
    /// Process exit code for this failure.
    ///
    /// A partial insert leaves the collection holding some of the new rows, so it
    /// gets its own code.
    pub fn exit_code(&self) -> u8 {
        match self {
            ImportError::PartialInsert { .. } => 2,
            _ => 1,
        }
    }
}

impl From<mongodb::error::Error> for ImportError {
    fn from(err: mongodb::error::Error) -> Self {
        ImportError::Store(anyhow::Error::new(err))
    }
}
