//! Command-line options and their validation.

use crate::dataset::SpreadsheetSource;
use crate::error::ImportError;
use crate::pipeline::ImportMode;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "tender-importer",
    version,
    about = "Load a tender spreadsheet into the MongoDB tenders collection"
)]
pub struct Cli {
    /// Spreadsheet to import (xlsx, xlsm, xlsb, xls or ods).
    #[arg(long, env = "TENDER_FILE")]
    pub file: PathBuf,

    /// Worksheet name; the first sheet when omitted.
    #[arg(long)]
    pub sheet: Option<String>,

    #[arg(long, env = "MONGODB_URI", hide_env_values = true)]
    pub mongodb_uri: Option<String>,

    #[arg(long, env = "MONGODB_DATABASE", default_value = "tender_system")]
    pub database: String,

    #[arg(long, env = "TENDERS_COLLECTION", default_value = "tenders")]
    pub collection: String,

    /// Delete every existing document in the collection before inserting.
    #[arg(long, conflicts_with = "upsert_key")]
    pub replace: bool,

    /// Replace documents whose COLUMN value matches instead of inserting duplicates.
    #[arg(long, value_name = "COLUMN")]
    pub upsert_key: Option<String>,

    /// Load and normalize the spreadsheet without connecting to MongoDB.
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Connection parameters for the destination collection.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

/// Validated import settings.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub source: SpreadsheetSource,
    /// Absent only for dry runs.
    pub store: Option<StoreConfig>,
    pub mode: ImportMode,
    pub dry_run: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<ImportConfig, ImportError> {
        if self.file.as_os_str().is_empty() {
            return Err(ImportError::Config("--file must not be empty".to_string()));
        }

        let mode = match (self.replace, self.upsert_key) {
            (true, Some(_)) => {
                return Err(ImportError::Config(
                    "--replace and --upsert-key cannot be combined".to_string(),
                ))
            }
            (true, None) => ImportMode::Replace,
            (false, Some(key)) if key.trim().is_empty() => {
                return Err(ImportError::Config(
                    "--upsert-key must name a column".to_string(),
                ))
            }
            (false, Some(key)) => ImportMode::Upsert { key },
            (false, None) => ImportMode::Append,
        };

        let store = if self.dry_run {
            None
        } else {
            Some(store_config(
                self.mongodb_uri,
                self.database,
                self.collection,
            )?)
        };

        Ok(ImportConfig {
            source: SpreadsheetSource {
                path: self.file,
                sheet: self.sheet,
            },
            store,
            mode,
            dry_run: self.dry_run,
        })
    }
}

/// Exit code for a command line clap could not turn into a `Cli`.
///
/// `--help` and `--version` succeed. Every usage error exits with 1, the same
/// as any other failure, since 2 is reserved for a partial insert.
pub fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn store_config(
    uri: Option<String>,
    database: String,
    collection: String,
) -> Result<StoreConfig, ImportError> {
    let uri = uri.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
        ImportError::Config("MONGODB_URI (or --mongodb-uri) is required".to_string())
    })?;

    if !(uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://")) {
        return Err(ImportError::Config(
            "MongoDB URI must start with mongodb:// or mongodb+srv://".to_string(),
        ));
    }
    if database.trim().is_empty() {
        return Err(ImportError::Config(
            "database name must not be empty".to_string(),
        ));
    }
    if collection.trim().is_empty() {
        return Err(ImportError::Config(
            "collection name must not be empty".to_string(),
        ));
    }

    Ok(StoreConfig {
        uri,
        database,
        collection,
    })
}
