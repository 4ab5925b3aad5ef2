//! Spreadsheet to MongoDB importer for tender reports.
//!
//! The pipeline is strictly sequential: verify the store connection, load the
//! spreadsheet, normalize its values, then write one document per row. Clearing
//! the collection first is an explicit [`pipeline::ImportMode::Replace`] choice.

pub mod cli;
pub mod dataset;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod store;

pub use error::ImportError;
pub use pipeline::{ImportMode, ImportReport, run_import};
