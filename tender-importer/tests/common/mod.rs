#![allow(dead_code)]

use async_trait::async_trait;
use mongodb::bson::Document;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tender_importer::store::{DocumentSink, InsertFailure, InsertOutcome, UpsertOutcome};
use tender_importer::ImportError;

/// In-memory stand-in for the tenders collection.
#[derive(Default)]
pub struct MemorySink {
    pub documents: Mutex<Vec<Document>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub unreachable: bool,
    /// Batch positions the sink refuses to insert.
    pub reject: Vec<usize>,
}

impl MemorySink {
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: Mutex::new(documents),
            ..Default::default()
        }
    }

    pub fn unreachable(documents: Vec<Document>) -> Self {
        Self {
            documents: Mutex::new(documents),
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn rejecting(reject: Vec<usize>) -> Self {
        Self {
            reject,
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> Vec<Document> {
        self.documents.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DocumentSink for MemorySink {
    async fn ping(&self) -> Result<(), ImportError> {
        self.record("ping");
        if self.unreachable {
            return Err(ImportError::Connection(anyhow::anyhow!(
                "server selection timeout"
            )));
        }
        Ok(())
    }

    async fn clear(&self) -> Result<u64, ImportError> {
        self.record("clear");
        let mut documents = self.documents.lock().unwrap();
        let deleted = documents.len() as u64;
        documents.clear();
        Ok(deleted)
    }

    async fn insert_many(&self, batch: Vec<Document>) -> Result<InsertOutcome, ImportError> {
        self.record("insert_many");
        let mut documents = self.documents.lock().unwrap();
        let mut outcome = InsertOutcome::default();
        for (index, document) in batch.into_iter().enumerate() {
            if self.reject.contains(&index) {
                outcome.failures.push(InsertFailure {
                    index,
                    message: "E11000 duplicate key error".to_string(),
                });
            } else {
                documents.push(document);
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }

    async fn upsert(&self, key: &str, document: Document) -> Result<UpsertOutcome, ImportError> {
        self.record("upsert");
        let mut documents = self.documents.lock().unwrap();
        let existing = documents
            .iter_mut()
            .find(|existing| existing.get(key) == document.get(key));
        match existing {
            Some(existing) => {
                *existing = document;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                documents.push(document);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }
}

/// Write the delivery_date / amount workbook used across the import tests.
///
/// Rows: (2024-01-01, 100), (blank, "NaN"), (2024-03-15, 300).
pub fn write_tender_workbook(dir: &Path) -> PathBuf {
    let path = dir.join("tenders.xlsx");
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Tender ID").unwrap();
    sheet.write_string(0, 1, "delivery_date").unwrap();
    sheet.write_string(0, 2, "amount").unwrap();

    sheet.write_string(1, 0, "T-001").unwrap();
    let first = ExcelDateTime::from_ymd(2024, 1, 1).unwrap();
    sheet
        .write_datetime_with_format(1, 1, &first, &date_format)
        .unwrap();
    sheet.write_number(1, 2, 100).unwrap();

    sheet.write_string(2, 0, "T-002").unwrap();
    sheet.write_string(2, 2, "NaN").unwrap();

    sheet.write_string(3, 0, "T-003").unwrap();
    let third = ExcelDateTime::from_ymd(2024, 3, 15).unwrap();
    sheet
        .write_datetime_with_format(3, 1, &third, &date_format)
        .unwrap();
    sheet.write_number(3, 2, 300).unwrap();

    workbook.save(&path).unwrap();
    path
}
