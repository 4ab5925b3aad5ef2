//! Destination collection access.

use crate::error::ImportError;
use async_trait::async_trait;
use mongodb::{
    bson::{doc, Document},
    error::ErrorKind,
    options::{InsertManyOptions, ReplaceOptions},
    Client as MongoClient, Collection,
};

/// One document the store rejected during a bulk insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertFailure {
    /// Position of the document in the submitted batch.
    pub index: usize,
    pub message: String,
}

/// Result of a bulk insert that reached the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOutcome {
    pub inserted: usize,
    pub failures: Vec<InsertFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Operations the importer needs from a document store.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Verify the store is reachable and the credentials are accepted.
    async fn ping(&self) -> Result<(), ImportError>;

    /// Delete every document in the collection. Returns the number deleted.
    async fn clear(&self) -> Result<u64, ImportError>;

    /// Insert all documents in one unordered batch.
    ///
    /// Rejected documents are reported in the outcome; documents accepted before
    /// or after them stay inserted.
    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertOutcome, ImportError>;

    /// Replace the document whose `key` field equals the one in `document`, or
    /// insert it when none matches.
    async fn upsert(&self, key: &str, document: Document) -> Result<UpsertOutcome, ImportError>;
}

/// MongoDB-backed sink for one collection.
#[derive(Clone)]
pub struct MongoSink {
    client: MongoClient,
    collection: Collection<Document>,
}

impl MongoSink {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, ImportError> {
        tracing::info!(database = %database, collection = %collection, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            ImportError::Connection(anyhow::Error::new(e))
        })?;
        let collection = client.database(database).collection::<Document>(collection);
        Ok(Self { client, collection })
    }
}

#[async_trait]
impl DocumentSink for MongoSink {
    async fn ping(&self) -> Result<(), ImportError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB ping failed: {}", e);
                ImportError::Connection(anyhow::Error::new(e))
            })?;
        tracing::info!("Successfully connected to MongoDB");
        Ok(())
    }

    async fn clear(&self) -> Result<u64, ImportError> {
        let result = self.collection.delete_many(doc! {}, None).await?;
        Ok(result.deleted_count)
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertOutcome, ImportError> {
        let attempted = documents.len();
        let options = InsertManyOptions::builder().ordered(false).build();

        let err = match self.collection.insert_many(documents, options).await {
            Ok(result) => {
                return Ok(InsertOutcome {
                    inserted: result.inserted_ids.len(),
                    failures: Vec::new(),
                });
            }
            Err(err) => err,
        };

        if let ErrorKind::BulkWrite(failure) = err.kind.as_ref() {
            let failures: Vec<InsertFailure> = failure
                .write_errors
                .iter()
                .flatten()
                .map(|write_error| InsertFailure {
                    index: write_error.index,
                    message: write_error.message.clone(),
                })
                .collect();

            if !failures.is_empty() {
                return Ok(InsertOutcome {
                    inserted: attempted.saturating_sub(failures.len()),
                    failures,
                });
            }
        }

        Err(ImportError::from(err))
    }

    async fn upsert(&self, key: &str, document: Document) -> Result<UpsertOutcome, ImportError> {
        let value = document.get(key).cloned().ok_or_else(|| {
            ImportError::Config(format!("document has no '{}' field to upsert on", key))
        })?;

        let mut filter = Document::new();
        filter.insert(key, value);
        let options = ReplaceOptions::builder().upsert(true).build();
        let result = self.collection.replace_one(filter, document, options).await?;

        Ok(if result.upserted_id.is_some() {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }
}
