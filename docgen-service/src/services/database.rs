//! Read access to the imported tenders collection.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::FindOptions,
    Client as MongoClient, Collection,
};
use serde_json::{Map, Value};
use service_core::error::AppError;

/// Column holding the natural tender identifier.
pub const TENDER_ID_FIELD: &str = "Tender ID";

#[async_trait]
pub trait TenderRepository: Send + Sync {
    async fn find_by_tender_id(&self, tender_id: &str) -> Result<Option<Document>, AppError>;

    /// Total document count and one page of documents.
    async fn list(&self, limit: i64, skip: u64) -> Result<(u64, Vec<Document>), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MongoTenderRepository {
    client: MongoClient,
    tenders: Collection<Document>,
}

impl MongoTenderRepository {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, collection = %collection, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let tenders = client.database(database).collection::<Document>(collection);
        Ok(Self { client, tenders })
    }
}

#[async_trait]
impl TenderRepository for MongoTenderRepository {
    async fn find_by_tender_id(&self, tender_id: &str) -> Result<Option<Document>, AppError> {
        let tender = self
            .tenders
            .find_one(tender_id_filter(tender_id), None)
            .await
            .map_err(|e| {
                tracing::error!(tender_id = %tender_id, "Failed to fetch tender: {}", e);
                AppError::from(e)
            })?;
        Ok(tender)
    }

    async fn list(&self, limit: i64, skip: u64) -> Result<(u64, Vec<Document>), AppError> {
        let total = self.tenders.count_documents(doc! {}, None).await?;

        let find_options = FindOptions::builder().skip(skip).limit(limit).build();
        let mut cursor = self.tenders.find(doc! {}, find_options).await?;

        let mut tenders = Vec::new();
        while let Some(tender) = cursor.try_next().await? {
            tenders.push(tender);
        }

        Ok((total, tenders))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }
}

/// Numeric ids are imported as numbers, so a numeric path id matches either form.
pub fn tender_id_filter(tender_id: &str) -> Document {
    let by_text = match_tender_id(tender_id);
    match tender_id.parse::<i64>() {
        Ok(numeric) => doc! { "$or": [by_text, match_tender_id(numeric)] },
        Err(_) => by_text,
    }
}

fn match_tender_id(value: impl Into<Bson>) -> Document {
    let mut filter = Document::new();
    filter.insert(TENDER_ID_FIELD, value);
    filter
}

/// JSON view of a stored tender without the `_id` key.
pub fn tender_to_json(tender: Document) -> Map<String, Value> {
    tender
        .into_iter()
        .filter(|(key, _)| key != "_id")
        .map(|(key, value)| (key, value.into_relaxed_extjson()))
        .collect()
}

/// MongoDB type alias of a stored value.
pub fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::String(_) => "string",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Double(_) => "double",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::DateTime(_) => "date",
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::ObjectId(_) => "objectId",
        _ => "other",
    }
}
