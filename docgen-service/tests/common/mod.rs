#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use docgen_service::config::CorsPolicy;
use docgen_service::services::docx::{write_document, Paragraph};
use docgen_service::services::providers::mock::MockTextProvider;
use docgen_service::services::{LocalTemplateStore, TenderRepository};
use docgen_service::{build_router, AppState};
use http_body_util::BodyExt;
use mongodb::bson::{doc, Document};
use service_core::error::AppError;
use std::sync::Arc;
use tempfile::TempDir;

pub const BOUNDARY: &str = "docgen-test-boundary";

pub const SCHEMA_REPLY: &str = r#"```json
{
  "name": "Supply Order",
  "fields": [
    {"id": "tender_id", "label": "Tender ID", "type": "string"},
    {"id": "title", "label": "Tender Title", "type": "string"},
    {"id": "pack_size", "label": "Pack Size", "type": "string"}
  ],
  "templateString": "SUPPLY ORDER\nTender: {tender_id}\nTitle: {title}\nPack size: {pack_size}"
}
```"#;

/// In-memory stand-in for the tenders collection.
pub struct MemoryTenderRepository {
    tenders: Vec<Document>,
    healthy: bool,
}

impl MemoryTenderRepository {
    pub fn new(tenders: Vec<Document>) -> Self {
        Self {
            tenders,
            healthy: true,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            tenders: Vec::new(),
            healthy: false,
        }
    }
}

#[async_trait]
impl TenderRepository for MemoryTenderRepository {
    async fn find_by_tender_id(&self, tender_id: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .tenders
            .iter()
            .find(|t| t.get_str("Tender ID").ok() == Some(tender_id))
            .cloned())
    }

    async fn list(&self, limit: i64, skip: u64) -> Result<(u64, Vec<Document>), AppError> {
        let page = self
            .tenders
            .iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((self.tenders.len() as u64, page))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        if self.healthy {
            Ok(())
        } else {
            Err(AppError::DatabaseError(anyhow::anyhow!(
                "server selection timeout"
            )))
        }
    }
}

pub fn sample_tenders() -> Vec<Document> {
    vec![
        doc! {
            "_id": mongodb::bson::oid::ObjectId::new(),
            "Tender ID": "T-001",
            "Tender Title": "Supply of paracetamol",
            "delivery_date": "2024-01-01",
            "amount": 100_i64,
        },
        doc! {
            "Tender ID": "T-002",
            "Tender Title": "Supply of gloves",
            "delivery_date": "",
            "amount": "",
        },
        doc! {
            "Tender ID": "T-003",
            "Tender Title": "x".repeat(150),
            "delivery_date": "2024-03-15",
            "amount": 300_i64,
        },
    ]
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<MockTextProvider>,
    // Keeps the template directory alive for the test's duration.
    _storage: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::with(
            MockTextProvider::new(SCHEMA_REPLY),
            MemoryTenderRepository::new(sample_tenders()),
            CorsPolicy::Permissive,
        )
        .await
    }

    pub async fn with(
        provider: MockTextProvider,
        tenders: MemoryTenderRepository,
        cors: CorsPolicy,
    ) -> Self {
        let storage = tempfile::tempdir().expect("Failed to create storage dir");
        let templates = LocalTemplateStore::new(storage.path())
            .await
            .expect("Failed to create template store");
        let provider = Arc::new(provider);

        let state = AppState {
            tenders: Arc::new(tenders),
            text_provider: provider.clone(),
            templates: Arc::new(templates),
        };

        TestApp {
            router: build_router(state, &cors),
            provider,
            _storage: storage,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router should not fail")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn upload(&self, file_name: &str, bytes: &[u8]) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/docgen/upload-template")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(file_name, bytes)))
                .unwrap(),
        )
        .await
    }

    /// Upload the sample template and return its id.
    pub async fn upload_sample_template(&self) -> String {
        let response = self.upload("supply_order.docx", &sample_template()).await;
        assert_eq!(response.status(), 200);
        let body = json_body(response).await;
        body["templateId"].as_str().unwrap().to_string()
    }
}

pub fn multipart_body(file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn sample_template() -> Vec<u8> {
    write_document(&[
        Paragraph {
            text: "SUPPLY ORDER".to_string(),
            bold: true,
        },
        Paragraph {
            text: "Tender: __________".to_string(),
            bold: false,
        },
        Paragraph {
            text: "Title: __________".to_string(),
            bold: false,
        },
    ])
    .expect("Failed to build sample template")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes()
        .to_vec()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}
