//! HTTP surface tests against the router with in-memory collaborators.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{
    body_bytes, json_body, sample_template, MemoryTenderRepository, TestApp, SCHEMA_REPLY,
};
use docgen_service::config::CorsPolicy;
use docgen_service::handlers::docgen::SCHEMA_PARSE_FAILED;
use docgen_service::services::docx;
use docgen_service::services::providers::mock::MockTextProvider;
use serde_json::json;
use service_core::middleware::REQUEST_ID_HEADER;

#[tokio::test]
async fn health_reports_ok_when_store_is_reachable() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "docgen-service");
}

#[tokio::test]
async fn readiness_fails_when_store_is_unreachable() {
    let app = TestApp::with(
        MockTextProvider::new(SCHEMA_REPLY),
        MemoryTenderRepository::unreachable(),
        CorsPolicy::Permissive,
    )
    .await;

    assert_eq!(app.get("/ready").await.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.get("/health").await.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn routes_live_under_docgen_prefix() {
    let app = TestApp::spawn().await;

    assert_eq!(app.get("/tenders").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/docgen/tenders").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = TestApp::spawn().await;

    let response = app.get("/docgen/tenders").await;
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn permissive_cors_allows_any_origin() {
    let app = TestApp::spawn().await;

    let response = app
        .send(
            Request::builder()
                .uri("/docgen/tenders")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn allow_list_cors_only_echoes_listed_origins() {
    let app = TestApp::with(
        MockTextProvider::new(SCHEMA_REPLY),
        MemoryTenderRepository::new(Vec::new()),
        CorsPolicy::parse("http://localhost:3000", true).unwrap(),
    )
    .await;

    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/docgen/map-fields")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app.send(preflight("http://localhost:3000")).await;
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );

    let denied = app.send(preflight("http://evil.example")).await;
    assert!(!denied
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn upload_template_returns_id_and_schema() {
    let app = TestApp::spawn().await;

    let response = app.upload("supply_order.docx", &sample_template()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(uuid::Uuid::parse_str(body["templateId"].as_str().unwrap()).is_ok());
    assert_eq!(body["schema"]["name"], "Supply Order");
    assert_eq!(body["schema"]["fields"].as_array().unwrap().len(), 3);

    let prompts = app.provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("SUPPLY ORDER\nTender: __________\nTitle: __________"));
}

#[tokio::test]
async fn upload_rejects_non_docx_files() {
    let app = TestApp::spawn().await;

    let response = app.upload("tenders.pdf", b"%PDF-1.7").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Only .docx files allowed");
    assert!(app.provider.prompts().is_empty());
}

#[tokio::test]
async fn upload_reports_schema_failure() {
    let app = TestApp::with(
        MockTextProvider::failing(),
        MemoryTenderRepository::new(Vec::new()),
        CorsPolicy::Permissive,
    )
    .await;

    let response = app.upload("supply_order.docx", &sample_template()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], SCHEMA_PARSE_FAILED);
}

#[tokio::test]
async fn unparseable_model_reply_is_schema_failure() {
    let app = TestApp::with(
        MockTextProvider::new("Sorry, I cannot help with that."),
        MemoryTenderRepository::new(Vec::new()),
        CorsPolicy::Permissive,
    )
    .await;

    let response = app.upload("supply_order.docx", &sample_template()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], SCHEMA_PARSE_FAILED);
}

#[tokio::test]
async fn generate_document_fills_uploaded_template() {
    let app = TestApp::spawn().await;
    let template_id = app.upload_sample_template().await;

    let response = app
        .post_json(
            "/docgen/generate-document",
            json!({
                "templateId": template_id,
                "mappedData": {"tender_id": "T-001", "title": "Supply of paracetamol"}
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        docx::DOCX_CONTENT_TYPE
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Generated_Document.docx\""
    );

    let bytes = body_bytes(response).await;
    assert_eq!(
        docx::extract_paragraphs(&bytes).unwrap(),
        vec![
            "SUPPLY ORDER",
            "Tender: T-001",
            "Title: Supply of paracetamol",
            "Pack size:",
        ]
    );
    assert_eq!(
        docx::paragraph_bold_flags(&bytes).unwrap(),
        vec![true, false, false, false]
    );
}

#[tokio::test]
async fn generate_document_for_unknown_template_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/docgen/generate-document",
            json!({
                "templateId": uuid::Uuid::new_v4().to_string(),
                "mappedData": {}
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Template not found");
}

#[tokio::test]
async fn map_fields_matches_labels_to_tender_columns() {
    let app = TestApp::spawn().await;
    let template_id = app.upload_sample_template().await;

    let response = app
        .post_json(
            "/docgen/map-fields",
            json!({ "templateId": template_id, "tenderId": "T-001" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["tenderId"], "T-001");
    assert_eq!(
        body["mappedData"],
        json!({
            "tender_id": "T-001",
            "title": "Supply of paracetamol",
            "pack_size": ""
        })
    );
}

#[tokio::test]
async fn map_fields_rejects_out_of_range_threshold() {
    let app = TestApp::spawn().await;
    let template_id = app.upload_sample_template().await;

    let response = app
        .post_json(
            "/docgen/map-fields",
            json!({ "templateId": template_id, "tenderId": "T-001", "threshold": 2.0 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn map_fields_for_unknown_tender_is_not_found() {
    let app = TestApp::spawn().await;
    let template_id = app.upload_sample_template().await;

    let response = app
        .post_json(
            "/docgen/map-fields",
            json!({ "templateId": template_id, "tenderId": "T-999" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_tenders_pages_and_hides_ids() {
    let app = TestApp::spawn().await;

    let response = app.get("/docgen/tenders?limit=2&skip=1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["skip"], 1);
    assert_eq!(body["limit"], 2);
    let tenders = body["tenders"].as_array().unwrap();
    assert_eq!(tenders.len(), 2);
    assert_eq!(tenders[0]["Tender ID"], "T-002");
    assert!(tenders.iter().all(|t| t.get("_id").is_none()));
}

#[tokio::test]
async fn list_tenders_defaults_and_limit_bounds() {
    let app = TestApp::spawn().await;

    let body = json_body(app.get("/docgen/tenders").await).await;
    assert_eq!(body["limit"], 10);
    assert_eq!(body["skip"], 0);

    assert_eq!(
        app.get("/docgen/tenders?limit=0").await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn get_tender_returns_document_without_id() {
    let app = TestApp::spawn().await;

    let response = app.get("/docgen/tenders/T-001").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(
        body,
        json!({
            "Tender ID": "T-001",
            "Tender Title": "Supply of paracetamol",
            "delivery_date": "2024-01-01",
            "amount": 100
        })
    );
}

#[tokio::test]
async fn unknown_tender_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app.get("/docgen/tenders/T-404").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"],
        "Tender with ID 'T-404' not found"
    );
    assert_eq!(
        app.get("/docgen/tenders/T-404/fields").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn tender_fields_describe_types_and_samples() {
    let app = TestApp::spawn().await;

    let body = json_body(app.get("/docgen/tenders/T-003/fields").await).await;

    assert_eq!(body["tenderId"], "T-003");
    assert_eq!(body["totalFields"], 4);
    assert_eq!(body["fields"]["amount"], json!({"type": "long", "sampleValue": "300"}));
    assert_eq!(
        body["fields"]["Tender Title"]["sampleValue"]
            .as_str()
            .unwrap()
            .len(),
        100
    );
}
