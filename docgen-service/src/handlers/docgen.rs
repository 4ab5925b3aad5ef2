use crate::dtos::{
    GenerateDocumentRequest, MapFieldsRequest, MapFieldsResponse, TemplateUploadResponse,
};
use crate::services::database::tender_to_json;
use crate::services::docx::DOCX_CONTENT_TYPE;
use crate::services::field_mapper::{self, DEFAULT_THRESHOLD};
use crate::services::{document_generator, template_parser};
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde_json::json;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

pub const SCHEMA_PARSE_FAILED: &str = "Failed to parse schema from template.";

const GENERATED_FILE_NAME: &str = "Generated_Document.docx";

pub async fn upload_template(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    if !file_name.to_lowercase().ends_with(".docx") {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Only .docx files allowed"
        )));
    }

    let template_id = Uuid::new_v4().to_string();
    tracing::info!(
        template_id = %template_id,
        file_name = %file_name,
        size = data.len(),
        "Received template upload"
    );

    let schema = match template_parser::extract_schema(state.text_provider.as_ref(), &data).await {
        Ok(schema) => schema,
        Err(e) => {
            tracing::error!(template_id = %template_id, error = %e, "Schema extraction failed");
            counter!("docgen_schema_failures_total").increment(1);
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": SCHEMA_PARSE_FAILED })),
            )
                .into_response());
        }
    };

    state
        .templates
        .save(&template_id, data.to_vec(), &schema)
        .await?;
    counter!("docgen_templates_uploaded_total").increment(1);

    Ok(Json(TemplateUploadResponse {
        template_id,
        schema,
    })
    .into_response())
}

pub async fn generate_document(
    State(state): State<AppState>,
    Json(request): Json<GenerateDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let schema = state
        .templates
        .load_schema(&request.template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;

    let bytes = document_generator::generate_document(&schema.template_string, &request.mapped_data)
        .map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Document generation failed: {}", e))
        })?;

    counter!("docgen_documents_generated_total").increment(1);
    tracing::info!(
        template_id = %request.template_id,
        size = bytes.len(),
        "Generated document"
    );

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", GENERATED_FILE_NAME),
            ),
        ],
        bytes,
    ))
}

pub async fn map_fields(
    State(state): State<AppState>,
    Json(request): Json<MapFieldsRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let schema = state
        .templates
        .load_schema(&request.template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;

    let tender = state
        .tenders
        .find_by_tender_id(&request.tender_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "Tender with ID '{}' not found",
                request.tender_id
            ))
        })?;

    let threshold = request.threshold.unwrap_or(DEFAULT_THRESHOLD);
    let mapped_data = field_mapper::map_fields(&schema.fields, &tender_to_json(tender), threshold);

    Ok(Json(MapFieldsResponse {
        template_id: request.template_id,
        tender_id: request.tender_id,
        mapped_data,
    }))
}
