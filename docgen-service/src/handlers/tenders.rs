use crate::dtos::{FieldInfo, TenderFieldsResponse, TenderListParams, TenderListResponse};
use crate::services::database::{bson_type_name, tender_to_json};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use mongodb::bson::{Bson, Document};
use service_core::error::AppError;
use std::collections::BTreeMap;
use validator::Validate;

const SAMPLE_VALUE_MAX_CHARS: usize = 100;

pub async fn list_tenders(
    State(state): State<AppState>,
    Query(params): Query<TenderListParams>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;

    let (total, tenders) = state.tenders.list(params.limit, params.skip).await?;

    Ok(Json(TenderListResponse {
        total,
        skip: params.skip,
        limit: params.limit,
        tenders: tenders.into_iter().map(tender_to_json).collect(),
    }))
}

pub async fn get_tender(
    State(state): State<AppState>,
    Path(tender_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tender = find_tender(&state, &tender_id).await?;
    Ok(Json(tender_to_json(tender)))
}

pub async fn get_tender_fields(
    State(state): State<AppState>,
    Path(tender_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tender = find_tender(&state, &tender_id).await?;

    let fields: BTreeMap<String, FieldInfo> = tender
        .into_iter()
        .filter(|(key, _)| key != "_id")
        .map(|(key, value)| {
            let info = FieldInfo {
                field_type: bson_type_name(&value).to_string(),
                sample_value: sample_value(value),
            };
            (key, info)
        })
        .collect();

    Ok(Json(TenderFieldsResponse {
        tender_id,
        total_fields: fields.len(),
        fields,
    }))
}

async fn find_tender(state: &AppState, tender_id: &str) -> Result<Document, AppError> {
    state
        .tenders
        .find_by_tender_id(tender_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Tender with ID '{}' not found", tender_id))
        })
}

fn sample_value(value: Bson) -> Option<String> {
    let text = match value {
        Bson::Null => return None,
        Bson::String(s) => s,
        other => other.into_relaxed_extjson().to_string(),
    };
    Some(text.chars().take(SAMPLE_VALUE_MAX_CHARS).collect())
}
