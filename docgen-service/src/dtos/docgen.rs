use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Schema extracted from an uploaded template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSchema {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<TemplateField>,
    /// Template body with `{field_id}` placeholders.
    #[serde(default)]
    pub template_string: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateField {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generative: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUploadResponse {
    pub template_id: String,
    pub schema: TemplateSchema,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDocumentRequest {
    #[validate(length(min = 1))]
    pub template_id: String,
    #[serde(default)]
    pub mapped_data: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MapFieldsRequest {
    #[validate(length(min = 1))]
    pub template_id: String,
    #[validate(length(min = 1))]
    pub tender_id: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFieldsResponse {
    pub template_id: String,
    pub tender_id: String,
    pub mapped_data: BTreeMap<String, String>,
}
