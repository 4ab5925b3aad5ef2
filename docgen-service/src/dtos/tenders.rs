use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct TenderListParams {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,
    #[serde(default)]
    pub skip: u64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TenderListResponse {
    pub total: u64,
    pub skip: u64,
    pub limit: i64,
    pub tenders: Vec<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderFieldsResponse {
    pub tender_id: String,
    pub total_fields: usize,
    pub fields: BTreeMap<String, FieldInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    #[serde(rename = "type")]
    pub field_type: String,
    pub sample_value: Option<String>,
}
