//! Schema extraction from an uploaded template.
//!
//! The template text is sent to the text provider with a fixed parsing prompt;
//! the reply is expected to be a JSON `TemplateSchema`.

use crate::dtos::TemplateSchema;
use crate::services::docx::{self, DocxError};
use crate::services::providers::{ProviderError, TextProvider};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("template is not a readable docx: {0}")]
    Docx(#[from] DocxError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("model returned no text")]
    EmptyReply,

    #[error("model reply is not a template schema: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Extract the field schema of a `.docx` template.
pub async fn extract_schema(
    provider: &dyn TextProvider,
    template: &[u8],
) -> Result<TemplateSchema, SchemaError> {
    let template_text = docx::extract_paragraphs(template)?.join("\n");
    let prompt = build_prompt(&template_text);

    let response = provider.generate(&prompt).await?;
    tracing::debug!(
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "Schema reply received"
    );

    let reply = response.text.ok_or(SchemaError::EmptyReply)?;
    let schema = parse_schema_reply(&reply).map_err(|e| {
        tracing::error!(error = %e, reply = %reply, "Failed to parse model output");
        e
    })?;

    tracing::info!(
        name = %schema.name,
        field_count = schema.fields.len(),
        "Extracted template schema"
    );
    Ok(schema)
}

pub fn build_prompt(template_text: &str) -> String {
    format!(
        r#"
You are a document template parser.

Your task is to convert any given pharmaceutical or tender-based document template into a JSON schema with:
- Field metadata (ID, label, type, generative)
- A templateString using {{placeholders}} where data goes

Detect dynamic fields such as:
- Underlines (_________), placeholders ([Date], [Deviation 1])
- Table headers with repeating data (e.g., Brand Name, Generic Name, Pack Size)

If you see a table-like structure, define it as:
"type": "array of objects" and include its "itemSchema"

OUTPUT FORMAT:
{{
  "name": "<Template Name>",
  "fields": [...],
  "templateString": "..."
}}

Field Types:
- string
- date
- array of objects

Only return JSON. Do NOT wrap in ```json.

---

Document Template:

{template_text}

---
"#
    )
}

/// Parse a model reply, tolerating a surrounding code fence.
pub fn parse_schema_reply(reply: &str) -> Result<TemplateSchema, SchemaError> {
    let cleaned = strip_code_fence(reply);
    if cleaned.is_empty() {
        return Err(SchemaError::EmptyReply);
    }
    Ok(serde_json::from_str(&cleaned)?)
}

fn strip_code_fence(text: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE
        .get_or_init(|| Regex::new(r"(?i)^```(?:json)?\s*|\s*```$").expect("valid fence pattern"));
    fence.replace_all(text.trim(), "").into_owned()
}
