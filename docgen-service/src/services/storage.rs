use crate::dtos::TemplateSchema;
use async_trait::async_trait;
use service_core::error::AppError;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

/// Uploaded templates and their extracted schemas, keyed by template id.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn save(
        &self,
        template_id: &str,
        template: Vec<u8>,
        schema: &TemplateSchema,
    ) -> Result<(), AppError>;

    /// `None` when no template with this id was stored.
    async fn load_schema(&self, template_id: &str) -> Result<Option<TemplateSchema>, AppError>;
}

/// Stores `<id>.docx` and `<id>.json` under `<base>/templates`.
pub struct LocalTemplateStore {
    templates_dir: PathBuf,
}

impl LocalTemplateStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let templates_dir = base_path.into().join("templates");
        if !templates_dir.exists() {
            fs::create_dir_all(&templates_dir).await?;
        }
        Ok(Self { templates_dir })
    }

    /// Ids are generated UUIDs; anything else cannot name a stored template.
    fn path_for(&self, template_id: &str, extension: &str) -> Option<PathBuf> {
        Uuid::parse_str(template_id)
            .ok()
            .map(|id| self.templates_dir.join(format!("{}.{}", id, extension)))
    }
}

#[async_trait]
impl TemplateStore for LocalTemplateStore {
    async fn save(
        &self,
        template_id: &str,
        template: Vec<u8>,
        schema: &TemplateSchema,
    ) -> Result<(), AppError> {
        let (docx_path, schema_path) = match (
            self.path_for(template_id, "docx"),
            self.path_for(template_id, "json"),
        ) {
            (Some(docx_path), Some(schema_path)) => (docx_path, schema_path),
            _ => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Invalid template id: {}",
                    template_id
                )))
            }
        };

        let schema_json = serde_json::to_vec_pretty(schema)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to encode schema: {}", e)))?;

        fs::write(&docx_path, template).await?;
        fs::write(&schema_path, schema_json).await?;

        tracing::info!(template_id = %template_id, path = %docx_path.display(), "Stored template");
        Ok(())
    }

    async fn load_schema(&self, template_id: &str) -> Result<Option<TemplateSchema>, AppError> {
        let Some(schema_path) = self.path_for(template_id, "json") else {
            return Ok(None);
        };

        let bytes = match fs::read(&schema_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let schema = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!(
                "Stored schema for template {} is corrupt: {}",
                template_id,
                e
            ))
        })?;
        Ok(Some(schema))
    }
}
