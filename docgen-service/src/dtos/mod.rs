pub mod docgen;
pub mod tenders;

pub use docgen::{
    GenerateDocumentRequest, MapFieldsRequest, MapFieldsResponse, TemplateField, TemplateSchema,
    TemplateUploadResponse,
};
pub use tenders::{FieldInfo, TenderFieldsResponse, TenderListParams, TenderListResponse};
