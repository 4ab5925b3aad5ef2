pub mod docgen;
pub mod health;
pub mod tenders;

pub use docgen::{generate_document, map_fields, upload_template};
pub use health::{health_check, metrics, readiness_check};
pub use tenders::{get_tender, get_tender_fields, list_tenders};
