pub mod database;
pub mod document_generator;
pub mod docx;
pub mod field_mapper;
pub mod providers;
pub mod storage;
pub mod template_parser;

pub use database::{MongoTenderRepository, TenderRepository};
pub use storage::{LocalTemplateStore, TemplateStore};
