pub mod api;
pub mod chunker;
pub mod config;
pub mod database;
pub mod errors;
pub mod extraction;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod prompts;
pub mod quiz_parser;
pub mod quiz_validator;
pub mod study_service;
pub mod text_utils;

pub use api::{create_router, AppState};
pub use config::Config;
pub use database::Database;
pub use errors::*;
pub use llm_providers::{LLMProvider, LLMProviderFactory, LLMProviderType, ModelClient, ModelError};
pub use llm_service::LLMService;
pub use models::*;
pub use study_service::StudyService;
