//! TestGen client - thin client for the AI Java test generation backend

pub mod api;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;

// Re-export main types for convenience
pub use crate::config::Config;
pub use crate::models::internal::{Conversation, Message, MessageKind, Role};
pub use crate::orchestrator::{
    AssistantSession, BatchGenerator, Category, ContextSelection, WorkflowError,
};
pub use crate::services::api_client::{ApiClient, ApiError, FileSource, UploadFile};
pub use crate::storage::{ConversationStore, JsonFileStore, KeyValueStore, SettingsStore, StoreError};
