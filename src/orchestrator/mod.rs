pub mod assistant;
pub mod batch_generator;
pub mod context_selection;
pub mod conversation_filter;
pub mod dashboard;
pub mod formatter;
pub mod history;
pub mod settings_sync;

use crate::services::api_client::ApiError;
use crate::storage::persistence::StoreError;

pub use assistant::{AssistantSession, CoverageAssistant};
pub use batch_generator::{BatchGenerator, BatchProgress, FileStatus, GeneratedTest, GenerationOptions};
pub use context_selection::ContextSelection;
pub use conversation_filter::{filter_conversations, Category};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
