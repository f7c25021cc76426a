use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::dto::{FixCodeRequest, GenerateTestsRequest};
use crate::orchestrator::context_selection::{file_name_of, resolve_context_content, ContextSelection};
use crate::orchestrator::WorkflowError;
use crate::services::api_client::{ApiClient, ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Waiting,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileProgress {
    pub path: String,
    pub name: String,
    pub status: FileStatus,
    pub message: String,
}

impl FileProgress {
    fn waiting(path: &str) -> Self {
        Self {
            path: path.to_string(),
            name: file_name_of(path).to_string(),
            status: FileStatus::Waiting,
            message: "Waiting...".to_string(),
        }
    }

    fn set(&mut self, status: FileStatus, message: &str) {
        self.status = status;
        self.message = message.to_string();
    }
}

/// Snapshot of a batch run. `current` is the 1-based index of the latest
/// file to start processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub files: Vec<FileProgress>,
}

impl BatchProgress {
    pub fn new(files: &[String]) -> Self {
        Self {
            current: 0,
            total: files.len(),
            files: files.iter().map(|f| FileProgress::waiting(f)).collect(),
        }
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn is_finished(&self) -> bool {
        self.files
            .iter()
            .all(|f| matches!(f.status, FileStatus::Completed | FileStatus::Error))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedTest {
    pub file_name: String,
    pub content: String,
    pub original_file: String,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub progress: BatchProgress,
    /// Keyed by generated test file name
    pub tests: BTreeMap<String, GeneratedTest>,
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub llm: String,
    pub framework: String,
}

/// Drives test generation for one or many files.
///
/// Batches run one file at a time unless a concurrency above 1 is set; in
/// both cases each file's status is tracked independently and a failure
/// never stops the remaining files.
pub struct BatchGenerator {
    client: Arc<ApiClient>,
    options: GenerationOptions,
    concurrency: usize,
}

impl BatchGenerator {
    pub fn new(client: Arc<ApiClient>, options: GenerationOptions) -> Self {
        Self {
            client,
            options,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self, files: &[String], contexts: &ContextSelection) -> BatchOutcome {
        let (tx, _rx) = watch::channel(BatchProgress::new(files));
        self.run_with_progress(files, contexts, &tx).await
    }

    /// Runs the batch, publishing every status change on `progress`.
    pub async fn run_with_progress(
        &self,
        files: &[String],
        contexts: &ContextSelection,
        progress: &watch::Sender<BatchProgress>,
    ) -> BatchOutcome {
        progress.send_replace(BatchProgress::new(files));
        tracing::info!("Starting batch generation for {} files", files.len());

        let results: Vec<Option<GeneratedTest>> = stream::iter(files.iter().enumerate())
            .map(|(index, path)| self.process(index, path, contexts, progress))
            .buffered(self.concurrency)
            .collect()
            .await;

        let tests = results
            .into_iter()
            .flatten()
            .map(|t| (t.file_name.clone(), t))
            .collect();

        let snapshot = progress.borrow().clone();
        tracing::info!(
            "Batch finished: {} completed, {} failed",
            snapshot.count(FileStatus::Completed),
            snapshot.count(FileStatus::Error)
        );

        BatchOutcome {
            progress: snapshot,
            tests,
        }
    }

    async fn process(
        &self,
        index: usize,
        path: &str,
        contexts: &ContextSelection,
        progress: &watch::Sender<BatchProgress>,
    ) -> Option<GeneratedTest> {
        progress.send_modify(|p| {
            p.current = p.current.max(index + 1);
            p.files[index].set(FileStatus::Processing, "Generating tests...");
        });

        match self.generate_for(path, contexts.selection(path)).await {
            Ok(test) => {
                progress.send_modify(|p| p.files[index].set(FileStatus::Completed, "Completed"));
                Some(test)
            }
            Err(e) => {
                tracing::warn!("Failed to generate tests for {}: {}", path, e);
                progress.send_modify(|p| {
                    p.files[index].set(FileStatus::Error, "Failed to generate")
                });
                None
            }
        }
    }

    async fn generate_for(&self, path: &str, context_paths: &[String]) -> Result<GeneratedTest, ApiError> {
        let source = self.client.read_file(path).await?;
        let relative = upload_relative_path(path);

        let context = if context_paths.is_empty() {
            None
        } else {
            Some(resolve_context_content(self.client.as_ref(), context_paths).await)
        };

        let request = GenerateTestsRequest {
            code: source.code,
            file_name: relative.to_string(),
            llm: self.options.llm.clone(),
            framework: self.options.framework.clone(),
            context,
        };
        let content = self.client.generate_tests(&request).await?;

        Ok(GeneratedTest {
            file_name: test_file_name(relative),
            content,
            original_file: path.to_string(),
        })
    }

    /// Generates a test for a file whose source is already loaded.
    pub async fn generate_single(
        &self,
        path: &str,
        code: &str,
        context_paths: &[String],
    ) -> Result<GeneratedTest, WorkflowError> {
        if path.is_empty() || code.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "a file must be loaded before generating".to_string(),
            ));
        }

        let context = if context_paths.is_empty() {
            None
        } else {
            Some(resolve_context_content(self.client.as_ref(), context_paths).await)
        };

        let request = GenerateTestsRequest {
            code: code.to_string(),
            file_name: file_name_of(path).to_string(),
            llm: self.options.llm.clone(),
            framework: self.options.framework.clone(),
            context,
        };
        let content = self.client.generate_tests(&request).await?;

        Ok(GeneratedTest {
            file_name: test_file_name(path),
            content,
            original_file: path.to_string(),
        })
    }

    /// Asks the backend to repair a generated test given the error the user
    /// hit. An empty description is rejected before any request is made.
    pub async fn fix(
        &self,
        test: &GeneratedTest,
        error_description: &str,
    ) -> Result<GeneratedTest, WorkflowError> {
        if error_description.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(
                "error description must not be empty".to_string(),
            ));
        }

        let request = FixCodeRequest {
            file_name: test.file_name.clone(),
            code: test.content.clone(),
            error: error_description.to_string(),
            llm: self.options.llm.clone(),
            framework: self.options.framework.clone(),
        };
        let fixed = self.client.fix_code(&request).await?;

        Ok(GeneratedTest {
            content: fixed,
            ..test.clone()
        })
    }
}

/// Path with everything up to the last `uploads/` (or `uploads\`) removed.
pub fn upload_relative_path(path: &str) -> &str {
    let cut = ["uploads/", "uploads\\"]
        .iter()
        .filter_map(|marker| path.rfind(marker).map(|i| i + marker.len()))
        .max();

    match cut {
        Some(i) => &path[i..],
        None => path,
    }
}

/// `Foo.java` -> `FooTest.java`, from the last path segment.
pub fn test_file_name(path: &str) -> String {
    let name = file_name_of(path);
    if name.is_empty() {
        return "Test.java".to_string();
    }
    name.replacen(".java", "Test.java", 1)
}
