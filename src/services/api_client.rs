use async_trait::async_trait;
use reqwest::{multipart, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::api::dto::*;

/// Multipart field the backend reads uploaded archives from.
const UPLOAD_FIELD: &str = "zipFile";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    /// Non-success status; displays the fixed per-operation message.
    #[error("{message}")]
    ApiError { status: u16, message: &'static str },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// HTTP status of a rejected request, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            ApiError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// A file handed to the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.zip".to_string());
        Ok(Self { name, bytes })
    }
}

/// Anything that can hand back a project file's source by path.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn read_source(&self, path: &str) -> Result<String, ApiError>;
}

/// Typed gateway to the test generation backend.
///
/// Every method issues exactly one request. A non-success status becomes
/// `ApiError::ApiError` carrying the operation's fixed message.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health_check(&self) -> Result<bool, ApiError> {
        let response = self.client.get(self.url("/")).send().await?;
        Ok(response.status().is_success())
    }

    // ==================== Files ====================

    pub async fn upload_files(&self, files: Vec<UploadFile>) -> Result<FileTree, ApiError> {
        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.bytes).file_name(file.name);
            form = form.part(UPLOAD_FIELD, part);
        }

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;

        let response = ensure_success(response, "Upload failed")?;
        decode(response).await
    }

    pub async fn read_file(&self, path: &str) -> Result<FileContent, ApiError> {
        let response = self
            .client
            .get(self.url("/read-file"))
            .query(&[("path", path)])
            .send()
            .await?;

        let response = ensure_success(response, "Failed to read file")?;
        decode(response).await
    }

    // ==================== Generation ====================

    pub async fn generate_tests(&self, request: &GenerateTestsRequest) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url("/generate-tests"))
            .json(request)
            .send()
            .await?;

        let response = ensure_success(response, "Failed to generate tests")?;
        Ok(response.text().await?)
    }

    pub async fn suggest_context_files(
        &self,
        file_path: &str,
    ) -> Result<SuggestContextResponse, ApiError> {
        let request = SuggestContextRequest {
            file_path: file_path.to_string(),
        };

        let response = self
            .client
            .post(self.url("/suggest-context"))
            .json(&request)
            .send()
            .await?;

        let response = ensure_success(response, "Failed to get context suggestions")?;
        decode(response).await
    }

    pub async fn fix_code(&self, request: &FixCodeRequest) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url("/fix-code"))
            .json(request)
            .send()
            .await?;

        let response = ensure_success(response, "Failed to fix code")?;
        Ok(response.text().await?)
    }

    // ==================== Test history ====================

    pub async fn get_test_history(&self) -> Result<Vec<TestRun>, ApiError> {
        let response = self.client.get(self.url("/tests")).send().await?;

        let response = ensure_success(response, "Failed to get test history")?;
        let rows: Vec<TestRunRow> = decode(response).await?;
        Ok(rows.into_iter().map(TestRun::from).collect())
    }

    pub async fn get_test(&self, test_id: i64) -> Result<FileContent, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/tests/{}", test_id)))
            .send()
            .await?;

        let response = ensure_success(response, "Failed to get test")?;
        decode(response).await
    }

    pub async fn update_test(&self, test_id: i64, code: &str) -> Result<(), ApiError> {
        let request = UpdateTestRequest {
            code: code.to_string(),
        };

        let response = self
            .client
            .post(self.url(&format!("/tests/{}", test_id)))
            .json(&request)
            .send()
            .await?;

        ensure_success(response, "Failed to update test")?;
        Ok(())
    }

    pub async fn delete_test(&self, test_id: i64) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/tests/{}", test_id)))
            .send()
            .await?;

        ensure_success(response, "Failed to delete test")?;
        Ok(())
    }

    // ==================== Dashboard ====================

    pub async fn get_dashboard_stats(&self, time_range: &str) -> Result<DashboardStats, ApiError> {
        let response = self
            .client
            .get(self.url("/api/dashboard/stats"))
            .query(&[("timeRange", time_range)])
            .send()
            .await?;

        let response = ensure_success(response, "Failed to get dashboard stats")?;
        decode(response).await
    }

    pub async fn get_test_trends(&self, time_range: &str) -> Result<Vec<TestTrend>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/dashboard/trends"))
            .query(&[("timeRange", time_range)])
            .send()
            .await?;

        let response = ensure_success(response, "Failed to get test trends")?;
        decode(response).await
    }

    pub async fn get_coverage_data(&self) -> Result<Vec<CoverageData>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/dashboard/coverage"))
            .send()
            .await?;

        let response = ensure_success(response, "Failed to get coverage data")?;
        decode(response).await
    }

    // ==================== Chat ====================

    pub async fn get_coverage_insights(&self) -> Result<Vec<CoverageInsight>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/chat/coverage-insights"))
            .send()
            .await?;

        let response = ensure_success(response, "Failed to get coverage insights")?;
        decode(response).await
    }

    pub async fn chat_with_assistant(
        &self,
        message: &str,
        context: &[CoverageInsight],
    ) -> Result<ChatResponse, ApiError> {
        let request = CoverageChatRequest {
            message: message.to_string(),
            context: context.to_vec(),
        };

        let response = self
            .client
            .post(self.url("/api/chat/message"))
            .json(&request)
            .send()
            .await?;

        let response = ensure_success(response, "Failed to chat with assistant")?;
        decode(response).await
    }

    pub async fn chat_with_code_assistant(
        &self,
        request: &CodeChatRequest,
    ) -> Result<ChatResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/api/chat/code"))
            .json(request)
            .send()
            .await?;

        let response = ensure_success(response, "Failed to chat with code assistant")?;
        decode(response).await
    }

    // ==================== Jenkins ====================

    pub async fn save_jenkins_settings(&self, settings: &JenkinsSettings) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/api/settings/jenkins"))
            .json(settings)
            .send()
            .await?;

        ensure_success(response, "Failed to save Jenkins settings")?;
        Ok(())
    }

    /// `Ok(None)` when the backend answers 404, meaning Jenkins has not been
    /// configured yet. Any other failure status is an error.
    pub async fn get_jenkins_settings(&self) -> Result<Option<JenkinsSettings>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/settings/jenkins"))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Jenkins is not configured");
            return Ok(None);
        }

        let response = ensure_success(response, "Failed to get Jenkins settings")?;
        decode(response).await.map(Some)
    }

    pub async fn get_jenkins_builds(&self) -> Result<Vec<JenkinsBuild>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/jenkins/builds"))
            .send()
            .await?;

        let response = ensure_success(response, "Failed to get Jenkins builds")?;
        let envelope: BuildsEnvelope = decode(response).await?;
        Ok(envelope.builds)
    }

    pub async fn get_jenkins_coverage(&self) -> Result<Vec<JenkinsCoverage>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/jenkins/coverage"))
            .send()
            .await?;

        let response = ensure_success(response, "Failed to get Jenkins coverage data")?;
        let envelope: CoverageEnvelope = decode(response).await?;
        Ok(envelope.coverage)
    }

    pub async fn get_jenkins_test_results(&self) -> Result<Vec<JenkinsTestResult>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/jenkins/test-results"))
            .send()
            .await?;

        let response = ensure_success(response, "Failed to get Jenkins test results")?;
        let envelope: TestResultsEnvelope = decode(response).await?;
        Ok(envelope.test_results)
    }

    pub async fn test_jenkins_connection(
        &self,
        settings: &JenkinsSettings,
    ) -> Result<ConnectionTestResult, ApiError> {
        let response = self
            .client
            .post(self.url("/api/jenkins/test-connection"))
            .json(settings)
            .send()
            .await?;

        let response = ensure_success(response, "Failed to test Jenkins connection")?;
        decode(response).await
    }
}

#[async_trait]
impl FileSource for ApiClient {
    async fn read_source(&self, path: &str) -> Result<String, ApiError> {
        Ok(self.read_file(path).await?.code)
    }
}

fn ensure_success(response: Response, message: &'static str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    tracing::warn!("{} (HTTP {})", message, status.as_u16());
    Err(ApiError::ApiError {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}
