use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::internal::Message;

// ==================== FILE TREE ====================

/// Hierarchical listing returned by the upload endpoint: each name maps to
/// either a nested directory or the leaf file's path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTree(pub BTreeMap<String, FileTreeEntry>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileTreeEntry {
    File(String),
    Directory(FileTree),
}

impl FileTree {
    /// Every leaf path, depth first in name order.
    pub fn file_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths(&self, out: &mut Vec<String>) {
        for entry in self.0.values() {
            match entry {
                FileTreeEntry::File(path) => out.push(path.clone()),
                FileTreeEntry::Directory(tree) => tree.collect_paths(out),
            }
        }
    }

    /// Leaf paths ending in `.java`.
    pub fn java_files(&self) -> Vec<String> {
        self.file_paths()
            .into_iter()
            .filter(|p| p.ends_with(".java"))
            .collect()
    }
}

// ==================== QUERY PARAMS ====================

/// Dashboard reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "24h")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "24h",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::All => "all",
        }
    }

    /// Window twice as long, used to compute change indicators.
    pub fn comparison_window(&self) -> &'static str {
        match self {
            TimeRange::Day => "48h",
            TimeRange::Week => "14d",
            TimeRange::Month | TimeRange::All => "60d",
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(TimeRange::Day),
            "7d" => Ok(TimeRange::Week),
            "30d" => Ok(TimeRange::Month),
            "all" => Ok(TimeRange::All),
            other => Err(format!("unknown time range: {}", other)),
        }
    }
}

// ==================== REQUEST DTOs ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTestsRequest {
    pub code: String,
    pub file_name: String,
    pub llm: String,
    pub framework: String,
    /// Context file name -> content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestContextRequest {
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixCodeRequest {
    pub file_name: String,
    pub code: String,
    pub error: String,
    pub llm: String,
    pub framework: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateTestRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageChatRequest {
    pub message: String,
    pub context: Vec<CoverageInsight>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChatContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_context: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChatRequest {
    pub message: String,
    pub context: CodeChatContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<Message>>,
}

// ==================== RESPONSE DTOs ====================

#[derive(Debug, Clone, Deserialize)]
pub struct FileContent {
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Backend-ranked candidate context file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSuggestion {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub reason: String,
    pub score: f64,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub should_mock: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestContextResponse {
    pub suggestions: Vec<ContextSuggestion>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub ai_enhanced: Option<bool>,
    #[serde(default)]
    pub mock_strategy: Option<serde_json::Value>,
}

/// One stored generation run. The history endpoint only returns the first
/// four fields; the rest carry client-side defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRun {
    pub id: i64,
    pub java_file: String,
    pub test_file: String,
    pub created_at: String,
    pub test_code: String,
    pub success: bool,
    pub errors: String,
}

/// Wire shape of a history row: `[id, java_file, test_file, created_at]`.
#[derive(Debug, Clone, Deserialize)]
pub struct TestRunRow(pub i64, pub String, pub String, pub String);

impl From<TestRunRow> for TestRun {
    fn from(TestRunRow(id, java_file, test_file, created_at): TestRunRow) -> Self {
        Self {
            id,
            java_file,
            test_file,
            created_at,
            test_code: String::new(),
            success: true,
            errors: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_tests: u64,
    #[serde(default)]
    pub successful_tests: u64,
    #[serde(default)]
    pub failed_tests: u64,
    #[serde(default)]
    pub avg_generation_time: f64,
    #[serde(default)]
    pub test_coverage: f64,
    #[serde(default)]
    pub active_projects: u64,
    #[serde(default)]
    pub tests_today: u64,
    #[serde(default)]
    pub tests_this_week: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestTrend {
    pub date: String,
    #[serde(default)]
    pub successful: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageData {
    pub class_name: String,
    pub coverage: f64,
    #[serde(default)]
    pub methods: u64,
    #[serde(default)]
    pub tested_methods: u64,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageInsight {
    pub class_name: String,
    pub coverage: f64,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub missing_tests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSnippet {
    #[serde(default)]
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDiff {
    pub old_code: String,
    pub new_code: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub code_snippet: Option<CodeSnippet>,
    #[serde(default)]
    pub diff: Option<CodeDiff>,
}

// ==================== JENKINS DTOs ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    /// Never returned by the backend on read.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub job_name: String,
}

/// A build reference is either a number or a symbolic id such as
/// `lastSuccessfulBuild`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildRef {
    Number(u64),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsBuild {
    pub number: u64,
    #[serde(default)]
    pub result: Option<String>,
    /// ISO-8601 start time
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JenkinsCoverage {
    #[serde(alias = "buildNumber")]
    pub build_number: BuildRef,
    #[serde(default, alias = "lineCoverage")]
    pub line_coverage: f64,
    #[serde(default, alias = "branchCoverage")]
    pub branch_coverage: f64,
    #[serde(default, alias = "classCoverage")]
    pub class_coverage: f64,
    #[serde(default, alias = "methodCoverage")]
    pub method_coverage: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JenkinsTestResult {
    #[serde(alias = "buildNumber")]
    pub build_number: BuildRef,
    #[serde(default, alias = "totalCount")]
    pub total_tests: u64,
    #[serde(default, alias = "failCount")]
    pub failed_tests: u64,
    #[serde(default, alias = "skipCount")]
    pub skipped_tests: u64,
    #[serde(default, alias = "passCount")]
    pub passed_tests: u64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BuildsEnvelope {
    #[serde(default)]
    pub builds: Vec<JenkinsBuild>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CoverageEnvelope {
    #[serde(default)]
    pub coverage: Vec<JenkinsCoverage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TestResultsEnvelope {
    #[serde(default)]
    pub test_results: Vec<JenkinsTestResult>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub warning: Option<String>,
}
