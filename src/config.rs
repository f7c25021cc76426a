use serde::Deserialize;
use std::path::PathBuf;
use validator::Validate;

/// Main configuration for the test generation client
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct Config {
    /// Base URL of the test generation backend
    #[validate(length(min = 1))]
    pub api_base_url: String,

    /// Directory holding persisted conversations and settings.
    /// Empty means `~/.testgen`.
    pub data_dir: String,

    /// Model name sent with generate/fix requests
    #[validate(length(min = 1))]
    pub default_llm: String,

    /// Test framework sent with generate/fix requests (e.g. junit)
    #[validate(length(min = 1))]
    pub default_framework: String,

    /// Log level (e.g., info, debug, trace)
    pub log_level: String,

    /// Files processed at once during batch generation. 1 keeps the
    /// sequential per-file progress order.
    #[validate(range(min = 1, max = 16))]
    pub batch_concurrency: usize,

    /// How many suggestions the "select top" action applies
    #[validate(range(min = 1, max = 50))]
    pub suggestion_top_n: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5005".to_string(),
            data_dir: String::new(),
            default_llm: "starchat2:15b".to_string(),
            default_framework: "junit".to_string(),
            log_level: "info".to_string(),
            batch_concurrency: 1,
            suggestion_top_n: 5,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("api_base_url", "http://localhost:5005")?
            .set_default("data_dir", "")?
            .set_default("default_llm", "starchat2:15b")?
            .set_default("default_framework", "junit")?
            .set_default("log_level", "info")?
            .set_default("batch_concurrency", 1u32)?
            .set_default("suggestion_top_n", 5u32)?
            // Load from ~/.testgen/config.toml (if present)
            .add_source(
                config::File::with_name(&format!(
                    "{}/.testgen/config",
                    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
                ))
                .required(false),
            )
            // Environment overrides: TESTGEN__API_BASE_URL, TESTGEN__LOG_LEVEL, etc.
            .add_source(config::Environment::with_prefix("TESTGEN").separator("__"))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Returns the directory used by the local stores:
    /// - `data_dir` if configured
    /// - otherwise `~/.testgen`, or `./.testgen` without a home directory
    pub fn effective_data_dir(&self) -> PathBuf {
        if !self.data_dir.is_empty() {
            return PathBuf::from(&self.data_dir);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".testgen")
    }
}
