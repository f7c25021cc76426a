use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::api::dto::TimeRange;
use crate::storage::persistence::{KeyValueStore, StoreError};

/// Storage key of the application settings blob.
pub const SETTINGS_KEY: &str = "appSettings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "test_coverage".to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub url: String,
    pub model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "starchat2:15b".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardPreferences {
    pub default_time_range: TimeRange,
    /// Auto refresh period in milliseconds; 0 disables it
    pub refresh_interval: u64,
    pub show_change_indicators: bool,
}

impl DashboardPreferences {
    /// Auto refresh period, `None` when refreshing is turned off.
    pub fn refresh_period(&self) -> Option<Duration> {
        (self.refresh_interval > 0).then(|| Duration::from_millis(self.refresh_interval))
    }
}

impl Default for DashboardPreferences {
    fn default() -> Self {
        Self {
            default_time_range: TimeRange::Week,
            refresh_interval: 30_000,
            show_change_indicators: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub dashboard: DashboardPreferences,
}

/// Locally persisted settings. Jenkins configuration lives on the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub database: DatabaseSettings,
    pub ollama: OllamaSettings,
    pub preferences: UserPreferences,
}

pub struct SettingsStore {
    storage: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Saved settings over defaults. Unreadable data yields the defaults.
    pub fn load(&self) -> AppSettings {
        match self.load_raw() {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::error!("Failed to parse saved settings: {}", e);
                AppSettings::default()
            }),
            None => AppSettings::default(),
        }
    }

    pub fn save(&self, settings: &AppSettings) -> Result<(), StoreError> {
        let raw = serde_json::to_string(settings)?;
        self.storage.save(SETTINGS_KEY, &raw)
    }

    pub fn preferences(&self) -> UserPreferences {
        self.load().preferences
    }

    /// Rewrites only the `preferences` section, keeping everything else in
    /// the blob as it was.
    pub fn save_preferences(&self, preferences: &UserPreferences) -> Result<(), StoreError> {
        let mut current = match self.load_raw() {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        current.insert("preferences".to_string(), serde_json::to_value(preferences)?);

        let raw = serde_json::to_string(&Value::Object(current))?;
        self.storage.save(SETTINGS_KEY, &raw)
    }

    fn load_raw(&self) -> Option<Value> {
        let raw = match self.storage.load(SETTINGS_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::error!("Failed to load settings: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Failed to load settings: {}", e);
                None
            }
        }
    }
}
