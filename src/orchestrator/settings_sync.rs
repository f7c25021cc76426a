use crate::api::dto::JenkinsSettings;
use crate::services::api_client::{ApiClient, ApiError};
use crate::storage::persistence::StoreError;
use crate::storage::settings_store::{AppSettings, SettingsStore};

/// Result of a settings save that got as far as writing local settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub jenkins_saved: bool,
    pub warnings: Vec<String>,
}

impl SaveOutcome {
    /// Local settings were written but something else was not.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Local settings plus the backend's Jenkins configuration.
///
/// The Jenkins half is `Ok(None)` when the backend has none configured and
/// `Err` when it could not be asked; local settings are returned either way.
pub async fn load_settings(
    client: &ApiClient,
    store: &SettingsStore,
) -> (AppSettings, Result<Option<JenkinsSettings>, ApiError>) {
    let jenkins = client.get_jenkins_settings().await;
    if let Err(e) = &jenkins {
        tracing::error!("Failed to load Jenkins settings: {}", e);
    }
    (store.load(), jenkins)
}

/// Pushes Jenkins settings to the backend, then writes local settings.
///
/// A Jenkins failure is reported in the outcome and does not stop the
/// local write; only a local write failure is an error.
pub async fn save_settings(
    client: &ApiClient,
    store: &SettingsStore,
    settings: &AppSettings,
    jenkins: &JenkinsSettings,
) -> Result<SaveOutcome, StoreError> {
    let mut outcome = SaveOutcome::default();

    match client.save_jenkins_settings(jenkins).await {
        Ok(()) => {
            tracing::info!("Jenkins settings saved");
            outcome.jenkins_saved = true;
        }
        Err(e) => {
            tracing::error!("Failed to save Jenkins settings: {}", e);
            outcome
                .warnings
                .push("Jenkins settings could not be saved".to_string());
        }
    }

    store.save(settings)?;
    tracing::info!("Local settings saved");

    Ok(outcome)
}
