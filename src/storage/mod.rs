pub mod conversation_store;
pub mod persistence;
pub mod settings_store;

pub use conversation_store::{ConversationStore, CONVERSATIONS_KEY};
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use settings_store::{AppSettings, SettingsStore, UserPreferences, SETTINGS_KEY};
