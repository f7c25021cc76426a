use chrono::Utc;
use std::sync::Arc;

use crate::models::internal::{derive_title, preview, Conversation, Message, Role};
use crate::storage::persistence::{KeyValueStore, StoreError};

/// Storage key of the conversation collection.
pub const CONVERSATIONS_KEY: &str = "ai-conversations";

/// Ordered (newest first) collection of conversations, mirrored to the
/// persistence port after every mutation.
pub struct ConversationStore {
    storage: Arc<dyn KeyValueStore>,
    conversations: Vec<Conversation>,
    last_id: i64,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            conversations: Vec::new(),
            last_id: 0,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn head(&self) -> Option<&Conversation> {
        self.conversations.first()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Reads the persisted collection. Missing, empty or unreadable data
    /// yields exactly one seeded conversation, which is saved immediately.
    pub fn load_all(&mut self) -> Result<&[Conversation], StoreError> {
        let loaded = match self.storage.load(CONVERSATIONS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Conversation>>(&raw) {
                Ok(list) => list,
                Err(e) => {
                    tracing::warn!("Discarding unreadable conversation history: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read conversation history: {}", e);
                Vec::new()
            }
        };

        if loaded.is_empty() {
            let seeded = Conversation::seeded(self.next_id());
            tracing::info!("No saved conversations, seeded {}", seeded.id);
            self.conversations = vec![seeded];
            self.persist()?;
        } else {
            tracing::debug!("Loaded {} conversations", loaded.len());
            self.conversations = loaded;
        }

        Ok(&self.conversations)
    }

    /// Replaces the whole collection, in memory and on disk.
    pub fn save_all(&mut self, conversations: Vec<Conversation>) -> Result<(), StoreError> {
        self.conversations = conversations;
        self.persist()
    }

    /// Builds a seeded conversation and puts it at the head of the list.
    pub fn create(&mut self) -> Result<Conversation, StoreError> {
        let conversation = Conversation::seeded(self.next_id());
        self.conversations.insert(0, conversation.clone());
        self.persist()?;
        tracing::info!("Created conversation: {}", conversation.id);
        Ok(conversation)
    }

    /// Removes a conversation. Returns whether anything was removed.
    ///
    /// Picking a new current conversation is up to the caller.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        let removed = self.conversations.len() != before;
        if removed {
            self.persist()?;
            tracing::info!("Deleted conversation: {}", id);
        }
        Ok(removed)
    }

    /// Replaces a conversation's messages and refreshes its cached fields.
    pub fn update(&mut self, id: &str, messages: Vec<Message>) -> Result<&Conversation, StoreError> {
        if messages.is_empty() {
            return Err(StoreError::InvalidInput(format!(
                "Conversation {} must keep at least one message",
                id
            )));
        }

        let index = self
            .conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Conversation {} not found", id)))?;

        {
            let conversation = &mut self.conversations[index];
            conversation.last_message = messages
                .last()
                .map(|m| preview(&m.content))
                .unwrap_or_default();
            conversation.message_count = messages.len();
            conversation.timestamp = Utc::now();

            if conversation.has_default_title() && messages.len() >= 2 {
                if let Some(first_user) = messages.iter().find(|m| m.role == Role::User) {
                    conversation.title = derive_title(&first_user.content);
                }
            }

            conversation.messages = messages;
        }

        self.persist()?;
        Ok(&self.conversations[index])
    }

    fn persist(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.conversations)?;
        self.storage.save(CONVERSATIONS_KEY, &raw)
    }

    /// Millisecond timestamp, bumped when two ids land in the same ms.
    fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        let existing_max = self
            .conversations
            .iter()
            .filter_map(|c| c.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        let id = now
            .max(self.last_id.saturating_add(1))
            .max(existing_max.saturating_add(1));
        if id <= self.last_id || id <= existing_max {
            // Millisecond ids are exhausted; fall back to a random id.
            return uuid::Uuid::new_v4().to_string();
        }
        self.last_id = id;
        id.to_string()
    }
}
