use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to a conversation until its first user message arrives.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Content of the assistant message every conversation is seeded with.
pub const WELCOME_MESSAGE: &str = "Hello! 👋 I'm your AI coding assistant. I can help you with:\n\n\
• **Code Generation** - Write functions, components, APIs in any language\n\
• **Code Review** - Analyze and improve your code quality\n\
• **Debugging** - Find and fix bugs in your projects\n\
• **Architecture** - Design patterns and best practices\n\
• **Testing** - Unit tests, integration tests, test strategies\n\
• **Database** - Queries, schema design, optimization\n\
• **Frameworks** - React, Node.js, Python, Java, and more\n\n\
What would you like to work on today?";

/// Preview length kept in `Conversation::last_message`.
pub const LAST_MESSAGE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Rendering hint for a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Code,
    Diff,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            kind: None,
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            kind: None,
            metadata: None,
        }
    }

    /// The seeded first message of every conversation.
    pub fn welcome() -> Self {
        Self {
            id: "1".to_string(),
            ..Self::assistant(WELCOME_MESSAGE)
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A persisted chat transcript.
///
/// `message_count` and `last_message` are caches of `messages` and are
/// recomputed by `ConversationStore::update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    pub message_count: usize,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// A conversation holding only the welcome message.
    pub fn seeded(id: String) -> Self {
        let welcome = Message::welcome();
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            last_message: preview(&welcome.content),
            timestamp: Utc::now(),
            message_count: 1,
            messages: vec![welcome],
        }
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }
}

/// First `LAST_MESSAGE_PREVIEW_CHARS` characters of `content`.
pub fn preview(content: &str) -> String {
    content.chars().take(LAST_MESSAGE_PREVIEW_CHARS).collect()
}

/// Title derived from the first user message: its first four
/// space-separated words, cut to 20 characters plus "..." when longer.
pub fn derive_title(first_user_message: &str) -> String {
    let words = first_user_message
        .split(' ')
        .take(4)
        .collect::<Vec<_>>()
        .join(" ");

    if words.chars().count() > 20 {
        format!("{}...", words.chars().take(20).collect::<String>())
    } else {
        words
    }
}
