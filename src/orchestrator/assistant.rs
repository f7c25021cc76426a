use std::sync::Arc;

use crate::api::dto::{ChatResponse, CodeChatContext, CodeChatRequest, CoverageInsight};
use crate::models::internal::{Conversation, Message, MessageKind, MessageMetadata};
use crate::orchestrator::WorkflowError;
use crate::services::api_client::ApiClient;
use crate::storage::conversation_store::ConversationStore;
use crate::storage::persistence::StoreError;

/// Prior messages sent along with each code-assistant request.
pub const HISTORY_WINDOW: usize = 10;

pub const CODE_ASSISTANT_ERROR_REPLY: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

pub const COVERAGE_ASSISTANT_ERROR_REPLY: &str =
    "I apologize, but I encountered an error. Please try again or rephrase your question.";

/// Coverage below this percentage flags a class as needing attention.
pub const LOW_COVERAGE_THRESHOLD: f64 = 70.0;

/// The code assistant chat: a conversation store plus the conversation
/// currently being written to.
pub struct AssistantSession {
    store: ConversationStore,
    client: Arc<ApiClient>,
    current: Option<String>,
    context: CodeChatContext,
}

impl AssistantSession {
    pub fn new(store: ConversationStore, client: Arc<ApiClient>) -> Self {
        Self {
            store,
            client,
            current: None,
            context: CodeChatContext::default(),
        }
    }

    /// Editor context (open file, selection, ...) sent with every message.
    pub fn with_context(mut self, context: CodeChatContext) -> Self {
        self.context = context;
        self
    }

    /// Loads the saved conversations and makes the newest one current.
    pub fn open(&mut self) -> Result<&Conversation, WorkflowError> {
        self.store.load_all()?;
        let head = self.head_or_create()?;
        self.current = Some(head.clone());
        self.conversation(&head)
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.store.conversations()
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current.as_deref().and_then(|id| self.store.get(id))
    }

    pub fn new_conversation(&mut self) -> Result<&Conversation, WorkflowError> {
        let created = self.store.create()?;
        self.current = Some(created.id.clone());
        self.conversation(&created.id)
    }

    pub fn select(&mut self, id: &str) -> Result<&Conversation, WorkflowError> {
        if self.store.get(id).is_none() {
            return Err(StoreError::NotFound(format!("Conversation {} not found", id)).into());
        }
        self.current = Some(id.to_string());
        self.conversation(id)
    }

    /// Deletes a conversation. Deleting the current one moves the session
    /// to the newest remaining conversation, or to a fresh one when none
    /// are left.
    pub fn delete(&mut self, id: &str) -> Result<bool, WorkflowError> {
        let removed = self.store.delete(id)?;

        let current_gone = match self.current.as_deref() {
            Some(current) => current == id,
            None => true,
        };
        if current_gone || self.store.is_empty() {
            let next = self.head_or_create()?;
            tracing::debug!("Current conversation is now {}", next);
            self.current = Some(next);
        }

        Ok(removed)
    }

    /// Sends `text` to the code assistant and records both sides of the
    /// exchange in the current conversation.
    ///
    /// The user message is persisted before the request goes out. A failed
    /// request still yields an assistant message (the error placeholder),
    /// so the returned message is always the one appended.
    pub async fn send(&mut self, text: &str) -> Result<Message, WorkflowError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }

        let id = match self.current.clone() {
            Some(id) => id,
            None => self.open()?.id.clone(),
        };

        let mut messages = self.conversation(&id)?.messages.clone();
        let history = messages[messages.len().saturating_sub(HISTORY_WINDOW)..].to_vec();

        messages.push(Message::user(text));
        self.store.update(&id, messages.clone())?;

        let request = CodeChatRequest {
            message: text.to_string(),
            context: self.context.clone(),
            conversation_history: Some(history),
        };

        let reply = match self.client.chat_with_code_assistant(&request).await {
            Ok(response) => format_reply(response),
            Err(e) => {
                tracing::error!("Failed to send message: {}", e);
                Message::assistant(CODE_ASSISTANT_ERROR_REPLY).with_kind(MessageKind::Text)
            }
        };

        messages.push(reply.clone());
        self.store.update(&id, messages)?;
        Ok(reply)
    }

    fn conversation(&self, id: &str) -> Result<&Conversation, WorkflowError> {
        self.store
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("Conversation {} not found", id)).into())
    }

    fn head_or_create(&mut self) -> Result<String, WorkflowError> {
        match self.store.head() {
            Some(head) => Ok(head.id.clone()),
            None => Ok(self.store.create()?.id),
        }
    }
}

/// Turns a backend reply into the assistant message that gets stored.
///
/// Snippets and diffs are appended as fenced blocks unless the reply text
/// already carries its own fences.
pub fn format_reply(response: ChatResponse) -> Message {
    let mut content = response.message;
    let has_code_blocks = content.contains("```");
    let has_file_metadata = content.contains("**File:**") || content.contains("Filename:");

    if let Some(snippet) = response.code_snippet.as_ref() {
        if !snippet.code.is_empty() && !has_code_blocks {
            let language = if snippet.language.is_empty() {
                "text"
            } else {
                snippet.language.as_str()
            };
            content.push_str(&format!("\n\n```{}\n{}\n```", language, snippet.code));
            if let Some(file_name) = snippet.file_name.as_deref().filter(|f| !f.is_empty()) {
                if !has_file_metadata {
                    content.push_str(&format!("\n\n**File:** `{}`", file_name));
                }
            }
        }
    }

    if let Some(diff) = response.diff.as_ref() {
        if !has_code_blocks {
            let language = diff.language.as_deref().unwrap_or("text");
            content.push_str(&format!(
                "\n\n**Original Code:**\n```{}\n{}\n```",
                language, diff.old_code
            ));
            content.push_str(&format!(
                "\n\n**Modified Code:**\n```{}\n{}\n```",
                language, diff.new_code
            ));
            if !diff.file_name.is_empty() && !has_file_metadata {
                content.push_str(&format!("\n\n**File:** `{}`", diff.file_name));
            }
        }
    }

    match response.code_snippet {
        Some(snippet) => Message::assistant(content)
            .with_kind(MessageKind::Code)
            .with_metadata(MessageMetadata {
                file_name: snippet.file_name,
                language: Some(snippet.language),
                ..Default::default()
            }),
        None => Message::assistant(content).with_kind(MessageKind::Text),
    }
}

/// Welcome text summarizing the coverage insights.
pub fn coverage_welcome(insights: &[CoverageInsight]) -> String {
    let average = if insights.is_empty() {
        0.0
    } else {
        insights.iter().map(|i| i.coverage).sum::<f64>() / insights.len() as f64
    };
    let low = insights
        .iter()
        .filter(|i| i.coverage < LOW_COVERAGE_THRESHOLD)
        .count();

    format!(
        "👋 Hi! I'm your Test Coverage Assistant. I can help you analyze your test coverage, \
suggest improvements, and answer questions about your testing strategy.\n\n\
Here's what I found in your current test suite:\n\
• {} classes analyzed\n\
• Average coverage: {}%\n\
• {} classes need attention\n\n\
How can I help you improve your test coverage today?",
        insights.len(),
        average.round(),
        low
    )
}

const COVERAGE_FALLBACK_WELCOME: &str = "👋 Hi! I'm your Test Coverage Assistant. I can help you \
analyze test coverage and suggest improvements. How can I assist you today?";

/// Chat about test coverage. The transcript is kept in memory only.
pub struct CoverageAssistant {
    client: Arc<ApiClient>,
    insights: Vec<CoverageInsight>,
    messages: Vec<Message>,
    suggestions: Vec<String>,
}

impl CoverageAssistant {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            insights: Vec::new(),
            messages: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Fetches coverage insights and posts the welcome message. Without
    /// insights a generic welcome is used instead.
    pub async fn start(&mut self) -> &Message {
        let fetched = self.client.get_coverage_insights().await;
        let welcome = match fetched {
            Ok(insights) => {
                let text = coverage_welcome(&insights);
                self.insights = insights;
                self.suggestions = vec![
                    "Show me classes with low coverage".to_string(),
                    "What tests are missing for my classes?".to_string(),
                    "How can I improve test coverage?".to_string(),
                    "Analyze my testing patterns".to_string(),
                ];
                text
            }
            Err(e) => {
                tracing::warn!("Failed to load coverage insights: {}", e);
                self.suggestions = vec![
                    "Show me test coverage overview".to_string(),
                    "Help me improve test quality".to_string(),
                    "What are best testing practices?".to_string(),
                ];
                COVERAGE_FALLBACK_WELCOME.to_string()
            }
        };

        self.messages = vec![Message::assistant(welcome)];
        &self.messages[0]
    }

    pub fn insights(&self) -> &[CoverageInsight] {
        &self.insights
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Follow-up prompts offered with the latest assistant message.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub async fn send(&mut self, text: &str) -> Result<&Message, WorkflowError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }

        self.messages.push(Message::user(text));

        let result = self.client.chat_with_assistant(text, &self.insights).await;
        let reply = match result {
            Ok(response) => {
                self.suggestions = response.suggestions.unwrap_or_default();
                Message::assistant(response.message)
            }
            Err(e) => {
                tracing::error!("Chat error: {}", e);
                self.suggestions.clear();
                Message::assistant(COVERAGE_ASSISTANT_ERROR_REPLY)
            }
        };

        self.messages.push(reply);
        Ok(&self.messages[self.messages.len() - 1])
    }
}
