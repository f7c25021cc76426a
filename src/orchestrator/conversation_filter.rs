//! Conversation list filtering by free-text search and content category.
//!
//! The category predicates are keyword heuristics over message bodies.
//! They make no claim to classify conversations correctly.

use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use crate::models::internal::{Conversation, Message};

static CODE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(function|class|component|interface|method|variable|import|export|const|let|var)\b",
    )
    .expect("valid code keyword pattern")
});

static DATABASE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(sql|database|query|table|schema|mongodb|postgres|mysql|redis)\b")
        .expect("valid database keyword pattern")
});

static ANALYSIS_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(debug|error|bug|fix|issue|problem|troubleshoot|analyze|review)\b")
        .expect("valid analysis keyword pattern")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Category {
    #[default]
    All,
    Code,
    Database,
    Analysis,
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Category::All),
            "code" => Ok(Category::Code),
            "database" => Ok(Category::Database),
            "analysis" => Ok(Category::Analysis),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// A fenced block marker or a programming keyword in any message.
pub fn has_code_content(messages: &[Message]) -> bool {
    messages
        .iter()
        .any(|m| m.content.contains("```") || CODE_KEYWORDS.is_match(&m.content))
}

/// sql, query, table, schema or a database engine name in any message.
pub fn has_database_content(messages: &[Message]) -> bool {
    messages.iter().any(|m| DATABASE_KEYWORDS.is_match(&m.content))
}

/// Debugging / troubleshooting vocabulary in any message.
pub fn has_analysis_content(messages: &[Message]) -> bool {
    messages.iter().any(|m| ANALYSIS_KEYWORDS.is_match(&m.content))
}

/// Case-insensitive substring match on title or last-message preview.
/// An empty query matches everything.
pub fn matches_search(conversation: &Conversation, query: &str) -> bool {
    let query = query.to_lowercase();
    conversation.title.to_lowercase().contains(&query)
        || conversation.last_message.to_lowercase().contains(&query)
}

pub fn matches_category(conversation: &Conversation, category: Category) -> bool {
    match category {
        Category::All => true,
        Category::Code => has_code_content(&conversation.messages),
        Category::Database => has_database_content(&conversation.messages),
        Category::Analysis => has_analysis_content(&conversation.messages),
    }
}

/// Conversations matching both the query and the category, in input order.
pub fn filter_conversations<'a>(
    conversations: &'a [Conversation],
    query: &str,
    category: Category,
) -> Vec<&'a Conversation> {
    conversations
        .iter()
        .filter(|c| matches_search(c, query) && matches_category(c, category))
        .collect()
}
