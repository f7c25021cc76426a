use std::sync::Arc;
use testgen_client::models::internal::Message;
use testgen_client::orchestrator::conversation_filter::{filter_conversations, Category};
use testgen_client::storage::{ConversationStore, MemoryStore};

// One exchange per conversation, without the welcome message (whose text
// mentions databases and fixing bugs and so matches those categories).
fn store_with(questions: &[&str]) -> ConversationStore {
    let mut store = ConversationStore::new(Arc::new(MemoryStore::new()));
    for question in questions {
        let id = store.create().unwrap().id;
        store
            .update(&id, vec![Message::user(*question), Message::assistant("On it.")])
            .unwrap();
    }
    store
}

#[test]
fn test_categories_match_message_bodies() {
    let store = store_with(&[
        "Why does my postgres query time out",
        "Review this interface for me",
        "Fix the failing postgres migration",
    ]);

    let analysis = filter_conversations(store.conversations(), "", Category::Analysis);
    assert_eq!(analysis.len(), 2);

    let database = filter_conversations(store.conversations(), "", Category::Database);
    assert_eq!(database.len(), 2);

    let code = filter_conversations(store.conversations(), "", Category::Code);
    assert_eq!(code.len(), 1);
    assert_eq!(code[0].title, "Review this interfac...");
}

#[test]
fn test_search_and_category_combine() {
    let store = store_with(&[
        "Why does my postgres query time out",
        "Fix the failing postgres migration",
    ]);

    let hits = filter_conversations(store.conversations(), "FIX", Category::Database);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Fix the failing post...");
}

#[test]
fn test_results_keep_newest_first_order() {
    let store = store_with(&["first question", "second question"]);

    let titles: Vec<_> = filter_conversations(store.conversations(), "question", Category::All)
        .into_iter()
        .map(|c| c.title.as_str())
        .collect();
    assert_eq!(titles, vec!["second question", "first question"]);
}

#[test]
fn test_no_match_is_empty() {
    let store = store_with(&["hello there"]);
    assert!(filter_conversations(store.conversations(), "gradle", Category::All).is_empty());
}
