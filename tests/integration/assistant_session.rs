use super::{json, memory_storage, mock_backend, request_bodies, Arc};
use testgen_client::models::internal::{Message, MessageKind, Role, DEFAULT_TITLE};
use testgen_client::orchestrator::assistant::{
    AssistantSession, CoverageAssistant, CODE_ASSISTANT_ERROR_REPLY, COVERAGE_ASSISTANT_ERROR_REPLY,
    HISTORY_WINDOW,
};
use testgen_client::orchestrator::WorkflowError;
use testgen_client::storage::ConversationStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

// ============================================
// Code assistant
// ============================================

#[tokio::test]
async fn test_failed_reply_is_recorded_as_placeholder() {
    let (server, client) = mock_backend().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/code"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let storage = memory_storage();
    let mut session = AssistantSession::new(ConversationStore::new(storage.clone()), client);
    session.open().unwrap();

    let reply = session.send("Why does my mock return null?").await.unwrap();
    assert_eq!(reply.content, CODE_ASSISTANT_ERROR_REPLY);
    assert_eq!(reply.kind, Some(MessageKind::Text));

    let current = session.current().unwrap();
    assert_eq!(current.message_count, 3);
    assert_eq!(current.messages[1].role, Role::User);
    assert_eq!(current.messages[1].content, "Why does my mock return null?");
    assert_eq!(current.title, "Why does my mock");

    // Both sides of the exchange reached the backing store.
    let mut reloaded = ConversationStore::new(storage);
    let conversations = reloaded.load_all().unwrap();
    assert_eq!(conversations[0].messages.len(), 3);
}

#[tokio::test]
async fn test_history_is_capped_at_the_window() {
    let (server, client) = mock_backend().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Noted."})))
        .mount(&server)
        .await;

    let storage = memory_storage();
    {
        let mut seed = ConversationStore::new(storage.clone());
        seed.load_all().unwrap();
        let id = seed.head().unwrap().id.clone();
        let mut messages = seed.get(&id).unwrap().messages.clone();
        for i in 0..8 {
            messages.push(Message::user(format!("question {}", i)));
            messages.push(Message::assistant(format!("answer {}", i)));
        }
        seed.update(&id, messages).unwrap();
    }

    let mut session = AssistantSession::new(ConversationStore::new(storage), client);
    session.open().unwrap();
    session.send("one more").await.unwrap();

    let bodies = request_bodies(&server, "/api/chat/code").await;
    let history = bodies[0]["conversationHistory"].as_array().unwrap();
    assert_eq!(history.len(), HISTORY_WINDOW);
    assert_eq!(history.last().unwrap()["content"], "answer 7");
    assert_eq!(bodies[0]["message"], "one more");
}

#[tokio::test]
async fn test_blank_message_is_rejected_without_a_request() {
    let (server, client) = mock_backend().await;

    let mut session = AssistantSession::new(ConversationStore::new(memory_storage()), client);
    session.open().unwrap();

    let result = session.send("  \n ").await;

    assert!(matches!(result, Err(WorkflowError::InvalidInput(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(session.current().unwrap().message_count, 1);
}

#[tokio::test]
async fn test_snippet_reply_is_stored_as_code() {
    let (server, client) = mock_backend().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Try this test:",
            "codeSnippet": {
                "language": "java",
                "code": "@Test void saves() {}",
                "fileName": "OrderServiceTest.java"
            }
        })))
        .mount(&server)
        .await;

    let storage = memory_storage();
    let mut session = AssistantSession::new(ConversationStore::new(storage.clone()), client);
    let reply = session.send("write a save test").await.unwrap();

    assert_eq!(reply.kind, Some(MessageKind::Code));
    assert!(reply.content.contains("```java\n@Test void saves() {}\n```"));
    let metadata = reply.metadata.unwrap();
    assert_eq!(metadata.file_name.as_deref(), Some("OrderServiceTest.java"));

    let mut reloaded = ConversationStore::new(storage);
    let conversations = reloaded.load_all().unwrap();
    assert_eq!(conversations[0].messages[2].kind, Some(MessageKind::Code));
}

#[tokio::test]
async fn test_deleting_current_moves_to_newest_remaining() {
    let (_server, client) = mock_backend().await;

    let mut session = AssistantSession::new(ConversationStore::new(memory_storage()), client);
    let first = session.open().unwrap().id.clone();
    let second = session.new_conversation().unwrap().id.clone();
    assert_eq!(session.current().unwrap().id, second);

    assert!(session.delete(&second).unwrap());
    assert_eq!(session.current().unwrap().id, first);

    assert!(session.delete(&first).unwrap());
    let fresh = session.current().unwrap();
    assert_ne!(fresh.id, first);
    assert_eq!(fresh.title, DEFAULT_TITLE);
    assert_eq!(session.conversations().len(), 1);
}

#[tokio::test]
async fn test_deleting_another_conversation_keeps_current() {
    let (_server, client) = mock_backend().await;

    let mut session = AssistantSession::new(ConversationStore::new(memory_storage()), client);
    let first = session.open().unwrap().id.clone();
    let second = session.new_conversation().unwrap().id.clone();

    assert!(session.delete(&first).unwrap());
    assert_eq!(session.current().unwrap().id, second);
    assert!(!session.delete("no-such-id").unwrap());
}

#[tokio::test]
async fn test_select_unknown_conversation_fails() {
    let (_server, client) = mock_backend().await;

    let mut session = AssistantSession::new(ConversationStore::new(memory_storage()), client);
    session.open().unwrap();

    assert!(matches!(
        session.select("missing"),
        Err(WorkflowError::Store(_))
    ));
}

// ============================================
// Coverage assistant
// ============================================

#[tokio::test]
async fn test_coverage_welcome_summarises_insights() {
    let (server, client) = mock_backend().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/coverage-insights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"className": "OrderService", "coverage": 45.0},
            {"className": "Money", "coverage": 92.0}
        ])))
        .mount(&server)
        .await;

    let mut assistant = CoverageAssistant::new(client);
    let welcome = assistant.start().await.content.clone();

    assert!(welcome.contains("2 classes"));
    assert!(welcome.contains("69%"));
    assert_eq!(assistant.insights().len(), 2);
    assert_eq!(assistant.suggestions().len(), 4);
}

#[tokio::test]
async fn test_coverage_assistant_falls_back_without_insights() {
    let (server, client) = mock_backend().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/coverage-insights"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat/message"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut assistant = CoverageAssistant::new(Arc::clone(&client));
    assistant.start().await;
    assert!(assistant.insights().is_empty());
    assert_eq!(assistant.suggestions().len(), 3);

    let reply = assistant.send("what is missing?").await.unwrap();
    assert_eq!(reply.content, COVERAGE_ASSISTANT_ERROR_REPLY);
    assert!(assistant.suggestions().is_empty());
    assert_eq!(assistant.messages().len(), 3);
}

#[tokio::test]
async fn test_coverage_reply_updates_suggestions() {
    let (server, client) = mock_backend().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/coverage-insights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat/message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "OrderService lacks tests for refund().",
            "suggestions": ["Generate refund tests"]
        })))
        .mount(&server)
        .await;

    let mut assistant = CoverageAssistant::new(client);
    assistant.start().await;
    let reply = assistant.send("what is missing?").await.unwrap();

    assert_eq!(reply.content, "OrderService lacks tests for refund().");
    assert_eq!(assistant.suggestions(), ["Generate refund tests".to_string()]);
}
