use super::{generation_options, json, mock_backend, mount_source, mount_unreadable, request_bodies};
use testgen_client::orchestrator::batch_generator::{
    BatchGenerator, BatchProgress, FileStatus, GeneratedTest,
};
use testgen_client::orchestrator::context_selection::ContextSelection;
use testgen_client::orchestrator::WorkflowError;
use tokio::sync::watch;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

// ============================================
// Batch generation
// ============================================

#[tokio::test]
async fn test_failed_file_does_not_stop_the_batch() {
    let (server, client) = mock_backend().await;

    mount_source(&server, "/srv/uploads/9/src/Order.java", "class Order {}").await;
    mount_unreadable(&server, "/srv/uploads/9/src/Broken.java", 500).await;
    mount_source(&server, "/srv/uploads/9/src/Money.java", "class Money {}").await;

    Mock::given(method("POST"))
        .and(path("/generate-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_string("class GeneratedTest {}"))
        .expect(2)
        .mount(&server)
        .await;

    let files = vec![
        "/srv/uploads/9/src/Order.java".to_string(),
        "/srv/uploads/9/src/Broken.java".to_string(),
        "/srv/uploads/9/src/Money.java".to_string(),
    ];
    let generator = BatchGenerator::new(client, generation_options());
    let outcome = generator.run(&files, &ContextSelection::new()).await;

    let statuses: Vec<_> = outcome.progress.files.iter().map(|f| f.status).collect();
    assert_eq!(
        statuses,
        vec![FileStatus::Completed, FileStatus::Error, FileStatus::Completed]
    );
    assert_eq!(outcome.progress.files[1].message, "Failed to generate");
    assert_eq!(outcome.progress.current, 3);
    assert!(outcome.progress.is_finished());

    let names: Vec<_> = outcome.tests.keys().cloned().collect();
    assert_eq!(names, vec!["MoneyTest.java", "OrderTest.java"]);
    assert_eq!(
        outcome.tests["OrderTest.java"].original_file,
        "/srv/uploads/9/src/Order.java"
    );
}

#[tokio::test]
async fn test_request_uses_upload_relative_name_and_context() {
    let (server, client) = mock_backend().await;

    mount_source(&server, "/srv/uploads/9/src/Order.java", "class Order {}").await;
    mount_source(&server, "/srv/uploads/9/src/OrderRepository.java", "interface OrderRepository {}").await;

    Mock::given(method("POST"))
        .and(path("/generate-tests"))
        .and(body_partial_json(json!({
            "fileName": "9/src/Order.java",
            "code": "class Order {}",
            "context": { "OrderRepository.java": "interface OrderRepository {}" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("class OrderTest {}"))
        .expect(1)
        .mount(&server)
        .await;

    let target = "/srv/uploads/9/src/Order.java".to_string();
    let mut selection = ContextSelection::new();
    selection.track(&target);
    selection.add(&target, ["/srv/uploads/9/src/OrderRepository.java"]);

    let generator = BatchGenerator::new(client, generation_options());
    let outcome = generator.run(&[target], &selection).await;

    assert_eq!(outcome.progress.count(FileStatus::Completed), 1);
    assert_eq!(outcome.tests["OrderTest.java"].content, "class OrderTest {}");
}

#[tokio::test]
async fn test_progress_is_published_on_the_channel() {
    let (server, client) = mock_backend().await;

    mount_source(&server, "/srv/uploads/1/A.java", "class A {}").await;
    mount_source(&server, "/srv/uploads/1/B.java", "class B {}").await;
    Mock::given(method("POST"))
        .and(path("/generate-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_string("class T {}"))
        .mount(&server)
        .await;

    let files = vec!["/srv/uploads/1/A.java".to_string(), "/srv/uploads/1/B.java".to_string()];
    let (tx, mut rx) = watch::channel(BatchProgress::default());

    let watcher = tokio::spawn(async move {
        let mut snapshots = Vec::new();
        while rx.changed().await.is_ok() {
            snapshots.push(rx.borrow_and_update().clone());
        }
        snapshots
    });

    let generator = BatchGenerator::new(client, generation_options());
    let outcome = generator.run_with_progress(&files, &ContextSelection::new(), &tx).await;
    drop(tx);
    let snapshots = watcher.await.unwrap();

    assert!(!snapshots.is_empty());
    assert_eq!(snapshots.last().unwrap(), &outcome.progress);
    assert_eq!(outcome.progress.count(FileStatus::Completed), 2);
    assert!(snapshots
        .iter()
        .any(|p| p.files[0].status == FileStatus::Processing || p.files[0].status == FileStatus::Completed));
}

#[tokio::test]
async fn test_default_batch_finishes_each_file_before_the_next() {
    let (server, client) = mock_backend().await;

    mount_source(&server, "/srv/uploads/4/A.java", "class A {}").await;
    mount_source(&server, "/srv/uploads/4/B.java", "class B {}").await;
    Mock::given(method("POST"))
        .and(path("/generate-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_string("class T {}"))
        .expect(2)
        .mount(&server)
        .await;

    let files = vec!["/srv/uploads/4/A.java".to_string(), "/srv/uploads/4/B.java".to_string()];
    let generator = BatchGenerator::new(client, generation_options());
    generator.run(&files, &ContextSelection::new()).await;

    let order: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| match r.url.path() {
            "/read-file" => {
                let file = r
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "path")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                format!("read {}", file.rsplit('/').next().unwrap_or_default())
            }
            "/generate-tests" => {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                format!("generate {}", body["fileName"].as_str().unwrap())
            }
            other => other.to_string(),
        })
        .collect();

    assert_eq!(
        order,
        vec!["read A.java", "generate 4/A.java", "read B.java", "generate 4/B.java"]
    );
}

#[tokio::test]
async fn test_concurrent_batch_keeps_file_order() {
    let (server, client) = mock_backend().await;

    let files: Vec<String> = (1..=4).map(|i| format!("/srv/uploads/2/C{}.java", i)).collect();
    for file in &files {
        mount_source(&server, file, "class C {}").await;
    }
    Mock::given(method("POST"))
        .and(path("/generate-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_string("class CTest {}"))
        .expect(4)
        .mount(&server)
        .await;

    let generator = BatchGenerator::new(client, generation_options()).with_concurrency(3);
    let outcome = generator.run(&files, &ContextSelection::new()).await;

    let names: Vec<_> = outcome.progress.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["C1.java", "C2.java", "C3.java", "C4.java"]);
    assert_eq!(outcome.progress.count(FileStatus::Completed), 4);
    assert_eq!(outcome.progress.current, 4);
}

// ============================================
// Single file and fix
// ============================================

#[tokio::test]
async fn test_generate_single_uses_file_name() {
    let (server, client) = mock_backend().await;

    Mock::given(method("POST"))
        .and(path("/generate-tests"))
        .and(body_partial_json(json!({"fileName": "Order.java"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("class OrderTest {}"))
        .expect(1)
        .mount(&server)
        .await;

    let generator = BatchGenerator::new(client, generation_options());
    let test = generator
        .generate_single("/srv/uploads/9/src/Order.java", "class Order {}", &[])
        .await
        .unwrap();

    assert_eq!(test.file_name, "OrderTest.java");
    let bodies = request_bodies(&server, "/generate-tests").await;
    assert!(bodies[0].get("context").is_none());
}

#[tokio::test]
async fn test_fix_rejects_empty_error_without_a_request() {
    let (server, client) = mock_backend().await;

    let generator = BatchGenerator::new(client, generation_options());
    let test = GeneratedTest {
        file_name: "OrderTest.java".to_string(),
        content: "class OrderTest {}".to_string(),
        original_file: "Order.java".to_string(),
    };

    let result = generator.fix(&test, "   ").await;

    assert!(matches!(result, Err(WorkflowError::InvalidInput(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fix_replaces_content() {
    let (server, client) = mock_backend().await;

    Mock::given(method("POST"))
        .and(path("/fix-code"))
        .and(body_partial_json(json!({
            "fileName": "OrderTest.java",
            "error": "cannot find symbol: Money"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("import x.Money;\nclass OrderTest {}"))
        .expect(1)
        .mount(&server)
        .await;

    let generator = BatchGenerator::new(client, generation_options());
    let test = GeneratedTest {
        file_name: "OrderTest.java".to_string(),
        content: "class OrderTest {}".to_string(),
        original_file: "Order.java".to_string(),
    };

    let fixed = generator.fix(&test, "cannot find symbol: Money").await.unwrap();
    assert!(fixed.content.starts_with("import x.Money;"));
    assert_eq!(fixed.file_name, test.file_name);
}

#[tokio::test]
async fn test_fix_failure_surfaces_backend_message() {
    let (server, client) = mock_backend().await;

    Mock::given(method("POST"))
        .and(path("/fix-code"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let generator = BatchGenerator::new(client, generation_options());
    let test = GeneratedTest {
        file_name: "OrderTest.java".to_string(),
        content: "class OrderTest {}".to_string(),
        original_file: "Order.java".to_string(),
    };

    let err = generator.fix(&test, "NPE on line 3").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to fix code");
}
