use super::{json, mock_backend};
use testgen_client::api::dto::TimeRange;
use testgen_client::orchestrator::dashboard::{ChangeType, DashboardSnapshot};
use testgen_client::orchestrator::history::delete_many;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_dashboard(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/dashboard/stats"))
        .and(query_param("timeRange", "7d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalTests": 50,
            "successfulTests": 40,
            "failedTests": 10,
            "avgGenerationTime": 3.0,
            "testCoverage": 80.0,
            "activeProjects": 3,
            "testsToday": 4,
            "testsThisWeek": 20
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/stats"))
        .and(query_param("timeRange", "14d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalTests": 40,
            "successfulTests": 36,
            "failedTests": 4,
            "avgGenerationTime": 4.0,
            "testCoverage": 80.0
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/trends"))
        .and(query_param("timeRange", "7d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"date": "2025-04-01", "successful": 5, "failed": 1, "total": 6}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/coverage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"className": "Order", "coverage": 81.5, "methods": 10, "testedMethods": 8}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_snapshot_without_jenkins() {
    let (server, client) = mock_backend().await;
    mount_dashboard(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/jenkins/test-results"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let snapshot = DashboardSnapshot::load(&client, TimeRange::Week).await.unwrap();

    assert!(snapshot.jenkins.is_none());
    assert_eq!(snapshot.trends.len(), 1);
    assert_eq!(snapshot.coverage[0].tested_methods, 8);
    assert_eq!(snapshot.success_rate(), 80);
    assert_eq!(snapshot.previous_success_rate(), 90);

    let cards = snapshot.cards();
    assert_eq!(cards.len(), 8);

    let total = &cards[0];
    assert_eq!(total.title, "Total Tests Generated");
    assert_eq!(total.change, Some(25));
    assert_eq!(total.change_type, ChangeType::Positive);

    let rate = cards.iter().find(|c| c.title == "Success Rate").unwrap();
    assert_eq!(rate.change_type, ChangeType::Negative);

    // Faster generation is an improvement.
    let time = cards
        .iter()
        .find(|c| c.title == "Avg Generation Time")
        .unwrap();
    assert_eq!(time.change, Some(-25));
    assert_eq!(time.change_type, ChangeType::Positive);
}

#[tokio::test]
async fn test_jenkins_results_override_success_rate() {
    let (server, client) = mock_backend().await;
    mount_dashboard(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/jenkins/test-results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "test_results": [
                {"build_number": 21, "totalCount": 200, "failCount": 10, "passCount": 190}
            ]
        })))
        .mount(&server)
        .await;

    let snapshot = DashboardSnapshot::load(&client, TimeRange::Week).await.unwrap();

    let overlay = snapshot.jenkins.unwrap();
    assert_eq!(overlay.total_count, 200);
    assert_eq!(overlay.success_rate, 95);
    assert_eq!(snapshot.success_rate(), 95);
}

#[tokio::test]
async fn test_snapshot_fails_when_stats_fail() {
    let (server, client) = mock_backend().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/trends"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/coverage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = DashboardSnapshot::load(&client, TimeRange::Month).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to get dashboard stats");
}

// ============================================
// History bulk delete
// ============================================

#[tokio::test]
async fn test_bulk_delete_removes_every_id() {
    let (server, client) = mock_backend().await;

    for id in [3, 5, 8] {
        Mock::given(method("DELETE"))
            .and(path(format!("/tests/{}", id)))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    delete_many(&client, &[3, 5, 8]).await.unwrap();
}

#[tokio::test]
async fn test_bulk_delete_reports_failure() {
    let (server, client) = mock_backend().await;

    Mock::given(method("DELETE"))
        .and(path("/tests/3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/tests/4"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = delete_many(&client, &[3, 4]).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}
