//! `dbtcloud_repository` through the provider surface, with scripted responses.

use std::sync::Arc;

use dbtcloud_provider::testing::{assert_request_methods, ProviderTester, RecordingTransport};
use dbtcloud_provider::{Client, DbtCloudProvider, ProviderError};
use reqwest::Method;
use serde_json::{json, Value};

const REPOSITORY: &str = "dbtcloud_repository";

fn stored(remote_url: &str, state: i64) -> Value {
    json!({
        "data": {
            "id": 9,
            "account_id": 1,
            "project_id": 3,
            "remote_url": remote_url,
            "state": state,
            "git_clone_strategy": "github_app",
            "repository_credentials_id": null,
            "gitlab_project_id": null,
            "github_installation_id": 4455,
            "deploy_key": {"id": 5, "account_id": 1, "state": 1, "public_key": ""}
        },
        "status": {"code": 200, "is_success": true}
    })
}

fn setup() -> (Arc<RecordingTransport>, ProviderTester<DbtCloudProvider>) {
    let transport = Arc::new(RecordingTransport::new());
    let client = Client::new(transport.clone(), "https://cloud.example/api", 1);
    (transport, ProviderTester::new(DbtCloudProvider::with_client(client)))
}

#[tokio::test]
async fn test_create_github_app_repository() {
    let (transport, tester) = setup();
    for _ in 0..3 {
        transport.respond_with(stored("acme/analytics", 1));
    }

    let state = tester
        .lifecycle_create(
            REPOSITORY,
            json!({
                "project_id": 3,
                "remote_url": "acme/analytics",
                "git_clone_strategy": "github_app",
                "github_installation_id": 4455
            }),
        )
        .await
        .unwrap();

    let body = transport.requests()[0].body.clone().unwrap();
    assert_eq!(body["github_installation_id"], 4455);
    assert_eq!(body["gitlab_project_id"], Value::Null);
    assert_eq!(body["git_clone_strategy"], "github_app");

    assert_eq!(state["id"], "3:9");
    assert_eq!(state["github_installation_id"], 4455);
    assert_eq!(state["is_active"], true);
    assert_eq!(transport.pending(), 0);
}

#[tokio::test]
async fn test_deactivate_then_delete() {
    let (transport, tester) = setup();
    transport.respond_with(stored("acme/analytics", 1));
    transport.respond_with(stored("acme/analytics", 2));
    transport.respond_with(stored("acme/analytics", 2));
    transport.respond_raw(Vec::new());

    let prior = json!({
        "id": "3:9", "project_id": 3, "repository_id": 9,
        "remote_url": "acme/analytics", "is_active": true,
        "git_clone_strategy": "github_app", "github_installation_id": 4455
    });
    let updated = tester
        .update(
            REPOSITORY,
            prior,
            json!({
                "project_id": 3, "remote_url": "acme/analytics", "is_active": false,
                "git_clone_strategy": "github_app", "github_installation_id": 4455
            }),
        )
        .await
        .unwrap();
    assert_eq!(updated["is_active"], false);

    tester.delete(REPOSITORY, updated).await.unwrap();
    assert_request_methods(
        &transport,
        &[Method::GET, Method::POST, Method::GET, Method::DELETE],
    );
}

#[tokio::test]
async fn test_delete_of_missing_repository_fails() {
    let (transport, tester) = setup();
    transport.fail_with(ProviderError::from_remote("resource-not-found: gone"));

    let err = tester
        .delete(REPOSITORY, json!({"id": "3:9"}))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_import_repository() {
    let (transport, tester) = setup();
    transport.respond_with(stored("acme/analytics", 1));

    let imported = tester.import_resource(REPOSITORY, "3:9").await.unwrap();
    assert_eq!(imported[0].state["remote_url"], "acme/analytics");
    assert_eq!(imported[0].state["repository_id"], 9);
    assert_eq!(
        transport.requests()[0].url,
        "https://cloud.example/api/v3/accounts/1/projects/3/repositories/9/"
    );
}
