//! Full passes over the REST client against a mock GitHub API

use httpmock::prelude::*;
use reposync_core::{
    EventHandler, HandlerOutcome, PassOutcome, ReadError, RetryPolicy, SyncEngine, TriggerEvent,
};
use reposync_github::RestClient;
use reposync_meta::DEFAULT_CONFIG_PATH;
use reposync_test_utils::fixtures::{config, repo_id};
use serde_json::json;

fn client(server: &MockServer) -> RestClient {
    RestClient::with_base_url("test-token", &server.base_url()).unwrap()
}

fn repository_body() -> serde_json::Value {
    json!({
        "description": "Widgets",
        "homepage": "",
        "has_issues": true,
        "has_wiki": false,
        "has_projects": false,
        "default_branch": "main",
        "archived": false
    })
}

#[tokio::test]
async fn test_label_create_pass() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/widgets");
            then.status(200).json_body(repository_body());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/acme/widgets/labels")
                .query_param("page", "1");
            then.status(200)
                .json_body(json!([{"name": "wontfix", "color": "ffffff", "description": null}]));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/repos/acme/widgets/labels")
                .json_body(json!({"name": "bug", "color": "d73a4a"}));
            then.status(201).json_body(json!({"name": "bug", "color": "d73a4a"}));
        })
        .await;

    let desired = config("labelPolicy: additive\nlabels:\n  - name: bug\n    color: d73a4a\n");
    let report = SyncEngine::new(RetryPolicy::none())
        .reconcile(&client(&server), &repo_id("acme/widgets"), Some(&desired), None)
        .await
        .unwrap();

    create.assert_async().await;
    assert_eq!(report.outcome, PassOutcome::Completed);
    assert!(report.is_success());
    assert_eq!(report.items_succeeded(), 1);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries_and_abort() {
    let server = MockServer::start_async().await;
    let repo = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/widgets");
            then.status(502).json_body(json!({"message": "Bad Gateway"}));
        })
        .await;

    let err = SyncEngine::new(RetryPolicy::immediate(3))
        .reconcile(
            &client(&server),
            &repo_id("acme/widgets"),
            Some(&config("description: x\n")),
            None,
        )
        .await
        .unwrap_err();

    repo.assert_hits_async(3).await;
    assert!(matches!(err, ReadError::Unavailable { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_push_event_reads_config_from_repository() {
    let server = MockServer::start_async().await;
    let contents = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("/repos/acme/widgets/contents/{DEFAULT_CONFIG_PATH}"));
            then.status(200).json_body(json!({
                "content": "dG9waWNzOiBbcnVzdF0K\n",
                "encoding": "base64"
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/widgets");
            then.status(200).json_body(repository_body());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/widgets/topics");
            then.status(200).json_body(json!({"names": []}));
        })
        .await;
    let replace = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/repos/acme/widgets/topics")
                .json_body(json!({"names": ["rust"]}));
            then.status(200).json_body(json!({"names": ["rust"]}));
        })
        .await;

    let payload = json!({
        "ref": "refs/heads/main",
        "commits": [{"added": [DEFAULT_CONFIG_PATH]}],
        "repository": {"name": "widgets", "owner": {"login": "acme"}, "default_branch": "main"},
        "installation": {"id": 1}
    });
    let event = TriggerEvent::parse("push", &payload.to_string()).unwrap();
    let handler = EventHandler::new(SyncEngine::new(RetryPolicy::none()), DEFAULT_CONFIG_PATH);

    let outcome = handler.handle(&client(&server), &event).await.unwrap();

    contents.assert_async().await;
    replace.assert_async().await;
    match outcome {
        HandlerOutcome::Synced(report) => {
            assert!(report.is_success());
            assert_eq!(report.default_branch.as_deref(), Some("main"));
        }
        other => panic!("expected a sync, got {other:?}"),
    }
}
