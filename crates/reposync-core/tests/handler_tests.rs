//! Trigger events handled end to end against the in-memory GitHub

use pretty_assertions::assert_eq;
use reposync_core::{
    CONFIG_CHECK_NAME, Error, EventError, EventHandler, HandlerOutcome, INVALID_CONFIG_ISSUE_TITLE,
    PassOutcome, RetryPolicy, SyncEngine, TriggerEvent, load_remote_config,
};
use reposync_github::CheckConclusion;
use reposync_meta::{ConfigError, DEFAULT_CONFIG_PATH};
use reposync_test_utils::fixtures::{FULL_CONFIG, fresh_repo, repo_id};
use reposync_test_utils::{FakeGitHub, Op};
use serde_json::json;

fn handler() -> EventHandler {
    EventHandler::new(SyncEngine::new(RetryPolicy::immediate(2)), DEFAULT_CONFIG_PATH)
}

fn push_event() -> TriggerEvent {
    let payload = json!({
        "ref": "refs/heads/main",
        "commits": [{"modified": [DEFAULT_CONFIG_PATH]}],
        "repository": {"name": "widgets", "owner": {"login": "acme"}, "default_branch": "main"},
        "installation": {"id": 42}
    });
    TriggerEvent::parse("push", &payload.to_string()).unwrap()
}

#[tokio::test]
async fn test_push_with_valid_config_syncs() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo().with_file(DEFAULT_CONFIG_PATH, FULL_CONFIG));

    let outcome = handler().handle(&github, &push_event()).await.unwrap();

    let HandlerOutcome::Synced(report) = outcome else {
        panic!("expected a sync, got {outcome:?}");
    };
    assert_eq!(report.outcome, PassOutcome::Completed);
    assert!(report.is_success());
    assert_eq!(github.repo(&repo).topics, vec!["rust", "widgets"]);
}

#[tokio::test]
async fn test_push_without_config_file_is_no_config_pass() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());

    let outcome = handler().handle(&github, &push_event()).await.unwrap();

    assert!(matches!(
        outcome,
        HandlerOutcome::Synced(ref r) if r.outcome == PassOutcome::NoConfig
    ));
    assert!(github.writes(&repo).is_empty());
}

#[tokio::test]
async fn test_invalid_config_opens_one_issue_and_refreshes_it() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(
        &repo,
        fresh_repo().with_file(DEFAULT_CONFIG_PATH, "labels:\n  - name: bug\n    colour: red\n"),
    );
    let handler = handler();

    let first = handler.handle(&github, &push_event()).await.unwrap();
    let HandlerOutcome::ConfigRejected { issue, error, .. } = first else {
        panic!("expected rejection, got {first:?}");
    };
    assert!(matches!(error, ConfigError::Schema { .. }));

    let second = handler.handle(&github, &push_event()).await.unwrap();
    assert!(matches!(second, HandlerOutcome::ConfigRejected { issue: n, .. } if n == issue));

    let state = github.repo(&repo);
    assert_eq!(state.issues.len(), 1);
    assert_eq!(state.issues[0].title, INVALID_CONFIG_ISSUE_TITLE);
    assert!(state.issues[0].body.contains("does not match the settings schema"));
    assert_eq!(github.count(Op::CreateIssue), 1);
    assert_eq!(github.count(Op::UpdateIssue), 1);
    // labels were never touched
    assert_eq!(github.count(Op::ListLabels), 0);
}

fn pull_request_event(number: u64) -> TriggerEvent {
    let payload = json!({
        "action": "synchronize",
        "number": number,
        "pull_request": {"head": {"sha": "deadbeef"}},
        "repository": {"name": "widgets", "owner": {"login": "acme"}},
        "installation": {"id": 42}
    });
    TriggerEvent::parse("pull_request", &payload.to_string()).unwrap()
}

#[tokio::test]
async fn test_pull_request_validates_without_writing() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(
        &repo,
        fresh_repo()
            .with_file(DEFAULT_CONFIG_PATH, "topics: [ok\n")
            .with_pull_request(9, &["README.md", DEFAULT_CONFIG_PATH]),
    );

    let outcome = handler().handle(&github, &pull_request_event(9)).await.unwrap();

    let HandlerOutcome::Validated { pull_request, result, .. } = outcome else {
        panic!("expected validation, got {outcome:?}");
    };
    assert_eq!(pull_request, 9);
    assert!(matches!(result, Err(ConfigError::Syntax { .. })));

    // the only write is the verdict on the head commit
    let writes = github.writes(&repo);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].op, Op::CreateCheckRun);
    let runs = github.repo(&repo).check_runs;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].name, CONFIG_CHECK_NAME);
    assert_eq!(runs[0].head_sha, "deadbeef");
    assert_eq!(runs[0].conclusion, CheckConclusion::Failure);
    assert!(runs[0].summary.contains("could not be parsed as YAML"));
}

#[tokio::test]
async fn test_pull_request_with_valid_config_gets_passing_check() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(
        &repo,
        fresh_repo()
            .with_file(DEFAULT_CONFIG_PATH, FULL_CONFIG)
            .with_pull_request(4, &[DEFAULT_CONFIG_PATH]),
    );

    let outcome = handler().handle(&github, &pull_request_event(4)).await.unwrap();

    assert!(matches!(outcome, HandlerOutcome::Validated { result: Ok(()), .. }));
    let runs = github.repo(&repo).check_runs;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].conclusion, CheckConclusion::Success);
    // validation never reconciles
    assert_eq!(github.count(Op::ListLabels), 0);
}

#[tokio::test]
async fn test_pull_request_not_touching_config_is_skipped() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(
        &repo,
        fresh_repo()
            .with_file(DEFAULT_CONFIG_PATH, "topics: [ok\n")
            .with_pull_request(9, &["src/main.rs"]),
    );

    let outcome = handler().handle(&github, &pull_request_event(9)).await.unwrap();

    assert!(matches!(outcome, HandlerOutcome::Skipped { .. }), "got {outcome:?}");
    assert_eq!(github.count(Op::GetFileContents), 0);
    assert!(github.writes(&repo).is_empty());
}

#[tokio::test]
async fn test_event_without_installation_is_rejected() {
    let github = FakeGitHub::new();
    let payload = json!({
        "cron_org": "acme",
        "repository": {"name": "widgets", "owner": {"login": "acme"}}
    });
    let event = TriggerEvent::parse("schedule.repository", &payload.to_string()).unwrap();

    let err = handler().handle(&github, &event).await.unwrap_err();

    assert!(matches!(err, Error::Event(EventError::MissingInstallation { .. })));
    assert!(github.calls().is_empty());
}

#[tokio::test]
async fn test_load_remote_config_distinguishes_missing_and_invalid() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo().with_file("bad.yaml", "topics: [ok\n"));
    let retry = RetryPolicy::none();

    let missing = load_remote_config(&github, &retry, &repo, "absent.yaml", None)
        .await
        .unwrap();
    assert!(missing.is_none());

    let err = load_remote_config(&github, &retry, &repo, "bad.yaml", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Syntax { .. })), "got {err:?}");
}
