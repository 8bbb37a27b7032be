//! Scenario tests for whole reconciliation passes
//!
//! Each test sets up a repository in the in-memory GitHub, runs the engine
//! the way a trigger would, and checks both the report and the resulting
//! server-side state.

use pretty_assertions::assert_eq;
use reposync_core::sync::reconcile;
use reposync_core::{
    Change, ChangeAction, CurrentState, PassOutcome, ReadError, RetryPolicy, SyncEngine,
};
use reposync_github::GitHubApi;
use reposync_meta::{BranchProtectionRule, Category, CollaboratorEntry, Label, Permission};
use reposync_test_utils::fixtures::{config, fresh_repo, repo_id};
use reposync_test_utils::{FakeGitHub, FakeRepo, Op};

fn engine() -> SyncEngine {
    SyncEngine::new(RetryPolicy::immediate(2))
}

async fn snapshot(github: &FakeGitHub, repo: &str, desired: &reposync_meta::RepoConfig) -> CurrentState {
    // a plan run only reads; read the state back through the API the same way
    let repo = repo_id(repo);
    let info = github.get_repository(&repo).await.unwrap();
    let mut current = CurrentState::new(info);
    if desired.labels.is_some() {
        current.labels = Some(github.list_labels(&repo).await.unwrap());
    }
    if desired.collaborators.is_some() {
        let mut entries = github.list_collaborators(&repo).await.unwrap();
        entries.extend(github.list_teams(&repo).await.unwrap());
        current.collaborators = Some(entries);
    }
    current
}

// =============================================================================
// Label scenarios
// =============================================================================

#[tokio::test]
async fn test_missing_label_is_created_once() {
    let github = FakeGitHub::new().with_repo(&repo_id("acme/widgets"), FakeRepo::new("main"));
    let desired = config("labels:\n  - name: bug\n    color: d73a4a\n");

    let plan = reconcile(&snapshot(&github, "acme/widgets", &desired).await, &desired);

    assert_eq!(plan.len(), 1);
    let op = &plan.operations[0];
    assert_eq!(op.action, ChangeAction::Create);
    match &op.change {
        Change::Label { desired, previous: None } => {
            assert_eq!(desired.name, "bug");
            assert_eq!(desired.color, "d73a4a");
        }
        other => panic!("unexpected change {other:?}"),
    }
}

#[tokio::test]
async fn test_labels_off_the_deny_list_survive() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(
        &repo,
        fresh_repo().with_label("area: api", "0e8a16", "API surface"),
    );
    let desired = config("labels:\n  - name: bug\n    color: d73a4a\n");

    let report = engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();

    assert!(report.is_success());
    let names: Vec<String> = github.repo(&repo).labels.into_iter().map(|l| l.name).collect();
    assert!(names.contains(&"area: api".to_string()), "custom label deleted: {names:?}");
    assert!(names.contains(&"bug".to_string()));
    assert!(!names.contains(&"wontfix".to_string()));
    for call in github.writes(&repo) {
        assert_ne!((call.op, call.target.as_str()), (Op::DeleteLabel, "area: api"));
    }
}

#[tokio::test]
async fn test_additive_policy_never_deletes() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());
    let desired = config("labelPolicy: additive\nlabels:\n  - name: triage\n    color: fbca04\n");

    engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();

    assert_eq!(github.count(Op::DeleteLabel), 0);
    assert_eq!(github.repo(&repo).labels.len(), 10);
}

#[tokio::test]
async fn test_label_recolor_and_rename_case() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(
        &repo,
        FakeRepo::new("main").with_label("Bug", "ee0701", "Broken"),
    );
    let desired = config("labels:\n  - name: bug\n    color: d73a4a\n");

    let report = engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();

    assert_eq!(report.items_attempted(), 1);
    let labels = github.repo(&repo).labels;
    assert_eq!(
        labels,
        vec![Label {
            name: "bug".into(),
            color: "d73a4a".into(),
            description: Some("Broken".into()),
        }]
    );
}

// =============================================================================
// Collaborators
// =============================================================================

#[tokio::test]
async fn test_collaborator_permission_is_raised() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(
        &repo,
        FakeRepo::new("main").with_collaborator(CollaboratorEntry::user("alice", Permission::Read)),
    );
    let desired = config("permissionRules:\n  - user: alice\n    permission: write\n");

    let plan = reconcile(&snapshot(&github, "acme/widgets", &desired).await, &desired);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.operations[0].action, ChangeAction::Update);
    assert_eq!(plan.operations[0].describe(), "change alice from read to write");

    engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();
    assert_eq!(
        github.repo(&repo).collaborators,
        vec![CollaboratorEntry::user("alice", Permission::Write)]
    );
}

// =============================================================================
// Branch protection
// =============================================================================

#[tokio::test]
async fn test_unlisted_protection_is_left_alone() {
    let repo = repo_id("acme/widgets");
    let mut release = BranchProtectionRule::new("release");
    release.allows_deletions = false;
    release.required_approving_review_count = 3;
    let github = FakeGitHub::new().with_repo(
        &repo,
        FakeRepo::new("main").with_branch("release").with_protection(release.clone()),
    );
    let desired = config("branchProtectionRules:\n  - pattern: main\n    requiresLinearHistory: true\n");

    let report = engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();

    assert!(report.is_success());
    let writes = github.writes(&repo);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].target, "main");
    assert_eq!(github.repo(&repo).protection.get("release"), Some(&release.normalized()));
}

// =============================================================================
// Whole-pass behavior
// =============================================================================

#[tokio::test]
async fn test_absent_config_reports_no_config() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());

    let report = engine().reconcile(&github, &repo, None, None).await.unwrap();

    assert_eq!(report.outcome, PassOutcome::NoConfig);
    assert_eq!(report.items_attempted(), 0);
    assert_eq!(report.summary(), "acme/widgets: no config, nothing to sync");
}

#[tokio::test]
async fn test_not_found_read_fails_before_any_write() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());
    github.fail_next(
        Op::ListCollaborators,
        1,
        reposync_github::Error::status("GET", "/repos/acme/widgets/collaborators", 404, "Not Found"),
    );
    let desired = config("topics: [x]\npermissionRules:\n  - team: core\n    permission: read\n");

    let err = engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap_err();

    assert!(matches!(err, ReadError::Inaccessible { status: 404, .. }));
    assert!(github.writes(&repo).is_empty());
    assert_eq!(github.count(Op::ReplaceTopics), 0);
}

#[tokio::test]
async fn test_failure_in_one_category_does_not_block_later_ones() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, FakeRepo::new("main"));
    github.fail_next(
        Op::ReplaceTopics,
        5,
        reposync_github::Error::status("PUT", "/repos/acme/widgets/topics", 503, "Unavailable"),
    );
    let desired = config(
        "topics: [x]\nlabels:\n  - name: a\n    color: aaaaaa\n  - name: b\n    color: bbbbbb\n",
    );

    let report = engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();

    let settings = report.category(Category::GeneralSettings).unwrap();
    assert_eq!(settings.errors.len(), 1);
    assert_eq!(settings.errors[0].class, "server");
    // the retry budget of two attempts was spent
    assert_eq!(github.count(Op::ReplaceTopics), 2);
    let labels = report.category(Category::Labels).unwrap();
    assert_eq!((labels.items_attempted, labels.items_succeeded), (2, 2));
}
