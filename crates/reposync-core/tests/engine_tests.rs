//! Reconciliation passes against the in-memory GitHub

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use reposync_core::{
    ChangeAction, JobError, PassOutcome, ReadError, RetryPolicy, SyncEngine, SyncJob,
};
use reposync_github::{Error as ApiError, GitHubApi};
use reposync_meta::{BranchProtectionRule, Category, CollaboratorEntry, Permission, Principal};
use reposync_test_utils::fixtures::{config, fresh_repo, full_config, repo_id};
use reposync_test_utils::{FakeGitHub, FakeRepo, Op};

fn engine() -> SyncEngine {
    SyncEngine::new(RetryPolicy::immediate(3))
}

fn server_error() -> ApiError {
    ApiError::status("PATCH", "/repos/acme/widgets", 502, "Bad Gateway")
}

#[tokio::test]
async fn test_full_config_on_fresh_repository() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());

    let report = engine()
        .reconcile(&github, &repo, Some(&full_config()), None)
        .await
        .unwrap();

    assert_eq!(report.outcome, PassOutcome::Completed);
    assert!(report.is_success(), "failures: {:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(report.default_branch.as_deref(), Some("main"));
    assert_eq!(
        report.categories.iter().map(|c| c.category).collect::<Vec<_>>(),
        Category::ALL.to_vec()
    );
    // settings + topics, one rule, one create + eight default deletions, two grants
    assert_eq!(report.items_attempted(), 14);

    let state = github.repo(&repo);
    assert_eq!(state.settings.description.as_deref(), Some("Widgets for everyone"));
    assert_eq!(state.settings.allow_merge_commit, Some(false));
    assert_eq!(state.topics, vec!["rust", "widgets"]);
    let rule = state.protection.get("main").unwrap();
    assert_eq!(rule.required_approving_review_count, 1);
    assert_eq!(rule.status_check_contexts, vec!["ci/test"]);
    let mut labels: Vec<_> = state.labels.iter().map(|l| l.name.as_str()).collect();
    labels.sort();
    assert_eq!(labels, vec!["bug", "type: cleanup"]);
    assert!(state.teams.iter().any(|t| t.principal == Principal::team("core")
        && t.permission == Permission::Maintain));
    assert!(state.collaborators.iter().any(|c| c.principal == Principal::user("alice")
        && c.permission == Permission::Write));
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());
    let engine = engine();
    let desired = full_config();

    engine.reconcile(&github, &repo, Some(&desired), None).await.unwrap();
    github.clear_calls();

    let plan = engine.plan(&github, &repo, &desired, None).await.unwrap();
    assert!(plan.is_empty(), "unexpected operations: {:?}", plan.operations);

    let report = engine.reconcile(&github, &repo, Some(&desired), None).await.unwrap();
    assert_eq!(report.items_attempted(), 0);
    assert!(github.writes(&repo).is_empty());
}

#[tokio::test]
async fn test_missing_config_touches_nothing() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());

    let report = engine().reconcile(&github, &repo, None, None).await.unwrap();

    assert_eq!(report.outcome, PassOutcome::NoConfig);
    assert!(report.categories.is_empty());
    assert!(github.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_repository_aborts_without_writes() {
    let repo = repo_id("acme/missing");
    let github = FakeGitHub::new();

    let err = engine()
        .reconcile(&github, &repo, Some(&full_config()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ReadError::Inaccessible { status: 404, .. }), "got {err:?}");
    assert!(github.writes(&repo).is_empty());
}

#[tokio::test]
async fn test_read_failure_after_retries_is_unavailable() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());
    github.fail_next(Op::ListLabels, 3, server_error());

    let err = engine()
        .reconcile(&github, &repo, Some(&full_config()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ReadError::Unavailable { .. }), "got {err:?}");
    assert_eq!(github.count(Op::ListLabels), 3);
    assert!(github.writes(&repo).is_empty());
}

#[tokio::test]
async fn test_archived_repository_skips_every_category() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo().archived());

    let report = engine()
        .reconcile(&github, &repo, Some(&full_config()), None)
        .await
        .unwrap();

    assert_eq!(report.outcome, PassOutcome::Archived);
    assert_eq!(report.skipped_categories, Category::ALL.to_vec());
    assert!(github.writes(&repo).is_empty());
    assert_eq!(report.summary(), "acme/widgets: archived, skipped");
}

#[tokio::test]
async fn test_failed_operation_does_not_stop_the_pass() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());
    github.fail_target(
        Op::CreateLabel,
        "type: cleanup",
        1,
        ApiError::status("POST", "/repos/acme/widgets/labels", 422, "Validation Failed"),
    );

    let report = engine()
        .reconcile(&github, &repo, Some(&full_config()), None)
        .await
        .unwrap();

    assert!(!report.is_success());
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    let (category, failure) = failures[0];
    assert_eq!(category, Category::Labels);
    assert_eq!(failure.key, "type: cleanup");
    assert_eq!(failure.action, ChangeAction::Create);
    assert_eq!(failure.class, "validation");
    // validation errors are permanent
    assert_eq!(github.count(Op::CreateLabel), 1);

    let labels = report.category(Category::Labels).unwrap();
    assert_eq!((labels.items_attempted, labels.items_succeeded), (9, 8));
    let collaborators = report.category(Category::Collaborators).unwrap();
    assert!(collaborators.is_success());
    assert_eq!(collaborators.items_succeeded, 2);
}

#[tokio::test]
async fn test_transient_write_failure_is_retried() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());
    github.fail_next(Op::UpdateRepository, 2, server_error());

    let report = engine()
        .reconcile(&github, &repo, Some(&config("description: Retried\n")), None)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(github.count(Op::UpdateRepository), 3);
    assert_eq!(
        github.repo(&repo).settings.description.as_deref(),
        Some("Retried")
    );
}

#[tokio::test]
async fn test_missing_default_branch_is_skipped_not_failed() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());

    let report = engine()
        .reconcile(
            &github,
            &repo,
            Some(&config("defaultBranch: trunk\ndescription: Widgets\n")),
            None,
        )
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "default_branch");
    let state = github.repo(&repo);
    assert_eq!(state.settings.default_branch.as_deref(), Some("main"));
    assert_eq!(state.settings.description.as_deref(), Some("Widgets"));
}

#[tokio::test]
async fn test_default_branch_hint_counts_as_existing() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, FakeRepo::new("main").with_branch("develop"));

    let desired = config(
        "branchProtectionRules:\n  - pattern: develop\n    requiredApprovingReviewCount: 2\n",
    );
    let report = engine()
        .reconcile(&github, &repo, Some(&desired), Some("develop"))
        .await
        .unwrap();

    assert_eq!(report.default_branch.as_deref(), Some("develop"));
    assert!(report.is_success());
    assert_eq!(
        github.repo(&repo).protection.get("develop").map(|r| r.required_approving_review_count),
        Some(2)
    );
}

#[tokio::test]
async fn test_protection_for_missing_branch_is_skipped() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo());

    let desired = config("branchProtectionRules:\n  - pattern: release\n    isAdminEnforced: true\n");
    let report = engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();

    assert_eq!(report.items_attempted(), 0);
    assert_eq!(report.skipped[0].category, Category::BranchProtection);
    assert_eq!(report.skipped[0].key, "release");
    assert_eq!(github.count(Op::GetBranchProtection), 0);
}

#[tokio::test]
async fn test_existing_protection_is_updated_in_place() {
    let repo = repo_id("acme/widgets");
    let mut existing = BranchProtectionRule::new("main");
    existing.required_approving_review_count = 2;
    existing.is_admin_enforced = true;
    let github = FakeGitHub::new().with_repo(&repo, fresh_repo().with_protection(existing));

    let desired = config("branchProtectionRules:\n  - pattern: main\n    requiredApprovingReviewCount: 1\n");
    let plan = engine().plan(&github, &repo, &desired, None).await.unwrap();

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.operations[0].action, ChangeAction::Update);
    assert!(github.writes(&repo).is_empty(), "plan must not write");
}

#[tokio::test]
async fn test_collaborators_are_never_revoked() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(
        &repo,
        fresh_repo()
            .with_collaborator(CollaboratorEntry::user("bob", Permission::Admin))
            .with_collaborator(CollaboratorEntry::user("alice", Permission::Read)),
    );

    let desired = config("permissionRules:\n  - user: alice\n    permission: write\n");
    let report = engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();

    assert_eq!(report.items_attempted(), 1);
    let state = github.repo(&repo);
    assert_eq!(state.collaborators.len(), 2);
    assert!(state.collaborators.iter().any(|c| c.principal == Principal::user("bob")
        && c.permission == Permission::Admin));
}

#[tokio::test]
async fn test_passes_on_one_repository_never_overlap() {
    let repo = repo_id("acme/widgets");
    let github = Arc::new(
        FakeGitHub::new()
            .with_repo(&repo, fresh_repo())
            .with_delay(Duration::from_millis(5)),
    );
    let engine = engine();
    let desired = config("labelPolicy: additive\nlabels:\n  - name: a\n    color: aaaaaa\n  - name: b\n    color: bbbbbb\n");

    let jobs: Vec<SyncJob> = (0..3)
        .map(|_| SyncJob {
            repo: repo.clone(),
            config: Some(desired.clone()),
            default_branch: None,
        })
        .collect();
    let client: Arc<dyn GitHubApi> = github.clone();
    let results = engine.reconcile_many(client, jobs).await;

    assert_eq!(results.len(), 3);
    assert_eq!(github.max_concurrent_writes(), 1);
    // first pass creates both labels, later passes find them in place
    assert_eq!(github.count(Op::CreateLabel), 2);
    assert!(results.iter().all(|(_, r)| r.as_ref().is_ok_and(|r| r.is_success())));
}

#[tokio::test]
async fn test_different_repositories_run_in_parallel() {
    let names = ["acme/one", "acme/two", "acme/three", "acme/four"];
    let mut github = FakeGitHub::new().with_delay(Duration::from_millis(20));
    for name in names {
        github = github.with_repo(&repo_id(name), fresh_repo());
    }
    let github = Arc::new(github);

    let mut jobs: Vec<SyncJob> = names
        .iter()
        .map(|name| SyncJob {
            repo: repo_id(name),
            config: Some(config("topics: [parallel]\n")),
            default_branch: None,
        })
        .collect();
    jobs.push(SyncJob {
        repo: repo_id("acme/ghost"),
        config: Some(config("topics: [parallel]\n")),
        default_branch: None,
    });

    let client: Arc<dyn GitHubApi> = github.clone();
    let results = engine().reconcile_many(client, jobs).await;

    let order: Vec<String> = results.iter().map(|(repo, _)| repo.to_string()).collect();
    assert_eq!(order, vec!["acme/one", "acme/two", "acme/three", "acme/four", "acme/ghost"]);
    assert!(results[..4].iter().all(|(_, r)| r.is_ok()));
    assert!(matches!(results[4].1, Err(JobError::Read(ReadError::Inaccessible { .. }))));
    assert!(github.max_in_flight() > 1, "passes ran sequentially");
    for name in names {
        assert_eq!(github.repo(&repo_id(name)).topics, vec!["parallel"]);
    }
}

#[tokio::test]
async fn test_panicking_pass_is_reported_not_dropped() {
    let github = Arc::new(
        FakeGitHub::new()
            .with_repo(&repo_id("acme/one"), fresh_repo())
            .with_repo(&repo_id("acme/broken"), fresh_repo()),
    );
    github.panic_on(&repo_id("acme/broken"));

    let jobs: Vec<SyncJob> = ["acme/broken", "acme/one"]
        .iter()
        .map(|name| SyncJob {
            repo: repo_id(name),
            config: Some(config("topics: [x]\n")),
            default_branch: None,
        })
        .collect();
    let client: Arc<dyn GitHubApi> = github.clone();
    let results = engine().reconcile_many(client, jobs).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, repo_id("acme/broken"));
    assert!(
        matches!(&results[0].1, Err(JobError::Aborted { repo, .. }) if repo == &repo_id("acme/broken")),
        "got {:?}",
        results[0].1
    );
    assert!(results[1].1.as_ref().is_ok_and(|r| r.is_success()));
}

#[tokio::test]
async fn test_pending_invitation_counts_as_granted() {
    let repo = repo_id("acme/widgets");
    let github = FakeGitHub::new().with_repo(
        &repo,
        FakeRepo::new("main")
            .with_invitation(CollaboratorEntry::user("carol", Permission::Write))
            .with_invitation(CollaboratorEntry::user("dave", Permission::Read)),
    );
    let desired = config(
        "permissionRules:\n  - user: carol\n    permission: write\n  - user: dave\n    permission: triage\n",
    );

    let first = engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();
    assert_eq!(first.items_attempted(), 1);
    let writes = github.writes(&repo);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].target, Principal::user("dave").key());

    github.clear_calls();
    let second = engine().reconcile(&github, &repo, Some(&desired), None).await.unwrap();
    assert_eq!(second.items_attempted(), 0);
    assert!(github.writes(&repo).is_empty());
    assert!(github.repo(&repo).collaborators.is_empty());
}
