//! Fixtures shared across crate test suites.

use reposync_meta::{RepoConfig, RepoIdentifier, parse_config};

use crate::fake::FakeRepo;

/// A config touching every category.
pub const FULL_CONFIG: &str = r#"
description: Widgets for everyone
squashMergeAllowed: true
mergeCommitAllowed: false
rebaseMergeAllowed: false
deleteBranchOnMerge: true
topics: [widgets, rust]
branchProtectionRules:
  - pattern: main
    requiredApprovingReviewCount: 1
    requiredStatusCheckContexts: [ci/test]
    isAdminEnforced: true
labels:
  - name: bug
    color: d73a4a
    description: Something isn't working
  - name: "type: cleanup"
    color: c5def5
permissionRules:
  - team: core
    permission: maintain
  - user: alice
    permission: write
"#;

/// Parse `owner/name`.
///
/// # Panics
/// Panics if `full_name` is not a valid identifier.
pub fn repo_id(full_name: &str) -> RepoIdentifier {
    full_name
        .parse()
        .unwrap_or_else(|e| panic!("invalid fixture repository {full_name}: {e}"))
}

/// Parse a config fixture.
///
/// # Panics
/// Panics if the text is invalid or empty.
pub fn config(text: &str) -> RepoConfig {
    parse_config("fixture.yaml", text)
        .unwrap_or_else(|e| panic!("invalid fixture config: {e}"))
        .unwrap_or_else(|| panic!("fixture config is empty"))
}

/// The config in [`FULL_CONFIG`].
pub fn full_config() -> RepoConfig {
    config(FULL_CONFIG)
}

/// A repository as GitHub creates it: a `main` branch and the default labels.
pub fn fresh_repo() -> FakeRepo {
    FakeRepo::new("main")
        .with_label("bug", "d73a4a", "Something isn't working")
        .with_label("documentation", "0075ca", "Improvements or additions to documentation")
        .with_label("duplicate", "cfd3d7", "This issue or pull request already exists")
        .with_label("enhancement", "a2eeef", "New feature or request")
        .with_label("good first issue", "7057ff", "Good for newcomers")
        .with_label("help wanted", "008672", "Extra attention is needed")
        .with_label("invalid", "e4e669", "This doesn't seem right")
        .with_label("question", "d876e3", "Further information is requested")
        .with_label("wontfix", "ffffff", "This will not be worked on")
}
