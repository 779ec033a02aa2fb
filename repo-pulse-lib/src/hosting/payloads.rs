//! Wire shapes of the hosting API responses, limited to the fields we read.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::IgnoredAny;

#[derive(Debug, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct License {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[expect(clippy::struct_field_names, reason = "field names match the API exactly")]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub owner: Account,
    pub html_url: String,
    pub url: String,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub watchers_count: u64,
    pub open_issues_count: u64,
    pub language: Option<String>,
    pub license: Option<License>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub default_branch: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user: Option<Account>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub comments: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub html_url: String,
    pub body: Option<String>,
    /// Present on issues that are actually pull requests
    pub pull_request: Option<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user: Option<Account>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GitAuthor {
    pub name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct GitCommit {
    pub message: String,
    pub author: GitAuthor,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CommitStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub html_url: String,
    pub commit: GitCommit,
    /// The linked account, absent when the author email matches no account
    pub author: Option<Account>,
    #[serde(default)]
    pub stats: Option<CommitStats>,
}

#[derive(Debug, Deserialize)]
pub struct Contributor {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub login: Option<String>,
    /// Set for anonymous contributors in place of `login`
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub contributions: u64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct Readme {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub content: String,
    pub encoding: String,
    pub download_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_with_pull_request_marker() {
        let json = r#"{
            "id": 1, "number": 12, "title": "Add feature", "state": "open",
            "user": {"login": "octocat"}, "labels": [{"name": "enhancement"}],
            "comments": 3,
            "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-02T00:00:00Z",
            "closed_at": null, "html_url": "https://github.com/o/r/pull/12", "body": null,
            "pull_request": {"url": "https://api.github.com/repos/o/r/pulls/12", "merged_at": null}
        }"#;

        let issue: Issue = serde_json::from_str(json).unwrap();
        assert!(issue.pull_request.is_some());
        assert_eq!(issue.labels[0].name, "enhancement");
    }

    #[test]
    fn test_commit_without_linked_account() {
        let json = r#"{
            "sha": "abc123", "html_url": "https://github.com/o/r/commit/abc123",
            "commit": {"message": "fix", "author": {"name": "Jane", "email": "j@example.com", "date": "2024-01-01T10:00:00Z"}},
            "author": null
        }"#;

        let commit: Commit = serde_json::from_str(json).unwrap();
        assert!(commit.author.is_none());
        assert!(commit.stats.is_none());
        assert_eq!(commit.commit.author.name, "Jane");
    }

    #[test]
    fn test_anonymous_contributor() {
        let json = r#"{"name": "Someone", "email": "s@example.com", "contributions": 4, "type": "Anonymous"}"#;

        let contributor: Contributor = serde_json::from_str(json).unwrap();
        assert!(contributor.login.is_none());
        assert_eq!(contributor.kind, "Anonymous");
    }

    #[test]
    fn test_repository_missing_required_field() {
        let json = r#"{"name": "demo"}"#;
        let _ = serde_json::from_str::<Repository>(json).unwrap_err();
    }
}
