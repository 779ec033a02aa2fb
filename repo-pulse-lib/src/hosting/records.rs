use super::HostingError;
use super::payloads;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Longest issue body excerpt kept, in characters
pub const BODY_EXCERPT_CHARS: usize = 500;

/// The kinds of records the adapter can list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, IntoStaticStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Commit,
    Issue,
    PullRequest,
    Contributor,
}

impl RecordKind {
    /// Plural noun used in log and error messages
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Commit => "commits",
            Self::Issue => "issues",
            Self::PullRequest => "pull requests",
            Self::Contributor => "contributors",
        }
    }

    /// Whether items are listed by descending [`NormalizedRecord::timestamp`], so a listing
    /// can stop at the first one older than the window.
    ///
    /// Commits are not: the listing follows history order, and a rebased or cherry-picked
    /// commit keeps its original author date. The server bounds commit listings with `since`.
    #[must_use]
    pub const fn is_chronological(self) -> bool {
        matches!(self, Self::Issue | Self::PullRequest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    Open,
    Closed,
    Merged,
}

/// State filter accepted by the issue and pull request listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl StateFilter {
    pub fn parse(text: &str) -> Result<Self, HostingError> {
        text.parse().ok().ok_or_else(|| {
            HostingError::invalid_argument(format!("invalid state '{text}', expected one of 'open', 'closed', or 'all'"))
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// One record as returned by the adapter, whatever its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub id: String,

    /// Account login, or the git author name for commits not linked to an account
    pub author: Option<String>,

    /// Commit author date, or last update of an issue or pull request
    pub timestamp: Option<DateTime<Utc>>,

    pub state: Option<RecordState>,

    #[serde(flatten)]
    pub detail: RecordDetail,
}

impl NormalizedRecord {
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self.detail {
            RecordDetail::Commit(_) => RecordKind::Commit,
            RecordDetail::Issue(_) => RecordKind::Issue,
            RecordDetail::PullRequest(_) => RecordKind::PullRequest,
            RecordDetail::Contributor(_) => RecordKind::Contributor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecordDetail {
    Commit(CommitDetail),
    Issue(IssueDetail),
    PullRequest(PullRequestDetail),
    Contributor(ContributorDetail),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueDetail {
    pub number: u64,
    pub title: String,
    pub labels: Vec<String>,
    pub comments: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub html_url: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitDetail {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_login: Option<String>,
    pub date: DateTime<Utc>,
    pub html_url: String,
    pub stats: Option<CommitStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestDetail {
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merged: bool,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorDetail {
    pub login: String,
    pub contributions: u64,
    pub anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerInfo {
    pub login: String,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

/// Repository facts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub owner: OwnerInfo,
    pub html_url: String,
    pub api_url: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub language: Option<String>,
    pub license: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub visibility: String,
    pub default_branch: String,
    pub topics: Vec<String>,
}

impl From<payloads::Repository> for RepositoryInfo {
    fn from(repo: payloads::Repository) -> Self {
        let visibility = match repo.visibility.as_deref() {
            Some("public") => "public",
            Some(_) => "private",
            None if repo.private => "private",
            None => "public",
        };

        Self {
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            owner: OwnerInfo {
                login: repo.owner.login,
                avatar_url: repo.owner.avatar_url,
                html_url: repo.owner.html_url,
            },
            html_url: repo.html_url,
            api_url: repo.url,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            watchers: repo.watchers_count,
            open_issues: repo.open_issues_count,
            language: repo.language,
            license: repo.license.map(|l| l.name),
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            pushed_at: repo.pushed_at,
            visibility: visibility.to_string(),
            default_branch: repo.default_branch,
            topics: repo.topics,
        }
    }
}

/// A repository's readme, decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readme {
    pub content: String,
    pub path: String,
    pub name: String,
    pub size: u64,
    pub download_url: Option<String>,
}

/// The normalized records of one listing page
#[derive(Debug, Clone, Default)]
pub struct NormalizedPage {
    pub records: Vec<NormalizedRecord>,

    /// Number of entries the page listed, before any were dropped
    pub listed: usize,
}

/// Parse one page of a listing endpoint into normalized records.
///
/// Issues that are really pull requests are dropped. An empty body, as sent with
/// `204 No Content` for the contributors of an empty repository, is an empty page.
pub fn normalize_page(kind: RecordKind, body: &[u8], context: &str) -> Result<NormalizedPage, HostingError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(NormalizedPage::default());
    }

    let page = match kind {
        RecordKind::Commit => {
            let raw = parse::<payloads::Commit>(body, context)?;
            NormalizedPage {
                listed: raw.len(),
                records: raw.into_iter().map(from_commit).collect(),
            }
        }
        RecordKind::Issue => {
            let raw = parse::<payloads::Issue>(body, context)?;
            NormalizedPage {
                listed: raw.len(),
                records: raw.into_iter().filter(|issue| issue.pull_request.is_none()).map(from_issue).collect(),
            }
        }
        RecordKind::PullRequest => {
            let raw = parse::<payloads::PullRequest>(body, context)?;
            NormalizedPage {
                listed: raw.len(),
                records: raw.into_iter().map(from_pull).collect(),
            }
        }
        RecordKind::Contributor => {
            let raw = parse::<payloads::Contributor>(body, context)?;
            NormalizedPage {
                listed: raw.len(),
                records: raw.into_iter().filter_map(from_contributor).collect(),
            }
        }
    };

    Ok(page)
}

pub fn parse<T: DeserializeOwned>(body: &[u8], context: &str) -> Result<Vec<T>, HostingError> {
    parse_one(body, context)
}

pub fn parse_one<T: DeserializeOwned>(body: &[u8], context: &str) -> Result<T, HostingError> {
    serde_json::from_slice(body).map_err(|e| HostingError::MalformedPayload {
        context: context.to_string(),
        message: e.to_string(),
    })
}

fn parse_state(state: &str) -> RecordState {
    if state.eq_ignore_ascii_case("closed") {
        RecordState::Closed
    } else {
        RecordState::Open
    }
}

/// Keep the first [`BODY_EXCERPT_CHARS`] characters of `body`, marking the cut with `...`
#[must_use]
pub fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", body.split_at(cut).0),
        None => body.to_string(),
    }
}

fn from_issue(issue: payloads::Issue) -> NormalizedRecord {
    NormalizedRecord {
        id: issue.number.to_string(),
        author: issue.user.map(|u| u.login),
        timestamp: Some(issue.updated_at),
        state: Some(parse_state(&issue.state)),
        detail: RecordDetail::Issue(IssueDetail {
            number: issue.number,
            title: issue.title,
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            comments: issue.comments,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            closed_at: issue.closed_at,
            html_url: issue.html_url,
            body: issue.body.as_deref().map(excerpt),
        }),
    }
}

fn from_pull(pull: payloads::PullRequest) -> NormalizedRecord {
    let state = if pull.merged_at.is_some() {
        RecordState::Merged
    } else {
        parse_state(&pull.state)
    };

    NormalizedRecord {
        id: pull.number.to_string(),
        author: pull.user.map(|u| u.login),
        timestamp: Some(pull.updated_at),
        state: Some(state),
        detail: RecordDetail::PullRequest(PullRequestDetail {
            number: pull.number,
            title: pull.title,
            created_at: pull.created_at,
            updated_at: pull.updated_at,
            closed_at: pull.closed_at,
            merged_at: pull.merged_at,
            merged: pull.merged_at.is_some(),
            html_url: pull.html_url,
        }),
    }
}

pub fn from_commit(commit: payloads::Commit) -> NormalizedRecord {
    let author_login = commit.author.map(|a| a.login);
    let author = author_login.clone().unwrap_or_else(|| commit.commit.author.name.clone());

    NormalizedRecord {
        id: commit.sha.clone(),
        author: Some(author),
        timestamp: Some(commit.commit.author.date),
        state: None,
        detail: RecordDetail::Commit(CommitDetail {
            sha: commit.sha,
            message: commit.commit.message,
            author_name: commit.commit.author.name,
            author_login,
            date: commit.commit.author.date,
            html_url: commit.html_url,
            stats: commit.stats.map(|s| CommitStats {
                additions: s.additions,
                deletions: s.deletions,
                total: s.total,
            }),
        }),
    }
}

fn from_contributor(contributor: payloads::Contributor) -> Option<NormalizedRecord> {
    let anonymous = contributor.kind.eq_ignore_ascii_case("anonymous");
    let login = contributor.login.or(contributor.name).or(contributor.email)?;

    Some(NormalizedRecord {
        id: contributor.id.map_or_else(|| login.clone(), |id| id.to_string()),
        author: Some(login.clone()),
        timestamp: None,
        state: None,
        detail: RecordDetail::Contributor(ContributorDetail {
            login,
            contributions: contributor.contributions,
            anonymous,
        }),
    })
}
