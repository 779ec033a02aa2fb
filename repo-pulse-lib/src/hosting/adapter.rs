use super::client::{Client, Page};
use super::governor::Governor;
use super::records::{self, CommitStats, NormalizedRecord, Readme, RecordKind, RepositoryInfo, StateFilter};
use super::{HostingError, RepositoryIdentifier, payloads};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::Stream;
use futures_util::stream;
use std::collections::VecDeque;
use std::sync::Arc;

const LOG_TARGET: &str = "   adapter";

/// Largest page size the API accepts
pub const MAX_PAGE_SIZE: usize = 100;

/// Status of a commit listing for a repository without any commits (`409 Git Repository is empty`)
const EMPTY_REPOSITORY_STATUS: u16 = 409;

/// Narrows a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Issues and pull requests only
    pub state: Option<StateFilter>,

    /// Lower bound on record timestamps. Sent to the server for commits and issues;
    /// issue and pull request listings also stop at the first older record.
    pub since: Option<DateTime<Utc>>,
}

impl RecordFilter {
    #[must_use]
    pub const fn since(since: DateTime<Utc>) -> Self {
        Self {
            state: None,
            since: Some(since),
        }
    }

    #[must_use]
    pub const fn with_state(self, state: StateFilter) -> Self {
        Self { state: Some(state), ..self }
    }
}

/// Pagination state of one listing
#[derive(Debug)]
struct Cursor {
    next_page: u32,
    yielded: usize,
    buffer: VecDeque<NormalizedRecord>,
    exhausted: bool,
}

/// Remote data source adapter.
///
/// Lists and fetches repository data, normalizing the raw payloads. All requests go
/// through the shared [`Governor`].
#[derive(Debug, Clone)]
pub struct Adapter {
    client: Client,
    governor: Arc<Governor>,
}

impl Adapter {
    #[must_use]
    pub const fn new(client: Client, governor: Arc<Governor>) -> Self {
        Self { client, governor }
    }

    #[must_use]
    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    /// Lazily list up to `limit` records of `kind`, newest first.
    ///
    /// Pages are requested as the stream is polled. The stream ends when `limit` records
    /// were yielded, the listing is exhausted, or a chronological record predates
    /// `filter.since`. A failed page request yields one error and ends the stream. The
    /// commit listing of an empty repository is an empty stream.
    pub fn fetch_records<'a>(
        &'a self,
        repo: &'a RepositoryIdentifier,
        kind: RecordKind,
        filter: RecordFilter,
        limit: usize,
    ) -> impl Stream<Item = Result<NormalizedRecord, HostingError>> + 'a {
        let per_page = limit.clamp(1, MAX_PAGE_SIZE);
        let context = format!("fetching {} for '{repo}'", kind.plural());

        let cursor = Cursor {
            next_page: 1,
            yielded: 0,
            buffer: VecDeque::new(),
            exhausted: limit == 0,
        };

        stream::unfold(Some(cursor), move |cursor| {
            let context = context.clone();
            async move {
                let mut cursor = cursor?;

                loop {
                    if cursor.yielded >= limit {
                        log::debug!(target: LOG_TARGET, "{context}: limit of {limit} reached");
                        return None;
                    }

                    if let Some(record) = cursor.buffer.pop_front() {
                        if predates(kind, &record, filter.since) {
                            log::debug!(target: LOG_TARGET, "{context}: reached records older than the window");
                            return None;
                        }

                        cursor.yielded += 1;
                        return Some((Ok(record), Some(cursor)));
                    }

                    if cursor.exhausted {
                        return None;
                    }

                    let url = self.client.repo_url(repo, list_path(kind), &list_query(kind, filter, per_page, cursor.next_page));
                    log::debug!(target: LOG_TARGET, "{context}: requesting page {}", cursor.next_page);

                    let page = match self.get(&context, &url).await {
                        Ok(page) => page,
                        Err(HostingError::Upstream { status: EMPTY_REPOSITORY_STATUS, .. }) if kind == RecordKind::Commit => {
                            log::debug!(target: LOG_TARGET, "{context}: repository has no commits");
                            return None;
                        }
                        Err(e) => return Some((Err(e), None)),
                    };

                    let normalized = match records::normalize_page(kind, &page.body, &context) {
                        Ok(normalized) => normalized,
                        Err(e) => return Some((Err(e), None)),
                    };

                    cursor.next_page += 1;
                    cursor.exhausted = !page.has_next || normalized.listed == 0;
                    cursor.buffer = normalized.records.into();
                }
            }
        })
    }

    /// Fetch repository facts
    pub async fn fetch_repository(&self, repo: &RepositoryIdentifier) -> Result<RepositoryInfo, HostingError> {
        let context = format!("fetching repository info for '{repo}'");
        let url = self.client.repo_url(repo, "", &[]);

        let page = self.get(&context, &url).await?;
        let raw: payloads::Repository = records::parse_one(&page.body, &context)?;
        Ok(raw.into())
    }

    /// Fetch the line statistics of a single commit
    pub async fn fetch_commit_stats(&self, repo: &RepositoryIdentifier, sha: &str) -> Result<Option<CommitStats>, HostingError> {
        let context = format!("fetching commit {sha} for '{repo}'");
        let url = self.client.repo_url(repo, &format!("commits/{sha}"), &[]);

        let page = self.get(&context, &url).await?;
        let raw: payloads::Commit = records::parse_one(&page.body, &context)?;
        Ok(raw.stats.map(|s| CommitStats {
            additions: s.additions,
            deletions: s.deletions,
            total: s.total,
        }))
    }

    /// Fetch and decode the repository readme
    pub async fn fetch_readme(&self, repo: &RepositoryIdentifier) -> Result<Readme, HostingError> {
        let context = format!("fetching readme for '{repo}'");
        let url = self.client.repo_url(repo, "readme", &[]);

        let page = self.get(&context, &url).await?;
        let raw: payloads::Readme = records::parse_one(&page.body, &context)?;
        let content = decode_content(&raw, &context)?;

        Ok(Readme {
            content,
            path: raw.path,
            name: raw.name,
            size: raw.size,
            download_url: raw.download_url,
        })
    }

    async fn get(&self, context: &str, url: &url::Url) -> Result<Page, HostingError> {
        self.governor.call(context, || self.client.get(url)).await
    }
}

fn predates(kind: RecordKind, record: &NormalizedRecord, since: Option<DateTime<Utc>>) -> bool {
    match (since, record.timestamp) {
        (Some(since), Some(timestamp)) => kind.is_chronological() && timestamp < since,
        _ => false,
    }
}

const fn list_path(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Commit => "commits",
        RecordKind::Issue => "issues",
        RecordKind::PullRequest => "pulls",
        RecordKind::Contributor => "contributors",
    }
}

fn list_query(kind: RecordKind, filter: RecordFilter, per_page: usize, page: u32) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(6);
    let since = filter.since.map(|s| s.to_rfc3339_opts(SecondsFormat::Secs, true));
    let state = filter.state.unwrap_or(StateFilter::All).as_str().to_string();

    match kind {
        RecordKind::Commit => {
            if let Some(since) = since {
                query.push(("since", since));
            }
        }
        RecordKind::Issue => {
            query.push(("state", state));
            query.push(("sort", "updated".to_string()));
            query.push(("direction", "desc".to_string()));
            if let Some(since) = since {
                query.push(("since", since));
            }
        }
        RecordKind::PullRequest => {
            query.push(("state", state));
            query.push(("sort", "updated".to_string()));
            query.push(("direction", "desc".to_string()));
        }
        RecordKind::Contributor => {
            query.push(("anon", "true".to_string()));
        }
    }

    query.push(("per_page", per_page.to_string()));
    query.push(("page", page.to_string()));
    query
}

fn decode_content(raw: &payloads::Readme, context: &str) -> Result<String, HostingError> {
    let malformed = |message: String| HostingError::MalformedPayload {
        context: context.to_string(),
        message,
    };

    if !raw.encoding.eq_ignore_ascii_case("base64") {
        return Err(malformed(format!("unsupported content encoding '{}'", raw.encoding)));
    }

    let compact: String = raw.content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| malformed(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| malformed(format!("content is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_issues() {
        let since = DateTime::from_timestamp(1_704_067_200, 0).unwrap();
        let filter = RecordFilter::since(since).with_state(StateFilter::Closed);

        let query = list_query(RecordKind::Issue, filter, 30, 2);
        assert_eq!(
            query,
            vec![
                ("state", "closed".to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
                ("since", "2024-01-01T00:00:00Z".to_string()),
                ("per_page", "30".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_query_pulls_default_to_all_states() {
        let query = list_query(RecordKind::PullRequest, RecordFilter::default(), 100, 1);
        assert_eq!(query[0], ("state", "all".to_string()));
    }

    #[test]
    fn test_list_query_contributors() {
        let query = list_query(RecordKind::Contributor, RecordFilter::default(), 10, 1);
        assert_eq!(query[0], ("anon", "true".to_string()));
    }

    #[test]
    fn test_decode_content() {
        let raw = payloads::Readme {
            name: "README.md".into(),
            path: "README.md".into(),
            size: 12,
            content: "IyBIZWxs\nbyB3b3Js\nZA==\n".into(),
            encoding: "base64".into(),
            download_url: None,
        };

        assert_eq!(decode_content(&raw, "test").unwrap(), "# Hello world");
    }

    #[test]
    fn test_decode_content_rejects_unknown_encoding() {
        let raw = payloads::Readme {
            name: "README.md".into(),
            path: "README.md".into(),
            size: 1,
            content: "x".into(),
            encoding: "utf-8".into(),
            download_url: None,
        };

        let err = decode_content(&raw, "test").unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }
}
