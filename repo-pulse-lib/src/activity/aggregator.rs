use super::{Measurement, TimeWindow};
use crate::hosting::{Adapter, HostingError, NormalizedRecord, RecordDetail, RecordFilter, RecordKind, RepositoryIdentifier, StateFilter};
use futures_util::StreamExt;
use std::collections::BTreeSet;

const LOG_TARGET: &str = "  activity";

/// Number of contributors reported by name
pub const TOP_CONTRIBUTORS: usize = 10;

/// The records of one kind gathered for a window
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub records: Vec<NormalizedRecord>,

    /// The fetch limit was reached before the listing ran out
    pub truncated: bool,
}

/// Result of listing one record kind
pub type ListingOutcome = Result<Listing, HostingError>;

/// A record kind whose data could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFailure {
    pub kind: RecordKind,
    pub error: HostingError,
}

/// Activity of a repository over a time window
#[derive(Debug, Clone)]
pub struct ActivityMetrics {
    pub repository: RepositoryIdentifier,
    pub window: TimeWindow,
    pub commits: Measurement<u64>,
    pub issues_opened: Measurement<u64>,
    pub issues_closed: Measurement<u64>,
    pub prs_opened: Measurement<u64>,
    pub prs_merged: Measurement<u64>,

    /// Distinct authors of commits, issues, and pull requests in the window
    pub active_contributors: Measurement<BTreeSet<String>>,

    /// All-time contributor count
    pub total_contributors: Measurement<u64>,

    /// The most prolific all-time contributors, most commits first
    pub top_contributors: Measurement<Vec<String>>,

    pub failures: Vec<CategoryFailure>,
}

impl ActivityMetrics {
    /// Record kinds whose counts are lower bounds
    #[must_use]
    pub fn truncated_kinds(&self) -> Vec<RecordKind> {
        [
            (RecordKind::Commit, self.commits.is_truncated()),
            (RecordKind::Issue, self.issues_opened.is_truncated()),
            (RecordKind::PullRequest, self.prs_opened.is_truncated()),
            (RecordKind::Contributor, self.total_contributors.is_truncated()),
        ]
        .into_iter()
        .filter_map(|(kind, truncated)| truncated.then_some(kind))
        .collect()
    }

    /// Record kinds that could not be fetched
    #[must_use]
    pub fn failed_kinds(&self) -> Vec<RecordKind> {
        self.failures.iter().map(|f| f.kind).collect()
    }
}

/// Gather the records of `kind` for a window, up to `limit` of them.
pub async fn collect_listing(
    adapter: &Adapter,
    repo: &RepositoryIdentifier,
    kind: RecordKind,
    filter: RecordFilter,
    limit: usize,
) -> ListingOutcome {
    let mut stream = core::pin::pin!(adapter.fetch_records(repo, kind, filter, limit));
    let mut records = Vec::new();

    while let Some(record) = stream.next().await {
        records.push(record?);
    }

    let truncated = limit > 0 && records.len() >= limit;
    if truncated {
        log::info!(target: LOG_TARGET, "Stopped listing {} for '{repo}' at the limit of {limit}", kind.plural());
    }

    Ok(Listing { records, truncated })
}

/// Fetch every record kind for `window` concurrently and aggregate them.
pub async fn compute_activity(
    adapter: &Adapter,
    repo: &RepositoryIdentifier,
    window: TimeWindow,
    limit: usize,
) -> Result<ActivityMetrics, HostingError> {
    log::info!(target: LOG_TARGET, "Computing activity for '{repo}' over the last {} days", window.days());

    let since = RecordFilter::since(window.start());
    let (commits, issues, pulls, contributors) = tokio::join!(
        collect_listing(adapter, repo, RecordKind::Commit, since, limit),
        collect_listing(adapter, repo, RecordKind::Issue, since.with_state(StateFilter::All), limit),
        collect_listing(adapter, repo, RecordKind::PullRequest, since.with_state(StateFilter::All), limit),
        collect_listing(adapter, repo, RecordKind::Contributor, RecordFilter::default(), limit),
    );

    aggregate(repo.clone(), window, commits, issues, pulls, contributors)
}

/// Combine the per-kind listings into metrics.
///
/// A failure that concerns the repository or credential as a whole fails the
/// aggregation, as does every kind failing. Other failures leave the affected
/// measurements unknown.
pub fn aggregate(
    repository: RepositoryIdentifier,
    window: TimeWindow,
    commits: ListingOutcome,
    issues: ListingOutcome,
    pulls: ListingOutcome,
    contributors: ListingOutcome,
) -> Result<ActivityMetrics, HostingError> {
    let outcomes = [
        (RecordKind::Commit, commits),
        (RecordKind::Issue, issues),
        (RecordKind::PullRequest, pulls),
        (RecordKind::Contributor, contributors),
    ];

    if let Some(fatal) = outcomes.iter().find_map(|(_, outcome)| outcome.as_ref().err().filter(|e| e.is_fatal())) {
        return Err(fatal.clone());
    }

    if outcomes.iter().all(|(_, outcome)| outcome.is_err())
        && let Some((_, Err(first))) = outcomes.first()
    {
        return Err(first.clone());
    }

    let mut failures = Vec::new();
    let [commits, issues, pulls, contributors] = outcomes.map(|(kind, outcome)| {
        outcome
            .map_err(|error| {
                log::warn!(target: LOG_TARGET, "Activity for '{repository}' is missing {}: {error}", kind.plural());
                failures.push(CategoryFailure { kind, error });
            })
            .ok()
    });

    let mut authors = BTreeSet::new();

    let commit_count = commits.as_ref().map(|listing| {
        let in_window = listing
            .records
            .iter()
            .filter(|r| r.timestamp.is_some_and(|t| window.contains(t)))
            .inspect(|r| insert_author(&mut authors, r))
            .count();
        Measurement::new(in_window as u64, listing.truncated)
    });

    let issue_counts = issues.as_ref().map(|listing| {
        let mut opened = 0_u64;
        let mut closed = 0_u64;
        for record in &listing.records {
            if let RecordDetail::Issue(issue) = &record.detail {
                if window.contains(issue.created_at) {
                    opened += 1;
                    insert_author(&mut authors, record);
                }
                if issue.closed_at.is_some_and(|t| window.contains(t)) {
                    closed += 1;
                }
            }
        }
        (Measurement::new(opened, listing.truncated), Measurement::new(closed, listing.truncated))
    });

    let pull_counts = pulls.as_ref().map(|listing| {
        let mut opened = 0_u64;
        let mut merged = 0_u64;
        for record in &listing.records {
            if let RecordDetail::PullRequest(pull) = &record.detail {
                if window.contains(pull.created_at) {
                    opened += 1;
                    insert_author(&mut authors, record);
                }
                if pull.merged_at.is_some_and(|t| window.contains(t)) {
                    merged += 1;
                }
            }
        }
        (Measurement::new(opened, listing.truncated), Measurement::new(merged, listing.truncated))
    });

    let authors_truncated = [&commits, &issues, &pulls].into_iter().flatten().any(|l| l.truncated);
    let active_contributors = if commit_count.is_some() && issue_counts.is_some() && pull_counts.is_some() {
        Measurement::new(authors, authors_truncated)
    } else {
        Measurement::Unknown
    };

    let (total_contributors, top_contributors) = contributors.map_or((Measurement::Unknown, Measurement::Unknown), |listing| {
        let top = listing.records.iter().take(TOP_CONTRIBUTORS).filter_map(|r| r.author.clone()).collect();
        (
            Measurement::new(listing.records.len() as u64, listing.truncated),
            Measurement::Observed(top),
        )
    });

    let (issues_opened, issues_closed) = issue_counts.unwrap_or((Measurement::Unknown, Measurement::Unknown));
    let (prs_opened, prs_merged) = pull_counts.unwrap_or((Measurement::Unknown, Measurement::Unknown));

    Ok(ActivityMetrics {
        repository,
        window,
        commits: commit_count.unwrap_or(Measurement::Unknown),
        issues_opened,
        issues_closed,
        prs_opened,
        prs_merged,
        active_contributors,
        total_contributors,
        top_contributors,
        failures,
    })
}

fn insert_author(authors: &mut BTreeSet<String>, record: &NormalizedRecord) {
    if let Some(author) = &record.author {
        let _ = authors.insert(author.clone());
    }
}
