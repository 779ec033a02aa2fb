use super::TimeWindow;
use super::aggregator::collect_listing;
use crate::hosting::{Adapter, HostingError, NormalizedRecord, RecordFilter, RecordKind, RepositoryIdentifier};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Commits on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub count: u64,
}

/// Daily commit counts over a window, oldest day first, one point per day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySeries {
    pub repository: RepositoryIdentifier,
    pub window: TimeWindow,
    pub points: Vec<SeriesPoint>,

    /// The fetch limit was reached, so counts are lower bounds
    pub truncated: bool,
}

impl ActivitySeries {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.points.iter().map(|p| p.count).sum()
    }

    #[must_use]
    pub fn max_count(&self) -> u64 {
        self.points.iter().map(|p| p.count).max().unwrap_or(0)
    }
}

/// Count timestamps per UTC calendar day of `window`, dropping those outside it.
pub fn bucket_by_day(window: &TimeWindow, timestamps: impl IntoIterator<Item = DateTime<Utc>>) -> Vec<SeriesPoint> {
    let mut points: Vec<_> = window.dates().map(|date| SeriesPoint { date, count: 0 }).collect();

    for timestamp in timestamps {
        if let Some(point) = window.day_index(timestamp).and_then(|i| points.get_mut(i)) {
            point.count += 1;
        }
    }

    points
}

/// Bucket commit records into a series
#[must_use]
pub fn series_from_commits(repository: RepositoryIdentifier, window: TimeWindow, commits: &[NormalizedRecord], truncated: bool) -> ActivitySeries {
    let points = bucket_by_day(&window, commits.iter().filter_map(|r| r.timestamp));
    ActivitySeries {
        repository,
        window,
        points,
        truncated,
    }
}

/// Fetch the commits of `window` and bucket them by day.
pub async fn build_series(adapter: &Adapter, repo: &RepositoryIdentifier, window: TimeWindow, limit: usize) -> Result<ActivitySeries, HostingError> {
    let listing = collect_listing(adapter, repo, RecordKind::Commit, RecordFilter::since(window.start()), limit).await?;
    Ok(series_from_commits(repo.clone(), window, &listing.records, listing.truncated))
}
