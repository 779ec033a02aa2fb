//! The per-process context shared by every operation.

use crate::activity::{self, ActivityMetrics, ActivitySeries, ChartStyle, TimeWindow};
use crate::hosting::{
    Adapter, Client, Governor, HostingError, NormalizedRecord, Readme, RecordDetail, RecordFilter, RecordKind, RepositoryIdentifier,
    RepositoryInfo, RetryPolicy, StateFilter,
};
use chrono::{DateTime, Utc};
use core::time::Duration;
use futures_util::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;

const LOG_TARGET: &str = "    engine";

/// Settings the engine is built from
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub token: String,
    pub api_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,

    /// Upper bound on records listed per kind by metrics and series
    pub max_records_per_kind: usize,

    /// Commit detail requests in flight at once
    pub detail_concurrency: usize,

    pub chart: ChartStyle,
}

/// Owns the hosting client and the governor, and with them the shared quota state.
#[derive(Debug, Clone)]
pub struct Engine {
    adapter: Adapter,
    max_records_per_kind: usize,
    detail_concurrency: usize,
    chart: ChartStyle,
}

impl Engine {
    pub fn new(settings: &EngineSettings) -> crate::Result<Self> {
        if settings.token.trim().is_empty() {
            return Err(HostingError::configuration("a GitHub token is required, set GITHUB_TOKEN or pass --github-token").into());
        }

        let client = Client::new(&settings.token, &settings.api_url, settings.request_timeout)?;
        let governor = Arc::new(Governor::new(settings.retry));

        Ok(Self {
            adapter: Adapter::new(client, governor),
            max_records_per_kind: settings.max_records_per_kind,
            detail_concurrency: settings.detail_concurrency.max(1),
            chart: settings.chart,
        })
    }

    #[must_use]
    pub const fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    #[must_use]
    pub const fn chart_style(&self) -> &ChartStyle {
        &self.chart
    }

    pub async fn repository_info(&self, repo: &RepositoryIdentifier) -> Result<RepositoryInfo, HostingError> {
        self.adapter.fetch_repository(repo).await
    }

    pub async fn readme(&self, repo: &RepositoryIdentifier) -> Result<Readme, HostingError> {
        self.adapter.fetch_readme(repo).await
    }

    /// Up to `max_count` issues in `state`, most recently updated first. Pull requests are excluded.
    pub async fn issues(&self, repo: &RepositoryIdentifier, state: StateFilter, max_count: usize) -> Result<Vec<NormalizedRecord>, HostingError> {
        let filter = RecordFilter::default().with_state(state);
        self.adapter.fetch_records(repo, RecordKind::Issue, filter, max_count).try_collect().await
    }

    /// Up to `max_count` commits from the last `days` days, newest first, each with its line statistics.
    pub async fn commits(&self, repo: &RepositoryIdentifier, days: u32, max_count: usize) -> Result<Vec<NormalizedRecord>, HostingError> {
        self.commits_at(repo, days, max_count, Utc::now()).await
    }

    pub async fn commits_at(
        &self,
        repo: &RepositoryIdentifier,
        days: u32,
        max_count: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<NormalizedRecord>, HostingError> {
        let window = TimeWindow::ending_at(now, days).map_err(|e| e.within(&format!("listing commits for '{repo}'")))?;
        let commits: Vec<NormalizedRecord> = self
            .adapter
            .fetch_records(repo, RecordKind::Commit, RecordFilter::since(window.start()), max_count)
            .try_collect()
            .await?;

        log::debug!(target: LOG_TARGET, "Fetching statistics for {} commits of '{repo}'", commits.len());

        stream::iter(commits)
            .map(|record| self.with_stats(repo, record))
            .buffered(self.detail_concurrency)
            .try_collect()
            .await
    }

    async fn with_stats(&self, repo: &RepositoryIdentifier, mut record: NormalizedRecord) -> Result<NormalizedRecord, HostingError> {
        if let RecordDetail::Commit(commit) = &mut record.detail
            && commit.stats.is_none()
        {
            commit.stats = self.adapter.fetch_commit_stats(repo, &commit.sha).await?;
        }
        Ok(record)
    }

    pub async fn activity_metrics(&self, repo: &RepositoryIdentifier, days: u32) -> Result<ActivityMetrics, HostingError> {
        self.activity_metrics_at(repo, days, Utc::now()).await
    }

    /// Metrics for the window ending at `now`
    pub async fn activity_metrics_at(&self, repo: &RepositoryIdentifier, days: u32, now: DateTime<Utc>) -> Result<ActivityMetrics, HostingError> {
        let window = TimeWindow::ending_at(now, days).map_err(|e| e.within(&format!("measuring activity of '{repo}'")))?;
        activity::compute_activity(&self.adapter, repo, window, self.max_records_per_kind).await
    }

    pub async fn activity_series(&self, repo: &RepositoryIdentifier, days: u32) -> Result<ActivitySeries, HostingError> {
        self.activity_series_at(repo, days, Utc::now()).await
    }

    /// Series for the window ending at `now`
    pub async fn activity_series_at(&self, repo: &RepositoryIdentifier, days: u32, now: DateTime<Utc>) -> Result<ActivitySeries, HostingError> {
        let window = TimeWindow::ending_at(now, days).map_err(|e| e.within(&format!("building the commit series of '{repo}'")))?;
        activity::build_series(&self.adapter, repo, window, self.max_records_per_kind).await
    }

    /// PNG bar chart of the daily commit series
    pub async fn activity_chart(&self, repo: &RepositoryIdentifier, days: u32) -> crate::Result<Vec<u8>> {
        self.activity_chart_at(repo, days, Utc::now()).await
    }

    pub async fn activity_chart_at(&self, repo: &RepositoryIdentifier, days: u32, now: DateTime<Utc>) -> crate::Result<Vec<u8>> {
        let series = self.activity_series_at(repo, days, now).await?;
        activity::render_png(&series, &self.chart)
    }
}
