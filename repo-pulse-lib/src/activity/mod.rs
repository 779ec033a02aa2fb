//! Time-windowed activity metrics and daily commit series.
//!
//! The aggregator lists commits, issues, pull requests, and contributors for a
//! [`TimeWindow`] and reduces them to [`ActivityMetrics`]. A category that fails to
//! load is reported as [`Measurement::Unknown`] rather than failing the whole
//! computation. The series builder buckets commits into one point per day, which
//! [`render_png`] turns into a bar chart.

mod aggregator;
mod chart;
mod measurement;
mod series;
mod window;

pub use aggregator::{
    ActivityMetrics, CategoryFailure, Listing, ListingOutcome, TOP_CONTRIBUTORS, aggregate, collect_listing, compute_activity,
};
pub use chart::{ChartStyle, MIN_DIMENSION, render_png};
pub use measurement::Measurement;
pub use series::{ActivitySeries, SeriesPoint, build_series, bucket_by_day, series_from_commits};
pub use window::{MAX_WINDOW_DAYS, TimeWindow};
