//! Access to the source-hosting service.
//!
//! [`Adapter`] turns paginated, rate-limited API listings into streams of
//! [`NormalizedRecord`]s. Every request it makes goes through the shared
//! [`Governor`], which owns the quota state and the retry policy.

mod adapter;
mod client;
mod error;
mod governor;
mod payloads;
mod records;
mod repo_id;

pub use adapter::{Adapter, MAX_PAGE_SIZE, RecordFilter};
pub use client::{ApiResult, Client, Failure, GITHUB_API_URL, Page, RateLimitInfo};
pub use error::HostingError;
pub use governor::{Governor, RateLimitState, RetryPolicy};
pub use records::{
    BODY_EXCERPT_CHARS, CommitDetail, CommitStats, ContributorDetail, IssueDetail, NormalizedRecord, OwnerInfo, PullRequestDetail, Readme,
    RecordDetail, RecordKind, RecordState, RepositoryInfo, StateFilter, excerpt,
};
pub use repo_id::RepositoryIdentifier;
