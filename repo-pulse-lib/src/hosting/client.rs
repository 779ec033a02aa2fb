//! Hosting API client
//!
//! Minimal HTTP client for a GitHub-compatible REST API. It performs exactly one
//! request per call and classifies the outcome; retrying is the governor's job.

use super::RepositoryIdentifier;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core::time::Duration;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, RETRY_AFTER};
use url::Url;

pub const GITHUB_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "repo-pulse";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Rate limit information from response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// One successful response
#[derive(Debug, Clone)]
pub struct Page {
    pub body: Bytes,
    /// Whether the `link` header advertises a further page
    pub has_next: bool,
}

/// Why a single request did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// No response: connection failure, timeout, or a body that could not be read
    Network(String),

    /// 5xx
    Server { status: u16 },

    /// Abuse-detection throttling; `retry_after` comes from the `retry-after` header
    SecondaryRateLimit { status: u16, retry_after: Option<Duration> },

    /// 404
    NotFound,

    /// 401, or a 403 that is not about rate limiting
    Auth { status: u16 },

    /// Any other 4xx
    Client { status: u16 },
}

impl Failure {
    /// Transient failures may succeed when retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. } | Self::SecondaryRateLimit { .. })
    }
}

/// Result of a hosting API call
#[derive(Debug)]
pub enum ApiResult<T> {
    /// Request succeeded - contains data and optional rate limit info
    Success(T, Option<RateLimitInfo>),

    /// Primary quota exhausted - should retry after reset time
    RateLimited(RateLimitInfo),

    /// Request failed
    Failed(Failure, Option<RateLimitInfo>),
}

/// Hosting API client
#[derive(Debug, Clone)]
#[expect(clippy::struct_field_names, reason = "client field stores the underlying HTTP client")]
pub struct Client {
    client: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Create a client that authenticates every request with `token`.
    pub fn new(token: &str, base_url: &str, timeout: Duration) -> crate::Result<Self> {
        let mut auth_val = HeaderValue::from_str(&format!("Bearer {token}"))?;
        auth_val.set_sensitive(true);

        let mut headers = HeaderMap::new();
        let _ = headers.insert(AUTHORIZATION, auth_val);
        let _ = headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
        let _ = headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Get the base URL for this client
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Construct the API URL of a repository, with an optional path suffix and query parameters
    #[must_use]
    pub fn repo_url(&self, repo: &RepositoryIdentifier, suffix: &str, query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();

        // The base URL was validated in `new`, so it always has path segments
        if let Ok(mut segments) = url.path_segments_mut() {
            let _ = segments.pop_if_empty().extend(["repos", repo.owner(), repo.name()]);
            let _ = segments.extend(suffix.split('/').filter(|p| !p.is_empty()));
        }

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                let _ = pairs.append_pair(key, value);
            }
        }

        url
    }

    /// Issue one GET request and classify the result
    pub async fn get(&self, url: &Url) -> ApiResult<Page> {
        let resp = match self.client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => return ApiResult::Failed(Failure::Network(describe_reqwest_error(&e)), None),
        };

        // Extract rate limit info from response headers before checking status
        let rate_limit = extract_rate_limit_from_headers(resp.headers());
        let status = resp.status();

        if status.is_success() {
            let has_next = has_next_page(resp.headers());
            return match resp.bytes().await {
                Ok(body) => ApiResult::Success(Page { body, has_next }, rate_limit),
                Err(e) => ApiResult::Failed(Failure::Network(describe_reqwest_error(&e)), rate_limit),
            };
        }

        let retry_after = parse_retry_after(resp.headers());
        let body = resp.text().await.unwrap_or_default();

        classify_failure(status, rate_limit, retry_after, &body)
    }
}

fn parse_base_url(base_url: &str) -> crate::Result<Url> {
    let url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        ohno::bail!("API URL '{base_url}' cannot be used as a base URL");
    }
    Ok(url)
}

/// Map a non-successful status to an [`ApiResult`].
fn classify_failure<T>(status: StatusCode, rate_limit: Option<RateLimitInfo>, retry_after: Option<Duration>, body: &str) -> ApiResult<T> {
    let code = status.as_u16();

    if matches!(code, 403 | 429) {
        // Primary quota exhausted: the headers say so explicitly
        if let Some(info) = rate_limit
            && info.remaining == 0
            && retry_after.is_none()
        {
            return ApiResult::RateLimited(info);
        }

        if code == 429 || retry_after.is_some() || body.to_ascii_lowercase().contains("rate limit") {
            return ApiResult::Failed(Failure::SecondaryRateLimit { status: code, retry_after }, rate_limit);
        }

        return ApiResult::Failed(Failure::Auth { status: code }, rate_limit);
    }

    let failure = match code {
        401 => Failure::Auth { status: code },
        404 => Failure::NotFound,
        _ if status.is_server_error() => Failure::Server { status: code },
        _ => Failure::Client { status: code },
    };

    ApiResult::Failed(failure, rate_limit)
}

fn describe_reqwest_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        "could not connect to the hosting service".to_string()
    } else {
        // reqwest errors embed the URL, never headers, so this cannot leak the credential
        e.to_string()
    }
}

/// Extract rate limit information from API response headers
fn extract_rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?.parse::<u64>().ok()?;

    let reset_timestamp = headers.get("x-ratelimit-reset")?.to_str().ok()?.parse::<i64>().ok()?;

    let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

    Some(RateLimitInfo { remaining, reset_at })
}

/// Parse the `Retry-After` header value as seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let s = headers.get(RETRY_AFTER).and_then(|h| h.to_str().ok())?;
    s.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get(LINK)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|link_str| link_str.contains(r#"rel="next""#))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_limit_headers(remaining: &'static str, reset: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-ratelimit-remaining", HeaderValue::from_static(remaining));
        let _ = headers.insert("x-ratelimit-reset", HeaderValue::from_static(reset));
        headers
    }

    #[test]
    fn test_extract_rate_limit_from_headers() {
        let headers = rate_limit_headers("4999", "1704067200");
        let rate_limit = extract_rate_limit_from_headers(&headers).unwrap();

        assert_eq!(rate_limit.remaining, 4999);
        assert_eq!(rate_limit.reset_at.timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_extract_rate_limit_missing_headers() {
        assert!(extract_rate_limit_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_extract_rate_limit_invalid_remaining() {
        let headers = rate_limit_headers("invalid", "1704067200");
        assert!(extract_rate_limit_from_headers(&headers).is_none());
    }

    #[test]
    fn test_extract_rate_limit_invalid_reset() {
        let headers = rate_limit_headers("4999", "invalid");
        assert!(extract_rate_limit_from_headers(&headers).is_none());
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

        let _ = headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_has_next_page() {
        let mut headers = HeaderMap::new();
        assert!(!has_next_page(&headers));

        let _ = headers.insert(
            LINK,
            HeaderValue::from_static(r#"<https://api.github.com/repos/o/r/issues?page=2>; rel="next", <https://api.github.com/repos/o/r/issues?page=3>; rel="last""#),
        );
        assert!(has_next_page(&headers));

        let _ = headers.insert(LINK, HeaderValue::from_static(r#"<https://api.github.com/repos/o/r/issues?page=1>; rel="prev""#));
        assert!(!has_next_page(&headers));
    }

    fn reset() -> RateLimitInfo {
        RateLimitInfo {
            remaining: 0,
            reset_at: DateTime::from_timestamp(1_704_067_200, 0).unwrap(),
        }
    }

    #[test]
    fn test_classify_primary_rate_limit() {
        let result = classify_failure::<()>(StatusCode::FORBIDDEN, Some(reset()), None, "API rate limit exceeded");
        assert!(matches!(result, ApiResult::RateLimited(info) if info.remaining == 0));
    }

    #[test]
    fn test_classify_429_with_exhausted_quota_is_primary() {
        let result = classify_failure::<()>(StatusCode::TOO_MANY_REQUESTS, Some(reset()), None, "");
        assert!(matches!(result, ApiResult::RateLimited(_)));
    }

    #[test]
    fn test_classify_secondary_rate_limit_with_retry_after() {
        let result = classify_failure::<()>(StatusCode::FORBIDDEN, None, Some(Duration::from_secs(30)), "");
        assert!(matches!(
            result,
            ApiResult::Failed(Failure::SecondaryRateLimit { status: 403, retry_after: Some(d) }, _) if d == Duration::from_secs(30)
        ));
    }

    #[test]
    fn test_classify_secondary_rate_limit_by_message() {
        let result = classify_failure::<()>(StatusCode::FORBIDDEN, None, None, "You have exceeded a secondary rate limit");
        assert!(matches!(result, ApiResult::Failed(Failure::SecondaryRateLimit { .. }, _)));
    }

    #[test]
    fn test_classify_forbidden_is_auth() {
        let result = classify_failure::<()>(StatusCode::FORBIDDEN, None, None, "Resource not accessible by integration");
        assert!(matches!(result, ApiResult::Failed(Failure::Auth { status: 403 }, _)));
    }

    #[test]
    fn test_classify_other_statuses() {
        assert!(matches!(
            classify_failure::<()>(StatusCode::UNAUTHORIZED, None, None, ""),
            ApiResult::Failed(Failure::Auth { status: 401 }, _)
        ));
        assert!(matches!(
            classify_failure::<()>(StatusCode::NOT_FOUND, None, None, ""),
            ApiResult::Failed(Failure::NotFound, _)
        ));
        assert!(matches!(
            classify_failure::<()>(StatusCode::BAD_GATEWAY, None, None, ""),
            ApiResult::Failed(Failure::Server { status: 502 }, _)
        ));
        assert!(matches!(
            classify_failure::<()>(StatusCode::UNPROCESSABLE_ENTITY, None, None, ""),
            ApiResult::Failed(Failure::Client { status: 422 }, _)
        ));
    }

    #[test]
    fn test_failure_transience() {
        assert!(Failure::Network("reset".into()).is_transient());
        assert!(Failure::Server { status: 500 }.is_transient());
        assert!(Failure::SecondaryRateLimit { status: 429, retry_after: None }.is_transient());
        assert!(!Failure::NotFound.is_transient());
        assert!(!Failure::Auth { status: 401 }.is_transient());
        assert!(!Failure::Client { status: 400 }.is_transient());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetSystemTimePreciseAsFileTime")]
    fn test_repo_url() {
        let client = Client::new("test_token", GITHUB_API_URL, Duration::from_secs(10)).unwrap();
        let repo = RepositoryIdentifier::parse("tokio-rs/tokio").unwrap();

        let url = client.repo_url(&repo, "", &[]);
        assert_eq!(url.as_str(), "https://api.github.com/repos/tokio-rs/tokio");

        let url = client.repo_url(&repo, "/commits", &[("per_page", "100".to_string()), ("page", "2".to_string())]);
        assert_eq!(url.as_str(), "https://api.github.com/repos/tokio-rs/tokio/commits?per_page=100&page=2");
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetSystemTimePreciseAsFileTime")]
    fn test_repo_url_with_base_path() {
        let client = Client::new("test_token", "https://ghe.example.com/api/v3/", Duration::from_secs(10)).unwrap();
        let repo = RepositoryIdentifier::parse("octo/demo").unwrap();

        let url = client.repo_url(&repo, "/commits/abc123", &[]);
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/repos/octo/demo/commits/abc123");
    }

    #[test]
    fn test_client_rejects_bad_base_url() {
        let _ = Client::new("test_token", "not a url", Duration::from_secs(10)).unwrap_err();
    }

    #[test]
    fn test_token_is_not_in_debug_output() {
        let client = Client::new("super-secret-token", GITHUB_API_URL, Duration::from_secs(10)).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret-token"));
    }
}
