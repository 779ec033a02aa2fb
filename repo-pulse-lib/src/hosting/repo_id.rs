use super::HostingError;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use url::Url;

/// An `owner/name` pair identifying one repository on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryIdentifier {
    owner: Arc<str>,
    name: Arc<str>,
}

impl RepositoryIdentifier {
    /// Build an identifier from its two parts.
    pub fn new(owner: &str, name: &str) -> Result<Self, HostingError> {
        validate_part("owner", owner)?;
        validate_part("name", name)?;

        Ok(Self {
            owner: Arc::from(owner),
            name: Arc::from(name),
        })
    }

    /// Parse `owner/name`, or a repository URL such as `https://github.com/owner/name.git`.
    pub fn parse(text: &str) -> Result<Self, HostingError> {
        let text = text.trim();

        if text.contains("://") {
            let url = Url::parse(text).map_err(|e| HostingError::invalid_argument(format!("invalid repository URL '{text}': {e}")))?;
            return Self::from_url(&url);
        }

        match text.split_once('/') {
            Some((owner, name)) => Self::new(owner, name.trim_end_matches(".git")),
            None => Err(HostingError::invalid_argument(format!(
                "invalid repository identifier '{text}', expected the format 'owner/name'"
            ))),
        }
    }

    fn from_url(url: &Url) -> Result<Self, HostingError> {
        let segments: Vec<_> = url.path_segments().map(Iterator::collect).unwrap_or_default();

        match segments.as_slice() {
            [owner, name, ..] => Self::new(owner, name.trim_end_matches(".git")),
            _ => Err(HostingError::invalid_argument(format!(
                "invalid repository URL '{url}': expected owner and repository name in the path"
            ))),
        }
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn validate_part(what: &str, part: &str) -> Result<(), HostingError> {
    if part.is_empty() {
        return Err(HostingError::invalid_argument(format!("repository {what} must not be empty")));
    }

    if part.contains('/') {
        return Err(HostingError::invalid_argument(format!("repository {what} '{part}' must not contain '/'")));
    }

    if part.chars().any(char::is_whitespace) {
        return Err(HostingError::invalid_argument(format!("repository {what} '{part}' must not contain whitespace")));
    }

    Ok(())
}

impl FromStr for RepositoryIdentifier {
    type Err = HostingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Serializes as `owner/name`
impl Serialize for RepositoryIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Display for RepositoryIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_and_name() {
        let repo = RepositoryIdentifier::parse("tokio-rs/tokio").unwrap();
        assert_eq!(repo.owner(), "tokio-rs");
        assert_eq!(repo.name(), "tokio");
        assert_eq!(repo.to_string(), "tokio-rs/tokio");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let repo = RepositoryIdentifier::parse("  octo/demo \n").unwrap();
        assert_eq!(repo.to_string(), "octo/demo");
    }

    #[test]
    fn test_parse_strips_git_extension() {
        let repo = RepositoryIdentifier::parse("serde-rs/serde.git").unwrap();
        assert_eq!(repo.name(), "serde");
    }

    #[test]
    fn test_parse_github_url() {
        let repo = RepositoryIdentifier::parse("https://github.com/tokio-rs/tokio").unwrap();
        assert_eq!(repo.owner(), "tokio-rs");
        assert_eq!(repo.name(), "tokio");
    }

    #[test]
    fn test_parse_url_with_deep_path() {
        let repo = RepositoryIdentifier::parse("https://github.com/serde-rs/serde.git/tree/master/serde_derive").unwrap();
        assert_eq!(repo.to_string(), "serde-rs/serde");
    }

    #[test]
    fn test_parse_url_missing_name() {
        let err = RepositoryIdentifier::parse("https://github.com/tokio-rs").unwrap_err();
        assert!(matches!(err, HostingError::InvalidArgument { .. }));
    }

    #[test]
    fn test_parse_without_slash() {
        let err = RepositoryIdentifier::parse("tokio").unwrap_err();
        assert!(matches!(err, HostingError::InvalidArgument { .. }));
    }

    #[test]
    fn test_parse_empty_owner() {
        let _ = RepositoryIdentifier::parse("/tokio").unwrap_err();
    }

    #[test]
    fn test_parse_empty_name() {
        let _ = RepositoryIdentifier::parse("tokio-rs/").unwrap_err();
    }

    #[test]
    fn test_parse_extra_segment() {
        let err = RepositoryIdentifier::parse("a/b/c").unwrap_err();
        assert!(err.to_string().contains("must not contain '/'"));
    }

    #[test]
    fn test_new_rejects_whitespace() {
        let _ = RepositoryIdentifier::new("octo cat", "demo").unwrap_err();
    }

    #[test]
    fn test_serializes_as_string() {
        let repo = RepositoryIdentifier::parse("octo/demo").unwrap();
        assert_eq!(serde_json::to_value(&repo).unwrap(), serde_json::json!("octo/demo"));
    }

    #[test]
    fn test_from_str() {
        let repo: RepositoryIdentifier = "octo/demo".parse().unwrap();
        assert_eq!(repo, RepositoryIdentifier::new("octo", "demo").unwrap());
    }
}
