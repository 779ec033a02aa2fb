//! Named operations with typed parameters.
//!
//! Each tool takes a repository as `owner/name` plus primitive arguments and
//! produces JSON, text, or a PNG image. The same tools back the CLI subcommands
//! and the line-delimited JSON loop of [`serve`].

pub mod serve;

use crate::activity;
use crate::engine::Engine;
use crate::hosting::{HostingError, RepositoryIdentifier, StateFilter};
use crate::reports::{commit_json, issue_json, metrics_json, series_json};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

const LOG_TARGET: &str = "     tools";

pub const DEFAULT_DAYS: u32 = 30;
pub const DEFAULT_MAX_ISSUES: usize = 30;
pub const DEFAULT_MAX_COMMITS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    GetRepositoryInfo,
    #[strum(to_string = "get_repository_issues", serialize = "get_issues")]
    GetRepositoryIssues,
    #[strum(to_string = "get_commit_history", serialize = "get_commits")]
    GetCommitHistory,
    GetActivityMetrics,
    GetActivitySeries,
    #[strum(to_string = "generate_activity_chart", serialize = "get_activity_series_image")]
    GenerateActivityChart,
    GetReadme,
    ListTools,
}

impl ToolName {
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::GetRepositoryInfo => "Retrieve basic metadata about a repository.",
            Self::GetRepositoryIssues => "List repository issues, most recently updated first.",
            Self::GetCommitHistory => "List recent commits with their line statistics.",
            Self::GetActivityMetrics => "Calculate repository activity metrics over a window of days.",
            Self::GetActivitySeries => "Count commits per day over a window of days.",
            Self::GenerateActivityChart => "Render a bar chart of daily commit activity as PNG.",
            Self::GetReadme => "Get the readme content of a repository.",
            Self::ListTools => "List the available tools and their parameters.",
        }
    }

    /// Parameter names, each with its default when optional
    #[must_use]
    pub const fn parameters(self) -> &'static [(&'static str, Option<&'static str>)] {
        match self {
            Self::GetRepositoryInfo | Self::GetReadme => &[("repo_name", None)],
            Self::GetRepositoryIssues => &[("repo_name", None), ("state", Some("open")), ("max_issues", Some("30"))],
            Self::GetCommitHistory => &[("repo_name", None), ("days", Some("30")), ("max_commits", Some("50"))],
            Self::GetActivityMetrics | Self::GetActivitySeries | Self::GenerateActivityChart => {
                &[("repo_name", None), ("days", Some("30"))]
            }
            Self::ListTools => &[],
        }
    }
}

const fn default_days() -> u32 {
    DEFAULT_DAYS
}

const fn default_max_issues() -> usize {
    DEFAULT_MAX_ISSUES
}

const fn default_max_commits() -> usize {
    DEFAULT_MAX_COMMITS
}

fn default_state() -> String {
    StateFilter::Open.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoArgs {
    #[serde(alias = "repo")]
    pub repo_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuesArgs {
    #[serde(alias = "repo")]
    pub repo_name: String,

    #[serde(default = "default_state")]
    pub state: String,

    #[serde(default = "default_max_issues", alias = "max_count")]
    pub max_issues: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitsArgs {
    #[serde(alias = "repo")]
    pub repo_name: String,

    #[serde(default = "default_days")]
    pub days: u32,

    #[serde(default = "default_max_commits", alias = "max_count")]
    pub max_commits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowArgs {
    #[serde(alias = "repo")]
    pub repo_name: String,

    #[serde(default = "default_days")]
    pub days: u32,
}

/// One tool invocation with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    RepositoryInfo(RepoArgs),
    Issues(IssuesArgs),
    Commits(CommitsArgs),
    ActivityMetrics(WindowArgs),
    ActivitySeries(WindowArgs),
    ActivityChart(WindowArgs),
    Readme(RepoArgs),
    ListTools,
}

impl ToolCall {
    /// Resolve a tool name and its JSON arguments. Missing arguments mean an empty object.
    pub fn parse(tool: &str, arguments: Value) -> Result<Self, ToolError> {
        let name: ToolName = tool
            .parse()
            .ok()
            .ok_or_else(|| ToolError::invalid_argument(format!("unknown tool '{tool}'")))?;

        let arguments = if arguments.is_null() { json!({}) } else { arguments };

        Ok(match name {
            ToolName::GetRepositoryInfo => Self::RepositoryInfo(parse_args(name, arguments)?),
            ToolName::GetRepositoryIssues => Self::Issues(parse_args(name, arguments)?),
            ToolName::GetCommitHistory => Self::Commits(parse_args(name, arguments)?),
            ToolName::GetActivityMetrics => Self::ActivityMetrics(parse_args(name, arguments)?),
            ToolName::GetActivitySeries => Self::ActivitySeries(parse_args(name, arguments)?),
            ToolName::GenerateActivityChart => Self::ActivityChart(parse_args(name, arguments)?),
            ToolName::GetReadme => Self::Readme(parse_args(name, arguments)?),
            ToolName::ListTools => Self::ListTools,
        })
    }

    #[must_use]
    pub const fn name(&self) -> ToolName {
        match self {
            Self::RepositoryInfo(_) => ToolName::GetRepositoryInfo,
            Self::Issues(_) => ToolName::GetRepositoryIssues,
            Self::Commits(_) => ToolName::GetCommitHistory,
            Self::ActivityMetrics(_) => ToolName::GetActivityMetrics,
            Self::ActivitySeries(_) => ToolName::GetActivitySeries,
            Self::ActivityChart(_) => ToolName::GenerateActivityChart,
            Self::Readme(_) => ToolName::GetReadme,
            Self::ListTools => ToolName::ListTools,
        }
    }
}

fn parse_args<T: DeserializeOwned>(name: ToolName, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::invalid_argument(format!("invalid arguments for '{name}': {e}")))
}

/// What a tool produced
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Json(Value),
    Text(String),
    Image { mime_type: &'static str, data: Vec<u8> },
}

impl ToolOutput {
    /// JSON form used by the request loop. Images are base64-encoded.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Text(text) => json!(text),
            Self::Image { mime_type, data } => json!({
                "mime_type": mime_type,
                "data": STANDARD.encode(data),
            }),
        }
    }
}

/// A failed tool invocation, classified for callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub kind: &'static str,
    pub message: String,
    pub status: Option<u16>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl ToolError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        HostingError::invalid_argument(message).into()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "kind": self.kind,
            "message": self.message,
        });

        if let Some(status) = self.status {
            value["status"] = json!(status);
        }

        if let Some(reset_at) = self.reset_at {
            value["reset_at"] = json!(reset_at);
        }

        value
    }
}

impl From<HostingError> for ToolError {
    fn from(e: HostingError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
            status: e.status(),
            reset_at: e.reset_at(),
        }
    }
}

impl From<ohno::AppError> for ToolError {
    fn from(e: ohno::AppError) -> Self {
        Self {
            kind: "internal",
            message: format!("{e:#}"),
            status: None,
            reset_at: None,
        }
    }
}

impl core::fmt::Display for ToolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl core::error::Error for ToolError {}

/// Runs tool calls against one [`Engine`]
#[derive(Debug, Clone)]
pub struct Toolbox {
    engine: Engine,
}

impl Toolbox {
    #[must_use]
    pub const fn new(engine: Engine) -> Self {
        Self { engine }
    }

    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        self.invoke_at(call, Utc::now()).await
    }

    /// Run `call` with windows ending at `now`
    pub async fn invoke_at(&self, call: &ToolCall, now: DateTime<Utc>) -> Result<ToolOutput, ToolError> {
        log::info!(target: LOG_TARGET, "Running tool '{}'", call.name());

        match call {
            ToolCall::RepositoryInfo(args) => {
                let repo = parse_repo(&args.repo_name)?;
                let info = self.engine.repository_info(&repo).await?;
                Ok(ToolOutput::Json(json!(info)))
            }

            ToolCall::Issues(args) => {
                let repo = parse_repo(&args.repo_name)?;
                let state = StateFilter::parse(&args.state).map_err(|e| e.within(&format!("listing issues for '{repo}'")))?;
                let issues = self.engine.issues(&repo, state, args.max_issues).await?;
                Ok(ToolOutput::Json(Value::Array(issues.iter().map(issue_json).collect())))
            }

            ToolCall::Commits(args) => {
                let repo = parse_repo(&args.repo_name)?;
                let commits = self.engine.commits_at(&repo, args.days, args.max_commits, now).await?;
                Ok(ToolOutput::Json(Value::Array(commits.iter().map(commit_json).collect())))
            }

            ToolCall::ActivityMetrics(args) => {
                let repo = parse_repo(&args.repo_name)?;
                let metrics = self.engine.activity_metrics_at(&repo, args.days, now).await?;
                Ok(ToolOutput::Json(metrics_json(&metrics)))
            }

            ToolCall::ActivitySeries(args) => {
                let repo = parse_repo(&args.repo_name)?;
                let series = self.engine.activity_series_at(&repo, args.days, now).await?;
                Ok(ToolOutput::Json(series_json(&series)))
            }

            ToolCall::ActivityChart(args) => {
                let repo = parse_repo(&args.repo_name)?;
                let series = self.engine.activity_series_at(&repo, args.days, now).await?;
                let data = activity::render_png(&series, self.engine.chart_style())?;
                Ok(ToolOutput::Image {
                    mime_type: "image/png",
                    data,
                })
            }

            ToolCall::Readme(args) => {
                let repo = parse_repo(&args.repo_name)?;
                let readme = self.engine.readme(&repo).await?;
                Ok(ToolOutput::Text(readme.content))
            }

            ToolCall::ListTools => Ok(ToolOutput::Json(list_tools())),
        }
    }
}

fn parse_repo(text: &str) -> Result<RepositoryIdentifier, ToolError> {
    Ok(RepositoryIdentifier::parse(text)?)
}

/// Names, descriptions, and parameters of every tool
#[must_use]
pub fn list_tools() -> Value {
    Value::Array(
        ToolName::iter()
            .map(|tool| {
                let parameters: Vec<_> = tool
                    .parameters()
                    .iter()
                    .map(|(name, default)| {
                        json!({
                            "name": name,
                            "required": default.is_none(),
                            "default": default,
                        })
                    })
                    .collect();

                json!({
                    "name": tool.to_string(),
                    "description": tool.description(),
                    "parameters": parameters,
                })
            })
            .collect(),
    )
}
